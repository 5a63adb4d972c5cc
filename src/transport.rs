//! Transport abstraction for the game server channel.
//!
//! The [`Transport`] trait is the already-connected, bidirectional event pipe
//! between the game view and the session server. Every frame is one complete
//! JSON text message (see [`protocol`](crate::protocol) for the envelope), so
//! implementations only need to handle their own framing.
//!
//! # Connection Setup
//!
//! Connecting, reconnecting and backoff are owned by whoever builds the
//! transport. The view receives a connected handle in
//! [`GameSession::mount`](crate::session::GameSession::mount) and hands it back
//! on [`unmount`](crate::session::GameSession::unmount) without closing it, so
//! the same connection can serve the next mount.
//!
//! # Implementing a Custom Transport
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use pong_view_client::error::GameViewError;
//! use pong_view_client::transport::Transport;
//!
//! struct MyTransport { /* ... */ }
//!
//! #[async_trait]
//! impl Transport for MyTransport {
//!     async fn send(&mut self, frame: String) -> Result<(), GameViewError> {
//!         // Write the JSON frame to your connection
//!         todo!()
//!     }
//!
//!     async fn recv(&mut self) -> Option<Result<String, GameViewError>> {
//!         // Read the next JSON frame; `None` once the peer has gone away
//!         todo!()
//!     }
//!
//!     async fn close(&mut self) -> Result<(), GameViewError> {
//!         todo!()
//!     }
//! }
//! ```

use async_trait::async_trait;

use crate::error::GameViewError;

/// A bidirectional text frame channel to the game server.
///
/// Object-safe, so `Box<dyn Transport>` works; the session itself is generic
/// over `T: Transport` so it can return the concrete handle on unmount.
///
/// # Cancel Safety
///
/// [`recv`](Transport::recv) **MUST** be cancel-safe: the session polls it
/// inside `tokio::select!` next to local UI commands, and a cancelled `recv`
/// must not lose a frame. Wrapping an `mpsc::Receiver` or a
/// `futures::Stream` satisfies this.
#[async_trait]
pub trait Transport: Send + 'static {
    /// Send one JSON frame to the server.
    ///
    /// # Errors
    ///
    /// Returns [`GameViewError::TransportSend`] or
    /// [`GameViewError::TransportClosed`] when the frame cannot be written.
    async fn send(&mut self, frame: String) -> Result<(), GameViewError>;

    /// Receive the next JSON frame from the server.
    ///
    /// Returns `Some(Ok(text))` for a frame, `Some(Err(_))` for a transport
    /// failure, and `None` once the connection has ended cleanly.
    async fn recv(&mut self) -> Option<Result<String, GameViewError>>;

    /// Close the connection.
    ///
    /// The session never calls this; it is here for the owner of the
    /// connection once no view needs it anymore.
    ///
    /// # Errors
    ///
    /// Returns an error if the close handshake fails.
    async fn close(&mut self) -> Result<(), GameViewError>;
}
