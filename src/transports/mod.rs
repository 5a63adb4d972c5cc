//! Ready-made [`Transport`](crate::Transport) implementations.
//!
//! | Feature                | Transport              |
//! |------------------------|------------------------|
//! | `transport-websocket`  | [`WebSocketTransport`] |
//!
//! Any other channel works too: implement [`Transport`](crate::Transport)
//! for it and hand it to [`GameSession::mount`](crate::session::GameSession::mount).

#[cfg(feature = "transport-websocket")]
pub mod websocket;

#[cfg(feature = "transport-websocket")]
pub use websocket::WebSocketTransport;
