//! [`Transport`] over a `tokio-tungstenite` WebSocket.
//!
//! The game view never dials or reconnects by itself; this adapter exists so
//! that a caller holding a socket can mount a view on it. `ws://` and `wss://`
//! are both accepted by [`WebSocketTransport::connect`].
//!
//! ```rust,no_run
//! # async fn example() -> Result<(), pong_view_client::GameViewError> {
//! use pong_view_client::{GameSession, GameViewConfig, MemoryFlagStore, WebSocketTransport};
//!
//! let socket = WebSocketTransport::connect("ws://localhost:3000/game").await?;
//! let (session, _events) = GameSession::mount(socket, MemoryFlagStore::new(), GameViewConfig::new());
//! session.toggle_ready()?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::protocol::Message;
use tracing::{debug, info, warn};

use crate::error::GameViewError;
use crate::transport::Transport;

/// The socket type produced by [`tokio_tungstenite::connect_async`].
pub type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// Text-frame [`Transport`] on top of a WebSocket.
///
/// Non-text frames are skipped. A close frame or the end of the stream ends
/// [`recv`](Transport::recv) with `None`. `recv` is cancel-safe.
#[derive(Debug)]
pub struct WebSocketTransport {
    stream: WsStream,
    closed: bool,
}

impl WebSocketTransport {
    /// Open a socket to `url`.
    ///
    /// # Errors
    ///
    /// Returns [`GameViewError::Io`] when the URL is malformed or the
    /// handshake fails. An underlying I/O error keeps its
    /// [`ErrorKind`](std::io::ErrorKind).
    pub async fn connect(url: &str) -> Result<Self, GameViewError> {
        debug!(%url, "opening game socket");
        let (stream, _response) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| {
                let kind = match &e {
                    tokio_tungstenite::tungstenite::Error::Io(io) => io.kind(),
                    _ => std::io::ErrorKind::Other,
                };
                GameViewError::Io(std::io::Error::new(kind, e))
            })?;
        info!(%url, "game socket open");
        Ok(Self::from_stream(stream))
    }

    /// Wrap a socket the caller already opened (custom TLS, headers, proxy).
    pub fn from_stream(stream: WsStream) -> Self {
        Self {
            stream,
            closed: false,
        }
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn send(&mut self, frame: String) -> Result<(), GameViewError> {
        if self.closed {
            return Err(GameViewError::TransportClosed);
        }
        self.stream
            .send(Message::Text(frame.into()))
            .await
            .map_err(|e| GameViewError::TransportSend(e.to_string()))
    }

    async fn recv(&mut self) -> Option<Result<String, GameViewError>> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text.to_string())),
                Ok(Message::Close(frame)) => {
                    debug!(?frame, "game socket closed by peer");
                    return None;
                }
                Ok(Message::Binary(bytes)) => {
                    warn!(len = bytes.len(), "skipping binary frame");
                }
                // Pings are answered by tungstenite itself.
                Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => {}
                Err(e) => return Some(Err(GameViewError::TransportReceive(e.to_string()))),
            }
        }
    }

    async fn close(&mut self) -> Result<(), GameViewError> {
        if std::mem::replace(&mut self.closed, true) {
            return Ok(());
        }
        self.stream
            .close(None)
            .await
            .map_err(|e| GameViewError::TransportSend(e.to_string()))
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use crate::config::GameViewConfig;
    use crate::event::ViewEvent;
    use crate::flag_store::MemoryFlagStore;
    use crate::session::GameSession;
    use tokio::net::{TcpListener, TcpStream};
    use tokio_tungstenite::WebSocketStream;

    /// Accept one socket on a local port, run `server` on it and return the
    /// URL to dial.
    async fn game_server<F, Fut>(server: F) -> String
    where
        F: FnOnce(WebSocketStream<TcpStream>) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = ()> + Send,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            server(ws).await;
        });
        format!("ws://{addr}")
    }

    #[tokio::test]
    async fn malformed_url_is_an_io_error() {
        let err = WebSocketTransport::connect("pong").await.unwrap_err();
        assert!(matches!(err, GameViewError::Io(_)));
    }

    #[tokio::test]
    async fn binary_frames_are_skipped() {
        let url = game_server(|mut ws| async move {
            ws.send(Message::Binary(vec![1, 2, 3].into())).await.unwrap();
            ws.send(Message::Text(r#"{"event":"getWatcher"}"#.into()))
                .await
                .unwrap();
            ws.close(None).await.unwrap();
        })
        .await;

        let mut socket = WebSocketTransport::connect(&url).await.unwrap();
        assert_eq!(
            socket.recv().await.unwrap().unwrap(),
            r#"{"event":"getWatcher"}"#
        );
        assert!(socket.recv().await.is_none());
    }

    #[tokio::test]
    async fn send_after_close_fails_and_close_is_idempotent() {
        let url = game_server(|mut ws| async move { while let Some(Ok(_)) = ws.next().await {} })
            .await;

        let mut socket = WebSocketTransport::connect(&url).await.unwrap();
        socket.close().await.unwrap();
        socket.close().await.unwrap();
        assert!(matches!(
            socket.send(r#"{"event":"postLeaveGame"}"#.into()).await,
            Err(GameViewError::TransportClosed)
        ));
    }

    #[tokio::test]
    async fn session_over_a_real_socket() {
        let url = game_server(|mut ws| async move {
            // Wait for the ready toggle, then confirm the start.
            while let Some(Ok(msg)) = ws.next().await {
                if msg.to_text().unwrap_or_default().contains("postReadyGame") {
                    ws.send(Message::Text(
                        r#"{"event":"setStartGame","data":"start"}"#.into(),
                    ))
                    .await
                    .unwrap();
                    break;
                }
            }
            ws.close(None).await.unwrap();
        })
        .await;

        let (ws_stream, _) = tokio_tungstenite::connect_async(&url).await.unwrap();
        let flags = MemoryFlagStore::new();
        let (session, mut events) = GameSession::mount(
            WebSocketTransport::from_stream(ws_stream),
            flags.clone(),
            GameViewConfig::new(),
        );

        session.toggle_ready().unwrap();
        let mut seen = Vec::new();
        while let Some(event) = events.recv().await {
            let done = matches!(event, ViewEvent::Disconnected { .. });
            seen.push(event);
            if done {
                break;
            }
        }

        assert!(seen.contains(&ViewEvent::LifecycleChanged {
            from: crate::lifecycle::LifecycleState::Ready,
            to: crate::lifecycle::LifecycleState::Playing,
        }));
        assert_eq!(flags.get("startGame"), Some(true));
    }
}
