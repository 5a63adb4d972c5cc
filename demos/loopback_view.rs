//! # Loopback View Demo
//!
//! Mounts a game view on an in-process loopback transport and plays a short
//! scripted match against a fake server task:
//!
//! 1. The player clicks "ready" and toggles difficulty twice
//! 2. The server confirms the start and streams a few snapshots
//! 3. The player moves the paddle, then leaves
//!
//! Draw calls go to a surface that logs them instead of painting pixels.
//!
//! ## Running
//!
//! ```sh
//! RUST_LOG=debug cargo run --example loopback_view
//! ```

use async_trait::async_trait;
use pong_view_client::render::{Color, Font, Rect};
use pong_view_client::{
    DrawSurface, GameSession, GameViewConfig, GameViewError, MemoryFlagStore, Transport,
    ViewEvent,
};
use serde_json::json;
use tokio::sync::mpsc;

// ─────────────────────────────────────────────────────────────────────
// Loopback transport
// ─────────────────────────────────────────────────────────────────────

/// Client half of an in-process channel pair.
struct LoopbackTransport {
    tx: mpsc::UnboundedSender<String>,
    rx: mpsc::UnboundedReceiver<String>,
}

/// Server half: read what the view sent, push frames to it.
struct LoopbackServer {
    rx: mpsc::UnboundedReceiver<String>,
    tx: mpsc::UnboundedSender<String>,
}

fn loopback_pair() -> (LoopbackTransport, LoopbackServer) {
    let (client_tx, server_rx) = mpsc::unbounded_channel();
    let (server_tx, client_rx) = mpsc::unbounded_channel();
    (
        LoopbackTransport {
            tx: client_tx,
            rx: client_rx,
        },
        LoopbackServer {
            rx: server_rx,
            tx: server_tx,
        },
    )
}

#[async_trait]
impl Transport for LoopbackTransport {
    async fn send(&mut self, frame: String) -> Result<(), GameViewError> {
        self.tx
            .send(frame)
            .map_err(|e| GameViewError::TransportSend(e.to_string()))
    }

    async fn recv(&mut self) -> Option<Result<String, GameViewError>> {
        // `mpsc::UnboundedReceiver::recv` is cancel-safe.
        self.rx.recv().await.map(Ok)
    }

    async fn close(&mut self) -> Result<(), GameViewError> {
        self.rx.close();
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────
// Logging surface
// ─────────────────────────────────────────────────────────────────────

struct LogSurface;

impl DrawSurface for LogSurface {
    fn clear_rect(&mut self, rect: Rect) {
        tracing::debug!("clear {}x{}", rect.width, rect.height);
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        tracing::debug!(?color, "rect at ({}, {})", rect.x, rect.y);
    }

    fn fill_circle(&mut self, x: f64, y: f64, radius: f64, color: Color) {
        tracing::debug!(?color, "ball at ({x}, {y}) r={radius}");
    }

    fn fill_text(&mut self, text: &str, _x: f64, _y: f64, font: &Font, _color: Color) {
        tracing::info!("score {text} ({}px {})", font.size_px, font.family);
    }
}

// ─────────────────────────────────────────────────────────────────────
// Fake server
// ─────────────────────────────────────────────────────────────────────

fn snapshot(tick: u32) -> String {
    let t = f64::from(tick);
    json!({
        "event": "updateGame",
        "data": {
            "paddles_": [
                {"x_": 10, "y_": 200.0 + t * 5.0, "width_": 10, "height_": 80},
                {"x_": 480, "y_": 200.0 - t * 5.0, "width_": 10, "height_": 80}
            ],
            "ball_": {"x_": 250.0 + t * 12.0, "y_": 250.0 - t * 7.0},
            "score_": format!("{} : 0", tick / 3)
        }
    })
    .to_string()
}

async fn run_server(mut server: LoopbackServer) {
    while let Some(frame) = server.rx.recv().await {
        tracing::info!("server received {frame}");
        if frame.contains("postReadyGame") {
            let _ = server
                .tx
                .send(json!({"event": "setStartGame", "data": "start"}).to_string());
            for tick in 0..6 {
                let _ = server.tx.send(snapshot(tick));
            }
        }
        if frame.contains("postLeaveGame") {
            break;
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let (transport, server) = loopback_pair();
    let server = tokio::spawn(run_server(server));

    let (session, mut events) =
        GameSession::mount(transport, MemoryFlagStore::new(), GameViewConfig::new());
    session.attach_surface(Box::new(LogSurface))?;

    session.toggle_difficulty()?;
    session.toggle_difficulty()?;
    session.toggle_ready()?;

    let mut snapshots = 0;
    while let Some(event) = events.recv().await {
        match event {
            ViewEvent::LifecycleChanged { from, to } => {
                tracing::info!("lifecycle {from:?} -> {to:?}");
            }
            ViewEvent::SnapshotUpdated => {
                snapshots += 1;
                session.press_key(if snapshots % 2 == 0 { "ArrowLeft" } else { "ArrowRight" })?;
                if snapshots == 6 {
                    session.leave()?;
                    break;
                }
            }
            ViewEvent::Notice { message } => tracing::warn!("server says: {message}"),
            ViewEvent::Disconnected { reason } => {
                tracing::warn!("disconnected: {}", reason.as_deref().unwrap_or("closed"));
                break;
            }
            other => tracing::debug!("{other:?}"),
        }
    }

    tracing::info!("final status: {:?}", session.status().await);
    session.unmount().await;
    server.await?;
    Ok(())
}
