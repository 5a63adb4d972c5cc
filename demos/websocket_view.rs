//! # WebSocket View Demo
//!
//! Connects to a game server, mounts the view and mirrors its events to the
//! log until the connection drops or Ctrl+C is pressed. The start flag is
//! kept in `pong-flags.json`, so restarting mid-game resumes in `Playing`.
//!
//! ## Running
//!
//! ```sh
//! PONG_URL=ws://localhost:3000/game cargo run --example websocket_view
//! ```

use pong_view_client::{
    GameSession, GameViewConfig, JsonFileFlagStore, RecordingSurface, Transport, ViewEvent,
    WebSocketTransport,
};

/// Default server URL when `PONG_URL` is not set.
const DEFAULT_URL: &str = "ws://localhost:3000/game";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let url = std::env::var("PONG_URL").unwrap_or_else(|_| DEFAULT_URL.to_string());
    let transport = WebSocketTransport::connect(&url).await?;

    let (session, mut events) = GameSession::mount(
        transport,
        JsonFileFlagStore::new("pong-flags.json"),
        GameViewConfig::new(),
    );
    let surface = RecordingSurface::new();
    session.attach_surface(Box::new(surface.clone()))?;
    session.toggle_ready()?;

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                match event {
                    ViewEvent::Mounted { lifecycle } => tracing::info!("mounted in {lifecycle:?}"),
                    ViewEvent::SnapshotUpdated => {
                        let frame = surface.commands();
                        surface.reset();
                        tracing::debug!("drew {} commands", frame.len());
                    }
                    ViewEvent::LifecycleChanged { from, to } => {
                        tracing::info!("lifecycle {from:?} -> {to:?}");
                    }
                    ViewEvent::Notice { message } => tracing::warn!("server: {message}"),
                    ViewEvent::Spectating { payload } => tracing::info!("spectating: {payload}"),
                    ViewEvent::Disconnected { reason } => {
                        tracing::warn!("disconnected: {}", reason.as_deref().unwrap_or("closed"));
                        break;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("leaving game");
                session.leave()?;
                break;
            }
        }
    }

    if let Some(mut transport) = session.unmount().await {
        transport.close().await?;
    }
    Ok(())
}
