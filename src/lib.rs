//! # Pong View Client
//!
//! Client-side view synchronizer for a two-player paddle-and-ball game.
//!
//! A mounted view listens for server pushes on an already-connected
//! bidirectional channel, keeps the latest authoritative [`GameSnapshot`],
//! draws it onto a 500×500 surface, and turns local key presses and control
//! toggles into outbound events. The pre-game, playing and spectating states
//! are tracked by a small lifecycle state machine, and a persisted
//! `startGame` flag restores the playing state across reloads.
//!
//! ## Layers
//!
//! - [`GameView`] is the synchronous core: feed it [`InboundEvent`]s and
//!   [`LocalAction`](input::LocalAction)s, read back [`ViewEvent`]s and
//!   [`OutboundEvent`]s.
//! - [`GameSession`] (feature `tokio-runtime`) drives a [`GameView`] from any
//!   [`Transport`] on a background task.
//! - [`WebSocketTransport`] (feature `transport-websocket`, on by default) is
//!   a ready-made transport.
//!
//! ## Quick Start
//!
//! ```
//! use pong_view_client::{GameView, GameViewConfig, MemoryFlagStore, RecordingSurface};
//! use pong_view_client::input::LocalAction;
//! use pong_view_client::lifecycle::LifecycleState;
//!
//! let mut view = GameView::mount(MemoryFlagStore::new(), &GameViewConfig::new());
//! view.attach_surface(Box::new(RecordingSurface::new()));
//!
//! let outcome = view.handle_action(&LocalAction::ToggleReady);
//! assert_eq!(view.lifecycle(), LifecycleState::Ready);
//! assert_eq!(outcome.outbound.map(|e| e.name()), Some("postReadyGame"));
//! ```

pub mod config;
pub mod error;
pub mod event;
pub mod flag_store;
pub mod ingestion;
pub mod input;
pub mod lifecycle;
pub mod protocol;
pub mod render;
#[cfg(feature = "tokio-runtime")]
pub mod session;
pub mod snapshot;
pub mod transport;
pub mod transports;
pub mod view;

// Re-export primary types for ergonomic imports.
pub use config::GameViewConfig;
pub use error::GameViewError;
pub use event::ViewEvent;
pub use flag_store::{FlagStore, JsonFileFlagStore, MemoryFlagStore};
pub use protocol::{GameSnapshot, InboundEvent, OutboundEvent};
pub use render::{DrawSurface, RecordingSurface};
#[cfg(feature = "tokio-runtime")]
pub use session::GameSession;
pub use transport::Transport;
#[cfg(feature = "transport-websocket")]
pub use transports::WebSocketTransport;
pub use view::GameView;
