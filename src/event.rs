//! Events surfaced by a mounted game view to the embedding UI.

use crate::lifecycle::LifecycleState;

/// Something the embedding UI may want to react to.
///
/// Delivered on the bounded channel returned from
/// [`GameSession::mount`](crate::session::GameSession::mount). When the UI
/// falls behind, events are dropped with a warning rather than stalling the
/// view; [`ViewEvent::Disconnected`] is the exception and always arrives.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewEvent {
    /// The view subscribed to the channel. Always the first event of a mount.
    Mounted {
        /// Initial state, `Playing` when the persisted start flag was set.
        lifecycle: LifecycleState,
    },
    /// A new snapshot was stored.
    SnapshotUpdated,
    /// The lifecycle moved to a different state.
    LifecycleChanged {
        from: LifecycleState,
        to: LifecycleState,
    },
    /// The server refused to start the game. Show `message` to the player as
    /// a blocking notice.
    Notice { message: String },
    /// The server marked this participant as a spectator.
    Spectating { payload: serde_json::Value },
    /// The view stopped listening, either on unmount or because the
    /// transport ended. Always the last event.
    Disconnected {
        /// `None` when the server closed the channel cleanly.
        reason: Option<String>,
    },
}
