//! Error types for the game view client.

use thiserror::Error;

use crate::lifecycle::{LifecycleState, Trigger};

/// Errors that can occur while driving a game view.
#[derive(Debug, Error)]
pub enum GameViewError {
    /// Failed to send an outbound event through the transport.
    #[error("transport send error: {0}")]
    TransportSend(String),

    /// Failed to receive an inbound event from the transport.
    #[error("transport receive error: {0}")]
    TransportReceive(String),

    /// The transport connection was closed.
    #[error("transport connection closed")]
    TransportClosed,

    /// Failed to serialize or deserialize a wire event.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The view has been unmounted (or its transport ended) and no longer
    /// accepts local actions.
    #[error("game view is not mounted")]
    NotMounted,

    /// A lifecycle trigger is not legal from the current state.
    ///
    /// Never surfaced to the player; callers log it and move on.
    #[error("invalid lifecycle transition: {trigger:?} from {from:?}")]
    InvalidTransition {
        /// State the machine was in when the trigger arrived.
        from: LifecycleState,
        /// The rejected trigger.
        trigger: Trigger,
    },

    /// The persistent flag store could not be read or written.
    #[error("flag store error: {0}")]
    FlagStore(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized [`Result`] type for game view operations.
pub type Result<T> = std::result::Result<T, GameViewError>;
