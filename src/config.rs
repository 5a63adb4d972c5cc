//! Configuration for a mounted game view.

use std::time::Duration;

use crate::render::RenderStyle;
use crate::snapshot::SnapshotOrdering;

/// Default capacity of the bounded view event channel.
const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 256;

/// Default timeout for a graceful unmount.
const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

/// Default key of the persisted "game started" flag.
pub const DEFAULT_START_FLAG_KEY: &str = "startGame";

// ── Configuration ───────────────────────────────────────────────────

/// Configuration for a [`GameSession`](crate::session::GameSession) and the
/// [`GameView`](crate::view::GameView) it drives.
///
/// # Example
///
/// ```
/// use pong_view_client::config::GameViewConfig;
/// use pong_view_client::snapshot::SnapshotOrdering;
/// use std::time::Duration;
///
/// let config = GameViewConfig::new()
///     .with_event_channel_capacity(64)
///     .with_shutdown_timeout(Duration::from_millis(250))
///     .with_snapshot_ordering(SnapshotOrdering::Monotonic);
/// assert_eq!(config.start_flag_key, "startGame");
/// ```
#[derive(Debug, Clone)]
pub struct GameViewConfig {
    /// Capacity of the bounded view event channel.
    ///
    /// When the UI cannot keep up, events are dropped (with a warning) so the
    /// loop never blocks. `Disconnected` is always delivered.
    ///
    /// Defaults to **256**. Values below 1 are clamped to 1.
    pub event_channel_capacity: usize,
    /// How long [`GameSession::unmount`](crate::session::GameSession::unmount)
    /// waits for the loop before aborting it.
    ///
    /// Defaults to **1 second**.
    pub shutdown_timeout: Duration,
    /// Flag store key of the persisted start flag. Defaults to `"startGame"`.
    pub start_flag_key: String,
    /// Staleness policy for incoming snapshots.
    pub snapshot_ordering: SnapshotOrdering,
    pub render_style: RenderStyle,
}

impl Default for GameViewConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl GameViewConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self {
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            start_flag_key: DEFAULT_START_FLAG_KEY.to_owned(),
            snapshot_ordering: SnapshotOrdering::default(),
            render_style: RenderStyle::default(),
        }
    }

    /// Set the capacity of the bounded event channel (clamped to at least 1).
    #[must_use]
    pub fn with_event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity.max(1);
        self
    }

    /// Set the graceful unmount timeout. Zero aborts the loop immediately.
    #[must_use]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Persist the start flag under a different key.
    #[must_use]
    pub fn with_start_flag_key(mut self, key: impl Into<String>) -> Self {
        self.start_flag_key = key.into();
        self
    }

    #[must_use]
    pub fn with_snapshot_ordering(mut self, ordering: SnapshotOrdering) -> Self {
        self.snapshot_ordering = ordering;
        self
    }

    #[must_use]
    pub fn with_render_style(mut self, style: RenderStyle) -> Self {
        self.render_style = style;
        self
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

    #[test]
    fn config_defaults() {
        let config = GameViewConfig::new();
        assert_eq!(config.event_channel_capacity, 256);
        assert_eq!(config.shutdown_timeout, Duration::from_secs(1));
        assert_eq!(config.start_flag_key, "startGame");
        assert_eq!(config.snapshot_ordering, SnapshotOrdering::LastWriteWins);
        assert_eq!(config.render_style, RenderStyle::default());
    }

    #[test]
    fn config_builder_methods() {
        let config = GameViewConfig::new()
            .with_event_channel_capacity(512)
            .with_shutdown_timeout(Duration::from_secs(5))
            .with_start_flag_key("lobby.startGame")
            .with_snapshot_ordering(SnapshotOrdering::Monotonic);
        assert_eq!(config.event_channel_capacity, 512);
        assert_eq!(config.shutdown_timeout, Duration::from_secs(5));
        assert_eq!(config.start_flag_key, "lobby.startGame");
        assert_eq!(config.snapshot_ordering, SnapshotOrdering::Monotonic);
    }

    #[test]
    fn event_channel_capacity_is_clamped_to_one() {
        let config = GameViewConfig::new().with_event_channel_capacity(0);
        assert_eq!(config.event_channel_capacity, 1);
    }
}
