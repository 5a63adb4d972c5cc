//! Storage for the most recent game snapshot.

use tracing::debug;

use crate::protocol::GameSnapshot;

/// How the store treats a snapshot that arrives after a newer one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SnapshotOrdering {
    /// Newest push always wins. No staleness check.
    #[default]
    LastWriteWins,
    /// Drop snapshots whose `seq` is not greater than the stored one.
    /// Snapshots without a `seq` are always accepted.
    Monotonic,
}

/// Holds the single most recently accepted [`GameSnapshot`].
#[derive(Debug, Clone, Default)]
pub struct SnapshotStore {
    current: Option<GameSnapshot>,
    ordering: SnapshotOrdering,
    /// Highest `seq` accepted so far. Only ever moves up.
    last_seq: Option<u64>,
}

impl SnapshotStore {
    /// Create an empty store with the given ordering policy.
    pub fn new(ordering: SnapshotOrdering) -> Self {
        Self {
            current: None,
            ordering,
            last_seq: None,
        }
    }

    /// Replace the stored snapshot. Returns `false` if the snapshot was
    /// dropped as stale.
    ///
    /// Replacing never draws anything; the caller decides when to render.
    pub fn replace(&mut self, snapshot: GameSnapshot) -> bool {
        if self.ordering == SnapshotOrdering::Monotonic {
            if let (Some(last), Some(incoming)) = (self.last_seq, snapshot.seq) {
                if incoming <= last {
                    debug!(last, incoming, "dropping stale snapshot");
                    return false;
                }
            }
        }
        if let Some(incoming) = snapshot.seq {
            self.last_seq = Some(self.last_seq.map_or(incoming, |last| last.max(incoming)));
        }
        self.current = Some(snapshot);
        true
    }

    /// The stored snapshot, or `None` before the first update.
    pub fn current(&self) -> Option<&GameSnapshot> {
        self.current.as_ref()
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
    use crate::protocol::{Ball, Paddle, Score};

    fn snapshot(ball_x: f64, seq: Option<u64>) -> GameSnapshot {
        let paddle = Paddle {
            x: 0.0,
            y: 200.0,
            width: 10.0,
            height: 80.0,
        };
        GameSnapshot {
            paddles: [paddle, paddle],
            ball: Ball { x: ball_x, y: 250.0 },
            score: Score::Text("0 : 0".into()),
            seq,
        }
    }

    #[test]
    fn empty_until_first_replace() {
        let store = SnapshotStore::default();
        assert!(store.current().is_none());
    }

    #[test]
    fn last_write_wins_ignores_sequence_numbers() {
        let mut store = SnapshotStore::new(SnapshotOrdering::LastWriteWins);
        assert!(store.replace(snapshot(1.0, Some(10))));
        assert!(store.replace(snapshot(2.0, Some(3))));
        assert_eq!(store.current(), Some(&snapshot(2.0, Some(3))));
    }

    #[test]
    fn monotonic_drops_stale_and_duplicate_sequence_numbers() {
        let mut store = SnapshotStore::new(SnapshotOrdering::Monotonic);
        assert!(store.replace(snapshot(1.0, Some(5))));
        assert!(!store.replace(snapshot(2.0, Some(4))));
        assert!(!store.replace(snapshot(3.0, Some(5))));
        assert_eq!(store.current().unwrap().ball.x, 1.0);
        assert!(store.replace(snapshot(4.0, Some(6))));
        assert_eq!(store.current().unwrap().ball.x, 4.0);
    }

    #[test]
    fn monotonic_accepts_unsequenced_snapshots() {
        let mut store = SnapshotStore::new(SnapshotOrdering::Monotonic);
        assert!(store.replace(snapshot(1.0, None)));
        assert!(store.replace(snapshot(2.0, Some(5))));
        assert!(store.replace(snapshot(3.0, None)));
        assert_eq!(store.current().unwrap().ball.x, 3.0);
    }

    #[test]
    fn unsequenced_snapshot_does_not_reset_the_high_water_mark() {
        let mut store = SnapshotStore::new(SnapshotOrdering::Monotonic);
        assert!(store.replace(snapshot(1.0, Some(5))));
        assert!(store.replace(snapshot(2.0, None)));
        assert!(!store.replace(snapshot(3.0, Some(1))));
        assert!(!store.replace(snapshot(4.0, Some(5))));
        assert_eq!(store.current().unwrap().ball.x, 2.0);
        assert!(store.replace(snapshot(5.0, Some(6))));
        assert_eq!(store.current().unwrap().seq, Some(6));
    }

    #[test]
    fn last_write_wins_still_tracks_sequence_for_later_switches() {
        let mut store = SnapshotStore::new(SnapshotOrdering::LastWriteWins);
        assert!(store.replace(snapshot(1.0, Some(9))));
        assert!(store.replace(snapshot(2.0, Some(2))));
        assert_eq!(store.last_seq, Some(9));
    }
}
