//! Lifecycle state machine for the local participant.
//!
//! ```text
//!                 toggle ready                  setStartGame("start")
//!   NotReady <───────────────> Ready ─────────────────────────────> Playing
//!      │                         ▲
//!      │ toggle difficulty       │ toggle ready
//!      ▼                         │
//!   SelectingDifficulty ─────────┘
//!
//!   any (except Left) ── setStartGame(other) ──> NotReady
//!   any (except Left) ── getWatcher ───────────> Spectating
//!   Spectating ── toggle ready / difficulty ───> Ready / SelectingDifficulty
//!   any (except Left) ── leave ────────────────> Left   (terminal)
//! ```
//!
//! `Playing` is only ever entered on a server-confirmed start. Local ready and
//! difficulty toggles are optimistic; the server stays authoritative.

use tracing::debug;

use crate::error::{GameViewError, Result};

/// Where the local participant is in the pre-game / in-game progression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LifecycleState {
    #[default]
    NotReady,
    Ready,
    SelectingDifficulty,
    Playing,
    Spectating,
    /// Terminal. The embedding page is expected to navigate away.
    Left,
}

impl LifecycleState {
    /// Whether the ready/difficulty controls are shown (and accepted).
    ///
    /// A spectator has not started a game, so the controls stay available.
    pub fn shows_pre_game_controls(self) -> bool {
        matches!(
            self,
            Self::NotReady | Self::Ready | Self::SelectingDifficulty | Self::Spectating
        )
    }

    /// Whether the ready button shows "ready".
    pub fn shows_ready(self) -> bool {
        matches!(self, Self::Ready)
    }

    /// Whether paddle movement keys are forwarded. Spectators still send
    /// them; the server decides whether they move anything.
    pub fn accepts_movement(self) -> bool {
        !self.is_terminal()
    }

    /// Returns `true` for [`LifecycleState::Left`].
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Left)
    }
}

/// Something that asks the lifecycle to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Local ready button.
    ToggleReady,
    /// Local difficulty button.
    ToggleDifficulty,
    /// Local leave button.
    Leave,
    /// Server pushed `setStartGame("start")`.
    StartConfirmed,
    /// Server pushed `setStartGame` with any other payload.
    StartRejected,
    /// Server pushed `getWatcher`.
    Watcher,
}

impl Trigger {
    /// New value of the persisted start flag implied by this trigger, if any.
    pub fn start_flag(self) -> Option<bool> {
        match self {
            Self::StartConfirmed => Some(true),
            Self::StartRejected => Some(false),
            _ => None,
        }
    }
}

/// The lifecycle state machine. Exactly one state is active at a time.
#[derive(Debug, Clone, Default)]
pub struct Lifecycle {
    state: LifecycleState,
}

impl Lifecycle {
    /// Create a lifecycle from the persisted start flag read at mount time.
    pub fn new(start_flag: bool) -> Self {
        let state = if start_flag {
            LifecycleState::Playing
        } else {
            LifecycleState::NotReady
        };
        Self { state }
    }

    /// The active state.
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Apply `trigger` and return the resulting state.
    ///
    /// # Errors
    ///
    /// Returns [`GameViewError::InvalidTransition`] when `trigger` is not
    /// legal from the current state. The state is left unchanged.
    pub fn transition(&mut self, trigger: Trigger) -> Result<LifecycleState> {
        let from = self.state;
        let to = next_state(from, trigger)
            .ok_or(GameViewError::InvalidTransition { from, trigger })?;
        if from != to {
            debug!(?from, ?to, ?trigger, "lifecycle transition");
        }
        self.state = to;
        Ok(to)
    }
}

fn next_state(from: LifecycleState, trigger: Trigger) -> Option<LifecycleState> {
    use LifecycleState::*;

    if from.is_terminal() {
        return None;
    }
    match trigger {
        Trigger::ToggleReady => match from {
            Ready => Some(NotReady),
            s if s.shows_pre_game_controls() => Some(Ready),
            _ => None,
        },
        Trigger::ToggleDifficulty => match from {
            Ready => Some(Ready),
            s if s.shows_pre_game_controls() => Some(SelectingDifficulty),
            _ => None,
        },
        Trigger::StartConfirmed => Some(Playing),
        Trigger::StartRejected => Some(NotReady),
        Trigger::Watcher => Some(Spectating),
        Trigger::Leave => Some(Left),
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

    const ALL_STATES: [LifecycleState; 6] = [
        LifecycleState::NotReady,
        LifecycleState::Ready,
        LifecycleState::SelectingDifficulty,
        LifecycleState::Playing,
        LifecycleState::Spectating,
        LifecycleState::Left,
    ];

    fn at(state: LifecycleState) -> Lifecycle {
        Lifecycle { state }
    }

    #[test]
    fn initial_state_follows_persisted_flag() {
        assert_eq!(Lifecycle::new(false).state(), LifecycleState::NotReady);
        assert_eq!(Lifecycle::new(true).state(), LifecycleState::Playing);
    }

    #[test]
    fn ready_toggles_back_and_forth() {
        let mut lc = Lifecycle::new(false);
        assert_eq!(lc.transition(Trigger::ToggleReady).unwrap(), LifecycleState::Ready);
        assert_eq!(lc.transition(Trigger::ToggleReady).unwrap(), LifecycleState::NotReady);
        assert_eq!(lc.transition(Trigger::ToggleReady).unwrap(), LifecycleState::Ready);
    }

    #[test]
    fn difficulty_selection_then_ready() {
        let mut lc = Lifecycle::new(false);
        assert_eq!(
            lc.transition(Trigger::ToggleDifficulty).unwrap(),
            LifecycleState::SelectingDifficulty
        );
        assert_eq!(
            lc.transition(Trigger::ToggleDifficulty).unwrap(),
            LifecycleState::SelectingDifficulty
        );
        assert_eq!(lc.transition(Trigger::ToggleReady).unwrap(), LifecycleState::Ready);
        // Changing difficulty while ready keeps the player ready.
        assert_eq!(lc.transition(Trigger::ToggleDifficulty).unwrap(), LifecycleState::Ready);
    }

    #[test]
    fn start_confirmed_enters_playing_from_every_live_state() {
        for state in ALL_STATES.into_iter().filter(|s| !s.is_terminal()) {
            let mut lc = at(state);
            assert_eq!(
                lc.transition(Trigger::StartConfirmed).unwrap(),
                LifecycleState::Playing,
                "from {state:?}"
            );
        }
    }

    #[test]
    fn start_rejected_returns_to_not_ready_from_every_live_state() {
        for state in ALL_STATES.into_iter().filter(|s| !s.is_terminal()) {
            let mut lc = at(state);
            assert_eq!(
                lc.transition(Trigger::StartRejected).unwrap(),
                LifecycleState::NotReady,
                "from {state:?}"
            );
        }
    }

    #[test]
    fn watcher_and_leave_apply_from_every_live_state() {
        for state in ALL_STATES.into_iter().filter(|s| !s.is_terminal()) {
            assert_eq!(
                at(state).transition(Trigger::Watcher).unwrap(),
                LifecycleState::Spectating
            );
            assert_eq!(at(state).transition(Trigger::Leave).unwrap(), LifecycleState::Left);
        }
    }

    #[test]
    fn pre_game_toggles_are_rejected_once_playing() {
        for trigger in [Trigger::ToggleReady, Trigger::ToggleDifficulty] {
            let mut lc = at(LifecycleState::Playing);
            let err = lc.transition(trigger).unwrap_err();
            assert!(matches!(
                err,
                GameViewError::InvalidTransition {
                    from: LifecycleState::Playing,
                    ..
                }
            ));
            assert_eq!(lc.state(), LifecycleState::Playing);
        }
    }

    #[test]
    fn spectator_can_still_use_pre_game_controls() {
        assert_eq!(
            at(LifecycleState::Spectating)
                .transition(Trigger::ToggleReady)
                .unwrap(),
            LifecycleState::Ready
        );
        assert_eq!(
            at(LifecycleState::Spectating)
                .transition(Trigger::ToggleDifficulty)
                .unwrap(),
            LifecycleState::SelectingDifficulty
        );
    }

    #[test]
    fn only_ready_shows_ready() {
        for state in ALL_STATES {
            assert_eq!(state.shows_ready(), state == LifecycleState::Ready, "{state:?}");
        }
    }

    #[test]
    fn left_is_terminal() {
        for trigger in [
            Trigger::ToggleReady,
            Trigger::ToggleDifficulty,
            Trigger::Leave,
            Trigger::StartConfirmed,
            Trigger::StartRejected,
            Trigger::Watcher,
        ] {
            let mut lc = at(LifecycleState::Left);
            assert!(lc.transition(trigger).is_err(), "{trigger:?} escaped Left");
            assert_eq!(lc.state(), LifecycleState::Left);
        }
    }

    #[test]
    fn only_start_triggers_touch_the_persisted_flag() {
        assert_eq!(Trigger::StartConfirmed.start_flag(), Some(true));
        assert_eq!(Trigger::StartRejected.start_flag(), Some(false));
        assert_eq!(Trigger::Watcher.start_flag(), None);
        assert_eq!(Trigger::Leave.start_flag(), None);
        assert_eq!(Trigger::ToggleReady.start_flag(), None);
    }

    #[test]
    fn control_gating() {
        assert!(LifecycleState::SelectingDifficulty.shows_pre_game_controls());
        assert!(!LifecycleState::Playing.shows_pre_game_controls());
        assert!(LifecycleState::Spectating.shows_pre_game_controls());
        assert!(LifecycleState::Spectating.accepts_movement());
        assert!(!LifecycleState::Left.shows_pre_game_controls());
        assert!(!LifecycleState::Left.accepts_movement());
    }
}
