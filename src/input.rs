//! Maps local player intent to outbound events.
//!
//! Every action is checked against the current [`Lifecycle`] first. Illegal
//! actions (a ready click after the game started, anything after leaving) are
//! dropped with a debug log; legal ones update the lifecycle optimistically
//! and yield the event to send.

use tracing::debug;

use crate::lifecycle::{Lifecycle, Trigger};
use crate::protocol::{Difficulty, KeyDirection, OutboundEvent};

/// A keyboard key, named the way browsers report `KeyboardEvent.key`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    ArrowLeft,
    ArrowRight,
    Other(String),
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        match name {
            "ArrowLeft" => Self::ArrowLeft,
            "ArrowRight" => Self::ArrowRight,
            other => Self::Other(other.to_owned()),
        }
    }
}

impl Key {
    /// Paddle direction bound to this key. Left moves up, right moves down.
    pub fn direction(&self) -> Option<KeyDirection> {
        match self {
            Self::ArrowLeft => Some(KeyDirection::Up),
            Self::ArrowRight => Some(KeyDirection::Down),
            Self::Other(_) => None,
        }
    }
}

/// A local UI action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalAction {
    Key(Key),
    ToggleReady,
    ToggleDifficulty,
    Leave,
}

/// Speculative difficulty choice.
///
/// Starts untouched. The first toggle only selects `Hard` locally; every later
/// toggle announces the value it switches to, computed from the value before
/// the toggle (`Hard` announces `normal`, `Normal` announces `hard`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DifficultyToggle {
    choice: Option<Difficulty>,
}

impl DifficultyToggle {
    /// Difficulty currently displayed. Untouched reads as `Normal`.
    pub fn current(self) -> Difficulty {
        self.choice.unwrap_or_default()
    }

    /// Flip the local choice and return the event to announce, if any.
    pub fn toggle(&mut self) -> Option<OutboundEvent> {
        let before = self.choice;
        self.choice = Some(self.current().flipped());
        before.map(|d| OutboundEvent::PostDifficulty(d.flipped()))
    }
}

/// Local input state plus the action-to-event mapping.
#[derive(Debug, Clone, Default)]
pub struct InputMapper {
    difficulty: DifficultyToggle,
}

impl InputMapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Difficulty shown on the difficulty button.
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty.current()
    }

    /// Handle `action` against `lifecycle` and return the event to emit.
    pub fn handle(
        &mut self,
        action: &LocalAction,
        lifecycle: &mut Lifecycle,
    ) -> Option<OutboundEvent> {
        match action {
            LocalAction::Key(key) => {
                if !lifecycle.state().accepts_movement() {
                    debug!(?key, state = ?lifecycle.state(), "ignoring key");
                    return None;
                }
                key.direction().map(OutboundEvent::PostKey)
            }
            LocalAction::ToggleReady => {
                apply(lifecycle, Trigger::ToggleReady)?;
                Some(OutboundEvent::PostReadyGame)
            }
            LocalAction::ToggleDifficulty => {
                apply(lifecycle, Trigger::ToggleDifficulty)?;
                self.difficulty.toggle()
            }
            LocalAction::Leave => {
                apply(lifecycle, Trigger::Leave)?;
                Some(OutboundEvent::PostLeaveGame)
            }
        }
    }
}

fn apply(lifecycle: &mut Lifecycle, trigger: Trigger) -> Option<()> {
    match lifecycle.transition(trigger) {
        Ok(_) => Some(()),
        Err(e) => {
            debug!("ignoring local action: {e}");
            None
        }
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
    use crate::lifecycle::LifecycleState;

    #[test]
    fn arrow_keys_map_to_paddle_directions() {
        let mut input = InputMapper::new();
        let mut lc = Lifecycle::new(true);
        assert_eq!(
            input.handle(&LocalAction::Key("ArrowLeft".into()), &mut lc),
            Some(OutboundEvent::PostKey(KeyDirection::Up))
        );
        assert_eq!(
            input.handle(&LocalAction::Key("ArrowRight".into()), &mut lc),
            Some(OutboundEvent::PostKey(KeyDirection::Down))
        );
        assert_eq!(input.handle(&LocalAction::Key("ArrowUp".into()), &mut lc), None);
        assert_eq!(input.handle(&LocalAction::Key(" ".into()), &mut lc), None);
    }

    #[test]
    fn every_keydown_emits_without_debounce() {
        let mut input = InputMapper::new();
        let mut lc = Lifecycle::new(false);
        let sent: Vec<_> = (0..5)
            .filter_map(|_| input.handle(&LocalAction::Key(Key::ArrowLeft), &mut lc))
            .collect();
        assert_eq!(sent.len(), 5);
    }

    #[test]
    fn ready_toggle_always_sends_the_same_event() {
        let mut input = InputMapper::new();
        let mut lc = Lifecycle::new(false);
        let mut displayed = Vec::new();
        for _ in 0..4 {
            assert_eq!(
                input.handle(&LocalAction::ToggleReady, &mut lc),
                Some(OutboundEvent::PostReadyGame)
            );
            displayed.push(lc.state().shows_ready());
        }
        assert_eq!(displayed, [true, false, true, false]);
        assert_eq!(lc.state(), LifecycleState::NotReady);
    }

    #[test]
    fn difficulty_first_toggle_is_silent_then_alternates() {
        let mut input = InputMapper::new();
        let mut lc = Lifecycle::new(false);
        assert_eq!(input.difficulty(), Difficulty::Normal);

        assert_eq!(input.handle(&LocalAction::ToggleDifficulty, &mut lc), None);
        assert_eq!(input.difficulty(), Difficulty::Hard);

        assert_eq!(
            input.handle(&LocalAction::ToggleDifficulty, &mut lc),
            Some(OutboundEvent::PostDifficulty(Difficulty::Normal))
        );
        assert_eq!(input.difficulty(), Difficulty::Normal);

        assert_eq!(
            input.handle(&LocalAction::ToggleDifficulty, &mut lc),
            Some(OutboundEvent::PostDifficulty(Difficulty::Hard))
        );
        assert_eq!(
            input.handle(&LocalAction::ToggleDifficulty, &mut lc),
            Some(OutboundEvent::PostDifficulty(Difficulty::Normal))
        );
        assert_eq!(lc.state(), LifecycleState::SelectingDifficulty);
    }

    #[test]
    fn pre_game_controls_are_ignored_while_playing() {
        let mut input = InputMapper::new();
        let mut lc = Lifecycle::new(true);
        assert_eq!(input.handle(&LocalAction::ToggleReady, &mut lc), None);
        assert_eq!(input.handle(&LocalAction::ToggleDifficulty, &mut lc), None);
        assert_eq!(input.difficulty(), Difficulty::Normal);
        assert_eq!(lc.state(), LifecycleState::Playing);
    }

    #[test]
    fn spectators_keep_the_pre_game_controls() {
        let mut input = InputMapper::new();
        let mut lc = Lifecycle::new(false);
        lc.transition(Trigger::Watcher).unwrap();
        assert_eq!(
            input.handle(&LocalAction::ToggleReady, &mut lc),
            Some(OutboundEvent::PostReadyGame)
        );
        assert_eq!(lc.state(), LifecycleState::Ready);

        lc.transition(Trigger::Watcher).unwrap();
        assert_eq!(input.handle(&LocalAction::ToggleDifficulty, &mut lc), None);
        assert_eq!(lc.state(), LifecycleState::SelectingDifficulty);
    }

    #[test]
    fn leave_emits_once_and_silences_everything_after() {
        let mut input = InputMapper::new();
        let mut lc = Lifecycle::new(true);
        assert_eq!(
            input.handle(&LocalAction::Leave, &mut lc),
            Some(OutboundEvent::PostLeaveGame)
        );
        assert_eq!(lc.state(), LifecycleState::Left);

        for action in [
            LocalAction::Leave,
            LocalAction::ToggleReady,
            LocalAction::ToggleDifficulty,
            LocalAction::Key(Key::ArrowLeft),
        ] {
            assert_eq!(input.handle(&action, &mut lc), None, "{action:?}");
        }
    }

    #[test]
    fn key_names_parse_like_browser_events() {
        assert_eq!(Key::from("ArrowLeft"), Key::ArrowLeft);
        assert_eq!(Key::from("ArrowRight"), Key::ArrowRight);
        assert_eq!(Key::from("a"), Key::Other("a".into()));
    }
}
