//! The game view synchronizer core.
//!
//! [`GameView`] owns everything one mount of the game view needs: the
//! snapshot store, the lifecycle, local input state, the persisted start flag
//! and the drawing surface. It is synchronous and single-threaded; the
//! [`session`](crate::session) loop feeds it one event at a time and ships the
//! outbound events it returns.

use tracing::{debug, warn};

use crate::config::GameViewConfig;
use crate::event::ViewEvent;
use crate::flag_store::FlagStore;
use crate::ingestion::{ingest, Ingested};
use crate::input::{InputMapper, LocalAction};
use crate::lifecycle::{Lifecycle, LifecycleState};
use crate::protocol::{Difficulty, GameSnapshot, InboundEvent, OutboundEvent};
use crate::render::{paint, DrawSurface, RenderStyle};
use crate::snapshot::SnapshotStore;

/// Point-in-time copy of the view state, for the embedding UI.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ViewStatus {
    pub lifecycle: LifecycleState,
    pub snapshot: Option<GameSnapshot>,
    /// Label state of the ready button. Follows the lifecycle, so a rejected
    /// start also resets the button.
    pub ready_displayed: bool,
    /// Label state of the difficulty button.
    pub difficulty: Difficulty,
    /// Persisted "game started" flag.
    pub start_flag: bool,
}

/// Result of a local action.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ActionOutcome {
    /// Event to send to the server, if the action produces one.
    pub outbound: Option<OutboundEvent>,
    pub events: Vec<ViewEvent>,
}

/// State of one mounted game view.
pub struct GameView {
    store: SnapshotStore,
    lifecycle: Lifecycle,
    input: InputMapper,
    flags: Box<dyn FlagStore>,
    start_flag_key: String,
    start_flag: bool,
    surface: Option<Box<dyn DrawSurface + Send>>,
    style: RenderStyle,
}

impl GameView {
    /// Build the view, reading the persisted start flag once.
    ///
    /// An unreadable flag store is logged and treated as "not started".
    pub fn mount(flags: impl FlagStore, config: &GameViewConfig) -> Self {
        let start_flag = match flags.load(&config.start_flag_key) {
            Ok(flag) => flag.unwrap_or(false),
            Err(e) => {
                warn!(key = %config.start_flag_key, "failed to read start flag: {e}");
                false
            }
        };
        debug!(start_flag, "game view mounted");

        Self {
            store: SnapshotStore::new(config.snapshot_ordering),
            lifecycle: Lifecycle::new(start_flag),
            input: InputMapper::new(),
            flags: Box::new(flags),
            start_flag_key: config.start_flag_key.clone(),
            start_flag,
            surface: None,
            style: config.render_style.clone(),
        }
    }

    pub fn lifecycle(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    pub fn snapshot(&self) -> Option<&GameSnapshot> {
        self.store.current()
    }

    pub fn start_flag(&self) -> bool {
        self.start_flag
    }

    pub fn status(&self) -> ViewStatus {
        ViewStatus {
            lifecycle: self.lifecycle.state(),
            snapshot: self.store.current().cloned(),
            ready_displayed: self.lifecycle.state().shows_ready(),
            difficulty: self.input.difficulty(),
            start_flag: self.start_flag,
        }
    }

    /// Apply one server push and redraw if it changed what is on screen.
    pub fn handle_inbound(&mut self, event: InboundEvent) -> Vec<ViewEvent> {
        let mut events = Vec::new();
        match ingest(event, &mut self.store, &mut self.lifecycle) {
            Ingested::Snapshot { accepted: true } => {
                events.push(ViewEvent::SnapshotUpdated);
                self.render();
            }
            Ingested::Snapshot { accepted: false } | Ingested::Ignored => {}
            Ingested::StartVerdict {
                from,
                to,
                started,
                notice,
            } => {
                push_change(&mut events, from, to);
                if let Some(message) = notice {
                    events.push(ViewEvent::Notice { message });
                }
                if self.set_start_flag(started) {
                    self.render();
                }
            }
            Ingested::Watcher { from, to, payload } => {
                push_change(&mut events, from, to);
                events.push(ViewEvent::Spectating { payload });
            }
        }
        events
    }

    /// Apply one local action.
    pub fn handle_action(&mut self, action: &LocalAction) -> ActionOutcome {
        let from = self.lifecycle.state();
        let outbound = self.input.handle(action, &mut self.lifecycle);
        let mut events = Vec::new();
        push_change(&mut events, from, self.lifecycle.state());
        ActionOutcome { outbound, events }
    }

    /// Hand the view a drawing surface and draw the current frame on it.
    pub fn attach_surface(&mut self, surface: Box<dyn DrawSurface + Send>) -> bool {
        self.surface = Some(surface);
        self.render()
    }

    /// Take the drawing surface back. Rendering becomes a no-op.
    pub fn detach_surface(&mut self) -> Option<Box<dyn DrawSurface + Send>> {
        self.surface.take()
    }

    /// Draw the current snapshot. Returns `true` if a frame was drawn.
    ///
    /// Nothing is drawn without both a surface and a snapshot, or once the
    /// participant has left.
    pub fn render(&mut self) -> bool {
        if self.lifecycle.state().is_terminal() {
            return false;
        }
        paint(
            self.surface.as_deref_mut(),
            self.store.current(),
            &self.style,
        )
    }

    /// Update and persist the start flag. Returns `true` if it changed.
    fn set_start_flag(&mut self, value: bool) -> bool {
        if self.start_flag == value {
            return false;
        }
        self.start_flag = value;
        if let Err(e) = self.flags.store(&self.start_flag_key, value) {
            warn!(key = %self.start_flag_key, value, "failed to persist start flag: {e}");
        }
        true
    }
}

impl std::fmt::Debug for GameView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameView")
            .field("lifecycle", &self.lifecycle.state())
            .field("has_snapshot", &self.store.current().is_some())
            .field("start_flag", &self.start_flag)
            .field("has_surface", &self.surface.is_some())
            .finish()
    }
}

fn push_change(events: &mut Vec<ViewEvent>, from: LifecycleState, to: LifecycleState) {
    if from != to {
        events.push(ViewEvent::LifecycleChanged { from, to });
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
    use crate::flag_store::MemoryFlagStore;
    use crate::input::Key;
    use crate::protocol::{Ball, Paddle, Score};
    use crate::render::{DrawCommand, RecordingSurface};

    fn snapshot(n: u32) -> GameSnapshot {
        let paddle = Paddle {
            x: 0.0,
            y: f64::from(n),
            width: 10.0,
            height: 80.0,
        };
        GameSnapshot {
            paddles: [paddle, paddle],
            ball: Ball {
                x: f64::from(n),
                y: 100.0,
            },
            score: Score::Text(format!("{n} : 0")),
            seq: None,
        }
    }

    fn mounted(flags: &MemoryFlagStore) -> (GameView, RecordingSurface) {
        let mut view = GameView::mount(flags.clone(), &GameViewConfig::new());
        let recorder = RecordingSurface::new();
        view.attach_surface(Box::new(recorder.clone()));
        (view, recorder)
    }

    fn frames(recorder: &RecordingSurface) -> usize {
        recorder
            .commands()
            .iter()
            .filter(|c| matches!(c, DrawCommand::Clear(_)))
            .count()
    }

    #[test]
    fn mount_reads_the_persisted_start_flag() {
        let view = GameView::mount(
            MemoryFlagStore::with_flag("startGame", true),
            &GameViewConfig::new(),
        );
        assert_eq!(view.lifecycle(), LifecycleState::Playing);
        assert!(view.start_flag());

        let view = GameView::mount(MemoryFlagStore::new(), &GameViewConfig::new());
        assert_eq!(view.lifecycle(), LifecycleState::NotReady);
    }

    #[test]
    fn custom_flag_key_is_honoured() {
        let config = GameViewConfig::new().with_start_flag_key("room42.startGame");
        let view = GameView::mount(MemoryFlagStore::with_flag("room42.startGame", true), &config);
        assert_eq!(view.lifecycle(), LifecycleState::Playing);
    }

    #[test]
    fn last_snapshot_wins_across_lifecycle_events() {
        let flags = MemoryFlagStore::new();
        let (mut view, _) = mounted(&flags);
        view.handle_inbound(InboundEvent::UpdateGame(snapshot(1)));
        view.handle_inbound(InboundEvent::SetStartGame("start".into()));
        view.handle_inbound(InboundEvent::UpdateGame(snapshot(2)));
        view.handle_inbound(InboundEvent::GetWatcher(serde_json::Value::Null));
        view.handle_inbound(InboundEvent::UpdateGame(snapshot(3)));
        assert_eq!(view.snapshot(), Some(&snapshot(3)));
    }

    #[test]
    fn no_frame_before_the_first_snapshot() {
        let flags = MemoryFlagStore::new();
        let (mut view, recorder) = mounted(&flags);
        assert!(!view.render());
        assert!(recorder.commands().is_empty());

        let events = view.handle_inbound(InboundEvent::UpdateGame(snapshot(1)));
        assert_eq!(events, vec![ViewEvent::SnapshotUpdated]);
        assert_eq!(frames(&recorder), 1);
        assert_eq!(recorder.commands().len(), 6);
    }

    #[test]
    fn attaching_a_surface_draws_the_stored_snapshot() {
        let mut view = GameView::mount(MemoryFlagStore::new(), &GameViewConfig::new());
        view.handle_inbound(InboundEvent::UpdateGame(snapshot(4)));

        let recorder = RecordingSurface::new();
        assert!(view.attach_surface(Box::new(recorder.clone())));
        assert_eq!(frames(&recorder), 1);

        assert!(view.detach_surface().is_some());
        assert!(!view.render());
        assert_eq!(frames(&recorder), 1);
    }

    #[test]
    fn start_persists_and_redraws() {
        let flags = MemoryFlagStore::new();
        let (mut view, recorder) = mounted(&flags);
        view.handle_inbound(InboundEvent::UpdateGame(snapshot(1)));

        let events = view.handle_inbound(InboundEvent::SetStartGame("start".into()));
        assert_eq!(
            events,
            vec![ViewEvent::LifecycleChanged {
                from: LifecycleState::NotReady,
                to: LifecycleState::Playing,
            }]
        );
        assert_eq!(flags.get("startGame"), Some(true));
        assert_eq!(frames(&recorder), 2);

        // Same verdict again: no flag change, no extra frame.
        assert!(view
            .handle_inbound(InboundEvent::SetStartGame("start".into()))
            .is_empty());
        assert_eq!(frames(&recorder), 2);
    }

    #[test]
    fn rejected_start_surfaces_the_message_and_clears_the_flag() {
        let flags = MemoryFlagStore::with_flag("startGame", true);
        let (mut view, _) = mounted(&flags);

        let events = view.handle_inbound(InboundEvent::SetStartGame("stop".into()));
        assert_eq!(
            events,
            vec![
                ViewEvent::LifecycleChanged {
                    from: LifecycleState::Playing,
                    to: LifecycleState::NotReady,
                },
                ViewEvent::Notice {
                    message: "stop".into()
                },
            ]
        );
        assert_eq!(flags.get("startGame"), Some(false));
        assert_eq!(view.lifecycle(), LifecycleState::NotReady);
    }

    #[test]
    fn watcher_moves_to_spectating_without_touching_the_flag() {
        let flags = MemoryFlagStore::new();
        let (mut view, _) = mounted(&flags);
        let payload = serde_json::json!({"room": "A"});
        let events = view.handle_inbound(InboundEvent::GetWatcher(payload.clone()));
        assert_eq!(
            events,
            vec![
                ViewEvent::LifecycleChanged {
                    from: LifecycleState::NotReady,
                    to: LifecycleState::Spectating,
                },
                ViewEvent::Spectating { payload },
            ]
        );
        assert_eq!(flags.get("startGame"), None);
    }

    #[test]
    fn leave_then_updates_keep_storing_but_stop_drawing() {
        let flags = MemoryFlagStore::with_flag("startGame", true);
        let (mut view, recorder) = mounted(&flags);

        let outcome = view.handle_action(&LocalAction::Leave);
        assert_eq!(outcome.outbound, Some(OutboundEvent::PostLeaveGame));
        assert_eq!(
            outcome.events,
            vec![ViewEvent::LifecycleChanged {
                from: LifecycleState::Playing,
                to: LifecycleState::Left,
            }]
        );

        view.handle_inbound(InboundEvent::UpdateGame(snapshot(9)));
        assert_eq!(view.snapshot(), Some(&snapshot(9)));
        assert!(recorder.commands().is_empty());
    }

    #[test]
    fn ready_button_follows_a_rejected_start() {
        let mut view = GameView::mount(MemoryFlagStore::new(), &GameViewConfig::new());
        view.handle_action(&LocalAction::ToggleReady);
        assert!(view.status().ready_displayed);

        view.handle_inbound(InboundEvent::SetStartGame("opponent not ready".into()));
        let status = view.status();
        assert_eq!(status.lifecycle, LifecycleState::NotReady);
        assert!(!status.ready_displayed);

        let outcome = view.handle_action(&LocalAction::ToggleReady);
        assert_eq!(outcome.outbound, Some(OutboundEvent::PostReadyGame));
        let status = view.status();
        assert_eq!(status.lifecycle, LifecycleState::Ready);
        assert!(status.ready_displayed);
    }

    #[test]
    fn spectator_ready_click_is_sent() {
        let mut view = GameView::mount(MemoryFlagStore::new(), &GameViewConfig::new());
        view.handle_inbound(InboundEvent::GetWatcher(serde_json::Value::Null));
        let outcome = view.handle_action(&LocalAction::ToggleReady);
        assert_eq!(outcome.outbound, Some(OutboundEvent::PostReadyGame));
        assert_eq!(
            outcome.events,
            vec![ViewEvent::LifecycleChanged {
                from: LifecycleState::Spectating,
                to: LifecycleState::Ready,
            }]
        );
    }

    #[test]
    fn status_reflects_local_controls() {
        let mut view = GameView::mount(MemoryFlagStore::new(), &GameViewConfig::new());
        view.handle_action(&LocalAction::ToggleDifficulty);
        view.handle_action(&LocalAction::ToggleReady);
        let outcome = view.handle_action(&LocalAction::Key(Key::ArrowRight));
        assert!(outcome.events.is_empty());

        let status = view.status();
        assert_eq!(status.lifecycle, LifecycleState::Ready);
        assert!(status.ready_displayed);
        assert_eq!(status.difficulty, Difficulty::Hard);
        assert!(!status.start_flag);
        assert!(status.snapshot.is_none());
    }
}
