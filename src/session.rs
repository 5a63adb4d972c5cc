//! Async runtime for a mounted game view.
//!
//! [`GameSession`] is a thin handle that talks to a background loop over an
//! unbounded command channel. The loop owns the [`GameView`] and the
//! transport, so inbound pushes and local actions are applied strictly one at
//! a time. View events are delivered on a bounded channel
//! ([`tokio::sync::mpsc::Receiver<ViewEvent>`]) returned from
//! [`GameSession::mount`].
//!
//! # Example
//!
//! ```rust,ignore
//! let transport = connected_transport().await;
//! let flags = JsonFileFlagStore::new("flags.json");
//! let (session, mut events) = GameSession::mount(transport, flags, GameViewConfig::new());
//!
//! session.attach_surface(Box::new(my_canvas))?;
//! session.toggle_ready()?;
//!
//! while let Some(event) = events.recv().await {
//!     match event {
//!         ViewEvent::Notice { message } => show_alert(&message),
//!         ViewEvent::Disconnected { .. } => break,
//!         _ => {}
//!     }
//! }
//!
//! // Hand the still-open connection to the next view.
//! let transport = session.unmount().await;
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::{debug, error, warn};

use crate::config::GameViewConfig;
use crate::error::{GameViewError, Result};
use crate::event::ViewEvent;
use crate::flag_store::FlagStore;
use crate::ingestion::decode_or_skip;
use crate::input::{Key, LocalAction};
use crate::lifecycle::LifecycleState;
use crate::protocol::{Difficulty, GameSnapshot, OutboundEvent};
use crate::render::DrawSurface;
use crate::transport::Transport;
use crate::view::{ActionOutcome, GameView, ViewStatus};

// ── Commands and shared state ───────────────────────────────────────

/// Work queued by the handle for the loop.
enum Command {
    Action(LocalAction),
    AttachSurface(Box<dyn DrawSurface + Send>),
    DetachSurface,
}

/// State shared between the handle and the loop. Only the loop writes it.
struct SharedState {
    mounted: AtomicBool,
    status: Mutex<ViewStatus>,
}

impl SharedState {
    fn new(status: ViewStatus) -> Self {
        Self {
            mounted: AtomicBool::new(true),
            status: Mutex::new(status),
        }
    }
}

// ── Session handle ──────────────────────────────────────────────────

/// Handle to a mounted game view.
///
/// Created by [`GameSession::mount`]. Local actions are queued to the loop and
/// return as soon as they are queued; outbound events are fire-and-forget.
pub struct GameSession<T: Transport> {
    cmd_tx: mpsc::UnboundedSender<Command>,
    state: Arc<SharedState>,
    task: Option<tokio::task::JoinHandle<T>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    shutdown_timeout: Duration,
}

impl<T: Transport> GameSession<T> {
    /// Mount a game view on an already-connected transport.
    ///
    /// Reads the persisted start flag, subscribes to the game events by
    /// spawning the view loop, and returns the handle plus the view event
    /// receiver. Each call is exactly one subscription; there is no way to
    /// subscribe the same mount twice.
    #[must_use = "the event receiver must be used to receive view events"]
    pub fn mount(
        transport: T,
        flags: impl FlagStore,
        config: GameViewConfig,
    ) -> (Self, mpsc::Receiver<ViewEvent>) {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<Command>();
        // Clamp capacity to at least 1 (tokio panics on 0).
        let capacity = config.event_channel_capacity.max(1);
        let (event_tx, event_rx) = mpsc::channel::<ViewEvent>(capacity);
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let view = GameView::mount(flags, &config);
        let state = Arc::new(SharedState::new(view.status()));

        let task = tokio::spawn(view_loop(
            transport,
            view,
            cmd_rx,
            event_tx,
            Arc::clone(&state),
            shutdown_rx,
        ));

        let session = Self {
            cmd_tx,
            state,
            task: Some(task),
            shutdown_tx: Some(shutdown_tx),
            shutdown_timeout: config.shutdown_timeout,
        };
        (session, event_rx)
    }

    // ── Local actions ───────────────────────────────────────────────

    /// Forward a key press. Only the arrow keys produce a `postKey`.
    ///
    /// # Errors
    ///
    /// Returns [`GameViewError::NotMounted`] once the loop has stopped.
    pub fn press_key(&self, key: impl Into<Key>) -> Result<()> {
        self.send(Command::Action(LocalAction::Key(key.into())))
    }

    /// Click the ready button.
    ///
    /// # Errors
    ///
    /// Returns [`GameViewError::NotMounted`] once the loop has stopped.
    pub fn toggle_ready(&self) -> Result<()> {
        self.send(Command::Action(LocalAction::ToggleReady))
    }

    /// Click the difficulty button.
    ///
    /// # Errors
    ///
    /// Returns [`GameViewError::NotMounted`] once the loop has stopped.
    pub fn toggle_difficulty(&self) -> Result<()> {
        self.send(Command::Action(LocalAction::ToggleDifficulty))
    }

    /// Click the leave button. No confirmation step.
    ///
    /// # Errors
    ///
    /// Returns [`GameViewError::NotMounted`] once the loop has stopped.
    pub fn leave(&self) -> Result<()> {
        self.send(Command::Action(LocalAction::Leave))
    }

    /// Give the view its drawing surface. The current snapshot, if any, is
    /// drawn right away.
    ///
    /// # Errors
    ///
    /// Returns [`GameViewError::NotMounted`] once the loop has stopped.
    pub fn attach_surface(&self, surface: Box<dyn DrawSurface + Send>) -> Result<()> {
        self.send(Command::AttachSurface(surface))
    }

    /// Stop drawing. The surface is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`GameViewError::NotMounted`] once the loop has stopped.
    pub fn detach_surface(&self) -> Result<()> {
        self.send(Command::DetachSurface)
    }

    /// Unmount the view: stop listening and hand the transport back.
    ///
    /// The transport is not closed, so it can be passed to the next
    /// [`mount`](Self::mount). Returns `None` if the loop had to be aborted
    /// after [`GameViewConfig::shutdown_timeout`] or had already failed.
    pub async fn unmount(mut self) -> Option<T> {
        debug!("GameSession: unmount requested");

        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        let mut task = self.task.take()?;
        let transport = match tokio::time::timeout(self.shutdown_timeout, &mut task).await {
            Ok(Ok(transport)) => Some(transport),
            Ok(Err(join_err)) => {
                warn!("view loop terminated with join error: {join_err}");
                None
            }
            Err(_) => {
                warn!("view loop did not exit within timeout; aborting task");
                task.abort();
                if let Err(join_err) = task.await {
                    debug!("view loop aborted: {join_err}");
                }
                None
            }
        };

        self.state.mounted.store(false, Ordering::Release);
        transport
    }

    // ── State accessors ─────────────────────────────────────────────

    /// Returns `true` while the loop is running.
    pub fn is_mounted(&self) -> bool {
        self.state.mounted.load(Ordering::Acquire)
    }

    /// Snapshot of the whole view state.
    pub async fn status(&self) -> ViewStatus {
        self.state.status.lock().await.clone()
    }

    pub async fn lifecycle(&self) -> LifecycleState {
        self.state.status.lock().await.lifecycle
    }

    pub async fn snapshot(&self) -> Option<GameSnapshot> {
        self.state.status.lock().await.snapshot.clone()
    }

    pub async fn is_ready_displayed(&self) -> bool {
        self.state.status.lock().await.ready_displayed
    }

    pub async fn difficulty(&self) -> Difficulty {
        self.state.status.lock().await.difficulty
    }

    // ── Internal helpers ────────────────────────────────────────────

    fn send(&self, cmd: Command) -> Result<()> {
        if !self.state.mounted.load(Ordering::Acquire) {
            return Err(GameViewError::NotMounted);
        }
        self.cmd_tx.send(cmd).map_err(|_| GameViewError::NotMounted)
    }
}

impl<T: Transport> std::fmt::Debug for GameSession<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameSession")
            .field("mounted", &self.is_mounted())
            .field("has_task", &self.task.is_some())
            .finish()
    }
}

impl<T: Transport> Drop for GameSession<T> {
    fn drop(&mut self) {
        // No executor to drive a graceful unmount here; aborting drops the
        // loop future, which drops the subscription with it.
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

// ── View loop ───────────────────────────────────────────────────────

/// Background loop that owns the view and multiplexes inbound frames, local
/// commands and the unmount signal.
///
/// Exits and returns the transport when:
/// - unmount is requested, or the handle is dropped
/// - the transport ends or fails
async fn view_loop<T: Transport>(
    mut transport: T,
    mut view: GameView,
    mut cmd_rx: mpsc::UnboundedReceiver<Command>,
    event_tx: mpsc::Sender<ViewEvent>,
    state: Arc<SharedState>,
    mut shutdown_rx: oneshot::Receiver<()>,
) -> T {
    debug!("view loop started");
    emit_event(
        &event_tx,
        ViewEvent::Mounted {
            lifecycle: view.lifecycle(),
        },
    );

    let reason = loop {
        tokio::select! {
            // Branch 1: local UI command from the handle
            cmd = cmd_rx.recv() => {
                let Some(cmd) = cmd else {
                    debug!("command channel closed, unmounting");
                    break Some("view unmounted".to_owned());
                };
                let outcome = match cmd {
                    Command::Action(action) => view.handle_action(&action),
                    Command::AttachSurface(surface) => {
                        view.attach_surface(surface);
                        ActionOutcome::default()
                    }
                    Command::DetachSurface => {
                        view.detach_surface();
                        ActionOutcome::default()
                    }
                };
                let status = view.status();
                publish(&state, status).await;
                for event in outcome.events {
                    emit_event(&event_tx, event);
                }
                if let Some(event) = outcome.outbound {
                    send_outbound(&mut transport, &event).await;
                }
            }

            // Branch 2: unmount signal
            _ = &mut shutdown_rx => {
                debug!("unmount signal received");
                break Some("view unmounted".to_owned());
            }

            // Branch 3: inbound frame from the server
            incoming = transport.recv() => {
                match incoming {
                    Some(Ok(frame)) => {
                        if let Some(inbound) = decode_or_skip(&frame) {
                            debug!(event = inbound.name(), "inbound event");
                            let events = view.handle_inbound(inbound);
                            let status = view.status();
                            publish(&state, status).await;
                            for event in events {
                                emit_event(&event_tx, event);
                            }
                        }
                    }
                    Some(Err(e)) => {
                        error!("transport receive error: {e}");
                        break Some(format!("transport receive error: {e}"));
                    }
                    None => {
                        debug!("transport closed by server");
                        break None;
                    }
                }
            }
        }
    };

    state.mounted.store(false, Ordering::Release);
    if event_tx
        .send(ViewEvent::Disconnected { reason })
        .await
        .is_err()
    {
        debug!("event channel closed, receiver dropped");
    }
    debug!("view loop exited");
    transport
}

/// Send an outbound event. Failures are logged and the event is dropped;
/// nothing is retried.
async fn send_outbound<T: Transport>(transport: &mut T, event: &OutboundEvent) {
    let frame = match serde_json::to_string(event) {
        Ok(frame) => frame,
        Err(e) => {
            error!("failed to serialize {}: {e}", event.name());
            return;
        }
    };
    debug!(event = event.name(), "sending outbound event");
    if let Err(e) = transport.send(frame).await {
        warn!("dropping outbound {}: {e}", event.name());
    }
}

/// Store the latest view status where the handle can read it.
///
/// Takes the status by value: the view is not `Sync`, so no borrow of it may
/// live across the lock's `.await`.
async fn publish(state: &SharedState, status: ViewStatus) {
    *state.status.lock().await = status;
}

/// Emit a view event without blocking. If the channel is full the event is
/// dropped with a warning.
fn emit_event(event_tx: &mpsc::Sender<ViewEvent>, event: ViewEvent) {
    match event_tx.try_send(event) {
        Ok(()) => {}
        Err(mpsc::error::TrySendError::Full(dropped)) => {
            warn!("view event channel full, dropping event: {dropped:?}");
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {
            debug!("view event channel closed, receiver dropped");
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────────

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
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;

    // ── Mock transport ──────────────────────────────────────────────

    /// Replays scripted frames, records sent frames, then pends forever.
    struct MockTransport {
        incoming: VecDeque<Option<std::result::Result<String, GameViewError>>>,
        sent: Arc<StdMutex<Vec<String>>>,
        closed: Arc<AtomicBool>,
    }

    impl MockTransport {
        fn new(
            incoming: Vec<Option<std::result::Result<String, GameViewError>>>,
        ) -> (Self, Arc<StdMutex<Vec<String>>>, Arc<AtomicBool>) {
            let sent = Arc::new(StdMutex::new(Vec::new()));
            let closed = Arc::new(AtomicBool::new(false));
            let transport = Self {
                incoming: VecDeque::from(incoming),
                sent: Arc::clone(&sent),
                closed: Arc::clone(&closed),
            };
            (transport, sent, closed)
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn send(&mut self, frame: String) -> std::result::Result<(), GameViewError> {
            self.sent.lock().unwrap().push(frame);
            Ok(())
        }

        async fn recv(&mut self) -> Option<std::result::Result<String, GameViewError>> {
            if let Some(item) = self.incoming.pop_front() {
                item
            } else {
                std::future::pending().await
            }
        }

        async fn close(&mut self) -> std::result::Result<(), GameViewError> {
            self.closed.store(true, Ordering::Relaxed);
            Ok(())
        }
    }

    fn start_json(verdict: &str) -> String {
        serde_json::json!({"event": "setStartGame", "data": verdict}).to_string()
    }

    // ── Tests ───────────────────────────────────────────────────────

    fn assert_send<F: Send>(_: &F) {}

    #[test]
    fn view_loop_future_is_send() {
        let (transport, _sent, _closed) = MockTransport::new(vec![]);
        let view = GameView::mount(MemoryFlagStore::new(), &GameViewConfig::new());
        let state = Arc::new(SharedState::new(view.status()));
        let (_cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (event_tx, _event_rx) = mpsc::channel(1);
        let (_shutdown_tx, shutdown_rx) = oneshot::channel();
        let fut = view_loop(transport, view, cmd_rx, event_tx, state, shutdown_rx);
        assert_send(&fut);
    }

    #[tokio::test]
    async fn first_event_is_mounted() {
        let (transport, _sent, _closed) = MockTransport::new(vec![]);
        let (session, mut events) =
            GameSession::mount(transport, MemoryFlagStore::new(), GameViewConfig::new());

        let event = events.recv().await.unwrap();
        assert_eq!(
            event,
            ViewEvent::Mounted {
                lifecycle: LifecycleState::NotReady
            }
        );
        assert!(session.is_mounted());
        assert!(session.unmount().await.is_some());
    }

    #[tokio::test]
    async fn unmount_returns_the_open_transport() {
        let (transport, _sent, closed) = MockTransport::new(vec![]);
        let (session, mut events) =
            GameSession::mount(transport, MemoryFlagStore::new(), GameViewConfig::new());
        let _ = events.recv().await; // Mounted

        let transport = session.unmount().await;
        assert!(transport.is_some());
        assert!(!closed.load(Ordering::Relaxed), "unmount must not close");

        let event = events.recv().await.unwrap();
        assert!(matches!(event, ViewEvent::Disconnected { reason: Some(_) }));
        assert!(events.recv().await.is_none());
    }

    #[tokio::test]
    async fn rejected_start_emits_notice() {
        let (transport, _sent, _closed) = MockTransport::new(vec![Some(Ok(start_json("wait")))]);
        let flags = MemoryFlagStore::with_flag("startGame", true);
        let (session, mut events) =
            GameSession::mount(transport, flags.clone(), GameViewConfig::new());

        let _ = events.recv().await; // Mounted
        let _ = events.recv().await; // LifecycleChanged
        let event = events.recv().await.unwrap();
        assert_eq!(
            event,
            ViewEvent::Notice {
                message: "wait".into()
            }
        );
        assert_eq!(flags.get("startGame"), Some(false));
        assert_eq!(session.lifecycle().await, LifecycleState::NotReady);
        session.unmount().await;
    }

    #[tokio::test]
    async fn toggle_ready_sends_post_ready_game() {
        let (transport, sent, _closed) = MockTransport::new(vec![]);
        let (session, mut events) =
            GameSession::mount(transport, MemoryFlagStore::new(), GameViewConfig::new());
        let _ = events.recv().await; // Mounted

        session.toggle_ready().unwrap();
        let event = events.recv().await.unwrap();
        assert_eq!(
            event,
            ViewEvent::LifecycleChanged {
                from: LifecycleState::NotReady,
                to: LifecycleState::Ready
            }
        );
        tokio::time::sleep(Duration::from_millis(50)).await;

        {
            let frames = sent.lock().unwrap();
            assert_eq!(frames.as_slice(), [r#"{"event":"postReadyGame"}"#]);
        }
        assert!(session.is_ready_displayed().await);
        session.unmount().await;
    }

    #[tokio::test]
    async fn transport_close_disconnects() {
        let (transport, _sent, _closed) = MockTransport::new(vec![None]);
        let (session, mut events) =
            GameSession::mount(transport, MemoryFlagStore::new(), GameViewConfig::new());

        let _ = events.recv().await; // Mounted
        let event = events.recv().await.unwrap();
        assert_eq!(event, ViewEvent::Disconnected { reason: None });
        assert!(!session.is_mounted());
        assert!(matches!(
            session.toggle_ready(),
            Err(GameViewError::NotMounted)
        ));
    }

    #[tokio::test]
    async fn receive_error_disconnects_with_reason() {
        let (transport, _sent, _closed) = MockTransport::new(vec![Some(Err(
            GameViewError::TransportReceive("reset".into()),
        ))]);
        let (_session, mut events) =
            GameSession::mount(transport, MemoryFlagStore::new(), GameViewConfig::new());

        let _ = events.recv().await; // Mounted
        let Some(ViewEvent::Disconnected { reason: Some(reason) }) = events.recv().await else {
            panic!("expected Disconnected with a reason");
        };
        assert!(reason.contains("reset"));
    }

    #[tokio::test]
    async fn zero_shutdown_timeout_aborts_the_loop() {
        let (transport, _sent, _closed) = MockTransport::new(vec![]);
        let config = GameViewConfig::new().with_shutdown_timeout(Duration::ZERO);
        let (session, _events) = GameSession::mount(transport, MemoryFlagStore::new(), config);
        // The loop may or may not have finished in zero time; either way
        // unmount must return promptly and leave the session unmounted.
        let _ = session.unmount().await;
    }
}
