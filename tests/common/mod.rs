#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing,
    dead_code
)]
//! Shared helpers for the game view integration tests.
//!
//! Provides a scripted [`MockTransport`] and builders for the JSON frames the
//! game server pushes.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use async_trait::async_trait;
use pong_view_client::{GameViewError, Transport, ViewEvent};
use serde_json::json;
use tokio::sync::mpsc;

// ── MockTransport ───────────────────────────────────────────────────

/// Scripted transport.
///
/// `recv()` yields the scripted frames in order and then pends forever, like
/// an idle socket. Everything the view sends is recorded in `sent`.
pub struct MockTransport {
    incoming: VecDeque<Option<Result<String, GameViewError>>>,
    pub sent: Arc<StdMutex<Vec<String>>>,
    pub closed: Arc<AtomicBool>,
}

impl MockTransport {
    pub fn new(
        incoming: Vec<Option<Result<String, GameViewError>>>,
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

    /// A transport that delivers `frames` and then stays idle.
    pub fn scripted(frames: Vec<String>) -> (Self, Arc<StdMutex<Vec<String>>>, Arc<AtomicBool>) {
        Self::new(frames.into_iter().map(|f| Some(Ok(f))).collect())
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, frame: String) -> Result<(), GameViewError> {
        if self.closed.load(Ordering::Relaxed) {
            return Err(GameViewError::TransportClosed);
        }
        self.sent.lock().unwrap().push(frame);
        Ok(())
    }

    async fn recv(&mut self) -> Option<Result<String, GameViewError>> {
        match self.incoming.pop_front() {
            Some(item) => item,
            None => std::future::pending().await,
        }
    }

    async fn close(&mut self) -> Result<(), GameViewError> {
        self.closed.store(true, Ordering::Relaxed);
        Ok(())
    }
}

// ── Server frames ───────────────────────────────────────────────────

/// An `updateGame` push using the server's underscored field names.
pub fn update_game_json(left_y: f64, ball_x: f64, score: &str) -> String {
    json!({
        "event": "updateGame",
        "data": {
            "paddles_": [
                {"x_": 10, "y_": left_y, "width_": 10, "height_": 80},
                {"x_": 480, "y_": 210, "width_": 10, "height_": 80}
            ],
            "ball_": {"x_": ball_x, "y_": 250},
            "score_": score
        }
    })
    .to_string()
}

/// An `updateGame` push carrying a sequence number.
pub fn sequenced_update_json(seq: u64, ball_x: f64) -> String {
    json!({
        "event": "updateGame",
        "data": {
            "paddles": [
                {"x": 10, "y": 0, "width": 10, "height": 80},
                {"x": 480, "y": 0, "width": 10, "height": 80}
            ],
            "ball": {"x": ball_x, "y": 250},
            "score": seq,
            "seq": seq
        }
    })
    .to_string()
}

pub fn set_start_game_json(verdict: &str) -> String {
    json!({"event": "setStartGame", "data": verdict}).to_string()
}

pub fn get_watcher_json() -> String {
    json!({"event": "getWatcher", "data": {"room": "r1"}}).to_string()
}

/// A frame for an event the game view does not subscribe to.
pub fn chat_json(text: &str) -> String {
    json!({"event": "chatMessage", "data": text}).to_string()
}

// ── Event helpers ───────────────────────────────────────────────────

/// Receive the next view event, failing the test after one second.
pub async fn next_event(events: &mut mpsc::Receiver<ViewEvent>) -> ViewEvent {
    tokio::time::timeout(Duration::from_secs(1), events.recv())
        .await
        .expect("timed out waiting for a view event")
        .expect("event channel closed")
}

/// Receive events until one matches `pred`, returning it.
pub async fn wait_for(
    events: &mut mpsc::Receiver<ViewEvent>,
    pred: impl Fn(&ViewEvent) -> bool,
) -> ViewEvent {
    loop {
        let event = next_event(events).await;
        if pred(&event) {
            return event;
        }
    }
}

/// Give the loop a moment to flush outbound frames.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

pub fn sent_frames(sent: &Arc<StdMutex<Vec<String>>>) -> Vec<String> {
    sent.lock().unwrap().clone()
}
