//! Inbound event decoding and routing.
//!
//! The channel is shared with the rest of the client (lobby, chat), so frames
//! for events this view does not subscribe to are skipped rather than treated
//! as errors.

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::Result;
use crate::lifecycle::{Lifecycle, LifecycleState, Trigger};
use crate::protocol::{
    GameSnapshot, InboundEvent, GET_WATCHER, SET_START_GAME, START_VERDICT, UPDATE_GAME,
};
use crate::snapshot::SnapshotStore;

#[derive(Deserialize)]
struct Envelope {
    event: String,
    #[serde(default)]
    data: serde_json::Value,
}

/// Decode one text frame.
///
/// Returns `Ok(None)` for well-formed frames of events this view does not
/// subscribe to. A non-string `setStartGame` payload is kept as its JSON text
/// so it can still be shown to the player.
///
/// # Errors
///
/// Returns [`GameViewError::Serialization`](crate::GameViewError::Serialization)
/// when the frame is not a JSON envelope or a subscribed event carries a
/// malformed payload (for example a snapshot with a missing field).
pub fn decode(frame: &str) -> Result<Option<InboundEvent>> {
    let Envelope { event, data } = serde_json::from_str(frame)?;
    let decoded = match event.as_str() {
        UPDATE_GAME => InboundEvent::UpdateGame(serde_json::from_value::<GameSnapshot>(data)?),
        SET_START_GAME => InboundEvent::SetStartGame(match data {
            serde_json::Value::String(verdict) => verdict,
            other => other.to_string(),
        }),
        GET_WATCHER => InboundEvent::GetWatcher(data),
        other => {
            debug!(event = other, "skipping unsubscribed event");
            return Ok(None);
        }
    };
    Ok(Some(decoded))
}

/// What an inbound event did to the view state.
#[derive(Debug, Clone, PartialEq)]
pub enum Ingested {
    /// An `updateGame` push. `accepted` is `false` when the store dropped it
    /// as stale.
    Snapshot { accepted: bool },
    /// A `setStartGame` push that moved the lifecycle.
    StartVerdict {
        from: LifecycleState,
        to: LifecycleState,
        started: bool,
        /// The literal server message when the start was refused.
        notice: Option<String>,
    },
    /// A `getWatcher` push that moved the lifecycle.
    Watcher {
        from: LifecycleState,
        to: LifecycleState,
        payload: serde_json::Value,
    },
    /// The event was not legal in the current lifecycle state.
    Ignored,
}

/// Route `event` into the snapshot store or the lifecycle.
///
/// Snapshots are stored whatever the lifecycle state is.
pub fn ingest(
    event: InboundEvent,
    store: &mut SnapshotStore,
    lifecycle: &mut Lifecycle,
) -> Ingested {
    match event {
        InboundEvent::UpdateGame(snapshot) => Ingested::Snapshot {
            accepted: store.replace(snapshot),
        },
        InboundEvent::SetStartGame(verdict) => {
            let started = verdict == START_VERDICT;
            let trigger = if started {
                Trigger::StartConfirmed
            } else {
                Trigger::StartRejected
            };
            debug!(%verdict, "setStartGame");
            let from = lifecycle.state();
            match lifecycle.transition(trigger) {
                Ok(to) => Ingested::StartVerdict {
                    from,
                    to,
                    started,
                    notice: (!started).then_some(verdict),
                },
                Err(e) => {
                    debug!("ignoring setStartGame: {e}");
                    Ingested::Ignored
                }
            }
        }
        InboundEvent::GetWatcher(payload) => {
            debug!(%payload, "getWatcher");
            let from = lifecycle.state();
            match lifecycle.transition(Trigger::Watcher) {
                Ok(to) => Ingested::Watcher { from, to, payload },
                Err(e) => {
                    debug!("ignoring getWatcher: {e}");
                    Ingested::Ignored
                }
            }
        }
    }
}

/// Decode a frame, logging and discarding anything unusable.
pub(crate) fn decode_or_skip(frame: &str) -> Option<InboundEvent> {
    match decode(frame) {
        Ok(event) => event,
        Err(e) => {
            warn!("failed to decode inbound frame: {e}, raw: {frame}");
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
    use crate::protocol::Score;
    use serde_json::json;

    fn update_frame() -> String {
        json!({
            "event": "updateGame",
            "data": {
                "paddles_": [
                    {"x_": 10, "y_": 200, "width_": 10, "height_": 80},
                    {"x_": 480, "y_": 150, "width_": 10, "height_": 80}
                ],
                "ball_": {"x_": 250.5, "y_": 260},
                "score_": "1 : 0"
            }
        })
        .to_string()
    }

    #[test]
    fn decodes_underscored_server_snapshot() {
        let Some(InboundEvent::UpdateGame(snap)) = decode(&update_frame()).unwrap() else {
            panic!("expected updateGame");
        };
        assert_eq!(snap.paddles[1].x, 480.0);
        assert_eq!(snap.ball.x, 250.5);
        assert_eq!(snap.score, Score::Text("1 : 0".into()));
        assert_eq!(snap.seq, None);
    }

    #[test]
    fn decodes_plain_snapshot_with_numeric_score() {
        let frame = json!({
            "event": "updateGame",
            "data": {
                "paddles": [
                    {"x": 0, "y": 0, "width": 10, "height": 80},
                    {"x": 490, "y": 0, "width": 10, "height": 80}
                ],
                "ball": {"x": 1, "y": 2},
                "score": 3,
                "seq": 9
            }
        });
        let Some(InboundEvent::UpdateGame(snap)) = decode(&frame.to_string()).unwrap() else {
            panic!("expected updateGame");
        };
        assert_eq!(snap.score.to_string(), "3");
        assert_eq!(snap.seq, Some(9));
    }

    #[test]
    fn partial_snapshot_is_rejected() {
        let frame = json!({
            "event": "updateGame",
            "data": {"paddles": [], "ball": {"x": 1, "y": 2}, "score": 0}
        });
        assert!(decode(&frame.to_string()).is_err());

        let frame = json!({"event": "updateGame", "data": {"ball": {"x": 1}}});
        assert!(decode(&frame.to_string()).is_err());
    }

    #[test]
    fn start_verdicts_and_watcher_decode() {
        assert_eq!(
            decode(r#"{"event":"setStartGame","data":"start"}"#).unwrap(),
            Some(InboundEvent::SetStartGame("start".into()))
        );
        assert_eq!(
            decode(r#"{"event":"setStartGame","data":42}"#).unwrap(),
            Some(InboundEvent::SetStartGame("42".into()))
        );
        assert_eq!(
            decode(r#"{"event":"getWatcher"}"#).unwrap(),
            Some(InboundEvent::GetWatcher(serde_json::Value::Null))
        );
    }

    #[test]
    fn unsubscribed_events_are_skipped() {
        assert_eq!(decode(r#"{"event":"chatMessage","data":"hi"}"#).unwrap(), None);
        assert!(decode_or_skip("{not json").is_none());
    }

    #[test]
    fn snapshots_are_stored_in_any_state() {
        let mut store = SnapshotStore::default();
        let mut lc = Lifecycle::default();
        lc.transition(Trigger::Leave).unwrap();

        let event = decode(&update_frame()).unwrap().unwrap();
        assert_eq!(
            ingest(event, &mut store, &mut lc),
            Ingested::Snapshot { accepted: true }
        );
        assert!(store.current().is_some());
    }

    #[test]
    fn rejected_start_carries_the_server_message() {
        let mut store = SnapshotStore::default();
        let mut lc = Lifecycle::new(true);
        let outcome = ingest(
            InboundEvent::SetStartGame("opponent left".into()),
            &mut store,
            &mut lc,
        );
        assert_eq!(
            outcome,
            Ingested::StartVerdict {
                from: LifecycleState::Playing,
                to: LifecycleState::NotReady,
                started: false,
                notice: Some("opponent left".into()),
            }
        );
    }

    #[test]
    fn confirmed_start_has_no_notice() {
        let mut store = SnapshotStore::default();
        let mut lc = Lifecycle::new(false);
        let outcome = ingest(InboundEvent::SetStartGame("start".into()), &mut store, &mut lc);
        assert!(matches!(
            outcome,
            Ingested::StartVerdict {
                to: LifecycleState::Playing,
                started: true,
                notice: None,
                ..
            }
        ));
    }

    #[test]
    fn pushes_after_leaving_are_ignored() {
        let mut store = SnapshotStore::default();
        let mut lc = Lifecycle::new(false);
        lc.transition(Trigger::Leave).unwrap();
        assert_eq!(
            ingest(InboundEvent::SetStartGame("start".into()), &mut store, &mut lc),
            Ingested::Ignored
        );
        assert_eq!(
            ingest(InboundEvent::GetWatcher(json!({})), &mut store, &mut lc),
            Ingested::Ignored
        );
        assert_eq!(lc.state(), LifecycleState::Left);
    }
}
