#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
//! Wire format tests for the game view events.
//!
//! Every frame is a JSON object `{"event": <name>, "data": <payload>}`;
//! payload-less events omit `data`.

use pong_view_client::ingestion::decode;
use pong_view_client::protocol::{
    Ball, Difficulty, GameSnapshot, InboundEvent, KeyDirection, OutboundEvent, Paddle, Score,
    INBOUND_EVENTS,
};
use serde_json::{json, Value};

fn to_value(event: &OutboundEvent) -> Value {
    serde_json::to_value(event).expect("serialize")
}

// ════════════════════════════════════════════════════════════════════
// Outbound
// ════════════════════════════════════════════════════════════════════

#[test]
fn post_key_carries_the_direction() {
    assert_eq!(
        to_value(&OutboundEvent::PostKey(KeyDirection::Up)),
        json!({"event": "postKey", "data": "up"})
    );
    assert_eq!(
        to_value(&OutboundEvent::PostKey(KeyDirection::Down)),
        json!({"event": "postKey", "data": "down"})
    );
}

#[test]
fn payload_less_events_have_no_data() {
    assert_eq!(
        to_value(&OutboundEvent::PostReadyGame),
        json!({"event": "postReadyGame"})
    );
    assert_eq!(
        to_value(&OutboundEvent::PostLeaveGame),
        json!({"event": "postLeaveGame"})
    );
}

#[test]
fn post_difficulty_uses_lowercase_labels() {
    assert_eq!(
        to_value(&OutboundEvent::PostDifficulty(Difficulty::Hard)),
        json!({"event": "postDifficulty", "data": "hard"})
    );
    assert_eq!(
        to_value(&OutboundEvent::PostDifficulty(Difficulty::Normal)),
        json!({"event": "postDifficulty", "data": "normal"})
    );
}

#[test]
fn outbound_names_match_the_wire() {
    for event in [
        OutboundEvent::PostKey(KeyDirection::Up),
        OutboundEvent::PostReadyGame,
        OutboundEvent::PostDifficulty(Difficulty::Normal),
        OutboundEvent::PostLeaveGame,
    ] {
        assert_eq!(to_value(&event)["event"], event.name());
    }
}

// ════════════════════════════════════════════════════════════════════
// Inbound
// ════════════════════════════════════════════════════════════════════

#[test]
fn update_game_fixture_from_the_server() {
    // Shape emitted by the game server's state serializer.
    let frame = r#"{
        "event": "updateGame",
        "data": {
            "paddles_": [
                {"x_": 10, "y_": 210, "width_": 10, "height_": 80},
                {"x_": 480, "y_": 190.5, "width_": 10, "height_": 80}
            ],
            "ball_": {"x_": 250, "y_": 250},
            "score_": "3 : 2"
        }
    }"#;

    let expected = GameSnapshot {
        paddles: [
            Paddle {
                x: 10.0,
                y: 210.0,
                width: 10.0,
                height: 80.0,
            },
            Paddle {
                x: 480.0,
                y: 190.5,
                width: 10.0,
                height: 80.0,
            },
        ],
        ball: Ball { x: 250.0, y: 250.0 },
        score: Score::Text("3 : 2".into()),
        seq: None,
    };
    assert_eq!(decode(frame).unwrap(), Some(InboundEvent::UpdateGame(expected)));
}

#[test]
fn snapshot_serializes_with_plain_names() {
    let InboundEvent::UpdateGame(snapshot) = decode(
        &json!({
            "event": "updateGame",
            "data": {
                "paddles": [
                    {"x": 1, "y": 2, "width": 3, "height": 4},
                    {"x": 5, "y": 6, "width": 7, "height": 8}
                ],
                "ball": {"x": 9, "y": 10},
                "score": 11
            }
        })
        .to_string(),
    )
    .unwrap()
    .unwrap() else {
        panic!("expected updateGame");
    };

    let value = serde_json::to_value(&snapshot).unwrap();
    assert_eq!(value["paddles"][1]["height"], 8.0);
    assert_eq!(value["score"], 11);
    assert!(value.get("seq").is_none());
}

#[test]
fn inbound_event_names_are_subscribed() {
    assert_eq!(INBOUND_EVENTS, ["updateGame", "setStartGame", "getWatcher"]);
    let watcher = decode(r#"{"event":"getWatcher","data":[1,2]}"#)
        .unwrap()
        .unwrap();
    assert_eq!(watcher.name(), "getWatcher");
    assert_eq!(watcher, InboundEvent::GetWatcher(json!([1, 2])));
}

#[test]
fn frames_without_an_event_name_are_errors() {
    assert!(decode(r#"{"data":"start"}"#).is_err());
    assert!(decode("[]").is_err());
    assert!(decode("").is_err());
}
