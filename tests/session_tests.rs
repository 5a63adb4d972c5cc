#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
//! End-to-end tests for [`GameSession`] over a scripted transport.
#![cfg(feature = "tokio-runtime")]

mod common;

use common::*;
use pong_view_client::input::Key;
use pong_view_client::lifecycle::LifecycleState;
use pong_view_client::protocol::{Difficulty, Score};
use pong_view_client::render::DrawCommand;
use pong_view_client::snapshot::SnapshotOrdering;
use pong_view_client::{
    GameSession, GameViewConfig, GameViewError, JsonFileFlagStore, MemoryFlagStore,
    RecordingSurface, ViewEvent,
};
use tokio_test::{assert_err, assert_ok};

fn mount_scripted(
    frames: Vec<String>,
    flags: MemoryFlagStore,
) -> (
    GameSession<MockTransport>,
    tokio::sync::mpsc::Receiver<ViewEvent>,
    std::sync::Arc<std::sync::Mutex<Vec<String>>>,
) {
    let (transport, sent, _closed) = MockTransport::scripted(frames);
    let (session, events) = GameSession::mount(transport, flags, GameViewConfig::new());
    (session, events, sent)
}

// ── Snapshots ───────────────────────────────────────────────────────

#[tokio::test]
async fn last_update_wins_across_lifecycle_pushes() {
    let frames = vec![
        update_game_json(100.0, 50.0, "0 : 0"),
        set_start_game_json("start"),
        update_game_json(120.0, 60.0, "0 : 1"),
        get_watcher_json(),
        chat_json("gg"),
        update_game_json(140.0, 70.0, "1 : 1"),
    ];
    let (session, mut events, _sent) = mount_scripted(frames, MemoryFlagStore::new());

    let mut updates = 0;
    while updates < 3 {
        if next_event(&mut events).await == ViewEvent::SnapshotUpdated {
            updates += 1;
        }
    }

    let snapshot = session.snapshot().await.unwrap();
    assert_eq!(snapshot.paddles[0].y, 140.0);
    assert_eq!(snapshot.ball.x, 70.0);
    assert_eq!(snapshot.score, Score::Text("1 : 1".into()));
    assert_eq!(session.lifecycle().await, LifecycleState::Spectating);
    session.unmount().await;
}

#[tokio::test]
async fn monotonic_ordering_drops_stale_updates() {
    let (transport, _sent, _closed) = MockTransport::scripted(vec![
        sequenced_update_json(2, 20.0),
        sequenced_update_json(1, 10.0),
        sequenced_update_json(3, 30.0),
    ]);
    let config = GameViewConfig::new().with_snapshot_ordering(SnapshotOrdering::Monotonic);
    let (session, mut events) = GameSession::mount(transport, MemoryFlagStore::new(), config);

    for _ in 0..2 {
        wait_for(&mut events, |e| *e == ViewEvent::SnapshotUpdated).await;
    }
    let snapshot = session.snapshot().await.unwrap();
    assert_eq!(snapshot.seq, Some(3));
    assert_eq!(snapshot.ball.x, 30.0);
    session.unmount().await;
}

#[tokio::test]
async fn malformed_frames_do_not_stop_the_view() {
    let frames = vec![
        "{not json".to_owned(),
        r#"{"event":"updateGame","data":{"ball":{"x":1}}}"#.to_owned(),
        update_game_json(1.0, 2.0, "0 : 0"),
    ];
    let (session, mut events, _sent) = mount_scripted(frames, MemoryFlagStore::new());

    wait_for(&mut events, |e| *e == ViewEvent::SnapshotUpdated).await;
    assert!(session.is_mounted());
    assert_eq!(session.snapshot().await.unwrap().ball.y, 250.0);
    session.unmount().await;
}

// ── Start verdicts and persisted flag ───────────────────────────────

#[tokio::test]
async fn start_verdict_persists_the_flag() {
    let flags = MemoryFlagStore::new();
    let (session, mut events, _sent) =
        mount_scripted(vec![set_start_game_json("start")], flags.clone());

    let event = wait_for(&mut events, |e| {
        matches!(e, ViewEvent::LifecycleChanged { .. })
    })
    .await;
    assert_eq!(
        event,
        ViewEvent::LifecycleChanged {
            from: LifecycleState::NotReady,
            to: LifecycleState::Playing
        }
    );
    assert_eq!(flags.get("startGame"), Some(true));
    assert!(session.status().await.start_flag);
    session.unmount().await;
}

#[tokio::test]
async fn rejection_from_spectating_returns_to_not_ready_with_notice() {
    let flags = MemoryFlagStore::with_flag("startGame", true);
    let frames = vec![get_watcher_json(), set_start_game_json("stop")];
    let (session, mut events, _sent) = mount_scripted(frames, flags.clone());

    assert_eq!(
        next_event(&mut events).await,
        ViewEvent::Mounted {
            lifecycle: LifecycleState::Playing
        }
    );
    let notice = wait_for(&mut events, |e| matches!(e, ViewEvent::Notice { .. })).await;
    assert_eq!(
        notice,
        ViewEvent::Notice {
            message: "stop".into()
        }
    );
    assert_eq!(session.lifecycle().await, LifecycleState::NotReady);
    assert_eq!(flags.get("startGame"), Some(false));
    session.unmount().await;
}

#[tokio::test]
async fn flag_file_restores_playing_on_the_next_mount() {
    let dir = std::env::temp_dir().join(format!("pong-view-session-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("flags.json");
    let _ = std::fs::remove_file(&path);

    let (transport, _sent, _closed) = MockTransport::scripted(vec![set_start_game_json("start")]);
    let (session, mut events) = GameSession::mount(
        transport,
        JsonFileFlagStore::new(&path),
        GameViewConfig::new(),
    );
    wait_for(&mut events, |e| {
        matches!(
            e,
            ViewEvent::LifecycleChanged {
                to: LifecycleState::Playing,
                ..
            }
        )
    })
    .await;
    let transport = session.unmount().await.unwrap();

    let (session, mut events) = GameSession::mount(
        transport,
        JsonFileFlagStore::new(&path),
        GameViewConfig::new(),
    );
    assert_eq!(
        next_event(&mut events).await,
        ViewEvent::Mounted {
            lifecycle: LifecycleState::Playing
        }
    );
    session.unmount().await;
}

// ── Local input ─────────────────────────────────────────────────────

#[tokio::test]
async fn arrow_keys_map_to_post_key() {
    let (session, mut events, sent) = mount_scripted(vec![], MemoryFlagStore::new());
    next_event(&mut events).await;

    assert_ok!(session.press_key("ArrowLeft"));
    assert_ok!(session.press_key("ArrowRight"));
    assert_ok!(session.press_key(Key::Other("Space".into())));
    assert_ok!(session.press_key("ArrowLeft"));
    settle().await;

    assert_eq!(
        sent_frames(&sent),
        [
            r#"{"event":"postKey","data":"up"}"#,
            r#"{"event":"postKey","data":"down"}"#,
            r#"{"event":"postKey","data":"up"}"#,
        ]
    );
    session.unmount().await;
}

#[tokio::test]
async fn ready_toggle_alternates_the_displayed_flag() {
    let (session, mut events, sent) = mount_scripted(vec![], MemoryFlagStore::new());
    next_event(&mut events).await;

    let mut displayed = Vec::new();
    for _ in 0..3 {
        assert_ok!(session.toggle_ready());
        wait_for(&mut events, |e| matches!(e, ViewEvent::LifecycleChanged { .. })).await;
        displayed.push(session.is_ready_displayed().await);
    }
    settle().await;

    assert_eq!(displayed, [true, false, true]);
    assert_eq!(sent_frames(&sent), vec![r#"{"event":"postReadyGame"}"#; 3]);
    session.unmount().await;
}

#[tokio::test]
async fn difficulty_toggle_announces_from_the_second_click() {
    let (session, mut events, sent) = mount_scripted(vec![], MemoryFlagStore::new());
    next_event(&mut events).await;

    for _ in 0..4 {
        assert_ok!(session.toggle_difficulty());
    }
    settle().await;

    assert_eq!(
        sent_frames(&sent),
        [
            r#"{"event":"postDifficulty","data":"normal"}"#,
            r#"{"event":"postDifficulty","data":"hard"}"#,
            r#"{"event":"postDifficulty","data":"normal"}"#,
        ]
    );
    assert_eq!(session.difficulty().await, Difficulty::Normal);
    assert_eq!(session.lifecycle().await, LifecycleState::SelectingDifficulty);
    session.unmount().await;
}

#[tokio::test]
async fn leave_while_playing_is_terminal() {
    let flags = MemoryFlagStore::with_flag("startGame", true);
    let (transport, sent, _closed) = MockTransport::new(vec![]);
    let (session, mut events) = GameSession::mount(transport, flags, GameViewConfig::new());
    next_event(&mut events).await;

    assert_ok!(session.leave());
    assert_eq!(
        next_event(&mut events).await,
        ViewEvent::LifecycleChanged {
            from: LifecycleState::Playing,
            to: LifecycleState::Left
        }
    );

    // Nothing is accepted once left.
    assert_ok!(session.toggle_ready());
    assert_ok!(session.press_key("ArrowLeft"));
    settle().await;

    assert_eq!(sent_frames(&sent), [r#"{"event":"postLeaveGame"}"#]);
    assert_eq!(session.lifecycle().await, LifecycleState::Left);
    session.unmount().await;
}

// ── Rendering ───────────────────────────────────────────────────────

#[tokio::test]
async fn surface_draws_once_a_snapshot_arrives() {
    let (transport, _sent, _closed) = MockTransport::new(vec![]);
    let (session, mut events) =
        GameSession::mount(transport, MemoryFlagStore::new(), GameViewConfig::new());
    next_event(&mut events).await;

    let surface = RecordingSurface::new();
    assert_ok!(session.attach_surface(Box::new(surface.clone())));
    settle().await;
    assert!(surface.commands().is_empty(), "no snapshot, nothing drawn");
    session.unmount().await;

    let (transport, _sent, _closed) =
        MockTransport::scripted(vec![update_game_json(100.0, 250.0, "2 : 1")]);
    let (session, mut events) =
        GameSession::mount(transport, MemoryFlagStore::new(), GameViewConfig::new());
    assert_ok!(session.attach_surface(Box::new(surface.clone())));
    wait_for(&mut events, |e| *e == ViewEvent::SnapshotUpdated).await;
    settle().await;

    let commands = surface.commands();
    assert_eq!(commands.len(), 6);
    assert!(matches!(commands[0], DrawCommand::Clear(_)));
    assert!(matches!(commands[5], DrawCommand::FillText { ref text, .. } if text == "2 : 1"));
    session.unmount().await;
}

// ── Teardown ────────────────────────────────────────────────────────

#[tokio::test]
async fn actions_after_unmount_fail() {
    let (transport, _sent, _closed) = MockTransport::new(vec![None]);
    let (session, mut events) =
        GameSession::mount(transport, MemoryFlagStore::new(), GameViewConfig::new());

    wait_for(&mut events, |e| matches!(e, ViewEvent::Disconnected { .. })).await;
    let err = assert_err!(session.leave());
    assert!(matches!(err, GameViewError::NotMounted));
    assert!(session.unmount().await.is_some());
}

#[tokio::test]
async fn remounting_does_not_duplicate_delivery() {
    let (transport, sent, closed) = MockTransport::new(vec![]);
    let (session, mut events) =
        GameSession::mount(transport, MemoryFlagStore::new(), GameViewConfig::new());
    next_event(&mut events).await;
    let transport = session.unmount().await.unwrap();
    assert!(!closed.load(std::sync::atomic::Ordering::Relaxed));

    let (session, mut events) =
        GameSession::mount(transport, MemoryFlagStore::new(), GameViewConfig::new());
    next_event(&mut events).await;
    assert_ok!(session.toggle_ready());
    settle().await;

    assert_eq!(sent_frames(&sent), [r#"{"event":"postReadyGame"}"#]);
    session.unmount().await;
}
