//! Wire types for the game server channel.
//!
//! Every frame is a JSON text message tagged with its event name:
//!
//! ```json
//! {"event": "postKey", "data": "up"}
//! {"event": "postReadyGame"}
//! ```
//!
//! The session server spells snapshot fields with a trailing underscore
//! (`paddles_`, `x_`, ...). Decoding accepts both spellings; encoding always
//! writes the plain one.

use std::fmt;

use serde::{Deserialize, Serialize};

// ── Event names ─────────────────────────────────────────────────────

/// Inbound event carrying a full game snapshot.
pub const UPDATE_GAME: &str = "updateGame";
/// Inbound event carrying the start/stop verdict.
pub const SET_START_GAME: &str = "setStartGame";
/// Inbound event telling this participant it is watching.
pub const GET_WATCHER: &str = "getWatcher";

/// The inbound event names a game view subscribes to.
pub const INBOUND_EVENTS: [&str; 3] = [UPDATE_GAME, SET_START_GAME, GET_WATCHER];

/// Payload of `setStartGame` that moves the view into play.
pub const START_VERDICT: &str = "start";

// ── Snapshot ────────────────────────────────────────────────────────

/// A paddle rectangle in canvas coordinates (origin top-left).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Paddle {
    #[serde(alias = "x_")]
    pub x: f64,
    #[serde(alias = "y_")]
    pub y: f64,
    #[serde(alias = "width_")]
    pub width: f64,
    #[serde(alias = "height_")]
    pub height: f64,
}

/// Ball center. The radius is a rendering constant, not server data.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ball {
    #[serde(alias = "x_")]
    pub x: f64,
    #[serde(alias = "y_")]
    pub y: f64,
}

/// Score label, rendered verbatim.
///
/// The server sends either a number or a preformatted string such as `"3 : 1"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Score {
    Number(serde_json::Number),
    Text(String),
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// One complete, authoritative description of the renderable game state.
///
/// Snapshots are replaced wholesale; a payload missing any field fails to
/// decode, so a half-filled snapshot never reaches the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSnapshot {
    /// Index 0 is the local player's paddle, by server convention.
    #[serde(alias = "paddles_")]
    pub paddles: [Paddle; 2],
    #[serde(alias = "ball_")]
    pub ball: Ball,
    #[serde(alias = "score_")]
    pub score: Score,
    /// Monotonic sequence number, if the server provides one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seq: Option<u64>,
}

// ── Outbound values ─────────────────────────────────────────────────

/// Paddle movement direction sent with `postKey`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum KeyDirection {
    Up,
    Down,
}

/// Game difficulty, backed by a single "hard" flag.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[default]
    Normal,
    Hard,
}

impl Difficulty {
    /// Returns `true` for [`Difficulty::Hard`].
    pub fn is_hard(self) -> bool {
        matches!(self, Self::Hard)
    }

    /// The other difficulty.
    #[must_use]
    pub fn flipped(self) -> Self {
        match self {
            Self::Normal => Self::Hard,
            Self::Hard => Self::Normal,
        }
    }
}

impl From<bool> for Difficulty {
    fn from(hard: bool) -> Self {
        if hard {
            Self::Hard
        } else {
            Self::Normal
        }
    }
}

// ── Events ──────────────────────────────────────────────────────────

/// Events pushed by the game server to the view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum InboundEvent {
    /// Replace the current snapshot.
    UpdateGame(GameSnapshot),
    /// `"start"` starts the game; anything else is a rejection message.
    SetStartGame(String),
    /// This participant is now a spectator. Payload is opaque.
    GetWatcher(serde_json::Value),
}

impl InboundEvent {
    /// Wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            Self::UpdateGame(_) => UPDATE_GAME,
            Self::SetStartGame(_) => SET_START_GAME,
            Self::GetWatcher(_) => GET_WATCHER,
        }
    }
}

/// Events the view emits to the game server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum OutboundEvent {
    /// Move the local paddle.
    PostKey(KeyDirection),
    /// Toggle readiness. The server decides what it means.
    PostReadyGame,
    /// Announce a difficulty choice.
    PostDifficulty(Difficulty),
    /// Leave the game.
    PostLeaveGame,
}

impl OutboundEvent {
    /// Wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            Self::PostKey(_) => "postKey",
            Self::PostReadyGame => "postReadyGame",
            Self::PostDifficulty(_) => "postDifficulty",
            Self::PostLeaveGame => "postLeaveGame",
        }
    }
}
