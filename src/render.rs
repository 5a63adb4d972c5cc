//! Deterministic render pipeline from a [`GameSnapshot`] to draw calls.
//!
//! [`render`] is pure: it turns a snapshot into an ordered list of
//! [`DrawCommand`]s. [`paint`] replays them against a [`DrawSurface`], and is
//! a complete no-op while either the surface or the snapshot is missing.
//!
//! Every frame is drawn in the same order, each step covering the full canvas:
//!
//! 1. clear the canvas
//! 2. fill the background
//! 3. paddle 0, then paddle 1
//! 4. the ball
//! 5. the score text

use std::sync::{Arc, Mutex, PoisonError};

use crate::protocol::{GameSnapshot, Paddle};

/// Ball radius in canvas units. Not part of the server snapshot.
pub const BALL_RADIUS: f64 = 10.0;

/// Default logical canvas edge length.
pub const CANVAS_SIZE: f64 = 500.0;

/// An opaque RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color(pub u8, pub u8, pub u8);

impl Color {
    pub const GRAY: Self = Self(128, 128, 128);
    pub const RED: Self = Self(255, 0, 0);
    pub const BLUE: Self = Self(0, 0, 255);
    pub const WHITE: Self = Self(255, 255, 255);
}

/// Axis-aligned rectangle, origin top-left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl From<&Paddle> for Rect {
    fn from(p: &Paddle) -> Self {
        Self {
            x: p.x,
            y: p.y,
            width: p.width,
            height: p.height,
        }
    }
}

/// Text font.
#[derive(Debug, Clone, PartialEq)]
pub struct Font {
    pub size_px: u16,
    pub family: String,
}

/// Colors, sizes and anchors used by [`render`].
#[derive(Debug, Clone, PartialEq)]
pub struct RenderStyle {
    pub width: f64,
    pub height: f64,
    pub background: Color,
    pub paddle: Color,
    pub ball: Color,
    pub ball_radius: f64,
    pub score: Color,
    pub score_font: Font,
    /// Baseline-left anchor of the score text.
    pub score_anchor: (f64, f64),
}

impl Default for RenderStyle {
    fn default() -> Self {
        Self {
            width: CANVAS_SIZE,
            height: CANVAS_SIZE,
            background: Color::GRAY,
            paddle: Color::RED,
            ball: Color::BLUE,
            ball_radius: BALL_RADIUS,
            score: Color::WHITE,
            score_font: Font {
                size_px: 30,
                family: "Arial".into(),
            },
            score_anchor: (100.0, 100.0),
        }
    }
}

/// A 2D immediate-mode drawing surface.
///
/// Acquiring and sizing the surface is the embedder's job; the game view only
/// draws on it.
pub trait DrawSurface {
    fn clear_rect(&mut self, rect: Rect);
    fn fill_rect(&mut self, rect: Rect, color: Color);
    /// Full arc around `(x, y)`, filled.
    fn fill_circle(&mut self, x: f64, y: f64, radius: f64, color: Color);
    fn fill_text(&mut self, text: &str, x: f64, y: f64, font: &Font, color: Color);
}

/// One drawing primitive.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Clear(Rect),
    FillRect(Rect, Color),
    FillCircle {
        x: f64,
        y: f64,
        radius: f64,
        color: Color,
    },
    FillText {
        text: String,
        x: f64,
        y: f64,
        font: Font,
        color: Color,
    },
}

impl DrawCommand {
    /// Issue this command on `surface`.
    pub fn apply(&self, surface: &mut dyn DrawSurface) {
        match self {
            Self::Clear(rect) => surface.clear_rect(*rect),
            Self::FillRect(rect, color) => surface.fill_rect(*rect, *color),
            Self::FillCircle {
                x,
                y,
                radius,
                color,
            } => surface.fill_circle(*x, *y, *radius, *color),
            Self::FillText {
                text,
                x,
                y,
                font,
                color,
            } => surface.fill_text(text, *x, *y, font, *color),
        }
    }
}

/// Map a snapshot to the draw calls of one frame.
pub fn render(snapshot: &GameSnapshot, style: &RenderStyle) -> Vec<DrawCommand> {
    let canvas = Rect {
        x: 0.0,
        y: 0.0,
        width: style.width,
        height: style.height,
    };
    let [left, right] = &snapshot.paddles;
    let (text_x, text_y) = style.score_anchor;

    vec![
        DrawCommand::Clear(canvas),
        DrawCommand::FillRect(canvas, style.background),
        DrawCommand::FillRect(left.into(), style.paddle),
        DrawCommand::FillRect(right.into(), style.paddle),
        DrawCommand::FillCircle {
            x: snapshot.ball.x,
            y: snapshot.ball.y,
            radius: style.ball_radius,
            color: style.ball,
        },
        DrawCommand::FillText {
            text: snapshot.score.to_string(),
            x: text_x,
            y: text_y,
            font: style.score_font.clone(),
            color: style.score,
        },
    ]
}

/// Draw `snapshot` on `surface` if both are present.
///
/// Returns `true` if a frame was drawn. A missing collaborator is the idle
/// state, not an error: nothing is drawn, not even a clear.
pub fn paint(
    surface: Option<&mut (dyn DrawSurface + Send + '_)>,
    snapshot: Option<&GameSnapshot>,
    style: &RenderStyle,
) -> bool {
    let (Some(surface), Some(snapshot)) = (surface, snapshot) else {
        return false;
    };
    for command in render(snapshot, style) {
        command.apply(&mut *surface);
    }
    true
}

/// A [`DrawSurface`] that records every call it receives.
///
/// Clones share the same log, so a test or a headless embedder can keep a
/// handle while the session owns the surface.
#[derive(Debug, Clone, Default)]
pub struct RecordingSurface {
    log: Arc<Mutex<Vec<DrawCommand>>>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every command recorded so far, oldest first.
    pub fn commands(&self) -> Vec<DrawCommand> {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Drop the recorded commands.
    pub fn reset(&self) {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn record(&self, command: DrawCommand) {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(command);
    }
}

impl DrawSurface for RecordingSurface {
    fn clear_rect(&mut self, rect: Rect) {
        self.record(DrawCommand::Clear(rect));
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.record(DrawCommand::FillRect(rect, color));
    }

    fn fill_circle(&mut self, x: f64, y: f64, radius: f64, color: Color) {
        self.record(DrawCommand::FillCircle {
            x,
            y,
            radius,
            color,
        });
    }

    fn fill_text(&mut self, text: &str, x: f64, y: f64, font: &Font, color: Color) {
        self.record(DrawCommand::FillText {
            text: text.to_owned(),
            x,
            y,
            font: font.clone(),
            color,
        });
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
    use crate::protocol::{Ball, Score};

    fn snapshot() -> GameSnapshot {
        GameSnapshot {
            paddles: [
                Paddle {
                    x: 10.0,
                    y: 200.0,
                    width: 10.0,
                    height: 80.0,
                },
                Paddle {
                    x: 480.0,
                    y: 150.0,
                    width: 10.0,
                    height: 80.0,
                },
            ],
            ball: Ball { x: 250.0, y: 260.0 },
            score: Score::Text("2 : 1".into()),
            seq: None,
        }
    }

    #[test]
    fn frame_has_fixed_order_and_shape() {
        let commands = render(&snapshot(), &RenderStyle::default());
        assert_eq!(commands.len(), 6);

        let canvas = Rect {
            x: 0.0,
            y: 0.0,
            width: 500.0,
            height: 500.0,
        };
        assert_eq!(commands[0], DrawCommand::Clear(canvas));
        assert_eq!(commands[1], DrawCommand::FillRect(canvas, Color::GRAY));
        assert_eq!(
            commands[2],
            DrawCommand::FillRect(
                Rect {
                    x: 10.0,
                    y: 200.0,
                    width: 10.0,
                    height: 80.0
                },
                Color::RED
            )
        );
        assert!(matches!(
            commands[3],
            DrawCommand::FillRect(Rect { x, .. }, Color::RED) if x == 480.0
        ));
        assert_eq!(
            commands[4],
            DrawCommand::FillCircle {
                x: 250.0,
                y: 260.0,
                radius: 10.0,
                color: Color::BLUE
            }
        );
        match &commands[5] {
            DrawCommand::FillText {
                text, x, y, font, ..
            } => {
                assert_eq!(text, "2 : 1");
                assert_eq!((*x, *y), (100.0, 100.0));
                assert_eq!(font.size_px, 30);
                assert_eq!(font.family, "Arial");
            }
            other => panic!("expected score text, got {other:?}"),
        }
    }

    #[test]
    fn numeric_score_is_rendered_verbatim() {
        let mut snap = snapshot();
        snap.score = serde_json::from_str("7").unwrap();
        let commands = render(&snap, &RenderStyle::default());
        assert!(matches!(
            commands.last(),
            Some(DrawCommand::FillText { text, .. }) if text == "7"
        ));
    }

    #[test]
    fn render_is_deterministic() {
        let style = RenderStyle::default();
        assert_eq!(render(&snapshot(), &style), render(&snapshot(), &style));
    }

    #[test]
    fn paint_without_snapshot_draws_nothing() {
        let recorder = RecordingSurface::new();
        let mut surface = recorder.clone();
        let drawn = paint(Some(&mut surface), None, &RenderStyle::default());
        assert!(!drawn);
        assert!(recorder.commands().is_empty());
    }

    #[test]
    fn paint_without_surface_is_a_no_op() {
        assert!(!paint(None, Some(&snapshot()), &RenderStyle::default()));
    }

    #[test]
    fn paint_accepts_an_owned_boxed_surface() {
        let recorder = RecordingSurface::new();
        let mut owned: Option<Box<dyn DrawSurface + Send>> = Some(Box::new(recorder.clone()));
        let style = RenderStyle::default();
        assert!(paint(owned.as_deref_mut(), Some(&snapshot()), &style));
        assert!(paint(owned.as_deref_mut(), Some(&snapshot()), &style));
        assert_eq!(recorder.commands().len(), 12);
    }

    #[test]
    fn paint_replays_the_rendered_frame() {
        let recorder = RecordingSurface::new();
        let mut surface = recorder.clone();
        let style = RenderStyle::default();
        assert!(paint(Some(&mut surface), Some(&snapshot()), &style));
        assert_eq!(recorder.commands(), render(&snapshot(), &style));

        recorder.reset();
        assert!(recorder.commands().is_empty());
    }
}
