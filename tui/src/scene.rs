//! Scene State
//!
//! What the playground draws, rebuilt purely from [`RenderCommand`]s. The
//! scene holds no behavior: it only remembers the last thing it was told and
//! animates falls and bubbles over time.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use companion_core::{
    AnimationTrack, Expression, Facing, LocomotionState, Point, RenderCommand,
};

/// How long a notice stays in the status line
const NOTICE_TTL: Duration = Duration::from_secs(6);

/// A fall in progress
#[derive(Clone, Debug, PartialEq)]
struct Fall {
    from: Point,
    to: Point,
    started: Instant,
    duration: Duration,
}

/// Bubble on screen
#[derive(Clone, Debug, PartialEq)]
pub struct Bubble {
    /// Text to show
    pub text: String,
    /// When it disappears on its own
    pub expires: Instant,
}

/// Renderer-side view of the character
#[derive(Debug)]
pub struct Scene {
    state: LocomotionState,
    facing: Facing,
    expression: Expression,
    position: Point,
    fall: Option<Fall>,
    tracks: HashSet<AnimationTrack>,
    bubble: Option<Bubble>,
    notice: Option<(String, Instant)>,
    commands_seen: u64,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    /// Empty scene at the origin
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: LocomotionState::Idle,
            facing: Facing::Right,
            expression: Expression::Content,
            position: Point::new(0.0, 0.0),
            fall: None,
            tracks: HashSet::new(),
            bubble: None,
            notice: None,
            commands_seen: 0,
        }
    }

    /// Apply one command received at `now`
    pub fn apply(&mut self, command: RenderCommand, now: Instant) {
        self.commands_seen += 1;
        match command {
            RenderCommand::EnterState { state } => self.state = state,
            RenderCommand::SetFacing { facing } => self.facing = facing,
            RenderCommand::MoveTo { position } => {
                self.fall = None;
                self.position = position;
            }
            RenderCommand::FallTo {
                target,
                duration_ms,
            } => {
                self.fall = Some(Fall {
                    from: self.position_at(now),
                    to: target,
                    started: now,
                    duration: Duration::from_millis(duration_ms),
                });
                self.position = target;
            }
            RenderCommand::StartTrack { track } => {
                self.tracks.insert(track);
            }
            RenderCommand::StopTrack { track } => {
                self.tracks.remove(&track);
            }
            RenderCommand::SetExpression { expression } => self.expression = expression,
            RenderCommand::ShowBubble {
                text, duration_ms, ..
            } => {
                self.bubble = Some(Bubble {
                    text,
                    expires: now + Duration::from_millis(duration_ms),
                });
            }
            RenderCommand::HideBubble => self.bubble = None,
            RenderCommand::Notice { text } => self.notice = Some((text, now + NOTICE_TTL)),
        }
    }

    /// Drop expired bubbles and notices
    pub fn tick(&mut self, now: Instant) {
        if self.bubble.as_ref().is_some_and(|b| now >= b.expires) {
            self.bubble = None;
        }
        if self.notice.as_ref().is_some_and(|(_, until)| now >= *until) {
            self.notice = None;
        }
        if self
            .fall
            .as_ref()
            .is_some_and(|f| now >= f.started + f.duration)
        {
            self.fall = None;
        }
    }

    /// Where to draw the character at `now`
    ///
    /// Falls accelerate toward the landing point.
    #[must_use]
    pub fn position_at(&self, now: Instant) -> Point {
        let Some(ref fall) = self.fall else {
            return self.position;
        };
        if fall.duration.is_zero() {
            return fall.to;
        }
        let t = (now.saturating_duration_since(fall.started).as_secs_f64()
            / fall.duration.as_secs_f64())
        .min(1.0);
        let eased = t * t;
        Point::new(
            fall.from.x + (fall.to.x - fall.from.x) * eased,
            fall.from.y + (fall.to.y - fall.from.y) * eased,
        )
    }

    /// Current locomotion state
    #[must_use]
    pub fn state(&self) -> &LocomotionState {
        &self.state
    }

    /// Current facing
    #[must_use]
    pub fn facing(&self) -> Facing {
        self.facing
    }

    /// Current face
    #[must_use]
    pub fn expression(&self) -> Expression {
        self.expression
    }

    /// Whether a track is running
    #[must_use]
    pub fn is_playing(&self, track: AnimationTrack) -> bool {
        self.tracks.contains(&track)
    }

    /// Visible bubble
    #[must_use]
    pub fn bubble(&self) -> Option<&Bubble> {
        self.bubble.as_ref()
    }

    /// Visible notice
    #[must_use]
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_ref().map(|(text, _)| text.as_str())
    }

    /// Commands applied so far
    #[must_use]
    pub fn commands_seen(&self) -> u64 {
        self.commands_seen
    }
}
