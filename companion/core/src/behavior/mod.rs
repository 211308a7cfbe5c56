//! Character Behavior
//!
//! The locomotion states, the animation tracks that belong to each of them and
//! the state machine that moves between them.
//!
//! # States
//!
//! ```text
//!              keys                         screen edge + window edge
//!   Idle ◄──────────────► Walking ─────────────────────────────► EdgeWalking
//!    │ ▲                     ▲                                        │
//!    │ │ doze                │ left edge at floor                     │ left edge
//!    ▼ │ wake                └────────────────────────────────────────┤ above floor
//!  Sleeping                                                           ▼
//!                                              Idle ◄── fixed time ── Falling
//!
//!   ListeningToMusic ◄── media start       Dancing / Excited ── expiry ──► Idle or music
//! ```
//!
//! Exactly one locomotion state is active. Speaking is an overlay on top of
//! any of them.

mod machine;

pub use machine::{BehaviorStateMachine, CharacterSnapshot};

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::edge::EdgeBinding;

/// State machine errors
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StateError {
    /// The requested transition is never legal
    #[error("invalid transition from {from} to {to}")]
    InvalidTransition {
        /// State at the time of the request
        from: &'static str,
        /// Requested state
        to: &'static str,
    },

    /// Only an Idle reset can interrupt a fall
    #[error("falling; only an idle reset can interrupt")]
    FallInProgress,
}

/// Directional input
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Toward the top of the screen
    Up,
    /// Toward the floor
    Down,
    /// Toward the left
    Left,
    /// Toward the right
    Right,
}

impl Direction {
    /// Unit step `(dx, dy)` in screen coordinates
    #[must_use]
    pub fn unit(self) -> (f64, f64) {
        match self {
            Self::Up => (0.0, -1.0),
            Self::Down => (0.0, 1.0),
            Self::Left => (-1.0, 0.0),
            Self::Right => (1.0, 0.0),
        }
    }

    /// Whether this direction moves along the x axis
    #[must_use]
    pub fn is_horizontal(self) -> bool {
        matches!(self, Self::Left | Self::Right)
    }

    /// Parse `up`, `down`, `left` or `right`
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "up" | "u" => Some(Self::Up),
            "down" | "d" => Some(Self::Down),
            "left" | "l" => Some(Self::Left),
            "right" | "r" => Some(Self::Right),
            _ => None,
        }
    }
}

/// Which way the character looks
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Facing {
    /// Looking left
    Left,
    /// Looking right
    #[default]
    Right,
}

/// Locomotion/activity state
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum LocomotionState {
    /// Standing still
    #[default]
    Idle,
    /// Moving under keyboard control
    Walking(Direction),
    /// Walking along a window edge
    EdgeWalking(EdgeBinding),
    /// Dropping to the floor after leaving an edge
    Falling,
    /// Bobbing along to music
    ListeningToMusic,
    /// Dancing for a while
    Dancing,
    /// Bouncing for a moment
    Excited,
    /// Asleep after a long idle stretch
    Sleeping,
}

impl LocomotionState {
    /// Short name for logs and errors
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Walking(_) => "walking",
            Self::EdgeWalking(_) => "edge-walking",
            Self::Falling => "falling",
            Self::ListeningToMusic => "listening-to-music",
            Self::Dancing => "dancing",
            Self::Excited => "excited",
            Self::Sleeping => "sleeping",
        }
    }

    /// Main body track of the state
    #[must_use]
    pub fn body_track(&self) -> AnimationTrack {
        match self {
            Self::Idle => AnimationTrack::Breathe,
            Self::Walking(_) => AnimationTrack::WalkCycle,
            Self::EdgeWalking(_) => AnimationTrack::EdgeShuffle,
            Self::Falling => AnimationTrack::Tumble,
            Self::ListeningToMusic => AnimationTrack::HeadBob,
            Self::Dancing => AnimationTrack::DanceRoutine,
            Self::Excited => AnimationTrack::Bounce,
            Self::Sleeping => AnimationTrack::Snooze,
        }
    }

    /// Derived sub-node tracks started alongside the body track
    #[must_use]
    pub fn sub_tracks(&self) -> &'static [AnimationTrack] {
        match self {
            Self::Idle | Self::Falling | Self::Excited => &[AnimationTrack::EarWiggle],
            Self::Walking(_) | Self::ListeningToMusic | Self::Dancing => {
                &[AnimationTrack::EarWiggle, AnimationTrack::BodyWobble]
            }
            Self::EdgeWalking(_) => &[AnimationTrack::BodyWobble],
            Self::Sleeping => &[],
        }
    }

    /// Face shown when the character is not speaking
    #[must_use]
    pub fn resting_expression(&self) -> Expression {
        match self {
            Self::Idle => Expression::Content,
            Self::Walking(_) | Self::EdgeWalking(_) => Expression::Focused,
            Self::Falling => Expression::Startled,
            Self::ListeningToMusic => Expression::Blissful,
            Self::Dancing => Expression::Joyful,
            Self::Excited => Expression::Cheerful,
            Self::Sleeping => Expression::Asleep,
        }
    }

    /// Whether the state ends by itself after a fixed time
    #[must_use]
    pub fn is_timed(&self) -> bool {
        matches!(self, Self::Falling | Self::Dancing | Self::Excited)
    }
}

impl std::fmt::Display for LocomotionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Walking(dir) => write!(f, "walking({dir:?})"),
            Self::EdgeWalking(b) => write!(f, "edge-walking({:?} of {})", b.edge, b.window_id),
            other => f.write_str(other.name()),
        }
    }
}

/// Named animation tracks the renderer knows how to play
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnimationTrack {
    // Body tracks (one per locomotion state)
    /// Slow idle breathing
    Breathe,
    /// Walk cycle
    WalkCycle,
    /// Sideways shuffle along an edge
    EdgeShuffle,
    /// Tumbling fall
    Tumble,
    /// Head bob to music
    HeadBob,
    /// Dance routine
    DanceRoutine,
    /// Excited bouncing
    Bounce,
    /// Sleeping, with floating Zs
    Snooze,

    // Sub-node tracks
    /// Ear wiggle
    EarWiggle,
    /// Body wobble
    BodyWobble,

    // Speaking overlay
    /// Mouth movement while speaking
    MouthTalk,
}

impl AnimationTrack {
    /// Whether this is a locomotion body track
    #[must_use]
    pub fn is_locomotion(self) -> bool {
        !matches!(self, Self::EarWiggle | Self::BodyWobble | Self::MouthTalk)
    }
}

/// Facial expression
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Expression {
    /// Calm smile
    #[default]
    Content,
    /// Big smile
    Cheerful,
    /// Concentrating on the way
    Focused,
    /// Eyes wide
    Startled,
    /// Eyes closed, enjoying music
    Blissful,
    /// Grinning
    Joyful,
    /// Eyes shut
    Asleep,
    /// Mouth animating
    Talking,
}

/// Movement and timing parameters of the state machine
#[derive(Clone, Debug, PartialEq)]
pub struct BehaviorTuning {
    /// Pixels per movement tick
    pub step_px: f64,
    /// Ticks closer together than this are dropped
    pub min_tick_spacing: Duration,
    /// Character bounding box width
    pub character_width: f64,
    /// Character bounding box height
    pub character_height: f64,
    /// Edge detection tolerance in pixels
    pub edge_tolerance: f64,
    /// How far above the floor leaving an edge turns into a fall
    pub floor_threshold: f64,
    /// Fixed duration of a fall
    pub fall_duration: Duration,
    /// Duration of `Excited`
    pub excited_duration: Duration,
    /// Duration of `Dancing`
    pub dance_duration: Duration,
    /// Idle time before dozing off
    pub sleep_after: Duration,
}

impl Default for BehaviorTuning {
    fn default() -> Self {
        Self {
            step_px: 5.0,
            min_tick_spacing: Duration::from_millis(10),
            character_width: 48.0,
            character_height: 48.0,
            edge_tolerance: 6.0,
            floor_threshold: 2.0,
            fall_duration: Duration::from_millis(1000),
            excited_duration: Duration::from_millis(2000),
            dance_duration: Duration::from_millis(6000),
            sleep_after: Duration::from_secs(90),
        }
    }
}
