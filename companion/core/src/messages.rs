//! Render Commands
//!
//! Typed messages from the coordination layer to the single renderer. The
//! renderer draws what it is told and holds no behavior of its own; commands
//! arrive in the order they were produced.

use serde::{Deserialize, Serialize};

use crate::behavior::{AnimationTrack, Expression, Facing, LocomotionState};
use crate::geometry::Point;

/// Commands from the coordinator to the renderer
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum RenderCommand {
    // ============================================
    // Locomotion
    // ============================================
    /// A new locomotion state was entered
    EnterState {
        /// The state
        state: LocomotionState,
    },

    /// Turn the character
    SetFacing {
        /// New facing
        facing: Facing,
    },

    /// Place the character's top-left corner
    MoveTo {
        /// New position
        position: Point,
    },

    /// Animate a drop to `target` over `duration_ms`
    FallTo {
        /// Landing position (top-left corner)
        target: Point,
        /// Fall duration in milliseconds
        duration_ms: u64,
    },

    // ============================================
    // Animation
    // ============================================
    /// Start a looping animation track
    StartTrack {
        /// Track to start
        track: AnimationTrack,
    },

    /// Stop an animation track
    StopTrack {
        /// Track to stop
        track: AnimationTrack,
    },

    /// Change the face
    SetExpression {
        /// Expression to show
        expression: Expression,
    },

    // ============================================
    // Speech
    // ============================================
    /// Show a speech bubble
    ShowBubble {
        /// Bubble text
        text: String,
        /// How long it stays, in milliseconds
        duration_ms: u64,
        /// Font size in points
        font_size: f64,
    },

    /// Remove the speech bubble
    HideBubble,

    /// One-off notice for the user (network trouble and the like)
    Notice {
        /// Notice text
        text: String,
    },
}

impl RenderCommand {
    /// Short label for logs
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::EnterState { .. } => "enter_state",
            Self::SetFacing { .. } => "set_facing",
            Self::MoveTo { .. } => "move_to",
            Self::FallTo { .. } => "fall_to",
            Self::StartTrack { .. } => "start_track",
            Self::StopTrack { .. } => "stop_track",
            Self::SetExpression { .. } => "set_expression",
            Self::ShowBubble { .. } => "show_bubble",
            Self::HideBubble => "hide_bubble",
            Self::Notice { .. } => "notice",
        }
    }
}
