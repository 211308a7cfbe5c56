//! Render Output
//!
//! The daemon's renderer is stdout: one line per [`RenderCommand`], either
//! human-readable or as JSON for a driving process.

use companion_core::behavior::CharacterSnapshot;
use companion_core::RenderCommand;

/// Output format for stdout
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format {
    /// `label detail` lines
    Text,
    /// One JSON object per line
    Json,
}

impl Format {
    pub fn from_json_flag(json: bool) -> Self {
        if json {
            Self::Json
        } else {
            Self::Text
        }
    }

    /// Render command as one output line
    pub fn command(self, command: &RenderCommand) -> Result<String, serde_json::Error> {
        match self {
            Self::Json => serde_json::to_string(command),
            Self::Text => Ok(describe(command)),
        }
    }

    /// Character state as one output line
    pub fn snapshot(self, snapshot: &CharacterSnapshot) -> Result<String, serde_json::Error> {
        match self {
            Self::Json => serde_json::to_string(&serde_json::json!({ "Snapshot": snapshot })),
            Self::Text => Ok(format!(
                "snapshot {} facing={:?} at=({:.1}, {:.1}) face={:?} speaking={} music={}",
                snapshot.state,
                snapshot.facing,
                snapshot.position.x,
                snapshot.position.y,
                snapshot.expression,
                snapshot.speaking.is_some(),
                snapshot.media.is_some(),
            )),
        }
    }
}

fn describe(command: &RenderCommand) -> String {
    let label = command.label();
    match command {
        RenderCommand::EnterState { state } => format!("{label} {state}"),
        RenderCommand::SetFacing { facing } => format!("{label} {facing:?}"),
        RenderCommand::MoveTo { position } => {
            format!("{label} ({:.1}, {:.1})", position.x, position.y)
        }
        RenderCommand::FallTo {
            target,
            duration_ms,
        } => format!(
            "{label} ({:.1}, {:.1}) over {duration_ms}ms",
            target.x, target.y
        ),
        RenderCommand::StartTrack { track } | RenderCommand::StopTrack { track } => {
            format!("{label} {track:?}")
        }
        RenderCommand::SetExpression { expression } => format!("{label} {expression:?}"),
        RenderCommand::ShowBubble {
            text, duration_ms, ..
        } => format!("{label} [{duration_ms}ms] {text}"),
        RenderCommand::HideBubble => label.to_string(),
        RenderCommand::Notice { text } => format!("{label} {text}"),
    }
}

#[cfg(test)]
mod tests {
    use companion_core::{AnimationTrack, Direction, LocomotionState, Point};
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_text_lines() {
        let text = Format::Text;
        assert_eq!(
            text.command(&RenderCommand::EnterState {
                state: LocomotionState::Walking(Direction::Left)
            })
            .unwrap(),
            "enter_state walking(Left)"
        );
        assert_eq!(
            text.command(&RenderCommand::FallTo {
                target: Point::new(10.0, 552.0),
                duration_ms: 1000
            })
            .unwrap(),
            "fall_to (10.0, 552.0) over 1000ms"
        );
        assert_eq!(
            text.command(&RenderCommand::StopTrack {
                track: AnimationTrack::WalkCycle
            })
            .unwrap(),
            "stop_track WalkCycle"
        );
        assert_eq!(
            text.command(&RenderCommand::ShowBubble {
                text: "hi".to_string(),
                duration_ms: 5000,
                font_size: 14.0
            })
            .unwrap(),
            "show_bubble [5000ms] hi"
        );
        assert_eq!(text.command(&RenderCommand::HideBubble).unwrap(), "hide_bubble");
    }

    #[test]
    fn test_json_line_parses_back() {
        let cmd = RenderCommand::Notice {
            text: "offline".to_string(),
        };
        let line = Format::Json.command(&cmd).unwrap();
        assert!(!line.contains('\n'));
        let back: RenderCommand = serde_json::from_str(&line).unwrap();
        assert_eq!(back, cmd);
    }

    #[test]
    fn test_format_from_flag() {
        assert_eq!(Format::from_json_flag(true), Format::Json);
        assert_eq!(Format::from_json_flag(false), Format::Text);
    }
}
