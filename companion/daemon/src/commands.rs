//! Line Commands
//!
//! One command per stdin line. Anything that is not a daemon command is
//! tried as a menu action (`joke`, `set-voice-3`, `say hi`).

use companion_core::{Direction, MenuAction, Point, Rect};
use thiserror::Error;

/// Command parse failures
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    /// Nothing on the line
    #[error("empty command")]
    Empty,

    /// First word is not a known command or menu action
    #[error("unknown command: {0}")]
    Unknown(String),

    /// A command is missing arguments
    #[error("usage: {0}")]
    Usage(&'static str),

    /// An argument could not be read
    #[error("invalid {what}: {value}")]
    Invalid {
        /// Which argument
        what: &'static str,
        /// What was given
        value: String,
    },
}

/// A parsed stdin command
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Arrow key down
    Press(Direction),
    /// Arrow key up
    Release(Direction),
    /// Gated menu action
    Menu(MenuAction),
    /// Play a specific track, bypassing the gate
    Play(String),
    /// Add or move a window
    WindowAdd {
        /// Window id
        id: u64,
        /// Frame
        rect: Rect,
    },
    /// Remove a window
    WindowRemove(u64),
    /// Drop the character at a new top-left corner
    Drag(Point),
    /// Store the cloud TTS key
    ApiKey(String),
    /// Cancel the current utterance
    Cancel,
    /// Print the character state
    Snapshot,
    /// Print command help
    Help,
    /// Stop the daemon
    Quit,
}

pub const HELP: &str = "\
commands:
  press <up|down|left|right>     arrow key down
  release <up|down|left|right>   arrow key up
  play [uri]                     play a track (no uri: menu action)
  window add <id> <x> <y> <w> <h>
  window remove <id>
  drag <x> <y>                   drop the character here
  api-key <key>                  store the text-to-speech key
  cancel                         stop talking
  snapshot                       print the character state
  quit
menu actions:
  greet joke fact chat stop reset dance sleep
  say <text>   voice <0-5|label>   set-voice-<n>";

impl Command {
    /// Parse one input line
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let mut words = line.split_whitespace();
        let Some(head) = words.next() else {
            return Err(ParseError::Empty);
        };
        let args: Vec<&str> = words.collect();

        match head.to_ascii_lowercase().as_str() {
            "press" => Ok(Self::Press(direction(&args, "press <direction>")?)),
            "release" => Ok(Self::Release(direction(&args, "release <direction>")?)),
            "play" if !args.is_empty() => Ok(Self::Play(args.join(" "))),
            "window" => window(&args),
            "drag" => match args.as_slice() {
                [x, y] => Ok(Self::Drag(Point::new(number("x", x)?, number("y", y)?))),
                _ => Err(ParseError::Usage("drag <x> <y>")),
            },
            "api-key" => match args.as_slice() {
                [key] => Ok(Self::ApiKey((*key).to_string())),
                _ => Err(ParseError::Usage("api-key <key>")),
            },
            "cancel" => Ok(Self::Cancel),
            "snapshot" | "status" => Ok(Self::Snapshot),
            "help" | "?" => Ok(Self::Help),
            "quit" | "exit" => Ok(Self::Quit),
            _ => MenuAction::parse(line)
                .map(Self::Menu)
                .ok_or_else(|| ParseError::Unknown(head.to_string())),
        }
    }
}

fn direction(args: &[&str], usage: &'static str) -> Result<Direction, ParseError> {
    let [word] = args else {
        return Err(ParseError::Usage(usage));
    };
    Direction::parse(word).ok_or_else(|| ParseError::Invalid {
        what: "direction",
        value: (*word).to_string(),
    })
}

fn window(args: &[&str]) -> Result<Command, ParseError> {
    match args {
        ["add", id, x, y, w, h] => {
            let rect = Rect::new(
                number("x", x)?,
                number("y", y)?,
                number("width", w)?,
                number("height", h)?,
            );
            if rect.width <= 0.0 || rect.height <= 0.0 {
                return Err(ParseError::Invalid {
                    what: "size",
                    value: format!("{w}x{h}"),
                });
            }
            Ok(Command::WindowAdd {
                id: window_id(id)?,
                rect,
            })
        }
        ["remove", id] => Ok(Command::WindowRemove(window_id(id)?)),
        _ => Err(ParseError::Usage(
            "window add <id> <x> <y> <w> <h> | window remove <id>",
        )),
    }
}

fn window_id(s: &str) -> Result<u64, ParseError> {
    s.parse().map_err(|_| ParseError::Invalid {
        what: "window id",
        value: s.to_string(),
    })
}

fn number(what: &'static str, s: &str) -> Result<f64, ParseError> {
    s.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ParseError::Invalid {
            what,
            value: s.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use companion_core::VoiceType;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_keys() {
        assert_eq!(Command::parse("press left"), Ok(Command::Press(Direction::Left)));
        assert_eq!(Command::parse("release UP"), Ok(Command::Release(Direction::Up)));
        assert_eq!(
            Command::parse("press sideways"),
            Err(ParseError::Invalid {
                what: "direction",
                value: "sideways".to_string()
            })
        );
        assert_eq!(
            Command::parse("press"),
            Err(ParseError::Usage("press <direction>"))
        );
    }

    #[test]
    fn test_play_with_and_without_uri() {
        assert_eq!(
            Command::parse("play https://example.com/a.mp3"),
            Ok(Command::Play("https://example.com/a.mp3".to_string()))
        );
        assert_eq!(Command::parse("play"), Ok(Command::Menu(MenuAction::PlayTrack)));
    }

    #[test]
    fn test_windows() {
        assert_eq!(
            Command::parse("window add 7 10 20 300 200"),
            Ok(Command::WindowAdd {
                id: 7,
                rect: Rect::new(10.0, 20.0, 300.0, 200.0)
            })
        );
        assert_eq!(Command::parse("window remove 7"), Ok(Command::WindowRemove(7)));
        assert!(matches!(
            Command::parse("window add 7 10 20 0 200"),
            Err(ParseError::Invalid { what: "size", .. })
        ));
        assert!(matches!(
            Command::parse("window add x 10 20 30 40"),
            Err(ParseError::Invalid { what: "window id", .. })
        ));
    }

    #[test]
    fn test_drag_rejects_non_numbers() {
        assert_eq!(
            Command::parse("drag 12.5 40"),
            Ok(Command::Drag(Point::new(12.5, 40.0)))
        );
        assert!(matches!(
            Command::parse("drag 1 NaN"),
            Err(ParseError::Invalid { what: "y", .. })
        ));
    }

    #[test]
    fn test_menu_fallthrough() {
        assert_eq!(Command::parse("joke"), Ok(Command::Menu(MenuAction::TellJoke)));
        assert_eq!(
            Command::parse("set-voice-4"),
            Ok(Command::Menu(MenuAction::SetVoice(VoiceType::Cheerful)))
        );
        assert_eq!(
            Command::parse("say good morning"),
            Ok(Command::Menu(MenuAction::Say("good morning".to_string())))
        );
        assert_eq!(
            Command::parse("fly"),
            Err(ParseError::Unknown("fly".to_string()))
        );
    }

    #[test]
    fn test_control_words() {
        assert_eq!(Command::parse("   "), Err(ParseError::Empty));
        assert_eq!(Command::parse("status"), Ok(Command::Snapshot));
        assert_eq!(Command::parse("exit"), Ok(Command::Quit));
        assert_eq!(Command::parse("cancel"), Ok(Command::Cancel));
        assert_eq!(Command::parse("api-key abc"), Ok(Command::ApiKey("abc".to_string())));
    }
}
