//! Coordinator Events
//!
//! Everything that reaches the coordination loop arrives as a
//! [`CoordinatorEvent`]: user input, menu actions, programmatic speech and
//! media requests, and results posted back by background tasks. Events are
//! handled strictly in the order they were sent.

use std::time::Duration;

use thiserror::Error;
use tokio::sync::oneshot;

use crate::backend::Playback;
use crate::behavior::{CharacterSnapshot, Direction};
use crate::gate::Busy;
use crate::geometry::Point;
use crate::media::{MediaCompletion, MediaError, MediaStage, MediaToken};
use crate::speech::{SpeechCompletion, SpeechError, SpeechToken, VoiceType};

/// Key transition
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyPhase {
    /// Key went down (repeats are ignored)
    Pressed,
    /// Key went up
    Released,
}

/// Discrete commands from the context menu
///
/// Every menu action passes through the action gate; rejected actions are
/// dropped.
#[derive(Clone, Debug, PartialEq)]
pub enum MenuAction {
    /// Greeting for the time of day
    SpeakGreeting,
    /// A joke, followed by a moment of excitement
    TellJoke,
    /// A fun fact
    ShareFact,
    /// A scripted multi-line conversation
    StartConversation,
    /// Persist a new voice and speak a sample in it
    SetVoice(VoiceType),
    /// Play a track from the configured list
    PlayTrack,
    /// Stop the current track
    StopMusic,
    /// Back to the home position
    ResetPosition,
    /// Dance for a while
    Dance,
    /// Doze off
    Sleep,
    /// Say free text
    Say(String),
}

impl MenuAction {
    /// Parse a command word such as `joke`, `set-voice-2` or `say hello`
    #[must_use]
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        let (word, rest) = input
            .split_once(char::is_whitespace)
            .map_or((input, ""), |(w, r)| (w, r.trim()));

        let action = match word.to_ascii_lowercase().as_str() {
            "greet" | "greeting" | "speak-greeting" => Self::SpeakGreeting,
            "joke" | "tell-joke" => Self::TellJoke,
            "fact" | "share-fact" => Self::ShareFact,
            "chat" | "conversation" | "start-conversation" => Self::StartConversation,
            "play" | "play-track" => Self::PlayTrack,
            "stop" | "stop-music" => Self::StopMusic,
            "reset" | "reset-position" => Self::ResetPosition,
            "dance" => Self::Dance,
            "sleep" => Self::Sleep,
            "say" if !rest.is_empty() => Self::Say(rest.to_string()),
            "voice" => Self::SetVoice(parse_voice(rest)?),
            other => {
                let voice = other.strip_prefix("set-voice-")?;
                Self::SetVoice(parse_voice(voice)?)
            }
        };
        Some(action)
    }

    /// Short name for logs
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::SpeakGreeting => "speak-greeting",
            Self::TellJoke => "tell-joke",
            Self::ShareFact => "share-fact",
            Self::StartConversation => "start-conversation",
            Self::SetVoice(_) => "set-voice",
            Self::PlayTrack => "play-track",
            Self::StopMusic => "stop-music",
            Self::ResetPosition => "reset-position",
            Self::Dance => "dance",
            Self::Sleep => "sleep",
            Self::Say(_) => "say",
        }
    }
}

/// Voice by index (`0`–`5`) or label (`sleepy`)
fn parse_voice(s: &str) -> Option<VoiceType> {
    if let Ok(index) = s.parse::<i64>() {
        return VoiceType::from_index(index);
    }
    VoiceType::ALL
        .iter()
        .copied()
        .find(|v| v.label().eq_ignore_ascii_case(s))
}

/// A menu action could not be dispatched
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    /// The action gate refused it
    #[error(transparent)]
    Busy(#[from] Busy),

    /// The coordinator is no longer running
    #[error("coordinator stopped")]
    Closed,
}

/// Input to the coordination loop
pub enum CoordinatorEvent {
    // ============================================
    // Input
    // ============================================
    /// Directional key
    Key {
        /// Which arrow
        direction: Direction,
        /// Down or up
        phase: KeyPhase,
    },

    /// Context menu action
    Menu {
        /// The action
        action: MenuAction,
        /// Receives the gate's verdict
        reply: Option<oneshot::Sender<Result<(), Busy>>>,
    },

    /// Speak text directly (not gated)
    Speak {
        /// Text to show and say
        text: String,
        /// Bubble duration
        duration: Duration,
        /// Fires once unless the utterance is replaced
        completion: Option<SpeechCompletion>,
    },

    /// Cancel the current utterance
    CancelSpeech,

    /// Play a track directly (not gated)
    Play {
        /// URI or local path
        uri: String,
        /// Fires once with whether playback started
        completion: Option<MediaCompletion>,
    },

    /// Stop the current track
    StopMusic,

    /// The character was dragged to a new top-left corner
    Drag {
        /// Where it was dropped
        origin: Point,
    },

    /// The window list changed
    WindowsChanged,

    // ============================================
    // Background Results
    // ============================================
    /// Synthesis finished for a speech session
    SpeechAudio {
        /// Session that asked
        token: SpeechToken,
        /// Audio bytes or the reason there are none
        result: Result<Vec<u8>, SpeechError>,
    },

    /// A media stage finished starting
    MediaStart {
        /// Session that asked
        token: MediaToken,
        /// Stage that was attempted
        stage: MediaStage,
        /// Running playback or the failure
        result: Result<Playback, MediaError>,
    },

    /// A running track ended
    MediaFinished {
        /// Session whose playback ended
        token: MediaToken,
        /// Whether it played to the end
        completed: bool,
    },

    // ============================================
    // Control
    // ============================================
    /// Read the character state
    Snapshot(oneshot::Sender<CharacterSnapshot>),

    /// Stop the loop
    Shutdown,
}

impl CoordinatorEvent {
    /// Event name for logs
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Key { .. } => "key",
            Self::Menu { .. } => "menu",
            Self::Speak { .. } => "speak",
            Self::CancelSpeech => "cancel-speech",
            Self::Play { .. } => "play",
            Self::StopMusic => "stop-music",
            Self::Drag { .. } => "drag",
            Self::WindowsChanged => "windows-changed",
            Self::SpeechAudio { .. } => "speech-audio",
            Self::MediaStart { .. } => "media-start",
            Self::MediaFinished { .. } => "media-finished",
            Self::Snapshot(_) => "snapshot",
            Self::Shutdown => "shutdown",
        }
    }
}

impl std::fmt::Debug for CoordinatorEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Key { direction, phase } => f
                .debug_struct("Key")
                .field("direction", direction)
                .field("phase", phase)
                .finish(),
            Self::Menu { action, .. } => f.debug_struct("Menu").field("action", action).finish(),
            Self::Speak { text, duration, .. } => f
                .debug_struct("Speak")
                .field("text", text)
                .field("duration", duration)
                .finish(),
            Self::Play { uri, .. } => f.debug_struct("Play").field("uri", uri).finish(),
            Self::Drag { origin } => f.debug_struct("Drag").field("origin", origin).finish(),
            Self::SpeechAudio { token, result } => f
                .debug_struct("SpeechAudio")
                .field("token", token)
                .field("ok", &result.is_ok())
                .finish(),
            Self::MediaStart { token, stage, result } => f
                .debug_struct("MediaStart")
                .field("token", token)
                .field("stage", stage)
                .field("ok", &result.is_ok())
                .finish(),
            Self::MediaFinished { token, completed } => f
                .debug_struct("MediaFinished")
                .field("token", token)
                .field("completed", completed)
                .finish(),
            other => f.write_str(other.label()),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_parse_menu_words() {
        assert_eq!(MenuAction::parse("joke"), Some(MenuAction::TellJoke));
        assert_eq!(MenuAction::parse("  Tell-Joke "), Some(MenuAction::TellJoke));
        assert_eq!(MenuAction::parse("reset-position"), Some(MenuAction::ResetPosition));
        assert_eq!(MenuAction::parse("play"), Some(MenuAction::PlayTrack));
        assert_eq!(MenuAction::parse("nonsense"), None);
    }

    #[test]
    fn test_parse_voice_forms() {
        assert_eq!(
            MenuAction::parse("set-voice-2"),
            Some(MenuAction::SetVoice(VoiceType::Sleepy))
        );
        assert_eq!(
            MenuAction::parse("voice robot"),
            Some(MenuAction::SetVoice(VoiceType::Robot))
        );
        assert_eq!(MenuAction::parse("set-voice-9"), None);
        assert_eq!(MenuAction::parse("voice"), None);
    }

    #[test]
    fn test_parse_say_keeps_text() {
        assert_eq!(
            MenuAction::parse("say hello there"),
            Some(MenuAction::Say("hello there".to_string()))
        );
        assert_eq!(MenuAction::parse("say"), None);
    }

    #[test]
    fn test_busy_converts_to_dispatch_error() {
        let err: DispatchError = Busy.into();
        assert_eq!(err, DispatchError::Busy(Busy));
    }
}
