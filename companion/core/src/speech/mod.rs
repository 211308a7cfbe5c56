//! Speech Sessions
//!
//! One utterance at a time: a bubble on screen, TTS audio underneath and a
//! completion callback. Starting a new session replaces the current one
//! synchronously; the replaced session is handed back to the caller so its
//! audio and bubble can be torn down, and its completion never fires.
//!
//! ```text
//! begin("hi") ──► [hi]            audio pending
//! begin("bye") ─► [bye]           "hi" returned as replaced, dropped silently
//! expiry(bye) ──► finish ──► completion(bye, Elapsed)   exactly once
//! ```
//!
//! The manager never touches collaborators itself. The coordinator turns its
//! answers into render commands, audio calls and timers.

mod conversation;
mod dialogue;
mod voice;

pub use conversation::{conversation_line_duration, Conversation, ConversationToken};
pub use dialogue::{DayPart, DialogueBook};
pub use voice::{VoiceParams, VoiceType};

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::Instant;

use crate::backend::PlaybackId;

/// Speech errors
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SpeechError {
    /// The TTS service could not be reached
    #[error("speech service unreachable: {0}")]
    NetworkUnavailable(String),

    /// No API key configured for the TTS service
    #[error("no speech API key configured")]
    MissingApiKey,

    /// The service answered with an error status
    #[error("speech service returned {status}: {body}")]
    Service {
        /// HTTP status code
        status: u16,
        /// Response body (truncated)
        body: String,
    },

    /// The service answered with something that is not audio
    #[error("invalid speech response: {0}")]
    InvalidResponse(String),

    /// Audio was synthesized but could not be played
    #[error("speech playback failed: {0}")]
    Playback(String),
}

impl SpeechError {
    /// Whether this error means the network is down (degraded mode)
    #[must_use]
    pub fn is_network(&self) -> bool {
        matches!(self, Self::NetworkUnavailable(_))
    }
}

/// Identifier of one speech session
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SpeechToken(pub u64);

impl std::fmt::Display for SpeechToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "speech#{}", self.0)
    }
}

/// How a session ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpeechEnd {
    /// The display duration ran out
    Elapsed,
    /// `cancel()` was called
    Cancelled,
}

/// State of the audio half of a session
#[derive(Clone, Debug, PartialEq)]
pub enum AudioStatus {
    /// Synthesis still running
    Pending,
    /// Audio is playing
    Playing(PlaybackId),
    /// Bubble only; the reason audio is missing
    Unavailable(SpeechError),
}

/// Delivered to the completion callback
#[derive(Clone, Debug, PartialEq)]
pub struct SpeechOutcome {
    /// Session that ended
    pub token: SpeechToken,
    /// How it ended
    pub end: SpeechEnd,
    /// What happened to its audio
    pub audio: AudioStatus,
}

/// Completion callback, fired exactly once for sessions that are not replaced
pub type SpeechCompletion = Box<dyn FnOnce(SpeechOutcome) + Send>;

/// Who asked for the utterance
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpeechOrigin {
    /// A menu action or free text
    Direct,
    /// A line of a scripted conversation
    Conversation(ConversationToken),
}

/// Parameters of a speak request
#[derive(Clone, Debug, PartialEq)]
pub struct SpeechRequest {
    /// Text to show and say
    pub text: String,
    /// How long the bubble stays
    pub duration: Duration,
    /// Bubble font size in points
    pub font_size: f64,
    /// Voice to synthesize with
    pub voice: VoiceType,
    /// Who asked
    pub origin: SpeechOrigin,
}

/// One utterance
pub struct SpeechSession {
    token: SpeechToken,
    text: String,
    duration: Duration,
    font_size: f64,
    voice: VoiceType,
    started_at: Instant,
    origin: SpeechOrigin,
    audio: AudioStatus,
    completion: Option<SpeechCompletion>,
}

impl SpeechSession {
    /// Session token
    #[must_use]
    pub fn token(&self) -> SpeechToken {
        self.token
    }

    /// Text being spoken
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Display duration
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Bubble font size
    #[must_use]
    pub fn font_size(&self) -> f64 {
        self.font_size
    }

    /// Voice used for synthesis
    #[must_use]
    pub fn voice(&self) -> VoiceType {
        self.voice
    }

    /// When the session began
    #[must_use]
    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    /// When the bubble expires
    #[must_use]
    pub fn expires_at(&self) -> Instant {
        self.started_at + self.duration
    }

    /// Who asked for it
    #[must_use]
    pub fn origin(&self) -> SpeechOrigin {
        self.origin
    }

    /// Audio state
    #[must_use]
    pub fn audio(&self) -> &AudioStatus {
        &self.audio
    }

    /// Playback to stop on teardown, if audio is running
    #[must_use]
    pub fn playback(&self) -> Option<PlaybackId> {
        match self.audio {
            AudioStatus::Playing(id) => Some(id),
            _ => None,
        }
    }

    /// Fire the completion callback and consume the session
    pub fn complete(mut self, end: SpeechEnd) -> SpeechOutcome {
        let outcome = SpeechOutcome {
            token: self.token,
            end,
            audio: self.audio.clone(),
        };
        if let Some(completion) = self.completion.take() {
            completion(outcome.clone());
        }
        outcome
    }
}

impl std::fmt::Debug for SpeechSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpeechSession")
            .field("token", &self.token)
            .field("text", &self.text)
            .field("duration", &self.duration)
            .field("origin", &self.origin)
            .field("audio", &self.audio)
            .field("has_completion", &self.completion.is_some())
            .finish_non_exhaustive()
    }
}

/// What `audio_ready` decided
#[derive(Debug, PartialEq)]
pub enum AudioAcceptance {
    /// The session is current; play the bytes
    Accept,
    /// The session is gone; drop the bytes
    Stale,
}

/// Owner of the single active speech session
#[derive(Debug, Default)]
pub struct SpeechManager {
    current: Option<SpeechSession>,
    next_token: u64,
}

impl SpeechManager {
    /// Create an empty manager
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a session, replacing any current one
    ///
    /// Returns the new token and the replaced session. The replaced session's
    /// completion is dropped without firing.
    pub fn begin(
        &mut self,
        request: SpeechRequest,
        now: Instant,
        completion: Option<SpeechCompletion>,
    ) -> (SpeechToken, Option<SpeechSession>) {
        self.next_token += 1;
        let token = SpeechToken(self.next_token);

        let replaced = self.current.replace(SpeechSession {
            token,
            text: request.text,
            duration: request.duration,
            font_size: request.font_size,
            voice: request.voice,
            started_at: now,
            origin: request.origin,
            audio: AudioStatus::Pending,
            completion,
        });

        let replaced = replaced.map(|mut old| {
            old.completion = None;
            old
        });

        if let Some(old) = &replaced {
            tracing::debug!(old = %old.token, new = %token, "Speech session replaced");
        }

        (token, replaced)
    }

    /// Active session, if any
    #[must_use]
    pub fn current(&self) -> Option<&SpeechSession> {
        self.current.as_ref()
    }

    /// Whether `token` names the active session
    #[must_use]
    pub fn is_current(&self, token: SpeechToken) -> bool {
        self.current.as_ref().is_some_and(|s| s.token == token)
    }

    /// Whether any session is active
    #[must_use]
    pub fn is_speaking(&self) -> bool {
        self.current.is_some()
    }

    /// Synthesized audio arrived for `token`
    pub fn audio_ready(&self, token: SpeechToken) -> AudioAcceptance {
        if self.is_current(token) {
            AudioAcceptance::Accept
        } else {
            AudioAcceptance::Stale
        }
    }

    /// Audio for `token` started playing
    ///
    /// Returns `false` when the session is no longer current; the caller must
    /// stop the playback.
    pub fn audio_started(&mut self, token: SpeechToken, playback: PlaybackId) -> bool {
        match self.current.as_mut() {
            Some(session) if session.token == token => {
                session.audio = AudioStatus::Playing(playback);
                true
            }
            _ => false,
        }
    }

    /// Audio for `token` could not be produced; the bubble carries on alone
    pub fn audio_failed(&mut self, token: SpeechToken, error: SpeechError) -> bool {
        match self.current.as_mut() {
            Some(session) if session.token == token => {
                session.audio = AudioStatus::Unavailable(error);
                true
            }
            _ => false,
        }
    }

    /// Remove the session named by `token` so the caller can complete it
    pub fn finish(&mut self, token: SpeechToken) -> Option<SpeechSession> {
        if self.is_current(token) {
            self.current.take()
        } else {
            None
        }
    }

    /// Remove the active session so the caller can complete it as cancelled
    pub fn cancel(&mut self) -> Option<SpeechSession> {
        self.current.take()
    }
}
