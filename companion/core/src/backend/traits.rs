//! Collaborator Traits
//!
//! The coordination layer talks to the outside world only through these
//! traits. Each one is constructed explicitly and handed to the
//! [`Coordinator`](crate::coordinator::Coordinator), so tests can swap in
//! scripted fakes.
//!
//! Async traits resolve on background tasks; their results are posted back to
//! the coordination loop tagged with the session token that requested them.

use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::edge::WindowInfo;
use crate::geometry::Rect;
use crate::media::{MediaError, MediaSource};
use crate::speech::{SpeechError, VoiceType};

/// Identifier of one running audio playback
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlaybackId(pub u64);

impl std::fmt::Display for PlaybackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "playback#{}", self.0)
    }
}

/// A playback that has started
///
/// `finished` resolves with `true` when the audio played to the end and with
/// `false` (or a closed channel) when it was stopped or broke off.
#[derive(Debug)]
pub struct Playback {
    /// Identifier used to stop the playback
    pub id: PlaybackId,
    /// End-of-playback signal
    pub finished: oneshot::Receiver<bool>,
}

impl Playback {
    /// Create a playback and the sender that signals its end
    #[must_use]
    pub fn new(id: PlaybackId) -> (Self, oneshot::Sender<bool>) {
        let (tx, rx) = oneshot::channel();
        (Self { id, finished: rx }, tx)
    }
}

/// Text-to-speech service
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Get the service name (for logging)
    fn name(&self) -> &'static str;

    /// Synthesize `text` with `voice`, returning encoded audio bytes
    async fn synthesize(&self, text: &str, voice: VoiceType) -> Result<Vec<u8>, SpeechError>;
}

/// Local audio sink for already-fetched bytes
pub trait AudioOutput: Send + Sync {
    /// Start playing encoded audio
    fn play(&self, audio: Vec<u8>) -> Result<Playback, MediaError>;

    /// Stop a playback; unknown ids are ignored
    fn stop(&self, id: PlaybackId);
}

/// Fetch, decode and play a music track
#[async_trait]
pub trait MediaPlayer: Send + Sync {
    /// Start playback of `source`
    ///
    /// Resolves once playback is actually running (the ready signal) or with
    /// the reason it could not start.
    async fn start(&self, source: &MediaSource) -> Result<Playback, MediaError>;

    /// Stop a playback; unknown ids are ignored
    fn stop(&self, id: PlaybackId);
}

/// The windowing environment
pub trait WindowSource: Send + Sync {
    /// Bounds of the screen the character lives on
    fn screen_bounds(&self) -> Rect;

    /// Visible windows, front to back
    fn visible_windows(&self) -> Vec<WindowInfo>;
}
