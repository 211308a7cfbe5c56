//! Media Sessions
//!
//! Playback of one music track at a time, independent of speech. A session
//! walks a two-step fallback chain:
//!
//! ```text
//! begin ──► Remote ──ok──────────────────────► Started   completion(true)
//!             │
//!             └─fail─► Fallback ──ok─────────► Started   completion(true)
//!                         │
//!                         └─fail─────────────► Failed    completion(false)
//! ```
//!
//! Readiness is the player's ready/failed signal. Results carry the session
//! token and stage that requested them; anything else is stale and dropped.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::oneshot;

use crate::backend::{Playback, PlaybackId};

/// Media errors
#[derive(Debug, Clone, Error, PartialEq)]
pub enum MediaError {
    /// The track could not be fetched
    #[error("track unreachable: {0}")]
    NetworkUnavailable(String),

    /// The bytes could not be decoded or the output refused them
    #[error("playback failed to start: {0}")]
    PlaybackInitFailed(String),

    /// A session is still active; stop it first
    #[error("a media session is already active")]
    SessionActive,

    /// Local file access failed
    #[error("media file error: {0}")]
    Io(String),
}

/// Where a track comes from
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MediaSource {
    /// `http(s)://` URL or local path
    pub uri: String,
}

impl MediaSource {
    /// Create a source from a URI or path
    pub fn new(uri: impl Into<String>) -> Self {
        Self { uri: uri.into() }
    }

    /// Whether the source must be fetched over the network
    #[must_use]
    pub fn is_remote(&self) -> bool {
        self.uri.starts_with("http://") || self.uri.starts_with("https://")
    }
}

impl std::fmt::Display for MediaSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.uri)
    }
}

/// Identifier of one media session
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MediaToken(pub u64);

impl std::fmt::Display for MediaToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "media#{}", self.0)
    }
}

/// Step of the fallback chain
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MediaStage {
    /// The requested URI
    Remote,
    /// The designated local fallback
    Fallback,
}

/// Completion callback; `true` once playback is running, `false` if it never starts
pub type MediaCompletion = Box<dyn FnOnce(bool) + Send>;

/// One track
pub struct MediaSession {
    token: MediaToken,
    source: MediaSource,
    fallback: Option<MediaSource>,
    stage: MediaStage,
    playback: Option<PlaybackId>,
    completion: Option<MediaCompletion>,
}

impl MediaSession {
    /// Session token
    #[must_use]
    pub fn token(&self) -> MediaToken {
        self.token
    }

    /// Requested source
    #[must_use]
    pub fn source(&self) -> &MediaSource {
        &self.source
    }

    /// Source of the current stage
    #[must_use]
    pub fn active_source(&self) -> &MediaSource {
        match (self.stage, &self.fallback) {
            (MediaStage::Fallback, Some(fallback)) => fallback,
            _ => &self.source,
        }
    }

    /// Current stage
    #[must_use]
    pub fn stage(&self) -> MediaStage {
        self.stage
    }

    /// Running playback, once started
    #[must_use]
    pub fn playback(&self) -> Option<PlaybackId> {
        self.playback
    }

    /// Whether playback is running
    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.playback.is_some()
    }

    fn fire(&mut self, success: bool) {
        if let Some(completion) = self.completion.take() {
            completion(success);
        }
    }
}

impl std::fmt::Debug for MediaSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaSession")
            .field("token", &self.token)
            .field("source", &self.source)
            .field("stage", &self.stage)
            .field("playback", &self.playback)
            .finish_non_exhaustive()
    }
}

/// What to do with a start result
#[derive(Debug)]
pub enum MediaStep {
    /// Result for a session or stage that no longer exists; stop the playback if any
    Stale(Option<PlaybackId>),
    /// Playback is running; watch `finished` for the end
    Started {
        /// Session token
        token: MediaToken,
        /// End-of-playback signal
        finished: oneshot::Receiver<bool>,
    },
    /// Remote failed; start the fallback
    RetryWithFallback(MediaSource),
    /// Every stage failed; the session is gone
    Failed(MediaError),
}

/// Owner of the single active media session
#[derive(Debug, Default)]
pub struct MediaManager {
    current: Option<MediaSession>,
    next_token: u64,
}

impl MediaManager {
    /// Create an empty manager
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a session
    ///
    /// Fails with [`MediaError::SessionActive`] while another session exists;
    /// callers stop it explicitly first.
    pub fn begin(
        &mut self,
        source: MediaSource,
        fallback: Option<MediaSource>,
        completion: Option<MediaCompletion>,
    ) -> Result<MediaToken, MediaError> {
        if self.current.is_some() {
            return Err(MediaError::SessionActive);
        }

        self.next_token += 1;
        let token = MediaToken(self.next_token);
        self.current = Some(MediaSession {
            token,
            source,
            fallback,
            stage: MediaStage::Remote,
            playback: None,
            completion,
        });
        Ok(token)
    }

    /// Active session, if any
    #[must_use]
    pub fn current(&self) -> Option<&MediaSession> {
        self.current.as_ref()
    }

    /// Whether `token` names the active session
    #[must_use]
    pub fn is_current(&self, token: MediaToken) -> bool {
        self.current.as_ref().is_some_and(|s| s.token == token)
    }

    /// Apply the result of starting `stage` of session `token`
    pub fn on_start_result(
        &mut self,
        token: MediaToken,
        stage: MediaStage,
        result: Result<Playback, MediaError>,
    ) -> MediaStep {
        let Some(session) = self
            .current
            .as_mut()
            .filter(|s| s.token == token && s.stage == stage && s.playback.is_none())
        else {
            return MediaStep::Stale(result.ok().map(|p| p.id));
        };

        match result {
            Ok(playback) => {
                session.playback = Some(playback.id);
                session.fire(true);
                MediaStep::Started {
                    token,
                    finished: playback.finished,
                }
            }
            Err(error) => match (stage, session.fallback.clone()) {
                (MediaStage::Remote, Some(fallback)) => {
                    tracing::warn!(
                        token = %token,
                        source = %session.source,
                        error = %error,
                        "Track failed, trying fallback"
                    );
                    session.stage = MediaStage::Fallback;
                    MediaStep::RetryWithFallback(fallback)
                }
                _ => {
                    if let Some(mut session) = self.current.take() {
                        session.fire(false);
                    }
                    MediaStep::Failed(error)
                }
            },
        }
    }

    /// Playback of `token` ended on its own
    ///
    /// Returns the finished session, or `None` when the token is stale.
    pub fn on_finished(&mut self, token: MediaToken) -> Option<MediaSession> {
        if self.current.as_ref().is_some_and(|s| s.token == token && s.is_playing()) {
            self.current.take()
        } else {
            None
        }
    }

    /// Stop and clear the active session
    ///
    /// A session stopped before it started reports `false` to its completion.
    /// The caller stops the returned session's playback.
    pub fn stop(&mut self) -> Option<MediaSession> {
        let mut session = self.current.take()?;
        session.fire(false);
        Some(session)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::*;

    fn recorder() -> (Arc<Mutex<Vec<bool>>>, MediaCompletion) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = log.clone();
        (log, Box::new(move |ok| sink.lock().push(ok)))
    }

    fn failed() -> Result<Playback, MediaError> {
        Err(MediaError::NetworkUnavailable("refused".into()))
    }

    fn started(id: u64) -> Result<Playback, MediaError> {
        Ok(Playback::new(PlaybackId(id)).0)
    }

    #[test]
    fn test_fallback_success_completes_once_with_true() {
        let (log, completion) = recorder();
        let mut media = MediaManager::new();
        let token = media
            .begin(
                MediaSource::new("https://bad.invalid/x.mp3"),
                Some(MediaSource::new("/music/fallback.mp3")),
                Some(completion),
            )
            .unwrap();

        let source = match media.on_start_result(token, MediaStage::Remote, failed()) {
            MediaStep::RetryWithFallback(source) => source,
            other => panic!("expected fallback, got {other:?}"),
        };
        assert_eq!(source.uri, "/music/fallback.mp3");
        assert_eq!(media.current().map(MediaSession::stage), Some(MediaStage::Fallback));

        let step = media.on_start_result(token, MediaStage::Fallback, started(1));
        assert!(matches!(step, MediaStep::Started { .. }));
        assert_eq!(*log.lock(), vec![true]);

        media.stop();
        assert_eq!(*log.lock(), vec![true]);
    }

    #[test]
    fn test_no_fallback_completes_once_with_false() {
        let (log, completion) = recorder();
        let mut media = MediaManager::new();
        let token = media
            .begin(MediaSource::new("https://bad.invalid/x.mp3"), None, Some(completion))
            .unwrap();

        let step = media.on_start_result(token, MediaStage::Remote, failed());
        assert!(matches!(step, MediaStep::Failed(MediaError::NetworkUnavailable(_))));
        assert!(media.current().is_none());
        assert_eq!(*log.lock(), vec![false]);
    }

    #[test]
    fn test_both_stages_failing_reports_false() {
        let (log, completion) = recorder();
        let mut media = MediaManager::new();
        let token = media
            .begin(
                MediaSource::new("https://bad.invalid/x.mp3"),
                Some(MediaSource::new("/missing.mp3")),
                Some(completion),
            )
            .unwrap();

        media.on_start_result(token, MediaStage::Remote, failed());
        let step = media.on_start_result(
            token,
            MediaStage::Fallback,
            Err(MediaError::Io("not found".into())),
        );
        assert!(matches!(step, MediaStep::Failed(MediaError::Io(_))));
        assert_eq!(*log.lock(), vec![false]);
    }

    #[test]
    fn test_begin_while_active_is_rejected() {
        let mut media = MediaManager::new();
        media.begin(MediaSource::new("a.mp3"), None, None).unwrap();
        assert_eq!(
            media.begin(MediaSource::new("b.mp3"), None, None),
            Err(MediaError::SessionActive)
        );
        media.stop();
        assert!(media.begin(MediaSource::new("b.mp3"), None, None).is_ok());
    }

    #[test]
    fn test_stop_before_ready_reports_false_and_late_start_is_stale() {
        let (log, completion) = recorder();
        let mut media = MediaManager::new();
        let token = media.begin(MediaSource::new("a.mp3"), None, Some(completion)).unwrap();

        media.stop().expect("session");
        assert_eq!(*log.lock(), vec![false]);

        let step = media.on_start_result(token, MediaStage::Remote, started(4));
        assert!(matches!(step, MediaStep::Stale(Some(PlaybackId(4)))));
        assert_eq!(*log.lock(), vec![false]);
    }

    #[test]
    fn test_result_for_wrong_stage_is_stale() {
        let mut media = MediaManager::new();
        let token = media
            .begin(MediaSource::new("https://x/a.mp3"), Some(MediaSource::new("b.mp3")), None)
            .unwrap();
        media.on_start_result(token, MediaStage::Remote, failed());

        let step = media.on_start_result(token, MediaStage::Remote, started(2));
        assert!(matches!(step, MediaStep::Stale(Some(PlaybackId(2)))));
        assert!(media.is_current(token));
    }

    #[test]
    fn test_finished_only_for_playing_session() {
        let mut media = MediaManager::new();
        let token = media.begin(MediaSource::new("a.mp3"), None, None).unwrap();
        assert!(media.on_finished(token).is_none());

        media.on_start_result(token, MediaStage::Remote, started(1));
        assert!(media.on_finished(MediaToken(99)).is_none());
        assert!(media.on_finished(token).is_some());
        assert!(media.current().is_none());
    }

    #[test]
    fn test_remote_detection() {
        assert!(MediaSource::new("https://a/b.mp3").is_remote());
        assert!(MediaSource::new("http://a/b.mp3").is_remote());
        assert!(!MediaSource::new("/usr/share/b.mp3").is_remote());
    }
}
