//! Fetching Media Player
//!
//! Gets the bytes of a track (HTTP GET for `http(s)://` sources, a file read
//! otherwise) and hands them to an [`AudioOutput`]. `start` resolves once the
//! output has accepted the audio, which is the ready signal the media session
//! waits for.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::traits::{AudioOutput, MediaPlayer, Playback, PlaybackId};
use crate::media::{MediaError, MediaSource};

/// Media player over an HTTP client and an audio output
#[derive(Clone)]
pub struct FetchingMediaPlayer {
    /// HTTP client for remote tracks
    http_client: reqwest::Client,
    /// Where decoded audio goes
    audio: Arc<dyn AudioOutput>,
}

impl FetchingMediaPlayer {
    /// Create a player that plays on `audio`
    pub fn new(audio: Arc<dyn AudioOutput>) -> Self {
        Self {
            http_client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
            audio,
        }
    }

    async fn fetch_remote(&self, url: &str) -> Result<Vec<u8>, MediaError> {
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| MediaError::NetworkUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(MediaError::NetworkUnavailable(format!(
                "{url} returned {}",
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| MediaError::NetworkUnavailable(e.to_string()))?;
        Ok(bytes.to_vec())
    }

    async fn read_local(path: &str) -> Result<Vec<u8>, MediaError> {
        let path = path.strip_prefix("file://").unwrap_or(path);
        tokio::fs::read(path)
            .await
            .map_err(|e| MediaError::Io(format!("{path}: {e}")))
    }
}

impl std::fmt::Debug for FetchingMediaPlayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchingMediaPlayer").finish_non_exhaustive()
    }
}

#[async_trait]
impl MediaPlayer for FetchingMediaPlayer {
    async fn start(&self, source: &MediaSource) -> Result<Playback, MediaError> {
        let bytes = if source.is_remote() {
            self.fetch_remote(&source.uri).await?
        } else {
            Self::read_local(&source.uri).await?
        };

        tracing::debug!(source = %source, bytes = bytes.len(), "Track fetched");
        self.audio.play(bytes)
    }

    fn stop(&self, id: PlaybackId) {
        self.audio.stop(id);
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;
    use crate::backend::HeadlessAudio;

    #[tokio::test]
    async fn test_local_file_plays() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&[0xFF; 1024]).unwrap();

        let audio = Arc::new(HeadlessAudio::with_fixed_duration(Duration::from_secs(5)));
        let player = FetchingMediaPlayer::new(audio.clone());
        let source = MediaSource::new(file.path().to_string_lossy());

        let playback = player.start(&source).await.unwrap();
        assert!(audio.is_playing(playback.id));
        player.stop(playback.id);
        assert!(!audio.is_playing(playback.id));
    }

    #[tokio::test]
    async fn test_missing_local_file_is_io_error() {
        let player = FetchingMediaPlayer::new(Arc::new(HeadlessAudio::new()));
        let source = MediaSource::new("/definitely/not/here.mp3");
        assert!(matches!(player.start(&source).await, Err(MediaError::Io(_))));
    }

    #[tokio::test]
    async fn test_empty_file_fails_to_init() {
        let file = NamedTempFile::new().unwrap();
        let player = FetchingMediaPlayer::new(Arc::new(HeadlessAudio::new()));
        let source = MediaSource::new(format!("file://{}", file.path().display()));
        assert!(matches!(
            player.start(&source).await,
            Err(MediaError::PlaybackInitFailed(_))
        ));
    }
}
