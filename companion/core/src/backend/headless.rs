//! Headless Backends
//!
//! Stand-ins for the sound card and the window server, used by the daemon, the
//! terminal playground and tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::sync::oneshot;
use tokio::time::Instant;

use super::traits::{AudioOutput, Playback, PlaybackId, WindowSource};
use crate::edge::{WindowId, WindowInfo};
use crate::geometry::Rect;
use crate::media::MediaError;

/// Assumed bitrate of encoded audio (128 kbps MP3)
const ASSUMED_BITS_PER_SEC: f64 = 128_000.0;

/// Playback length of `bytes` of 128 kbps audio
#[must_use]
pub fn estimate_duration(bytes: usize) -> Duration {
    Duration::from_secs_f64(bytes as f64 * 8.0 / ASSUMED_BITS_PER_SEC)
}

/// Silent audio output that still reports when playback would end
#[derive(Debug, Default)]
pub struct HeadlessAudio {
    next_id: AtomicU64,
    playing: Arc<Mutex<HashMap<PlaybackId, oneshot::Sender<bool>>>>,
    /// Overrides the bitrate estimate
    fixed_duration: Option<Duration>,
}

impl HeadlessAudio {
    /// Create an output that times playback from the byte count
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an output where every playback lasts `duration`
    #[must_use]
    pub fn with_fixed_duration(duration: Duration) -> Self {
        Self {
            fixed_duration: Some(duration),
            ..Self::default()
        }
    }

    /// Number of playbacks running
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.playing.lock().len()
    }

    /// Whether `id` is still playing
    #[must_use]
    pub fn is_playing(&self, id: PlaybackId) -> bool {
        self.playing.lock().contains_key(&id)
    }
}

impl AudioOutput for HeadlessAudio {
    fn play(&self, audio: Vec<u8>) -> Result<Playback, MediaError> {
        if audio.is_empty() {
            return Err(MediaError::PlaybackInitFailed("no audio data".to_string()));
        }

        let id = PlaybackId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let duration = self
            .fixed_duration
            .unwrap_or_else(|| estimate_duration(audio.len()));
        let (playback, done) = Playback::new(id);
        self.playing.lock().insert(id, done);

        let playing = Arc::clone(&self.playing);
        let ends_at = Instant::now() + duration;
        tokio::spawn(async move {
            tokio::time::sleep_until(ends_at).await;
            if let Some(done) = playing.lock().remove(&id) {
                let _ = done.send(true);
            }
        });

        tracing::debug!(playback = %id, ?duration, "Headless playback started");
        Ok(playback)
    }

    fn stop(&self, id: PlaybackId) {
        if let Some(done) = self.playing.lock().remove(&id) {
            let _ = done.send(false);
            tracing::debug!(playback = %id, "Headless playback stopped");
        }
    }
}

/// Editable window list
#[derive(Debug)]
pub struct SharedWindows {
    screen: RwLock<Rect>,
    windows: RwLock<Vec<WindowInfo>>,
}

impl SharedWindows {
    /// Empty desktop of the given size
    #[must_use]
    pub fn new(screen: Rect) -> Self {
        Self {
            screen: RwLock::new(screen),
            windows: RwLock::new(Vec::new()),
        }
    }

    /// Replace the screen bounds
    pub fn set_screen(&self, screen: Rect) {
        *self.screen.write() = screen;
    }

    /// Replace every window
    pub fn set_windows(&self, windows: Vec<WindowInfo>) {
        *self.windows.write() = windows;
    }

    /// Add or replace a window; new windows go to the front
    pub fn upsert(&self, window: WindowInfo) {
        let mut windows = self.windows.write();
        windows.retain(|w| w.id != window.id);
        windows.insert(0, window);
    }

    /// Remove a window; returns whether it existed
    pub fn remove(&self, id: WindowId) -> bool {
        let mut windows = self.windows.write();
        let before = windows.len();
        windows.retain(|w| w.id != id);
        windows.len() != before
    }

    /// Every window, hidden and system ones included
    #[must_use]
    pub fn all(&self) -> Vec<WindowInfo> {
        self.windows.read().clone()
    }
}

impl WindowSource for SharedWindows {
    fn screen_bounds(&self) -> Rect {
        *self.screen.read()
    }

    fn visible_windows(&self) -> Vec<WindowInfo> {
        self.windows
            .read()
            .iter()
            .filter(|w| w.on_screen)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_duration() {
        assert_eq!(estimate_duration(16_000), Duration::from_secs(1));
        assert_eq!(estimate_duration(0), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_playback_finishes_after_estimate() {
        let audio = HeadlessAudio::new();
        let playback = audio.play(vec![0; 32_000]).unwrap();
        assert!(audio.is_playing(playback.id));

        tokio::time::advance(Duration::from_millis(1999)).await;
        assert!(audio.is_playing(playback.id));

        assert_eq!(playback.finished.await, Ok(true));
        assert_eq!(audio.active_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_reports_false() {
        let audio = HeadlessAudio::with_fixed_duration(Duration::from_secs(60));
        let playback = audio.play(vec![1, 2, 3]).unwrap();
        audio.stop(playback.id);
        assert_eq!(playback.finished.await, Ok(false));
    }

    #[tokio::test]
    async fn test_empty_audio_is_rejected() {
        let audio = HeadlessAudio::new();
        assert!(matches!(
            audio.play(Vec::new()),
            Err(MediaError::PlaybackInitFailed(_))
        ));
    }

    #[test]
    fn test_shared_windows_upsert_and_remove() {
        let windows = SharedWindows::new(Rect::new(0.0, 0.0, 800.0, 600.0));
        windows.upsert(WindowInfo::new(1, Rect::new(0.0, 0.0, 10.0, 10.0)));
        windows.upsert(WindowInfo::new(2, Rect::new(5.0, 5.0, 10.0, 10.0)));
        windows.upsert(WindowInfo::new(1, Rect::new(50.0, 50.0, 10.0, 10.0)));

        let ids: Vec<_> = windows.visible_windows().iter().map(|w| w.id).collect();
        assert_eq!(ids, vec![WindowId(1), WindowId(2)]);

        assert!(windows.remove(WindowId(2)));
        assert!(!windows.remove(WindowId(2)));
        assert_eq!(windows.visible_windows().len(), 1);
    }
}
