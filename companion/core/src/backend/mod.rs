//! Collaborator Backends
//!
//! The traits the coordination layer talks through, plus the implementations
//! shipped with the crate.
//!
//! # Available Backends
//!
//! - **`GoogleTtsSynthesizer`**: Google Cloud Text-to-Speech over REST
//! - **`FetchingMediaPlayer`**: downloads or reads a track, then plays it on an
//!   [`AudioOutput`]
//! - **`HeadlessAudio`**: an [`AudioOutput`] that keeps time but makes no sound
//! - **`SharedWindows`**: a [`WindowSource`] over an editable window list
//!
//! # Usage
//!
//! ```ignore
//! use companion_core::backend::{FetchingMediaPlayer, GoogleTtsSynthesizer, HeadlessAudio};
//!
//! let audio = Arc::new(HeadlessAudio::new());
//! let tts = GoogleTtsSynthesizer::new(config.tts_endpoint.clone(), prefs.clone());
//! let media = FetchingMediaPlayer::new(audio.clone());
//! ```

mod google_tts;
mod headless;
mod media_fetch;
mod traits;

pub use google_tts::GoogleTtsSynthesizer;
pub use headless::{estimate_duration, HeadlessAudio, SharedWindows};
pub use media_fetch::FetchingMediaPlayer;
pub use traits::{AudioOutput, MediaPlayer, Playback, PlaybackId, SpeechSynthesizer, WindowSource};
