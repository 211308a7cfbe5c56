//! Voices
//!
//! The persisted `FluffelVoiceType` preference is an integer 0–5. Each value
//! maps to a Google Cloud TTS voice plus pitch and rate adjustments.

use serde::{Deserialize, Serialize};

/// The character's speaking voice
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VoiceType {
    /// Soft and round (default)
    #[default]
    Fluffy,
    /// High and quick
    Squeaky,
    /// Low and slow
    Sleepy,
    /// Flat and mechanical
    Robot,
    /// Bright and fast
    Cheerful,
    /// Quiet and breathy
    Whisper,
}

/// Google Cloud TTS parameters for one voice
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VoiceParams {
    /// BCP-47 language code
    pub language_code: &'static str,
    /// Voice name in the Cloud TTS catalogue
    pub name: &'static str,
    /// Pitch in semitones (-20.0..=20.0)
    pub pitch: f64,
    /// Speaking rate (0.25..=4.0)
    pub speaking_rate: f64,
}

impl VoiceType {
    /// All voices in preference order
    pub const ALL: [VoiceType; 6] = [
        Self::Fluffy,
        Self::Squeaky,
        Self::Sleepy,
        Self::Robot,
        Self::Cheerful,
        Self::Whisper,
    ];

    /// Voice for a persisted index; `None` when out of range
    #[must_use]
    pub fn from_index(index: i64) -> Option<Self> {
        usize::try_from(index)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
    }

    /// Persisted index (0–5)
    #[must_use]
    pub fn index(self) -> i64 {
        match self {
            Self::Fluffy => 0,
            Self::Squeaky => 1,
            Self::Sleepy => 2,
            Self::Robot => 3,
            Self::Cheerful => 4,
            Self::Whisper => 5,
        }
    }

    /// Human-readable label
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Fluffy => "Fluffy",
            Self::Squeaky => "Squeaky",
            Self::Sleepy => "Sleepy",
            Self::Robot => "Robot",
            Self::Cheerful => "Cheerful",
            Self::Whisper => "Whisper",
        }
    }

    /// Cloud TTS parameters
    #[must_use]
    pub fn params(self) -> VoiceParams {
        match self {
            Self::Fluffy => VoiceParams {
                language_code: "en-US",
                name: "en-US-Wavenet-F",
                pitch: 4.0,
                speaking_rate: 1.05,
            },
            Self::Squeaky => VoiceParams {
                language_code: "en-US",
                name: "en-US-Wavenet-H",
                pitch: 10.0,
                speaking_rate: 1.25,
            },
            Self::Sleepy => VoiceParams {
                language_code: "en-US",
                name: "en-US-Wavenet-D",
                pitch: -4.0,
                speaking_rate: 0.8,
            },
            Self::Robot => VoiceParams {
                language_code: "en-US",
                name: "en-US-Standard-B",
                pitch: -8.0,
                speaking_rate: 0.95,
            },
            Self::Cheerful => VoiceParams {
                language_code: "en-GB",
                name: "en-GB-Wavenet-A",
                pitch: 6.0,
                speaking_rate: 1.15,
            },
            Self::Whisper => VoiceParams {
                language_code: "en-US",
                name: "en-US-Wavenet-C",
                pitch: 0.0,
                speaking_rate: 0.9,
            },
        }
    }
}

impl std::fmt::Display for VoiceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}
