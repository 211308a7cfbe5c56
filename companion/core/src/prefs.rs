//! Persisted Preferences
//!
//! An opaque key-value store plus a typed view over the two keys the
//! companion persists:
//!
//! - `FluffelVoiceType`: integer 0–5, anything else reads as voice 0
//! - `GoogleCloudAPIKey`: string
//!
//! Stores are synchronous and cheap; the JSON file store rewrites its whole
//! file on every `set`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::speech::VoiceType;

/// Key of the persisted voice index
pub const VOICE_TYPE_KEY: &str = "FluffelVoiceType";

/// Key of the persisted Cloud TTS API key
pub const API_KEY_KEY: &str = "GoogleCloudAPIKey";

/// Preference errors
#[derive(Debug, Error)]
pub enum PreferenceError {
    /// Reading or writing the preference file failed
    #[error("preference file {path}: {source}")]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The preference file could not be encoded or decoded
    #[error("preference file is not valid JSON: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A stored preference value
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrefValue {
    /// Integer value
    Int(i64),
    /// Text value
    Text(String),
}

impl PrefValue {
    /// Integer content, if this is an integer
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::Text(_) => None,
        }
    }

    /// Text content, if this is text
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v),
            Self::Int(_) => None,
        }
    }
}

/// Opaque key-value preference storage
pub trait PreferenceStore: Send + Sync {
    /// Read a value
    fn get(&self, key: &str) -> Option<PrefValue>;

    /// Write a value
    fn set(&self, key: &str, value: PrefValue) -> Result<(), PreferenceError>;
}

/// In-memory store (tests, headless runs)
#[derive(Debug, Default)]
pub struct MemoryPreferences {
    values: RwLock<HashMap<String, PrefValue>>,
}

impl MemoryPreferences {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryPreferences {
    fn get(&self, key: &str) -> Option<PrefValue> {
        self.values.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: PrefValue) -> Result<(), PreferenceError> {
        self.values.write().insert(key.to_string(), value);
        Ok(())
    }
}

/// Store backed by a JSON object on disk
#[derive(Debug)]
pub struct JsonFilePreferences {
    path: PathBuf,
    values: RwLock<HashMap<String, PrefValue>>,
}

impl JsonFilePreferences {
    /// Open the store at `path`; a missing file starts empty
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, PreferenceError> {
        let path = path.into();
        let values = match std::fs::read_to_string(&path) {
            Ok(content) if content.trim().is_empty() => HashMap::new(),
            Ok(content) => serde_json::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(source) => return Err(PreferenceError::Io { path, source }),
        };

        tracing::debug!(path = %path.display(), keys = values.len(), "Preferences loaded");
        Ok(Self {
            path,
            values: RwLock::new(values),
        })
    }

    /// File backing this store
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, values: &HashMap<String, PrefValue>) -> Result<(), PreferenceError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| PreferenceError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let content = serde_json::to_string_pretty(values)?;
        std::fs::write(&self.path, content).map_err(|source| PreferenceError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

impl PreferenceStore for JsonFilePreferences {
    fn get(&self, key: &str) -> Option<PrefValue> {
        self.values.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: PrefValue) -> Result<(), PreferenceError> {
        let mut values = self.values.write();
        values.insert(key.to_string(), value);
        self.persist(&values)
    }
}

/// Default preference file (`~/.config/fluffel/preferences.json`)
#[must_use]
pub fn default_preferences_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("fluffel").join("preferences.json"))
}

/// Typed view over a preference store
#[derive(Clone)]
pub struct Preferences {
    store: Arc<dyn PreferenceStore>,
}

impl Preferences {
    /// Wrap a store
    pub fn new(store: Arc<dyn PreferenceStore>) -> Self {
        Self { store }
    }

    /// Preferences held in memory only
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryPreferences::new()))
    }

    /// Selected voice; missing or out-of-range values read as voice 0
    #[must_use]
    pub fn voice(&self) -> VoiceType {
        self.store
            .get(VOICE_TYPE_KEY)
            .and_then(|v| v.as_int())
            .and_then(VoiceType::from_index)
            .unwrap_or_default()
    }

    /// Persist the selected voice
    pub fn set_voice(&self, voice: VoiceType) -> Result<(), PreferenceError> {
        self.store.set(VOICE_TYPE_KEY, PrefValue::Int(voice.index()))
    }

    /// Cloud TTS API key, if one is stored and not blank
    #[must_use]
    pub fn api_key(&self) -> Option<String> {
        self.store
            .get(API_KEY_KEY)
            .and_then(|v| v.as_text().map(str::trim).map(str::to_string))
            .filter(|k| !k.is_empty())
    }

    /// Persist the Cloud TTS API key
    pub fn set_api_key(&self, key: impl Into<String>) -> Result<(), PreferenceError> {
        self.store.set(API_KEY_KEY, PrefValue::Text(key.into()))
    }
}

impl std::fmt::Debug for Preferences {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Preferences")
            .field("voice", &self.voice())
            .field("api_key", &self.api_key().map(|_| "<set>"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_voice_defaults_to_zero() {
        let prefs = Preferences::in_memory();
        assert_eq!(prefs.voice(), VoiceType::Fluffy);
    }

    #[test]
    fn test_out_of_range_voice_reads_as_zero() {
        let store = Arc::new(MemoryPreferences::new());
        store.set(VOICE_TYPE_KEY, PrefValue::Int(9)).unwrap();
        assert_eq!(Preferences::new(store.clone()).voice(), VoiceType::Fluffy);

        store.set(VOICE_TYPE_KEY, PrefValue::Text("3".into())).unwrap();
        assert_eq!(Preferences::new(store).voice(), VoiceType::Fluffy);
    }

    #[test]
    fn test_voice_round_trips_through_store() {
        let prefs = Preferences::in_memory();
        prefs.set_voice(VoiceType::Whisper).unwrap();
        assert_eq!(prefs.voice(), VoiceType::Whisper);
    }

    #[test]
    fn test_blank_api_key_is_absent() {
        let prefs = Preferences::in_memory();
        assert_eq!(prefs.api_key(), None);
        prefs.set_api_key("   ").unwrap();
        assert_eq!(prefs.api_key(), None);
        prefs.set_api_key("abc123").unwrap();
        assert_eq!(prefs.api_key().as_deref(), Some("abc123"));
    }

    #[test]
    fn test_json_file_store_persists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("preferences.json");

        let store = JsonFilePreferences::open(&path).unwrap();
        store.set(VOICE_TYPE_KEY, PrefValue::Int(2)).unwrap();
        store.set(API_KEY_KEY, PrefValue::Text("key".into())).unwrap();

        let reopened = JsonFilePreferences::open(&path).unwrap();
        assert_eq!(reopened.get(VOICE_TYPE_KEY), Some(PrefValue::Int(2)));
        assert_eq!(reopened.get(API_KEY_KEY), Some(PrefValue::Text("key".into())));
    }

    #[test]
    fn test_json_file_store_rejects_garbage() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("preferences.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(
            JsonFilePreferences::open(&path),
            Err(PreferenceError::Serialize(_))
        ));
    }
}
