//! TOML Configuration File Support
//!
//! Configuration for the companion, read from
//! `~/.config/fluffel/companion.toml`.
//!
//! # Configuration Priority
//!
//! Configuration values are loaded with the following priority (highest first):
//! 1. CLI arguments (via [`ConfigOverrides`])
//! 2. Environment variables
//! 3. TOML configuration file
//! 4. Default values
//!
//! # XDG Base Directory Compliance
//!
//! - `$XDG_CONFIG_HOME/fluffel/companion.toml` (typically `~/.config/fluffel/companion.toml`)
//!
//! # Example Configuration
//!
//! ```toml
//! [movement]
//! step_px = 5.0
//! min_tick_spacing_ms = 10
//! key_repeat_hz = 20
//! character_width = 48.0
//! character_height = 48.0
//!
//! [edges]
//! tolerance_px = 6.0
//! floor_threshold_px = 2.0
//!
//! [timing]
//! fall_duration_ms = 1000
//! excited_duration_ms = 2000
//! dance_duration_ms = 6000
//! sleep_after_secs = 90
//! action_cooldown_ms = 500
//! conversation_gap_ms = 500
//!
//! [speech]
//! default_duration_secs = 5.0
//! font_size = 14.0
//! endpoint = "https://texttospeech.googleapis.com/v1/text:synthesize"
//!
//! [media]
//! tracks = ["https://example.com/song.mp3"]
//! fallback = "/usr/share/fluffel/fallback.mp3"
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::behavior::BehaviorTuning;

/// Default Cloud TTS endpoint
pub const DEFAULT_TTS_ENDPOINT: &str = "https://texttospeech.googleapis.com/v1/text:synthesize";

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

// =============================================================================
// Configuration Source Tracking
// =============================================================================

/// Tracks where a configuration value came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Value from command-line argument
    Cli,
    /// Value from environment variable
    Env,
    /// Value from TOML configuration file
    File,
    /// Default value
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI"),
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// Movement section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementToml {
    /// Pixels per movement tick
    pub step_px: Option<f64>,

    /// Ticks closer than this are dropped (milliseconds)
    pub min_tick_spacing_ms: Option<u64>,

    /// Held-key repeat rate
    pub key_repeat_hz: Option<u32>,

    /// Character bounding box width
    pub character_width: Option<f64>,

    /// Character bounding box height
    pub character_height: Option<f64>,
}

/// Edge detection section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgesToml {
    /// Edge tolerance in pixels
    pub tolerance_px: Option<f64>,

    /// Height above the floor that turns leaving an edge into a fall
    pub floor_threshold_px: Option<f64>,
}

/// Timing section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingToml {
    /// Fall duration in milliseconds
    pub fall_duration_ms: Option<u64>,

    /// Excited duration in milliseconds
    pub excited_duration_ms: Option<u64>,

    /// Dance duration in milliseconds
    pub dance_duration_ms: Option<u64>,

    /// Idle seconds before dozing off
    pub sleep_after_secs: Option<u64>,

    /// Menu action cooldown in milliseconds
    pub action_cooldown_ms: Option<u64>,

    /// Pause between conversation lines in milliseconds
    pub conversation_gap_ms: Option<u64>,
}

/// Speech section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechToml {
    /// Bubble duration for menu speech, in seconds
    pub default_duration_secs: Option<f64>,

    /// Bubble font size
    pub font_size: Option<f64>,

    /// Cloud TTS endpoint
    pub endpoint: Option<String>,
}

/// Media section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaToml {
    /// Tracks to pick from
    pub tracks: Option<Vec<String>>,

    /// Local fallback track
    pub fallback: Option<String>,
}

/// Top-level TOML configuration structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CompanionToml {
    /// Movement section
    pub movement: MovementToml,

    /// Edge detection section
    pub edges: EdgesToml,

    /// Timing section
    pub timing: TimingToml,

    /// Speech section
    pub speech: SpeechToml,

    /// Media section
    pub media: MediaToml,
}

// =============================================================================
// Main Configuration Struct
// =============================================================================

/// Centralized configuration for the companion
///
/// Use [`load_config`] to load configuration with proper priority handling.
#[derive(Clone, Debug)]
pub struct CompanionConfig {
    /// Pixels per movement tick
    pub step_px: f64,

    /// Ticks closer than this are dropped
    pub min_tick_spacing: Duration,

    /// Held-key repeat rate in Hz
    pub key_repeat_hz: u32,

    /// Character bounding box width
    pub character_width: f64,

    /// Character bounding box height
    pub character_height: f64,

    /// Edge tolerance in pixels
    pub edge_tolerance: f64,

    /// Height above the floor that turns leaving an edge into a fall
    pub floor_threshold: f64,

    /// Fall duration
    pub fall_duration: Duration,

    /// Excited duration
    pub excited_duration: Duration,

    /// Dance duration
    pub dance_duration: Duration,

    /// Idle time before dozing off
    pub sleep_after: Duration,

    /// Menu action cooldown
    pub action_cooldown: Duration,

    /// Pause between conversation lines
    pub conversation_gap: Duration,

    /// Bubble duration for menu speech
    pub speech_duration: Duration,

    /// Bubble font size
    pub font_size: f64,

    /// Cloud TTS endpoint
    pub tts_endpoint: String,

    /// Tracks to pick from
    pub tracks: Vec<String>,

    /// Local fallback track
    pub fallback_track: Option<String>,

    /// Path to the config file that was loaded (if any)
    pub config_file_path: Option<PathBuf>,

    /// Source of configuration values
    source: ConfigSource,
}

impl Default for CompanionConfig {
    fn default() -> Self {
        let tuning = BehaviorTuning::default();
        Self {
            step_px: tuning.step_px,
            min_tick_spacing: tuning.min_tick_spacing,
            key_repeat_hz: 20,
            character_width: tuning.character_width,
            character_height: tuning.character_height,
            edge_tolerance: tuning.edge_tolerance,
            floor_threshold: tuning.floor_threshold,
            fall_duration: tuning.fall_duration,
            excited_duration: tuning.excited_duration,
            dance_duration: tuning.dance_duration,
            sleep_after: tuning.sleep_after,
            action_cooldown: Duration::from_millis(500),
            conversation_gap: Duration::from_millis(500),
            speech_duration: Duration::from_secs(5),
            font_size: 14.0,
            tts_endpoint: DEFAULT_TTS_ENDPOINT.to_string(),
            tracks: Vec::new(),
            fallback_track: None,
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl CompanionConfig {
    /// Create a new configuration with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the primary source of this configuration
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }

    /// Set the configuration source
    pub fn set_source(&mut self, source: ConfigSource) {
        self.source = source;
    }

    /// Interval between held-key repeat ticks
    #[must_use]
    pub fn key_repeat_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.key_repeat_hz.max(1)))
    }

    /// State machine parameters
    #[must_use]
    pub fn behavior_tuning(&self) -> BehaviorTuning {
        BehaviorTuning {
            step_px: self.step_px,
            min_tick_spacing: self.min_tick_spacing,
            character_width: self.character_width,
            character_height: self.character_height,
            edge_tolerance: self.edge_tolerance,
            floor_threshold: self.floor_threshold,
            fall_duration: self.fall_duration,
            excited_duration: self.excited_duration,
            dance_duration: self.dance_duration,
            sleep_after: self.sleep_after,
        }
    }

    /// Check value ranges
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] naming the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.step_px > 0.0) {
            return Err(ConfigError::ValidationError(format!(
                "movement.step_px must be positive, got {}",
                self.step_px
            )));
        }
        if !(1..=120).contains(&self.key_repeat_hz) {
            return Err(ConfigError::ValidationError(format!(
                "movement.key_repeat_hz must be within 1-120, got {}",
                self.key_repeat_hz
            )));
        }
        if !(self.character_width > 0.0 && self.character_height > 0.0) {
            return Err(ConfigError::ValidationError(
                "character size must be positive".to_string(),
            ));
        }
        if !(self.edge_tolerance >= 0.0) || !(self.floor_threshold >= 0.0) {
            return Err(ConfigError::ValidationError(
                "edge tolerance and floor threshold must not be negative".to_string(),
            ));
        }

        let durations = [
            ("timing.fall_duration_ms", self.fall_duration),
            ("timing.excited_duration_ms", self.excited_duration),
            ("timing.dance_duration_ms", self.dance_duration),
            ("timing.sleep_after_secs", self.sleep_after),
            ("timing.action_cooldown_ms", self.action_cooldown),
            ("speech.default_duration_secs", self.speech_duration),
        ];
        if let Some((name, _)) = durations.iter().find(|(_, d)| d.is_zero()) {
            return Err(ConfigError::ValidationError(format!("{name} must be positive")));
        }

        if !(self.font_size > 0.0) {
            return Err(ConfigError::ValidationError(format!(
                "speech.font_size must be positive, got {}",
                self.font_size
            )));
        }
        Ok(())
    }
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Get the default configuration file path
///
/// Returns `$XDG_CONFIG_HOME/fluffel/companion.toml` or
/// `~/.config/fluffel/companion.toml` if `XDG_CONFIG_HOME` is not set.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("fluffel").join("companion.toml"))
}

/// Load configuration from all sources with proper priority
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be parsed, or if the
/// merged values are out of range. A missing config file is not an error.
pub fn load_config() -> Result<CompanionConfig, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load configuration from a specific path
///
/// # Errors
///
/// Returns an error if the specified config file cannot be read or parsed, or
/// if the merged values are out of range.
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<CompanionConfig, ConfigError> {
    load_config_with_env(path, |key| std::env::var(key).ok())
}

/// Load configuration with a custom environment lookup
///
/// # Errors
///
/// Same as [`load_config_from_path`].
pub fn load_config_with_env(
    path: Option<PathBuf>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<CompanionConfig, ConfigError> {
    // Start with defaults
    let mut config = CompanionConfig::default();

    // Try to load from file
    if let Some(ref config_path) = path {
        if config_path.exists() {
            let toml_content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.clone(),
                    source: e,
                })?;

            let toml_config: CompanionToml = toml::from_str(&toml_content)?;
            apply_toml_config(&mut config, &toml_config);
            config.config_file_path = Some(config_path.clone());
            config.source = ConfigSource::File;

            tracing::info!(
                path = %config_path.display(),
                "Loaded configuration from file"
            );
        } else {
            tracing::debug!(
                path = %config_path.display(),
                "Config file not found, using defaults"
            );
        }
    }

    // Apply environment variables (overrides file values)
    apply_env_config(&mut config, env);

    config.validate()?;
    Ok(config)
}

/// Apply TOML configuration values to the config struct
fn apply_toml_config(config: &mut CompanionConfig, toml: &CompanionToml) {
    // Movement
    if let Some(step) = toml.movement.step_px {
        config.step_px = step;
    }
    if let Some(ms) = toml.movement.min_tick_spacing_ms {
        config.min_tick_spacing = Duration::from_millis(ms);
    }
    if let Some(hz) = toml.movement.key_repeat_hz {
        config.key_repeat_hz = hz;
    }
    if let Some(w) = toml.movement.character_width {
        config.character_width = w;
    }
    if let Some(h) = toml.movement.character_height {
        config.character_height = h;
    }

    // Edges
    if let Some(tol) = toml.edges.tolerance_px {
        config.edge_tolerance = tol;
    }
    if let Some(threshold) = toml.edges.floor_threshold_px {
        config.floor_threshold = threshold;
    }

    // Timing
    if let Some(ms) = toml.timing.fall_duration_ms {
        config.fall_duration = Duration::from_millis(ms);
    }
    if let Some(ms) = toml.timing.excited_duration_ms {
        config.excited_duration = Duration::from_millis(ms);
    }
    if let Some(ms) = toml.timing.dance_duration_ms {
        config.dance_duration = Duration::from_millis(ms);
    }
    if let Some(secs) = toml.timing.sleep_after_secs {
        config.sleep_after = Duration::from_secs(secs);
    }
    if let Some(ms) = toml.timing.action_cooldown_ms {
        config.action_cooldown = Duration::from_millis(ms);
    }
    if let Some(ms) = toml.timing.conversation_gap_ms {
        config.conversation_gap = Duration::from_millis(ms);
    }

    // Speech
    if let Some(secs) = toml.speech.default_duration_secs {
        config.speech_duration = Duration::try_from_secs_f64(secs).unwrap_or(Duration::ZERO);
    }
    if let Some(size) = toml.speech.font_size {
        config.font_size = size;
    }
    if let Some(ref endpoint) = toml.speech.endpoint {
        config.tts_endpoint.clone_from(endpoint);
    }

    // Media
    if let Some(ref tracks) = toml.media.tracks {
        config.tracks.clone_from(tracks);
    }
    if toml.media.fallback.is_some() {
        config.fallback_track.clone_from(&toml.media.fallback);
    }
}

/// Apply environment variable overrides to the config
fn apply_env_config(config: &mut CompanionConfig, env: impl Fn(&str) -> Option<String>) {
    if let Some(step) = env("FLUFFEL_STEP_PX").and_then(|v| v.parse::<f64>().ok()) {
        config.step_px = step;
        config.source = ConfigSource::Env;
    }
    if let Some(tol) = env("FLUFFEL_EDGE_TOLERANCE").and_then(|v| v.parse::<f64>().ok()) {
        config.edge_tolerance = tol;
        config.source = ConfigSource::Env;
    }
    if let Some(ms) = env("FLUFFEL_FALL_MS").and_then(|v| v.parse::<u64>().ok()) {
        config.fall_duration = Duration::from_millis(ms);
        config.source = ConfigSource::Env;
    }
    if let Some(ms) = env("FLUFFEL_COOLDOWN_MS").and_then(|v| v.parse::<u64>().ok()) {
        config.action_cooldown = Duration::from_millis(ms);
        config.source = ConfigSource::Env;
    }
    if let Some(endpoint) = env("FLUFFEL_TTS_ENDPOINT") {
        config.tts_endpoint = endpoint;
        config.source = ConfigSource::Env;
    }
    if let Some(fallback) = env("FLUFFEL_FALLBACK_TRACK") {
        config.fallback_track = Some(fallback).filter(|f| !f.is_empty());
        config.source = ConfigSource::Env;
    }
    if let Some(tracks) = env("FLUFFEL_TRACKS") {
        config.tracks = tracks
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from)
            .collect();
        config.source = ConfigSource::Env;
    }
}

// =============================================================================
// CLI Override Support
// =============================================================================

/// Builder for applying CLI overrides to configuration
///
/// Use this after [`load_config`] to apply command-line argument overrides.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// TTS endpoint override
    pub tts_endpoint: Option<String>,

    /// Track list override
    pub tracks: Option<Vec<String>>,

    /// Fallback track override
    pub fallback_track: Option<String>,

    /// Sleep-after override (seconds)
    pub sleep_after_secs: Option<u64>,
}

impl ConfigOverrides {
    /// Create a new empty set of overrides
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set TTS endpoint override
    #[must_use]
    pub fn with_tts_endpoint(mut self, endpoint: String) -> Self {
        self.tts_endpoint = Some(endpoint);
        self
    }

    /// Set track list override
    #[must_use]
    pub fn with_tracks(mut self, tracks: Vec<String>) -> Self {
        self.tracks = Some(tracks);
        self
    }

    /// Set fallback track override
    #[must_use]
    pub fn with_fallback_track(mut self, path: String) -> Self {
        self.fallback_track = Some(path);
        self
    }

    /// Set sleep-after override
    #[must_use]
    pub fn with_sleep_after_secs(mut self, secs: u64) -> Self {
        self.sleep_after_secs = Some(secs);
        self
    }

    /// Apply overrides to a configuration
    pub fn apply(&self, config: &mut CompanionConfig) {
        if self.tts_endpoint.is_some()
            || self.tracks.is_some()
            || self.fallback_track.is_some()
            || self.sleep_after_secs.is_some()
        {
            config.source = ConfigSource::Cli;
        }

        if let Some(ref endpoint) = self.tts_endpoint {
            config.tts_endpoint.clone_from(endpoint);
        }
        if let Some(ref tracks) = self.tracks {
            config.tracks.clone_from(tracks);
        }
        if let Some(ref fallback) = self.fallback_track {
            config.fallback_track = Some(fallback.clone());
        }
        if let Some(secs) = self.sleep_after_secs {
            config.sleep_after = Duration::from_secs(secs.max(1));
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use pretty_assertions::assert_eq;
    use tempfile::NamedTempFile;

    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    // =========================================================================
    // Default Configuration Tests
    // =========================================================================

    #[test]
    fn test_default_config() {
        let config = CompanionConfig::default();

        assert_eq!(config.step_px, 5.0);
        assert_eq!(config.min_tick_spacing, Duration::from_millis(10));
        assert_eq!(config.key_repeat_interval(), Duration::from_millis(50));
        assert_eq!(config.edge_tolerance, 6.0);
        assert_eq!(config.fall_duration, Duration::from_secs(1));
        assert_eq!(config.action_cooldown, Duration::from_millis(500));
        assert_eq!(config.tts_endpoint, DEFAULT_TTS_ENDPOINT);
        assert_eq!(config.source(), ConfigSource::Default);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_config_path() {
        if let Some(path) = default_config_path() {
            assert!(path.ends_with("fluffel/companion.toml"));
        }
    }

    // =========================================================================
    // File Loading Tests
    // =========================================================================

    #[test]
    fn test_missing_file_uses_defaults() {
        let config =
            load_config_with_env(Some(PathBuf::from("/nonexistent/companion.toml")), no_env)
                .unwrap();
        assert_eq!(config.source(), ConfigSource::Default);
        assert!(config.config_file_path.is_none());
    }

    #[test]
    fn test_partial_file_overrides_only_given_values() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[edges]
tolerance_px = 8.0

[timing]
fall_duration_ms = 750

[media]
tracks = ["https://example.com/a.mp3", "https://example.com/b.mp3"]
fallback = "/tmp/fallback.mp3"
"#
        )
        .unwrap();

        let config = load_config_with_env(Some(file.path().to_path_buf()), no_env).unwrap();
        assert_eq!(config.edge_tolerance, 8.0);
        assert_eq!(config.fall_duration, Duration::from_millis(750));
        assert_eq!(config.tracks.len(), 2);
        assert_eq!(config.fallback_track.as_deref(), Some("/tmp/fallback.mp3"));
        assert_eq!(config.step_px, 5.0);
        assert_eq!(config.source(), ConfigSource::File);
    }

    #[test]
    fn test_bad_toml_is_parse_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[movement\nstep_px = ").unwrap();
        let result = load_config_with_env(Some(file.path().to_path_buf()), no_env);
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    // =========================================================================
    // Environment Tests
    // =========================================================================

    #[test]
    fn test_env_overrides_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[edges]\ntolerance_px = 8.0").unwrap();

        let env = env_of(&[
            ("FLUFFEL_EDGE_TOLERANCE", "3.5"),
            ("FLUFFEL_TRACKS", "a.mp3, ,b.mp3"),
            ("FLUFFEL_COOLDOWN_MS", "250"),
        ]);
        let config = load_config_with_env(Some(file.path().to_path_buf()), env).unwrap();

        assert_eq!(config.edge_tolerance, 3.5);
        assert_eq!(config.tracks, vec!["a.mp3".to_string(), "b.mp3".to_string()]);
        assert_eq!(config.action_cooldown, Duration::from_millis(250));
        assert_eq!(config.source(), ConfigSource::Env);
    }

    #[test]
    fn test_unparseable_env_is_ignored() {
        let config = load_config_with_env(None, env_of(&[("FLUFFEL_STEP_PX", "fast")])).unwrap();
        assert_eq!(config.step_px, 5.0);
        assert_eq!(config.source(), ConfigSource::Default);
    }

    // =========================================================================
    // Validation Tests
    // =========================================================================

    #[test]
    fn test_validation_rejects_bad_values() {
        let env = env_of(&[("FLUFFEL_STEP_PX", "0")]);
        assert!(matches!(
            load_config_with_env(None, env),
            Err(ConfigError::ValidationError(_))
        ));

        let env = env_of(&[("FLUFFEL_EDGE_TOLERANCE", "-1")]);
        assert!(matches!(
            load_config_with_env(None, env),
            Err(ConfigError::ValidationError(_))
        ));

        let env = env_of(&[("FLUFFEL_FALL_MS", "0")]);
        assert!(matches!(
            load_config_with_env(None, env),
            Err(ConfigError::ValidationError(_))
        ));

        let config = CompanionConfig {
            key_repeat_hz: 500,
            ..CompanionConfig::default()
        };
        assert!(config.validate().is_err());
    }

    // =========================================================================
    // CLI Override Tests
    // =========================================================================

    #[test]
    fn test_overrides_apply_and_mark_cli() {
        let mut config = CompanionConfig::default();
        ConfigOverrides::new()
            .with_fallback_track("/music/fallback.mp3".to_string())
            .with_sleep_after_secs(5)
            .apply(&mut config);

        assert_eq!(config.fallback_track.as_deref(), Some("/music/fallback.mp3"));
        assert_eq!(config.sleep_after, Duration::from_secs(5));
        assert_eq!(config.source(), ConfigSource::Cli);
    }

    #[test]
    fn test_empty_overrides_keep_source() {
        let mut config = CompanionConfig::default();
        ConfigOverrides::new().apply(&mut config);
        assert_eq!(config.source(), ConfigSource::Default);
    }

    #[test]
    fn test_tuning_mirrors_config() {
        let config = CompanionConfig {
            step_px: 7.0,
            ..CompanionConfig::default()
        };
        let tuning = config.behavior_tuning();
        assert_eq!(tuning.step_px, 7.0);
        assert_eq!(tuning.sleep_after, Duration::from_secs(90));
    }
}
