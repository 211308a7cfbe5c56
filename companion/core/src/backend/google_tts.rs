//! Google Cloud Text-to-Speech
//!
//! Speech synthesis over the Cloud TTS REST API.
//!
//! # API
//!
//! `POST {endpoint}?key={api_key}` with
//!
//! ```json
//! {
//!   "input": { "text": "..." },
//!   "voice": { "languageCode": "en-US", "name": "en-US-Wavenet-F" },
//!   "audioConfig": { "audioEncoding": "MP3", "pitch": 4.0, "speakingRate": 1.05 }
//! }
//! ```
//!
//! answers `{ "audioContent": "<base64 mp3>" }`.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use super::traits::SpeechSynthesizer;
use crate::prefs::Preferences;
use crate::speech::{SpeechError, VoiceType};

/// Longest error body kept in [`SpeechError::Service`]
const MAX_ERROR_BODY: usize = 512;

/// Cloud TTS client
#[derive(Clone)]
pub struct GoogleTtsSynthesizer {
    /// Synthesize endpoint URL
    endpoint: String,
    /// Source of the API key (read on every request)
    prefs: Preferences,
    /// HTTP client
    http_client: reqwest::Client,
}

impl GoogleTtsSynthesizer {
    /// Create a client for `endpoint`
    pub fn new(endpoint: impl Into<String>, prefs: Preferences) -> Self {
        Self {
            endpoint: endpoint.into(),
            prefs,
            http_client: reqwest::Client::builder()
                .timeout(Duration::from_secs(15))
                .build()
                .unwrap_or_default(),
        }
    }

    /// Endpoint in use
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Request body for `text` in `voice`
    #[must_use]
    pub fn request_body(text: &str, voice: VoiceType) -> serde_json::Value {
        let params = voice.params();
        serde_json::json!({
            "input": { "text": text },
            "voice": {
                "languageCode": params.language_code,
                "name": params.name,
            },
            "audioConfig": {
                "audioEncoding": "MP3",
                "pitch": params.pitch,
                "speakingRate": params.speaking_rate,
            }
        })
    }

    /// Decode the `audioContent` field of a response
    pub fn decode_response(data: &serde_json::Value) -> Result<Vec<u8>, SpeechError> {
        let content = data
            .get("audioContent")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| SpeechError::InvalidResponse("missing audioContent".to_string()))?;

        let audio = STANDARD
            .decode(content)
            .map_err(|e| SpeechError::InvalidResponse(e.to_string()))?;

        if audio.is_empty() {
            return Err(SpeechError::InvalidResponse("empty audio".to_string()));
        }
        Ok(audio)
    }
}

impl std::fmt::Debug for GoogleTtsSynthesizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleTtsSynthesizer")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl SpeechSynthesizer for GoogleTtsSynthesizer {
    fn name(&self) -> &'static str {
        "Google Cloud TTS"
    }

    async fn synthesize(&self, text: &str, voice: VoiceType) -> Result<Vec<u8>, SpeechError> {
        let api_key = self.prefs.api_key().ok_or(SpeechError::MissingApiKey)?;

        let response = self
            .http_client
            .post(&self.endpoint)
            .query(&[("key", api_key.as_str())])
            .json(&Self::request_body(text, voice))
            .send()
            .await
            .map_err(|e| SpeechError::NetworkUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let mut body = response.text().await.unwrap_or_default();
            if body.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !body.is_char_boundary(cut) {
                    cut -= 1;
                }
                body.truncate(cut);
            }
            return Err(SpeechError::Service { status, body });
        }

        let data: serde_json::Value = response
            .json()
            .await
            .map_err(|e| SpeechError::InvalidResponse(e.to_string()))?;

        let audio = Self::decode_response(&data)?;
        tracing::debug!(bytes = audio.len(), voice = %voice, "Speech synthesized");
        Ok(audio)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_carries_voice_params() {
        let body = GoogleTtsSynthesizer::request_body("hello", VoiceType::Sleepy);
        assert_eq!(body["input"]["text"], "hello");
        assert_eq!(body["voice"]["name"], "en-US-Wavenet-D");
        assert_eq!(body["audioConfig"]["audioEncoding"], "MP3");
        assert_eq!(body["audioConfig"]["speakingRate"], 0.8);
    }

    #[test]
    fn test_decode_response() {
        let data = serde_json::json!({ "audioContent": STANDARD.encode(b"ID3fake") });
        assert_eq!(GoogleTtsSynthesizer::decode_response(&data).unwrap(), b"ID3fake");
    }

    #[test]
    fn test_decode_rejects_missing_or_bad_content() {
        let missing = serde_json::json!({});
        assert!(matches!(
            GoogleTtsSynthesizer::decode_response(&missing),
            Err(SpeechError::InvalidResponse(_))
        ));

        let bad = serde_json::json!({ "audioContent": "%%%" });
        assert!(matches!(
            GoogleTtsSynthesizer::decode_response(&bad),
            Err(SpeechError::InvalidResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_api_key_fails_before_network() {
        let tts = GoogleTtsSynthesizer::new("http://127.0.0.1:9/never", Preferences::in_memory());
        assert_eq!(
            tts.synthesize("hi", VoiceType::Fluffy).await,
            Err(SpeechError::MissingApiKey)
        );
    }
}
