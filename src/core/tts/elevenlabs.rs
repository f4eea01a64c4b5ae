//! ElevenLabs text-to-speech
//!
//! # API Reference
//!
//! - Synthesis: `POST {base}/v1/text-to-speech/{voice_id}?output_format=mp3_44100_128`
//! - Voices: `GET {base}/v2/voices`
//! - Auth: `xi-api-key` header

use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use serde::Deserialize;
use serde_json::{Value, json};

use super::{MAX_TTS_CHARS, SpeechSynthesizer, TTSError, TTSResult, Voice};

pub const OUTPUT_FORMAT: &str = "mp3_44100_128";

// ElevenLabs API response structures
#[derive(Debug, Deserialize)]
struct ElevenLabsVoicesResponse {
    voices: Vec<ElevenLabsVoice>,
}

#[derive(Debug, Deserialize)]
struct ElevenLabsVoice {
    voice_id: String,
    name: String,
    preview_url: Option<String>,
    description: Option<String>,
    labels: Option<HashMap<String, String>>,
    verified_languages: Option<Vec<ElevenLabsLanguage>>,
}

#[derive(Debug, Deserialize)]
struct ElevenLabsLanguage {
    language: String,
    accent: Option<String>,
}

#[derive(Clone)]
pub struct ElevenLabsTTS {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
}

impl std::fmt::Debug for ElevenLabsTTS {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElevenLabsTTS")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("configured", &self.api_key.is_some())
            .finish()
    }
}

impl ElevenLabsTTS {
    pub fn new(
        client: reqwest::Client,
        api_key: Option<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_key: api_key.filter(|k| !k.is_empty()),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn api_key(&self) -> TTSResult<&str> {
        self.api_key.as_deref().ok_or(TTSError::NotConfigured)
    }

    fn request_body(&self, text: &str, language: &str) -> Value {
        let mut body = json!({
            "text": text,
            "model_id": self.model,
        });
        // Only the v2.5 turbo/flash models accept an explicit language
        if self.model.contains("v2_5") {
            let primary = language.split('-').next().unwrap_or(language);
            body["language_code"] = json!(primary.to_lowercase());
        }
        body
    }
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsTTS {
    async fn synthesize(&self, text: &str, voice_id: &str, language: &str) -> TTSResult<Bytes> {
        let api_key = self.api_key()?;
        let text = text.trim();
        if text.is_empty() {
            return Err(TTSError::InvalidRequest("Script is empty".to_string()));
        }
        if text.chars().count() > MAX_TTS_CHARS {
            return Err(TTSError::InvalidRequest(format!(
                "Script exceeds {MAX_TTS_CHARS} characters"
            )));
        }
        if voice_id.is_empty() || !voice_id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(TTSError::InvalidRequest(format!("Invalid voice id '{voice_id}'")));
        }

        let url = format!("{}/v1/text-to-speech/{voice_id}", self.base_url);
        let response = self
            .client
            .post(&url)
            .query(&[("output_format", OUTPUT_FORMAT)])
            .header("xi-api-key", api_key)
            .header("Accept", "audio/mpeg")
            .json(&self.request_body(text, language))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = error_message(response.text().await.unwrap_or_default());
            tracing::warn!(status = status.as_u16(), voice_id, "ElevenLabs synthesis failed");
            return Err(TTSError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let audio = response.bytes().await?;
        if audio.is_empty() {
            return Err(TTSError::EmptyAudio);
        }

        tracing::debug!(voice_id, bytes = audio.len(), "Synthesized audio");
        Ok(audio)
    }

    async fn list_voices(&self) -> TTSResult<Vec<Voice>> {
        let api_key = self.api_key()?;

        let response = self
            .client
            .get(format!("{}/v2/voices", self.base_url))
            .header("xi-api-key", api_key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = error_message(response.text().await.unwrap_or_default());
            return Err(TTSError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: ElevenLabsVoicesResponse = response.json().await?;
        Ok(body.voices.into_iter().map(normalize_voice).collect())
    }
}

/// ElevenLabs errors look like `{"detail": {"status": "...", "message": "..."}}`
fn error_message(body: String) -> String {
    serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| {
            v["detail"]["message"]
                .as_str()
                .or_else(|| v["detail"].as_str())
                .map(str::to_string)
        })
        .unwrap_or(body)
}

fn normalize_voice(voice: ElevenLabsVoice) -> Voice {
    // Language and accent come from the first verified language
    let (language, accent) = voice
        .verified_languages
        .as_ref()
        .and_then(|langs| langs.first())
        .map(|first| {
            (
                first.language.clone(),
                first.accent.clone().unwrap_or_else(|| "Unknown".to_string()),
            )
        })
        .unwrap_or_else(|| ("Unknown".to_string(), "Unknown".to_string()));

    let gender = voice
        .labels
        .as_ref()
        .and_then(|labels| {
            ["gender", "sex", "voice_type"]
                .iter()
                .filter_map(|key| labels.get(*key))
                .find_map(|value| gender_from_label(value))
        })
        .or_else(|| voice.description.as_deref().and_then(gender_from_description))
        .unwrap_or("Unknown")
        .to_string();

    Voice {
        id: voice.voice_id,
        sample: voice.preview_url.unwrap_or_default(),
        name: voice.name,
        accent,
        gender,
        language,
    }
}

fn gender_from_label(value: &str) -> Option<&'static str> {
    let value = value.to_lowercase();
    // "female" contains "male", so test it first
    if value.contains("female") {
        Some("Female")
    } else if value.contains("male") {
        Some("Male")
    } else {
        None
    }
}

fn gender_from_description(description: &str) -> Option<&'static str> {
    let desc = description.to_lowercase();
    let has_word = |word: &str| {
        desc.split(|c: char| !c.is_alphanumeric())
            .any(|token| token == word)
    };

    if has_word("female") || has_word("feminine") || has_word("woman") || has_word("lady") {
        Some("Female")
    } else if has_word("male")
        || has_word("masculine")
        || has_word("man")
        || has_word("gentleman")
    {
        Some("Male")
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn tts(server: &MockServer, key: Option<&str>) -> ElevenLabsTTS {
        ElevenLabsTTS::new(
            reqwest::Client::new(),
            key.map(str::to_string),
            server.uri(),
            "eleven_multilingual_v2",
        )
    }

    #[test]
    fn test_gender_detection() {
        assert_eq!(gender_from_label("Female"), Some("Female"));
        assert_eq!(gender_from_label("male"), Some("Male"));
        assert_eq!(gender_from_label("neutral"), None);
        assert_eq!(
            gender_from_description("A calm, deep male narrator"),
            Some("Male")
        );
        assert_eq!(
            gender_from_description("Young woman with a bright tone"),
            Some("Female")
        );
        assert_eq!(gender_from_description("Manchester accent"), None);
    }

    #[test]
    fn test_normalize_voice() {
        let raw: ElevenLabsVoice = serde_json::from_value(json!({
            "voice_id": "abc",
            "name": "Rachel",
            "preview_url": "https://cdn.test/rachel.mp3",
            "labels": {"gender": "female", "accent": "american"},
            "verified_languages": [{"language": "en", "accent": "american"}]
        }))
        .unwrap();
        let voice = normalize_voice(raw);
        assert_eq!(voice.id, "abc");
        assert_eq!(voice.gender, "Female");
        assert_eq!(voice.language, "en");
        assert_eq!(voice.accent, "american");

        let bare: ElevenLabsVoice =
            serde_json::from_value(json!({"voice_id": "x", "name": "X"})).unwrap();
        let voice = normalize_voice(bare);
        assert_eq!(voice.gender, "Unknown");
        assert_eq!(voice.language, "Unknown");
        assert_eq!(voice.sample, "");
    }

    #[test]
    fn test_language_code_only_for_v2_5_models() {
        let client = reqwest::Client::new();
        let multilingual =
            ElevenLabsTTS::new(client.clone(), None, "http://x", "eleven_multilingual_v2");
        assert!(multilingual.request_body("hi", "fr-FR").get("language_code").is_none());

        let flash = ElevenLabsTTS::new(client, None, "http://x", "eleven_flash_v2_5");
        assert_eq!(flash.request_body("hi", "fr-FR")["language_code"], "fr");
    }

    #[tokio::test]
    async fn test_synthesize() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/text-to-speech/voice123"))
            .and(query_param("output_format", OUTPUT_FORMAT))
            .and(header("xi-api-key", "el-key"))
            .and(body_partial_json(json!({"text": "Hello", "model_id": "eleven_multilingual_v2"})))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "audio/mpeg")
                    .set_body_bytes(b"ID3audio".to_vec()),
            )
            .expect(1)
            .mount(&server)
            .await;

        let audio = tts(&server, Some("el-key"))
            .synthesize(" Hello ", "voice123", "en")
            .await
            .unwrap();
        assert_eq!(audio.as_ref(), b"ID3audio");
    }

    #[tokio::test]
    async fn test_synthesize_validation() {
        let server = MockServer::start().await;
        let tts = tts(&server, Some("el-key"));
        assert!(matches!(
            tts.synthesize("  ", "voice123", "en").await,
            Err(TTSError::InvalidRequest(_))
        ));
        assert!(matches!(
            tts.synthesize("Hi", "../admin", "en").await,
            Err(TTSError::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_synthesize_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "detail": {"status": "invalid_api_key", "message": "Invalid API key"}
            })))
            .mount(&server)
            .await;

        match tts(&server, Some("bad")).synthesize("Hi", "voice123", "en").await {
            Err(TTSError::Api { status, message }) => {
                assert_eq!(status, 401);
                assert_eq!(message, "Invalid API key");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_not_configured() {
        let server = MockServer::start().await;
        let tts = tts(&server, None);
        assert!(!tts.is_configured());
        assert!(matches!(
            tts.list_voices().await,
            Err(TTSError::NotConfigured)
        ));
    }

    #[tokio::test]
    async fn test_list_voices() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/voices"))
            .and(header("xi-api-key", "el-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "voices": [
                    {"voice_id": "a", "name": "Adam", "description": "deep male voice"},
                    {"voice_id": "b", "name": "Bella", "labels": {"gender": "female"}}
                ]
            })))
            .mount(&server)
            .await;

        let voices = tts(&server, Some("el-key")).list_voices().await.unwrap();
        assert_eq!(voices.len(), 2);
        assert_eq!(voices[0].gender, "Male");
        assert_eq!(voices[1].gender, "Female");
    }
}
