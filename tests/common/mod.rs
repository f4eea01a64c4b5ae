//! Shared fixtures for router-level tests
#![allow(dead_code)]

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, Response, StatusCode},
};
use bytes::Bytes;
use serde_json::Value;
use tower::util::ServiceExt;

use pitchvoice::config::AuthApiSecret;
use pitchvoice::core::audio_store::AudioStore;
use pitchvoice::core::email::{EmailError, Mailer, OutgoingEmail};
use pitchvoice::core::llm::{
    Critique, CritiqueRequest, LlmResult, OpenAiScriptWriter, ScriptDraft, ScriptRequest,
    ScriptWriter,
};
use pitchvoice::core::scrape::PageScraper;
use pitchvoice::core::store::{DocumentStore, MemoryStore};
use pitchvoice::core::tts::{ElevenLabsTTS, SpeechSynthesizer, TTSResult, Voice};
use pitchvoice::{AppState, ServerConfig, Services, build_router};

pub const SECRET_A: &str = "secret-owner-a";
pub const SECRET_B: &str = "secret-owner-b";

/// Config with API secret auth for two owners and email tokens enabled
pub fn test_config() -> ServerConfig {
    let mut config = ServerConfig::default();
    config.public_base_url = "https://pitch.test".to_string();
    config.auth_required = true;
    config.auth_api_secrets = vec![
        AuthApiSecret {
            id: "owner-a".to_string(),
            secret: SECRET_A.to_string(),
        },
        AuthApiSecret {
            id: "owner-b".to_string(),
            secret: SECRET_B.to_string(),
        },
    ];
    config.email.token_secret = Some("email-token-secret".to_string());
    config
}

/// Script writer that echoes its inputs back
#[derive(Default)]
pub struct FakeScriptWriter {
    pub revised: Option<String>,
    pub requests: Mutex<Vec<ScriptRequest>>,
    /// Latency added to each generate call
    pub delay_ms: AtomicU64,
}

/// Sleep for a fake's configured latency
async fn lag(delay_ms: &AtomicU64) {
    let ms = delay_ms.load(Ordering::SeqCst);
    if ms > 0 {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
}

impl FakeScriptWriter {
    pub fn set_delay(&self, delay: Duration) {
        self.delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
    }
}

#[async_trait]
impl ScriptWriter for FakeScriptWriter {
    async fn generate_script(&self, request: &ScriptRequest) -> LlmResult<ScriptDraft> {
        self.requests.lock().unwrap().push(request.clone());
        lag(&self.delay_ms).await;
        Ok(ScriptDraft {
            script: format!(
                "Welcome to {} ({}) in {}.",
                request.project_name,
                request.condition.audience(),
                request.language
            ),
            model: "fake-model".to_string(),
        })
    }

    async fn critique_script(&self, request: &CritiqueRequest) -> LlmResult<Critique> {
        Ok(Critique {
            score: 7,
            strengths: vec![format!("{} words", request.script.split_whitespace().count())],
            suggestions: vec!["Shorter opening".to_string()],
            revised_script: self.revised.clone(),
        })
    }
}

/// Synthesizer that returns the request text as "audio" and counts calls
#[derive(Default)]
pub struct FakeTts {
    pub calls: AtomicUsize,
    pub delay_ms: AtomicU64,
}

impl FakeTts {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_delay(&self, delay: Duration) {
        self.delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
    }
}

#[async_trait]
impl SpeechSynthesizer for FakeTts {
    async fn synthesize(&self, text: &str, voice_id: &str, language: &str) -> TTSResult<Bytes> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        lag(&self.delay_ms).await;
        Ok(Bytes::from(format!("MP3:{voice_id}:{language}:{text}")))
    }

    async fn list_voices(&self) -> TTSResult<Vec<Voice>> {
        Ok(vec![Voice {
            id: "voice-1".to_string(),
            sample: String::new(),
            name: "Test Voice".to_string(),
            accent: "American".to_string(),
            gender: "Female".to_string(),
            language: "English".to_string(),
        }])
    }
}

#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<OutgoingEmail>>,
}

impl RecordingMailer {
    pub fn last(&self) -> Option<OutgoingEmail> {
        self.sent.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), EmailError> {
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}

/// Handles to the fakes behind a test app
pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub scripts: Arc<FakeScriptWriter>,
    pub tts: Arc<FakeTts>,
    pub mailer: Arc<RecordingMailer>,
}

impl TestApp {
    pub fn new(config: ServerConfig) -> Self {
        Self::with_scripts(config, FakeScriptWriter::default())
    }

    pub fn with_scripts(config: ServerConfig, scripts: FakeScriptWriter) -> Self {
        let scripts = Arc::new(scripts);
        let tts = Arc::new(FakeTts::default());
        let mailer = Arc::new(RecordingMailer::default());
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let services = Services {
            store,
            scripts: scripts.clone(),
            tts: tts.clone(),
            audio: AudioStore::in_memory(),
            mailer: mailer.clone(),
            scraper: PageScraper::allowing_loopback().unwrap(),
        };
        let state = AppState::with_services(config, services).unwrap();
        Self {
            router: build_router(state.clone()),
            state,
            scripts,
            tts,
            mailer,
        }
    }

    /// Real OpenAI and ElevenLabs clients pointed at `base_url` (a `wiremock` server).
    ///
    /// `scripts` and `tts` are left as unused fakes.
    pub fn with_providers(config: ServerConfig, base_url: &str, openai_key: Option<&str>) -> Self {
        let client = reqwest::Client::new();
        let mailer = Arc::new(RecordingMailer::default());
        let services = Services {
            store: Arc::new(MemoryStore::new()),
            scripts: Arc::new(OpenAiScriptWriter::new(
                client.clone(),
                openai_key.map(str::to_string),
                base_url,
                "gpt-test",
            )),
            tts: Arc::new(ElevenLabsTTS::new(
                client,
                Some("el-key".to_string()),
                base_url,
                "eleven_multilingual_v2",
            )),
            audio: AudioStore::in_memory(),
            mailer: mailer.clone(),
            scraper: PageScraper::new().unwrap(),
        };
        let state = AppState::with_services(config, services).unwrap();
        Self {
            router: build_router(state.clone()),
            state,
            scripts: Arc::default(),
            tts: Arc::default(),
            mailer,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Send an authenticated JSON request and decode the JSON reply
    pub async fn call(
        &self,
        method: &str,
        uri: &str,
        secret: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("authorization", format!("Bearer {secret}"));
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = self.send(request).await;
        let status = response.status();
        (status, json_body(response).await)
    }

    pub async fn get_public(&self, uri: &str) -> Response<Body> {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }

    /// Create a project for `secret`'s owner and return its JSON
    pub async fn create_project(&self, secret: &str, name: &str) -> Value {
        let (status, project) = self
            .call(
                "POST",
                "/api/projects",
                secret,
                Some(serde_json::json!({ "name": name, "url": "https://acme.test" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{project}");
        project
    }
}

pub async fn body_bytes(response: Response<Body>) -> Bytes {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
}

pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = body_bytes(response).await;
    if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    }
}
