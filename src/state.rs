use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::config::ServerConfig;
use crate::core::audio_store::{AudioStore, AudioStoreError};
use crate::core::email::{
    EmailError, EmailService, EmailTokenSigner, Mailer, TokenError, mailer_from_config,
};
use crate::core::llm::{OpenAiScriptWriter, ScriptWriter};
use crate::core::project::ProjectService;
use crate::core::scrape::{PageScraper, ScrapeError};
use crate::core::store::{DocumentStore, FirestoreStore, MemoryStore, StoreError};
use crate::core::tts::{ElevenLabsTTS, SpeechSynthesizer, VoiceCatalog};

/// Failures while wiring services at startup
#[derive(Debug, Error)]
pub enum StateError {
    #[error("document store: {0}")]
    Store(#[from] StoreError),

    #[error("audio storage: {0}")]
    Audio(#[from] AudioStoreError),

    #[error("email: {0}")]
    Email(#[from] EmailError),

    #[error("email token signer: {0}")]
    Token(#[from] TokenError),

    #[error("page scraper: {0}")]
    Scrape(#[from] ScrapeError),

    #[error("HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

/// External collaborators behind the application services
///
/// Production wiring comes from [`AppState::new`]; tests build this directly with
/// in-memory stores and fakes or `wiremock`-backed providers.
pub struct Services {
    pub store: Arc<dyn DocumentStore>,
    pub scripts: Arc<dyn ScriptWriter>,
    pub tts: Arc<dyn SpeechSynthesizer>,
    pub audio: AudioStore,
    pub mailer: Arc<dyn Mailer>,
    pub scraper: PageScraper,
}

/// Application state shared by all handlers
pub struct AppState {
    pub config: ServerConfig,
    pub store: Arc<dyn DocumentStore>,
    pub projects: ProjectService,
    pub scripts: Arc<dyn ScriptWriter>,
    pub tts: Arc<dyn SpeechSynthesizer>,
    pub voices: VoiceCatalog,
    pub audio: AudioStore,
    pub email: EmailService,
    pub scraper: PageScraper,
}

impl AppState {
    /// Build production services from configuration
    pub async fn new(config: ServerConfig) -> Result<Arc<Self>, StateError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        let store: Arc<dyn DocumentStore> = match &config.firestore {
            Some(firestore) => {
                tracing::info!(
                    project_id = %firestore.project_id,
                    database = %firestore.database,
                    "Using Firestore document store"
                );
                Arc::new(FirestoreStore::with_client(http.clone(), firestore))
            }
            None => {
                tracing::warn!("Firestore not configured, using in-memory document store");
                Arc::new(MemoryStore::new())
            }
        };

        let scripts = Arc::new(OpenAiScriptWriter::new(
            http.clone(),
            config.openai_api_key.clone(),
            config.openai_base_url.clone(),
            config.openai_model.clone(),
        ));
        if !scripts.is_configured() {
            tracing::warn!("OPENAI_API_KEY not set, script generation disabled");
        }

        let tts = Arc::new(ElevenLabsTTS::new(
            http,
            config.elevenlabs_api_key.clone(),
            config.elevenlabs_base_url.clone(),
            config.elevenlabs_model.clone(),
        ));
        if !tts.is_configured() {
            tracing::warn!("ELEVENLABS_API_KEY not set, voice audio disabled");
        }

        let audio = AudioStore::from_config(&config.audio)?;
        tracing::info!(backend = audio.backend_name(), "Audio storage ready");

        let services = Services {
            store,
            scripts,
            tts,
            audio,
            mailer: mailer_from_config(&config.email)?,
            scraper: PageScraper::new()?,
        };
        Self::with_services(config, services)
    }

    /// Build state around explicit collaborators
    pub fn with_services(
        config: ServerConfig,
        services: Services,
    ) -> Result<Arc<Self>, StateError> {
        let signer = match config.email.token_secret.as_deref() {
            Some(secret) if !secret.is_empty() => Some(EmailTokenSigner::new(secret)?),
            _ => {
                tracing::warn!("EMAIL_TOKEN_SECRET not set, email endpoints disabled");
                None
            }
        };

        let email = EmailService::new(
            services.store.clone(),
            services.mailer,
            signer,
            config.public_base(),
            chrono::Duration::hours(config.email.verification_ttl_hours as i64),
        );
        let projects = ProjectService::new(services.store.clone(), services.audio.clone());
        let voices = VoiceCatalog::new(
            services.tts.clone(),
            Duration::from_secs(config.voices_cache_ttl_seconds),
        );

        Ok(Arc::new(Self {
            config,
            store: services.store,
            projects,
            scripts: services.scripts,
            tts: services.tts,
            voices,
            audio: services.audio,
            email,
            scraper: services.scraper,
        }))
    }

    /// Absolute URL of a segment's audio.
    ///
    /// `version` (the audio hash) is appended as `?v=` so cached copies of an older
    /// version are never reused.
    pub fn audio_url(&self, project_id: &str, segment_id: &str, version: Option<&str>) -> String {
        let base = self.config.public_base();
        match version {
            Some(v) => format!("{base}/api/audio/{project_id}/{segment_id}?v={v}"),
            None => format!("{base}/api/audio/{project_id}/{segment_id}"),
        }
    }
}
