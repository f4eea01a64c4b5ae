//! Configuration module for the PitchVoice server
//!
//! This module handles server configuration from various sources: .env files, YAML files,
//! and environment variables. Priority: YAML > ENV vars > .env values > defaults.
//!
//! # Modules
//! - `yaml`: YAML configuration file loading
//! - `env`: Environment variable loading
//! - `merge`: Merging YAML and environment configurations
//! - `validation`: Configuration validation logic
//! - `utils`: Utility functions for configuration parsing
//!
//! # Example
//! ```rust,no_run
//! use pitchvoice::config::ServerConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = ServerConfig::from_env()?;
//!
//! // Load from YAML file with environment variable overrides
//! let config_path = PathBuf::from("config.yaml");
//! let config = ServerConfig::from_file(&config_path)?;
//!
//! println!("Server listening on {}", config.address());
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::str::FromStr;

mod env;
mod merge;
mod utils;
mod validation;
mod yaml;

pub const DEFAULT_PUBLIC_BASE_URL: &str = "http://localhost:3001";
pub const DEFAULT_FIRESTORE_BASE_URL: &str = "https://firestore.googleapis.com/v1";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_ELEVENLABS_BASE_URL: &str = "https://api.elevenlabs.io";
pub const DEFAULT_ELEVENLABS_MODEL: &str = "eleven_multilingual_v2";
pub const DEFAULT_VOICES_CACHE_TTL_SECONDS: u64 = 300;
pub const DEFAULT_EMAIL_FROM: &str = "PitchVoice <no-reply@localhost>";

/// TLS configuration for HTTPS
#[derive(Debug, Clone)]
pub struct TlsConfig {
    /// Path to the TLS certificate file (PEM format)
    pub cert_path: PathBuf,
    /// Path to the TLS private key file (PEM format)
    pub key_path: PathBuf,
}

/// API secret authentication entry. The id doubles as the owner id of the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthApiSecret {
    pub id: String,
    pub secret: String,
}

/// Firestore REST connection settings
#[derive(Debug, Clone)]
pub struct FirestoreConfig {
    pub project_id: String,
    pub database: String,
    pub base_url: String,
    /// OAuth bearer token. `None` is only useful against the emulator.
    pub access_token: Option<String>,
}

/// Where synthesized audio is kept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AudioStorageKind {
    #[default]
    Memory,
    Local,
    S3,
}

impl FromStr for AudioStorageKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "memory" | "in-memory" => Ok(Self::Memory),
            "local" | "filesystem" | "fs" => Ok(Self::Local),
            "s3" => Ok(Self::S3),
            other => Err(format!(
                "Invalid audio storage '{other}'. Expected one of: memory, local, s3"
            )),
        }
    }
}

/// Audio object storage settings
#[derive(Debug, Clone, Default)]
pub struct AudioStorageConfig {
    pub kind: AudioStorageKind,
    pub local_path: Option<PathBuf>,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>,
    pub s3_access_key: Option<String>,
    pub s3_secret_key: Option<String>,
}

/// Email delivery and signed-link settings
#[derive(Debug, Clone)]
pub struct EmailConfig {
    /// SMTP relay host. When absent, emails are logged instead of sent.
    pub smtp_host: Option<String>,
    pub smtp_port: u16,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    /// Sender mailbox, e.g. `PitchVoice <no-reply@pitchvoice.io>`
    pub from: String,
    /// HMAC key for verification and unsubscribe tokens
    pub token_secret: Option<String>,
    pub verification_ttl_hours: u64,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            smtp_host: None,
            smtp_port: 587,
            smtp_username: None,
            smtp_password: None,
            from: DEFAULT_EMAIL_FROM.to_string(),
            token_secret: None,
            verification_ttl_hours: 24,
        }
    }
}

/// Server configuration
///
/// Contains all configuration needed to run the PitchVoice server, including:
/// - Server settings (host, port, TLS, public base URL)
/// - Document database settings (Firestore)
/// - Provider API keys (OpenAI, ElevenLabs)
/// - Audio storage
/// - Email delivery
/// - Authentication settings
/// - Security settings (CORS, rate limiting)
#[derive(Debug, Clone)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,
    /// Absolute base URL used for links in emails and audio URLs handed to the widget
    pub public_base_url: String,

    // TLS configuration (optional)
    pub tls: Option<TlsConfig>,

    // Document database. None means the in-memory store.
    pub firestore: Option<FirestoreConfig>,

    // LLM provider
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub openai_model: String,

    // TTS provider
    pub elevenlabs_api_key: Option<String>,
    pub elevenlabs_base_url: String,
    pub elevenlabs_model: String,

    pub audio: AudioStorageConfig,

    /// Time-to-live of the cached voices list
    pub voices_cache_ttl_seconds: u64,

    pub email: EmailConfig,

    // Authentication configuration
    pub auth_api_secrets: Vec<AuthApiSecret>,
    /// HS256 secret for dashboard session tokens
    pub auth_jwt_secret: Option<String>,
    pub auth_required: bool,

    // Security configuration
    /// CORS allowed origins for dashboard routes (comma-separated list or "*" for all)
    /// Default: None (CORS disabled, same-origin only)
    pub cors_allowed_origins: Option<String>,

    // Rate limiting configuration
    /// Maximum requests per second per IP address
    /// Default: 60
    pub rate_limit_requests_per_second: u32,
    /// Maximum burst size for rate limiting
    /// Default: 10
    pub rate_limit_burst_size: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            public_base_url: DEFAULT_PUBLIC_BASE_URL.to_string(),
            tls: None,
            firestore: None,
            openai_api_key: None,
            openai_base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            openai_model: DEFAULT_OPENAI_MODEL.to_string(),
            elevenlabs_api_key: None,
            elevenlabs_base_url: DEFAULT_ELEVENLABS_BASE_URL.to_string(),
            elevenlabs_model: DEFAULT_ELEVENLABS_MODEL.to_string(),
            audio: AudioStorageConfig::default(),
            voices_cache_ttl_seconds: DEFAULT_VOICES_CACHE_TTL_SECONDS,
            email: EmailConfig::default(),
            auth_api_secrets: Vec::new(),
            auth_jwt_secret: None,
            auth_required: false,
            cors_allowed_origins: None,
            rate_limit_requests_per_second: 60,
            rate_limit_burst_size: 10,
        }
    }
}

/// Implement Drop to zeroize all secret fields when ServerConfig is dropped.
impl Drop for ServerConfig {
    fn drop(&mut self) {
        use zeroize::Zeroize;

        if let Some(ref mut firestore) = self.firestore {
            if let Some(ref mut token) = firestore.access_token {
                token.zeroize();
            }
        }
        if let Some(ref mut key) = self.openai_api_key {
            key.zeroize();
        }
        if let Some(ref mut key) = self.elevenlabs_api_key {
            key.zeroize();
        }
        if let Some(ref mut key) = self.audio.s3_access_key {
            key.zeroize();
        }
        if let Some(ref mut secret) = self.audio.s3_secret_key {
            secret.zeroize();
        }
        if let Some(ref mut password) = self.email.smtp_password {
            password.zeroize();
        }
        if let Some(ref mut secret) = self.email.token_secret {
            secret.zeroize();
        }
        if let Some(ref mut secret) = self.auth_jwt_secret {
            secret.zeroize();
        }
        for secret in &mut self.auth_api_secrets {
            secret.secret.zeroize();
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables only
    ///
    /// The .env file is loaded by `main` before this is called, so its values are
    /// visible here as regular environment variables.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let config = merge::merge_config(None)?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a YAML file with environment variable base
    ///
    /// Priority order (highest to lowest):
    /// 1. YAML file values
    /// 2. Environment variables (actual ENV vars override .env values)
    /// 3. .env file values
    /// 4. Default values
    ///
    /// After loading and merging, performs validation on the final configuration.
    ///
    /// # Errors
    /// Returns an error if:
    /// - The YAML file cannot be read or is malformed
    /// - Environment variables have invalid formats
    /// - Configuration validation fails
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let yaml_config = yaml::YamlConfig::from_file(path)?;
        let config = merge::merge_config(Some(yaml_config))?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Get the server address as a string in the format "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if TLS is enabled
    pub fn is_tls_enabled(&self) -> bool {
        self.tls.is_some()
    }

    /// Check if session JWT authentication is configured
    pub fn has_jwt_auth(&self) -> bool {
        self.auth_jwt_secret
            .as_deref()
            .is_some_and(|secret| !secret.is_empty())
    }

    /// Check if API secret authentication is configured
    pub fn has_api_secret_auth(&self) -> bool {
        !self.auth_api_secrets.is_empty()
    }

    /// Find the API secret identifier that matches a bearer token
    pub fn find_api_secret_id(&self, token: &str) -> Option<&str> {
        crate::auth::match_api_secret_id(token, &self.auth_api_secrets)
    }

    /// Whether documents are persisted in Firestore rather than in memory
    pub fn is_firestore_enabled(&self) -> bool {
        self.firestore.is_some()
    }

    /// Whether outgoing emails go to a real SMTP relay
    pub fn is_email_delivery_enabled(&self) -> bool {
        self.email
            .smtp_host
            .as_deref()
            .is_some_and(|host| !host.trim().is_empty())
    }

    /// Public base URL without a trailing slash
    pub fn public_base(&self) -> &str {
        self.public_base_url.trim_end_matches('/')
    }
}

pub(crate) fn parse_auth_api_secrets_json(
    json_str: &str,
) -> Result<Vec<AuthApiSecret>, Box<dyn std::error::Error>> {
    #[derive(serde::Deserialize)]
    struct AuthApiSecretJson {
        id: String,
        secret: String,
    }

    let secrets: Vec<AuthApiSecretJson> = serde_json::from_str(json_str)
        .map_err(|e| format!("Invalid AUTH_API_SECRETS_JSON format: {e}"))?;

    Ok(secrets
        .into_iter()
        .map(|entry| AuthApiSecret {
            id: entry.id,
            secret: entry.secret,
        })
        .collect())
}
