//! Text-to-speech for segment audio and the voices list

mod elevenlabs;
mod voices;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use elevenlabs::ElevenLabsTTS;
pub use voices::VoiceCatalog;

/// Voice used when a project has not picked one ("Rachel")
pub const DEFAULT_VOICE_ID: &str = "21m00Tcm4TlvDq8Ikk0Y";

/// Longest text sent in a single synthesis request
pub const MAX_TTS_CHARS: usize = 5000;

#[derive(Debug, Error)]
pub enum TTSError {
    #[error("TTS provider is not configured")]
    NotConfigured,

    #[error("invalid TTS request: {0}")]
    InvalidRequest(String),

    #[error("TTS API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("TTS request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("TTS provider returned no audio")]
    EmptyAudio,
}

pub type TTSResult<T> = Result<T, TTSError>;

/// A selectable voice, normalized across providers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voice {
    /// Voice ID
    pub id: String,
    /// URL to sample audio
    pub sample: String,
    /// Display name of the voice
    pub name: String,
    /// Accent or dialect
    pub accent: String,
    /// Gender of the voice
    pub gender: String,
    /// Language supported by the voice
    pub language: String,
}

#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize `text` to MP3 bytes
    async fn synthesize(&self, text: &str, voice_id: &str, language: &str) -> TTSResult<Bytes>;

    async fn list_voices(&self) -> TTSResult<Vec<Voice>>;
}
