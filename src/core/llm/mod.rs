//! LLM-backed script writing
//!
//! [`ScriptWriter`] is the seam between handlers and the model provider. The only
//! implementation talks to an OpenAI-compatible chat completions endpoint.

mod openai;
pub mod prompt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::project::{SegmentCondition, Tone};

pub use openai::OpenAiScriptWriter;

pub const DEFAULT_MAX_WORDS: u32 = 80;

/// Errors returned by script writers
#[derive(Debug, Error)]
pub enum LlmError {
    /// No API key configured
    #[error("LLM provider is not configured")]
    NotConfigured,

    /// Provider answered with a non-success status
    #[error("LLM API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("LLM request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Completion had no text
    #[error("LLM returned an empty completion")]
    EmptyResponse,

    /// Completion could not be parsed as expected
    #[error("LLM returned an invalid response: {0}")]
    InvalidResponse(String),
}

pub type LlmResult<T> = Result<T, LlmError>;

/// Inputs for generating one segment script
#[derive(Debug, Clone)]
pub struct ScriptRequest {
    pub project_name: String,
    pub site_url: String,
    pub tone: Tone,
    pub language: String,
    pub condition: SegmentCondition,
    /// Marketing copy scraped from the site, if any
    pub site_copy: Option<String>,
    pub max_words: u32,
}

impl ScriptRequest {
    pub fn new(
        project_name: impl Into<String>,
        site_url: impl Into<String>,
        tone: Tone,
        language: impl Into<String>,
        condition: SegmentCondition,
    ) -> Self {
        Self {
            project_name: project_name.into(),
            site_url: site_url.into(),
            tone,
            language: language.into(),
            condition,
            site_copy: None,
            max_words: DEFAULT_MAX_WORDS,
        }
    }

    pub fn with_site_copy(mut self, site_copy: Option<String>) -> Self {
        self.site_copy = site_copy.filter(|c| !c.trim().is_empty());
        self
    }
}

/// A generated script
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptDraft {
    pub script: String,
    pub model: String,
}

/// Inputs for critiquing an existing script
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CritiqueRequest {
    pub script: String,
    #[serde(default)]
    pub tone: Option<Tone>,
    #[serde(default)]
    pub language: Option<String>,
}

/// Model feedback on a script
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Critique {
    /// 1 to 10
    pub score: u8,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub suggestions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revised_script: Option<String>,
}

#[async_trait]
pub trait ScriptWriter: Send + Sync {
    async fn generate_script(&self, request: &ScriptRequest) -> LlmResult<ScriptDraft>;

    async fn critique_script(&self, request: &CritiqueRequest) -> LlmResult<Critique>;
}
