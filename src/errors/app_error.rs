use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::core::audio_store::AudioStoreError;
use crate::core::email::{EmailError, TokenError};
use crate::core::llm::LlmError;
use crate::core::scrape::ScrapeError;
use crate::core::store::StoreError;
use crate::core::tts::TTSError;

/// Errors surfaced by HTTP handlers and the services they call
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    /// A third-party service (LLM, TTS, database, scraped site) failed
    #[error("{0}")]
    Upstream(String),

    #[error("{0}")]
    NotConfigured(String),

    #[error("{0}")]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::NotConfigured(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation_error",
            AppError::Unauthorized(_) => "unauthorized",
            AppError::Forbidden(_) => "forbidden",
            AppError::NotFound(_) => "not_found",
            AppError::Conflict(_) => "conflict",
            AppError::Upstream(_) => "upstream_error",
            AppError::NotConfigured(_) => "not_configured",
            AppError::Internal(_) => "internal_error",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, code = self.code(), "Request failed");
        } else {
            tracing::debug!(error = %self, code = self.code(), "Request rejected");
        }

        // Internal details are logged above, never returned
        let message = match &self {
            AppError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };

        (
            status,
            Json(json!({ "error": self.code(), "message": message })),
        )
            .into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::AlreadyExists(id) => AppError::Conflict(format!("Document {id} already exists")),
            StoreError::Backend { .. } | StoreError::Http(_) => {
                AppError::Upstream(format!("Document store unavailable: {err}"))
            }
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<LlmError> for AppError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::NotConfigured => {
                AppError::NotConfigured("Script generation is not configured".to_string())
            }
            other => AppError::Upstream(format!("Script generation failed: {other}")),
        }
    }
}

impl From<TTSError> for AppError {
    fn from(err: TTSError) -> Self {
        match err {
            TTSError::NotConfigured => {
                AppError::NotConfigured("Text-to-speech is not configured".to_string())
            }
            TTSError::InvalidRequest(message) => AppError::Validation(message),
            other => AppError::Upstream(format!("Text-to-speech failed: {other}")),
        }
    }
}

impl From<AudioStoreError> for AppError {
    fn from(err: AudioStoreError) -> Self {
        AppError::Internal(format!("Audio storage failed: {err}"))
    }
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        AppError::Validation(format!("Invalid link: {err}"))
    }
}

impl From<EmailError> for AppError {
    fn from(err: EmailError) -> Self {
        match err {
            EmailError::NotConfigured => {
                AppError::NotConfigured("Email links are not configured".to_string())
            }
            EmailError::InvalidAddress(message) => AppError::Validation(message),
            EmailError::Unsubscribed => {
                AppError::Conflict("This address has unsubscribed from emails".to_string())
            }
            EmailError::Token(token) => token.into(),
            EmailError::Store(store) => store.into(),
            EmailError::Send(message) => AppError::Upstream(format!("Email delivery failed: {message}")),
        }
    }
}

impl From<ScrapeError> for AppError {
    fn from(err: ScrapeError) -> Self {
        match err {
            ScrapeError::InvalidUrl(e) => AppError::Validation(format!("URL not allowed: {e}")),
            other => AppError::Upstream(format!("Could not read page: {other}")),
        }
    }
}
