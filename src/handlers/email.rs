use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::errors::{AppError, AppResult};
use crate::handlers::extract::{ApiJson, ApiQuery};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct VerificationRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct TokenQuery {
    pub token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct EmailStatus {
    pub status: &'static str,
    pub email: String,
}

fn require_token(query: TokenQuery) -> AppResult<String> {
    query
        .token
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Validation("Missing token".to_string()))
}

/// Send a verification link to an address
pub async fn request_verification(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<VerificationRequest>,
) -> AppResult<(StatusCode, Json<EmailStatus>)> {
    let email = state.email.send_verification(&request.email).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(EmailStatus {
            status: "sent",
            email,
        }),
    ))
}

pub async fn verify_email(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<TokenQuery>,
) -> AppResult<Json<EmailStatus>> {
    let token = require_token(query)?;
    let email = state.email.confirm_verification(&token).await?;
    Ok(Json(EmailStatus {
        status: "verified",
        email,
    }))
}

pub async fn unsubscribe(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<TokenQuery>,
) -> AppResult<Json<EmailStatus>> {
    let token = require_token(query)?;
    let email = state.email.unsubscribe(&token).await?;
    Ok(Json(EmailStatus {
        status: "unsubscribed",
        email,
    }))
}
