use axum::{extract::State, response::Json};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use crate::core::tts::Voice;
use crate::errors::AppResult;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct VoicesResponse {
    pub voices: Vec<Voice>,
    /// Served from the voices cache rather than the provider
    pub cached: bool,
}

/// List the voices a project can use
pub async fn list_voices(State(state): State<Arc<AppState>>) -> AppResult<Json<VoicesResponse>> {
    let (voices, cached) = state.voices.voices().await?;
    debug!(count = voices.len(), cached, "Listing voices");

    Ok(Json(VoicesResponse {
        voices: voices.to_vec(),
        cached,
    }))
}
