use axum::{
    Json,
    extract::State,
    http::{HeaderMap, header},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::core::segment::{SelectionReason, VisitorContext, select_playable_segment};
use crate::errors::{AppError, AppResult};
use crate::handlers::extract::ApiQuery;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackQuery {
    pub project_id: String,
    #[serde(rename = "utm_source")]
    pub utm_source: Option<String>,
    pub returning: Option<String>,
    pub lang: Option<String>,
}

/// The segment a visitor should hear
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Playback {
    pub project_id: String,
    pub segment_id: String,
    pub reason: SelectionReason,
    pub audio_url: String,
    pub script: String,
    pub language: String,
}

pub async fn playback(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiQuery(query): ApiQuery<PlaybackQuery>,
) -> AppResult<Json<Playback>> {
    let project = state.projects.get_public(&query.project_id).await?;

    let visitor = VisitorContext::from_request(
        query.utm_source.as_deref(),
        query.returning.as_deref(),
        query.lang.as_deref(),
        headers
            .get(header::ACCEPT_LANGUAGE)
            .and_then(|v| v.to_str().ok()),
    );

    let selection = select_playable_segment(&project.segments, &visitor)
        .ok_or_else(|| AppError::NotFound("Project has no audio yet".to_string()))?;
    let segment = selection.segment;

    debug!(
        project_id = %project.id,
        segment_id = %segment.id,
        reason = %selection.reason,
        utm_source = ?visitor.utm_source,
        returning = visitor.returning,
        "Selected playback segment"
    );

    Ok(Json(Playback {
        project_id: project.id.clone(),
        segment_id: segment.id.clone(),
        reason: selection.reason,
        audio_url: state.audio_url(&project.id, &segment.id, segment.audio_hash.as_deref()),
        script: segment.script.clone(),
        language: segment.spoken_language(&project.language).to_string(),
    }))
}
