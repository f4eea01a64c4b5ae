use axum::{
    Extension, Json,
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

use crate::auth::Auth;
use crate::core::audio_store::{audio_hash, audio_key};
use crate::core::project::{Segment, segment_not_found};
use crate::core::tts::DEFAULT_VOICE_ID;
use crate::errors::{AppError, AppResult};
use crate::state::AppState;

const CONTENT_TYPE: &str = "audio/mpeg";
const CACHE_CONTROL: &str = "public, max-age=3600";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedAudio {
    pub segment: Segment,
    pub audio_url: String,
    /// True when the stored audio already matched the script, voice and language
    pub cached: bool,
}

/// Synthesize a segment's script and store the audio
pub async fn generate_segment_audio(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<Auth>,
    Path((id, segment_id)): Path<(String, String)>,
) -> AppResult<Json<GeneratedAudio>> {
    let owner = auth.owner_id();
    let project = state.projects.get(owner, &id).await?;
    let segment = project
        .segment(&segment_id)
        .ok_or_else(|| segment_not_found(&segment_id))?;

    if segment.script.trim().is_empty() {
        return Err(AppError::Validation(
            "Segment has no script to synthesize".to_string(),
        ));
    }

    let voice_id = project.voice_id.as_deref().unwrap_or(DEFAULT_VOICE_ID);
    let language = segment.spoken_language(&project.language);
    let hash = audio_hash(voice_id, language, &segment.script);

    if segment.audio_hash.as_deref() == Some(hash.as_str())
        && let Some(key) = &segment.audio_key
        && state.audio.get(key).await?.is_some()
    {
        debug!(project_id = %id, segment_id = %segment_id, "Audio up to date");
        return Ok(Json(GeneratedAudio {
            segment: segment.clone(),
            audio_url: state.audio_url(&id, &segment_id, Some(&hash)),
            cached: true,
        }));
    }

    let audio = state
        .tts
        .synthesize(&segment.script, voice_id, language)
        .await?;
    let size = audio.len();
    let key = audio_key(&project.id, &segment_id, &hash);
    state.audio.put(&key, audio).await?;

    // Synthesis is slow; apply the result to the latest copy of the project
    let voice_id = voice_id.to_string();
    let mut project = state.projects.get(owner, &id).await?;
    let current_voice = project.voice_id.clone();
    let language = project.language.clone();
    let Some(segment) = project.segment_mut(&segment_id) else {
        state.projects.discard_audio(&id, Some(key)).await;
        return Err(segment_not_found(&segment_id));
    };
    let current_hash = audio_hash(
        current_voice.as_deref().unwrap_or(DEFAULT_VOICE_ID),
        segment.spoken_language(&language),
        &segment.script,
    );
    if current_hash != hash {
        if segment.audio_key.as_deref() != Some(key.as_str()) {
            state.projects.discard_audio(&id, Some(key)).await;
        }
        return Err(AppError::Conflict(
            "Segment changed while audio was generated, try again".to_string(),
        ));
    }
    let replaced = segment.audio_key.replace(key.clone());
    segment.audio_hash = Some(hash.clone());
    let segment = segment.clone();
    state.projects.save(&mut project).await?;
    if replaced.as_deref() != Some(key.as_str()) {
        state.projects.discard_audio(&id, replaced).await;
    }

    info!(
        project_id = %id,
        segment_id = %segment_id,
        voice_id = %voice_id,
        size,
        "Generated segment audio"
    );

    Ok(Json(GeneratedAudio {
        segment,
        audio_url: state.audio_url(&id, &segment_id, Some(&hash)),
        cached: false,
    }))
}

/// Stream a segment's MP3 to the widget
pub async fn stream_audio(
    State(state): State<Arc<AppState>>,
    Path((project_id, segment_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> AppResult<Response> {
    let project = state.projects.get_public(&project_id).await?;
    let segment = project
        .segment(&segment_id)
        .ok_or_else(|| segment_not_found(&segment_id))?;
    let key = segment
        .audio_key
        .as_deref()
        .ok_or_else(|| AppError::NotFound("Segment has no audio".to_string()))?;

    let etag = segment.audio_hash.as_deref().map(|hash| format!("\"{hash}\""));
    if let Some(etag) = &etag
        && headers
            .get(header::IF_NONE_MATCH)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == etag.as_str())
    {
        return Ok(StatusCode::NOT_MODIFIED.into_response());
    }

    let body = state
        .audio
        .get(key)
        .await?
        .ok_or_else(|| AppError::NotFound("Audio not found".to_string()))?;

    let mut response_headers = HeaderMap::new();
    response_headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE));
    response_headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(CACHE_CONTROL));
    response_headers.insert(header::CONTENT_LENGTH, HeaderValue::from(body.len()));
    if let Some(etag) = etag
        && let Ok(value) = HeaderValue::from_str(&etag)
    {
        response_headers.insert(header::ETAG, value);
    }

    Ok((StatusCode::OK, response_headers, body).into_response())
}
