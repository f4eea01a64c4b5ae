use axum::{
    Extension, Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::auth::Auth;
use crate::core::llm::{Critique, CritiqueRequest, ScriptRequest};
use crate::core::project::{Segment, segment_not_found, validation::validate_script};
use crate::errors::{AppError, AppResult};
use crate::handlers::extract::ApiJson;
use crate::state::AppState;

/// Options for generating a segment script
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerateScriptBody {
    /// Run a critique pass and adopt its revised script
    pub critique: bool,
    /// Marketing copy to ground the script in
    pub site_copy: Option<String>,
    /// Scrape the project URL for copy when `site_copy` is absent
    pub scrape_site: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedScript {
    pub segment: Segment,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub critique: Option<Critique>,
    pub model: String,
}

/// Generate a script for one segment and save it
///
/// Replacing the script drops the segment's audio; it has to be regenerated.
pub async fn generate_segment_script(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<Auth>,
    Path((id, segment_id)): Path<(String, String)>,
    body: Option<ApiJson<GenerateScriptBody>>,
) -> AppResult<Json<GeneratedScript>> {
    let body = body.map(|ApiJson(body)| body).unwrap_or_default();
    let owner = auth.owner_id();
    let project = state.projects.get(owner, &id).await?;
    let segment = project
        .segment(&segment_id)
        .ok_or_else(|| segment_not_found(&segment_id))?;
    let condition = segment.condition.clone();
    let language = segment.spoken_language(&project.language).to_string();

    let mut site_copy = body.site_copy;
    if site_copy.is_none() && body.scrape_site {
        match state.scraper.scrape(&project.url).await {
            Ok(page) => site_copy = Some(page.as_site_copy()),
            Err(e) => warn!(project_id = %id, url = %project.url, error = %e, "Site scrape failed, generating without copy"),
        }
    }

    let request = ScriptRequest::new(
        project.name.as_str(),
        project.url.as_str(),
        project.tone,
        language.as_str(),
        condition,
    )
    .with_site_copy(site_copy);
    let draft = state.scripts.generate_script(&request).await?;

    let mut script = draft.script;
    let critique = if body.critique {
        let critique = state
            .scripts
            .critique_script(&CritiqueRequest {
                script: script.clone(),
                tone: Some(project.tone),
                language: Some(language),
            })
            .await?;
        if let Some(revised) = critique
            .revised_script
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            script = revised.to_string();
        }
        Some(critique)
    } else {
        None
    };

    let script = validate_script(&script)
        .map_err(|e| AppError::Upstream(format!("Generated script rejected: {e}")))?;

    // Generation is slow; apply the script to the latest copy of the project
    let mut project = state.projects.get(owner, &id).await?;
    let segment = project
        .segment_mut(&segment_id)
        .ok_or_else(|| segment_not_found(&segment_id))?;
    let dropped_audio = segment.set_script(script);
    let segment = segment.clone();
    state.projects.save(&mut project).await?;
    state.projects.discard_audio(&id, dropped_audio).await;

    info!(
        project_id = %id,
        segment_id = %segment_id,
        model = %draft.model,
        critiqued = critique.is_some(),
        "Generated segment script"
    );

    Ok(Json(GeneratedScript {
        segment,
        critique,
        model: draft.model,
    }))
}

pub async fn critique_script(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<CritiqueRequest>,
) -> AppResult<Json<Critique>> {
    if request.script.trim().is_empty() {
        return Err(AppError::Validation("Script must not be empty".to_string()));
    }
    validate_script(&request.script)?;

    Ok(Json(state.scripts.critique_script(&request).await?))
}
