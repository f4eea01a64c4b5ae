use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use crate::auth::Auth;
use crate::core::project::{NewProject, NewSegment, Project, ProjectPatch, Segment, SegmentPatch};
use crate::errors::AppResult;
use crate::handlers::extract::ApiJson;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ProjectList {
    pub projects: Vec<Project>,
}

/// Snippet a customer pastes into their site
#[derive(Debug, Serialize)]
pub struct EmbedSnippet {
    pub snippet: String,
}

/// Build the `<script>` tag that loads the widget for a project
pub fn embed_snippet(public_base: &str, project_id: &str) -> String {
    format!(
        r#"<script src="{}/widget.js" data-project="{project_id}" async></script>"#,
        public_base.trim_end_matches('/')
    )
}

pub async fn list_projects(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<Auth>,
) -> AppResult<Json<ProjectList>> {
    let projects = state.projects.list(auth.owner_id()).await?;
    Ok(Json(ProjectList { projects }))
}

pub async fn create_project(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<Auth>,
    ApiJson(input): ApiJson<NewProject>,
) -> AppResult<(StatusCode, Json<Project>)> {
    let project = state.projects.create(auth.owner_id(), input).await?;
    info!(project_id = %project.id, owner = %project.owner_id, "Project created");
    Ok((StatusCode::CREATED, Json(project)))
}

pub async fn get_project(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<Auth>,
    Path(id): Path<String>,
) -> AppResult<Json<Project>> {
    Ok(Json(state.projects.get(auth.owner_id(), &id).await?))
}

pub async fn update_project(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<Auth>,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<ProjectPatch>,
) -> AppResult<Json<Project>> {
    Ok(Json(state.projects.update(auth.owner_id(), &id, patch).await?))
}

pub async fn delete_project(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<Auth>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    state.projects.delete(auth.owner_id(), &id).await?;
    info!(project_id = %id, "Project deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_segment(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<Auth>,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<NewSegment>,
) -> AppResult<(StatusCode, Json<Segment>)> {
    let segment = state.projects.add_segment(auth.owner_id(), &id, input).await?;
    Ok((StatusCode::CREATED, Json(segment)))
}

pub async fn update_segment(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<Auth>,
    Path((id, segment_id)): Path<(String, String)>,
    ApiJson(patch): ApiJson<SegmentPatch>,
) -> AppResult<Json<Segment>> {
    let segment = state
        .projects
        .update_segment(auth.owner_id(), &id, &segment_id, patch)
        .await?;
    Ok(Json(segment))
}

pub async fn delete_segment(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<Auth>,
    Path((id, segment_id)): Path<(String, String)>,
) -> AppResult<StatusCode> {
    state
        .projects
        .remove_segment(auth.owner_id(), &id, &segment_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn embed_project(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<Auth>,
    Path(id): Path<String>,
) -> AppResult<Json<EmbedSnippet>> {
    let project = state.projects.get(auth.owner_id(), &id).await?;
    Ok(Json(EmbedSnippet {
        snippet: embed_snippet(state.config.public_base(), &project.id),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embed_snippet() {
        assert_eq!(
            embed_snippet("https://app.example.com/", "p-1"),
            r#"<script src="https://app.example.com/widget.js" data-project="p-1" async></script>"#
        );
    }
}
