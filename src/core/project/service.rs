use std::sync::Arc;

use chrono::Utc;

use super::model::{
    NewProject, NewSegment, Project, ProjectPatch, Segment, SegmentCondition, SegmentPatch,
};
use super::validation::{
    normalize_language, validate_condition, validate_name, validate_script, validate_site_url,
};
use crate::core::audio_store::AudioStore;
use crate::core::store::{DocumentStore, from_document, to_document};
use crate::errors::{AppError, AppResult};

pub const PROJECTS_COLLECTION: &str = "projects";
pub const DEFAULT_LANGUAGE: &str = "en";

/// Owner-scoped project and segment operations over the document store
#[derive(Clone)]
pub struct ProjectService {
    store: Arc<dyn DocumentStore>,
    audio: AudioStore,
}

impl ProjectService {
    pub fn new(store: Arc<dyn DocumentStore>, audio: AudioStore) -> Self {
        Self { store, audio }
    }

    /// Projects of `owner`, newest first
    pub async fn list(&self, owner: &str) -> AppResult<Vec<Project>> {
        let docs = self
            .store
            .query_eq(PROJECTS_COLLECTION, "ownerId", owner)
            .await?;

        let mut projects = Vec::with_capacity(docs.len());
        for doc in docs {
            projects.push(from_document::<Project>(doc)?);
        }
        projects.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(projects)
    }

    pub async fn create(&self, owner: &str, input: NewProject) -> AppResult<Project> {
        let now = Utc::now();
        let language = match input.language.as_deref() {
            Some(lang) if !lang.trim().is_empty() => normalize_language(lang)?,
            _ => DEFAULT_LANGUAGE.to_string(),
        };

        let project = Project {
            id: uuid::Uuid::new_v4().to_string(),
            owner_id: owner.to_string(),
            name: validate_name(&input.name)?,
            url: validate_site_url(&input.url)?,
            tone: input.tone.unwrap_or_default(),
            language,
            voice_id: input.voice_id.and_then(non_blank),
            segments: vec![Segment::new(SegmentCondition::NewVisitor, String::new())],
            created_at: now,
            updated_at: now,
        };

        self.store
            .create(PROJECTS_COLLECTION, &project.id, to_document(&project)?)
            .await?;

        tracing::info!(project_id = %project.id, owner, "Created project");
        Ok(project)
    }

    /// Fetch a project owned by `owner`. Other owners' projects look missing.
    pub async fn get(&self, owner: &str, id: &str) -> AppResult<Project> {
        let project = self.get_public(id).await?;
        if project.owner_id != owner {
            tracing::debug!(project_id = %id, owner, "Project belongs to another owner");
            return Err(not_found(id));
        }
        Ok(project)
    }

    /// Fetch a project without an owner check, for public playback
    pub async fn get_public(&self, id: &str) -> AppResult<Project> {
        if !is_document_id(id) {
            return Err(not_found(id));
        }
        let doc = self
            .store
            .get(PROJECTS_COLLECTION, id)
            .await?
            .ok_or_else(|| not_found(id))?;
        Ok(from_document(doc)?)
    }

    pub async fn update(&self, owner: &str, id: &str, patch: ProjectPatch) -> AppResult<Project> {
        let mut project = self.get(owner, id).await?;

        if let Some(name) = patch.name {
            project.name = validate_name(&name)?;
        }
        if let Some(url) = patch.url {
            project.url = validate_site_url(&url)?;
        }
        if let Some(tone) = patch.tone {
            project.tone = tone;
        }
        if let Some(language) = patch.language {
            project.language = normalize_language(&language)?;
        }
        if let Some(voice_id) = patch.voice_id {
            project.voice_id = non_blank(voice_id);
        }

        self.save(&mut project).await?;
        Ok(project)
    }

    pub async fn delete(&self, owner: &str, id: &str) -> AppResult<()> {
        let project = self.get(owner, id).await?;
        self.store.delete(PROJECTS_COLLECTION, &project.id).await?;

        // The document is gone either way; leftover audio only costs storage
        if let Err(e) = self.audio.delete_project(&project.id).await {
            tracing::warn!(project_id = %project.id, error = %e, "Failed to remove project audio");
        }

        tracing::info!(project_id = %project.id, owner, "Deleted project");
        Ok(())
    }

    pub async fn add_segment(&self, owner: &str, id: &str, input: NewSegment) -> AppResult<Segment> {
        let mut project = self.get(owner, id).await?;
        let condition = validate_condition(input.condition)?;
        let script = validate_script(input.script.as_deref().unwrap_or_default())?;

        let segment = Segment::new(condition, script);
        project.segments.push(segment.clone());
        self.save(&mut project).await?;

        tracing::info!(project_id = %id, segment_id = %segment.id, "Added segment");
        Ok(segment)
    }

    pub async fn update_segment(
        &self,
        owner: &str,
        id: &str,
        segment_id: &str,
        patch: SegmentPatch,
    ) -> AppResult<Segment> {
        let mut project = self.get(owner, id).await?;
        let segment = project
            .segment_mut(segment_id)
            .ok_or_else(|| segment_not_found(segment_id))?;

        if let Some(condition) = patch.condition {
            segment.condition = validate_condition(condition)?;
            segment.updated_at = Utc::now();
        }
        let mut dropped_audio = None;
        if let Some(script) = patch.script {
            dropped_audio = segment.set_script(validate_script(&script)?);
        }

        let updated = segment.clone();
        self.save(&mut project).await?;
        self.discard_audio(&project.id, dropped_audio).await;
        Ok(updated)
    }

    pub async fn remove_segment(&self, owner: &str, id: &str, segment_id: &str) -> AppResult<()> {
        let mut project = self.get(owner, id).await?;
        let index = project
            .segments
            .iter()
            .position(|s| s.id == segment_id)
            .ok_or_else(|| segment_not_found(segment_id))?;

        if project.segments.len() == 1 {
            return Err(AppError::Conflict(
                "A project needs at least one segment".to_string(),
            ));
        }

        let removed = project.segments.remove(index);
        self.save(&mut project).await?;
        self.discard_audio(&project.id, removed.audio_key).await;
        Ok(())
    }

    /// Delete an audio object no segment references any more.
    ///
    /// Failures are logged; an orphaned object only costs storage.
    pub async fn discard_audio(&self, project_id: &str, key: Option<String>) {
        if let Some(key) = key
            && let Err(e) = self.audio.delete(&key).await
        {
            tracing::warn!(project_id, key = %key, error = %e, "Failed to remove audio");
        }
    }

    /// Persist a modified project
    pub async fn save(&self, project: &mut Project) -> AppResult<()> {
        project.touch();
        self.store
            .set(PROJECTS_COLLECTION, &project.id, to_document(project)?)
            .await?;
        Ok(())
    }
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Ids this service hands out: ASCII letters, digits, `-` and `_`
fn is_document_id(id: &str) -> bool {
    (1..=128).contains(&id.len())
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

fn not_found(id: &str) -> AppError {
    AppError::NotFound(format!("Project {id} not found"))
}

pub fn segment_not_found(segment_id: &str) -> AppError {
    AppError::NotFound(format!("Segment {segment_id} not found"))
}
