use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Speaking style requested from the script writer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    #[default]
    Friendly,
    Professional,
    Energetic,
    Calm,
    Playful,
}

impl Tone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::Friendly => "friendly",
            Tone::Professional => "professional",
            Tone::Energetic => "energetic",
            Tone::Calm => "calm",
            Tone::Playful => "playful",
        }
    }

    /// Style guidance handed to the LLM
    pub fn guidance(&self) -> &'static str {
        match self {
            Tone::Friendly => "warm, welcoming and conversational",
            Tone::Professional => "confident, clear and businesslike",
            Tone::Energetic => "upbeat, punchy and enthusiastic",
            Tone::Calm => "relaxed, reassuring and unhurried",
            Tone::Playful => "light-hearted, witty and fun",
        }
    }
}

impl std::fmt::Display for Tone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which visitors a segment is written for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SegmentCondition {
    NewVisitor,
    ReturningVisitor,
    UtmSource { source: String },
    Language { language: String },
}

impl SegmentCondition {
    /// Audience description handed to the LLM
    pub fn audience(&self) -> String {
        match self {
            SegmentCondition::NewVisitor => {
                "a first-time visitor who has never seen the site before".to_string()
            }
            SegmentCondition::ReturningVisitor => {
                "a returning visitor who already knows the site and is considering a next step"
                    .to_string()
            }
            SegmentCondition::UtmSource { source } => {
                format!("a visitor arriving from the '{source}' campaign or channel")
            }
            SegmentCondition::Language { language } => {
                format!("a visitor whose browser prefers the '{language}' language")
            }
        }
    }
}

/// A scripted voice variant inside a project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    pub id: String,
    pub condition: SegmentCondition,
    #[serde(default)]
    pub script: String,
    /// Object key of the synthesized audio, present once audio was generated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_key: Option<String>,
    /// Hash of the inputs that produced `audio_key`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_hash: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl Segment {
    pub fn new(condition: SegmentCondition, script: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            condition,
            script,
            audio_key: None,
            audio_hash: None,
            updated_at: Utc::now(),
        }
    }

    pub fn has_audio(&self) -> bool {
        self.audio_key.is_some()
    }

    /// Language the segment is spoken in: its own for language segments, else the project's
    pub fn spoken_language<'a>(&'a self, project_language: &'a str) -> &'a str {
        match &self.condition {
            SegmentCondition::Language { language } => language,
            _ => project_language,
        }
    }

    /// Replace the script; stale audio is dropped when the text changes.
    ///
    /// Returns the key of the dropped audio object, if any.
    pub fn set_script(&mut self, script: String) -> Option<String> {
        let dropped = if self.script != script {
            self.script = script;
            self.clear_audio()
        } else {
            None
        };
        self.updated_at = Utc::now();
        dropped
    }

    pub fn clear_audio(&mut self) -> Option<String> {
        self.audio_hash = None;
        self.audio_key.take()
    }
}

/// A tenant's site configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub tone: Tone,
    pub language: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_id: Option<String>,
    #[serde(default)]
    pub segments: Vec<Segment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    pub fn segment(&self, segment_id: &str) -> Option<&Segment> {
        self.segments.iter().find(|s| s.id == segment_id)
    }

    pub fn segment_mut(&mut self, segment_id: &str) -> Option<&mut Segment> {
        self.segments.iter_mut().find(|s| s.id == segment_id)
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Body of `POST /api/projects`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProject {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub tone: Option<Tone>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub voice_id: Option<String>,
}

/// Body of `PATCH /api/projects/{id}`. An empty `voiceId` clears the voice.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectPatch {
    pub name: Option<String>,
    pub url: Option<String>,
    pub tone: Option<Tone>,
    pub language: Option<String>,
    pub voice_id: Option<String>,
}

/// Body of `POST /api/projects/{id}/segments`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSegment {
    pub condition: SegmentCondition,
    #[serde(default)]
    pub script: Option<String>,
}

/// Body of `PATCH /api/projects/{id}/segments/{segment_id}`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentPatch {
    pub condition: Option<SegmentCondition>,
    pub script: Option<String>,
}
