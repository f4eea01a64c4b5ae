//! Projects and their voice segments

pub mod model;
pub mod service;
pub mod validation;

pub use model::{
    NewProject, NewSegment, Project, ProjectPatch, Segment, SegmentCondition, SegmentPatch, Tone,
};
pub use service::{DEFAULT_LANGUAGE, PROJECTS_COLLECTION, ProjectService, segment_not_found};
