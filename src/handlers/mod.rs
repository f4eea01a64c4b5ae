//! HTTP request handlers
//!
//! This module organizes all API handlers into logical groups:
//! - `api` - Health check endpoint
//! - `projects` - Project and segment CRUD plus the embed snippet
//! - `scripts` - LLM script generation and critique
//! - `audio` - Segment audio synthesis and streaming
//! - `voices` - Voice listing endpoint
//! - `playback` - Public segment selection for the widget
//! - `email` - Verification and unsubscribe links
//! - `scrape` - Marketing copy extraction
//! - `widget` - The embeddable widget script

pub mod api;
pub mod audio;
pub mod email;
pub mod extract;
pub mod playback;
pub mod projects;
pub mod scrape;
pub mod scripts;
pub mod voices;
pub mod widget;
