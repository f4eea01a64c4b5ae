use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::handlers::{audio, email, projects, scrape, scripts, voices};
use crate::state::AppState;
use std::sync::Arc;

/// Create the dashboard API router
///
/// Note: authentication and CORS are applied by [`super::build_router`]
pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/projects",
            get(projects::list_projects).post(projects::create_project),
        )
        .route(
            "/api/projects/{id}",
            get(projects::get_project)
                .patch(projects::update_project)
                .delete(projects::delete_project),
        )
        .route("/api/projects/{id}/embed", get(projects::embed_project))
        .route("/api/projects/{id}/segments", post(projects::add_segment))
        .route(
            "/api/projects/{id}/segments/{segment_id}",
            axum::routing::patch(projects::update_segment).delete(projects::delete_segment),
        )
        .route(
            "/api/projects/{id}/segments/{segment_id}/script",
            post(scripts::generate_segment_script),
        )
        .route(
            "/api/projects/{id}/segments/{segment_id}/audio",
            post(audio::generate_segment_audio),
        )
        .route("/api/scripts/critique", post(scripts::critique_script))
        .route("/api/voices", get(voices::list_voices))
        .route("/api/scrape", post(scrape::scrape_page))
        .route("/api/email/verification", post(email::request_verification))
        .layer(TraceLayer::new_for_http())
}
