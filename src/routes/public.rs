use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers::{api, audio, email, playback, widget};
use crate::state::AppState;
use std::sync::Arc;

/// Create the routes embedded on customer sites and opened from emails (no auth)
pub fn create_public_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(api::health_check))
        .route("/widget.js", get(widget::widget_script))
        .route("/api/playback", get(playback::playback))
        .route(
            "/api/audio/{project_id}/{segment_id}",
            get(audio::stream_audio),
        )
        .route("/api/email/verify", get(email::verify_email))
        .route("/api/email/unsubscribe", get(email::unsubscribe))
        .layer(TraceLayer::new_for_http())
}
