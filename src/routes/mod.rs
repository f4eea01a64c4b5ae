//! Router assembly
//!
//! - `api` - dashboard routes behind `auth_middleware`, CORS from configuration
//! - `public` - widget, playback, audio and email-link routes, CORS `*` for GET

pub mod api;
pub mod public;

use axum::{Router, middleware};
use http::{
    HeaderValue, Method,
    header::{AUTHORIZATION, CONTENT_TYPE},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::info;

use crate::config::ServerConfig;
use crate::middleware::auth_middleware;
use crate::state::AppState;

const DASHBOARD_METHODS: [Method; 5] = [
    Method::GET,
    Method::POST,
    Method::PATCH,
    Method::DELETE,
    Method::OPTIONS,
];

/// CORS for dashboard routes, built from `cors_allowed_origins`
pub fn dashboard_cors(config: &ServerConfig) -> CorsLayer {
    match config.cors_allowed_origins.as_deref() {
        Some("*") => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(DASHBOARD_METHODS)
            .allow_headers([AUTHORIZATION, CONTENT_TYPE])
            .allow_credentials(false),
        Some(origins) => {
            // Parse comma-separated origins
            let origins: Vec<HeaderValue> = origins
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods(DASHBOARD_METHODS)
                .allow_headers([AUTHORIZATION, CONTENT_TYPE])
                .allow_credentials(true)
        }
        None => {
            info!(
                "CORS not configured, dashboard routes are same-origin only. \
                 Set CORS_ALLOWED_ORIGINS to enable cross-origin access."
            );
            CorsLayer::new()
                .allow_methods(DASHBOARD_METHODS)
                .allow_headers([AUTHORIZATION, CONTENT_TYPE])
                .allow_credentials(false)
        }
    }
}

/// CORS for routes loaded by the widget on any site
pub fn public_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
}

/// Build the full application router
///
/// Rate limiting and TLS are added by the binary; everything else lives here so tests
/// exercise the same stack.
pub fn build_router(state: Arc<AppState>) -> Router {
    // Layer order (outer to inner): cors -> auth -> handler, so preflights skip auth
    let protected_routes = api::create_api_router()
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .layer(dashboard_cors(&state.config));

    let public_routes = public::create_public_router().layer(public_cors());

    let security_headers = tower::ServiceBuilder::new()
        .layer(SetResponseHeaderLayer::overriding(
            http::header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            http::header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ));

    public_routes
        .merge(protected_routes)
        .with_state(state)
        .layer(security_headers)
}
