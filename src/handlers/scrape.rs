use axum::{Json, extract::State};
use serde::Deserialize;
use std::sync::Arc;

use crate::core::scrape::PageCopy;
use crate::errors::AppResult;
use crate::handlers::extract::ApiJson;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ScrapeRequest {
    pub url: String,
}

/// Pull marketing copy from a public page
pub async fn scrape_page(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<ScrapeRequest>,
) -> AppResult<Json<PageCopy>> {
    Ok(Json(state.scraper.scrape(&request.url).await?))
}
