use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use crate::error::SearchError;
use crate::models::{SearchQuery, SearchResponse};
use crate::state::AppState;

/// POST /search - Enhance, retrieve, format and summarize.
pub async fn search(
    State(state): State<AppState>,
    Json(req): Json<SearchQuery>,
) -> Result<Json<SearchResponse>, (StatusCode, String)> {
    match state.service.search(&req).await {
        Ok(resp) => Ok(Json(resp)),
        Err(SearchError::InvalidQuery(msg)) => Err((StatusCode::BAD_REQUEST, msg)),
        Err(e @ SearchError::Retrieval(_)) => {
            tracing::error!("Search for \"{}\" failed: {e}", req.query);
            Err((StatusCode::BAD_GATEWAY, e.to_string()))
        }
    }
}

/// GET /health
pub async fn health() -> &'static str {
    "ok"
}
