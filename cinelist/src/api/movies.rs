//! Catalog handlers
//!
//! GET /movies, POST /movies/:id/done, DELETE /movies/:id
//!
//! `:id` is an internal id or a prefix of at least four characters; a
//! leading `#` is accepted.

use axum::{
    extract::{Path, Query, State},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::{
    db::{self, catalog::DEFAULT_LIST_LIMIT},
    error::{ApiError, ApiResult},
    models::{CatalogRecord, MovieStatus, StatusChange},
    services::messages,
    AppState,
};

/// Largest page served by GET /movies
const MAX_LIST_LIMIT: u32 = 200;

/// GET /movies query parameters
#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub limit: Option<u32>,
    pub language_code: Option<String>,
}

/// Query parameters of the status endpoints
#[derive(Debug, Deserialize)]
pub struct LanguageParams {
    pub language_code: Option<String>,
}

/// GET /movies response
#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub movies: Vec<CatalogRecord>,
    pub text: String,
}

/// Status endpoints response
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    #[serde(flatten)]
    pub change: StatusChange,
    pub text: String,
}

/// GET /movies
pub async fn list_movies(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<ListResponse>> {
    let limit = params.limit.unwrap_or(DEFAULT_LIST_LIMIT);
    if limit == 0 || limit > MAX_LIST_LIMIT {
        return Err(ApiError::BadRequest(format!(
            "limit must be between 1 and {}",
            MAX_LIST_LIMIT
        )));
    }

    let movies = state.store.list_recent(limit).await?;
    let lang = state.service.language_for(params.language_code.as_deref());
    let text = messages::list_text(&lang, &movies);

    Ok(Json(ListResponse { movies, text }))
}

/// POST /movies/:id/done
pub async fn mark_watched(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<LanguageParams>,
) -> ApiResult<Json<StatusResponse>> {
    apply_status(&state, &id, MovieStatus::Watched, params.language_code.as_deref()).await
}

/// DELETE /movies/:id
pub async fn mark_deleted(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<LanguageParams>,
) -> ApiResult<Json<StatusResponse>> {
    apply_status(&state, &id, MovieStatus::Deleted, params.language_code.as_deref()).await
}

async fn apply_status(
    state: &AppState,
    raw_id: &str,
    target: MovieStatus,
    language_code: Option<&str>,
) -> ApiResult<Json<StatusResponse>> {
    let change = db::change_status(state.store.as_ref(), raw_id, target).await?;
    let lang = state.service.language_for(language_code);
    let text = messages::status_change_text(&lang, &change, target == MovieStatus::Deleted);

    match change {
        StatusChange::NotFound => Err(ApiError::NotFound(text)),
        StatusChange::Ambiguous { .. } => Err(ApiError::Conflict(text)),
        StatusChange::PrefixTooShort => Err(ApiError::BadRequest(text)),
        change => Ok(Json(StatusResponse { change, text })),
    }
}

/// Build catalog routes
pub fn movie_routes() -> Router<AppState> {
    Router::new()
        .route("/movies", get(list_movies))
        .route("/movies/:id/done", post(mark_watched))
        .route("/movies/:id", delete(mark_deleted))
}
