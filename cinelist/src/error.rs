//! Error types for cinelist
//!
//! Component errors (`QueryError`, `ProviderError`, `StoreError`,
//! `CommitError`) stay typed up to the resolution service, which turns them
//! into outcomes. `ApiError` is the HTTP layer's error.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use crate::models::ExistingRecord;

// ============================================================================
// Component errors
// ============================================================================

/// `/add` argument parse failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryError {
    /// No usable title after stripping the year and part hint
    #[error("empty query")]
    EmptyQuery,
    /// Trailing year out of range, malformed, or missing when required
    #[error("invalid year")]
    InvalidYear,
}

/// Distinguishable provider failure class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderErrorKind {
    AuthFailure,
    RateLimited,
    Unavailable,
    Generic,
}

/// Metadata provider failure
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    /// Credentials rejected (HTTP 401)
    #[error("provider rejected credentials")]
    AuthFailure,
    /// Provider rate limit hit (HTTP 429)
    #[error("provider rate limit exceeded")]
    RateLimited,
    /// Server errors or network failures persisted through every retry
    #[error("provider unavailable: {0}")]
    Unavailable(String),
    /// Anything else
    #[error("provider error: {0}")]
    Generic(String),
}

impl ProviderError {
    pub fn kind(&self) -> ProviderErrorKind {
        match self {
            ProviderError::AuthFailure => ProviderErrorKind::AuthFailure,
            ProviderError::RateLimited => ProviderErrorKind::RateLimited,
            ProviderError::Unavailable(_) => ProviderErrorKind::Unavailable,
            ProviderError::Generic(_) => ProviderErrorKind::Generic,
        }
    }

    /// Whether the user is told to retry later instead of getting a technical error
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ProviderError::RateLimited | ProviderError::Unavailable(_)
        )
    }
}

/// Catalog store failure
#[derive(Debug, Error)]
pub enum StoreError {
    /// Unique constraint on the external id fired
    #[error("external id {0} already cataloged")]
    DuplicateExternalId(i64),
    /// Unique constraint on the internal id fired
    #[error("internal id {0} already taken")]
    InternalIdCollision(String),
    #[error("database error: {0}")]
    Database(#[from] cinelist_common::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Database(cinelist_common::Error::Database(err))
    }
}

/// Registration failure
#[derive(Debug, Error)]
pub enum CommitError {
    /// Provider has no valid release date for the candidate
    #[error("no release date")]
    NoReleaseDate,
    /// Catalog already holds this external id
    #[error("already cataloged as {} ({})", .0.title, .0.year)]
    Duplicate(ExistingRecord),
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Storage(StoreError),
}

// ============================================================================
// HTTP errors
// ============================================================================

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Conflict (409), e.g. ambiguous id prefix
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// Catalog store error
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
            ApiError::Store(ref err) => {
                let correlation_id = cinelist_common::ids::correlation_id();
                tracing::error!(correlation_id = %correlation_id, error = %err, "Catalog store failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORE_ERROR",
                    format!("technical error, reference {}", correlation_id),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
