//! cinelist library interface
//!
//! Exposes the resolution engine, the catalog store, and the HTTP router for
//! the binary and for integration tests.

pub mod api;
pub mod db;
pub mod error;
pub mod models;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use std::sync::Arc;

use axum::Router;
use chrono::{DateTime, Utc};
use cinelist_common::events::EventBus;

use crate::db::CatalogStore;
use crate::services::ResolutionService;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// `/add` pipeline and open choices
    pub service: ResolutionService,
    /// Catalog persistence
    pub store: Arc<dyn CatalogStore>,
    /// Outgoing chat messages, streamed over SSE
    pub event_bus: EventBus,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(service: ResolutionService, store: Arc<dyn CatalogStore>, event_bus: EventBus) -> Self {
        Self {
            service,
            store,
            event_bus,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    Router::new()
        .merge(api::command_routes())
        .merge(api::movie_routes())
        .route("/events", get(api::chat_event_stream))
        .merge(api::health_routes())
        .with_state(state)
}
