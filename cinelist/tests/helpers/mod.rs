//! Shared test doubles: scripted provider, recording chat surface, in-memory catalog

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use cinelist::db::{CatalogStore, SqliteCatalogStore};
use cinelist::error::{ProviderError, StoreError};
use cinelist::models::{
    CatalogRecord, ChoicePrompt, ExistingRecord, MovieDetails, MovieStatus, NewCatalogRecord,
    RawCandidate,
};
use cinelist::services::{CandidateProvider, ChatSurface, ResolutionService};
use cinelist_common::config::CatalogConfig;
use cinelist_common::time::{Clock, TokioClock};
use tokio::sync::Barrier;

// ============================================================================
// Provider
// ============================================================================

/// Provider returning canned rows
///
/// Search results are keyed by lowercase title; a missing key yields no rows.
#[derive(Default)]
pub struct StubProvider {
    searches: Mutex<HashMap<String, Vec<RawCandidate>>>,
    collections: Mutex<HashMap<i64, Vec<RawCandidate>>>,
    details: Mutex<HashMap<i64, MovieDetails>>,
    search_error: Mutex<Option<ProviderError>>,
    details_error: Mutex<Option<ProviderError>>,
    details_gate: Mutex<Option<Arc<Barrier>>>,
    pub search_calls: AtomicUsize,
    pub details_calls: AtomicUsize,
}

impl StubProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_search(self, title: &str, rows: Vec<RawCandidate>) -> Self {
        self.searches
            .lock()
            .unwrap()
            .insert(title.to_lowercase(), rows);
        self
    }

    pub fn with_collection(self, collection_id: i64, rows: Vec<RawCandidate>) -> Self {
        self.collections.lock().unwrap().insert(collection_id, rows);
        self
    }

    /// Register details for every row, skipping rows without a year
    pub fn with_details_for(self, rows: &[RawCandidate]) -> Self {
        {
            let mut details = self.details.lock().unwrap();
            for row in rows {
                if let Some(year) = row.release_year {
                    details.insert(
                        row.external_id,
                        MovieDetails {
                            external_id: row.external_id,
                            title: row.title.clone(),
                            year,
                            genres: Some("Drama".to_string()),
                            genres_locale: Some("en".to_string()),
                        },
                    );
                }
            }
        }
        self
    }

    pub fn with_search_error(self, error: ProviderError) -> Self {
        *self.search_error.lock().unwrap() = Some(error);
        self
    }

    pub fn with_details_error(self, error: ProviderError) -> Self {
        *self.details_error.lock().unwrap() = Some(error);
        self
    }

    /// Hold every `details` call until `parties` callers are waiting
    pub fn with_details_gate(self, parties: usize) -> Self {
        *self.details_gate.lock().unwrap() = Some(Arc::new(Barrier::new(parties)));
        self
    }
}

#[async_trait]
impl CandidateProvider for StubProvider {
    async fn search(
        &self,
        title: &str,
        _year: Option<i32>,
    ) -> Result<Vec<RawCandidate>, ProviderError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.search_error.lock().unwrap().clone() {
            return Err(error);
        }
        Ok(self
            .searches
            .lock()
            .unwrap()
            .get(&title.to_lowercase())
            .cloned()
            .unwrap_or_default())
    }

    async fn collection_members(
        &self,
        collection_id: i64,
    ) -> Result<Vec<RawCandidate>, ProviderError> {
        self.collections
            .lock()
            .unwrap()
            .get(&collection_id)
            .cloned()
            .ok_or_else(|| ProviderError::Generic(format!("no collection {}", collection_id)))
    }

    async fn details(&self, external_id: i64) -> Result<Option<MovieDetails>, ProviderError> {
        self.details_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.details_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.wait().await;
        }
        if let Some(error) = self.details_error.lock().unwrap().clone() {
            return Err(error);
        }
        Ok(self.details.lock().unwrap().get(&external_id).cloned())
    }
}

/// Search row builder
pub fn raw(id: i64, title: &str, year: Option<i32>, popularity: f64) -> RawCandidate {
    RawCandidate {
        external_id: id,
        title: title.to_string(),
        original_title: title.to_string(),
        release_year: year,
        popularity,
        media_type: "movie".to_string(),
        collection_id: None,
        locale: Some("en".to_string()),
    }
}

/// Search row that belongs to a collection
pub fn raw_in_collection(
    id: i64,
    title: &str,
    year: Option<i32>,
    popularity: f64,
    collection_id: i64,
) -> RawCandidate {
    RawCandidate {
        collection_id: Some(collection_id),
        ..raw(id, title, year, popularity)
    }
}

// ============================================================================
// Chat surface
// ============================================================================

/// One call made on the surface
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceCall {
    Presented {
        chat_id: i64,
        message_id: i64,
        prompt: ChoicePrompt,
    },
    Retracted {
        chat_id: i64,
        message_id: i64,
        text: String,
    },
    Notice {
        chat_id: i64,
        text: String,
    },
}

/// Surface that records every call
pub struct RecordingSurface {
    calls: Mutex<Vec<SurfaceCall>>,
    next_message_id: AtomicI64,
    pub fail_present: AtomicBool,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            next_message_id: AtomicI64::new(100),
            fail_present: AtomicBool::new(false),
        }
    }

    pub fn calls(&self) -> Vec<SurfaceCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn retractions(&self) -> Vec<(i64, String)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                SurfaceCall::Retracted { message_id, text, .. } => Some((message_id, text)),
                _ => None,
            })
            .collect()
    }

    pub fn notices(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                SurfaceCall::Notice { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl ChatSurface for RecordingSurface {
    async fn present_choice(
        &self,
        chat_id: i64,
        prompt: &ChoicePrompt,
    ) -> cinelist_common::Result<i64> {
        if self.fail_present.load(Ordering::SeqCst) {
            return Err(cinelist_common::Error::Internal("chat unreachable".to_string()));
        }
        let message_id = self.next_message_id.fetch_add(1, Ordering::SeqCst);
        self.calls.lock().unwrap().push(SurfaceCall::Presented {
            chat_id,
            message_id,
            prompt: prompt.clone(),
        });
        Ok(message_id)
    }

    async fn retract_choice(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
    ) -> cinelist_common::Result<()> {
        self.calls.lock().unwrap().push(SurfaceCall::Retracted {
            chat_id,
            message_id,
            text: text.to_string(),
        });
        Ok(())
    }

    async fn notify(&self, chat_id: i64, text: &str) -> cinelist_common::Result<()> {
        self.calls.lock().unwrap().push(SurfaceCall::Notice {
            chat_id,
            text: text.to_string(),
        });
        Ok(())
    }
}

// ============================================================================
// Catalog
// ============================================================================

/// Fresh in-memory catalog
pub async fn memory_store() -> Arc<SqliteCatalogStore> {
    let pool = cinelist_common::db::init_memory_database()
        .await
        .expect("in-memory database");
    Arc::new(SqliteCatalogStore::new(pool))
}

/// Store whose first external-id lookup misses, as if a concurrent commit
/// landed right after the pre-check
pub struct LatePrecheckStore {
    pub inner: Arc<SqliteCatalogStore>,
    lookups: AtomicUsize,
}

impl LatePrecheckStore {
    pub fn new(inner: Arc<SqliteCatalogStore>) -> Self {
        Self {
            inner,
            lookups: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl CatalogStore for LatePrecheckStore {
    async fn exists_by_external_id(&self, external_id: i64) -> Result<bool, StoreError> {
        self.inner.exists_by_external_id(external_id).await
    }

    async fn find_by_external_id(
        &self,
        external_id: i64,
    ) -> Result<Option<ExistingRecord>, StoreError> {
        if self.lookups.fetch_add(1, Ordering::SeqCst) == 0 {
            return Ok(None);
        }
        self.inner.find_by_external_id(external_id).await
    }

    async fn insert(&self, record: NewCatalogRecord) -> Result<CatalogRecord, StoreError> {
        self.inner.insert(record).await
    }

    async fn list_recent(&self, limit: u32) -> Result<Vec<CatalogRecord>, StoreError> {
        self.inner.list_recent(limit).await
    }

    async fn find_by_id_prefix(
        &self,
        prefix: &str,
        limit: u32,
    ) -> Result<Vec<CatalogRecord>, StoreError> {
        self.inner.find_by_id_prefix(prefix, limit).await
    }

    async fn set_status(&self, id: &str, status: MovieStatus) -> Result<bool, StoreError> {
        self.inner.set_status(id, status).await
    }
}

/// Insert a record directly
pub async fn seed(store: &SqliteCatalogStore, id: &str, external_id: i64, title: &str, year: i32) {
    store
        .insert(NewCatalogRecord {
            id: id.to_string(),
            external_id,
            title: title.to_string(),
            year,
            genres: None,
        })
        .await
        .expect("seed insert");
}

// ============================================================================
// Service
// ============================================================================

/// Config used by service tests: English only, two-minute choices
pub fn test_config() -> CatalogConfig {
    CatalogConfig {
        search_locales: vec!["en".to_string()],
        ..Default::default()
    }
}

pub const CHOICE_TTL: Duration = Duration::from_secs(120);

/// Everything a resolution test needs to observe
pub struct Harness {
    pub service: ResolutionService,
    pub provider: Arc<StubProvider>,
    pub store: Arc<SqliteCatalogStore>,
    pub surface: Arc<RecordingSurface>,
}

impl Harness {
    pub async fn new(provider: StubProvider) -> Self {
        Self::with_clock(provider, Arc::new(TokioClock)).await
    }

    pub async fn with_clock(provider: StubProvider, clock: Arc<dyn Clock>) -> Self {
        Self::with_config(provider, clock, test_config()).await
    }

    pub async fn with_config(
        provider: StubProvider,
        clock: Arc<dyn Clock>,
        config: CatalogConfig,
    ) -> Self {
        let provider = Arc::new(provider);
        let store = memory_store().await;
        let surface = Arc::new(RecordingSurface::new());
        let service = ResolutionService::new(
            &config,
            provider.clone(),
            store.clone(),
            surface.clone(),
            clock,
        );
        Self {
            service,
            provider,
            store,
            surface,
        }
    }

    pub async fn catalog(&self) -> Vec<CatalogRecord> {
        self.store.list_recent(100).await.expect("list catalog")
    }
}
