//! Registration committer
//!
//! **Algorithm:**
//! 1. Fetch details; no valid release date → [`CommitError::NoReleaseDate`]
//! 2. Pre-check the catalog for the external id → [`CommitError::Duplicate`]
//! 3. Insert under a fresh internal id:
//!    - external-id conflict (a concurrent commit won) → `Duplicate`, with the
//!      winner's display fields when they can be read back
//!    - internal-id collision → retry with a new id, up to
//!      [`MAX_INSERT_ATTEMPTS`] attempts, then a storage error

use std::sync::Arc;

use cinelist_common::ids::generate_internal_id;
use tracing::{info, warn};

use super::provider::CandidateProvider;
use crate::db::CatalogStore;
use crate::error::{CommitError, StoreError};
use crate::models::{ExistingRecord, MovieDetails, NewCatalogRecord, Registration};

/// Insert attempts before an internal-id collision becomes fatal
pub const MAX_INSERT_ATTEMPTS: usize = 5;

/// Source of internal ids
pub type IdGenerator = Arc<dyn Fn() -> String + Send + Sync>;

#[derive(Clone)]
pub struct RegistrationCommitter {
    provider: Arc<dyn CandidateProvider>,
    store: Arc<dyn CatalogStore>,
    generate_id: IdGenerator,
}

impl RegistrationCommitter {
    pub fn new(provider: Arc<dyn CandidateProvider>, store: Arc<dyn CatalogStore>) -> Self {
        Self::with_id_generator(provider, store, Arc::new(generate_internal_id))
    }

    pub fn with_id_generator(
        provider: Arc<dyn CandidateProvider>,
        store: Arc<dyn CatalogStore>,
        generate_id: IdGenerator,
    ) -> Self {
        Self {
            provider,
            store,
            generate_id,
        }
    }

    /// Register the candidate with `external_id`
    pub async fn commit(&self, external_id: i64) -> Result<Registration, CommitError> {
        let details = self
            .provider
            .details(external_id)
            .await?
            .ok_or(CommitError::NoReleaseDate)?;

        if let Some(existing) = self
            .store
            .find_by_external_id(external_id)
            .await
            .map_err(CommitError::Storage)?
        {
            warn!(tmdb_id = external_id, id = %existing.id, "Duplicate caught by pre-check");
            return Err(CommitError::Duplicate(existing));
        }

        let mut last_id = String::new();
        for attempt in 1..=MAX_INSERT_ATTEMPTS {
            last_id = (self.generate_id)();
            let record = NewCatalogRecord {
                id: last_id.clone(),
                external_id,
                title: details.title.clone(),
                year: details.year,
                genres: details.genres.clone(),
            };

            match self.store.insert(record).await {
                Ok(record) => {
                    info!(
                        tmdb_id = external_id,
                        id = %record.id,
                        year = record.year,
                        "Movie registered"
                    );
                    return Ok(Registration {
                        record,
                        genres_locale: details.genres_locale.clone(),
                    });
                }
                Err(StoreError::DuplicateExternalId(_)) => {
                    warn!(tmdb_id = external_id, "Duplicate caught by unique constraint");
                    return Err(CommitError::Duplicate(self.existing_or_details(&details).await));
                }
                Err(StoreError::InternalIdCollision(id)) => {
                    warn!(id = %id, attempt, "Internal id collision, regenerating");
                }
                Err(err) => return Err(CommitError::Storage(err)),
            }
        }

        Err(CommitError::Storage(StoreError::InternalIdCollision(last_id)))
    }

    /// Winner of an insert race; falls back to the fetched details if it
    /// cannot be read back
    async fn existing_or_details(&self, details: &MovieDetails) -> ExistingRecord {
        match self.store.find_by_external_id(details.external_id).await {
            Ok(Some(existing)) => existing,
            Ok(None) => ExistingRecord {
                id: String::new(),
                title: details.title.clone(),
                year: details.year,
            },
            Err(err) => {
                warn!(tmdb_id = details.external_id, error = %err, "Duplicate lookup failed");
                ExistingRecord {
                    id: String::new(),
                    title: details.title.clone(),
                    year: details.year,
                }
            }
        }
    }
}
