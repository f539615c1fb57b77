//! Candidate provider interface
//!
//! The resolution pipeline only sees this trait; [`super::tmdb_client::TmdbClient`]
//! is the production implementation.

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::models::{MovieDetails, RawCandidate};

/// Metadata source for movie candidates
#[async_trait]
pub trait CandidateProvider: Send + Sync {
    /// Candidates for `title`, trying each configured locale in order
    ///
    /// With a year, the year-filtered search runs first and the unfiltered one
    /// only if it comes back empty. Stops at the first locale with results.
    async fn search(
        &self,
        title: &str,
        year: Option<i32>,
    ) -> Result<Vec<RawCandidate>, ProviderError>;

    /// Sibling entries of a collection
    async fn collection_members(
        &self,
        collection_id: i64,
    ) -> Result<Vec<RawCandidate>, ProviderError>;

    /// Full record for one external id; `None` without a valid release date
    async fn details(&self, external_id: i64) -> Result<Option<MovieDetails>, ProviderError>;
}
