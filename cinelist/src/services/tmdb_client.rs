//! TMDb candidate provider
//!
//! Talks to the TMDb v3 REST API with an `api_key` query parameter.
//!
//! # Failure mapping
//! - 401 → [`ProviderError::AuthFailure`], not retried
//! - 429 → [`ProviderError::RateLimited`], not retried
//! - 5xx and network errors → retried with exponential backoff (1 s, doubling)
//!   up to `max_attempts` total, then [`ProviderError::Unavailable`]
//! - any other non-success status or an undecodable body → [`ProviderError::Generic`]

use std::time::Duration;

use async_trait::async_trait;
use cinelist_common::config::{CatalogConfig, MAX_CHOICE_OPTIONS};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, error, warn};

use super::provider::CandidateProvider;
use crate::error::ProviderError;
use crate::models::{MovieDetails, RawCandidate, MEDIA_TYPE_MOVIE};

/// First retry delay; doubles per attempt
const INITIAL_BACKOFF: Duration = Duration::from_secs(1);

/// Characters of an error body kept for logs
const LOG_BODY_CHARS: usize = 100;

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<MovieSummary>,
}

#[derive(Debug, Deserialize)]
struct MovieSummary {
    id: i64,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    original_title: Option<String>,
    #[serde(default)]
    release_date: Option<String>,
    #[serde(default)]
    popularity: Option<f64>,
    #[serde(default)]
    media_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MovieResponse {
    id: i64,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    original_title: Option<String>,
    #[serde(default)]
    release_date: Option<String>,
    #[serde(default)]
    genres: Vec<Genre>,
    #[serde(default)]
    belongs_to_collection: Option<CollectionRef>,
}

#[derive(Debug, Deserialize)]
struct Genre {
    name: String,
}

#[derive(Debug, Deserialize)]
struct CollectionRef {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct CollectionResponse {
    #[serde(default)]
    parts: Vec<MovieSummary>,
}

/// Year from the first four characters of a `YYYY-MM-DD` date
pub fn parse_release_year(release_date: Option<&str>) -> Option<i32> {
    let date = release_date?.trim();
    let year = date.get(..4)?;
    if !year.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    year.parse().ok()
}

impl MovieSummary {
    fn into_raw(self, locale: &str, collection_id: Option<i64>) -> RawCandidate {
        let title = non_empty(self.title.clone()).or_else(|| non_empty(self.name.clone()));
        let original = non_empty(self.original_title.clone());
        RawCandidate {
            external_id: self.id,
            title: title.clone().or_else(|| original.clone()).unwrap_or_default(),
            original_title: original.or(title).unwrap_or_default(),
            release_year: parse_release_year(self.release_date.as_deref()),
            popularity: self.popularity.unwrap_or(0.0).max(0.0),
            media_type: self
                .media_type
                .unwrap_or_else(|| MEDIA_TYPE_MOVIE.to_string()),
            collection_id,
            locale: Some(locale.to_string()),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

// ============================================================================
// Client
// ============================================================================

/// TMDb REST client
#[derive(Debug, Clone)]
pub struct TmdbClient {
    http: Client,
    api_key: String,
    base_url: String,
    locales: Vec<String>,
    max_attempts: u32,
    search_result_limit: usize,
    initial_backoff: Duration,
}

impl TmdbClient {
    /// Build a client from the service configuration
    ///
    /// Fails when no API key is configured.
    pub fn from_config(config: &CatalogConfig) -> cinelist_common::Result<Self> {
        let api_key = config
            .tmdb
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                cinelist_common::Error::Config("TMDb API key missing (set TMDB_KEY)".to_string())
            })?;

        let http = Client::builder()
            .timeout(Duration::from_secs(config.tmdb.timeout_secs))
            .build()
            .map_err(|e| {
                cinelist_common::Error::Internal(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            http,
            api_key,
            base_url: config.tmdb.base_url.trim_end_matches('/').to_string(),
            locales: config.search_locales.clone(),
            max_attempts: config.tmdb.max_attempts.max(1),
            search_result_limit: config.tmdb.search_result_limit,
            initial_backoff: INITIAL_BACKOFF,
        })
    }

    /// Override the first retry delay
    pub fn with_initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = backoff;
        self
    }

    fn primary_locale(&self) -> &str {
        self.locales.first().map(String::as_str).unwrap_or("en")
    }

    /// Verify the API key against `/configuration`
    pub async fn check_credentials(&self) -> Result<(), ProviderError> {
        self.get_json::<serde_json::Value>("/configuration", &[]).await?;
        Ok(())
    }

    /// GET `path` and decode the JSON body, retrying transient failures
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, ProviderError> {
        let url = format!("{}{}", self.base_url, path);
        let mut delay = self.initial_backoff;

        for attempt in 1..=self.max_attempts {
            let last_attempt = attempt == self.max_attempts;
            let response = self
                .http
                .get(&url)
                .query(&[("api_key", self.api_key.as_str())])
                .query(params)
                .send()
                .await;

            let response = match response {
                Ok(response) => response,
                Err(e) => {
                    let e = e.without_url();
                    error!(path, attempt, error = %e, "TMDb network error");
                    if last_attempt {
                        return Err(ProviderError::Unavailable(format!("network error: {}", e)));
                    }
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                    continue;
                }
            };

            let status = response.status();
            if status.is_success() {
                debug!(path, status = status.as_u16(), "TMDb response");
                return response
                    .json::<T>()
                    .await
                    .map_err(|e| {
                        ProviderError::Generic(format!(
                            "undecodable TMDb response: {}",
                            e.without_url()
                        ))
                    });
            }

            let body: String = response
                .text()
                .await
                .unwrap_or_default()
                .chars()
                .take(LOG_BODY_CHARS)
                .collect::<String>()
                .replace('\n', " ");

            match status {
                StatusCode::UNAUTHORIZED => {
                    error!(path, body = %body, "TMDb rejected credentials");
                    return Err(ProviderError::AuthFailure);
                }
                StatusCode::TOO_MANY_REQUESTS => {
                    warn!(path, body = %body, "TMDb rate limit hit");
                    return Err(ProviderError::RateLimited);
                }
                s if s.is_server_error() => {
                    error!(path, attempt, status = s.as_u16(), body = %body, "TMDb server error");
                    if last_attempt {
                        return Err(ProviderError::Unavailable(format!("HTTP {}", s.as_u16())));
                    }
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
                s => {
                    return Err(ProviderError::Generic(format!("HTTP {}: {}", s.as_u16(), body)));
                }
            }
        }

        Err(ProviderError::Unavailable("retries exhausted".to_string()))
    }

    async fn search_page(
        &self,
        title: &str,
        year: Option<i32>,
        locale: &str,
    ) -> Result<Vec<MovieSummary>, ProviderError> {
        let mut params = vec![
            ("query", title.to_string()),
            ("language", locale.to_string()),
        ];
        if let Some(year) = year {
            params.push(("year", year.to_string()));
        }
        let page: SearchResponse = self.get_json("/search/movie", &params).await?;
        Ok(page.results)
    }

    /// Parent collection of one movie; failures read as "none"
    async fn collection_of(&self, external_id: i64) -> Option<i64> {
        let params = [("language", self.primary_locale().to_string())];
        match self
            .get_json::<MovieResponse>(&format!("/movie/{}", external_id), &params)
            .await
        {
            Ok(movie) => movie.belongs_to_collection.map(|c| c.id),
            Err(e) => {
                debug!(tmdb_id = external_id, error = %e, "Collection enrichment skipped");
                None
            }
        }
    }
}

#[async_trait]
impl CandidateProvider for TmdbClient {
    async fn search(
        &self,
        title: &str,
        year: Option<i32>,
    ) -> Result<Vec<RawCandidate>, ProviderError> {
        let mut found: Vec<MovieSummary> = Vec::new();
        let mut found_locale = self.primary_locale().to_string();

        for locale in &self.locales {
            if year.is_some() {
                found = self.search_page(title, year, locale).await?;
            }
            if found.is_empty() {
                found = self.search_page(title, None, locale).await?;
            }
            if !found.is_empty() {
                found_locale = locale.clone();
                break;
            }
        }

        found.truncate(self.search_result_limit);
        let mut candidates: Vec<RawCandidate> = found
            .into_iter()
            .map(|row| row.into_raw(&found_locale, None))
            .collect();

        for candidate in candidates.iter_mut().take(MAX_CHOICE_OPTIONS) {
            candidate.collection_id = self.collection_of(candidate.external_id).await;
        }

        debug!(title, ?year, locale = %found_locale, count = candidates.len(), "TMDb search complete");
        Ok(candidates)
    }

    async fn collection_members(
        &self,
        collection_id: i64,
    ) -> Result<Vec<RawCandidate>, ProviderError> {
        let locale = self.primary_locale().to_string();
        let collection: CollectionResponse = self
            .get_json(
                &format!("/collection/{}", collection_id),
                &[("language", locale.clone())],
            )
            .await?;

        Ok(collection
            .parts
            .into_iter()
            .map(|part| part.into_raw(&locale, Some(collection_id)))
            .collect())
    }

    async fn details(&self, external_id: i64) -> Result<Option<MovieDetails>, ProviderError> {
        let mut first: Option<MovieDetails> = None;

        for locale in &self.locales {
            let movie: MovieResponse = self
                .get_json(
                    &format!("/movie/{}", external_id),
                    &[("language", locale.clone())],
                )
                .await?;

            let Some(year) = parse_release_year(movie.release_date.as_deref()) else {
                return Ok(None);
            };
            let names: Vec<String> = movie
                .genres
                .into_iter()
                .map(|g| g.name)
                .filter(|n| !n.trim().is_empty())
                .collect();
            let genres = (!names.is_empty()).then(|| names.join(", "));

            match first.as_mut() {
                None => {
                    let title = non_empty(movie.title)
                        .or_else(|| non_empty(movie.original_title))
                        .unwrap_or_default();
                    let details = MovieDetails {
                        external_id: movie.id,
                        title,
                        year,
                        genres_locale: genres.as_ref().map(|_| locale.clone()),
                        genres,
                    };
                    if details.genres.is_some() {
                        return Ok(Some(details));
                    }
                    first = Some(details);
                }
                Some(details) => {
                    if genres.is_some() {
                        details.genres = genres;
                        details.genres_locale = Some(locale.clone());
                        break;
                    }
                }
            }
        }

        Ok(first)
    }
}
