//! Catalog store
//!
//! [`CatalogStore`] is the seam the committer and HTTP layer use;
//! [`SqliteCatalogStore`] implements it over the `movies` table.

use async_trait::async_trait;
use cinelist_common::db::retry_on_lock;
use cinelist_common::ids::{normalize_id_prefix, to_short_id};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::time::Duration;

use crate::error::StoreError;
use crate::models::{CatalogRecord, ExistingRecord, MovieStatus, NewCatalogRecord, StatusChange};

/// Page size for [`CatalogStore::list_recent`] when the caller gives none
pub const DEFAULT_LIST_LIMIT: u32 = 30;
/// Shortest id prefix accepted for status changes
pub const MIN_ID_PREFIX_LEN: usize = 4;
/// Matches returned by a prefix lookup
pub const PREFIX_MATCH_LIMIT: u32 = 5;

/// Longest time a write waits on a locked database
const MAX_LOCK_WAIT: Duration = Duration::from_secs(5);

const RECORD_COLUMNS: &str = "id, tmdb_id, title, year, genres, status, created_at";

/// Persistent catalog
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn exists_by_external_id(&self, external_id: i64) -> Result<bool, StoreError>;

    /// Display fields of the record holding `external_id`, in any status
    async fn find_by_external_id(
        &self,
        external_id: i64,
    ) -> Result<Option<ExistingRecord>, StoreError>;

    /// Insert a record under the caller-generated id
    ///
    /// Reports [`StoreError::DuplicateExternalId`] and
    /// [`StoreError::InternalIdCollision`] separately.
    async fn insert(&self, record: NewCatalogRecord) -> Result<CatalogRecord, StoreError>;

    /// Newest records first, deleted ones excluded
    async fn list_recent(&self, limit: u32) -> Result<Vec<CatalogRecord>, StoreError>;

    /// Non-deleted records whose id starts with `prefix` (case-insensitive)
    async fn find_by_id_prefix(
        &self,
        prefix: &str,
        limit: u32,
    ) -> Result<Vec<CatalogRecord>, StoreError>;

    /// Set the status of one record; false if no row has `id`
    async fn set_status(&self, id: &str, status: MovieStatus) -> Result<bool, StoreError>;
}

/// SQLite-backed catalog
#[derive(Debug, Clone)]
pub struct SqliteCatalogStore {
    pool: SqlitePool,
}

impl SqliteCatalogStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl CatalogStore for SqliteCatalogStore {
    async fn exists_by_external_id(&self, external_id: i64) -> Result<bool, StoreError> {
        let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM movies WHERE tmdb_id = ? LIMIT 1")
            .bind(external_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found.is_some())
    }

    async fn find_by_external_id(
        &self,
        external_id: i64,
    ) -> Result<Option<ExistingRecord>, StoreError> {
        let row = sqlx::query("SELECT id, title, year FROM movies WHERE tmdb_id = ? LIMIT 1")
            .bind(external_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| -> Result<ExistingRecord, StoreError> {
            Ok(ExistingRecord {
                id: row.try_get("id")?,
                title: row.try_get("title")?,
                year: row.try_get("year")?,
            })
        })
        .transpose()
    }

    async fn insert(&self, record: NewCatalogRecord) -> Result<CatalogRecord, StoreError> {
        let sql = format!(
            "INSERT INTO movies (id, title, year, genres, status, tmdb_id, source) \
             VALUES (?, ?, ?, ?, 'to_watch', ?, 'tmdb') RETURNING {}",
            RECORD_COLUMNS
        );

        let result = retry_on_lock("insert_movie", MAX_LOCK_WAIT, || async {
            sqlx::query(&sql)
                .bind(&record.id)
                .bind(&record.title)
                .bind(record.year)
                .bind(&record.genres)
                .bind(record.external_id)
                .fetch_one(&self.pool)
                .await
                .map_err(cinelist_common::Error::Database)
        })
        .await;

        match result {
            Ok(row) => record_from_row(&row),
            Err(err) => Err(classify_insert_error(err, &record)),
        }
    }

    async fn list_recent(&self, limit: u32) -> Result<Vec<CatalogRecord>, StoreError> {
        let sql = format!(
            "SELECT {} FROM movies WHERE status != 'deleted' \
             ORDER BY created_at DESC, rowid DESC LIMIT ?",
            RECORD_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(record_from_row).collect()
    }

    async fn find_by_id_prefix(
        &self,
        prefix: &str,
        limit: u32,
    ) -> Result<Vec<CatalogRecord>, StoreError> {
        let sql = format!(
            "SELECT {} FROM movies \
             WHERE substr(lower(id), 1, length(?1)) = ?1 AND status != 'deleted' \
             ORDER BY created_at DESC, rowid DESC LIMIT ?2",
            RECORD_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(prefix.to_lowercase())
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(record_from_row).collect()
    }

    async fn set_status(&self, id: &str, status: MovieStatus) -> Result<bool, StoreError> {
        let result = retry_on_lock("set_movie_status", MAX_LOCK_WAIT, || async {
            sqlx::query("UPDATE movies SET status = ? WHERE id = ?")
                .bind(status.as_str())
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(cinelist_common::Error::Database)
        })
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// Resolve `raw_prefix` to one record and move it to `target`
///
/// Deleted records are invisible to the lookup, so they report `NotFound`.
pub async fn change_status(
    store: &dyn CatalogStore,
    raw_prefix: &str,
    target: MovieStatus,
) -> Result<StatusChange, StoreError> {
    let prefix = normalize_id_prefix(raw_prefix);
    if prefix.chars().count() < MIN_ID_PREFIX_LEN {
        return Ok(StatusChange::PrefixTooShort);
    }

    let mut matches = store.find_by_id_prefix(&prefix, PREFIX_MATCH_LIMIT).await?;
    if matches.len() > 1 {
        return Ok(StatusChange::Ambiguous {
            short_ids: matches.iter().map(|r| to_short_id(&r.id)).collect(),
        });
    }
    let Some(mut record) = matches.pop() else {
        return Ok(StatusChange::NotFound);
    };

    if record.status == target {
        return Ok(StatusChange::AlreadyInState { record });
    }
    if !store.set_status(&record.id, target).await? {
        return Ok(StatusChange::NotFound);
    }

    tracing::info!(id = %record.id, from = %record.status, to = %target, "Movie status changed");
    record.status = target;
    Ok(StatusChange::Updated { record })
}

fn record_from_row(row: &SqliteRow) -> Result<CatalogRecord, StoreError> {
    let status: String = row.try_get("status")?;
    let status = status
        .parse::<MovieStatus>()
        .map_err(|e: String| StoreError::Database(cinelist_common::Error::Internal(e)))?;

    Ok(CatalogRecord {
        id: row.try_get("id")?,
        external_id: row.try_get("tmdb_id")?,
        title: row.try_get("title")?,
        year: row.try_get("year")?,
        genres: row.try_get("genres")?,
        status,
        created_at: row.try_get("created_at")?,
    })
}

/// Tell external-id conflicts from internal-id collisions by the constraint that fired
fn classify_insert_error(err: cinelist_common::Error, record: &NewCatalogRecord) -> StoreError {
    if let cinelist_common::Error::Database(sqlx::Error::Database(db_err)) = &err {
        if db_err.is_unique_violation() {
            let message = db_err.message();
            if message.contains("movies.tmdb_id") {
                return StoreError::DuplicateExternalId(record.external_id);
            }
            if message.contains("movies.id") {
                return StoreError::InternalIdCollision(record.id.clone());
            }
            tracing::error!(constraint = %message, "Unknown unique constraint violated");
        }
    }
    StoreError::Database(err)
}
