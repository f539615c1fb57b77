//! Database initialization
//!
//! Opens (or creates) the catalog database and brings the schema up to date.
//! Every statement is idempotent, so this runs on each startup.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;

    // WAL lets readers proceed while a commit is in flight
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;

    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    create_movies_table(&pool).await?;

    Ok(pool)
}

/// Open a single-connection in-memory database with the catalog schema
///
/// One connection only: every SQLite `:memory:` connection is its own database.
pub async fn init_memory_database() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    create_movies_table(&pool).await?;
    Ok(pool)
}

/// Create the catalog table
///
/// `id` is the store-generated short id shown to users; `tmdb_id` is the
/// provider's external id and carries its own uniqueness constraint, so the
/// two kinds of collision surface as different constraint failures.
pub async fn create_movies_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS movies (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            year INTEGER NOT NULL,
            genres TEXT,
            status TEXT NOT NULL DEFAULT 'to_watch'
                CHECK (status IN ('to_watch', 'watched', 'deleted')),
            tmdb_id INTEGER UNIQUE,
            source TEXT NOT NULL DEFAULT 'tmdb',
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_movies_created_at ON movies(created_at)")
        .execute(pool)
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_schema_creation_is_idempotent() {
        let pool = init_memory_database().await.unwrap();
        create_movies_table(&pool).await.unwrap();

        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'movies'",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_status_check_constraint() {
        let pool = init_memory_database().await.unwrap();

        let result = sqlx::query(
            "INSERT INTO movies (id, title, year, status, tmdb_id) VALUES ('abc123', 'X', 2000, 'lost', 1)",
        )
        .execute(&pool)
        .await;

        assert!(result.is_err(), "unknown status must be rejected");
    }
}
