//! Common error types for cinelist

use std::path::PathBuf;
use thiserror::Error;

/// Common result type for cinelist operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors shared by the common library and the catalog service
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file could not be parsed
    #[error("Failed to parse config file {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Configuration value missing or out of range
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested catalog record not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True for SQLite lock contention or an exhausted connection pool,
    /// both of which callers may retry
    pub fn is_database_busy(&self) -> bool {
        match self {
            Error::Database(sqlx::Error::PoolTimedOut) => true,
            Error::Database(sqlx::Error::Database(db_err)) => {
                let message = db_err.message();
                message.contains("database is locked") || message.contains("database is busy")
            }
            _ => false,
        }
    }
}
