//! Catalog records

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Watch status of a catalog record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovieStatus {
    ToWatch,
    Watched,
    Deleted,
}

impl MovieStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovieStatus::ToWatch => "to_watch",
            MovieStatus::Watched => "watched",
            MovieStatus::Deleted => "deleted",
        }
    }

    /// List icon
    pub fn icon(&self) -> &'static str {
        match self {
            MovieStatus::ToWatch => "🎥",
            MovieStatus::Watched => "✅",
            MovieStatus::Deleted => "🗑️",
        }
    }
}

impl fmt::Display for MovieStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MovieStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "to_watch" => Ok(MovieStatus::ToWatch),
            "watched" => Ok(MovieStatus::Watched),
            "deleted" => Ok(MovieStatus::Deleted),
            other => Err(format!("unknown movie status: {}", other)),
        }
    }
}

/// A persisted catalog record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogRecord {
    /// Store-generated short id
    pub id: String,
    pub external_id: Option<i64>,
    pub title: String,
    pub year: i32,
    pub genres: Option<String>,
    pub status: MovieStatus,
    pub created_at: String,
}

/// Fields for a new catalog row
#[derive(Debug, Clone, PartialEq)]
pub struct NewCatalogRecord {
    pub id: String,
    pub external_id: i64,
    pub title: String,
    pub year: i32,
    pub genres: Option<String>,
}

/// Display fields of a record that already holds an external id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExistingRecord {
    /// Internal id; empty when the conflicting row could not be read back
    pub id: String,
    pub title: String,
    pub year: i32,
}

/// A successful commit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Registration {
    pub record: CatalogRecord,
    /// Locale that supplied the genre list
    pub genres_locale: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [MovieStatus::ToWatch, MovieStatus::Watched, MovieStatus::Deleted] {
            assert_eq!(status.as_str().parse::<MovieStatus>().unwrap(), status);
        }
        assert!("archived".parse::<MovieStatus>().is_err());
    }
}
