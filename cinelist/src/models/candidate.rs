//! Candidate records returned by the metadata provider

use serde::{Deserialize, Serialize};

/// Media type accepted into the catalog
pub const MEDIA_TYPE_MOVIE: &str = "movie";

/// One row as returned by the provider, before scoring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawCandidate {
    /// Provider id (TMDb movie id)
    pub external_id: i64,
    /// Title in the locale that produced this row
    pub title: String,
    /// Title in the original language
    pub original_title: String,
    /// Release year; `None` when the provider has no usable release date
    pub release_year: Option<i32>,
    /// Provider popularity (non-negative)
    pub popularity: f64,
    /// Provider media type; anything other than "movie" is filtered out
    pub media_type: String,
    /// Parent collection (franchise) id
    pub collection_id: Option<i64>,
    /// Locale that produced this row
    pub locale: Option<String>,
}

impl RawCandidate {
    pub fn is_movie(&self) -> bool {
        self.media_type.eq_ignore_ascii_case(MEDIA_TYPE_MOVIE)
    }
}

/// A scored candidate
///
/// Built in one pass by the scorer with every derived field filled in;
/// nothing is patched onto it afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub external_id: i64,
    pub title: String,
    pub original_title: String,
    pub release_year: Option<i32>,
    pub popularity: f64,
    pub media_type: String,
    pub collection_id: Option<i64>,
    pub locale: Option<String>,
    /// Installment number parsed from the localized or original title
    pub part_number: Option<u32>,
    /// Normalized localized title
    pub norm_title: String,
    /// Normalized original title
    pub norm_original_title: String,
    pub score: f64,
}

impl Candidate {
    /// True if either normalized title equals either of `other`'s
    pub fn shares_title_with(&self, other: &Candidate) -> bool {
        let mine = [&self.norm_title, &self.norm_original_title];
        let theirs = [&other.norm_title, &other.norm_original_title];
        mine.iter()
            .any(|m| !m.is_empty() && theirs.iter().any(|t| t == m))
    }
}

/// Full record used when committing to the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieDetails {
    pub external_id: i64,
    pub title: String,
    pub year: i32,
    /// Comma-separated genre names
    pub genres: Option<String>,
    /// Locale that supplied `genres`
    pub genres_locale: Option<String>,
}
