//! Parsed `/add` query

use serde::{Deserialize, Serialize};

/// Result of parsing the raw command arguments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedQuery {
    /// Title text, at least two characters
    pub title: String,
    /// Trailing four-digit year
    pub year: Option<i32>,
    /// Installment hinted by a trailing `<keyword> <number>` pair
    pub part_hint: Option<u32>,
}
