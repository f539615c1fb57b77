//! `/add` argument parsing
//!
//! Input is `<title words> [<part keyword> <numeral>] [<year>]`. The year and
//! part hint are taken from the end; whatever remains is the title.

use cinelist_common::config::CatalogConfig;

use super::title_normalizer::{is_part_keyword, parse_part_token};
use crate::error::QueryError;
use crate::models::ParsedQuery;

/// Minimum title length in characters
const MIN_TITLE_CHARS: usize = 2;

/// Parser for `/add` arguments
///
/// With `require_year` unset a trailing year is optional; without one the
/// search runs unfiltered. With it set, a missing or malformed year is
/// [`QueryError::InvalidYear`].
#[derive(Debug, Clone, Copy)]
pub struct QueryParser {
    require_year: bool,
    year_min: i32,
    year_max: i32,
}

impl Default for QueryParser {
    fn default() -> Self {
        Self {
            require_year: false,
            year_min: 1888,
            year_max: 2100,
        }
    }
}

impl QueryParser {
    pub fn new(require_year: bool, year_min: i32, year_max: i32) -> Self {
        Self {
            require_year,
            year_min,
            year_max,
        }
    }

    pub fn from_config(config: &CatalogConfig) -> Self {
        Self::new(config.require_year, config.year_min, config.year_max)
    }

    /// Parse a raw argument string
    pub fn parse(&self, raw_args: &str) -> Result<ParsedQuery, QueryError> {
        let tokens: Vec<&str> = raw_args.split_whitespace().collect();
        self.parse_tokens(&tokens)
    }

    /// Parse pre-split arguments
    ///
    /// **Algorithm:**
    /// 1. Trailing 4-digit token → year (must lie in `[year_min, year_max]`)
    /// 2. Trailing `<keyword> <numeral>` pair → part hint
    /// 3. Remaining tokens joined by spaces → title (at least 2 characters)
    pub fn parse_tokens<S: AsRef<str>>(&self, tokens: &[S]) -> Result<ParsedQuery, QueryError> {
        let mut tokens: Vec<&str> = tokens
            .iter()
            .map(|t| t.as_ref().trim())
            .filter(|t| !t.is_empty())
            .collect();
        if tokens.is_empty() {
            return Err(QueryError::EmptyQuery);
        }

        let year = match tokens.last().copied().filter(|t| is_year_token(t)) {
            Some(token) => {
                let year: i32 = token.parse().map_err(|_| QueryError::InvalidYear)?;
                if year < self.year_min || year > self.year_max {
                    return Err(QueryError::InvalidYear);
                }
                tokens.pop();
                Some(year)
            }
            None if self.require_year => return Err(QueryError::InvalidYear),
            None => None,
        };

        let mut part_hint = None;
        if tokens.len() >= 2 && is_part_keyword(tokens[tokens.len() - 2]) {
            if let Some(part) = parse_part_token(tokens[tokens.len() - 1]) {
                part_hint = Some(part);
                tokens.truncate(tokens.len() - 2);
            }
        }

        let title = tokens.join(" ");
        if title.chars().count() < MIN_TITLE_CHARS {
            return Err(QueryError::EmptyQuery);
        }

        Ok(ParsedQuery {
            title,
            year,
            part_hint,
        })
    }
}

fn is_year_token(token: &str) -> bool {
    token.len() == 4 && token.chars().all(|c| c.is_ascii_digit())
}
