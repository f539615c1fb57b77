//! Candidate scoring and ranking
//!
//! **Algorithm:**
//! 1. Drop rows whose media type is not a movie
//! 2. `score = popularity`, then compound multipliers:
//!    - ×1.1 when the release year equals the query year
//!    - ×1.2 when either title carries the hinted installment number
//!    - ×1.1 when either title equals the query title (case-insensitive)
//! 3. Deduplicate by external id, keeping the higher score
//! 4. Stable sort by score, descending

use std::collections::HashMap;

use super::title_normalizer::{extract_part_number, has_part_marker, normalize};
use crate::models::{Candidate, RawCandidate};

pub const YEAR_MATCH_BONUS: f64 = 1.1;
pub const PART_MATCH_BONUS: f64 = 1.2;
pub const EXACT_TITLE_BONUS: f64 = 1.1;

/// Query-side inputs to scoring
#[derive(Debug, Clone, Copy)]
pub struct ScoreContext<'a> {
    pub query_title: &'a str,
    pub user_year: Option<i32>,
    pub part_hint: Option<u32>,
}

impl<'a> ScoreContext<'a> {
    pub fn new(query_title: &'a str, user_year: Option<i32>, part_hint: Option<u32>) -> Self {
        Self {
            query_title,
            user_year,
            part_hint,
        }
    }
}

/// Score, deduplicate, and rank raw candidates
pub fn score_candidates(raw: Vec<RawCandidate>, ctx: ScoreContext<'_>) -> Vec<Candidate> {
    let scored = raw
        .into_iter()
        .filter(RawCandidate::is_movie)
        .map(|row| build_candidate(row, &ctx));
    rank(scored)
}

/// Deduplicate by external id (max score wins, first seen on ties) and sort descending
///
/// The survivor of a duplicate group takes the position of the group's first
/// occurrence, so equal scores keep provider order.
pub fn rank(candidates: impl IntoIterator<Item = Candidate>) -> Vec<Candidate> {
    let mut ranked: Vec<Candidate> = Vec::new();
    let mut positions: HashMap<i64, usize> = HashMap::new();

    for candidate in candidates {
        match positions.get(&candidate.external_id) {
            Some(&idx) => {
                if candidate.score > ranked[idx].score {
                    ranked[idx] = candidate;
                }
            }
            None => {
                positions.insert(candidate.external_id, ranked.len());
                ranked.push(candidate);
            }
        }
    }

    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    ranked
}

fn build_candidate(row: RawCandidate, ctx: &ScoreContext<'_>) -> Candidate {
    let part_number =
        extract_part_number(&row.title).or_else(|| extract_part_number(&row.original_title));

    let mut score = row.popularity.max(0.0);
    if ctx.user_year.is_some() && row.release_year == ctx.user_year {
        score *= YEAR_MATCH_BONUS;
    }
    if let Some(hint) = ctx.part_hint {
        if part_number == Some(hint)
            || has_part_marker(&row.title, hint)
            || has_part_marker(&row.original_title, hint)
        {
            score *= PART_MATCH_BONUS;
        }
    }
    let query = ctx.query_title.trim().to_lowercase();
    if !query.is_empty()
        && (row.title.trim().to_lowercase() == query
            || row.original_title.trim().to_lowercase() == query)
    {
        score *= EXACT_TITLE_BONUS;
    }

    Candidate {
        norm_title: normalize(&row.title),
        norm_original_title: normalize(&row.original_title),
        external_id: row.external_id,
        title: row.title,
        original_title: row.original_title,
        release_year: row.release_year,
        popularity: row.popularity,
        media_type: row.media_type,
        collection_id: row.collection_id,
        locale: row.locale,
        part_number,
        score,
    }
}
