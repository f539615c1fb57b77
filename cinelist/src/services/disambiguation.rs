//! Auto-accept vs. interactive-choice decision
//!
//! **Decision order** (first match wins):
//! 1. Same normalized title with ≥2 distinct known release years → year choice,
//!    one representative per year
//! 2. Narrow lead, un-hinted collection member, or unknown year on the top
//!    candidate → interactive choice over the top five (plus collection
//!    siblings when the collection triggered it)
//! 3. Otherwise → auto-register the top candidate

use std::collections::BTreeMap;

use cinelist_common::config::MAX_CHOICE_OPTIONS;

use super::scorer::rank;
use super::title_normalizer::{normalize, title_similarity};
use crate::models::{Candidate, ParsedQuery, PromptKind};

/// Lead below this ratio over the runner-up counts as narrow
pub const CLOSE_SCORE_RATIO: f64 = 1.2;

/// Why the top candidate cannot be accepted automatically
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConfirmSignals {
    /// Top score under 1.2× the second or third score
    pub gap_close: bool,
    /// Top candidate belongs to a collection and the query names no installment
    pub collection_trigger: bool,
    /// Top candidate has no release year
    pub unknown_year: bool,
}

impl ConfirmSignals {
    pub fn any(&self) -> bool {
        self.gap_close || self.collection_trigger || self.unknown_year
    }
}

/// Candidates to offer and how to ask
#[derive(Debug, Clone, PartialEq)]
pub struct ChoicePlan {
    pub kind: PromptKind,
    /// Display order, at most [`MAX_CHOICE_OPTIONS`]
    pub options: Vec<Candidate>,
    /// Top-ranked candidate, target of the top-pick shortcut
    pub top_pick_id: i64,
}

/// First-stage decision
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    AutoRegister(Candidate),
    /// Same-title releases across years; the plan is final
    SameTitleYears(ChoicePlan),
    /// Needs confirmation; collection siblings may still be merged in
    Confirm(ConfirmSignals),
}

#[derive(Debug, Clone, Copy)]
pub struct DisambiguationPolicy {
    similar_title_threshold: f64,
}

impl Default for DisambiguationPolicy {
    fn default() -> Self {
        Self::new(0.8)
    }
}

impl DisambiguationPolicy {
    pub fn new(similar_title_threshold: f64) -> Self {
        Self {
            similar_title_threshold,
        }
    }

    /// Decide on a ranked, deduplicated list; `None` when the list is empty
    pub fn evaluate(&self, ranked: &[Candidate], query: &ParsedQuery) -> Option<Verdict> {
        let top1 = ranked.first()?;

        if let Some(options) = same_title_representatives(ranked, query.year) {
            return Some(Verdict::SameTitleYears(ChoicePlan {
                kind: PromptKind::SameTitleYears,
                options,
                top_pick_id: top1.external_id,
            }));
        }

        let signals = confirm_signals(ranked, query);
        if signals.any() {
            Some(Verdict::Confirm(signals))
        } else {
            Some(Verdict::AutoRegister(top1.clone()))
        }
    }

    /// Build the interactive choice for a [`Verdict::Confirm`]
    ///
    /// `siblings` are the scored members of the top candidate's collection;
    /// they are only used when the collection triggered confirmation.
    pub fn plan_confirmation(
        &self,
        ranked: &[Candidate],
        query: &ParsedQuery,
        signals: ConfirmSignals,
        siblings: Vec<Candidate>,
    ) -> Option<ChoicePlan> {
        let top1 = ranked.first()?;
        let top: Vec<Candidate> = ranked.iter().take(MAX_CHOICE_OPTIONS).cloned().collect();

        let (kind, options) = if signals.collection_trigger {
            (
                PromptKind::SeriesPart,
                series_options(top, siblings, top1.collection_id),
            )
        } else if signals.unknown_year || year_missing_from(&top, query.year) {
            (PromptKind::YearConfirm, order_by_year_proximity(top, query.year))
        } else {
            (
                PromptKind::SimilarTitles,
                self.order_by_similarity(top, &query.title),
            )
        };

        Some(ChoicePlan {
            kind,
            options,
            top_pick_id: top1.external_id,
        })
    }

    /// Keep the leader first, then titles at or above the similarity
    /// threshold, then the rest; each group keeps rank order
    fn order_by_similarity(&self, top: Vec<Candidate>, query_title: &str) -> Vec<Candidate> {
        let query = normalize(query_title);
        let mut iter = top.into_iter();
        let Some(leader) = iter.next() else {
            return Vec::new();
        };

        let (close, far): (Vec<Candidate>, Vec<Candidate>) = iter.partition(|c| {
            title_similarity(&query, &c.norm_title).max(title_similarity(&query, &c.norm_original_title))
                >= self.similar_title_threshold
        });

        std::iter::once(leader)
            .chain(close)
            .chain(far)
            .take(MAX_CHOICE_OPTIONS)
            .collect()
    }
}

/// Confirmation signals for the current leader
pub fn confirm_signals(ranked: &[Candidate], query: &ParsedQuery) -> ConfirmSignals {
    let Some(top1) = ranked.first() else {
        return ConfirmSignals::default();
    };
    let narrow = |other: Option<&Candidate>| {
        other.map_or(false, |c| top1.score < CLOSE_SCORE_RATIO * c.score)
    };

    ConfirmSignals {
        gap_close: narrow(ranked.get(1)) || narrow(ranked.get(2)),
        collection_trigger: top1.collection_id.is_some() && query.part_hint.is_none(),
        unknown_year: top1.release_year.is_none(),
    }
}

/// One representative per distinct known year among candidates sharing the
/// leader's normalized title; `None` unless there are at least two years
///
/// Representatives are the most popular per year, newest year first. When
/// there are more years than buttons, the leader's year and `query_year`
/// keep their slots and the rest are filled newest-first.
pub fn same_title_representatives(
    ranked: &[Candidate],
    query_year: Option<i32>,
) -> Option<Vec<Candidate>> {
    let top1 = ranked.first()?;
    let mut by_year: BTreeMap<i32, &Candidate> = BTreeMap::new();

    for candidate in ranked.iter().filter(|c| c.shares_title_with(top1)) {
        let Some(year) = candidate.release_year else {
            continue;
        };
        match by_year.get(&year) {
            Some(current) if current.popularity >= candidate.popularity => {}
            _ => {
                by_year.insert(year, candidate);
            }
        }
    }

    if by_year.len() < 2 {
        return None;
    }

    let mut years: Vec<i32> = [top1.release_year, query_year]
        .into_iter()
        .flatten()
        .filter(|year| by_year.contains_key(year))
        .collect();
    years.dedup();
    for year in by_year.keys().rev() {
        if years.len() >= MAX_CHOICE_OPTIONS {
            break;
        }
        if !years.contains(year) {
            years.push(*year);
        }
    }
    years.sort_unstable_by(|a, b| b.cmp(a));

    Some(
        years
            .iter()
            .filter_map(|year| by_year.get(year))
            .map(|c| (*c).clone())
            .collect(),
    )
}

fn year_missing_from(options: &[Candidate], user_year: Option<i32>) -> bool {
    user_year.map_or(false, |year| {
        !options.iter().any(|c| c.release_year == Some(year))
    })
}

/// Merge the leaders with collection siblings and keep the five best
///
/// Collection members are listed first, oldest release first, followed by
/// the other picks in rank order.
fn series_options(
    top: Vec<Candidate>,
    siblings: Vec<Candidate>,
    collection_id: Option<i64>,
) -> Vec<Candidate> {
    let merged: Vec<Candidate> = rank(top.into_iter().chain(siblings))
        .into_iter()
        .take(MAX_CHOICE_OPTIONS)
        .collect();

    let (mut members, others): (Vec<Candidate>, Vec<Candidate>) = merged
        .into_iter()
        .partition(|c| collection_id.is_some() && c.collection_id == collection_id);
    members.sort_by_key(|c| (c.release_year.is_none(), c.release_year, c.part_number));
    members.extend(others);
    members
}

/// Closest release year first, unknown years last; rank order otherwise
fn order_by_year_proximity(mut options: Vec<Candidate>, user_year: Option<i32>) -> Vec<Candidate> {
    if let Some(year) = user_year {
        options.sort_by_key(|c| match c.release_year {
            Some(y) => (false, (y - year).abs()),
            None => (true, 0),
        });
    }
    options
}
