//! Outcomes reported to the transport layer

use serde::Serialize;

use super::{CatalogRecord, ChoicePrompt, ExistingRecord, Registration, SessionKey};
use crate::error::{ProviderErrorKind, QueryError};

/// Result of an `/add` command
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AddOutcome {
    AutoRegistered {
        registration: Registration,
    },
    /// Top candidate is already cataloged
    Duplicate {
        existing: ExistingRecord,
    },
    PresentedChoice {
        session: SessionKey,
        prompt: ChoicePrompt,
    },
    ParseError {
        error: QueryError,
    },
    NotFound,
    NoReleaseDate,
    /// `correlation_id` is set for failures reported as technical errors
    ProviderError {
        kind: ProviderErrorKind,
        correlation_id: Option<String>,
    },
    StoreError {
        correlation_id: String,
    },
    /// Prompt could not be delivered
    TechnicalError {
        correlation_id: String,
    },
}

impl AddOutcome {
    pub fn name(&self) -> &'static str {
        match self {
            AddOutcome::AutoRegistered { .. } => "auto_registered",
            AddOutcome::Duplicate { .. } => "duplicate",
            AddOutcome::PresentedChoice { .. } => "presented_choice",
            AddOutcome::ParseError { .. } => "parse_error",
            AddOutcome::NotFound => "not_found",
            AddOutcome::NoReleaseDate => "no_release_date",
            AddOutcome::ProviderError { .. } => "provider_error",
            AddOutcome::StoreError { .. } => "store_error",
            AddOutcome::TechnicalError { .. } => "technical_error",
        }
    }
}

/// Result of a choice event
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ChoiceOutcome {
    Registered { registration: Registration },
    Duplicate { existing: ExistingRecord },
    Cancelled,
    TimedOut,
    /// Stale, foreign, or malformed event
    Ignored,
    NoReleaseDate,
    TechnicalError { correlation_id: String },
}

impl ChoiceOutcome {
    pub fn name(&self) -> &'static str {
        match self {
            ChoiceOutcome::Registered { .. } => "registered",
            ChoiceOutcome::Duplicate { .. } => "duplicate",
            ChoiceOutcome::Cancelled => "cancelled",
            ChoiceOutcome::TimedOut => "timed_out",
            ChoiceOutcome::Ignored => "ignored",
            ChoiceOutcome::NoReleaseDate => "no_release_date",
            ChoiceOutcome::TechnicalError { .. } => "technical_error",
        }
    }
}

/// Result of a watch-status change addressed by id prefix
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StatusChange {
    Updated { record: CatalogRecord },
    AlreadyInState { record: CatalogRecord },
    NotFound,
    /// Several records share the prefix; carries their short ids
    Ambiguous { short_ids: Vec<String> },
    PrefixTooShort,
}
