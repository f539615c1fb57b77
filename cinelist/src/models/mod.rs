//! Data models for catalog resolution

pub mod candidate;
pub mod catalog;
pub mod outcome;
pub mod query;
pub mod selection;

pub use candidate::{Candidate, MovieDetails, RawCandidate, MEDIA_TYPE_MOVIE};
pub use catalog::{CatalogRecord, ExistingRecord, MovieStatus, NewCatalogRecord, Registration};
pub use outcome::{AddOutcome, ChoiceOutcome, StatusChange};
pub use query::ParsedQuery;
pub use selection::{
    ChoiceAction, ChoicePrompt, PendingSelection, PromptKind, SelectionDraft, SessionKey,
};
