//! Interactive choice sessions

use cinelist_common::events::ChoiceButton;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::time::Instant;

use super::Candidate;

/// Callback payload prefix for an explicit pick
pub const PICK_PREFIX: &str = "ADD_PICK:";
/// Callback payload for the top-ranked shortcut
pub const PICK_TOP_DATA: &str = "ADD_TOP1";
/// Callback payload for cancellation
pub const CANCEL_DATA: &str = "ADD_CANCEL";

/// Identity of one interactive choice: (chat, user, prompt message)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionKey {
    pub chat_id: i64,
    pub user_id: i64,
    pub message_id: i64,
}

impl SessionKey {
    pub fn new(chat_id: i64, user_id: i64, message_id: i64) -> Self {
        Self {
            chat_id,
            user_id,
            message_id,
        }
    }

    /// True if the key belongs to the given chat participant
    pub fn is_owned_by(&self, chat_id: i64, user_id: i64) -> bool {
        self.chat_id == chat_id && self.user_id == user_id
    }
}

/// Prompt variant shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptKind {
    /// Same title released in several years
    SameTitleYears,
    /// Installments of one collection
    SeriesPart,
    /// Release year unknown or not matching the query
    YearConfirm,
    /// Close scores between different titles
    SimilarTitles,
}

impl PromptKind {
    /// Short reason tag used in logs
    pub fn reason(&self) -> &'static str {
        match self {
            PromptKind::SameTitleYears => "same_title",
            PromptKind::SeriesPart => "collection",
            PromptKind::YearConfirm => "no_exact_year",
            PromptKind::SimilarTitles => "close_scores",
        }
    }
}

/// A rendered interactive choice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoicePrompt {
    pub kind: PromptKind,
    pub text: String,
    /// Options in display order, at most five
    pub options: Vec<Candidate>,
    /// One button per option followed by the cancel button
    pub buttons: Vec<ChoiceButton>,
}

/// User action on a presented choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChoiceAction {
    Pick(i64),
    PickTop,
    Cancel,
}

impl ChoiceAction {
    /// Parse a callback payload; `None` for anything unrecognized
    pub fn parse(data: &str) -> Option<Self> {
        let data = data.trim();
        if data == CANCEL_DATA {
            return Some(ChoiceAction::Cancel);
        }
        if data == PICK_TOP_DATA {
            return Some(ChoiceAction::PickTop);
        }
        data.strip_prefix(PICK_PREFIX)
            .and_then(|id| id.trim().parse().ok())
            .map(ChoiceAction::Pick)
    }

    /// Callback payload for this action
    pub fn to_data(&self) -> String {
        match self {
            ChoiceAction::Pick(id) => format!("{}{}", PICK_PREFIX, id),
            ChoiceAction::PickTop => PICK_TOP_DATA.to_string(),
            ChoiceAction::Cancel => CANCEL_DATA.to_string(),
        }
    }
}

/// Parameters of a session about to be opened
#[derive(Debug, Clone)]
pub struct SelectionDraft {
    pub query_title: String,
    pub user_year: Option<i32>,
    pub options: Vec<Candidate>,
    pub top_pick_id: i64,
    pub language: String,
    pub prompt_kind: PromptKind,
}

/// An open disambiguation session
///
/// Immutable once stored; resolution removes it.
#[derive(Debug, Clone)]
pub struct PendingSelection {
    pub key: SessionKey,
    pub query_title: String,
    pub user_year: Option<i32>,
    pub options: HashMap<i64, Candidate>,
    /// Fallback for the top-pick shortcut
    pub top_pick_id: i64,
    pub expires_at: Instant,
    pub language: String,
    pub prompt_kind: PromptKind,
}

impl PendingSelection {
    pub fn from_draft(key: SessionKey, draft: SelectionDraft, expires_at: Instant) -> Self {
        Self {
            key,
            query_title: draft.query_title,
            user_year: draft.user_year,
            options: draft
                .options
                .into_iter()
                .map(|c| (c.external_id, c))
                .collect(),
            top_pick_id: draft.top_pick_id,
            expires_at,
            language: draft.language,
            prompt_kind: draft.prompt_kind,
        }
    }

    /// Expired sessions are inert even before removal
    pub fn is_expired_at(&self, now: Instant) -> bool {
        now >= self.expires_at
    }

    /// External id selected by `action`, if the action picks a valid option
    pub fn resolve_pick(&self, action: ChoiceAction) -> Option<i64> {
        match action {
            ChoiceAction::PickTop => Some(self.top_pick_id),
            ChoiceAction::Pick(id) if self.options.contains_key(&id) => Some(id),
            ChoiceAction::Pick(_) | ChoiceAction::Cancel => None,
        }
    }
}
