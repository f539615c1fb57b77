//! `/add` resolution service
//!
//! Drives the pipeline parse → search → score → decide, then either commits
//! the top candidate or opens an interactive choice, and resolves choice
//! events against the [`SelectionStore`].
//!
//! Every terminal transition of a choice (pick, cancel, timeout, supersede)
//! removes the session before anything else happens, so no error path can
//! leave an orphaned session behind.

use std::sync::Arc;
use std::time::Duration;

use cinelist_common::config::CatalogConfig;
use cinelist_common::ids::correlation_id;
use cinelist_common::time::Clock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::chat_surface::ChatSurface;
use super::committer::RegistrationCommitter;
use super::disambiguation::{ChoicePlan, DisambiguationPolicy, Verdict};
use super::messages;
use super::provider::CandidateProvider;
use super::query_parser::QueryParser;
use super::scorer::{score_candidates, ScoreContext};
use super::selection_store::{Lookup, SelectionStore};
use crate::db::CatalogStore;
use crate::error::{CommitError, ProviderError};
use crate::models::{
    AddOutcome, Candidate, ChoiceAction, ChoiceOutcome, ParsedQuery, PendingSelection,
    PromptKind, SelectionDraft, SessionKey,
};

/// Interval of the background sweep in the binary
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(30);

/// Resolution pipeline and choice state machine
#[derive(Clone)]
pub struct ResolutionService {
    parser: QueryParser,
    policy: DisambiguationPolicy,
    provider: Arc<dyn CandidateProvider>,
    committer: RegistrationCommitter,
    selections: SelectionStore,
    surface: Arc<dyn ChatSurface>,
    primary_locale: String,
}

impl ResolutionService {
    pub fn new(
        config: &CatalogConfig,
        provider: Arc<dyn CandidateProvider>,
        store: Arc<dyn CatalogStore>,
        surface: Arc<dyn ChatSurface>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let committer = RegistrationCommitter::new(Arc::clone(&provider), store);
        Self::with_committer(config, provider, committer, surface, clock)
    }

    /// Construct with a preconfigured committer
    pub fn with_committer(
        config: &CatalogConfig,
        provider: Arc<dyn CandidateProvider>,
        committer: RegistrationCommitter,
        surface: Arc<dyn ChatSurface>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            parser: QueryParser::from_config(config),
            policy: DisambiguationPolicy::new(config.similar_title_threshold),
            provider,
            committer,
            selections: SelectionStore::new(clock, config.choice_ttl()),
            surface,
            primary_locale: config.primary_locale().to_string(),
        }
    }

    pub fn selections(&self) -> &SelectionStore {
        &self.selections
    }

    pub fn primary_locale(&self) -> &str {
        &self.primary_locale
    }

    /// Display language for a user language code
    pub fn language_for(&self, language_code: Option<&str>) -> String {
        messages::resolve_language(language_code, &self.primary_locale)
    }

    // ========================================================================
    // /add
    // ========================================================================

    /// Handle `/add <args>` from (chat, user)
    pub async fn handle_add_command(
        &self,
        raw_args: &str,
        chat_id: i64,
        user_id: i64,
        language_code: Option<&str>,
    ) -> AddOutcome {
        let lang = self.language_for(language_code);
        info!(chat_id, user_id, raw = %raw_args, "/add received");

        let query = match self.parser.parse(raw_args) {
            Ok(query) => query,
            Err(error) => {
                warn!(chat_id, user_id, reason = %error, "/add parse failed");
                return AddOutcome::ParseError { error };
            }
        };

        let superseded = self.selections.take_for_user(chat_id, user_id).await;
        if !superseded.is_empty() {
            self.retire_superseded(superseded, &lang).await;
        }

        let raw = match self.provider.search(&query.title, query.year).await {
            Ok(raw) => raw,
            Err(e) => return provider_failure(e),
        };

        let ctx = ScoreContext::new(&query.title, query.year, query.part_hint);
        let ranked = score_candidates(raw, ctx);

        let Some(verdict) = self.policy.evaluate(&ranked, &query) else {
            warn!(title = %query.title, year = ?query.year, "/add not found");
            return AddOutcome::NotFound;
        };

        match verdict {
            Verdict::AutoRegister(top) => self.auto_register(&top).await,
            Verdict::SameTitleYears(plan) => {
                self.present_choice(chat_id, user_id, &query, plan, &lang).await
            }
            Verdict::Confirm(signals) => {
                let siblings = if signals.collection_trigger {
                    self.collection_siblings(&ranked, ctx).await
                } else {
                    Vec::new()
                };
                match self
                    .policy
                    .plan_confirmation(&ranked, &query, signals, siblings)
                {
                    Some(plan) => self.present_choice(chat_id, user_id, &query, plan, &lang).await,
                    None => AddOutcome::NotFound,
                }
            }
        }
    }

    async fn auto_register(&self, top: &Candidate) -> AddOutcome {
        match self.committer.commit(top.external_id).await {
            Ok(registration) => {
                info!(
                    mode = "auto",
                    tmdb_id = top.external_id,
                    id = %registration.record.id,
                    year = registration.record.year,
                    "/add registered"
                );
                AddOutcome::AutoRegistered { registration }
            }
            Err(CommitError::Duplicate(existing)) => AddOutcome::Duplicate { existing },
            Err(CommitError::NoReleaseDate) => {
                warn!(tmdb_id = top.external_id, "/add no release date");
                AddOutcome::NoReleaseDate
            }
            Err(CommitError::Provider(e)) => provider_failure(e),
            Err(CommitError::Storage(e)) => {
                let correlation_id = correlation_id();
                error!(correlation_id = %correlation_id, tmdb_id = top.external_id, error = %e, "/add store failure");
                AddOutcome::StoreError { correlation_id }
            }
        }
    }

    /// Scored members of the leader's collection; lookup failures yield none
    async fn collection_siblings(
        &self,
        ranked: &[Candidate],
        ctx: ScoreContext<'_>,
    ) -> Vec<Candidate> {
        let Some(collection_id) = ranked.first().and_then(|c| c.collection_id) else {
            return Vec::new();
        };
        match self.provider.collection_members(collection_id).await {
            Ok(members) => score_candidates(members, ctx),
            Err(e) => {
                warn!(collection_id, error = %e, "Collection lookup failed, offering search results only");
                Vec::new()
            }
        }
    }

    async fn present_choice(
        &self,
        chat_id: i64,
        user_id: i64,
        query: &ParsedQuery,
        plan: ChoicePlan,
        lang: &str,
    ) -> AddOutcome {
        let prompt = messages::render_prompt(lang, &plan, query);

        let message_id = match self.surface.present_choice(chat_id, &prompt).await {
            Ok(id) => id,
            Err(e) => {
                let correlation_id = correlation_id();
                error!(correlation_id = %correlation_id, chat_id, error = %e, "/add prompt delivery failed");
                return AddOutcome::TechnicalError { correlation_id };
            }
        };

        let key = SessionKey::new(chat_id, user_id, message_id);
        let created = self
            .selections
            .create(
                key,
                SelectionDraft {
                    query_title: query.title.clone(),
                    user_year: query.year,
                    options: plan.options,
                    top_pick_id: plan.top_pick_id,
                    language: lang.to_string(),
                    prompt_kind: plan.kind,
                },
            )
            .await;

        if !created.superseded.is_empty() {
            self.retire_superseded(created.superseded, lang).await;
        }

        let service = self.clone();
        self.selections
            .spawn_expiry(&created.selection, created.timer, move |expired| async move {
                service.expire(expired).await;
            });

        warn!(
            chat_id,
            user_id,
            message_id,
            reason = plan.kind.reason(),
            count = prompt.options.len(),
            "/add ambiguous, dialog presented"
        );
        AddOutcome::PresentedChoice {
            session: key,
            prompt,
        }
    }

    /// Make superseded prompts inert and tell the user
    async fn retire_superseded(&self, superseded: Vec<Arc<PendingSelection>>, lang: &str) {
        for old in superseded {
            let key = old.key;
            let cancelled = messages::t(&old.language, "cancelled", &[]);
            if let Err(e) = self
                .surface
                .retract_choice(key.chat_id, key.message_id, &cancelled)
                .await
            {
                warn!(message_id = key.message_id, error = %e, "Could not retract superseded prompt");
            }
            if let Err(e) = self
                .surface
                .notify(key.chat_id, &messages::t(lang, "old_cancelled", &[]))
                .await
            {
                warn!(chat_id = key.chat_id, error = %e, "Could not send supersede notice");
            }
            info!(chat_id = key.chat_id, user_id = key.user_id, message_id = key.message_id, reason = "superseded", "/add cleanup");
        }
    }

    // ========================================================================
    // Choice events
    // ========================================================================

    /// Handle a raw callback payload; unrecognized payloads are ignored
    pub async fn handle_choice_data(&self, key: SessionKey, data: &str) -> ChoiceOutcome {
        match ChoiceAction::parse(data) {
            Some(action) => self.handle_choice_event(key, action).await,
            None => {
                debug!(message_id = key.message_id, "Unrecognized choice payload ignored");
                ChoiceOutcome::Ignored
            }
        }
    }

    /// Resolve a user action on the prompt identified by `key`
    pub async fn handle_choice_event(&self, key: SessionKey, action: ChoiceAction) -> ChoiceOutcome {
        let selection = match self.selections.lookup(&key).await {
            Lookup::Absent => {
                debug!(message_id = key.message_id, "Choice for unknown or resolved prompt ignored");
                return ChoiceOutcome::Ignored;
            }
            Lookup::Expired(expired) => return self.finish_timed_out(expired).await,
            Lookup::Open(selection) => selection,
        };

        let picked = match action {
            ChoiceAction::Cancel => None,
            other => match selection.resolve_pick(other) {
                Some(id) => Some(id),
                None => {
                    debug!(message_id = key.message_id, ?other, "Pick outside the option set ignored");
                    return ChoiceOutcome::Ignored;
                }
            },
        };

        let selection = match self.selections.claim(&key).await {
            Lookup::Open(selection) => selection,
            Lookup::Expired(expired) => return self.finish_timed_out(expired).await,
            Lookup::Absent => return ChoiceOutcome::Ignored,
        };

        let Some(external_id) = picked else {
            info!(chat_id = key.chat_id, user_id = key.user_id, message_id = key.message_id, reason = "cancelled", "/add cleanup");
            let outcome = ChoiceOutcome::Cancelled;
            self.retract_with_outcome(&selection, &outcome).await;
            return outcome;
        };

        let outcome = match self.committer.commit(external_id).await {
            Ok(registration) => {
                info!(
                    mode = if selection.prompt_kind == PromptKind::YearConfirm { "confirm_year" } else { "confirm" },
                    reason = selection.prompt_kind.reason(),
                    tmdb_id = external_id,
                    id = %registration.record.id,
                    year = registration.record.year,
                    "/add registered"
                );
                ChoiceOutcome::Registered { registration }
            }
            Err(CommitError::Duplicate(existing)) => ChoiceOutcome::Duplicate { existing },
            Err(CommitError::NoReleaseDate) => ChoiceOutcome::NoReleaseDate,
            Err(e) => {
                let correlation_id = correlation_id();
                error!(correlation_id = %correlation_id, tmdb_id = external_id, error = %e, "/add choice commit failed");
                ChoiceOutcome::TechnicalError { correlation_id }
            }
        };

        self.retract_with_outcome(&selection, &outcome).await;
        outcome
    }

    async fn finish_timed_out(&self, selection: Arc<PendingSelection>) -> ChoiceOutcome {
        self.expire(selection).await;
        ChoiceOutcome::TimedOut
    }

    async fn retract_with_outcome(&self, selection: &PendingSelection, outcome: &ChoiceOutcome) {
        let text = messages::choice_outcome_text(
            &selection.language,
            outcome,
            &selection.query_title,
            &self.primary_locale,
        );
        if let Err(e) = self
            .surface
            .retract_choice(selection.key.chat_id, selection.key.message_id, &text)
            .await
        {
            warn!(message_id = selection.key.message_id, error = %e, "Could not retract prompt");
        }
    }

    // ========================================================================
    // Expiry
    // ========================================================================

    /// Timeout path shared by timers, the sweeper and late clicks: retract
    /// the prompt and notify the user
    async fn expire(&self, selection: Arc<PendingSelection>) {
        let text = messages::timeout_text(&selection.language, &selection.query_title);
        let key = selection.key;
        if let Err(e) = self.surface.retract_choice(key.chat_id, key.message_id, &text).await {
            warn!(message_id = key.message_id, error = %e, "Could not retract expired prompt");
        }
        if let Err(e) = self.surface.notify(key.chat_id, &text).await {
            warn!(chat_id = key.chat_id, error = %e, "Could not send timeout notice");
        }
        info!(chat_id = key.chat_id, user_id = key.user_id, message_id = key.message_id, reason = "timeout", "/add cleanup");
    }

    /// Remove expired sessions missed by their timers; returns how many
    pub async fn sweep_expired(&self) -> usize {
        let expired = self.selections.sweep().await;
        let count = expired.len();
        for selection in expired {
            self.expire(selection).await;
        }
        count
    }

    /// Run [`Self::sweep_expired`] every `interval` until `shutdown` fires
    pub fn spawn_sweeper(&self, interval: Duration, shutdown: CancellationToken) -> JoinHandle<()> {
        let service = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        debug!("Selection sweeper stopping");
                        break;
                    }
                    _ = ticker.tick() => {
                        service.sweep_expired().await;
                    }
                }
            }
        })
    }
}

/// Map a provider failure on the `/add` path
///
/// Rate limiting and unavailability are reported as such; anything else is a
/// technical error with a correlation id.
fn provider_failure(e: ProviderError) -> AddOutcome {
    let kind = e.kind();
    if e.is_transient() {
        warn!(kind = ?kind, error = %e, "/add provider temporarily unavailable");
        return AddOutcome::ProviderError {
            kind,
            correlation_id: None,
        };
    }
    let correlation_id = correlation_id();
    error!(correlation_id = %correlation_id, kind = ?kind, error = %e, "/add provider failure");
    AddOutcome::ProviderError {
        kind,
        correlation_id: Some(correlation_id),
    }
}
