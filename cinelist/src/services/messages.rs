//! User-facing text
//!
//! A static `ru`/`en` template table with `{placeholder}` substitution.
//! Unknown languages and missing keys fall back to English.

use once_cell::sync::Lazy;
use std::collections::HashMap;

use cinelist_common::events::ChoiceButton;
use cinelist_common::ids::to_short_id;

use super::disambiguation::ChoicePlan;
use super::title_normalizer::{normalize, part_marker};
use crate::models::{
    AddOutcome, Candidate, CatalogRecord, ChoiceAction, ChoiceOutcome, ChoicePrompt,
    ExistingRecord, ParsedQuery, PromptKind, Registration, StatusChange,
};
use crate::error::{ProviderErrorKind, QueryError};

pub const FALLBACK_LANGUAGE: &str = "en";

type Table = HashMap<&'static str, &'static str>;

static MESSAGES: Lazy<HashMap<&'static str, Table>> = Lazy::new(|| {
    let ru: Table = [
        ("same_title_prompt", "Нашлось несколько релизов “{title}”. Выберите год:"),
        ("series_prompt", "Похоже, это серия “{base_title}”. Уточните часть:"),
        ("year_prompt", "Не нашёл точное совпадение по году {user_year}. Возможные варианты:"),
        ("year_unknown_prompt", "Не удалось определить год релиза. Возможные варианты:"),
        ("similar_prompt", "Нашлось несколько похожих фильмов по запросу “{title}”. Выберите:"),
        ("duplicate", "Этот фильм уже в списке: {short_id} — “{title}” ({year})."),
        ("add_duplicate_simple", "Этот фильм уже в списке (найдён по TMDb)."),
        ("cancelled", "Отменено."),
        ("timeout", "Время выбора истекло — попробуйте снова: /add {query}."),
        ("old_cancelled", "Старая попытка отменена."),
        ("cancel_btn", "Отмена"),
        ("year_unknown", "год неизвестен"),
        ("genres_unknown", "жанры не указаны"),
        ("add_success", "➕ Добавлено {short_id}\n🎥 “{title}” ({year}) — {genres}"),
        ("no_release_date", "В TMDb нет корректной даты релиза по этому фильму, добавление отменено."),
        ("format_error", "Формат: /add Название 2014"),
        ("year_error", "Год: 1888–2100. Пример: /add Интерстеллар 2014"),
        ("not_found", "Не нашёл такой фильм в базе TMDb. Попробуй другое написание."),
        ("auth_error", "Проблема авторизации TMDb. Проверьте TMDB_KEY."),
        ("rate_error", "TMDb ограничил частоту запросов. Попробуйте чуть позже."),
        ("tmdb_unavailable", "Сервис TMDb временно недоступен, попробуйте позже."),
        ("tech_error", "⚠️ Сервис временно недоступен (id={rid})"),
        ("ignored", ""),
        ("list_empty", "Список пока пуст."),
        ("prefix_too_short", "Укажи хотя бы 4 символа ID."),
        ("id_not_found", "Не нашёл фильм с таким ID."),
        ("id_ambiguous", "Несколько совпадений: {sample}"),
        ("done_ok", "✅ Просмотрено {short_id}\n🎬 “{title}”"),
        ("done_already", "Фильм {short_id} — “{title}” уже отмечен."),
        ("del_ok", "🗑 Удалено {short_id}\n🎬 “{title}”"),
        ("del_already", "Фильм {short_id} — “{title}” уже удалён."),
    ]
    .into_iter()
    .collect();

    let en: Table = [
        ("same_title_prompt", "Found multiple releases of '{title}'. Pick a year:"),
        ("series_prompt", "Looks like it's a series '{base_title}'. Choose a part:"),
        ("year_prompt", "No exact match for year {user_year}. Possible options:"),
        ("year_unknown_prompt", "Couldn't determine the release year. Possible options:"),
        ("similar_prompt", "Several similar movies match '{title}'. Choose one:"),
        ("duplicate", "This movie is already in the list: {short_id} — '{title}' ({year})."),
        ("add_duplicate_simple", "This movie is already in the list (matched via TMDb)."),
        ("cancelled", "Cancelled."),
        ("timeout", "Timeout — try again: /add {query}."),
        ("old_cancelled", "Previous attempt cancelled."),
        ("cancel_btn", "Cancel"),
        ("year_unknown", "year unknown"),
        ("genres_unknown", "genres not specified"),
        ("add_success", "➕ Added {short_id}\n🎥 '{title}' ({year}) — {genres}"),
        ("no_release_date", "TMDb has no valid release date for this movie, adding cancelled."),
        ("format_error", "Format: /add Title 2014"),
        ("year_error", "Year must be 1888–2100. Example: /add Interstellar 2014"),
        ("not_found", "Couldn't find this movie in TMDb. Try different spelling."),
        ("auth_error", "TMDb authorization problem. Check TMDB_KEY."),
        ("rate_error", "TMDb rate limit exceeded. Try again later."),
        ("tmdb_unavailable", "TMDb service is temporarily unavailable, try later."),
        ("tech_error", "⚠️ Service temporarily unavailable (id={rid})"),
        ("ignored", ""),
        ("list_empty", "List is empty."),
        ("prefix_too_short", "Provide at least 4 characters of the ID."),
        ("id_not_found", "Movie not found for this ID."),
        ("id_ambiguous", "Multiple matches: {sample}"),
        ("done_ok", "✅ Marked as watched {short_id}\n🎬 '{title}'"),
        ("done_already", "Movie {short_id} — '{title}' already marked as watched."),
        ("del_ok", "🗑 Deleted {short_id}\n🎬 '{title}'"),
        ("del_already", "Movie {short_id} — '{title}' already deleted."),
    ]
    .into_iter()
    .collect();

    [("ru", ru), ("en", en)].into_iter().collect()
});

/// True if templates exist for `lang`
pub fn is_supported(lang: &str) -> bool {
    MESSAGES.contains_key(lang)
}

/// Display language for a request
///
/// The user's language code (region suffix ignored) if supported, else
/// `fallback` if supported, else English.
pub fn resolve_language(user_code: Option<&str>, fallback: &str) -> String {
    let primary_tag = |code: &str| {
        code.trim()
            .split(|c: char| c == '-' || c == '_')
            .next()
            .unwrap_or("")
            .to_lowercase()
    };
    user_code
        .map(primary_tag)
        .filter(|code| is_supported(code))
        .or_else(|| Some(primary_tag(fallback)).filter(|code| is_supported(code)))
        .unwrap_or_else(|| FALLBACK_LANGUAGE.to_string())
}

/// Render template `key` in `lang`, substituting `{name}` placeholders
pub fn t(lang: &str, key: &str, args: &[(&str, &str)]) -> String {
    let template = MESSAGES
        .get(lang)
        .and_then(|table| table.get(key))
        .or_else(|| MESSAGES.get(FALLBACK_LANGUAGE).and_then(|table| table.get(key)))
        .copied()
        .unwrap_or("");

    args.iter().fold(template.to_string(), |text, (name, value)| {
        text.replace(&format!("{{{}}}", name), value)
    })
}

// ============================================================================
// Choice prompts
// ============================================================================

/// Button label: `<title> (<year | year unknown>)`, keycap-prefixed when requested
pub fn option_label(lang: &str, candidate: &Candidate, with_marker: bool) -> String {
    let year = candidate
        .release_year
        .map(|y| y.to_string())
        .unwrap_or_else(|| t(lang, "year_unknown", &[]));
    let label = format!("{} ({})", candidate.title, year);

    let marker = if with_marker {
        part_marker(candidate.part_number)
    } else {
        ""
    };
    if marker.is_empty() {
        label
    } else {
        format!("{} {}", marker, label)
    }
}

/// Render a plan into prompt text and buttons; cancel is always last
pub fn render_prompt(lang: &str, plan: &ChoicePlan, query: &ParsedQuery) -> ChoicePrompt {
    let text = match plan.kind {
        PromptKind::SameTitleYears => {
            let title = plan
                .options
                .iter()
                .find(|c| c.external_id == plan.top_pick_id)
                .or_else(|| plan.options.first())
                .map(|c| c.title.as_str())
                .unwrap_or(query.title.as_str());
            t(lang, "same_title_prompt", &[("title", title)])
        }
        PromptKind::SeriesPart => t(
            lang,
            "series_prompt",
            &[("base_title", normalize(&query.title).as_str())],
        ),
        PromptKind::YearConfirm => match query.year {
            Some(year) => t(lang, "year_prompt", &[("user_year", year.to_string().as_str())]),
            None => t(lang, "year_unknown_prompt", &[]),
        },
        PromptKind::SimilarTitles => t(lang, "similar_prompt", &[("title", query.title.as_str())]),
    };

    let with_marker = plan.kind == PromptKind::SeriesPart;
    let mut buttons: Vec<ChoiceButton> = plan
        .options
        .iter()
        .map(|c| ChoiceButton {
            label: option_label(lang, c, with_marker),
            data: ChoiceAction::Pick(c.external_id).to_data(),
        })
        .collect();
    buttons.push(ChoiceButton {
        label: t(lang, "cancel_btn", &[]),
        data: ChoiceAction::Cancel.to_data(),
    });

    ChoicePrompt {
        kind: plan.kind,
        text,
        options: plan.options.clone(),
        buttons,
    }
}

// ============================================================================
// Outcome text
// ============================================================================

/// Success confirmation; genres get a locale suffix when they did not come
/// from the primary locale
pub fn registration_text(lang: &str, registration: &Registration, primary_locale: &str) -> String {
    let record = &registration.record;
    let genres = match (&record.genres, &registration.genres_locale) {
        (Some(genres), Some(locale)) if !genres.is_empty() && locale != primary_locale => {
            format!("{} ({})", genres, locale)
        }
        (Some(genres), _) if !genres.is_empty() => genres.clone(),
        _ => t(lang, "genres_unknown", &[]),
    };
    t(
        lang,
        "add_success",
        &[
            ("short_id", to_short_id(&record.id).as_str()),
            ("title", record.title.as_str()),
            ("year", record.year.to_string().as_str()),
            ("genres", genres.as_str()),
        ],
    )
}

pub fn duplicate_text(lang: &str, existing: &ExistingRecord) -> String {
    if existing.id.is_empty() {
        return t(lang, "add_duplicate_simple", &[]);
    }
    t(
        lang,
        "duplicate",
        &[
            ("short_id", to_short_id(&existing.id).as_str()),
            ("title", existing.title.as_str()),
            ("year", existing.year.to_string().as_str()),
        ],
    )
}

pub fn tech_error_text(lang: &str, correlation_id: &str) -> String {
    t(lang, "tech_error", &[("rid", correlation_id)])
}

pub fn timeout_text(lang: &str, query_title: &str) -> String {
    t(lang, "timeout", &[("query", query_title)])
}

pub fn add_outcome_text(lang: &str, outcome: &AddOutcome, primary_locale: &str) -> String {
    match outcome {
        AddOutcome::AutoRegistered { registration } => {
            registration_text(lang, registration, primary_locale)
        }
        AddOutcome::Duplicate { existing } => duplicate_text(lang, existing),
        AddOutcome::PresentedChoice { prompt, .. } => prompt.text.clone(),
        AddOutcome::ParseError {
            error: QueryError::EmptyQuery,
        } => t(lang, "format_error", &[]),
        AddOutcome::ParseError {
            error: QueryError::InvalidYear,
        } => t(lang, "year_error", &[]),
        AddOutcome::NotFound => t(lang, "not_found", &[]),
        AddOutcome::NoReleaseDate => t(lang, "no_release_date", &[]),
        AddOutcome::ProviderError {
            correlation_id: Some(id),
            ..
        } => tech_error_text(lang, id),
        AddOutcome::ProviderError { kind, .. } => match kind {
            ProviderErrorKind::RateLimited => t(lang, "rate_error", &[]),
            ProviderErrorKind::Unavailable => t(lang, "tmdb_unavailable", &[]),
            ProviderErrorKind::AuthFailure => t(lang, "auth_error", &[]),
            ProviderErrorKind::Generic => t(lang, "tmdb_unavailable", &[]),
        },
        AddOutcome::StoreError { correlation_id }
        | AddOutcome::TechnicalError { correlation_id } => tech_error_text(lang, correlation_id),
    }
}

/// Text for a choice outcome; `query_title` feeds the timeout hint
pub fn choice_outcome_text(
    lang: &str,
    outcome: &ChoiceOutcome,
    query_title: &str,
    primary_locale: &str,
) -> String {
    match outcome {
        ChoiceOutcome::Registered { registration } => {
            registration_text(lang, registration, primary_locale)
        }
        ChoiceOutcome::Duplicate { existing } => duplicate_text(lang, existing),
        ChoiceOutcome::Cancelled => t(lang, "cancelled", &[]),
        ChoiceOutcome::TimedOut => timeout_text(lang, query_title),
        ChoiceOutcome::Ignored => t(lang, "ignored", &[]),
        ChoiceOutcome::NoReleaseDate => t(lang, "no_release_date", &[]),
        ChoiceOutcome::TechnicalError { correlation_id } => tech_error_text(lang, correlation_id),
    }
}

/// Text for a watch-status change; `deleting` picks the delete wording
pub fn status_change_text(lang: &str, change: &StatusChange, deleting: bool) -> String {
    let (ok_key, already_key) = if deleting {
        ("del_ok", "del_already")
    } else {
        ("done_ok", "done_already")
    };
    match change {
        StatusChange::Updated { record } => t(
            lang,
            ok_key,
            &[("short_id", to_short_id(&record.id).as_str()), ("title", record.title.as_str())],
        ),
        StatusChange::AlreadyInState { record } => t(
            lang,
            already_key,
            &[("short_id", to_short_id(&record.id).as_str()), ("title", record.title.as_str())],
        ),
        StatusChange::NotFound => t(lang, "id_not_found", &[]),
        StatusChange::Ambiguous { short_ids } => {
            t(lang, "id_ambiguous", &[("sample", short_ids.join(", ").as_str())])
        }
        StatusChange::PrefixTooShort => t(lang, "prefix_too_short", &[]),
    }
}

/// Catalog listing, one record per line
pub fn list_text(lang: &str, records: &[CatalogRecord]) -> String {
    if records.is_empty() {
        return t(lang, "list_empty", &[]);
    }
    records
        .iter()
        .map(|r| {
            format!(
                "{} {} {} ({})",
                r.status.icon(),
                to_short_id(&r.id),
                r.title,
                r.year
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MovieStatus;

    fn candidate(id: i64, title: &str, year: Option<i32>, part: Option<u32>) -> Candidate {
        Candidate {
            external_id: id,
            title: title.to_string(),
            original_title: title.to_string(),
            release_year: year,
            popularity: 1.0,
            media_type: "movie".to_string(),
            collection_id: None,
            locale: None,
            part_number: part,
            norm_title: normalize(title),
            norm_original_title: normalize(title),
            score: 1.0,
        }
    }

    fn record(id: &str, title: &str, genres: Option<&str>) -> CatalogRecord {
        CatalogRecord {
            id: id.to_string(),
            external_id: Some(1),
            title: title.to_string(),
            year: 2014,
            genres: genres.map(str::to_string),
            status: MovieStatus::ToWatch,
            created_at: "2024-01-01 00:00:00".to_string(),
        }
    }

    #[test]
    fn test_resolve_language() {
        assert_eq!(resolve_language(Some("ru"), "en"), "ru");
        assert_eq!(resolve_language(Some("en-US"), "ru"), "en");
        assert_eq!(resolve_language(Some("de"), "ru"), "ru");
        assert_eq!(resolve_language(None, "ru"), "ru");
        assert_eq!(resolve_language(Some("de"), "fr"), "en");
    }

    #[test]
    fn test_placeholder_substitution_and_fallback() {
        assert_eq!(t("en", "tech_error", &[("rid", "AB12CD34")]), "⚠️ Service temporarily unavailable (id=AB12CD34)");
        assert_eq!(t("de", "cancelled", &[]), "Cancelled.");
        assert_eq!(t("ru", "cancelled", &[]), "Отменено.");
        assert_eq!(t("en", "no_such_key", &[]), "");
    }

    #[test]
    fn test_option_label() {
        let c = candidate(1, "Kill Bill: Volume 2", Some(2004), Some(2));
        assert_eq!(option_label("en", &c, false), "Kill Bill: Volume 2 (2004)");
        assert_eq!(option_label("en", &c, true), "2️⃣ Kill Bill: Volume 2 (2004)");

        let unknown = candidate(2, "Untitled", None, None);
        assert_eq!(option_label("ru", &unknown, true), "Untitled (год неизвестен)");
    }

    #[test]
    fn test_render_prompt_ends_with_cancel() {
        let plan = ChoicePlan {
            kind: PromptKind::SeriesPart,
            options: vec![
                candidate(1, "Saga Part 1", Some(2001), Some(1)),
                candidate(2, "Saga Part 2", Some(2003), Some(2)),
            ],
            top_pick_id: 1,
        };
        let query = ParsedQuery {
            title: "Saga".to_string(),
            year: None,
            part_hint: None,
        };
        let prompt = render_prompt("en", &plan, &query);
        assert_eq!(prompt.text, "Looks like it's a series 'saga'. Choose a part:");
        assert_eq!(prompt.buttons.len(), 3);
        assert_eq!(prompt.buttons[0].data, "ADD_PICK:1");
        assert!(prompt.buttons[1].label.starts_with("2️⃣"));
        assert_eq!(prompt.buttons[2].data, "ADD_CANCEL");
        assert_eq!(prompt.buttons[2].label, "Cancel");
    }

    #[test]
    fn test_year_prompt_variants() {
        let plan = ChoicePlan {
            kind: PromptKind::YearConfirm,
            options: vec![candidate(1, "Solaris", Some(1972), None)],
            top_pick_id: 1,
        };
        let mut query = ParsedQuery {
            title: "Solaris".to_string(),
            year: Some(2002),
            part_hint: None,
        };
        assert_eq!(
            render_prompt("en", &plan, &query).text,
            "No exact match for year 2002. Possible options:"
        );
        query.year = None;
        assert_eq!(
            render_prompt("en", &plan, &query).text,
            "Couldn't determine the release year. Possible options:"
        );
    }

    #[test]
    fn test_registration_text_marks_foreign_genres() {
        let registration = Registration {
            record: record("a1b2c3", "Interstellar", Some("Adventure, Drama")),
            genres_locale: Some("en".to_string()),
        };
        assert_eq!(
            registration_text("en", &registration, "ru"),
            "➕ Added #a1b2c3\n🎥 'Interstellar' (2014) — Adventure, Drama (en)"
        );
        assert_eq!(
            registration_text("en", &registration, "en"),
            "➕ Added #a1b2c3\n🎥 'Interstellar' (2014) — Adventure, Drama"
        );

        let bare = Registration {
            record: record("a1b2c3", "Interstellar", None),
            genres_locale: None,
        };
        assert!(registration_text("en", &bare, "en").ends_with("genres not specified"));
    }

    #[test]
    fn test_duplicate_text() {
        let existing = ExistingRecord {
            id: "ff00aa".to_string(),
            title: "Heat".to_string(),
            year: 1995,
        };
        assert_eq!(
            duplicate_text("en", &existing),
            "This movie is already in the list: #ff00aa — 'Heat' (1995)."
        );
        let unknown = ExistingRecord {
            id: String::new(),
            ..existing
        };
        assert_eq!(
            duplicate_text("en", &unknown),
            "This movie is already in the list (matched via TMDb)."
        );
    }

    #[test]
    fn test_status_change_text() {
        let change = StatusChange::Ambiguous {
            short_ids: vec!["#abcd01".to_string(), "#abcd02".to_string()],
        };
        assert_eq!(status_change_text("en", &change, false), "Multiple matches: #abcd01, #abcd02");
        let deleted = StatusChange::Updated {
            record: record("abcd01", "Heat", None),
        };
        assert_eq!(status_change_text("en", &deleted, true), "🗑 Deleted #abcd01\n🎬 'Heat'");
    }

    #[test]
    fn test_list_text() {
        assert_eq!(list_text("en", &[]), "List is empty.");
        let mut watched = record("0a0b0c", "Heat", None);
        watched.year = 1995;
        watched.status = MovieStatus::Watched;
        let listing = list_text("en", &[record("a1b2c3", "Interstellar", None), watched]);
        assert_eq!(listing, "🎥 #a1b2c3 Interstellar (2014)\n✅ #0a0b0c Heat (1995)");
    }
}
