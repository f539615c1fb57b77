//! Title normalization and installment-number extraction
//!
//! [`normalize`] and [`extract_part_number`] share one keyword vocabulary
//! ([`PART_KEYWORDS`]) and one numeral table ([`ROMAN_NUMERALS`]), so a
//! suffix recognized by one is recognized by the other.

use once_cell::sync::Lazy;
use regex::Regex;

/// Words that introduce an installment number
pub const PART_KEYWORDS: &[&str] = &[
    "part", "chapter", "volume", "season", "сезон", "фильм", "film",
];

/// Roman numerals accepted as installment numbers (I-XX)
pub const ROMAN_NUMERALS: &[&str] = &[
    "I", "II", "III", "IV", "V", "VI", "VII", "VIII", "IX", "X", "XI", "XII", "XIII", "XIV",
    "XV", "XVI", "XVII", "XVIII", "XIX", "XX",
];

/// Keycap markers for installments 1-10
const KEYCAP_MARKERS: &[&str] = &[
    "1️⃣", "2️⃣", "3️⃣", "4️⃣", "5️⃣", "6️⃣", "7️⃣", "8️⃣", "9️⃣", "🔟",
];

const QUOTE_CHARS: &[char] = &['"', '\'', '«', '»', '“', '”', '„'];

static PART_PATTERN: Lazy<Regex> = Lazy::new(|| {
    let pattern = format!(r"(?i)\b(?:{})\s*([ivxlcdm]+|\d+)\b", PART_KEYWORDS.join("|"));
    Regex::new(&pattern).expect("part keyword regex should compile")
});

/// Canonical form of a title for equality and similarity checks
///
/// **Algorithm:**
/// 1. Lowercase, hyphens become spaces, quote characters are dropped
/// 2. Remaining punctuation becomes spaces; whitespace is collapsed
/// 3. While the last two tokens are `<part keyword> <numeral>`, drop them
///
/// Idempotent: `normalize(normalize(t)) == normalize(t)`.
pub fn normalize(title: &str) -> String {
    let lowered: String = title
        .to_lowercase()
        .chars()
        .filter(|c| !QUOTE_CHARS.contains(c))
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();

    let mut tokens: Vec<&str> = lowered.split_whitespace().collect();
    while tokens.len() >= 2
        && is_part_keyword(tokens[tokens.len() - 2])
        && parse_part_token(tokens[tokens.len() - 1]).is_some()
    {
        tokens.truncate(tokens.len() - 2);
    }
    tokens.join(" ")
}

/// Installment number from the first `<keyword><space?><numeral>` in `title`
pub fn extract_part_number(title: &str) -> Option<u32> {
    PART_PATTERN
        .captures_iter(title)
        .filter_map(|caps| caps.get(1))
        .find_map(|m| parse_part_token(m.as_str()))
}

/// True if `token` is a part keyword (case-insensitive)
pub fn is_part_keyword(token: &str) -> bool {
    let lowered = token.to_lowercase();
    PART_KEYWORDS.iter().any(|k| *k == lowered)
}

/// Parse an arabic (positive) or roman (I-XX) numeral
pub fn parse_part_token(token: &str) -> Option<u32> {
    if !token.is_empty() && token.chars().all(|c| c.is_ascii_digit()) {
        return token.parse().ok().filter(|n| *n > 0);
    }
    let upper = token.to_uppercase();
    ROMAN_NUMERALS
        .iter()
        .position(|r| *r == upper)
        .map(|idx| idx as u32 + 1)
}

/// Keycap marker for an installment number; empty outside 1-10
pub fn part_marker(part: Option<u32>) -> &'static str {
    part.and_then(|n| KEYCAP_MARKERS.get((n as usize).checked_sub(1)?))
        .copied()
        .unwrap_or("")
}

/// True if `title` carries a standalone numeral equal to `part`
///
/// Tokens are compared whole, so "2049" never matches 2.
pub fn has_part_marker(title: &str, part: u32) -> bool {
    if extract_part_number(title) == Some(part) {
        return true;
    }
    title
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .any(|t| parse_part_token(t) == Some(part))
}

/// Normalized edit-distance similarity in `[0.0, 1.0]` between two normalized titles
pub fn title_similarity(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(a, b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_basic() {
        assert_eq!(normalize("  The   Matrix "), "the matrix");
        assert_eq!(normalize("Spider-Man"), "spider man");
        assert_eq!(normalize("«Брат»"), "брат");
        assert_eq!(normalize("\"Heat\""), "heat");
        assert_eq!(normalize("Dune: Part 2"), "dune");
    }

    #[test]
    fn test_normalize_strips_trailing_part_pair() {
        assert_eq!(normalize("Kill Bill Volume 2"), "kill bill");
        assert_eq!(normalize("Harry Potter part II"), "harry potter");
        assert_eq!(normalize("Сезон 3"), "");
        // Keyword without numeral stays
        assert_eq!(normalize("The Last Film"), "the last film");
        // Numeral not preceded by a keyword stays
        assert_eq!(normalize("Blade Runner 2049"), "blade runner 2049");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for title in [
            "Dune: Part 2",
            "Kill Bill: Vol. 1",
            "Film Part 2 Part 3",
            "Ёлки  -  2",
            "“Home Alone” II",
            "Part",
        ] {
            let once = normalize(title);
            assert_eq!(normalize(&once), once, "not idempotent for {:?}", title);
        }
    }

    #[test]
    fn test_extract_part_number() {
        assert_eq!(extract_part_number("Dune: Part Two"), None);
        assert_eq!(extract_part_number("Dune: Part 2"), Some(2));
        assert_eq!(extract_part_number("Harry Potter Part II"), Some(2));
        assert_eq!(extract_part_number("Kill Bill: Volume 1"), Some(1));
        assert_eq!(extract_part_number("Гарри Поттер: Фильм 3"), Some(3));
        assert_eq!(extract_part_number("Chapter3"), Some(3));
        assert_eq!(extract_part_number("Avatar"), None);
        assert_eq!(extract_part_number("Part MIX"), None);
    }

    #[test]
    fn test_parse_part_token() {
        assert_eq!(parse_part_token("3"), Some(3));
        assert_eq!(parse_part_token("xx"), Some(20));
        assert_eq!(parse_part_token("XXI"), None);
        assert_eq!(parse_part_token("0"), None);
        assert_eq!(parse_part_token("two"), None);
        assert_eq!(parse_part_token(""), None);
    }

    #[test]
    fn test_part_marker() {
        assert_eq!(part_marker(Some(1)), "1️⃣");
        assert_eq!(part_marker(Some(10)), "🔟");
        assert_eq!(part_marker(Some(11)), "");
        assert_eq!(part_marker(Some(0)), "");
        assert_eq!(part_marker(None), "");
    }

    #[test]
    fn test_marker_of_extracted_part_is_stable_under_normalization() {
        let title = "John Wick: Chapter 3";
        let marker = part_marker(extract_part_number(title));
        assert_eq!(marker, "3️⃣");
        assert_eq!(normalize(&normalize(title)), normalize(title));
        assert_eq!(part_marker(extract_part_number(title)), marker);
    }

    #[test]
    fn test_has_part_marker() {
        assert!(has_part_marker("Shrek 2", 2));
        assert!(has_part_marker("Rocky II", 2));
        assert!(has_part_marker("Kill Bill: Vol. 2", 2));
        assert!(!has_part_marker("Blade Runner 2049", 2));
        assert!(!has_part_marker("Avatar", 1));
    }

    #[test]
    fn test_title_similarity() {
        assert_eq!(title_similarity("matrix", "matrix"), 1.0);
        assert!(title_similarity("the matrix", "matrix") > 0.5);
        assert!(title_similarity("matrix", "avatar") < 0.5);
    }
}
