//! Pure classification of the raw search text.
//!
//! A [`Query`] is recomputed on every keystroke; nothing here touches the
//! network or fails.

use std::sync::OnceLock;

use regex::Regex;

/// One or more digits optionally followed by a single letter, bounded by
/// word edges — the shape of a street number token ("742", "1550B").
fn house_number_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b\d+[A-Za-z]?\b").expect("valid regex"))
}

/// A parsed search query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    /// The text exactly as typed.
    pub raw: String,
    /// Whitespace-trimmed text, used for length gating and provider calls.
    pub trimmed: String,
    /// True when the text contains at least one decimal digit.
    pub has_house_number: bool,
    /// The first street-number token, when one can be isolated.
    pub house_number: Option<String>,
}

impl Query {
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim().to_string();
        Self {
            raw: raw.to_string(),
            has_house_number: contains_digit(&trimmed),
            house_number: extract_house_number(&trimmed),
            trimmed,
        }
    }
}

/// True iff the text contains at least one decimal digit.
#[must_use]
pub fn contains_digit(text: &str) -> bool {
    text.chars().any(|c| c.is_ascii_digit())
}

/// Extracts the first street-number token from the text, if any.
#[must_use]
pub fn extract_house_number(text: &str) -> Option<String> {
    house_number_regex()
        .find(text)
        .map(|m| m.as_str().to_string())
}

/// True iff `house_number` occurs in `candidate_text` as a whole word,
/// case-insensitively. Empty numbers never match.
#[must_use]
pub fn matches_house_number(candidate_text: &str, house_number: &str) -> bool {
    if house_number.is_empty() {
        return false;
    }
    let pattern = format!(r"(?i)\b{}\b", regex::escape(house_number));
    Regex::new(&pattern)
        .expect("valid regex")
        .is_match(candidate_text)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
