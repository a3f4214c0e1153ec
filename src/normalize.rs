//! Text cleanup used when turning scraped pages into records.
//!
//! The matchers never call these; they expect records that already went
//! through them.

use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::model::Address;

static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static NON_REF_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^-a-z0-9_]").unwrap());

/// Trim and collapse every whitespace run (line breaks included) to one space.
pub fn clean_text(text: &str) -> String {
    WHITESPACE_RE.replace_all(text.trim(), " ").into_owned()
}

/// Identity slug from a display name: `"L'Écrin  Doré"` -> `"lecrin-dore"`.
pub fn create_reference(name: &str) -> String {
    let folded: String = name
        .to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect();
    let hyphenated = folded.split_whitespace().collect::<Vec<_>>().join("-");
    NON_REF_RE.replace_all(&hyphenated, "").into_owned()
}

/// Parse `"street, city, zip, country"`. Missing or blank parts stay `None`.
pub fn parse_address(raw: &str) -> Address {
    let mut parts = raw.split(',').map(|p| {
        let cleaned = clean_text(p);
        (!cleaned.is_empty()).then_some(cleaned)
    });
    Address {
        street: parts.next().flatten(),
        city: parts.next().flatten(),
        zip: parts.next().flatten(),
        country: parts.next().flatten(),
    }
}

/// `"SAINT-JEAN-DE-LUZ"` -> `"Saint-Jean-De-Luz"`.
pub fn format_city(city: &str) -> String {
    city.split('-')
        .map(|segment| {
            let lower = segment.trim().to_lowercase();
            let mut chars = lower.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}

/// National French number to international form: `"01 42 60"` -> `"+33 1 42 60"`.
/// Numbers already starting with `+` are only cleaned.
pub fn format_phone(raw: &str) -> Option<String> {
    let cleaned = clean_text(raw);
    if cleaned.is_empty() {
        return None;
    }
    if cleaned.starts_with('+') {
        return Some(cleaned);
    }
    let national = cleaned.strip_prefix('0').unwrap_or(&cleaned);
    Some(format!("+33 {}", national.trim_start()))
}
