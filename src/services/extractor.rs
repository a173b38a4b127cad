//! Keyword extraction from prompt text.
//!
//! A prompt is a comma-separated list of free-text terms:
//!
//! ```text
//! "piano, SOFT drums , ,jazz," -> ["Piano", "Soft drums", "Jazz"]
//! ```
//!
//! Extraction is pure: no I/O, no deduplication, order and repetition kept.

use crate::models::name_key;
use std::collections::HashSet;

/// Splits prompt text into normalized keyword tokens.
///
/// Segments are split on commas and trimmed; empty segments (including
/// those produced by leading, trailing or doubled commas) are dropped.
#[must_use]
pub fn extract_keywords(prompt: &str) -> Vec<String> {
    prompt
        .split(',')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(normalize_keyword)
        .collect()
}

/// Upper-cases the first character and lower-cases the rest.
#[must_use]
pub fn normalize_keyword(segment: &str) -> String {
    let mut chars = segment.trim().chars();
    chars.next().map_or_else(String::new, |first| {
        first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect()
    })
}

/// Removes repeated tokens, keeping the first occurrence of each.
///
/// Tokens are compared case-insensitively.
#[must_use]
pub fn distinct_keywords(tokens: &[String]) -> Vec<String> {
    let mut seen = HashSet::with_capacity(tokens.len());
    tokens
        .iter()
        .filter(|token| seen.insert(name_key(token)))
        .cloned()
        .collect()
}

/// Trims prompt text and removes a single trailing comma.
#[must_use]
pub fn clean_prompt(prompt: &str) -> String {
    let trimmed = prompt.trim();
    trimmed
        .strip_suffix(',')
        .unwrap_or(trimmed)
        .trim_end()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("Piano, soft , ,Jazz", &["Piano", "Soft", "Jazz"]; "drops empty segments")]
    #[test_case("piano,", &["Piano"]; "trailing comma")]
    #[test_case(",piano", &["Piano"]; "leading comma")]
    #[test_case("", &[]; "empty prompt")]
    #[test_case(" , ,, ", &[]; "only separators")]
    #[test_case("DEEP bass, deep BASS", &["Deep bass", "Deep bass"]; "keeps repetition")]
    #[test_case("électro, ÜBER", &["Électro", "Über"]; "non ascii")]
    fn test_extract_keywords(prompt: &str, expected: &[&str]) {
        assert_eq!(extract_keywords(prompt), expected);
    }

    #[test_case("piano", "Piano")]
    #[test_case("  LO-FI  ", "Lo-fi")]
    #[test_case("808", "808")]
    #[test_case("", "")]
    fn test_normalize_keyword(input: &str, expected: &str) {
        assert_eq!(normalize_keyword(input), expected);
    }

    #[test]
    fn test_distinct_keeps_first_occurrence() {
        let tokens = extract_keywords("Piano, Jazz, piano, Drums, JAZZ");
        assert_eq!(distinct_keywords(&tokens), vec!["Piano", "Jazz", "Drums"]);
    }

    #[test_case("  piano, jazz,  ", "piano, jazz")]
    #[test_case("piano,,", "piano,")]
    #[test_case("piano", "piano")]
    fn test_clean_prompt(input: &str, expected: &str) {
        assert_eq!(clean_prompt(input), expected);
    }
}
