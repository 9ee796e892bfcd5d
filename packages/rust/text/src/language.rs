//! Coarse language guess. Only English is ever detected.

use std::sync::LazyLock;

use regex::Regex;

const ENGLISH_STOP_WORDS: &[&str] = &[
    "the", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by", "a", "an",
];

/// Number of leading words inspected.
const SAMPLE_WORDS: usize = 100;

/// Returns `Some("en")` when more than 10% of the first 100 words are common
/// English function words, `None` otherwise.
pub fn detect_language(text: &str) -> Option<String> {
    static WORD_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\b\w+\b").expect("valid regex"));

    let lowered = text.to_lowercase();
    let sample: Vec<&str> = WORD_RE
        .find_iter(&lowered)
        .take(SAMPLE_WORDS)
        .map(|m| m.as_str())
        .collect();
    if sample.is_empty() {
        return None;
    }

    let hits = sample
        .iter()
        .filter(|w| ENGLISH_STOP_WORDS.contains(*w))
        .count();
    (hits as f64 / sample.len() as f64 > 0.1).then(|| "en".to_string())
}
