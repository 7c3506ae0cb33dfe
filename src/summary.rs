//! Deterministic bullet summaries built from a title and an excerpt.

use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;

const EMPTY_SUMMARY: &str = "- No summary available.";

static SENTENCE_END: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!?]\s+").unwrap());

/// Split text after `.`, `!`, or `?` followed by whitespace.
pub fn split_sentences(text: &str) -> Vec<String> {
    let text = text.trim();
    let mut sentences = Vec::new();
    let mut start = 0;
    for m in SENTENCE_END.find_iter(text) {
        // Keep the punctuation, drop the whitespace.
        sentences.push(&text[start..m.start() + 1]);
        start = m.end();
    }
    sentences.push(&text[start..]);
    sentences
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Title first, then up to `bullets` excerpt sentences, one `- ` line each.
///
/// Lines are deduplicated case-insensitively and keep their original order.
pub fn summarize(title: &str, excerpt: &str, bullets: usize) -> String {
    let title = title.trim();
    let mut lines: Vec<String> = Vec::new();
    if !title.is_empty() {
        lines.push(title.to_string());
    }
    let title_key = title.to_lowercase();
    let sentences = split_sentences(excerpt)
        .into_iter()
        .filter(|s| title.is_empty() || s.to_lowercase() != title_key)
        .unique_by(|s| s.to_lowercase())
        .take(bullets);
    lines.extend(sentences);

    if lines.is_empty() {
        return EMPTY_SUMMARY.to_string();
    }
    lines.iter().map(|l| format!("- {l}")).join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_sentences() {
        assert_eq!(
            split_sentences("One. Two!  Three? Four"),
            vec!["One.", "Two!", "Three?", "Four"]
        );
        assert_eq!(split_sentences("Version 2.0 ships."), vec!["Version 2.0 ships."]);
        assert!(split_sentences("   ").is_empty());
    }

    #[test]
    fn test_summary_starts_with_title() {
        let s = summarize("Label signs act", "First point. Second point. Third point.", 2);
        assert_eq!(s, "- Label signs act\n- First point.\n- Second point.");
    }

    #[test]
    fn test_summary_dedups_case_insensitively() {
        let s = summarize("Big news", "big news Again. Big News again. Other.", 5);
        assert_eq!(s, "- Big news\n- big news Again.\n- Other.");

        let s = summarize("Same.", "same. Different.", 2);
        assert_eq!(s, "- Same.\n- Different.");
    }

    #[test]
    fn test_summary_without_content() {
        assert_eq!(summarize("", "", 2), "- No summary available.");
        assert_eq!(summarize("Only title", "", 2), "- Only title");
        assert_eq!(summarize("", "Lone sentence.", 2), "- Lone sentence.");
    }

    #[test]
    fn test_summary_is_deterministic() {
        let a = summarize("T", "A. B. C.", 2);
        let b = summarize("T", "A. B. C.", 2);
        assert_eq!(a, b);
    }
}
