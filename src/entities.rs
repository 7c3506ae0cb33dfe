//! Named-entity extraction across retained articles.
//!
//! Recognition sits behind [`EntityRecognizer`] so a statistical model can be
//! swapped in. The bundled [`CapitalizedPhraseRecognizer`] picks up runs of
//! capitalized words and well-known company names, which is enough for the
//! label-, platform-, and executive-heavy headlines these sites publish.

use crate::models::{Article, EntityCategory, EntityRow};
use crate::utils::collapse_whitespace;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

/// Substrings that mark a company regardless of what the recognizer said.
static COMPANY_HINTS: &[&str] = &[
    "universal music",
    "sony music",
    "warner music",
    "spotify",
    "apple music",
    "youtube",
    "tiktok",
    "amazon music",
    "believe",
    "beggars",
];

/// Words that make a phrase an organization rather than a person.
static ORG_WORDS: &[&str] = &[
    "records", "recordings", "music", "group", "entertainment", "publishing", "label", "labels",
    "inc", "ltd", "llc", "plc", "corp", "association", "agency", "media", "studios", "festival",
    "awards", "council", "society", "union", "bpi", "ifpi", "riaa", "prs", "ppl",
];

/// Capitalized words that start sentences or headlines but name nothing.
static LEADING_STOPWORDS: &[&str] = &[
    "A", "An", "The", "This", "That", "These", "Those", "It", "Its", "In", "On", "At", "For", "With",
    "From", "As", "By", "After", "Before", "How", "Why", "What", "When", "Who", "New", "And", "But",
    "Exclusive", "Interview", "Analysis", "Opinion", "Comment",
];

static CAPITALIZED_RUN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b[A-Z][\w&'’.-]*(?:\s+(?:(?:of|de|the)\b|&|[A-Z][\w&'’.-]*))*").unwrap()
});

/// Raw recognizer label, before company hints are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecognizedLabel {
    Person,
    Org,
}

/// Finds entity mentions in free text.
pub trait EntityRecognizer {
    fn recognize(&self, text: &str) -> Vec<(String, RecognizedLabel)>;
}

/// Heuristic recognizer over capitalized word runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct CapitalizedPhraseRecognizer;

fn trim_phrase(raw: &str) -> Option<String> {
    let mut words: Vec<&str> = raw
        .split_whitespace()
        .map(|w| w.trim_end_matches(['.', '\'', '’', '-']))
        .filter(|w| !w.is_empty())
        .collect();
    while words.first().is_some_and(|w| LEADING_STOPWORDS.contains(w)) {
        words.remove(0);
    }
    while words
        .last()
        .is_some_and(|w| matches!(*w, "of" | "de" | "the" | "&"))
    {
        words.pop();
    }
    if words.is_empty() {
        return None;
    }
    let phrase = words.join(" ");
    // A single short word is usually a sentence opener, not a name.
    if words.len() == 1 && phrase.chars().count() < 4 {
        return None;
    }
    Some(phrase)
}

impl EntityRecognizer for CapitalizedPhraseRecognizer {
    fn recognize(&self, text: &str) -> Vec<(String, RecognizedLabel)> {
        CAPITALIZED_RUN
            .find_iter(text)
            .filter_map(|m| trim_phrase(m.as_str()))
            .map(|phrase| {
                let words: Vec<&str> = phrase.split_whitespace().collect();
                let org_like = words
                    .iter()
                    .any(|w| ORG_WORDS.contains(&w.to_lowercase().as_str()))
                    || words.iter().any(|w| w.len() > 1 && w.chars().all(|c| c.is_ascii_uppercase()));
                let label = if !org_like && (2..=3).contains(&words.len()) {
                    RecognizedLabel::Person
                } else {
                    RecognizedLabel::Org
                };
                (phrase, label)
            })
            .collect()
    }
}

/// Final category for an entity name.
pub fn label_entity(name: &str, label: RecognizedLabel) -> EntityCategory {
    if label == RecognizedLabel::Person {
        return EntityCategory::Person;
    }
    let low = name.to_lowercase();
    if COMPANY_HINTS.iter().any(|hint| low.contains(hint)) {
        EntityCategory::Company
    } else {
        EntityCategory::Organization
    }
}

/// Count entities across `articles`, most frequent first, ties by name.
pub fn extract_entities<R: EntityRecognizer>(articles: &[Article], recognizer: &R) -> Vec<EntityRow> {
    let mut counter: HashMap<(String, EntityCategory), usize> = HashMap::new();
    for article in articles {
        let text = article.english_blob();
        let text = text.trim();
        if text.is_empty() {
            continue;
        }
        for (name, label) in recognizer.recognize(text) {
            let name = collapse_whitespace(&name);
            if name.chars().count() < 2 {
                continue;
            }
            let category = label_entity(&name, label);
            *counter.entry((name, category)).or_insert(0) += 1;
        }
    }

    let mut rows: Vec<EntityRow> = counter
        .into_iter()
        .map(|((entity_en, category), count)| EntityRow {
            entity_en,
            category,
            count,
            entity_zh: String::new(),
        })
        .collect();
    rows.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.entity_en.cmp(&b.entity_en))
            .then_with(|| a.category.cmp(&b.category))
    });
    rows
}
