//! Cross-article themes mined with TF-IDF.
//!
//! Each article's English text becomes one document. Terms are unigrams and
//! bigrams after English stop-word removal, weighted with smoothed idf and
//! L2-normalized per document, then ranked by their mean weight over the
//! week. A term turns into an insight once at least two articles mention it.

use crate::models::{Article, InsightRow};
use crate::utils::collapse_whitespace;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;

pub const DEFAULT_MAX_INSIGHTS: usize = 10;

const MAX_SUPPORTING: usize = 5;

pub const NO_ARTICLES: &str = "Insufficient evidence: no articles were retained this week.";
pub const NO_OVERLAP: &str =
    "Insufficient evidence: article overlap across themes is too limited this week.";

/// Terms too generic for these two sites to count as a theme.
static DOMAIN_STOP_TERMS: &[&str] = &[
    "music", "week", "business", "worldwide", "says", "new", "will", "said", "industry",
];

static TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\w\w+\b").unwrap());

static ENGLISH_STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "a", "about", "above", "across", "after", "afterwards", "again", "against", "all", "almost",
        "alone", "along", "already", "also", "although", "always", "am", "among", "amongst", "an",
        "and", "another", "any", "anyhow", "anyone", "anything", "anyway", "anywhere", "are",
        "around", "as", "at", "back", "be", "became", "because", "become", "becomes", "becoming",
        "been", "before", "beforehand", "behind", "being", "below", "beside", "besides", "between",
        "beyond", "both", "but", "by", "can", "cannot", "could", "did", "do", "does", "done", "down",
        "due", "during", "each", "eg", "either", "else", "elsewhere", "enough", "etc", "even",
        "ever", "every", "everyone", "everything", "everywhere", "except", "few", "first", "for",
        "former", "formerly", "from", "further", "get", "give", "go", "had", "has", "have", "he",
        "hence", "her", "here", "hereafter", "hereby", "herein", "hers", "herself", "him",
        "himself", "his", "how", "however", "i", "ie", "if", "in", "indeed", "into", "is", "it",
        "its", "itself", "just", "last", "latter", "least", "less", "ltd", "made", "many", "may",
        "me", "meanwhile", "might", "more", "moreover", "most", "mostly", "much", "must", "my",
        "myself", "namely", "neither", "never", "nevertheless", "next", "no", "nobody", "none",
        "nor", "not", "nothing", "now", "nowhere", "of", "off", "often", "on", "once", "one",
        "only", "onto", "or", "other", "others", "otherwise", "our", "ours", "ourselves", "out",
        "over", "own", "part", "per", "perhaps", "please", "put", "rather", "re", "same", "see",
        "seem", "seemed", "seeming", "seems", "several", "she", "should", "since", "so", "some",
        "somehow", "someone", "something", "sometime", "sometimes", "somewhere", "still", "such",
        "than", "that", "the", "their", "them", "themselves", "then", "thence", "there",
        "thereafter", "thereby", "therefore", "therein", "thereupon", "these", "they", "this",
        "those", "though", "through", "throughout", "thru", "thus", "to", "together", "too",
        "toward", "towards", "under", "until", "up", "upon", "us", "very", "via", "was", "we",
        "well", "were", "what", "whatever", "when", "whence", "whenever", "where", "whereafter",
        "whereas", "whereby", "wherein", "whereupon", "wherever", "whether", "which", "while",
        "who", "whoever", "whole", "whom", "whose", "why", "will", "with", "within", "without",
        "would", "yet", "you", "your", "yours", "yourself", "yourselves",
    ]
    .into_iter()
    .collect()
});

/// Lowercase unigrams and bigrams of `doc`, stop words removed first.
fn terms(doc: &str) -> Vec<String> {
    let lower = doc.to_lowercase();
    let tokens: Vec<&str> = TOKEN
        .find_iter(&lower)
        .map(|m| m.as_str())
        .filter(|t| !ENGLISH_STOP_WORDS.contains(t))
        .collect();
    let mut out: Vec<String> = tokens.iter().map(|t| t.to_string()).collect();
    out.extend(tokens.windows(2).map(|w| format!("{} {}", w[0], w[1])));
    out
}

/// Mean L2-normalized TF-IDF weight of every term over `docs`.
pub fn mean_tfidf(docs: &[String]) -> BTreeMap<String, f64> {
    let counts: Vec<HashMap<String, f64>> = docs
        .iter()
        .map(|d| {
            let mut tf = HashMap::new();
            for t in terms(d) {
                *tf.entry(t).or_insert(0.0) += 1.0;
            }
            tf
        })
        .collect();

    let mut df: HashMap<&str, f64> = HashMap::new();
    for tf in &counts {
        for term in tf.keys() {
            *df.entry(term.as_str()).or_insert(0.0) += 1.0;
        }
    }

    let n = docs.len() as f64;
    let mut sums: BTreeMap<String, f64> = BTreeMap::new();
    for tf in &counts {
        let weighted: Vec<(&String, f64)> = tf
            .iter()
            .map(|(term, count)| {
                let idf = ((1.0 + n) / (1.0 + df[term.as_str()])).ln() + 1.0;
                (term, count * idf)
            })
            .collect();
        let norm = weighted.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
        for (term, w) in weighted {
            let score = if norm > 0.0 { w / norm } else { 0.0 };
            *sums.entry(term.clone()).or_insert(0.0) += score;
        }
    }
    if n > 0.0 {
        sums.values_mut().for_each(|v| *v /= n);
    }
    sums
}

fn mentions_stop_term(term: &str) -> bool {
    term.split_whitespace().any(|t| DOMAIN_STOP_TERMS.contains(&t))
}

fn fallback(text: &str) -> Vec<InsightRow> {
    vec![InsightRow {
        insight_en: text.to_string(),
        insight_zh: String::new(),
        supporting_articles: String::new(),
    }]
}

fn reference(article: &Article) -> String {
    format!("{} ({} | {})", article.title, article.source, article.display_date())
}

/// Mine up to `max_insights` themes shared by at least two articles.
pub fn build_insights(articles: &[Article], max_insights: usize) -> Vec<InsightRow> {
    if articles.is_empty() {
        return fallback(NO_ARTICLES);
    }

    let blobs: Vec<String> = articles
        .iter()
        .map(|a| collapse_whitespace(&a.english_blob()))
        .collect();
    let docs: Vec<String> = blobs
        .iter()
        .map(|b| if b.is_empty() { "empty".to_string() } else { b.clone() })
        .collect();

    // BTreeMap iteration is alphabetical, so the stable sort breaks score ties by term.
    let mut ranked: Vec<(String, f64)> = mean_tfidf(&docs).into_iter().collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    let top_terms: Vec<String> = ranked
        .into_iter()
        .filter(|(term, score)| *score > 0.0 && !mentions_stop_term(term))
        .map(|(term, _)| term)
        .take(max_insights * 2)
        .collect();
    debug!(terms = ?top_terms, "Top TF-IDF terms");

    let lowered: Vec<String> = blobs.iter().map(|b| b.to_lowercase()).collect();
    let mut insights = Vec::new();
    for term in &top_terms {
        let supports: Vec<&Article> = articles
            .iter()
            .zip(&lowered)
            .filter(|(_, blob)| blob.contains(term.as_str()))
            .map(|(a, _)| a)
            .take(MAX_SUPPORTING)
            .collect();
        if supports.len() < 2 {
            continue;
        }
        insights.push(InsightRow {
            insight_en: format!(
                "Theme '{term}' appeared across {} articles, suggesting sustained weekly attention.",
                supports.len()
            ),
            insight_zh: String::new(),
            supporting_articles: supports.iter().map(|a| reference(a)).collect::<Vec<_>>().join(" ; "),
        });
        if insights.len() >= max_insights {
            break;
        }
    }

    if insights.is_empty() {
        return fallback(NO_OVERLAP);
    }
    insights
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Source;

    fn article(source: Source, title: &str, date: &str) -> Article {
        Article {
            source,
            published_date: date.to_string(),
            date_missing: date.is_empty(),
            title: title.to_string(),
            title_zh: String::new(),
            canonical_url: format!("https://www.musicweek.com/news/read/{}", title.len()),
            excerpt: String::new(),
            excerpt_zh: String::new(),
            summary: String::new(),
            summary_zh: String::new(),
        }
    }

    #[test]
    fn test_terms_drop_stop_words_before_bigrams() {
        assert_eq!(
            terms("The royalties of streaming"),
            vec!["royalties", "streaming", "royalties streaming"]
        );
    }

    #[test]
    fn test_rows_are_normalized() {
        let docs = vec!["vinyl sales".to_string()];
        let scores = mean_tfidf(&docs);
        let norm: f64 = scores.values().map(|v| v * v).sum();
        assert!((norm - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_shared_terms_become_insights() {
        let articles = vec![
            article(Source::MusicWeek, "Streaming royalties rise", "2025-06-02"),
            article(Source::MusicBusinessWorldwide, "Streaming royalties debate", ""),
            article(Source::MusicWeek, "Vinyl sales climb", "2025-06-03"),
        ];
        let insights = build_insights(&articles, 10);
        let texts: Vec<&str> = insights.iter().map(|i| i.insight_en.as_str()).collect();
        assert_eq!(insights.len(), 3);
        assert!(texts.contains(
            &"Theme 'streaming royalties' appeared across 2 articles, suggesting sustained weekly attention."
        ));
        assert!(texts.iter().all(|t| !t.contains("vinyl")));
        assert_eq!(
            insights[0].supporting_articles,
            "Streaming royalties rise (Music Week | 2025-06-02) ; \
             Streaming royalties debate (Music Business Worldwide | date missing)"
        );
    }

    #[test]
    fn test_domain_stop_terms_never_become_themes() {
        let articles = vec![
            article(Source::MusicWeek, "Music Week awards", "2025-06-02"),
            article(Source::MusicWeek, "Music Week awards", "2025-06-02"),
        ];
        let insights = build_insights(&articles, 10);
        assert!(insights.iter().all(|i| !i.insight_en.contains("music")));
        assert_eq!(insights[0].insight_en, "Theme 'awards' appeared across 2 articles, suggesting sustained weekly attention.");
    }

    #[test]
    fn test_insufficient_evidence_rows() {
        assert_eq!(build_insights(&[], 10)[0].insight_en, NO_ARTICLES);
        let single = vec![article(Source::MusicWeek, "Vinyl sales climb", "2025-06-02")];
        let insights = build_insights(&single, 10);
        assert_eq!(insights.len(), 1);
        assert_eq!(insights[0].insight_en, NO_OVERLAP);
        assert!(insights[0].supporting_articles.is_empty());
    }

    #[test]
    fn test_cap_on_insights() {
        let articles = vec![
            article(Source::MusicWeek, "alpha beta gamma delta", "2025-06-02"),
            article(Source::MusicWeek, "alpha beta gamma delta", "2025-06-02"),
        ];
        assert_eq!(build_insights(&articles, 2).len(), 2);
    }
}
