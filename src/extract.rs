//! Page metadata extraction.
//!
//! Turns a fetched HTML document into a [`PageMetadata`]: title, publish date,
//! a bounded excerpt, and the amount of visible body text. Date candidates are
//! collected from `article:published_time`, JSON-LD `datePublished` (top level,
//! arrays and `@graph`), and `<time datetime>`; the first one that parses wins
//! and is normalized to Europe/London.

use crate::models::PageMetadata;
use crate::utils::{collapse_whitespace, truncate_text};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone};
use chrono_tz::Europe::London;
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Node, Selector};
use serde_json::Value;

/// Maximum excerpt length in characters.
pub const EXCERPT_MAX_CHARS: usize = 300;

static OG_TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse(r#"meta[property="og:title"]"#).unwrap());
static TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("title").unwrap());
static PUBLISHED_TIME: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"meta[property="article:published_time"]"#).unwrap());
static JSON_LD: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"script[type="application/ld+json"]"#).unwrap());
static TIME_DATETIME: Lazy<Selector> = Lazy::new(|| Selector::parse("time[datetime]").unwrap());
static OG_DESCRIPTION: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"meta[property="og:description"]"#).unwrap());
static META_DESCRIPTION: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"meta[name="description"]"#).unwrap());
static ARTICLE: Lazy<Selector> = Lazy::new(|| Selector::parse("article").unwrap());
static MAIN: Lazy<Selector> = Lazy::new(|| Selector::parse("main").unwrap());
static PARAGRAPH: Lazy<Selector> = Lazy::new(|| Selector::parse("p").unwrap());
static BODY: Lazy<Selector> = Lazy::new(|| Selector::parse("body").unwrap());

const INVISIBLE_TAGS: &[&str] = &["script", "style", "noscript", "template"];

fn meta_content(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .filter_map(|m| m.value().attr("content"))
        .map(str::trim)
        .find(|c| !c.is_empty())
        .map(str::to_string)
}

fn extract_title(document: &Html) -> String {
    meta_content(document, &OG_TITLE)
        .or_else(|| {
            document
                .select(&TITLE)
                .next()
                .map(|t| t.text().collect::<String>().trim().to_string())
        })
        .unwrap_or_default()
}

fn push_json_ld_dates(node: &Value, out: &mut Vec<String>) {
    match node {
        Value::Array(items) => items.iter().for_each(|item| push_json_ld_dates(item, out)),
        Value::Object(map) => {
            if let Some(Value::String(date)) = map.get("datePublished") {
                out.push(date.trim().to_string());
            }
            if let Some(graph) = map.get("@graph") {
                push_json_ld_dates(graph, out);
            }
        }
        _ => {}
    }
}

fn date_candidates(document: &Html) -> Vec<String> {
    let mut candidates = Vec::new();
    if let Some(published) = meta_content(document, &PUBLISHED_TIME) {
        candidates.push(published);
    }
    for script in document.select(&JSON_LD) {
        let raw = script.text().collect::<String>();
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }
        if let Ok(value) = serde_json::from_str::<Value>(raw) {
            push_json_ld_dates(&value, &mut candidates);
        }
    }
    for t in document.select(&TIME_DATETIME) {
        if let Some(dt) = t.value().attr("datetime").map(str::trim) {
            if !dt.is_empty() {
                candidates.push(dt.to_string());
            }
        }
    }
    candidates.retain(|c| !c.is_empty());
    candidates
}

fn localize(naive: NaiveDateTime) -> Option<DateTime<Tz>> {
    London.from_local_datetime(&naive).earliest()
}

/// Parse a date or timestamp in the formats news sites publish.
///
/// Values without an offset are read as London local time.
pub fn parse_published(value: &str) -> Option<DateTime<Tz>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&London));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(value) {
        return Some(dt.with_timezone(&London));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%z", "%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%d %H:%M:%S%z"] {
        if let Ok(dt) = DateTime::parse_from_str(value, fmt) {
            return Some(dt.with_timezone(&London));
        }
    }
    for fmt in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, fmt) {
            return localize(naive);
        }
    }
    for fmt in ["%Y-%m-%d", "%d %B %Y", "%B %d, %Y", "%d/%m/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(value, fmt) {
            return date.and_hms_opt(0, 0, 0).and_then(localize);
        }
    }
    None
}

fn first_paragraph(document: &Html) -> Option<String> {
    let container = document
        .select(&ARTICLE)
        .next()
        .or_else(|| document.select(&MAIN).next());
    let paragraph = match container {
        Some(c) => c.select(&PARAGRAPH).next(),
        None => document.select(&PARAGRAPH).next(),
    };
    paragraph.map(|p| collapse_whitespace(&p.text().collect::<Vec<_>>().join(" ")))
}

fn extract_excerpt(document: &Html) -> String {
    let excerpt = meta_content(document, &OG_DESCRIPTION)
        .or_else(|| meta_content(document, &META_DESCRIPTION))
        .or_else(|| first_paragraph(document))
        .unwrap_or_default();
    truncate_text(&excerpt, EXCERPT_MAX_CHARS)
}

fn collect_visible_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                out.push_str(text);
                out.push(' ');
            }
            Node::Element(e) if INVISIBLE_TAGS.contains(&e.name()) => {}
            Node::Element(_) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    collect_visible_text(child_el, out);
                }
            }
            _ => {}
        }
    }
}

/// Whitespace-collapsed visible text of the document body.
pub fn visible_text(document: &Html) -> String {
    let mut out = String::new();
    match document.select(&BODY).next() {
        Some(body) => collect_visible_text(body, &mut out),
        None => collect_visible_text(document.root_element(), &mut out),
    }
    collapse_whitespace(&out)
}

/// Extract [`PageMetadata`] from raw HTML.
pub fn extract_metadata(html: &str) -> PageMetadata {
    let document = Html::parse_document(html);
    let candidates = date_candidates(&document);
    let published_at = candidates.iter().find_map(|c| parse_published(c));

    PageMetadata {
        title: extract_title(&document),
        published_at,
        date_raw_found: !candidates.is_empty(),
        excerpt: extract_excerpt(&document),
        body_text_chars: visible_text(&document).chars().count(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARTICLE_HTML: &str = r#"<!doctype html>
<html><head>
<title>Fallback title | Music Week</title>
<meta property="og:title" content="  Label inks global deal  ">
<meta property="og:description" content="The label   signed a deal. It covers   Europe.">
<meta property="article:published_time" content="2025-06-02T09:30:00+00:00">
<script type="application/ld+json">{"@context":"https://schema.org","datePublished":"2025-06-01"}</script>
<style>.x { color: red }</style>
</head><body>
<nav>Home</nav>
<article><p>First   paragraph text.</p><p>Second.</p></article>
<script>var ignored = "a very long script body that must not count";</script>
</body></html>"#;

    #[test]
    fn test_extracts_title_excerpt_and_date() {
        let md = extract_metadata(ARTICLE_HTML);
        assert_eq!(md.title, "Label inks global deal");
        assert_eq!(md.excerpt, "The label signed a deal. It covers Europe.");
        assert!(md.date_raw_found);
        let published = md.published_at.unwrap();
        assert_eq!(published.timezone(), London);
        // 09:30 UTC is 10:30 BST.
        assert_eq!(published.format("%Y-%m-%d %H:%M").to_string(), "2025-06-02 10:30");
    }

    #[test]
    fn test_title_falls_back_to_title_tag() {
        let md = extract_metadata("<html><head><title> Plain </title></head><body></body></html>");
        assert_eq!(md.title, "Plain");
        assert!(md.published_at.is_none());
        assert!(!md.date_raw_found);
    }

    #[test]
    fn test_excerpt_falls_back_to_first_article_paragraph() {
        let html = r#"<html><body><p>Outside.</p><article><p>Inside   the story.</p></article></body></html>"#;
        assert_eq!(extract_metadata(html).excerpt, "Inside the story.");
        let html = r#"<html><head><meta name="description" content="Meta desc"></head><body><p>x</p></body></html>"#;
        assert_eq!(extract_metadata(html).excerpt, "Meta desc");
    }

    #[test]
    fn test_excerpt_is_bounded() {
        let long = "word ".repeat(200);
        let html = format!(r#"<html><head><meta property="og:description" content="{long}"></head></html>"#);
        let md = extract_metadata(&html);
        assert_eq!(md.excerpt.chars().count(), EXCERPT_MAX_CHARS);
        assert!(md.excerpt.ends_with('…'));
    }

    #[test]
    fn test_json_ld_graph_and_time_tags() {
        let html = r#"<html><head><script type="application/ld+json">
            {"@graph":[{"@type":"WebPage"},{"@type":"NewsArticle","datePublished":"2025-01-15T08:00:00Z"}]}
        </script></head><body></body></html>"#;
        let md = extract_metadata(html);
        assert_eq!(md.published_at.unwrap().format("%Y-%m-%d %H:%M").to_string(), "2025-01-15 08:00");

        let html = r#"<html><body><time datetime="2 June 2025">2 June</time></body></html>"#;
        let md = extract_metadata(html);
        assert_eq!(md.published_at.unwrap().format("%Y-%m-%d").to_string(), "2025-06-02");
    }

    #[test]
    fn test_unparseable_date_still_counts_as_signal() {
        let html = r#"<html><body><time datetime="last Tuesday">Tue</time></body></html>"#;
        let md = extract_metadata(html);
        assert!(md.published_at.is_none());
        assert!(md.date_raw_found);
    }

    #[test]
    fn test_visible_text_skips_scripts_and_styles() {
        let md = extract_metadata(ARTICLE_HTML);
        let expected = "Home First paragraph text. Second.".chars().count();
        assert_eq!(md.body_text_chars, expected);
    }

    #[test]
    fn test_parse_published_formats() {
        assert!(parse_published("Mon, 02 Jun 2025 09:30:00 +0000").is_some());
        assert!(parse_published("2025-06-02T09:30:00+0100").is_some());
        assert!(parse_published("2025-06-02 09:30:00").is_some());
        assert!(parse_published("June 2, 2025").is_some());
        assert!(parse_published("").is_none());
        assert!(parse_published("soon").is_none());
    }
}
