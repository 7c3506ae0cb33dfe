//! Data models shared across the pipeline.
//!
//! This module defines the records that flow through a run:
//! - [`Source`]: The news sites crawled each week
//! - [`FetchResult`]: One HTTP fetch attempt (live or from the disk cache)
//! - [`PageMetadata`]: What the extractor found on a fetched page
//! - [`Article`]: A retained article, the unit written to the reports
//! - [`EntityRow`] and [`InsightRow`]: Cross-article enrichment rows
//!
//! CSV column names come from the serde attributes, so the struct field order
//! is also the column order of the written files.

use chrono::DateTime;
use chrono_tz::Tz;
use serde::Serialize;
use std::fmt;

/// A news site crawled by the pipeline.
///
/// Per-site rules (host, discovery entry points, classification policy) live in
/// the source table in [`crate::policy`]; this enum only names the site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Source {
    #[serde(rename = "Music Week")]
    MusicWeek,
    #[serde(rename = "Music Business Worldwide")]
    MusicBusinessWorldwide,
}

impl Source {
    /// Every source, in crawl order.
    pub const ALL: [Source; 2] = [Source::MusicWeek, Source::MusicBusinessWorldwide];

    /// Human-readable site name used in reports and CSV rows.
    pub fn name(self) -> &'static str {
        match self {
            Source::MusicWeek => "Music Week",
            Source::MusicBusinessWorldwide => "Music Business Worldwide",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The outcome of a single fetch attempt.
///
/// Created per attempt and consumed immediately by metadata extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResult {
    /// Canonical URL that was fetched.
    pub url: String,
    /// HTTP status code (cache hits report `200`).
    pub status_code: u16,
    /// Response body; empty for error statuses.
    pub body: String,
    /// True when the body came from the disk cache.
    pub served_from_cache: bool,
}

/// Metadata extracted from a fetched HTML page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageMetadata {
    /// Page title (`og:title`, else `<title>`).
    pub title: String,
    /// First parseable publish timestamp, normalized to Europe/London.
    pub published_at: Option<DateTime<Tz>>,
    /// True when any date-looking value was present, parseable or not.
    pub date_raw_found: bool,
    /// Whitespace-collapsed lead text, bounded in length.
    pub excerpt: String,
    /// Number of characters of visible body text.
    pub body_text_chars: usize,
}

/// A retained article.
///
/// Built once when a page passes classification and the date window; only the
/// Chinese fields are filled in afterwards by the translator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Article {
    pub source: Source,
    /// ISO date (`YYYY-MM-DD`) or empty when the date is missing.
    #[serde(rename = "date")]
    pub published_date: String,
    pub date_missing: bool,
    #[serde(rename = "title_en")]
    pub title: String,
    pub title_zh: String,
    #[serde(rename = "url")]
    pub canonical_url: String,
    #[serde(rename = "excerpt_en")]
    pub excerpt: String,
    pub excerpt_zh: String,
    /// Bullet summary, one `- ` line per bullet.
    #[serde(rename = "summary_en")]
    pub summary: String,
    pub summary_zh: String,
}

impl Article {
    /// English text used for entity and insight mining.
    pub fn english_blob(&self) -> String {
        [self.title.as_str(), self.excerpt.as_str(), self.summary.as_str()].join(" ")
    }

    /// The date as shown in reports.
    pub fn display_date(&self) -> &str {
        if self.published_date.is_empty() {
            "date missing"
        } else {
            &self.published_date
        }
    }
}

/// Category assigned to an extracted entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum EntityCategory {
    Person,
    Company,
    Organization,
}

impl fmt::Display for EntityCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EntityCategory::Person => "Person",
            EntityCategory::Company => "Company",
            EntityCategory::Organization => "Organization",
        };
        f.write_str(s)
    }
}

/// An entity counted across all retained articles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityRow {
    pub entity_en: String,
    pub category: EntityCategory,
    pub count: usize,
    pub entity_zh: String,
}

/// A cross-article theme with its supporting evidence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InsightRow {
    pub insight_en: String,
    pub insight_zh: String,
    pub supporting_articles: String,
}
