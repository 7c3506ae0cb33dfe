//! Source table, candidate eligibility, and page classification.
//!
//! Sites differ in what they expose reliably: some put machine-readable
//! publish dates on every article, others only distinguish articles from
//! listing and utility pages by URL shape and amount of text. The rules are
//! therefore keyed by source through [`SourceProfile`], and the functions in
//! this module dispatch on the profile instead of on the source itself.
//! Adding a site means adding a row to [`PROFILES`].
//!
//! | Source | Host | Fallback | Path hints | Signal |
//! |--------|------|----------|------------|--------|
//! | Music Week | `musicweek.com` | paginated `/news` listing | `/read/`, `/news/` | shape + body > 1000 chars |
//! | Music Business Worldwide | `musicbusinessworldwide.com` | RSS feed | none | date signal |

use crate::models::{PageMetadata, Source};
use std::fmt;
use url::Url;

/// Tokens marking login, account, and legal pages.
pub static SENSITIVE_TOKENS: &[&str] = &[
    "login",
    "password",
    "reset",
    "subscribe",
    "newsletter",
    "account",
    "cookie",
    "privacy",
    "terms",
    "contact",
];

/// Secondary discovery entry point for a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    /// Paginated listing; page 1 is `first_page`, page `n` substitutes `{page}` in `page_template`.
    Listing {
        first_page: &'static str,
        page_template: &'static str,
        max_pages: usize,
    },
    /// RSS or Atom feed.
    Feed { url: &'static str },
}

/// What a fetched page must show to count as an article.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalPolicy {
    /// A parsed publish timestamp or any raw date value must be present.
    DateSignal,
    /// The URL must match a path hint and the visible text must exceed
    /// `min_body_chars`; failures are reported under `reason`.
    ShapeAndRichness {
        min_body_chars: usize,
        reason: &'static str,
    },
}

/// One row of the source table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceProfile {
    pub source: Source,
    /// Accepted host: equal to this, or a subdomain of it.
    pub host_suffix: &'static str,
    pub homepage: &'static str,
    pub fallback: Fallback,
    /// Substrings one of which the URL path must contain; empty means no restriction.
    pub path_hints: &'static [&'static str],
    pub signal: SignalPolicy,
}

pub static PROFILES: [SourceProfile; 2] = [
    SourceProfile {
        source: Source::MusicWeek,
        host_suffix: "musicweek.com",
        homepage: "https://www.musicweek.com/",
        fallback: Fallback::Listing {
            first_page: "https://www.musicweek.com/news",
            page_template: "https://www.musicweek.com/news/page/{page}/",
            max_pages: 4,
        },
        path_hints: &["/read/", "/news/"],
        signal: SignalPolicy::ShapeAndRichness {
            min_body_chars: 1000,
            reason: "musicweek_not_article_like",
        },
    },
    SourceProfile {
        source: Source::MusicBusinessWorldwide,
        host_suffix: "musicbusinessworldwide.com",
        homepage: "https://www.musicbusinessworldwide.com/",
        fallback: Fallback::Feed {
            url: "https://www.musicbusinessworldwide.com/feed/",
        },
        path_hints: &[],
        signal: SignalPolicy::DateSignal,
    },
];

impl Source {
    /// The table row for this source.
    pub fn profile(self) -> &'static SourceProfile {
        match self {
            Source::MusicWeek => &PROFILES[0],
            Source::MusicBusinessWorldwide => &PROFILES[1],
        }
    }
}

/// Why a candidate was kept or dropped.
///
/// [`ReasonCode::as_str`] values are stable and double as diagnostic counter keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReasonCode {
    Ok,
    DuplicateUrl,
    FetchFailedOrRobotsBlock,
    HttpStatusNot200,
    EmptyBody,
    PageTitleForbidden,
    PageTextForbidden,
    /// Carries the per-source code from [`SignalPolicy::ShapeAndRichness`].
    NotArticleShape(&'static str),
    MissingArticleDateSignals,
    OlderThanWindow,
}

impl ReasonCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ReasonCode::Ok => "ok",
            ReasonCode::DuplicateUrl => "duplicate_url",
            ReasonCode::FetchFailedOrRobotsBlock => "fetch_failed_or_robots_block",
            ReasonCode::HttpStatusNot200 => "http_status_not_200",
            ReasonCode::EmptyBody => "empty_body",
            ReasonCode::PageTitleForbidden => "page_title_forbidden",
            ReasonCode::PageTextForbidden => "page_text_forbidden",
            ReasonCode::NotArticleShape(reason) => reason,
            ReasonCode::MissingArticleDateSignals => "missing_article_date_signals",
            ReasonCode::OlderThanWindow => "older_than_window",
        }
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of [`classify_page`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassificationDecision {
    pub is_article: bool,
    pub reason: ReasonCode,
}

impl ClassificationDecision {
    fn accept() -> Self {
        Self {
            is_article: true,
            reason: ReasonCode::Ok,
        }
    }

    fn reject(reason: ReasonCode) -> Self {
        Self {
            is_article: false,
            reason,
        }
    }
}

fn contains_sensitive_token(text: &str) -> bool {
    let low = text.to_lowercase();
    SENSITIVE_TOKENS.iter().any(|t| low.contains(t))
}

/// True when `host` is the profile's host or one of its subdomains.
pub fn host_matches(profile: &SourceProfile, host: &str) -> bool {
    let host = host.to_lowercase();
    host == profile.host_suffix
        || host
            .strip_suffix(profile.host_suffix)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

fn matches_path_hints(profile: &SourceProfile, path: &str) -> bool {
    profile.path_hints.is_empty() || profile.path_hints.iter().any(|h| path.contains(h))
}

/// Decide whether a discovered URL is worth fetching for `source`.
pub fn is_eligible_candidate(source: Source, url: &str) -> bool {
    if contains_sensitive_token(url) {
        return false;
    }
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    let profile = source.profile();
    match parsed.host_str() {
        Some(host) if host_matches(profile, host) => {}
        _ => return false,
    }
    matches_path_hints(profile, &parsed.path().to_lowercase())
}

/// Decide whether a fetched page is a retainable article.
///
/// Pure: the same inputs always produce the same decision.
pub fn classify_page(
    metadata: &PageMetadata,
    source: Source,
    url: &str,
    http_status: u16,
) -> ClassificationDecision {
    if http_status != 200 {
        return ClassificationDecision::reject(ReasonCode::HttpStatusNot200);
    }
    if contains_sensitive_token(&metadata.title) {
        return ClassificationDecision::reject(ReasonCode::PageTitleForbidden);
    }
    if contains_sensitive_token(&metadata.excerpt) {
        return ClassificationDecision::reject(ReasonCode::PageTextForbidden);
    }

    let profile = source.profile();
    match profile.signal {
        SignalPolicy::ShapeAndRichness {
            min_body_chars,
            reason,
        } => {
            let path = Url::parse(url)
                .map(|u| u.path().to_lowercase())
                .unwrap_or_default();
            let has_shape = !profile.path_hints.is_empty() && matches_path_hints(profile, &path);
            if !has_shape || metadata.body_text_chars <= min_body_chars {
                return ClassificationDecision::reject(ReasonCode::NotArticleShape(reason));
            }
        }
        SignalPolicy::DateSignal => {
            if metadata.published_at.is_none() && !metadata.date_raw_found {
                return ClassificationDecision::reject(ReasonCode::MissingArticleDateSignals);
            }
        }
    }
    ClassificationDecision::accept()
}
