//! The pipeline driver: discovery → canonicalize → dedupe → fetch → classify →
//! date-window filter → retained [`Article`]s.
//!
//! # Candidate lifecycle
//!
//! ```text
//! DISCOVERED → CANDIDATE → DEDUPED → FETCHED → CLASSIFIED → DATE-FILTERED → RETAINED
//!                  │                    │           │              │
//!                  └──────────── SKIPPED(reason) ◄──┴──────────────┘
//! ```
//!
//! [`process_candidate`] turns one canonical URL into an [`Outcome`]; only
//! [`Pipeline`] records outcomes, into the [`RunContext`] it owns for the run.
//! A failing candidate never stops the run.

use crate::canonical::canonicalize;
use crate::extract::extract_metadata;
use crate::fetch::Fetch;
use crate::models::{Article, Source};
use crate::policy::{classify_page, is_eligible_candidate, ReasonCode};
use crate::scrapers::{self, Discovery};
use crate::summary::summarize;
use crate::utils::sorted_counts;
use chrono::DateTime;
use chrono_tz::Tz;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, info, instrument};

/// Knobs consumed by the driver.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Pages published strictly before this instant are dropped.
    pub cutoff: DateTime<Tz>,
    /// Maximum distinct candidates fetched per source.
    pub max_per_source: usize,
    /// Excerpt sentences added to each summary after the title.
    pub bullets: usize,
}

/// Diagnostic counters for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunCounters {
    pub discovered_urls_homepage: u64,
    pub discovered_urls_fallback: u64,
    pub fetched_pages: u64,
    pub kept_articles: u64,
    pub date_missing_count: u64,
    pub fetched_by_source: BTreeMap<Source, u64>,
    pub retained_by_source: BTreeMap<Source, u64>,
    pub skipped_by_reason: HashMap<&'static str, u64>,
}

impl RunCounters {
    fn skip(&mut self, reason: ReasonCode) {
        *self.skipped_by_reason.entry(reason.as_str()).or_insert(0) += 1;
    }

    /// Skip counts by descending count, then reason name.
    pub fn sorted_skips(&self) -> Vec<(&'static str, u64)> {
        sorted_counts(&self.skipped_by_reason)
    }

    /// Total candidates skipped for any reason.
    pub fn total_skipped(&self) -> u64 {
        self.skipped_by_reason.values().sum()
    }
}

/// Mutable state for a single run: the canonical seen-set and the counters.
#[derive(Debug, Default)]
pub struct RunContext {
    seen: HashSet<String>,
    pub counters: RunCounters,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `canonical_url`; false when it was already seen this run.
    fn mark_seen(&mut self, canonical_url: &str) -> bool {
        self.seen.insert(canonical_url.to_string())
    }

    pub fn has_seen(&self, canonical_url: &str) -> bool {
        self.seen.contains(canonical_url)
    }
}

/// What happened to one candidate.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Accepted(Article),
    Skipped(ReasonCode),
}

/// Retained articles plus the counters that explain the rest.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub articles: Vec<Article>,
    pub counters: RunCounters,
}

/// Eligible, canonical candidates for `source` in discovery order.
///
/// Duplicates are kept so the driver can count them.
pub fn candidate_urls(source: Source, discovery: &Discovery) -> Vec<String> {
    discovery
        .candidates()
        .iter()
        .map(|raw| canonicalize(raw))
        .filter(|canon| !canon.is_empty() && is_eligible_candidate(source, canon))
        .collect()
}

/// Fetch, classify, and date-filter one canonical candidate.
#[instrument(level = "debug", skip(fetcher, config))]
pub async fn process_candidate<F: Fetch>(
    fetcher: &F,
    source: Source,
    url: &str,
    config: &PipelineConfig,
) -> Outcome {
    let Some(res) = fetcher.fetch(url, true).await else {
        return Outcome::Skipped(ReasonCode::FetchFailedOrRobotsBlock);
    };
    if res.status_code == 200 && res.body.trim().is_empty() {
        return Outcome::Skipped(ReasonCode::EmptyBody);
    }

    let metadata = extract_metadata(&res.body);
    let decision = classify_page(&metadata, source, url, res.status_code);
    if !decision.is_article {
        return Outcome::Skipped(decision.reason);
    }

    if let Some(published) = metadata.published_at {
        if published < config.cutoff {
            return Outcome::Skipped(ReasonCode::OlderThanWindow);
        }
    }

    let title = metadata.title.trim().to_string();
    let excerpt = metadata.excerpt.trim().to_string();
    let summary = summarize(&title, &excerpt, config.bullets);
    Outcome::Accepted(Article {
        source,
        published_date: metadata
            .published_at
            .map(|dt| dt.date_naive().to_string())
            .unwrap_or_default(),
        date_missing: metadata.published_at.is_none(),
        title,
        title_zh: String::new(),
        canonical_url: url.to_string(),
        excerpt,
        excerpt_zh: String::new(),
        summary,
        summary_zh: String::new(),
    })
}

/// Drives a run across sources.
pub struct Pipeline<'a, F> {
    fetcher: &'a F,
    config: PipelineConfig,
    ctx: RunContext,
    articles: Vec<Article>,
}

impl<'a, F: Fetch> Pipeline<'a, F> {
    pub fn new(fetcher: &'a F, config: PipelineConfig) -> Self {
        Self {
            fetcher,
            config,
            ctx: RunContext::new(),
            articles: Vec::new(),
        }
    }

    /// Discover and process every source in order, then hand back the results.
    pub async fn run(mut self, sources: &[Source]) -> RunOutput {
        for &source in sources {
            let discovery = scrapers::discover(self.fetcher, source).await;
            self.process_source(source, &discovery).await;
        }
        self.finish()
    }

    /// Process the discovered URLs of one source.
    #[instrument(level = "info", skip(self, discovery))]
    pub async fn process_source(&mut self, source: Source, discovery: &Discovery) {
        self.ctx.counters.discovered_urls_homepage += discovery.homepage.len() as u64;
        self.ctx.counters.discovered_urls_fallback += discovery.fallback.len() as u64;

        let candidates = candidate_urls(source, discovery);
        info!(%source, candidates = candidates.len(), "Candidate URLs after eligibility");

        let mut processed = 0usize;
        for url in candidates {
            if self.ctx.has_seen(&url) {
                debug!(%url, "Duplicate candidate");
                self.ctx.counters.skip(ReasonCode::DuplicateUrl);
                continue;
            }
            if processed >= self.config.max_per_source {
                debug!(%source, limit = self.config.max_per_source, "Per-source limit reached");
                break;
            }
            self.ctx.mark_seen(&url);
            processed += 1;

            let outcome = process_candidate(self.fetcher, source, &url, &self.config).await;
            self.record(source, outcome);
        }

        info!(
            %source,
            fetched = self.ctx.counters.fetched_by_source.get(&source).copied().unwrap_or(0),
            retained = self.ctx.counters.retained_by_source.get(&source).copied().unwrap_or(0),
            "Source processed"
        );
    }

    fn record(&mut self, source: Source, outcome: Outcome) {
        let counters = &mut self.ctx.counters;
        let fetched = !matches!(outcome, Outcome::Skipped(ReasonCode::FetchFailedOrRobotsBlock));
        if fetched {
            counters.fetched_pages += 1;
            *counters.fetched_by_source.entry(source).or_insert(0) += 1;
        }
        match outcome {
            Outcome::Accepted(article) => {
                if article.date_missing {
                    counters.date_missing_count += 1;
                }
                *counters.retained_by_source.entry(source).or_insert(0) += 1;
                debug!(url = %article.canonical_url, "Retained article");
                self.articles.push(article);
            }
            Outcome::Skipped(reason) => {
                debug!(%reason, "Skipped candidate");
                counters.skip(reason);
            }
        }
    }

    /// Close the run and return its output.
    pub fn finish(mut self) -> RunOutput {
        self.ctx.counters.kept_articles = self.articles.len() as u64;
        RunOutput {
            articles: self.articles,
            counters: self.ctx.counters,
        }
    }
}
