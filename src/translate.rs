//! English → Chinese translation through an OpenAI-compatible LLM.
//!
//! # Architecture
//!
//! - [`AskAsync`]: Core trait defining async LLM interaction
//! - [`LlmBackend`]: Owns the `awful_aj` configuration and translation template
//! - [`RetryAsk`]: Decorator that adds retry logic to any `AskAsync` implementation
//! - [`Translator`]: What the rest of the application talks to
//!
//! A translator whose backend could not be bootstrapped is *unavailable*: every
//! call returns an empty string and the report says Chinese output is missing.
//! Individual failures also degrade to an empty string; translation never
//! fails a run.
//!
//! # Retry Strategy
//!
//! - Maximum 5 retry attempts
//! - Exponential backoff starting at 1 second
//! - Maximum delay capped at 30 seconds
//! - Random jitter (0-250ms) added to prevent thundering herd

use crate::models::{Article, EntityRow, InsightRow};
use crate::utils::truncate_for_log;
use awful_aj::api::ask;
use awful_aj::{config, config::AwfulJadeConfig, config_dir, template, template::ChatTemplate};
use futures::stream::{self, StreamExt};
use rand::{Rng, rng};
use std::error::Error;
use std::fmt;
use std::time::{Duration as StdDuration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

/// Name of the `awful_aj` template holding the translation prompt.
pub const TRANSLATION_TEMPLATE: &str = "translate_en_zh";

/// Requests in flight at once when translating a batch.
const TRANSLATION_CONCURRENCY: usize = 4;

/// Trait for async LLM interaction.
///
/// Implementors of this trait can send text to an LLM and receive a response.
/// This abstraction allows for different LLM backends or decorators (like retry logic).
pub trait AskAsync {
    /// The type of response returned by the LLM.
    type Response;

    /// Send text to the LLM and receive a response.
    async fn ask(&self, text: &str) -> Result<Self::Response, Box<dyn Error>>;
}

/// Wrapper that adds exponential backoff retry logic to any [`AskAsync`] implementation.
///
/// # Backoff Strategy
///
/// The delay between retries follows this formula:
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
/// ```
pub struct RetryAsk<T> {
    /// The underlying LLM client to wrap.
    inner: T,
    /// Maximum number of retry attempts before giving up.
    max_retries: usize,
    /// Initial delay between retries (doubles with each attempt).
    base_delay: StdDuration,
    /// Maximum delay cap to prevent excessive waiting.
    max_delay: StdDuration,
}

impl<T> RetryAsk<T>
where
    T: AskAsync,
{
    /// Create a new retry wrapper around an existing [`AskAsync`] implementation.
    pub fn new(inner: T, max_retries: usize, base_delay: StdDuration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: StdDuration::from_secs(30),
        }
    }

    /// Delay before retry number `attempt` (1-based), without jitter.
    fn backoff(&self, attempt: usize) -> StdDuration {
        let shift = (attempt.saturating_sub(1)).min(31) as u32;
        self.base_delay.saturating_mul(1u32 << shift).min(self.max_delay)
    }
}

impl<T> fmt::Debug for RetryAsk<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryAsk")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> AskAsync for RetryAsk<T>
where
    T: AskAsync + fmt::Debug,
{
    type Response = T::Response;

    #[instrument(level = "debug", skip_all)]
    async fn ask(&self, text: &str) -> Result<Self::Response, Box<dyn Error>> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            let attempt_t0 = Instant::now();
            match self.inner.ask(text).await {
                Ok(resp) => return Ok(resp),
                Err(e) => {
                    attempt += 1;
                    let attempt_dt = attempt_t0.elapsed();
                    let total_dt = total_t0.elapsed();

                    if attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_attempt = attempt_dt.as_millis(),
                            elapsed_ms_total = total_dt.as_millis(),
                            error = %e,
                            "ask() exhausted retries"
                        );
                        return Err(e);
                    }

                    let jitter_ms: u64 = rng().random_range(0..=250);
                    let delay = self.backoff(attempt) + StdDuration::from_millis(jitter_ms);

                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_attempt = attempt_dt.as_millis(),
                        elapsed_ms_total = total_dt.as_millis(),
                        ?delay,
                        error = %e,
                        "ask() attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

/// `awful_aj` client configured with the translation template.
#[derive(Debug)]
pub struct LlmBackend {
    /// LLM configuration (API keys, endpoints, model settings).
    pub config: AwfulJadeConfig,
    /// Chat template carrying the translation instructions.
    pub template: ChatTemplate,
}

impl LlmBackend {
    /// Load the LLM configuration and translation template.
    ///
    /// `config_path` defaults to `config.yaml` in the `awful_aj` config directory.
    #[instrument(level = "info")]
    pub async fn load(config_path: Option<&str>) -> Result<Self, Box<dyn Error>> {
        let config_path = match config_path {
            Some(p) => p.to_string(),
            None => config_dir()?.join("config.yaml").to_string_lossy().to_string(),
        };
        let config = config::load_config(&config_path)?;
        info!(%config_path, "Loaded LLM configuration");
        let template = template::load_template(TRANSLATION_TEMPLATE).await?;
        info!(template = TRANSLATION_TEMPLATE, "Loaded translation template");
        Ok(Self { config, template })
    }
}

impl AskAsync for LlmBackend {
    type Response = String;

    #[instrument(level = "debug", skip_all)]
    async fn ask(&self, text: &str) -> Result<Self::Response, Box<dyn Error>> {
        let t0 = Instant::now();
        let res = ask(&self.config, text.to_string(), &self.template, None, None).await;
        if let Err(e) = &res {
            warn!(elapsed_ms = t0.elapsed().as_millis(), error = %e, "API call failed");
        }
        res
    }
}

/// EN → ZH translator over any [`AskAsync`] backend.
#[derive(Debug)]
pub struct Translator<A> {
    backend: Option<A>,
}

impl<A> Translator<A>
where
    A: AskAsync<Response = String>,
{
    pub fn new(backend: A) -> Self {
        Self {
            backend: Some(backend),
        }
    }

    /// A translator that returns empty strings.
    pub fn unavailable() -> Self {
        Self { backend: None }
    }

    pub fn available(&self) -> bool {
        self.backend.is_some()
    }

    /// Translate `text`; empty input, an unavailable backend, or a failure give `""`.
    pub async fn translate_text(&self, text: &str) -> String {
        let Some(backend) = &self.backend else {
            return String::new();
        };
        if text.trim().is_empty() {
            return String::new();
        }
        debug!(text = %truncate_for_log(text, 80), "Translating");
        match backend.ask(text).await {
            Ok(translated) => translated.trim().to_string(),
            Err(e) => {
                warn!(error = %e, text = %truncate_for_log(text, 80), "Translation failed");
                String::new()
            }
        }
    }

    /// Fill the Chinese title, excerpt, and summary of every article.
    #[instrument(level = "info", skip_all, fields(count = articles.len()))]
    pub async fn translate_articles(&self, articles: &mut [Article]) {
        if !self.available() {
            return;
        }
        let translated: Vec<(String, String, String)> = stream::iter(articles.iter())
            .map(|a| async move {
                (
                    self.translate_text(&a.title).await,
                    self.translate_text(&a.excerpt).await,
                    self.translate_text(&a.summary).await,
                )
            })
            .buffered(TRANSLATION_CONCURRENCY)
            .collect()
            .await;
        for (article, (title, excerpt, summary)) in articles.iter_mut().zip(translated) {
            article.title_zh = title;
            article.excerpt_zh = excerpt;
            article.summary_zh = summary;
        }
        info!("Articles translated");
    }

    /// Fill `entity_zh` for every entity row.
    #[instrument(level = "info", skip_all, fields(count = entities.len()))]
    pub async fn translate_entities(&self, entities: &mut [EntityRow]) {
        if !self.available() {
            return;
        }
        let translated: Vec<String> = stream::iter(entities.iter())
            .map(|e| self.translate_text(&e.entity_en))
            .buffered(TRANSLATION_CONCURRENCY)
            .collect()
            .await;
        for (row, zh) in entities.iter_mut().zip(translated) {
            row.entity_zh = zh;
        }
    }

    /// Fill `insight_zh` for every insight row.
    #[instrument(level = "info", skip_all, fields(count = insights.len()))]
    pub async fn translate_insights(&self, insights: &mut [InsightRow]) {
        if !self.available() {
            return;
        }
        let translated: Vec<String> = stream::iter(insights.iter())
            .map(|i| self.translate_text(&i.insight_en))
            .buffered(TRANSLATION_CONCURRENCY)
            .collect()
            .await;
        for (row, zh) in insights.iter_mut().zip(translated) {
            row.insight_zh = zh;
        }
    }
}

/// Build the production translator, or an unavailable one when disabled or
/// when the LLM configuration cannot be loaded.
pub async fn bootstrap(enabled: bool, config_path: Option<&str>) -> Translator<RetryAsk<LlmBackend>> {
    if !enabled {
        info!("Translation disabled by flag");
        return Translator::unavailable();
    }
    match LlmBackend::load(config_path).await {
        Ok(backend) => Translator::new(RetryAsk::new(backend, 5, StdDuration::from_secs(1))),
        Err(e) => {
            warn!(error = %e, "Translation unavailable; Chinese fields will be empty");
            Translator::unavailable()
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::AskAsync;
    use std::error::Error;

    /// Backend that tags its input, or fails on demand.
    #[derive(Debug, Default)]
    pub struct EchoBackend {
        pub fail: bool,
    }

    impl AskAsync for EchoBackend {
        type Response = String;

        async fn ask(&self, text: &str) -> Result<String, Box<dyn Error>> {
            if self.fail {
                Err("backend down".into())
            } else {
                Ok(format!(" zh:{text} "))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::EchoBackend;
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Default)]
    struct Flaky {
        calls: AtomicUsize,
        fail_first: usize,
    }

    impl AskAsync for Flaky {
        type Response = String;

        async fn ask(&self, _text: &str) -> Result<String, Box<dyn Error>> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.fail_first {
                Err(format!("failure {n}").into())
            } else {
                Ok("ok".to_string())
            }
        }
    }

    #[tokio::test]
    async fn test_translator_trims_backend_output() {
        let t = Translator::new(EchoBackend::default());
        assert!(t.available());
        assert_eq!(t.translate_text("hello").await, "zh:hello");
        assert_eq!(t.translate_text("   ").await, "");
    }

    #[tokio::test]
    async fn test_unavailable_and_failing_backends_give_empty_strings() {
        let t: Translator<EchoBackend> = Translator::unavailable();
        assert!(!t.available());
        assert_eq!(t.translate_text("hello").await, "");

        let t = Translator::new(EchoBackend { fail: true });
        assert_eq!(t.translate_text("hello").await, "");
    }

    #[tokio::test]
    async fn test_retry_recovers_after_failures() {
        let api = RetryAsk::new(
            Flaky {
                fail_first: 2,
                ..Flaky::default()
            },
            5,
            StdDuration::from_millis(1),
        );
        assert_eq!(api.ask("x").await.unwrap(), "ok");
        assert_eq!(api.inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_gives_up() {
        let api = RetryAsk::new(
            Flaky {
                fail_first: usize::MAX,
                ..Flaky::default()
            },
            1,
            StdDuration::from_millis(1),
        );
        assert!(api.ask("x").await.is_err());
        assert_eq!(api.inner.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let api = RetryAsk::new(EchoBackend::default(), 5, StdDuration::from_secs(1));
        assert_eq!(api.backoff(1), StdDuration::from_secs(1));
        assert_eq!(api.backoff(3), StdDuration::from_secs(4));
        assert_eq!(api.backoff(10), StdDuration::from_secs(30));
    }

    fn article() -> Article {
        Article {
            source: crate::models::Source::MusicWeek,
            published_date: "2025-06-02".to_string(),
            date_missing: false,
            title: "Vinyl sales climb".to_string(),
            title_zh: String::new(),
            canonical_url: "https://www.musicweek.com/news/read/vinyl/1".to_string(),
            excerpt: String::new(),
            excerpt_zh: String::new(),
            summary: "- Vinyl sales climb".to_string(),
            summary_zh: String::new(),
        }
    }

    #[tokio::test]
    async fn test_translate_batches_keep_order() {
        let t = Translator::new(EchoBackend::default());
        let mut articles = vec![article(), article()];
        articles[1].title = "Second".to_string();
        t.translate_articles(&mut articles).await;
        assert_eq!(articles[0].title_zh, "zh:Vinyl sales climb");
        assert_eq!(articles[0].excerpt_zh, "");
        assert_eq!(articles[0].summary_zh, "zh:- Vinyl sales climb");
        assert_eq!(articles[1].title_zh, "zh:Second");

        let mut insights = vec![InsightRow {
            insight_en: "Theme".to_string(),
            insight_zh: String::new(),
            supporting_articles: String::new(),
        }];
        t.translate_insights(&mut insights).await;
        assert_eq!(insights[0].insight_zh, "zh:Theme");

        let mut entities = vec![EntityRow {
            entity_en: "Spotify".to_string(),
            category: crate::models::EntityCategory::Company,
            count: 1,
            entity_zh: String::new(),
        }];
        t.translate_entities(&mut entities).await;
        assert_eq!(entities[0].entity_zh, "zh:Spotify");
    }

    #[tokio::test]
    async fn test_unavailable_translator_leaves_fields_empty() {
        let t: Translator<EchoBackend> = Translator::unavailable();
        let mut articles = vec![article()];
        t.translate_articles(&mut articles).await;
        assert!(articles[0].title_zh.is_empty());
    }

    #[tokio::test]
    async fn test_disabled_bootstrap_is_unavailable() {
        let t = bootstrap(false, None).await;
        assert!(!t.available());
    }
}
