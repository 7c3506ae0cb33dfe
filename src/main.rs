//! # Music News Weekly
//!
//! A weekly digest of music-industry news. Each run crawls Music Week and
//! Music Business Worldwide, keeps the article pages published inside the
//! lookback window, summarizes and translates them into Chinese through an
//! OpenAI-compatible LLM, mines recurring themes and named entities, and
//! writes CSV tables plus a Markdown report.
//!
//! ## Pipeline
//!
//! discovery → canonicalize → dedupe → fetch → classify → date window →
//! summarize → translate → entities / insights → CSV + Markdown
//!
//! ## Usage
//!
//! ```sh
//! music_news_weekly --days 7 --outdir ./output
//! ```

use clap::Parser;
use std::error::Error;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod canonical;
mod cli;
mod entities;
mod extract;
mod fetch;
mod insights;
mod models;
mod outputs;
mod pipeline;
mod policy;
mod robots;
mod scrapers;
mod summary;
mod translate;
mod utils;

use cli::{Cli, Settings};
use entities::{CapitalizedPhraseRecognizer, extract_entities};
use fetch::{FetcherConfig, WebFetcher};
use insights::{DEFAULT_MAX_INSIGHTS, build_insights};
use models::Source;
use outputs::markdown::ReportContext;
use outputs::{csv, markdown};
use pipeline::{Pipeline, PipelineConfig};
use utils::{cutoff_from, ensure_writable_dir, now_london};

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Cli::parse();

    // --- Tracing init ---
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("music_news_weekly starting up");

    let settings = match &args.settings {
        Some(path) => Settings::load(Path::new(path)).await.map_err(|e| {
            error!(%path, error = %e, "Settings file is unreadable or invalid");
            e
        })?,
        None => Settings::default(),
    };
    let opts = args.resolve(settings);
    debug!(?opts, "Resolved run options");

    // Early check: the output directory must be writable before any crawling.
    if let Err(e) = ensure_writable_dir(&opts.outdir).await {
        error!(
            path = %opts.outdir,
            error = %e,
            "Output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    let fetcher = WebFetcher::new(FetcherConfig {
        use_cache: opts.use_cache,
        cache_dir: opts.cache_dir.clone().into(),
        timeout: Duration::from_secs(opts.timeout_secs),
        ..FetcherConfig::default()
    })
    .map_err(|e| {
        error!(error = %e, "Failed to build HTTP client");
        e
    })?;

    // ---- Crawl ----
    let now = now_london();
    let run_date = now.date_naive().to_string();
    let Some(cutoff) = cutoff_from(now, opts.days) else {
        error!(days = opts.days, "Lookback window is out of range");
        return Err(format!("--days {} is out of range", opts.days).into());
    };
    info!(%run_date, %cutoff, days = opts.days, "Lookback window");

    let config = PipelineConfig {
        cutoff,
        max_per_source: opts.max_per_source,
        bullets: opts.bullets,
    };
    let run = Pipeline::new(&fetcher, config).run(&Source::ALL).await;
    let mut articles = run.articles;
    let counters = run.counters;

    // ---- Enrichment ----
    let translator = translate::bootstrap(opts.translate, opts.llm_config.as_deref()).await;
    translator.translate_articles(&mut articles).await;

    let mut entities = extract_entities(&articles, &CapitalizedPhraseRecognizer);
    translator.translate_entities(&mut entities).await;
    info!(count = entities.len(), "Entities extracted");

    let mut insights = build_insights(&articles, DEFAULT_MAX_INSIGHTS);
    translator.translate_insights(&mut insights).await;
    info!(count = insights.len(), "Insights built");

    // ---- Outputs ----
    let outdir = Path::new(&opts.outdir);
    let paths = csv::save_csvs(outdir, &run_date, &articles, &entities, &insights).await?;
    let report_ctx = ReportContext {
        run_date: &run_date,
        days: opts.days,
        counters: &counters,
        translation_available: translator.available(),
    };
    let report_path =
        markdown::write_report(outdir, &report_ctx, &articles, &entities, &insights).await?;

    info!(
        articles = %paths.articles.display(),
        entities = %paths.entities.display(),
        insights = %paths.insights.display(),
        report = %report_path.display(),
        "Run complete. Output files written"
    );

    // ---- Diagnostics ----
    info!(
        discovered_urls_homepage = counters.discovered_urls_homepage,
        discovered_urls_fallback = counters.discovered_urls_fallback,
        fetched_pages = counters.fetched_pages,
        kept_articles = counters.kept_articles,
        date_missing_count = counters.date_missing_count,
        total_skipped = counters.total_skipped(),
        "Run counters"
    );
    for source in Source::ALL {
        info!(
            %source,
            fetched = counters.fetched_by_source.get(&source).copied().unwrap_or(0),
            retained = counters.retained_by_source.get(&source).copied().unwrap_or(0),
            "Per-source counters"
        );
    }
    for (reason, count) in counters.sorted_skips() {
        info!(reason, count, "skipped_by_reason");
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}
