//! The Markdown weekly report.

use crate::models::{Article, EntityRow, InsightRow};
use crate::pipeline::RunCounters;
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument};

const TOP_ENTITIES: usize = 30;

const TRANSLATION_NOTICE: &str = "> Note: Chinese translation is unavailable for this run. \
English output is complete; Chinese fields may be empty.";

/// Everything the report shows besides its three tables.
#[derive(Debug, Clone, Copy)]
pub struct ReportContext<'a> {
    pub run_date: &'a str,
    pub days: u32,
    pub counters: &'a RunCounters,
    pub translation_available: bool,
}

fn skipped_line(counters: &RunCounters) -> String {
    let pairs = counters
        .sorted_skips()
        .into_iter()
        .map(|(reason, count)| format!("{reason}: {count}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{{{pairs}}}")
}

/// Render the report as Markdown.
pub fn render_markdown_report(
    ctx: &ReportContext<'_>,
    articles: &[Article],
    entities: &[EntityRow],
    insights: &[InsightRow],
) -> String {
    let c = ctx.counters;
    let mut lines: Vec<String> = Vec::new();

    lines.push(format!("# Weekly Music Industry Report ({})", ctx.run_date));
    lines.push(String::new());
    lines.push(format!("Time window: Last {} days (Europe/London)", ctx.days));
    lines.push(String::new());
    if !ctx.translation_available {
        lines.push(TRANSLATION_NOTICE.to_string());
        lines.push(String::new());
    }

    lines.push("## Diagnostics".to_string());
    lines.push(format!("- discovered_urls_homepage: {}", c.discovered_urls_homepage));
    lines.push(format!("- discovered_urls_fallback: {}", c.discovered_urls_fallback));
    lines.push(format!("- fetched_pages: {}", c.fetched_pages));
    lines.push(format!("- kept_articles: {}", c.kept_articles));
    lines.push(format!("- date_missing_count: {}", c.date_missing_count));
    for (source, n) in &c.fetched_by_source {
        let retained = c.retained_by_source.get(source).copied().unwrap_or(0);
        lines.push(format!("- {source}: fetched {n}, retained {retained}"));
    }
    lines.push(format!("- skipped_by_reason: {}", skipped_line(c)));
    lines.push(String::new());

    lines.push("## Industry Insights (EN)".to_string());
    for row in insights {
        lines.push(format!("- {}", row.insight_en));
        if !row.supporting_articles.is_empty() {
            lines.push(format!("  - Evidence: {}", row.supporting_articles));
        }
    }
    lines.push(String::new());

    lines.push("## 行业洞察 (ZH)".to_string());
    for row in insights {
        lines.push(format!("- {}", row.insight_zh));
    }
    lines.push(String::new());

    lines.push("## Top Entities".to_string());
    for row in entities.iter().take(TOP_ENTITIES) {
        lines.push(format!(
            "- {} | {} | {} | {}",
            row.entity_en, row.entity_zh, row.category, row.count
        ));
    }
    lines.push(String::new());

    lines.push("## Articles".to_string());
    if articles.is_empty() {
        lines.push("No articles retained. Please review diagnostics above.".to_string());
    }
    for a in articles {
        lines.push(format!("### {} / {}", a.title, a.title_zh));
        lines.push(format!("- Source: {}", a.source));
        lines.push(format!("- Date: {}", a.display_date()));
        lines.push(format!("- URL: {}", a.canonical_url));
        lines.push(format!("- Excerpt (EN): {}", a.excerpt));
        lines.push(format!("- 摘要 (ZH): {}", a.excerpt_zh));
        lines.push("- Summary (EN):".to_string());
        lines.push(a.summary.clone());
        lines.push("- 总结 (ZH):".to_string());
        lines.push(a.summary_zh.clone());
        lines.push(String::new());
    }

    lines.join("\n")
}

/// Write `weekly_report_{date}.md` into `outdir`.
#[instrument(level = "info", skip_all, fields(outdir = %outdir.display()))]
pub async fn write_report(
    outdir: &Path,
    ctx: &ReportContext<'_>,
    articles: &[Article],
    entities: &[EntityRow],
    insights: &[InsightRow],
) -> Result<PathBuf, Box<dyn Error>> {
    let path = outdir.join(format!("weekly_report_{}.md", ctx.run_date));
    let md = render_markdown_report(ctx, articles, entities, insights);
    fs::write(&path, md).await?;
    info!(path = %path.display(), "Wrote Markdown report");
    Ok(path)
}
