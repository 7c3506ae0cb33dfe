//! CSV tables for spreadsheet consumers.
//!
//! Files are UTF-8 with a byte-order mark so Excel picks the right encoding,
//! and the header row is written even when a table has no rows.

use crate::models::{Article, EntityRow, InsightRow};
use serde::Serialize;
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument};

const BOM: &[u8] = b"\xEF\xBB\xBF";

pub const ARTICLE_COLUMNS: [&str; 10] = [
    "source",
    "date",
    "date_missing",
    "title_en",
    "title_zh",
    "url",
    "excerpt_en",
    "excerpt_zh",
    "summary_en",
    "summary_zh",
];
pub const ENTITY_COLUMNS: [&str; 4] = ["entity_en", "category", "count", "entity_zh"];
pub const INSIGHT_COLUMNS: [&str; 3] = ["insight_en", "insight_zh", "supporting_articles"];

/// Paths of the three CSV files written for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvPaths {
    pub articles: PathBuf,
    pub entities: PathBuf,
    pub insights: PathBuf,
}

/// Encode `rows` under `columns`, BOM first.
pub fn encode_table<T: Serialize>(columns: &[&str], rows: &[T]) -> Result<Vec<u8>, Box<dyn Error>> {
    let mut wtr = ::csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(BOM.to_vec());
    wtr.write_record(columns)?;
    for row in rows {
        wtr.serialize(row)?;
    }
    Ok(wtr.into_inner().map_err(|e| e.into_error())?)
}

/// Write `articles_{date}.csv`, `entities_{date}.csv`, and `insights_{date}.csv` into `outdir`.
#[instrument(level = "info", skip_all, fields(outdir = %outdir.display(), %run_date))]
pub async fn save_csvs(
    outdir: &Path,
    run_date: &str,
    articles: &[Article],
    entities: &[EntityRow],
    insights: &[InsightRow],
) -> Result<CsvPaths, Box<dyn Error>> {
    fs::create_dir_all(outdir).await?;
    let paths = CsvPaths {
        articles: outdir.join(format!("articles_{run_date}.csv")),
        entities: outdir.join(format!("entities_{run_date}.csv")),
        insights: outdir.join(format!("insights_{run_date}.csv")),
    };

    fs::write(&paths.articles, encode_table(&ARTICLE_COLUMNS, articles)?).await?;
    fs::write(&paths.entities, encode_table(&ENTITY_COLUMNS, entities)?).await?;
    fs::write(&paths.insights, encode_table(&INSIGHT_COLUMNS, insights)?).await?;

    info!(
        articles = articles.len(),
        entities = entities.len(),
        insights = insights.len(),
        "Wrote CSV files"
    );
    Ok(paths)
}
