//! Command-line interface and optional YAML settings for the weekly digest.
//!
//! Numeric and path options resolve in this order: an explicit CLI flag, then
//! the settings file given with `--settings`, then the built-in default.

use clap::Parser;
use serde::Deserialize;
use std::error::Error;
use std::path::Path;

pub const DEFAULT_DAYS: u32 = 7;
pub const MAX_DAYS: u32 = 3650;
pub const DEFAULT_OUTDIR: &str = "output";
pub const DEFAULT_MAX_PER_SOURCE: usize = 80;
pub const DEFAULT_BULLETS: usize = 2;
pub const DEFAULT_CACHE_DIR: &str = "cache/http";
pub const DEFAULT_TIMEOUT_SECS: u64 = 18;

/// Command-line arguments for the weekly music-industry digest.
///
/// # Examples
///
/// ```sh
/// # Last week's news into ./output
/// music_news_weekly
///
/// # Two-week window, English only, fresh fetches
/// music_news_weekly --days 14 --no-translate --no-cache
///
/// # Defaults from a settings file, one override
/// music_news_weekly --settings weekly.yaml --outdir /srv/reports
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Lookback window in days (1 to 3650)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_DAYS)))]
    pub days: Option<u32>,

    /// Output directory for CSV and Markdown reports
    #[arg(short, long)]
    pub outdir: Option<String>,

    /// Debug-level logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Maximum distinct candidate URLs processed per source
    #[arg(long)]
    pub max_per_source: Option<usize>,

    /// Skip Chinese translation
    #[arg(long)]
    pub no_translate: bool,

    /// Bypass the HTTP disk cache
    #[arg(long)]
    pub no_cache: bool,

    /// Excerpt sentences added to each summary after the title
    #[arg(long)]
    pub bullets: Option<usize>,

    /// Directory of the HTTP disk cache
    #[arg(long)]
    pub cache_dir: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Optional YAML settings file supplying defaults
    #[arg(short, long)]
    pub settings: Option<String>,

    /// Optional path to the LLM config.yaml used for translation
    #[arg(long, env = "LLM_CONFIG")]
    pub llm_config: Option<String>,
}

/// Defaults read from a YAML settings file. Every key is optional.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub days: Option<u32>,
    pub outdir: Option<String>,
    pub max_per_source: Option<usize>,
    pub bullets: Option<usize>,
    pub cache_dir: Option<String>,
    pub timeout_secs: Option<u64>,
    pub llm_config: Option<String>,
}

impl Settings {
    pub fn from_yaml(text: &str) -> Result<Self, Box<dyn Error>> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let settings: Self = serde_yaml::from_str(text)?;
        if let Some(days) = settings.days.filter(|d| !(1..=MAX_DAYS).contains(d)) {
            return Err(format!("settings: days must be between 1 and {MAX_DAYS}, got {days}").into());
        }
        Ok(settings)
    }

    pub async fn load(path: &Path) -> Result<Self, Box<dyn Error>> {
        let text = tokio::fs::read_to_string(path).await?;
        Self::from_yaml(&text)
    }
}

/// Fully resolved run options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    pub days: u32,
    pub outdir: String,
    pub verbose: bool,
    pub max_per_source: usize,
    pub translate: bool,
    pub use_cache: bool,
    pub bullets: usize,
    pub cache_dir: String,
    pub timeout_secs: u64,
    pub llm_config: Option<String>,
}

impl Cli {
    /// Merge these flags over `settings` and the defaults.
    pub fn resolve(self, settings: Settings) -> RunOptions {
        RunOptions {
            days: self.days.or(settings.days).unwrap_or(DEFAULT_DAYS),
            outdir: self
                .outdir
                .or(settings.outdir)
                .unwrap_or_else(|| DEFAULT_OUTDIR.to_string()),
            verbose: self.verbose,
            max_per_source: self
                .max_per_source
                .or(settings.max_per_source)
                .unwrap_or(DEFAULT_MAX_PER_SOURCE),
            translate: !self.no_translate,
            use_cache: !self.no_cache,
            bullets: self.bullets.or(settings.bullets).unwrap_or(DEFAULT_BULLETS),
            cache_dir: self
                .cache_dir
                .or(settings.cache_dir)
                .unwrap_or_else(|| DEFAULT_CACHE_DIR.to_string()),
            timeout_secs: self
                .timeout_secs
                .or(settings.timeout_secs)
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
            llm_config: self.llm_config.or(settings.llm_config),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let opts = Cli::parse_from(["music_news_weekly"]).resolve(Settings::default());
        assert_eq!(opts.days, 7);
        assert_eq!(opts.outdir, "output");
        assert_eq!(opts.max_per_source, 80);
        assert_eq!(opts.bullets, 2);
        assert_eq!(opts.cache_dir, "cache/http");
        assert_eq!(opts.timeout_secs, 18);
        assert!(opts.translate);
        assert!(opts.use_cache);
        assert!(!opts.verbose);
    }

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::parse_from([
            "music_news_weekly",
            "--days",
            "14",
            "--outdir",
            "/tmp/reports",
            "--max-per-source",
            "20",
            "--no-translate",
            "--no-cache",
            "-v",
        ]);
        let opts = cli.resolve(Settings::default());
        assert_eq!(opts.days, 14);
        assert_eq!(opts.outdir, "/tmp/reports");
        assert_eq!(opts.max_per_source, 20);
        assert!(!opts.translate);
        assert!(!opts.use_cache);
        assert!(opts.verbose);
    }

    #[test]
    fn test_flags_override_settings() {
        let settings = Settings::from_yaml("days: 3\noutdir: weekly\nbullets: 4\n").unwrap();
        let opts = Cli::parse_from(["music_news_weekly", "--days", "10"]).resolve(settings);
        assert_eq!(opts.days, 10);
        assert_eq!(opts.outdir, "weekly");
        assert_eq!(opts.bullets, 4);
    }

    #[test]
    fn test_days_out_of_range_is_rejected() {
        assert!(Cli::try_parse_from(["music_news_weekly", "--days", "200000000"]).is_err());
        assert!(Cli::try_parse_from(["music_news_weekly", "--days", "0"]).is_err());
        assert!(Cli::try_parse_from(["music_news_weekly", "--days", "3650"]).is_ok());
        assert!(Settings::from_yaml("days: 200000000\n").is_err());
        assert!(Settings::from_yaml("days: 0\n").is_err());
    }

    #[test]
    fn test_settings_rejects_unknown_keys() {
        assert!(Settings::from_yaml("dayz: 3\n").is_err());
        assert!(Settings::from_yaml("days: seven\n").is_err());
        assert_eq!(Settings::from_yaml("").unwrap(), Settings::default());
    }
}
