//! Utility functions for text shaping, time windows, counters, and file system checks.
//!
//! This module provides helpers used throughout the application:
//! - Whitespace collapsing and bounded truncation for excerpts and log lines
//! - The Europe/London clock and lookback cutoff
//! - Deterministic ordering for reason-keyed counters
//! - File system validation for the output directory

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Europe::London;
use chrono_tz::Tz;
use std::collections::HashMap;
use std::error::Error;
use std::fs as stdfs;
use tokio::fs;
use tracing::{info, instrument};

/// Collapse every whitespace run to a single space and trim the ends.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Collapse whitespace and bound `text` to `max_len` characters.
///
/// Text over the limit is cut to `max_len - 1` characters and gets a trailing `…`.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_text("  a   b ", 10), "a b");
/// assert_eq!(truncate_text("abcdef", 4), "abc…");
/// ```
pub fn truncate_text(text: &str, max_len: usize) -> String {
    let text = collapse_whitespace(text);
    if text.chars().count() <= max_len {
        return text;
    }
    let mut cut: String = text.chars().take(max_len.saturating_sub(1)).collect();
    cut.truncate(cut.trim_end().len());
    cut.push('…');
    cut
}

/// Truncate a string for logging purposes.
///
/// Long strings are truncated to `max` characters with an ellipsis and
/// character count indicator appended.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    let total = s.chars().count();
    if total <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max).collect();
        format!("{}…(+{} chars)", head, total - max)
    }
}

/// Current time in the report timezone (Europe/London).
pub fn now_london() -> DateTime<Tz> {
    Utc::now().with_timezone(&London)
}

/// Start of the lookback window: `now - days`, or `None` when that is out of range.
pub fn cutoff_from(now: DateTime<Tz>, days: u32) -> Option<DateTime<Tz>> {
    now.checked_sub_signed(Duration::try_days(i64::from(days))?)
}

/// Order reason counts by descending count, then reason name.
pub fn sorted_counts(counts: &HashMap<&'static str, u64>) -> Vec<(&'static str, u64)> {
    let mut sorted: Vec<_> = counts.iter().map(|(k, v)| (*k, *v)).collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    sorted
}

/// Ensure a directory exists and is writable.
///
/// This function creates the directory if it doesn't exist, then performs
/// a write test by creating and immediately deleting a probe file.
///
/// # Errors
///
/// Returns an error if:
/// - The directory cannot be created
/// - The directory is not writable (permission denied, read-only filesystem, etc.)
#[instrument(level = "info", skip_all, fields(path = %path))]
pub async fn ensure_writable_dir(path: &str) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(path).await?;
    // Try a small sync write using std fs (simpler error surface)
    let probe_path = format!("{}/..__probe_write__", path.trim_end_matches('/'));
    match stdfs::File::create(&probe_path) {
        Ok(_) => {
            let _ = stdfs::remove_file(&probe_path);
            info!("Output directory is writable");
            Ok(())
        }
        Err(e) => Err(Box::new(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  a \n\t b  "), "a b");
        assert_eq!(collapse_whitespace(""), "");
    }

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("  short   text ", 300), "short text");
        assert_eq!(truncate_text("abcdef", 4), "abc…");
        assert_eq!(truncate_text("ab   cdef", 4), "ab…");
        assert_eq!(truncate_text("日本語のテキスト", 4), "日本語…");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 chars)"));
        assert_eq!(truncate_for_log("short", 100), "short");
    }

    #[test]
    fn test_cutoff_from() {
        let now = London.with_ymd_and_hms(2025, 6, 9, 12, 0, 0).unwrap();
        let cutoff = cutoff_from(now, 7);
        assert_eq!(cutoff, Some(London.with_ymd_and_hms(2025, 6, 2, 12, 0, 0).unwrap()));
        assert_eq!(cutoff_from(now, 200_000_000), None);
    }

    #[test]
    fn test_sorted_counts() {
        let mut counts = HashMap::new();
        counts.insert("older_than_window", 3);
        counts.insert("duplicate_url", 5);
        counts.insert("empty_body", 3);
        assert_eq!(
            sorted_counts(&counts),
            vec![("duplicate_url", 5), ("empty_body", 3), ("older_than_window", 3)]
        );
    }

    #[tokio::test]
    async fn test_ensure_writable_dir_creates_directory() {
        let dir = std::env::temp_dir().join(format!("mnw_writable_{}", std::process::id()));
        let path = dir.to_string_lossy().to_string();
        ensure_writable_dir(&path).await.unwrap();
        assert!(dir.is_dir());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
