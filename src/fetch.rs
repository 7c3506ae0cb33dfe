//! Page fetching with a disk cache and robots.txt compliance.
//!
//! The pipeline only sees the [`Fetch`] trait. [`WebFetcher`] is the
//! production implementation:
//!
//! 1. Canonicalize the URL (empty canonical form → no result)
//! 2. Check robots.txt for the origin when asked to (rules cached per origin;
//!    an unreadable robots.txt allows everything)
//! 3. Serve a cache entry younger than the TTL, unless the cache is bypassed
//! 4. Issue the request with a bounded timeout; statuses ≥ 400 come back with an
//!    empty body, transport errors come back as `None`
//!
//! Requests are issued one at a time; nothing here spawns tasks.

use crate::canonical::canonicalize;
use crate::models::FetchResult;
use crate::robots::RobotsPolicy;
use reqwest::header::{ACCEPT_LANGUAGE, HeaderMap, HeaderValue};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};
use tokio::fs;
use tracing::{debug, info, instrument, warn};
use url::Url;

pub const USER_AGENT: &str = concat!(
    "MusicNewsWeekly/",
    env!("CARGO_PKG_VERSION"),
    " (+https://github.com/music-news-weekly)"
);

/// Token matched against robots.txt `User-agent` lines.
const ROBOTS_AGENT_TOKEN: &str = "musicnewsweekly";

/// Anything that can turn a URL into a [`FetchResult`].
///
/// `None` means the page could not be fetched at all (disallowed, network
/// failure, timeout); callers treat it like any other non-retainable page.
pub trait Fetch {
    async fn fetch(&self, url: &str, respect_robots: bool) -> Option<FetchResult>;
}

/// Settings for [`WebFetcher`].
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    pub use_cache: bool,
    pub cache_dir: PathBuf,
    pub cache_ttl: Duration,
    pub timeout: Duration,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            use_cache: true,
            cache_dir: PathBuf::from("cache/http"),
            cache_ttl: Duration::from_secs(24 * 60 * 60),
            timeout: Duration::from_secs(18),
        }
    }
}

/// HTTP fetcher backed by `reqwest`.
pub struct WebFetcher {
    client: reqwest::Client,
    config: FetcherConfig,
    robots: Mutex<HashMap<String, Arc<RobotsPolicy>>>,
}

/// Cache file name for a canonical URL.
pub fn cache_key(canonical_url: &str) -> String {
    format!("{:x}.html", Sha256::digest(canonical_url.as_bytes()))
}

fn is_fresh(modified: SystemTime, ttl: Duration) -> bool {
    SystemTime::now()
        .duration_since(modified)
        .map(|age| age < ttl)
        // Modified in the future: treat as fresh.
        .unwrap_or(true)
}

impl WebFetcher {
    /// Build the HTTP client and create the cache directory.
    ///
    /// # Errors
    ///
    /// Fails when the TLS backend cannot be initialized or the cache directory
    /// cannot be created. Both are fatal for a run.
    pub fn new(config: FetcherConfig) -> Result<Self, Box<dyn Error>> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-GB,en;q=0.9"));
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;
        std::fs::create_dir_all(&config.cache_dir)?;
        info!(
            cache_dir = %config.cache_dir.display(),
            use_cache = config.use_cache,
            timeout_secs = config.timeout.as_secs(),
            "Web fetcher ready"
        );
        Ok(Self {
            client,
            config,
            robots: Mutex::new(HashMap::new()),
        })
    }

    fn cache_path(&self, canonical_url: &str) -> PathBuf {
        self.config.cache_dir.join(cache_key(canonical_url))
    }

    async fn read_cache(&self, path: &Path) -> Option<String> {
        let meta = fs::metadata(path).await.ok()?;
        let modified = meta.modified().ok()?;
        if !is_fresh(modified, self.config.cache_ttl) {
            return None;
        }
        fs::read_to_string(path).await.ok()
    }

    async fn write_cache(&self, path: &Path, body: &str) {
        if let Err(e) = fs::write(path, body).await {
            warn!(path = %path.display(), error = %e, "Failed to write cache entry");
        }
    }

    #[instrument(level = "debug", skip(self))]
    async fn load_robots(&self, origin: &str) -> RobotsPolicy {
        let robots_url = format!("{origin}/robots.txt");
        match self.client.get(&robots_url).send().await {
            Ok(resp) if resp.status().is_success() => match resp.text().await {
                Ok(text) => RobotsPolicy::parse(&text, ROBOTS_AGENT_TOKEN),
                Err(e) => {
                    warn!(%robots_url, error = %e, "robots.txt read failed; allowing");
                    RobotsPolicy::allow_all()
                }
            },
            Ok(resp) => {
                debug!(%robots_url, status = resp.status().as_u16(), "No robots.txt; allowing");
                RobotsPolicy::allow_all()
            }
            Err(e) => {
                warn!(%robots_url, error = %e, "robots.txt fetch failed; allowing");
                RobotsPolicy::allow_all()
            }
        }
    }

    async fn robots_allowed(&self, url: &Url) -> bool {
        let origin = url.origin().ascii_serialization();
        let cached = self
            .robots
            .lock()
            .ok()
            .and_then(|map| map.get(&origin).cloned());
        let rules = match cached {
            Some(rules) => rules,
            None => {
                let rules = Arc::new(self.load_robots(&origin).await);
                if let Ok(mut map) = self.robots.lock() {
                    map.insert(origin, Arc::clone(&rules));
                }
                rules
            }
        };
        let target = match url.query() {
            Some(q) => format!("{}?{}", url.path(), q),
            None => url.path().to_string(),
        };
        rules.is_allowed(&target)
    }
}

impl Fetch for WebFetcher {
    #[instrument(level = "debug", skip(self))]
    async fn fetch(&self, url: &str, respect_robots: bool) -> Option<FetchResult> {
        let canon = canonicalize(url);
        if canon.is_empty() {
            return None;
        }
        let parsed = Url::parse(&canon).ok()?;

        if respect_robots && !self.robots_allowed(&parsed).await {
            info!(url = %canon, "Blocked by robots.txt");
            return None;
        }

        let cache_path = self.cache_path(&canon);
        if self.config.use_cache {
            if let Some(body) = self.read_cache(&cache_path).await {
                debug!(url = %canon, "Cache hit");
                return Some(FetchResult {
                    url: canon,
                    status_code: 200,
                    body,
                    served_from_cache: true,
                });
            }
        }

        let resp = match self.client.get(parsed).send().await {
            Ok(resp) => resp,
            Err(e) => {
                warn!(url = %canon, error = %e, "Request failed");
                return None;
            }
        };
        let status = resp.status().as_u16();
        if status >= 400 {
            warn!(url = %canon, status, "HTTP error status");
            return Some(FetchResult {
                url: canon,
                status_code: status,
                body: String::new(),
                served_from_cache: false,
            });
        }
        let body = match resp.text().await {
            Ok(body) => body,
            Err(e) => {
                warn!(url = %canon, error = %e, "Failed reading response body");
                return None;
            }
        };
        if self.config.use_cache && !body.is_empty() {
            self.write_cache(&cache_path, &body).await;
        }
        Some(FetchResult {
            url: canon,
            status_code: status,
            body,
            served_from_cache: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_is_stable_sha256() {
        let key = cache_key("https://www.musicweek.com/news");
        assert_eq!(key.len(), 64 + ".html".len());
        assert_eq!(key, cache_key("https://www.musicweek.com/news"));
        assert_ne!(key, cache_key("https://www.musicweek.com/news/page/2"));
    }

    #[test]
    fn test_freshness_window() {
        let ttl = Duration::from_secs(3600);
        assert!(is_fresh(SystemTime::now(), ttl));
        assert!(!is_fresh(SystemTime::now() - Duration::from_secs(7200), ttl));
    }

    #[tokio::test]
    async fn test_cache_hit_skips_network() {
        let dir = std::env::temp_dir().join(format!("mnw_cache_{}", std::process::id()));
        let config = FetcherConfig {
            cache_dir: dir.clone(),
            ..FetcherConfig::default()
        };
        let fetcher = WebFetcher::new(config).unwrap();
        // Unresolvable host: only the cache can answer.
        let url = "https://cached.invalid/story";
        std::fs::write(dir.join(cache_key(url)), "<html>cached</html>").unwrap();

        let res = fetcher.fetch(url, false).await.unwrap();
        assert!(res.served_from_cache);
        assert_eq!(res.status_code, 200);
        assert_eq!(res.body, "<html>cached</html>");
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_unusable_url_yields_none() {
        let dir = std::env::temp_dir().join(format!("mnw_cache_none_{}", std::process::id()));
        let fetcher = WebFetcher::new(FetcherConfig {
            cache_dir: dir.clone(),
            ..FetcherConfig::default()
        })
        .unwrap();
        assert!(fetcher.fetch("", true).await.is_none());
        assert!(fetcher.fetch("/relative", true).await.is_none());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
