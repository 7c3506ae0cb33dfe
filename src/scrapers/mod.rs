//! Candidate URL discovery for each news source.
//!
//! Every source is indexed through two independent strategies:
//!
//! 1. **Homepage**: harvest every link on the homepage that points back at the
//!    source's host ([`homepage`])
//! 2. **Fallback**: a paginated listing ([`listing`]) or a syndication feed
//!    ([`feed`]), whichever the source table names
//!
//! Both return raw absolute URLs; canonicalization and dedup belong to the
//! pipeline. A failing strategy logs and yields an empty set so the other
//! one still contributes.
//!
//! # Supported Sources
//!
//! | Source | Homepage | Fallback |
//! |--------|----------|----------|
//! | Music Week | `www.musicweek.com` | `/news` listing, 4 pages |
//! | Music Business Worldwide | `www.musicbusinessworldwide.com` | `/feed/` RSS |

pub mod feed;
pub mod homepage;
pub mod listing;

use crate::fetch::Fetch;
use crate::models::Source;
use crate::policy::{host_matches, Fallback, SourceProfile};
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use std::collections::BTreeSet;
use tracing::{info, instrument};
use url::Url;

static LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").unwrap());

/// Raw URLs found for one source, split by strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Discovery {
    pub homepage: BTreeSet<String>,
    pub fallback: BTreeSet<String>,
}

impl Discovery {
    /// Union of both strategies, in sorted order.
    pub fn candidates(&self) -> BTreeSet<String> {
        self.homepage.union(&self.fallback).cloned().collect()
    }
}

/// Resolve every `a[href]` in `html` against `base_url`.
///
/// Empty and fragment-only links are skipped, as is anything that does not
/// resolve to an http(s) URL.
pub fn extract_links(base_url: &str, html: &str) -> Vec<String> {
    let Ok(base) = Url::parse(base_url) else {
        return Vec::new();
    };
    let document = Html::parse_document(html);
    document
        .select(&LINK)
        .filter_map(|a| a.value().attr("href"))
        .map(str::trim)
        .filter(|href| !href.is_empty() && !href.starts_with('#'))
        .filter_map(|href| base.join(href).ok())
        .filter(|u| matches!(u.scheme(), "http" | "https"))
        .map(String::from)
        .collect()
}

/// True when `url` points at the profile's host.
pub fn on_source_host(profile: &SourceProfile, url: &str) -> bool {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| host_matches(profile, h)))
        .unwrap_or(false)
}

/// Run both discovery strategies for `source`.
#[instrument(level = "info", skip(fetcher))]
pub async fn discover<F: Fetch>(fetcher: &F, source: Source) -> Discovery {
    let profile = source.profile();
    let homepage = homepage::index_homepage(fetcher, profile).await;
    let fallback = match profile.fallback {
        Fallback::Listing {
            first_page,
            page_template,
            max_pages,
        } => listing::index_listing(fetcher, profile, first_page, page_template, max_pages).await,
        Fallback::Feed { url } => feed::index_feed(fetcher, url).await,
    };
    info!(
        %source,
        homepage = homepage.len(),
        fallback = fallback.len(),
        "Discovered candidate URLs"
    );
    Discovery { homepage, fallback }
}

#[cfg(test)]
pub(crate) mod testing {
    use crate::fetch::Fetch;
    use crate::models::FetchResult;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory fetcher keyed by exact URL; records every request.
    #[derive(Default)]
    pub struct FakeFetcher {
        pages: HashMap<String, (u16, String)>,
        pub requests: Mutex<Vec<String>>,
    }

    impl FakeFetcher {
        pub fn with_page(mut self, url: &str, status: u16, body: &str) -> Self {
            self.pages.insert(url.to_string(), (status, body.to_string()));
            self
        }

        pub fn requested(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl Fetch for FakeFetcher {
        async fn fetch(&self, url: &str, _respect_robots: bool) -> Option<FetchResult> {
            self.requests.lock().unwrap().push(url.to_string());
            self.pages.get(url).map(|(status, body)| FetchResult {
                url: url.to_string(),
                status_code: *status,
                body: body.clone(),
                served_from_cache: false,
            })
        }
    }
}
