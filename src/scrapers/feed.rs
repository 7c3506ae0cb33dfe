//! Syndication feed links. RSS 0.9x/1.0/2.0, Atom, and JSON Feed are all
//! handled by `feed_rs`.

use crate::fetch::Fetch;
use feed_rs::model::Entry;
use std::collections::BTreeSet;
use tracing::{debug, instrument, warn};

/// The entry's article link: the first `alternate` (or rel-less) link, else
/// the first link at all, else an `http(s)` entry id.
fn entry_link(entry: &Entry) -> Option<String> {
    let hrefs = || {
        entry
            .links
            .iter()
            .map(|l| (l.rel.as_deref(), l.href.trim()))
            .filter(|(_, href)| !href.is_empty())
    };
    hrefs()
        .find(|(rel, _)| rel.is_none_or(|r| r.is_empty() || r.eq_ignore_ascii_case("alternate")))
        .or_else(|| hrefs().next())
        .map(|(_, href)| href.to_string())
        .or_else(|| {
            let id = entry.id.trim();
            (id.starts_with("http://") || id.starts_with("https://")).then(|| id.to_string())
        })
}

/// Entry links of a syndication document, in document order.
pub fn parse_feed_links(xml: &str) -> Vec<String> {
    let feed = match feed_rs::parser::parse(xml.as_bytes()) {
        Ok(feed) => feed,
        Err(e) => {
            warn!(error = %e, "Unparseable feed");
            return Vec::new();
        }
    };
    feed.entries
        .iter()
        .filter_map(entry_link)
        .filter(|l| l.starts_with("http://") || l.starts_with("https://"))
        .collect()
}

/// Fetch `feed_url` and return its entry links.
#[instrument(level = "info", skip(fetcher))]
pub async fn index_feed<F: Fetch>(fetcher: &F, feed_url: &str) -> BTreeSet<String> {
    let Some(res) = fetcher.fetch(feed_url, true).await else {
        warn!(%feed_url, "Feed fetch failed");
        return BTreeSet::new();
    };
    if res.status_code != 200 || res.body.is_empty() {
        warn!(%feed_url, status = res.status_code, "Feed returned no content");
        return BTreeSet::new();
    }
    let links: BTreeSet<String> = parse_feed_links(&res.body).into_iter().collect();
    debug!(count = links.len(), "Feed entries");
    links
}
