//! Homepage link harvesting.

use super::{extract_links, on_source_host};
use crate::fetch::Fetch;
use crate::policy::SourceProfile;
use std::collections::BTreeSet;
use tracing::{debug, instrument, warn};

/// Fetch the source's homepage and keep links that point back at its host.
#[instrument(level = "info", skip_all, fields(source = %profile.source))]
pub async fn index_homepage<F: Fetch>(fetcher: &F, profile: &SourceProfile) -> BTreeSet<String> {
    let Some(res) = fetcher.fetch(profile.homepage, true).await else {
        warn!(url = profile.homepage, "Homepage fetch failed");
        return BTreeSet::new();
    };
    if res.body.is_empty() {
        warn!(url = profile.homepage, status = res.status_code, "Homepage returned no content");
        return BTreeSet::new();
    }
    let urls: BTreeSet<String> = extract_links(profile.homepage, &res.body)
        .into_iter()
        .filter(|u| on_source_host(profile, u))
        .collect();
    debug!(count = urls.len(), "Homepage links on source host");
    urls
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Source;
    use crate::scrapers::testing::FakeFetcher;

    #[tokio::test]
    async fn test_keeps_only_source_host_links() {
        let fetcher = FakeFetcher::default().with_page(
            "https://www.musicbusinessworldwide.com/",
            200,
            r#"<a href="/story-one/">1</a>
               <a href="https://www.musicbusinessworldwide.com/story-two/">2</a>
               <a href="https://twitter.com/mbw">t</a>"#,
        );
        let urls = index_homepage(&fetcher, Source::MusicBusinessWorldwide.profile()).await;
        assert_eq!(
            urls.into_iter().collect::<Vec<_>>(),
            vec![
                "https://www.musicbusinessworldwide.com/story-one/",
                "https://www.musicbusinessworldwide.com/story-two/",
            ]
        );
    }

    #[tokio::test]
    async fn test_error_status_yields_nothing() {
        let fetcher = FakeFetcher::default().with_page("https://www.musicweek.com/", 503, "");
        assert!(index_homepage(&fetcher, Source::MusicWeek.profile()).await.is_empty());
    }
}
