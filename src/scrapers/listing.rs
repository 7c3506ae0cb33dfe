//! Paginated listing pages.
//!
//! Page 1 is the listing's own URL; later pages substitute `{page}` in the
//! template. Pagination stops early at the first page past page 1 that
//! answers `404`; other failures just skip that page.

use super::{extract_links, on_source_host};
use crate::fetch::Fetch;
use crate::policy::SourceProfile;
use std::collections::BTreeSet;
use tracing::{debug, info, instrument, warn};

/// URL of listing page `page` (1-based).
pub fn page_url(first_page: &str, page_template: &str, page: usize) -> String {
    if page <= 1 {
        first_page.to_string()
    } else {
        page_template.replace("{page}", &page.to_string())
    }
}

/// Collect source-host links from up to `max_pages` listing pages.
#[instrument(level = "info", skip(fetcher, profile), fields(source = %profile.source))]
pub async fn index_listing<F: Fetch>(
    fetcher: &F,
    profile: &SourceProfile,
    first_page: &str,
    page_template: &str,
    max_pages: usize,
) -> BTreeSet<String> {
    let mut urls = BTreeSet::new();
    for page in 1..=max_pages {
        let list_url = page_url(first_page, page_template, page);
        let Some(res) = fetcher.fetch(&list_url, true).await else {
            warn!(%list_url, "Listing page fetch failed");
            continue;
        };
        if page > 1 && res.status_code == 404 {
            info!(%list_url, page, "Listing exhausted");
            break;
        }
        if res.body.is_empty() {
            continue;
        }
        let before = urls.len();
        urls.extend(
            extract_links(&list_url, &res.body)
                .into_iter()
                .filter(|u| on_source_host(profile, u)),
        );
        debug!(%list_url, added = urls.len() - before, "Indexed listing page");
    }
    urls
}
