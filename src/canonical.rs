//! URL canonicalization.
//!
//! The canonical form is the identity of a candidate: it is what the run's
//! seen-set stores, what gets fetched, and what ends up in the reports. Two
//! URLs that differ only in tracking parameters, fragment, trailing slash,
//! `http`/`https`, or the case of scheme and host canonicalize identically.

use once_cell::sync::Lazy;
use regex::Regex;
use url::{form_urlencoded, ParseError, Url};

static TRACKING_QUERY_PREFIXES: &[&str] = &["utm_"];
static TRACKING_QUERY_KEYS: &[&str] = &["fbclid", "gclid"];

static REPEATED_SLASHES: Lazy<Regex> = Lazy::new(|| Regex::new(r"/{2,}").unwrap());

fn is_tracking_key(key: &str) -> bool {
    let lk = key.to_lowercase();
    TRACKING_QUERY_KEYS.contains(&lk.as_str())
        || TRACKING_QUERY_PREFIXES.iter().any(|p| lk.starts_with(p))
}

/// Parse `raw`, defaulting the scheme to `https` when it is missing.
fn parse_with_default_scheme(raw: &str) -> Option<Url> {
    if let Some(rest) = raw.strip_prefix("//") {
        return Url::parse(&format!("https://{rest}")).ok();
    }
    match Url::parse(raw) {
        Ok(u) => Some(u),
        // A bare path has no host to default to.
        Err(ParseError::RelativeUrlWithoutBase) if !raw.starts_with('/') => {
            Url::parse(&format!("https://{raw}")).ok()
        }
        Err(_) => None,
    }
}

/// Canonicalize a URL into its comparable form.
///
/// Returns an empty string for empty, unparseable, or hostless input.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(
///     canonicalize("HTTP://Example.com/a//b/?utm_source=x&id=1#top"),
///     "https://example.com/a/b?id=1"
/// );
/// ```
pub fn canonicalize(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return String::new();
    }
    let Some(parsed) = parse_with_default_scheme(raw) else {
        return String::new();
    };
    let Some(host) = parsed.host_str() else {
        return String::new();
    };
    if host.is_empty() {
        return String::new();
    }

    // `url` already lowercases scheme and host and drops default ports.
    let scheme = match parsed.scheme() {
        "http" => "https",
        other => other,
    };
    let port = parsed
        .port()
        .filter(|p| !(scheme == "https" && *p == 443))
        .map(|p| format!(":{p}"))
        .unwrap_or_default();

    let collapsed = REPEATED_SLASHES.replace_all(parsed.path(), "/");
    let path = collapsed.strip_suffix('/').unwrap_or(&collapsed);

    let kept: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(k, _)| !is_tracking_key(k))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    let query = if kept.is_empty() {
        String::new()
    } else {
        let encoded = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(kept.iter())
            .finish();
        format!("?{encoded}")
    };

    format!("{scheme}://{host}{port}{path}{query}")
}
