//! Utility functions and helpers.

pub mod http;

use url::Url;

/// Resolve `href` against `base` into a canonical crawlable URL.
///
/// Only `http`/`https` targets are kept and fragments are dropped, so
/// `page#a` and `page#b` canonicalise to the same URL.
pub fn canonicalize(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    let mut url = base.join(href).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    url.set_fragment(None);
    Some(url.to_string())
}

/// Parse and canonicalise an absolute URL, e.g. the crawl seed.
pub fn canonicalize_absolute(raw: &str) -> Result<String, url::ParseError> {
    let mut url = Url::parse(raw.trim())?;
    url.set_fragment(None);
    Ok(url.to_string())
}

/// Extract the host from a URL string.
pub fn get_domain(url_str: &str) -> Option<String> {
    Url::parse(url_str)
        .ok()
        .and_then(|u| u.host_str().map(|s| s.to_string()))
}
