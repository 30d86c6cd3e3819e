// src/services/links.rs

//! Anchor extraction from HTML documents.

use std::collections::HashSet;

use regex::Regex;
use scraper::{Html, Selector};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::LinkConfig;
use crate::utils::{canonicalize, get_domain};

use super::LinkExtractor;

/// Extracts `<a href>` targets, optionally filtered by a regex and by host.
#[derive(Debug, Clone)]
pub struct HtmlLinkExtractor {
    anchors: Selector,
    pattern: Option<Regex>,
    same_host_only: bool,
}

impl HtmlLinkExtractor {
    pub fn new(pattern: Option<Regex>, same_host_only: bool) -> Result<Self> {
        Ok(Self {
            anchors: Self::parse_selector("a[href]")?,
            pattern,
            same_host_only,
        })
    }

    pub fn from_config(config: &LinkConfig) -> Result<Self> {
        Self::new(config.compiled_pattern()?, config.same_host_only)
    }

    /// Apply the link pattern to a raw `href`.
    ///
    /// With a capture group, the first group is what gets followed.
    fn select_href<'a>(&self, href: &'a str) -> Option<&'a str> {
        let Some(pattern) = &self.pattern else {
            return Some(href);
        };
        let caps = pattern.captures(href)?;
        Some(caps.get(1).or_else(|| caps.get(0))?.as_str())
    }

    fn parse_selector(s: &str) -> Result<Selector> {
        Selector::parse(s)
            .map_err(|e| AppError::validation(format!("invalid selector '{s}': {e:?}")))
    }
}

impl LinkExtractor for HtmlLinkExtractor {
    fn extract_links(&self, page_url: &str, body: &str) -> Vec<String> {
        let Ok(base) = Url::parse(page_url) else {
            log::warn!("Cannot resolve links against invalid page URL {page_url}");
            return Vec::new();
        };
        let document = Html::parse_document(body);

        let mut seen = HashSet::new();
        let mut links = Vec::new();
        for anchor in document.select(&self.anchors) {
            let Some(href) = anchor.value().attr("href") else {
                continue;
            };
            let Some(href) = self.select_href(href) else {
                continue;
            };
            let Some(link) = canonicalize(&base, href) else {
                continue;
            };
            if self.same_host_only && get_domain(&link).as_deref() != base.host_str() {
                continue;
            }
            if seen.insert(link.clone()) {
                links.push(link);
            }
        }
        links
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r##"
        <html><body>
            <a href="/wiki/Rust_(programming_language)">Rust</a>
            <a href="/wiki/Rust_(programming_language)#History">Rust history</a>
            <a href="/wiki/Special:Random">Random</a>
            <a href="relative.html">Relative</a>
            <a href="https://other.org/page">Elsewhere</a>
            <a href="mailto:someone@example.org">Mail</a>
            <a>No href</a>
        </body></html>
    "##;

    #[test]
    fn test_same_host_in_document_order() {
        let extractor = HtmlLinkExtractor::new(None, true).unwrap();
        let links = extractor.extract_links("https://en.wikipedia.org/wiki/Python", PAGE);

        assert_eq!(
            links,
            vec![
                "https://en.wikipedia.org/wiki/Rust_(programming_language)",
                "https://en.wikipedia.org/wiki/Special:Random",
                "https://en.wikipedia.org/wiki/relative.html",
            ]
        );
    }

    #[test]
    fn test_cross_host_allowed() {
        let extractor = HtmlLinkExtractor::new(None, false).unwrap();
        let links = extractor.extract_links("https://en.wikipedia.org/wiki/Python", PAGE);
        assert!(links.contains(&"https://other.org/page".to_string()));
    }

    #[test]
    fn test_article_pattern() {
        let config = LinkConfig {
            pattern: Some(r"^(/wiki/[^:#\s]+)(?:$|#)".into()),
            same_host_only: true,
        };
        let extractor = HtmlLinkExtractor::from_config(&config).unwrap();
        let links = extractor.extract_links("https://en.wikipedia.org/wiki/Python", PAGE);

        assert_eq!(
            links,
            vec!["https://en.wikipedia.org/wiki/Rust_(programming_language)"]
        );
    }

    #[test]
    fn test_invalid_page_url_yields_nothing() {
        let extractor = HtmlLinkExtractor::new(None, true).unwrap();
        assert!(extractor.extract_links("not a url", PAGE).is_empty());
    }
}
