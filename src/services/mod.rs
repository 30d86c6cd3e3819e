// src/services/mod.rs

//! Collaborators consumed by the crawl engine.
//!
//! - [`Fetcher`]: retrieve a page body
//! - [`LinkExtractor`]: pull outgoing links from a body (pure, no I/O)

pub mod fetcher;
pub mod links;

use async_trait::async_trait;

use crate::error::FetchError;

pub use fetcher::HttpFetcher;
pub use links::HtmlLinkExtractor;

/// Retrieves the body behind a URL.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> std::result::Result<String, FetchError>;
}

/// Extracts the canonical URLs a page links to.
///
/// Implementations return each URL once, in document order.
pub trait LinkExtractor: Send + Sync {
    fn extract_links(&self, page_url: &str, body: &str) -> Vec<String>;
}
