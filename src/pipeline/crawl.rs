// src/pipeline/crawl.rs

//! End-to-end crawl run.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::engine::{CrawlReport, Crawler, interrupt};
use crate::error::{AppError, Result};
use crate::models::Config;
use crate::services::{HtmlLinkExtractor, HttpFetcher};
use crate::storage::{JsonEdgeStore, LocalStorage};

/// Crawl `seed` with the HTTP fetcher, HTML link extractor and the JSON
/// edge store, honouring Ctrl+C, and write the snapshot.
pub async fn run_crawler(config: Arc<Config>, seed: &str) -> Result<CrawlReport> {
    config.validate()?;

    let edges_path = config.storage.edges_path();
    let store = JsonEdgeStore::open(&edges_path).await.map_err(|e| {
        AppError::setup(format!(
            "cannot open edge store {}: {}",
            edges_path.display(),
            e
        ))
    })?;
    let fetcher = HttpFetcher::from_config(&config.crawler)
        .map_err(|e| AppError::setup(format!("cannot build HTTP client: {e}")))?;
    let extractor = HtmlLinkExtractor::from_config(&config.links)?;
    let storage = LocalStorage::from_config(&config.storage);

    let crawler = Crawler::new(
        Arc::clone(&config),
        Arc::new(fetcher),
        Arc::new(extractor),
        Arc::new(store),
    );

    let cancel = CancellationToken::new();
    let listener = interrupt::install(cancel.clone());
    let result = crawl_and_persist(&crawler, &storage, seed, cancel).await;
    listener.abort();

    result
}

/// Run `crawler` and write its graph snapshot and summary to `storage`.
///
/// The snapshot is written whether the crawl drained or was interrupted.
pub async fn crawl_and_persist(
    crawler: &Crawler,
    storage: &LocalStorage,
    seed: &str,
    cancel: CancellationToken,
) -> Result<CrawlReport> {
    let report = crawler.run(seed, cancel).await?;
    let meta = storage.write_snapshot(&report.graph, &report.summary).await?;

    let summary = &report.summary;
    if summary.interrupted {
        log::warn!("Crawl stopped early; snapshot holds the partial graph");
    }
    log::info!(
        "Summary: {} visited, {} permanent failures, {} retries, {} duplicates in {:.2}s",
        summary.visited,
        summary.permanent_failures,
        summary.retries,
        summary.duplicates,
        summary.elapsed().as_secs_f64()
    );
    log::info!(
        "Edges: {} persisted, {} dropped; peak concurrent fetches {}",
        summary.edges_persisted,
        summary.edges_dropped,
        summary.peak_concurrent_fetches
    );
    for failure in &summary.failures {
        log::debug!(
            "Failed: {} after {} attempt(s): {}",
            failure.url,
            failure.attempts,
            failure.reason
        );
    }
    log::info!(
        "Snapshot: {} ({} pages, {} links), stats: {}",
        meta.snapshot_location.display(),
        meta.node_count,
        meta.link_count,
        meta.stats_location.display()
    );

    Ok(report)
}
