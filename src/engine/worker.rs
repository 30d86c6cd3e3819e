// src/engine/worker.rs

//! Crawl worker loop.
//!
//! Each worker repeats: dequeue -> claim -> fetch (under a limiter permit)
//! -> expand or retry -> resolve. Per-item failures stay with the item;
//! they never abort the worker or the pool.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::error::FetchError;
use crate::models::{FailureRecord, WorkItem};
use crate::pipeline::EdgeSink;
use crate::services::{Fetcher, LinkExtractor};

use super::{
    CrawlGraph, Frontier, OutboundLimiter, RetryDecision, RetryPolicy, TerminationCoordinator,
    VisitedCache,
};

/// Run-wide counters not covered by the visited cache or the graph.
#[derive(Debug, Default)]
pub(crate) struct CrawlCounters {
    pub duplicates: AtomicUsize,
    pub retries: AtomicUsize,
    pub permanent_failures: AtomicUsize,
}

/// State shared by every worker of one crawl.
pub(crate) struct CrawlContext {
    pub frontier: Arc<Frontier>,
    pub coordinator: TerminationCoordinator,
    pub visited: VisitedCache,
    pub graph: CrawlGraph,
    pub limiter: OutboundLimiter,
    pub retry: RetryPolicy,
    pub fetcher: Arc<dyn Fetcher>,
    pub extractor: Arc<dyn LinkExtractor>,
    pub edges: EdgeSink,
    pub counters: CrawlCounters,
    pub failures: Mutex<Vec<FailureRecord>>,
    pub cancel: CancellationToken,
    pub max_depth: u32,
    pub fetch_timeout: Duration,
}

/// Resolves one dequeued item when dropped, including on unwind.
struct Settle<'a>(&'a TerminationCoordinator);

impl Drop for Settle<'_> {
    fn drop(&mut self) {
        self.0.resolve();
    }
}

pub(crate) struct Worker {
    id: usize,
    ctx: Arc<CrawlContext>,
}

impl Worker {
    pub fn new(id: usize, ctx: Arc<CrawlContext>) -> Self {
        Self { id, ctx }
    }

    pub async fn run(self) {
        while let Some(item) = self.ctx.frontier.dequeue().await {
            let _settle = Settle(&self.ctx.coordinator);
            self.process(item).await;
        }
        log::debug!("[worker {}] frontier closed, exiting", self.id);
    }

    async fn process(&self, item: WorkItem) {
        let ctx = &self.ctx;

        // Retries already hold the claim taken by their first attempt.
        if !item.is_retry() && !ctx.visited.try_claim(&item.url) {
            log::debug!("[worker {}] {} already claimed", self.id, item.url);
            ctx.counters.duplicates.fetch_add(1, Ordering::Relaxed);
            self.record_edge(&item);
            return;
        }

        if ctx.cancel.is_cancelled() {
            log::debug!("[worker {}] interrupted, dropping {}", self.id, item.url);
            return;
        }

        let Some(permit) = ctx.limiter.acquire().await else {
            log::debug!("[worker {}] limiter closed, dropping {}", self.id, item.url);
            return;
        };

        log::debug!(
            "[worker {}] fetching {} (depth {}, attempt {})",
            self.id,
            item.url,
            item.depth,
            item.attempt()
        );
        let result = match tokio::time::timeout(ctx.fetch_timeout, ctx.fetcher.fetch(&item.url)).await
        {
            Ok(result) => result,
            Err(_) => Err(FetchError::request(
                &item.url,
                format!("timed out after {:?}", ctx.fetch_timeout),
            )),
        };
        drop(permit);

        match result {
            Ok(body) => self.expand(&item, &body),
            Err(error) => self.fail(&item, error).await,
        }
    }

    /// Record a successful fetch and enqueue children within the depth limit.
    fn expand(&self, item: &WorkItem, body: &str) {
        let ctx = &self.ctx;
        let links = ctx.extractor.extract_links(&item.url, body);
        ctx.visited.mark_visited(&item.url);
        self.record_edge(item);

        // Reaching the depth limit only suppresses expansion.
        let children = if item.depth < ctx.max_depth {
            links
        } else {
            if !links.is_empty() {
                log::debug!(
                    "[worker {}] depth limit reached at {}, not following {} links",
                    self.id,
                    item.url,
                    links.len()
                );
            }
            Vec::new()
        };

        // A closed frontier means the crawl is stopping; the graph only
        // lists children that were actually queued.
        let mut queued = Vec::with_capacity(children.len());
        for child in children {
            if !ctx.frontier.enqueue(item.child(child.as_str())) {
                break;
            }
            queued.push(child);
        }
        ctx.graph.record(&item.url, queued);

        log::info!("At depth {}: Downloaded {}", item.depth, item.url);
    }

    async fn fail(&self, item: &WorkItem, error: FetchError) {
        let ctx = &self.ctx;
        match ctx.retry.decide(item) {
            RetryDecision::Retry { item: retry, delay } => {
                log::warn!(
                    "{} (attempt {}), retrying in {:?}",
                    error,
                    item.attempt(),
                    delay
                );
                // The permit is already released; waiting here only holds
                // the worker.
                if !delay.is_zero() {
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = ctx.cancel.cancelled() => {
                            log::debug!("[worker {}] interrupted, dropping retry of {}", self.id, item.url);
                            return;
                        }
                    }
                }
                if ctx.frontier.enqueue(retry) {
                    ctx.counters.retries.fetch_add(1, Ordering::Relaxed);
                }
            }
            RetryDecision::GiveUp => {
                log::warn!(
                    "Giving up on {} after {} attempt(s): {}",
                    item.url,
                    item.attempt(),
                    error.reason()
                );
                ctx.counters
                    .permanent_failures
                    .fetch_add(1, Ordering::Relaxed);
                ctx.failures.lock().push(FailureRecord {
                    url: item.url.clone(),
                    attempts: item.attempt(),
                    reason: error.reason(),
                });
            }
        }
    }

    fn record_edge(&self, item: &WorkItem) {
        if let Some(edge) = item.edge() {
            if !self.ctx.edges.record(edge) {
                log::warn!("Persistence writer gone, edge to {} not recorded", item.url);
            }
        }
    }
}
