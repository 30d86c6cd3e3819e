//! Crawl engine.
//!
//! Data flow:
//!
//! ```text
//! seed -> Frontier -> workers (OutboundLimiter, VisitedCache) -> edges -> PersistenceWriter
//!            ^            |
//!            +- children -+-- resolve --> TerminationCoordinator -- close --> Frontier
//! ```
//!
//! The crawl ends when the coordinator sees outstanding work reach zero, or
//! when the cancellation token fires. Either way the frontier is closed,
//! workers exit, the persistence queue is drained and a [`CrawlReport`] is
//! returned.

mod coordinator;
mod frontier;
mod graph;
pub mod interrupt;
mod limiter;
mod retry;
mod visited;
mod worker;

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Instant;

use chrono::Utc;
use parking_lot::Mutex;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::error::{AppError, Result};
use crate::models::{Config, CrawlSummary, WorkItem};
use crate::pipeline::PersistenceWriter;
use crate::services::{Fetcher, LinkExtractor};
use crate::storage::EdgeStore;
use crate::utils::canonicalize_absolute;

pub use coordinator::TerminationCoordinator;
pub use frontier::Frontier;
pub use graph::{CrawlGraph, GraphSnapshot};
pub use limiter::{OutboundLimiter, OutboundPermit};
pub use retry::{ExponentialBackoff, RetryDecision, RetryPolicy};
pub use visited::VisitedCache;

use worker::{CrawlContext, CrawlCounters, Worker};

/// Result of a crawl run.
#[derive(Debug, Clone)]
pub struct CrawlReport {
    pub summary: CrawlSummary,
    pub graph: GraphSnapshot,
}

/// A configured crawl engine. Each [`run`](Crawler::run) is independent:
/// all shared state is created per run.
pub struct Crawler {
    config: Arc<Config>,
    fetcher: Arc<dyn Fetcher>,
    extractor: Arc<dyn LinkExtractor>,
    store: Arc<dyn EdgeStore>,
}

impl Crawler {
    pub fn new(
        config: Arc<Config>,
        fetcher: Arc<dyn Fetcher>,
        extractor: Arc<dyn LinkExtractor>,
        store: Arc<dyn EdgeStore>,
    ) -> Self {
        Self {
            config,
            fetcher,
            extractor,
            store,
        }
    }

    /// Crawl from `seed` until the frontier drains or `cancel` fires.
    ///
    /// Fails only on setup problems; per-URL failures are reported in the
    /// summary.
    pub async fn run(&self, seed: &str, cancel: CancellationToken) -> Result<CrawlReport> {
        self.config
            .validate()
            .map_err(|e| AppError::setup(format!("invalid configuration: {e}")))?;
        let seed = canonicalize_absolute(seed)
            .map_err(|e| AppError::setup(format!("invalid seed URL '{seed}': {e}")))?;

        let settings = &self.config.crawler;
        let start_time = Utc::now();
        let started = Instant::now();

        let (edges, writer) =
            PersistenceWriter::new(Arc::clone(&self.store), &self.config.storage).spawn();

        let frontier = Arc::new(Frontier::new());
        let ctx = Arc::new(CrawlContext {
            coordinator: TerminationCoordinator::new(Arc::clone(&frontier)),
            frontier,
            visited: VisitedCache::new(),
            graph: CrawlGraph::new(),
            limiter: OutboundLimiter::new(settings.max_concurrent_fetches),
            retry: RetryPolicy::from_config(settings),
            fetcher: Arc::clone(&self.fetcher),
            extractor: Arc::clone(&self.extractor),
            edges,
            counters: CrawlCounters::default(),
            failures: Mutex::new(Vec::new()),
            cancel: cancel.clone(),
            max_depth: settings.max_depth,
            fetch_timeout: settings.fetch_timeout(),
        });

        log::info!(
            "Crawling {} (max depth {}, {} workers, {} concurrent fetches, {} retries)",
            seed,
            settings.max_depth,
            settings.max_workers,
            settings.max_concurrent_fetches,
            settings.max_retries
        );

        ctx.frontier.enqueue(WorkItem::seed(seed.as_str()));

        let mut workers = JoinSet::new();
        for id in 0..settings.max_workers {
            workers.spawn(Worker::new(id, Arc::clone(&ctx)).run());
        }

        let interrupted = tokio::select! {
            _ = join_workers(&mut workers) => false,
            _ = cancel.cancelled() => true,
        };

        if interrupted {
            log::warn!("Crawl interrupted, waiting for in-flight fetches");
            ctx.frontier.close();
            ctx.limiter.close();

            let grace = settings.shutdown_grace();
            if tokio::time::timeout(grace, join_workers(&mut workers))
                .await
                .is_err()
            {
                log::warn!(
                    "{} workers still busy after {:?}, aborting them",
                    workers.len(),
                    grace
                );
                workers.abort_all();
                join_workers(&mut workers).await;
            }
        } else {
            log::info!("Frontier drained");
        }

        let writer_report = writer.finish().await;
        let graph = ctx.graph.snapshot();
        let end_time = Utc::now();

        let summary = CrawlSummary {
            seed,
            start_time,
            end_time,
            elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            visited: ctx.visited.visited_count(),
            duplicates: ctx.counters.duplicates.load(Ordering::Relaxed),
            retries: ctx.counters.retries.load(Ordering::Relaxed),
            permanent_failures: ctx.counters.permanent_failures.load(Ordering::Relaxed),
            edges_persisted: writer_report.persisted,
            edges_dropped: writer_report.dropped,
            peak_concurrent_fetches: ctx.limiter.peak(),
            interrupted,
            failures: ctx.failures.lock().clone(),
        };

        Ok(CrawlReport { summary, graph })
    }
}

async fn join_workers(workers: &mut JoinSet<()>) {
    while let Some(result) = workers.join_next().await {
        if let Err(e) = result {
            if e.is_panic() {
                log::error!("Worker panicked: {e}");
            }
        }
    }
}
