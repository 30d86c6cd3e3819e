// src/pipeline/persist.rs

//! Persistence writer.
//!
//! A single consumer drains the edge write-ahead queue into an
//! [`EdgeStore`], so a slow store never blocks crawling. The queue is
//! unbounded; [`WriterHandle::finish`] is the flush barrier that drains it
//! completely before returning.

use std::sync::Arc;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::engine::ExponentialBackoff;
use crate::models::{Edge, StorageConfig};
use crate::storage::EdgeStore;

/// Producer side of the edge queue. Cheap to clone.
#[derive(Debug, Clone)]
pub struct EdgeSink {
    tx: UnboundedSender<Edge>,
}

impl EdgeSink {
    /// Queue an edge. Returns `false` if the writer has already shut down.
    pub fn record(&self, edge: Edge) -> bool {
        self.tx.send(edge).is_ok()
    }
}

/// Outcome of a writer's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriterReport {
    /// Edges upserted into the store
    pub persisted: usize,
    /// Edges given up on after exhausting store retries
    pub dropped: usize,
}

/// Handle to a running writer.
#[derive(Debug)]
pub struct WriterHandle {
    shutdown: CancellationToken,
    task: JoinHandle<WriterReport>,
}

impl WriterHandle {
    /// Stop accepting edges, apply everything already queued, flush the
    /// store and return the final counts.
    pub async fn finish(self) -> WriterReport {
        self.shutdown.cancel();
        match self.task.await {
            Ok(report) => report,
            Err(e) => {
                log::error!("Persistence writer task failed: {e}");
                WriterReport::default()
            }
        }
    }
}

/// Single consumer applying edges to a store.
pub struct PersistenceWriter {
    store: Arc<dyn EdgeStore>,
    flush_every: usize,
    max_retries: u32,
    backoff: ExponentialBackoff,
}

impl PersistenceWriter {
    pub fn new(store: Arc<dyn EdgeStore>, config: &StorageConfig) -> Self {
        let base = config.store_retry_delay_ms;
        Self {
            store,
            flush_every: config.flush_every.max(1),
            max_retries: config.max_store_retries,
            backoff: ExponentialBackoff::new(base, base.saturating_mul(32)),
        }
    }

    /// Start the writer on the current runtime.
    pub fn spawn(self) -> (EdgeSink, WriterHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let shutdown = CancellationToken::new();
        let task = tokio::spawn(self.run(rx, shutdown.clone()));
        (EdgeSink { tx }, WriterHandle { shutdown, task })
    }

    async fn run(self, mut rx: UnboundedReceiver<Edge>, shutdown: CancellationToken) -> WriterReport {
        let mut report = WriterReport::default();
        let mut since_flush = 0;

        loop {
            let edge = tokio::select! {
                biased;
                edge = rx.recv() => edge,
                _ = shutdown.cancelled() => {
                    // Flush barrier: refuse new edges, keep the ones queued.
                    rx.close();
                    rx.recv().await
                }
            };
            let Some(edge) = edge else {
                break;
            };

            if self.apply(&edge).await {
                report.persisted += 1;
                since_flush += 1;
            } else {
                report.dropped += 1;
            }

            if since_flush >= self.flush_every {
                self.flush().await;
                since_flush = 0;
            }
        }

        self.flush().await;
        log::debug!(
            "Persistence writer done: {} persisted, {} dropped",
            report.persisted,
            report.dropped
        );
        report
    }

    /// Upsert one edge, retrying store failures.
    async fn apply(&self, edge: &Edge) -> bool {
        let mut attempt = 0;
        loop {
            match self.store.upsert_edge(edge).await {
                Ok(()) => return true,
                Err(e) if attempt < self.max_retries => {
                    log::warn!(
                        "Upsert of {} -> {} failed (attempt {}): {}",
                        edge.parent,
                        edge.child,
                        attempt + 1,
                        e
                    );
                    tokio::time::sleep(self.backoff.delay(attempt)).await;
                    attempt += 1;
                }
                Err(e) => {
                    log::error!(
                        "Dropping edge {} -> {} after {} attempts: {}",
                        edge.parent,
                        edge.child,
                        attempt + 1,
                        e
                    );
                    return false;
                }
            }
        }
    }

    async fn flush(&self) {
        let mut attempt = 0;
        while let Err(e) = self.store.flush().await {
            if attempt >= self.max_retries {
                log::error!("Edge store flush failed after {} attempts: {}", attempt + 1, e);
                return;
            }
            log::warn!("Edge store flush failed (attempt {}): {}", attempt + 1, e);
            tokio::time::sleep(self.backoff.delay(attempt)).await;
            attempt += 1;
        }
    }
}
