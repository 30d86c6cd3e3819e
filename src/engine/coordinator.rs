// src/engine/coordinator.rs

//! Termination detection for a queue that grows while it drains.
//!
//! "Queue empty" is not enough to stop: a worker may be mid-fetch and about
//! to enqueue children. The frontier's `outstanding` counter covers both
//! queued and in-flight items, so the crawl is complete exactly when it
//! reaches zero. A worker always enqueues an item's children (or its retry)
//! before resolving the item itself, which keeps the counter above zero
//! while more work is on its way.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use super::Frontier;

/// Closes the frontier exactly once, when the last outstanding item resolves.
#[derive(Debug)]
pub struct TerminationCoordinator {
    frontier: Arc<Frontier>,
    drained: AtomicBool,
}

impl TerminationCoordinator {
    pub fn new(frontier: Arc<Frontier>) -> Self {
        Self {
            frontier,
            drained: AtomicBool::new(false),
        }
    }

    /// Mark one dequeued item as fully handled.
    ///
    /// Must be called once per dequeued item, after any enqueue the item
    /// causes.
    pub fn resolve(&self) {
        let before = self.frontier.settle();
        debug_assert!(before > 0, "resolve called without an outstanding item");
        if before == 1 {
            self.finish();
        }
    }

    /// Whether the crawl ran out of work (as opposed to being interrupted).
    pub fn is_drained(&self) -> bool {
        self.drained.load(Ordering::Acquire)
    }

    pub fn outstanding(&self) -> usize {
        self.frontier.outstanding()
    }

    fn finish(&self) {
        if self.drained.swap(true, Ordering::AcqRel) {
            return;
        }
        log::debug!("Outstanding work reached zero, closing frontier");
        self.frontier.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WorkItem;

    #[tokio::test]
    async fn test_closes_only_when_all_resolved() {
        let frontier = Arc::new(Frontier::new());
        let coordinator = TerminationCoordinator::new(Arc::clone(&frontier));

        let seed = WorkItem::seed("a");
        frontier.enqueue(seed.clone());
        let item = frontier.dequeue().await.unwrap();

        // Children are enqueued before the parent resolves.
        frontier.enqueue(item.child("b"));
        frontier.enqueue(item.child("c"));
        coordinator.resolve();
        assert!(!frontier.is_closed());
        assert_eq!(coordinator.outstanding(), 2);

        frontier.dequeue().await.unwrap();
        coordinator.resolve();
        assert!(!coordinator.is_drained());

        frontier.dequeue().await.unwrap();
        coordinator.resolve();
        assert!(coordinator.is_drained());
        assert!(frontier.is_closed());
        assert!(frontier.dequeue().await.is_none());
    }

    #[tokio::test]
    async fn test_retry_keeps_crawl_alive() {
        let frontier = Arc::new(Frontier::new());
        let coordinator = TerminationCoordinator::new(Arc::clone(&frontier));

        frontier.enqueue(WorkItem::seed("a"));
        let item = frontier.dequeue().await.unwrap();
        frontier.enqueue(item.retried());
        coordinator.resolve();
        assert!(!coordinator.is_drained());

        let retry = frontier.dequeue().await.unwrap();
        assert_eq!(retry.retry_count, 1);
        coordinator.resolve();
        assert!(coordinator.is_drained());
    }

    #[test]
    fn test_interrupt_close_is_not_drained() {
        let frontier = Arc::new(Frontier::new());
        let coordinator = TerminationCoordinator::new(Arc::clone(&frontier));
        frontier.enqueue(WorkItem::seed("a"));

        frontier.close();
        assert!(!coordinator.is_drained());
        assert_eq!(coordinator.outstanding(), 1);
    }
}
