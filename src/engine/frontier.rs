// src/engine/frontier.rs

//! Concurrent FIFO work queue.
//!
//! The frontier owns the `outstanding` counter used for termination
//! detection: it is bumped by every successful [`Frontier::enqueue`] before
//! the item becomes visible, and only decremented when a dequeued item is
//! resolved through the [`TerminationCoordinator`](super::TerminationCoordinator).
//! Dequeueing alone never changes it.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::models::WorkItem;

/// Unbounded multi-consumer work queue with explicit close.
#[derive(Debug, Default)]
pub struct Frontier {
    queue: Mutex<VecDeque<WorkItem>>,
    available: Notify,
    closed: AtomicBool,
    outstanding: AtomicUsize,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an item to the tail. Never blocks.
    ///
    /// Returns `false` if the frontier is closed; the item is dropped and
    /// `outstanding` is left untouched.
    pub fn enqueue(&self, item: WorkItem) -> bool {
        let mut queue = self.queue.lock();
        if self.closed.load(Ordering::Acquire) {
            log::debug!("Frontier closed, dropping {}", item.url);
            return false;
        }
        self.outstanding.fetch_add(1, Ordering::SeqCst);
        queue.push_back(item);
        drop(queue);

        self.available.notify_one();
        true
    }

    /// Wait for the next item. Returns `None` once the frontier is closed.
    ///
    /// Items still queued when the frontier closes are never handed out.
    pub async fn dequeue(&self) -> Option<WorkItem> {
        loop {
            let notified = self.available.notified();
            tokio::pin!(notified);
            // Register before looking at the queue so a close or enqueue
            // between the check and the await is not missed.
            notified.as_mut().enable();

            {
                let mut queue = self.queue.lock();
                if self.closed.load(Ordering::Acquire) {
                    return None;
                }
                if let Some(item) = queue.pop_front() {
                    return Some(item);
                }
            }

            notified.await;
        }
    }

    /// Close the frontier and wake every blocked dequeuer.
    ///
    /// Idempotent. Returns `true` only for the call that closed it.
    pub fn close(&self) -> bool {
        let was_closed = {
            let _queue = self.queue.lock();
            self.closed.swap(true, Ordering::AcqRel)
        };
        self.available.notify_waiters();
        !was_closed
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Items queued plus items dequeued but not yet resolved.
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::SeqCst)
    }

    /// Number of items waiting to be dequeued.
    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Settle one outstanding item, returning the count before the decrement.
    pub(crate) fn settle(&self) -> usize {
        self.outstanding.fetch_sub(1, Ordering::SeqCst)
    }
}
