// src/engine/limiter.rs

//! Outbound concurrency limiter.
//!
//! Caps simultaneous network fetches independently of the worker count.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Counting semaphore over outbound fetches.
#[derive(Debug)]
pub struct OutboundLimiter {
    permits: Arc<Semaphore>,
    capacity: usize,
    in_flight: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

/// Allowance for one fetch. Released on drop, on every exit path.
#[derive(Debug)]
pub struct OutboundPermit {
    _permit: OwnedSemaphorePermit,
    in_flight: Arc<AtomicUsize>,
}

impl Drop for OutboundPermit {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

impl OutboundLimiter {
    pub fn new(capacity: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Wait for a free permit.
    ///
    /// Returns `None` once the limiter is closed, including for callers that
    /// were already waiting.
    pub async fn acquire(&self) -> Option<OutboundPermit> {
        let permit = Arc::clone(&self.permits).acquire_owned().await.ok()?;
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        Some(OutboundPermit {
            _permit: permit,
            in_flight: Arc::clone(&self.in_flight),
        })
    }

    /// Refuse all further acquisitions. Permits already handed out stay valid.
    pub fn close(&self) {
        self.permits.close();
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of permits held at once.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}
