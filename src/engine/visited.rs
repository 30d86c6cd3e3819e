// src/engine/visited.rs

//! Deduplication gate shared by all workers.

use dashmap::DashSet;

/// Thread-safe record of claimed and visited URLs.
///
/// A URL is *claimed* by the first worker to dequeue it; only that worker
/// (and the retries it spawns) ever fetches the URL. A URL is *visited* once
/// that fetch and its parse succeeded.
#[derive(Debug, Default)]
pub struct VisitedCache {
    claimed: DashSet<String>,
    visited: DashSet<String>,
}

impl VisitedCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomic check-and-insert. Returns `true` iff this call is the first
    /// claimant for `url`.
    pub fn try_claim(&self, url: &str) -> bool {
        self.claimed.insert(url.to_string())
    }

    /// Record a successful fetch and parse of a claimed URL.
    pub fn mark_visited(&self, url: &str) -> bool {
        debug_assert!(self.claimed.contains(url), "visiting unclaimed url {url}");
        self.visited.insert(url.to_string())
    }

    pub fn is_claimed(&self, url: &str) -> bool {
        self.claimed.contains(url)
    }

    pub fn is_visited(&self, url: &str) -> bool {
        self.visited.contains(url)
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    pub fn claimed_count(&self) -> usize {
        self.claimed.len()
    }
}
