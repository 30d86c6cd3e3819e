// src/models/stats.rs

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A URL that was given up on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub url: String,
    /// Fetches made before giving up
    pub attempts: u32,
    pub reason: String,
}

/// Summary of a crawl run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlSummary {
    pub seed: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub elapsed_ms: u64,
    /// URLs fetched and parsed successfully
    pub visited: usize,
    /// Items skipped because their URL was already claimed
    pub duplicates: usize,
    /// Re-enqueued fetch attempts
    pub retries: usize,
    pub permanent_failures: usize,
    pub edges_persisted: usize,
    pub edges_dropped: usize,
    pub peak_concurrent_fetches: usize,
    /// Whether the run was stopped by an interrupt instead of draining
    pub interrupted: bool,
    #[serde(default)]
    pub failures: Vec<FailureRecord>,
}

impl CrawlSummary {
    pub fn elapsed(&self) -> Duration {
        Duration::from_millis(self.elapsed_ms)
    }
}
