// src/models/work.rs

use serde::{Deserialize, Serialize};

use super::Edge;

/// A unit of crawl work travelling through the frontier.
///
/// Items are never mutated after creation. A retry is a new item with a
/// bumped `retry_count`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    pub url: String,
    /// Hop distance from the seed
    pub depth: u32,
    pub retry_count: u32,
    /// Page the URL was discovered on; `None` for the seed
    pub parent_url: Option<String>,
}

impl WorkItem {
    /// The root item of a crawl.
    pub fn seed(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            depth: 0,
            retry_count: 0,
            parent_url: None,
        }
    }

    /// An item for a link discovered on this item's page.
    pub fn child(&self, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            depth: self.depth + 1,
            retry_count: 0,
            parent_url: Some(self.url.clone()),
        }
    }

    /// A copy of this item for the next fetch attempt.
    pub fn retried(&self) -> Self {
        Self {
            retry_count: self.retry_count + 1,
            ..self.clone()
        }
    }

    /// Retries inherit the visited claim taken by the first attempt.
    pub fn is_retry(&self) -> bool {
        self.retry_count > 0
    }

    /// Total fetch attempts this item represents.
    pub fn attempt(&self) -> u32 {
        self.retry_count + 1
    }

    /// The `(parent, url)` edge this item contributes to the graph.
    pub fn edge(&self) -> Option<Edge> {
        self.parent_url
            .as_ref()
            .map(|parent| Edge::new(parent.clone(), self.url.clone()))
    }
}
