// src/engine/graph.rs

//! Adjacency graph of visited pages.

use std::collections::BTreeMap;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

/// Snapshot form of the graph, ordered by URL for stable output.
pub type GraphSnapshot = BTreeMap<String, Vec<String>>;

/// URL -> children discovered on that page.
///
/// One entry per successfully visited URL, written exactly once. The
/// visited-cache claim guarantees a single writer per key.
#[derive(Debug, Default)]
pub struct CrawlGraph {
    adjacency: DashMap<String, Vec<String>>,
}

impl CrawlGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert the entry for `url`. Returns `false` if it already existed,
    /// in which case the existing entry is kept.
    pub fn record(&self, url: &str, children: Vec<String>) -> bool {
        match self.adjacency.entry(url.to_string()) {
            Entry::Occupied(_) => {
                log::warn!("Graph entry for {url} already written, keeping the first");
                false
            }
            Entry::Vacant(slot) => {
                slot.insert(children);
                true
            }
        }
    }

    pub fn children(&self, url: &str) -> Option<Vec<String>> {
        self.adjacency.get(url).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.adjacency.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adjacency.is_empty()
    }

    pub fn snapshot(&self) -> GraphSnapshot {
        self.adjacency
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }
}
