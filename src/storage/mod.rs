//! Durable output of a crawl.
//!
//! Two concerns live here:
//! - [`EdgeStore`]: idempotent upserts of discovered edges, fed by the
//!   persistence writer while the crawl runs
//! - [`LocalStorage`]: the final graph snapshot and run statistics
//!
//! ## Directory Structure
//!
//! ```text
//! output/
//! ├── edges.json    # Edge store: (parent, child) -> occurrence count
//! ├── graph.json    # Snapshot: url -> [child urls]
//! └── stats.json    # Summary of the last run
//! ```

pub mod edges;
pub mod local;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::models::{Edge, EdgeRecord};

// Re-export for convenience
pub use edges::{JsonEdgeStore, MemoryEdgeStore};
pub use local::{LocalStorage, WriteMetadata};

/// Backend for discovered edges.
///
/// `upsert_edge` must be safe to retry: applying the same edge twice only
/// bumps its occurrence count.
#[async_trait]
pub trait EdgeStore: Send + Sync {
    /// Insert `edge` or bump its occurrence count.
    ///
    /// Parent and child fields are only set on first insert.
    async fn upsert_edge(&self, edge: &Edge) -> Result<(), StoreError>;

    /// Make applied upserts durable.
    async fn flush(&self) -> Result<(), StoreError>;

    /// Current record for an edge, if any.
    async fn get(&self, edge: &Edge) -> Result<Option<EdgeRecord>, StoreError>;

    /// Number of distinct edges held.
    async fn len(&self) -> Result<usize, StoreError>;
}
