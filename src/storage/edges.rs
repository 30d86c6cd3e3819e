//! Edge store implementations.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;

use crate::error::StoreError;
use crate::models::{Edge, EdgeRecord};

use super::EdgeStore;
use super::local::write_atomic;

type EdgeMap = HashMap<(String, String), EdgeRecord>;

fn upsert(records: &mut EdgeMap, edge: &Edge) {
    let now = Utc::now();
    records
        .entry((edge.parent.clone(), edge.child.clone()))
        .and_modify(|record| record.bump(now))
        .or_insert_with(|| EdgeRecord::first(edge, now));
}

fn sorted(records: &EdgeMap) -> Vec<EdgeRecord> {
    let mut out: Vec<EdgeRecord> = records.values().cloned().collect();
    out.sort_by(|a, b| (&a.parent, &a.child).cmp(&(&b.parent, &b.child)));
    out
}

/// In-process edge store.
#[derive(Debug, Default)]
pub struct MemoryEdgeStore {
    records: Mutex<EdgeMap>,
}

impl MemoryEdgeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All records ordered by `(parent, child)`.
    pub fn records(&self) -> Vec<EdgeRecord> {
        sorted(&self.records.lock())
    }
}

#[async_trait]
impl EdgeStore for MemoryEdgeStore {
    async fn upsert_edge(&self, edge: &Edge) -> Result<(), StoreError> {
        upsert(&mut self.records.lock(), edge);
        Ok(())
    }

    async fn flush(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn get(&self, edge: &Edge) -> Result<Option<EdgeRecord>, StoreError> {
        Ok(self
            .records
            .lock()
            .get(&(edge.parent.clone(), edge.child.clone()))
            .cloned())
    }

    async fn len(&self) -> Result<usize, StoreError> {
        Ok(self.records.lock().len())
    }
}

/// File-backed edge store.
///
/// Upserts are applied in memory and written out as a whole on
/// [`flush`](EdgeStore::flush), replacing the file atomically. Opening an
/// existing file carries its occurrence counts over.
#[derive(Debug)]
pub struct JsonEdgeStore {
    path: PathBuf,
    records: Mutex<EdgeMap>,
}

impl JsonEdgeStore {
    /// Open (or create) the store at `path`.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let records = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let stored: Vec<EdgeRecord> = serde_json::from_slice(&bytes)?;
                stored
                    .into_iter()
                    .map(|r| ((r.parent.clone(), r.child.clone()), r))
                    .collect()
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => EdgeMap::new(),
            Err(e) => return Err(StoreError::Io(e)),
        };

        // Fail at open time rather than on the first flush.
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        log::debug!(
            "Opened edge store {} with {} edges",
            path.display(),
            records.len()
        );
        Ok(Self {
            path,
            records: Mutex::new(records),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl EdgeStore for JsonEdgeStore {
    async fn upsert_edge(&self, edge: &Edge) -> Result<(), StoreError> {
        upsert(&mut self.records.lock(), edge);
        Ok(())
    }

    async fn flush(&self) -> Result<(), StoreError> {
        let snapshot = sorted(&self.records.lock());
        let bytes = serde_json::to_vec_pretty(&snapshot)?;
        write_atomic(&self.path, &bytes).await?;
        Ok(())
    }

    async fn get(&self, edge: &Edge) -> Result<Option<EdgeRecord>, StoreError> {
        Ok(self
            .records
            .lock()
            .get(&(edge.parent.clone(), edge.child.clone()))
            .cloned())
    }

    async fn len(&self) -> Result<usize, StoreError> {
        Ok(self.records.lock().len())
    }
}
