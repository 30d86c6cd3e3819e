//! Local filesystem storage for crawl results.
//!
//! Every file is replaced atomically (write to a temp file, then rename) so
//! a crash never leaves a partially written snapshot behind.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Serialize, de::DeserializeOwned};
use tokio::io::AsyncWriteExt;

use crate::engine::GraphSnapshot;
use crate::error::{AppError, Result};
use crate::models::{CrawlSummary, StorageConfig};

/// Write `bytes` to `path` through a sibling temp file and a rename.
pub(crate) async fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    let tmp = path.with_extension("tmp");
    let mut file = tokio::fs::File::create(&tmp).await?;
    file.write_all(bytes).await?;
    file.flush().await?;
    file.sync_all().await?;
    drop(file);

    tokio::fs::rename(&tmp, path).await
}

/// Metadata about a snapshot write.
#[derive(Debug, Clone)]
pub struct WriteMetadata {
    /// Number of URLs in the snapshot
    pub node_count: usize,
    /// Number of child links across all entries
    pub link_count: usize,
    pub snapshot_location: PathBuf,
    pub stats_location: PathBuf,
    pub timestamp: DateTime<Utc>,
}

/// Local filesystem storage backend.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root_dir: PathBuf,
    snapshot_file: String,
    stats_file: String,
}

impl LocalStorage {
    /// Create a new LocalStorage rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        let defaults = StorageConfig::default();
        Self {
            root_dir: root_dir.into(),
            snapshot_file: defaults.snapshot_file,
            stats_file: defaults.stats_file,
        }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self {
            root_dir: config.output_path(),
            snapshot_file: config.snapshot_file.clone(),
            stats_file: config.stats_file.clone(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root_dir
    }

    /// Get the full path for a relative key.
    fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<PathBuf> {
        let path = self.path(key);
        let bytes = serde_json::to_vec_pretty(value)?;
        write_atomic(&path, &bytes).await?;
        Ok(path)
    }

    /// Read JSON data, returning None if the file doesn't exist.
    async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match tokio::fs::read(self.path(key)).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Write the graph snapshot and the run summary.
    pub async fn write_snapshot(
        &self,
        graph: &GraphSnapshot,
        summary: &CrawlSummary,
    ) -> Result<WriteMetadata> {
        let snapshot_location = self.write_json(&self.snapshot_file, graph).await?;
        log::debug!(
            "Snapshot: {} pages written to {}",
            graph.len(),
            snapshot_location.display()
        );

        let stats_location = self.write_json(&self.stats_file, summary).await?;

        Ok(WriteMetadata {
            node_count: graph.len(),
            link_count: graph.values().map(Vec::len).sum(),
            snapshot_location,
            stats_location,
            timestamp: Utc::now(),
        })
    }

    pub async fn load_snapshot(&self) -> Result<Option<GraphSnapshot>> {
        self.read_json(&self.snapshot_file).await
    }

    pub async fn load_summary(&self) -> Result<Option<CrawlSummary>> {
        self.read_json(&self.stats_file).await
    }
}
