//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Traversal and concurrency settings
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Link extraction rules
    #[serde(default)]
    pub links: LinkConfig,

    /// Output and persistence settings
    #[serde(default)]
    pub storage: StorageConfig,

    /// Log output settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration, using defaults only when the file does not exist.
    ///
    /// A file that exists but cannot be parsed is a setup failure.
    pub fn load_if_present(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            log::warn!("No config at {}. Using defaults.", path.display());
            return Ok(Self::default());
        }
        Self::load(path).map_err(|e| {
            AppError::config(format!("failed to load {}: {}", path.display(), e))
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.crawler.user_agent.trim().is_empty() {
            return Err(AppError::validation("crawler.user_agent is empty"));
        }
        if self.crawler.timeout_secs == 0 {
            return Err(AppError::validation("crawler.timeout_secs must be > 0"));
        }
        if self.crawler.max_workers == 0 {
            return Err(AppError::validation("crawler.max_workers must be > 0"));
        }
        if self.crawler.max_concurrent_fetches == 0 {
            return Err(AppError::validation(
                "crawler.max_concurrent_fetches must be > 0",
            ));
        }
        if self.crawler.retry_max_delay_ms < self.crawler.retry_base_delay_ms {
            return Err(AppError::validation(
                "crawler.retry_max_delay_ms must be >= crawler.retry_base_delay_ms",
            ));
        }
        if self.storage.flush_every == 0 {
            return Err(AppError::validation("storage.flush_every must be > 0"));
        }
        self.links.compiled_pattern()?;
        Ok(())
    }
}

/// Traversal, retry and concurrency settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Per-fetch timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Maximum hop distance from the seed
    #[serde(default = "defaults::max_depth")]
    pub max_depth: u32,

    /// Number of workers draining the frontier
    #[serde(default = "defaults::max_workers")]
    pub max_workers: usize,

    /// Cap on simultaneous network fetches
    #[serde(default = "defaults::max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,

    /// Retries per URL after the first attempt
    #[serde(default = "defaults::max_retries")]
    pub max_retries: u32,

    /// Backoff before the first retry, in milliseconds
    #[serde(default = "defaults::retry_base_delay")]
    pub retry_base_delay_ms: u64,

    /// Upper bound for the retry backoff, in milliseconds
    #[serde(default = "defaults::retry_max_delay")]
    pub retry_max_delay_ms: u64,

    /// How long an interrupted crawl waits for in-flight work
    #[serde(default = "defaults::shutdown_grace")]
    pub shutdown_grace_secs: u64,
}

impl CrawlerConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            max_depth: defaults::max_depth(),
            max_workers: defaults::max_workers(),
            max_concurrent_fetches: defaults::max_concurrent_fetches(),
            max_retries: defaults::max_retries(),
            retry_base_delay_ms: defaults::retry_base_delay(),
            retry_max_delay_ms: defaults::retry_max_delay(),
            shutdown_grace_secs: defaults::shutdown_grace(),
        }
    }
}

/// Link extraction rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkConfig {
    /// Regex applied to raw `href` values. When it has a capture group,
    /// the first group is the part of the link that is followed.
    #[serde(default)]
    pub pattern: Option<String>,

    /// Only follow links on the same host as the page they appear on
    #[serde(default = "defaults::same_host_only")]
    pub same_host_only: bool,
}

impl LinkConfig {
    /// Compile the link pattern, if any.
    pub fn compiled_pattern(&self) -> Result<Option<Regex>> {
        self.pattern
            .as_deref()
            .map(|p| {
                Regex::new(p)
                    .map_err(|e| AppError::validation(format!("links.pattern is invalid: {e}")))
            })
            .transpose()
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            pattern: None,
            same_host_only: defaults::same_host_only(),
        }
    }
}

/// Output files and persistence writer tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory receiving the snapshot, edge store and stats
    #[serde(default = "defaults::output_dir")]
    pub output_dir: String,

    #[serde(default = "defaults::snapshot_file")]
    pub snapshot_file: String,

    #[serde(default = "defaults::edges_file")]
    pub edges_file: String,

    #[serde(default = "defaults::stats_file")]
    pub stats_file: String,

    /// Flush the edge store after this many applied edges
    #[serde(default = "defaults::flush_every")]
    pub flush_every: usize,

    /// Attempts made for a failed upsert before the edge is dropped
    #[serde(default = "defaults::max_store_retries")]
    pub max_store_retries: u32,

    #[serde(default = "defaults::store_retry_delay")]
    pub store_retry_delay_ms: u64,
}

impl StorageConfig {
    pub fn output_path(&self) -> PathBuf {
        PathBuf::from(&self.output_dir)
    }

    pub fn edges_path(&self) -> PathBuf {
        self.output_path().join(&self.edges_file)
    }

    /// The same settings rooted at another directory.
    pub fn with_output_dir(&self, dir: impl AsRef<Path>) -> Self {
        Self {
            output_dir: dir.as_ref().to_string_lossy().into_owned(),
            ..self.clone()
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            output_dir: defaults::output_dir(),
            snapshot_file: defaults::snapshot_file(),
            edges_file: defaults::edges_file(),
            stats_file: defaults::stats_file(),
            flush_every: defaults::flush_every(),
            max_store_retries: defaults::max_store_retries(),
            store_retry_delay_ms: defaults::store_retry_delay(),
        }
    }
}

/// Log output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "defaults::log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

mod defaults {
    // Crawler defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; graph-crawler/0.1)".into()
    }
    pub fn timeout() -> u64 {
        10
    }
    pub fn max_depth() -> u32 {
        1
    }
    pub fn max_workers() -> usize {
        8
    }
    pub fn max_concurrent_fetches() -> usize {
        4
    }
    pub fn max_retries() -> u32 {
        2
    }
    pub fn retry_base_delay() -> u64 {
        200
    }
    pub fn retry_max_delay() -> u64 {
        5_000
    }
    pub fn shutdown_grace() -> u64 {
        10
    }

    // Link defaults
    pub fn same_host_only() -> bool {
        true
    }

    // Storage defaults
    pub fn output_dir() -> String {
        "output".into()
    }
    pub fn snapshot_file() -> String {
        "graph.json".into()
    }
    pub fn edges_file() -> String {
        "edges.json".into()
    }
    pub fn stats_file() -> String {
        "stats.json".into()
    }
    pub fn flush_every() -> usize {
        100
    }
    pub fn max_store_retries() -> u32 {
        5
    }
    pub fn store_retry_delay() -> u64 {
        100
    }

    // Logging defaults
    pub fn log_level() -> String {
        "info".into()
    }
}
