// src/models/mod.rs

//! Domain models for the crawler application.
//!
//! This module contains the data structures shared between the engine,
//! the persistence layer and the CLI.

mod config;
mod edge;
mod stats;
mod work;

// Re-export all public types
pub use config::{Config, CrawlerConfig, LinkConfig, LoggingConfig, StorageConfig};
pub use edge::{Edge, EdgeRecord};
pub use stats::{CrawlSummary, FailureRecord};
pub use work::WorkItem;
