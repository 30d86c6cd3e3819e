//! Pipeline entry points for crawler operations.
//!
//! - `run_crawler`: build the production collaborators and crawl a seed
//! - `PersistenceWriter`: drain discovered edges into the edge store

pub mod crawl;
pub mod persist;

pub use crawl::{crawl_and_persist, run_crawler};
pub use persist::{EdgeSink, PersistenceWriter, WriterHandle, WriterReport};
