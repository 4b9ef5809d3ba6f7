//! # Customer Export
//!
//! Pulls customer records from a paginated JSON API, normalizes and
//! deduplicates them, and writes a sorted JSON export with quality
//! statistics.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`models`]: Raw and normalized customer records, export payload
//! - [`sources`]: The [`Source`] trait and the paginated [`ApiClient`]
//! - [`processor`]: Record transformation, enrichment and deduplication
//! - [`export`]: Sorted, atomic JSON export
//! - [`pipeline`]: One end-to-end run
//! - [`utils`]: Retry, HTTP, validation and display helpers
//! - [`config`]: Configuration management
//!
//! The library emits `tracing` events and never installs a subscriber.

pub mod config;
pub mod export;
pub mod models;
pub mod pipeline;
pub mod processor;
pub mod sources;
pub mod utils;

// Re-export commonly used types
pub use config::{load_config, Config};
pub use export::{ExportError, Exporter};
pub use models::{Customer, RawCustomer, SummaryReport};
pub use pipeline::{Pipeline, PipelineError};
pub use processor::CustomerProcessor;
pub use sources::{ApiClient, FetchError, Source};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
