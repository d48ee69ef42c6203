//! jobtrail - Resilient job posting collector
//!
//! Collects job postings from board APIs, search aggregators and a
//! browser-driven job search, deduplicates them by canonical URL and keeps an
//! append-only archive of every posting ever seen.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Sources file and environment overrides
//! - [`crawler`] - Source collectors, the HTTP fetcher and run orchestration
//! - [`parser`] - Listing field extraction and text normalization
//! - [`models`] - Postings, sources and snapshots
//! - [`storage`] - Dedup, the local rolling store, the archive and reconciliation
//! - [`runner`] - End-to-end run wiring
//! - [`utils`] - Retry policy, error types and small helpers
//!
//! # Example
//!
//! ```no_run
//! use jobtrail::config::Config;
//! use jobtrail::runner::run_once;
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load(Path::new("config/sources.toml"))?;
//!     let outcome = run_once(config, None).await?;
//!     println!("{} new postings", outcome.report.collected);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod crawler;
pub mod error;
pub mod models;
pub mod parser;
pub mod runner;
pub mod storage;
pub mod utils;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::crawler::{CollectionRun, Collector};
    pub use crate::error::{Error, Result};
    pub use crate::models::{Posting, Snapshot, Source};
    pub use crate::parser::FieldSet;
    pub use crate::storage::{SeenSet, SnapshotReconciler};
}

// Direct re-exports for convenience
pub use models::{Posting, Snapshot, Source};
