//! Source collectors
//!
//! Every source (board API, search aggregator, browser-driven front-end)
//! implements [`Collector`]. Collectors do their own retrying; the
//! orchestrator in [`run`] only sees a list of postings per source.

pub mod board;
pub mod browser;
pub mod fetcher;
pub mod run;
pub mod search;
pub mod url;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::models::Posting;
use crate::storage::dedup::SeenSet;
use crate::utils::error::CollectorError;

pub use board::{BoardApiCollector, BoardKind};
pub use browser::BrowserCollector;
pub use fetcher::HttpFetcher;
pub use run::{CollectionRun, RunSummary};
pub use search::{SearchApiCollector, SearchProvider};

/// A source of job postings
#[async_trait]
pub trait Collector: Send + Sync {
    /// Label used in logs
    fn name(&self) -> &str;

    /// Collect postings observed on `as_of`
    ///
    /// `seen` holds URLs that are already archived; collectors skip them
    /// where doing so saves work. Retries are exhausted before an error is
    /// returned.
    async fn collect(
        &self,
        as_of: NaiveDate,
        seen: &SeenSet,
    ) -> Result<Vec<Posting>, CollectorError>;

    /// Collect without failing: errors are logged and yield no postings
    async fn fetch(&self, as_of: NaiveDate, seen: &SeenSet) -> Vec<Posting> {
        match self.collect(as_of, seen).await {
            Ok(postings) => {
                tracing::info!(source = self.name(), count = postings.len(), "Collector finished");
                postings
            }
            Err(e @ (CollectorError::MissingCredentials(_) | CollectorError::MissingSession(_))) => {
                tracing::error!(source = self.name(), error = %e, "Collector is not configured");
                Vec::new()
            }
            Err(e) => {
                tracing::warn!(source = self.name(), error = %e, "Collector failed, no postings from this source");
                Vec::new()
            }
        }
    }
}
