//! Collection orchestration
//!
//! Runs every enabled collector against the seen-set and gathers their
//! postings into one deduplicated batch. Sequential mode absorbs each
//! collector's output before the next one starts; parallel mode runs them
//! all against the same seen-set and absorbs the outputs afterwards in
//! configuration order, which yields the same batch.

use chrono::NaiveDate;
use futures::future::join_all;

use crate::crawler::Collector;
use crate::models::Posting;
use crate::storage::dedup::SeenSet;

/// Per-collector outcome of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSummary {
    pub name: String,
    /// Postings the collector returned
    pub returned: usize,
    /// Postings kept after dedup against earlier collectors and the archive
    pub accepted: usize,
}

/// Outcome of a collection run
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub postings: Vec<Posting>,
    pub sources: Vec<SourceSummary>,
}

/// Drives a set of collectors for one run
pub struct CollectionRun {
    collectors: Vec<Box<dyn Collector>>,
    parallel: bool,
}

impl CollectionRun {
    pub fn new(collectors: Vec<Box<dyn Collector>>) -> Self {
        Self {
            collectors,
            parallel: false,
        }
    }

    #[must_use]
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn len(&self) -> usize {
        self.collectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collectors.is_empty()
    }

    /// Run all collectors; `seen` grows with every accepted posting
    pub async fn execute(&self, as_of: NaiveDate, seen: &mut SeenSet) -> RunSummary {
        if self.collectors.is_empty() {
            tracing::warn!("No collectors enabled");
            return RunSummary::default();
        }

        tracing::info!(
            collectors = self.collectors.len(),
            parallel = self.parallel,
            as_of = %as_of,
            "Starting collection"
        );

        let mut summary = RunSummary::default();

        if self.parallel {
            let snapshot = seen.clone();
            let outputs = join_all(
                self.collectors
                    .iter()
                    .map(|collector| collector.fetch(as_of, &snapshot)),
            )
            .await;

            for (collector, output) in self.collectors.iter().zip(outputs) {
                absorb_into(&mut summary, collector.name(), output, seen);
            }
        } else {
            for collector in &self.collectors {
                let output = collector.fetch(as_of, seen).await;
                absorb_into(&mut summary, collector.name(), output, seen);
            }
        }

        tracing::info!(
            total = summary.postings.len(),
            "Collection finished"
        );
        summary
    }
}

fn absorb_into(summary: &mut RunSummary, name: &str, output: Vec<Posting>, seen: &mut SeenSet) {
    let returned = output.len();
    let accepted = seen.absorb(output);

    tracing::debug!(source = name, returned, accepted = accepted.len(), "Absorbed collector output");

    summary.sources.push(SourceSummary {
        name: name.to_string(),
        returned,
        accepted: accepted.len(),
    });
    summary.postings.extend(accepted);
}
