//! End-to-end run wiring
//!
//! Builds the enabled collectors from configuration, rebuilds the seen-set,
//! runs the collection and reconciles the resulting snapshot.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};

use crate::config::{BrowserSourceConfig, Config};
use crate::crawler::browser::save_session as record_session;
use crate::crawler::{
    BoardApiCollector, BoardKind, BrowserCollector, CollectionRun, Collector, HttpFetcher,
    RunSummary, SearchApiCollector, SearchProvider,
};
use crate::error::Result;
use crate::models::Snapshot;
use crate::storage::{ReconcileReport, SnapshotReconciler};

/// What one run collected and persisted
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub summary: RunSummary,
    pub report: ReconcileReport,
}

/// Instantiate the enabled collectors in configuration order
pub fn build_collectors(config: &Config, fetcher: &Arc<HttpFetcher>) -> Vec<Box<dyn Collector>> {
    let sources = &config.sources;
    let mut collectors: Vec<Box<dyn Collector>> = Vec::new();

    for (kind, source) in [
        (BoardKind::Greenhouse, &sources.greenhouse),
        (BoardKind::Lever, &sources.lever),
    ] {
        if source.enabled {
            collectors.push(Box::new(BoardApiCollector::new(
                kind,
                source.clone(),
                Arc::clone(fetcher),
            )));
        }
    }

    for (provider, source) in [
        (SearchProvider::SerpApi, &sources.serpapi),
        (SearchProvider::SearchApi, &sources.searchapi),
    ] {
        if source.enabled {
            collectors.push(Box::new(SearchApiCollector::new(
                provider,
                source.clone(),
                Arc::clone(fetcher),
            )));
        }
    }

    if sources.linkedin_browser.enabled {
        collectors.push(Box::new(BrowserCollector::new(
            sources.linkedin_browser.clone(),
            Arc::clone(fetcher),
        )));
    }

    collectors
}

/// Run every enabled collector once and reconcile the snapshot
///
/// `as_of` defaults to today's UTC date. Only storage failures fail the
/// run; a collector that fails contributes no postings.
pub async fn run_once(config: Config, as_of: Option<NaiveDate>) -> Result<RunOutcome> {
    let started_at = Utc::now();
    let as_of = as_of.unwrap_or_else(|| started_at.date_naive());

    let fetcher = Arc::new(HttpFetcher::with_config(
        config.http.requests_per_second,
        config.retry.clone(),
        config.request_timeout(),
    )?);

    let collectors = build_collectors(&config, &fetcher);
    let run = CollectionRun::new(collectors).parallel(config.run.parallel_collectors);
    let reconciler = SnapshotReconciler::from_config(&config.storage)?;

    run_with(&run, &reconciler, as_of, started_at).await
}

/// Collect with `run` and reconcile through `reconciler`
pub async fn run_with(
    run: &CollectionRun,
    reconciler: &SnapshotReconciler,
    as_of: NaiveDate,
    started_at: DateTime<Utc>,
) -> Result<RunOutcome> {
    let mut seen = reconciler.load_seen_set().await?;
    let summary = run.execute(as_of, &mut seen).await;

    for source in &summary.sources {
        tracing::info!(
            source = %source.name,
            returned = source.returned,
            accepted = source.accepted,
            "Source summary"
        );
    }

    let snapshot = Snapshot::new(started_at, summary.postings.clone());
    let report = reconciler.reconcile(&snapshot).await?;

    tracing::info!(
        snapshot_id = %report.snapshot_id,
        collected = report.collected,
        local_rows = report.local_rows,
        archive_rows = ?report.archive_rows,
        conflicts = report.conflicts,
        "Run complete"
    );

    Ok(RunOutcome { summary, report })
}

/// Record a browser session for later runs
///
/// Returns the number of cookies saved.
pub async fn save_session(
    config: &BrowserSourceConfig,
    state_path: Option<PathBuf>,
    wait: Duration,
) -> Result<usize> {
    let path = state_path.unwrap_or_else(|| config.storage_state_path.clone());
    Ok(record_session(&config.site, &path, wait).await?)
}
