//! Snapshot reconciliation
//!
//! Combines a run's snapshot with everything stored before it: the local
//! rolling store is merged and rewritten atomically, then the archive goes
//! through a read, merge and conditional write cycle that retries when a
//! concurrent run modified it in between.

use crate::config::StorageConfig;
use crate::models::{Posting, Snapshot};
use crate::storage::archive::{ArchiveStore, WriteOutcome, LATEST_OBJECT, METADATA_OBJECT};
use crate::storage::dedup::SeenSet;
use crate::storage::local::LocalStore;
use crate::storage::merge::{merge_archive, merge_local};
use crate::storage::metadata::RunMetadata;
use crate::storage::table;
use crate::utils::error::StorageError;

/// What a reconciliation did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    pub snapshot_id: String,
    /// Postings in the snapshot
    pub collected: usize,
    /// Rows in the local rolling store afterwards
    pub local_rows: usize,
    /// Rows in the archive afterwards, when one is configured
    pub archive_rows: Option<usize>,
    /// Conditional writes rejected because of a concurrent modification
    pub conflicts: u32,
    /// Whether the archive was finally written without a version check
    pub forced: bool,
}

/// Writes snapshots into the local store and the archive
#[derive(Debug, Clone)]
pub struct SnapshotReconciler {
    local: LocalStore,
    archive: Option<ArchiveStore>,
    max_conflict_retries: u32,
    schedule_interval_hours: Option<u64>,
}

impl SnapshotReconciler {
    pub fn new(local: LocalStore, archive: Option<ArchiveStore>) -> Self {
        Self {
            local,
            archive,
            max_conflict_retries: 3,
            schedule_interval_hours: None,
        }
    }

    /// Build from storage configuration
    pub fn from_config(config: &StorageConfig) -> Result<Self, StorageError> {
        let archive = config
            .archive
            .as_ref()
            .map(ArchiveStore::from_config)
            .transpose()?;

        Ok(Self::new(LocalStore::new(&config.csv_path), archive)
            .with_conflict_retries(config.max_conflict_retries)
            .with_schedule_interval(config.schedule_interval_hours))
    }

    #[must_use]
    pub fn with_conflict_retries(mut self, retries: u32) -> Self {
        self.max_conflict_retries = retries;
        self
    }

    #[must_use]
    pub fn with_schedule_interval(mut self, hours: Option<u64>) -> Self {
        self.schedule_interval_hours = hours;
        self
    }

    pub fn local(&self) -> &LocalStore {
        &self.local
    }

    pub fn archive(&self) -> Option<&ArchiveStore> {
        self.archive.as_ref()
    }

    /// Rebuild the seen-set from the authoritative record
    ///
    /// The archive when one is configured, the local rolling store otherwise.
    pub async fn load_seen_set(&self) -> Result<SeenSet, StorageError> {
        let postings = match &self.archive {
            Some(archive) => archive.read().await?.postings,
            None => self.local.load().await?,
        };

        let seen = SeenSet::from_postings(&postings);
        tracing::info!(urls = seen.len(), "Loaded seen-set");
        Ok(seen)
    }

    /// Merge a snapshot into the local store and the archive
    ///
    /// # Errors
    ///
    /// Any storage failure is returned; a run whose snapshot cannot be
    /// reconciled has failed.
    pub async fn reconcile(&self, snapshot: &Snapshot) -> Result<ReconcileReport, StorageError> {
        let existing = self.local.load().await?;
        let merged_local = merge_local(existing, snapshot.postings.clone());
        self.local.save(&merged_local).await?;

        tracing::info!(
            snapshot_id = %snapshot.id,
            collected = snapshot.len(),
            rows = merged_local.len(),
            path = %self.local.path().display(),
            "Updated local store"
        );

        let mut report = ReconcileReport {
            snapshot_id: snapshot.id.clone(),
            collected: snapshot.len(),
            local_rows: merged_local.len(),
            archive_rows: None,
            conflicts: 0,
            forced: false,
        };

        if let Some(archive) = &self.archive {
            let archive_rows = self
                .reconcile_archive(archive, &snapshot.postings, &mut report)
                .await?;
            report.archive_rows = Some(archive_rows);

            archive.put_snapshot(&snapshot.id, &snapshot.postings).await?;
            archive
                .put_object(LATEST_OBJECT, table::to_csv_bytes(&merged_local)?)
                .await?;

            let metadata = RunMetadata::new(
                snapshot,
                merged_local.len(),
                archive_rows,
                self.schedule_interval_hours,
            );
            archive
                .put_object(METADATA_OBJECT, metadata.to_json_bytes()?)
                .await?;

            tracing::info!(
                snapshot_id = %snapshot.id,
                archive_rows,
                conflicts = report.conflicts,
                "Updated archive"
            );
        }

        Ok(report)
    }

    /// Read-merge-write the archive object, retrying on conflicts
    async fn reconcile_archive(
        &self,
        archive: &ArchiveStore,
        incoming: &[Posting],
        report: &mut ReconcileReport,
    ) -> Result<usize, StorageError> {
        for attempt in 0..=self.max_conflict_retries {
            let read = archive.read().await?;
            let merged = merge_archive(read.postings, incoming.to_vec());

            match archive.write(&merged, read.version.as_ref()).await? {
                WriteOutcome::Written => return Ok(merged.len()),
                WriteOutcome::Unconditional => {
                    report.forced = true;
                    return Ok(merged.len());
                }
                WriteOutcome::Conflict => {
                    report.conflicts += 1;
                    tracing::warn!(
                        attempt = attempt + 1,
                        max_retries = self.max_conflict_retries,
                        "Archive modified concurrently, re-reading"
                    );
                }
            }
        }

        let read = archive.read().await?;
        let merged = merge_archive(read.postings, incoming.to_vec());
        tracing::warn!(
            conflicts = report.conflicts,
            rows = merged.len(),
            "Conflict retries exhausted, writing archive unconditionally (last writer wins)"
        );
        archive.force_write(&merged).await?;
        report.forced = true;

        Ok(merged.len())
    }
}
