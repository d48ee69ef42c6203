//! Run summary published next to the archive (`metadata.json`)

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Snapshot;
use crate::utils::error::StorageError;

/// Summary of the last completed run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunMetadata {
    pub snapshot_id: String,
    pub last_run_at: DateTime<Utc>,
    /// Next scheduled run, when a schedule interval is configured
    pub next_run_at: Option<DateTime<Utc>>,
    /// Rows in the merged rolling store
    pub rows: usize,
    /// Rows in the archive after the merge
    pub archive_rows: usize,
}

impl RunMetadata {
    pub fn new(
        snapshot: &Snapshot,
        rows: usize,
        archive_rows: usize,
        schedule_interval_hours: Option<u64>,
    ) -> Self {
        let next_run_at = schedule_interval_hours
            .and_then(|hours| i64::try_from(hours).ok())
            .and_then(Duration::try_hours)
            .and_then(|interval| snapshot.taken_at.checked_add_signed(interval));

        Self {
            snapshot_id: snapshot.id.clone(),
            last_run_at: snapshot.taken_at,
            next_run_at,
            rows,
            archive_rows,
        }
    }

    pub fn to_json_bytes(&self) -> Result<Vec<u8>, StorageError> {
        Ok(serde_json::to_vec_pretty(self)?)
    }
}
