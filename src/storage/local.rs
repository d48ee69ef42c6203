//! Local rolling store
//!
//! One CSV file holding one row per URL across every run on this machine.

use std::path::{Path, PathBuf};

use crate::models::Posting;
use crate::storage::table;
use crate::utils::error::StorageError;

/// CSV-backed rolling store
#[derive(Debug, Clone)]
pub struct LocalStore {
    path: PathBuf,
}

impl LocalStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load every stored posting; a missing file is an empty store
    pub async fn load(&self) -> Result<Vec<Posting>, StorageError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => table::from_csv_bytes(&bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "Local store not found, starting empty");
                Ok(Vec::new())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Replace the store contents
    ///
    /// Writes a sibling temp file and renames it over the store, so readers
    /// never observe a partially written table.
    pub async fn save(&self, postings: &[Posting]) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let bytes = table::to_csv_bytes(postings)?;
        let tmp = self.temp_path();
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        tracing::debug!(path = %self.path.display(), rows = postings.len(), "Saved local store");
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
