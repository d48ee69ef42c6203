//! Remote archive on an object store
//!
//! The archive lives under a key prefix:
//!
//! - `archive.csv`: every posting ever collected, one row per URL
//! - `jobs_{snapshot_id}.csv`: the postings of one run
//! - `latest.csv`: a copy of the merged rolling store
//! - `metadata.json`: summary of the last run
//!
//! `archive.csv` is only replaced with a conditional write against the
//! version that was read, so two runs racing on it cannot silently lose rows.

use std::path::Path as FsPath;
use std::sync::Arc;

use bytes::Bytes;
use object_store::aws::{AmazonS3Builder, S3ConditionalPut};
use object_store::local::LocalFileSystem;
use object_store::path::Path;
use object_store::{ObjectStore, PutMode, PutOptions, PutPayload, UpdateVersion};

use crate::config::ArchiveConfig;
use crate::models::Posting;
use crate::storage::table;
use crate::utils::error::StorageError;

pub const ARCHIVE_OBJECT: &str = "archive.csv";
pub const LATEST_OBJECT: &str = "latest.csv";
pub const METADATA_OBJECT: &str = "metadata.json";

/// Archive contents together with the version they were read at
#[derive(Debug, Clone, Default)]
pub struct ArchiveRead {
    pub postings: Vec<Posting>,
    /// `None` when the archive object does not exist yet
    pub version: Option<UpdateVersion>,
}

/// Result of an attempt to replace the archive object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Conditional write accepted
    Written,
    /// Someone else modified the archive since it was read
    Conflict,
    /// The store cannot write conditionally; written unconditionally
    Unconditional,
}

/// Object-store backed archive
#[derive(Debug, Clone)]
pub struct ArchiveStore {
    store: Arc<dyn ObjectStore>,
    prefix: String,
}

impl ArchiveStore {
    pub fn new(store: Arc<dyn ObjectStore>, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into().trim_matches('/').to_string(),
        }
    }

    /// Build the archive from configuration
    ///
    /// A bucket selects Amazon S3 (credentials and region from the standard
    /// AWS environment); otherwise a local directory stands in for it.
    pub fn from_config(config: &ArchiveConfig) -> Result<Self, StorageError> {
        let store: Arc<dyn ObjectStore> = match (&config.bucket, &config.local_dir) {
            (Some(bucket), _) => Arc::new(
                AmazonS3Builder::from_env()
                    .with_bucket_name(bucket)
                    .with_conditional_put(S3ConditionalPut::ETagMatch)
                    .build()?,
            ),
            (None, Some(dir)) => Arc::new(local_store(dir)?),
            (None, None) => {
                return Err(StorageError::InvalidRecord(
                    "archive needs a bucket or a local directory".to_string(),
                ))
            }
        };

        Ok(Self::new(store, config.prefix.clone()))
    }

    fn key(&self, name: &str) -> Path {
        if self.prefix.is_empty() {
            Path::from(name)
        } else {
            Path::from(format!("{}/{name}", self.prefix))
        }
    }

    /// Read the archive and remember its version
    pub async fn read(&self) -> Result<ArchiveRead, StorageError> {
        let key = self.key(ARCHIVE_OBJECT);
        let result = match self.store.get(&key).await {
            Ok(result) => result,
            Err(object_store::Error::NotFound { .. }) => {
                tracing::debug!(key = %key, "Archive not found, starting empty");
                return Ok(ArchiveRead::default());
            }
            Err(e) => return Err(e.into()),
        };

        let version = UpdateVersion {
            e_tag: result.meta.e_tag.clone(),
            version: result.meta.version.clone(),
        };
        let bytes = result.bytes().await?;

        Ok(ArchiveRead {
            postings: table::from_csv_bytes(&bytes)?,
            version: Some(version),
        })
    }

    /// Replace the archive if it is still at `expected`
    ///
    /// `expected = None` means the archive must not exist yet.
    pub async fn write(
        &self,
        postings: &[Posting],
        expected: Option<&UpdateVersion>,
    ) -> Result<WriteOutcome, StorageError> {
        let key = self.key(ARCHIVE_OBJECT);
        let payload = PutPayload::from(table::to_csv_bytes(postings)?);

        let mode = match expected {
            None => PutMode::Create,
            Some(version) if version.e_tag.is_none() && version.version.is_none() => {
                tracing::warn!(key = %key, "Archive has no version tag, writing unconditionally");
                self.store.put(&key, payload).await?;
                return Ok(WriteOutcome::Unconditional);
            }
            Some(version) => PutMode::Update(version.clone()),
        };

        match self
            .store
            .put_opts(&key, payload.clone(), PutOptions::from(mode))
            .await
        {
            Ok(_) => Ok(WriteOutcome::Written),
            Err(object_store::Error::Precondition { .. })
            | Err(object_store::Error::AlreadyExists { .. }) => Ok(WriteOutcome::Conflict),
            Err(object_store::Error::NotImplemented) => {
                tracing::warn!(
                    key = %key,
                    "Store does not support conditional writes, writing unconditionally"
                );
                self.store.put(&key, payload).await?;
                Ok(WriteOutcome::Unconditional)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Replace the archive regardless of its current version
    pub async fn force_write(&self, postings: &[Posting]) -> Result<(), StorageError> {
        let bytes = table::to_csv_bytes(postings)?;
        self.put_object(ARCHIVE_OBJECT, bytes).await
    }

    /// Store the postings of one run as `jobs_{snapshot_id}.csv`
    pub async fn put_snapshot(
        &self,
        snapshot_id: &str,
        postings: &[Posting],
    ) -> Result<(), StorageError> {
        let bytes = table::to_csv_bytes(postings)?;
        self.put_object(&format!("jobs_{snapshot_id}.csv"), bytes)
            .await
    }

    /// Unconditionally write an auxiliary object under the prefix
    pub async fn put_object(&self, name: &str, bytes: Vec<u8>) -> Result<(), StorageError> {
        let key = self.key(name);
        self.store
            .put(&key, PutPayload::from(Bytes::from(bytes)))
            .await?;
        tracing::debug!(key = %key, "Uploaded object");
        Ok(())
    }

    /// Read an auxiliary object under the prefix
    pub async fn get_object(&self, name: &str) -> Result<Option<Bytes>, StorageError> {
        match self.store.get(&self.key(name)).await {
            Ok(result) => Ok(Some(result.bytes().await?)),
            Err(object_store::Error::NotFound { .. }) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

fn local_store(dir: &FsPath) -> Result<LocalFileSystem, StorageError> {
    std::fs::create_dir_all(dir)?;
    let absolute = dir.canonicalize()?;
    Ok(LocalFileSystem::new_with_prefix(absolute)?)
}
