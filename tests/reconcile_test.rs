//! Snapshot reconciliation against an in-memory archive

mod common;

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use futures::stream::BoxStream;
use jobtrail::crawler::{CollectionRun, Collector};
use jobtrail::models::{Posting, Snapshot};
use jobtrail::runner::run_with;
use jobtrail::storage::archive::ARCHIVE_OBJECT;
use jobtrail::storage::{table, ArchiveStore, LocalStore, SeenSet, SnapshotReconciler};
use jobtrail::utils::error::CollectorError;
use object_store::memory::InMemory;
use object_store::path::Path;
use object_store::{
    GetOptions, GetResult, ListResult, MultipartUpload, ObjectMeta, ObjectStore, PutMode,
    PutMultipartOpts, PutOptions, PutPayload, PutResult,
};
use std::collections::HashSet;
use tempfile::TempDir;

/// In-memory store where another writer sneaks in before conditional updates
#[derive(Debug, Default)]
struct RacingStore {
    inner: InMemory,
    races_left: AtomicU32,
    rivals: AtomicU32,
}

impl RacingStore {
    fn racing(races: u32) -> Self {
        let store = Self::default();
        store.races_left.store(races, Ordering::SeqCst);
        store
    }

    async fn rival_write(&self, location: &Path) -> object_store::Result<()> {
        let current = self.inner.get(location).await?.bytes().await?;
        let mut postings = table::from_csv_bytes(&current).unwrap();
        let n = self.rivals.fetch_add(1, Ordering::SeqCst);
        postings.push(common::posting(
            &format!("https://rival.example/jobs/{n}"),
            "Rival",
            common::date(2024, 5, 1),
        ));
        self.inner
            .put(location, PutPayload::from(table::to_csv_bytes(&postings).unwrap()))
            .await?;
        Ok(())
    }
}

impl fmt::Display for RacingStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RacingStore({})", self.inner)
    }
}

#[async_trait]
impl ObjectStore for RacingStore {
    async fn put_opts(
        &self,
        location: &Path,
        payload: PutPayload,
        opts: PutOptions,
    ) -> object_store::Result<PutResult> {
        if matches!(opts.mode, PutMode::Update(_))
            && self
                .races_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
        {
            self.rival_write(location).await?;
        }
        self.inner.put_opts(location, payload, opts).await
    }

    async fn put_multipart_opts(
        &self,
        location: &Path,
        opts: PutMultipartOpts,
    ) -> object_store::Result<Box<dyn MultipartUpload>> {
        self.inner.put_multipart_opts(location, opts).await
    }

    async fn get_opts(&self, location: &Path, options: GetOptions) -> object_store::Result<GetResult> {
        self.inner.get_opts(location, options).await
    }

    async fn delete(&self, location: &Path) -> object_store::Result<()> {
        self.inner.delete(location).await
    }

    fn list(&self, prefix: Option<&Path>) -> BoxStream<'_, object_store::Result<ObjectMeta>> {
        self.inner.list(prefix)
    }

    async fn list_with_delimiter(&self, prefix: Option<&Path>) -> object_store::Result<ListResult> {
        self.inner.list_with_delimiter(prefix).await
    }

    async fn copy(&self, from: &Path, to: &Path) -> object_store::Result<()> {
        self.inner.copy(from, to).await
    }

    async fn copy_if_not_exists(&self, from: &Path, to: &Path) -> object_store::Result<()> {
        self.inner.copy_if_not_exists(from, to).await
    }
}

fn reconciler(dir: &TempDir, store: Arc<dyn ObjectStore>) -> SnapshotReconciler {
    SnapshotReconciler::new(
        LocalStore::new(dir.path().join("jobs.csv")),
        Some(ArchiveStore::new(store, "snapshots")),
    )
}

fn snapshot(day: u32, urls: &[&str]) -> Snapshot {
    let postings = urls
        .iter()
        .map(|url| common::posting(url, "Acme", common::date(2024, 5, day)))
        .collect();
    Snapshot::new(Utc.with_ymd_and_hms(2024, 5, day, 6, 0, 0).unwrap(), postings)
}

async fn archived(reconciler: &SnapshotReconciler) -> Vec<Posting> {
    reconciler.archive().unwrap().read().await.unwrap().postings
}

#[tokio::test]
async fn test_replay_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let reconciler = reconciler(&dir, Arc::new(InMemory::new()));
    let snap = snapshot(1, &["https://x/1", "https://x/2"]);

    reconciler.reconcile(&snap).await.unwrap();
    let archive_once = archived(&reconciler).await;
    let local_once = reconciler.local().load().await.unwrap();

    reconciler.reconcile(&snap).await.unwrap();
    assert_eq!(archived(&reconciler).await, archive_once);
    assert_eq!(reconciler.local().load().await.unwrap(), local_once);
}

#[tokio::test]
async fn test_archive_keeps_one_row_per_url() {
    let dir = TempDir::new().unwrap();
    let reconciler = reconciler(&dir, Arc::new(InMemory::new()));

    reconciler.reconcile(&snapshot(1, &["https://x/1", "https://x/2"])).await.unwrap();
    reconciler.reconcile(&snapshot(2, &["https://x/2", "https://x/3"])).await.unwrap();
    let report = reconciler.reconcile(&snapshot(3, &["https://x/1"])).await.unwrap();

    let rows = archived(&reconciler).await;
    let urls: Vec<&str> = rows.iter().map(|p| p.url.as_str()).collect();
    assert_eq!(urls, vec!["https://x/1", "https://x/2", "https://x/3"]);
    assert_eq!(report.archive_rows, Some(3));

    let unique: HashSet<&str> = urls.iter().copied().collect();
    assert_eq!(unique.len(), rows.len());

    // newest observation replaces the earlier one in place
    assert_eq!(rows[0].collected_at, common::date(2024, 5, 3));
    assert_eq!(rows[1].collected_at, common::date(2024, 5, 2));
}

#[tokio::test]
async fn test_incomplete_postings_survive_round_trip() {
    let dir = TempDir::new().unwrap();
    let reconciler = reconciler(&dir, Arc::new(InMemory::new()));
    let posting = common::posting("https://x/1", "", common::date(2024, 5, 1));
    let snap = Snapshot::new(Utc.with_ymd_and_hms(2024, 5, 1, 6, 0, 0).unwrap(), vec![posting]);

    reconciler.reconcile(&snap).await.unwrap();

    let rows = archived(&reconciler).await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].company, "");
    assert_eq!(rows[0].snapshot_id.as_deref(), Some("2024-05-01T06-00-00Z"));
}

#[tokio::test]
async fn test_concurrent_modification_is_merged() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(RacingStore::racing(0));
    let reconciler = reconciler(&dir, store.clone());

    reconciler.reconcile(&snapshot(1, &["https://x/1"])).await.unwrap();

    store.races_left.store(1, Ordering::SeqCst);
    let report = reconciler.reconcile(&snapshot(2, &["https://x/2"])).await.unwrap();

    assert_eq!(report.conflicts, 1);
    assert!(!report.forced);

    let urls: Vec<String> = archived(&reconciler).await.into_iter().map(|p| p.url).collect();
    assert_eq!(
        urls,
        vec!["https://x/1", "https://rival.example/jobs/0", "https://x/2"]
    );
}

#[tokio::test]
async fn test_exhausted_conflicts_fall_back_to_last_writer_wins() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(RacingStore::racing(0));
    let reconciler = reconciler(&dir, store.clone()).with_conflict_retries(2);

    reconciler.reconcile(&snapshot(1, &["https://x/1"])).await.unwrap();

    store.races_left.store(u32::MAX, Ordering::SeqCst);
    let report = reconciler.reconcile(&snapshot(2, &["https://x/2"])).await.unwrap();

    assert_eq!(report.conflicts, 3);
    assert!(report.forced);

    let rows = archived(&reconciler).await;
    assert!(rows.iter().any(|p| p.url == "https://x/1"));
    assert!(rows.iter().any(|p| p.url == "https://x/2"));
    assert_eq!(report.archive_rows, Some(rows.len()));
    assert!(reconciler
        .archive()
        .unwrap()
        .get_object(ARCHIVE_OBJECT)
        .await
        .unwrap()
        .is_some());
}

struct FixedCollector(Vec<&'static str>);

#[async_trait]
impl Collector for FixedCollector {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn collect(
        &self,
        as_of: NaiveDate,
        seen: &SeenSet,
    ) -> Result<Vec<Posting>, CollectorError> {
        Ok(self
            .0
            .iter()
            .filter(|url| !seen.contains(url))
            .map(|url| common::posting(url, "Acme", as_of))
            .collect())
    }
}

#[tokio::test]
async fn test_archived_urls_are_not_collected_again() {
    let dir = TempDir::new().unwrap();
    let reconciler = reconciler(&dir, Arc::new(InMemory::new()));

    let first = CollectionRun::new(vec![Box::new(FixedCollector(vec!["https://x/1", "https://x/2"]))]);
    let outcome = run_with(
        &first,
        &reconciler,
        common::date(2024, 5, 1),
        Utc.with_ymd_and_hms(2024, 5, 1, 6, 0, 0).unwrap(),
    )
    .await
    .unwrap();
    assert_eq!(outcome.report.collected, 2);

    let second = CollectionRun::new(vec![Box::new(FixedCollector(vec!["https://x/2", "https://x/3"]))]);
    let outcome = run_with(
        &second,
        &reconciler,
        common::date(2024, 5, 2),
        Utc.with_ymd_and_hms(2024, 5, 2, 6, 0, 0).unwrap(),
    )
    .await
    .unwrap();

    assert_eq!(outcome.report.collected, 1);
    assert_eq!(outcome.summary.postings[0].url, "https://x/3");
    assert_eq!(outcome.report.archive_rows, Some(3));

    let rows = archived(&reconciler).await;
    let x2 = rows.iter().find(|p| p.url == "https://x/2").unwrap();
    assert_eq!(x2.collected_at, common::date(2024, 5, 1));
}
