//! Persistence: dedup, the tabular codec, the local rolling store and the
//! remote archive, and the reconciler tying them together.

pub mod archive;
pub mod dedup;
pub mod local;
pub mod merge;
pub mod metadata;
pub mod reconcile;
pub mod table;

pub use archive::{ArchiveRead, ArchiveStore, WriteOutcome};
pub use dedup::SeenSet;
pub use local::LocalStore;
pub use merge::{merge_archive, merge_local};
pub use metadata::RunMetadata;
pub use reconcile::{ReconcileReport, SnapshotReconciler};
