//! Unified error handling for the jobtrail crate
//!
//! The run entry points return [`Error`], which wraps the domain-specific
//! errors from [`crate::utils::error`]. Collectors keep their own
//! [`CollectorError`] because a failing source never fails the run.

use thiserror::Error;

// Re-export domain-specific errors for convenience
pub use crate::utils::error::{BrowserError, CollectorError, FetchError, StorageError};

/// Unified error type for the jobtrail crate
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP client construction errors
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Browser automation errors
    #[error("Browser error: {0}")]
    Browser(#[from] BrowserError),

    /// Local store and archive errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;
