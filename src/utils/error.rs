//! Error types for the jobtrail collectors
//!
//! This module defines custom error types used throughout the application.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during HTTP fetching operations
#[derive(Error, Debug)]
pub enum FetchError {
    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimit,

    /// Non-success status code
    #[error("Unexpected status: {0}")]
    Status(u16),

    /// Request timeout
    #[error("Request timeout")]
    Timeout,

    /// Response body could not be decoded
    #[error("Decoding error: {0}")]
    Decode(String),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl FetchError {
    /// Transient failures worth another attempt
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::RateLimit | Self::Timeout => true,
            Self::Status(status) => matches!(status, 429 | 500 | 502 | 503 | 504),
            Self::Decode(_) | Self::InvalidUrl(_) => false,
        }
    }
}

/// Errors raised while driving the headless browser
#[derive(Error, Debug)]
pub enum BrowserError {
    /// Browser process could not be started
    #[error("Failed to launch browser: {0}")]
    Launch(String),

    /// Navigation failed
    #[error("Navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    /// Navigation or wait exceeded its timeout
    #[error("Timed out waiting for {0}")]
    Timeout(String),

    /// DevTools protocol error
    #[error("Browser protocol error: {0}")]
    Protocol(String),

    /// Session state could not be loaded or saved
    #[error("Session state error: {0}")]
    Session(String),
}

impl BrowserError {
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Navigation { .. } | Self::Timeout(_) | Self::Protocol(_)
        )
    }
}

/// Errors surfaced by a source collector
#[derive(Error, Debug)]
pub enum CollectorError {
    /// Fetch error
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Browser error
    #[error("Browser error: {0}")]
    Browser(#[from] BrowserError),

    /// Required API key or credential is not configured
    #[error("Missing credentials: {0} is not set")]
    MissingCredentials(&'static str),

    /// No saved browser session to reuse
    #[error("No saved session at {}; run `jobtrail save-session` first", .0.display())]
    MissingSession(PathBuf),
}

impl CollectorError {
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Fetch(e) => e.is_recoverable(),
            Self::Browser(e) => e.is_recoverable(),
            Self::MissingCredentials(_) | Self::MissingSession(_) => false,
        }
    }
}

/// Errors raised by the local store and the archive
#[derive(Error, Debug)]
pub enum StorageError {
    /// CSV encoding or decoding failed
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Blob store request failed
    #[error("Object store error: {0}")]
    ObjectStore(#[from] object_store::Error),

    /// Local file I/O failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Metadata serialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A row violates the persisted-record invariants
    #[error("Invalid record: {0}")]
    InvalidRecord(String),
}
