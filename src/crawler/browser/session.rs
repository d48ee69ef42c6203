//! Browser session abstraction
//!
//! The collector drives one page through [`BrowserSession`]; the Chrome
//! implementation lives in [`super::chrome`], tests plug in scripted fakes.
//! Sessions are opened already authenticated from a saved storage state.

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::utils::error::BrowserError;

/// One browser page
#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// Navigate and wait for the load to finish
    async fn goto(&self, url: &str) -> Result<(), BrowserError>;

    /// Current rendered HTML
    async fn content(&self) -> Result<String, BrowserError>;

    /// Remove overlay elements matching `selectors`; returns how many were removed
    async fn clear_overlays(&self, selectors: &[String]) -> Result<usize, BrowserError>;

    /// Scroll the results list to its end so the next batch renders
    async fn scroll_results(&self) -> Result<(), BrowserError>;

    /// Release the page and the browser process
    async fn close(&self) -> Result<(), BrowserError>;
}

/// Opens browser sessions
#[async_trait]
pub trait SessionLauncher: Send + Sync {
    async fn open(&self) -> Result<Box<dyn BrowserSession>, BrowserError>;
}

/// A cookie as saved in a storage-state file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredCookie {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default = "default_path")]
    pub path: String,
    /// Seconds since the epoch; negative for session cookies
    #[serde(default = "session_expiry")]
    pub expires: f64,
    #[serde(default)]
    pub http_only: bool,
    #[serde(default)]
    pub secure: bool,
}

fn default_path() -> String {
    String::from("/")
}

fn session_expiry() -> f64 {
    -1.0
}

/// Saved authenticated session
///
/// Same layout as browser-automation storage-state files, so a state
/// recorded by other tooling can be reused. Origin storage is ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageState {
    #[serde(default)]
    pub cookies: Vec<StoredCookie>,
}

impl StorageState {
    /// Load a storage-state file
    pub async fn load(path: &Path) -> Result<Self, BrowserError> {
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            BrowserError::Session(format!("cannot read {}: {e}", path.display()))
        })?;
        serde_json::from_str(&raw)
            .map_err(|e| BrowserError::Session(format!("invalid {}: {e}", path.display())))
    }

    /// Write a storage-state file, creating parent directories
    pub async fn save(&self, path: &Path) -> Result<(), BrowserError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| BrowserError::Session(e.to_string()))?;
            }
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| BrowserError::Session(e.to_string()))?;
        tokio::fs::write(path, json)
            .await
            .map_err(|e| BrowserError::Session(format!("cannot write {}: {e}", path.display())))
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }
}
