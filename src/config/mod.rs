//! Configuration management for the jobtrail collectors
//!
//! This module handles loading and validating configuration from a TOML
//! sources file and environment variables. The resulting [`Config`] is passed
//! by value into the runner and each collector at construction time.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::utils::retry::RetryConfig;

/// Default location allowlist for board results
pub const DEFAULT_LOCATION_TOKENS: &[&str] = &[
    "israel",
    "tel aviv",
    "tel-aviv",
    "jerusalem",
    "haifa",
    "herzliya",
    "ra'anana",
    "beer sheva",
    "be'er sheva",
];

/// Tracking and analytics destinations blocked in the browser
pub const DEFAULT_BLOCKED_URL_PATTERNS: &[&str] = &[
    "*google-analytics.com*",
    "*googletagmanager.com*",
    "*doubleclick.net*",
    "*px.ads.linkedin.com*",
    "*li.protechts.net*",
    "*snap.licdn.com/li.lms-analytics*",
    "*bat.bing.com*",
    "*connect.facebook.net*",
    "*hotjar.com*",
];

/// Overlays that intercept clicks and scrolling on the search page
pub const DEFAULT_OVERLAY_SELECTORS: &[&str] = &[
    ".artdeco-modal-overlay",
    ".artdeco-global-alert",
    "#artdeco-global-alert-container",
    ".contextual-sign-in-modal",
    ".msg-overlay-container",
    ".msg-overlay-list-bubble",
    "#onetrust-banner-sdk",
    "div[data-test-modal-container]",
];

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Per-source enablement and parameters
    pub sources: SourcesConfig,

    /// Local store and archive locations
    pub storage: StorageConfig,

    /// HTTP client settings
    pub http: HttpConfig,

    /// Retry policy for API calls
    pub retry: RetryConfig,

    /// Run orchestration settings
    pub run: RunConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// All configurable sources
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub greenhouse: BoardSourceConfig,
    pub lever: BoardSourceConfig,
    pub serpapi: SearchSourceConfig,
    pub searchapi: SearchSourceConfig,
    pub linkedin_browser: BrowserSourceConfig,
}

/// Board-hosted JSON API source (Greenhouse, Lever)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardSourceConfig {
    pub enabled: bool,

    /// Board or company slugs to query
    pub boards: Vec<String>,

    /// Case-insensitive substrings a title must contain
    pub title_keywords: Vec<String>,

    /// Case-insensitive substrings accepted in a non-empty location
    pub location_tokens: Vec<String>,

    /// Location recorded when the board omits one
    pub default_location: String,

    /// Override for the API base URL (mock servers, proxies)
    pub api_base: Option<String>,
}

impl Default for BoardSourceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            boards: Vec::new(),
            title_keywords: vec![String::from("data scientist")],
            location_tokens: DEFAULT_LOCATION_TOKENS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            default_location: String::from("Israel"),
            api_base: None,
        }
    }
}

/// Third-party search aggregator source (SerpAPI, SearchApi.io)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSourceConfig {
    pub enabled: bool,
    pub query: String,
    pub location: String,

    /// API key; usually supplied through the environment
    pub api_key: Option<String>,

    /// Substring expected in the result's `via` field
    pub attribution: String,

    /// Domain an apply link must point at to be accepted
    pub target_domain: String,

    /// Override for the search endpoint
    pub endpoint: Option<String>,
}

impl Default for SearchSourceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            query: String::from("Data Scientist"),
            location: String::from("Israel"),
            api_key: None,
            attribution: String::from("linkedin"),
            target_domain: String::from("linkedin.com"),
            endpoint: None,
        }
    }
}

/// Browser-automation source
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSourceConfig {
    pub enabled: bool,
    pub query: String,
    pub location: String,

    /// Origin of the job-search web property
    pub site: String,

    pub headless: bool,

    /// Target number of new listings per run
    pub max_jobs: usize,

    /// Maximum scroll/paginate iterations
    pub max_iterations: u32,

    /// Wall-clock budget for discovery and extraction
    pub time_budget_secs: u64,

    /// Timeout for a single navigation
    pub navigation_timeout_secs: u64,

    /// Pause after each scroll so new cards can render
    pub scroll_pause_ms: u64,

    /// Saved session (cookies) reused for the authenticated search;
    /// relative paths resolve under `storage.data_dir`
    pub storage_state_path: PathBuf,

    /// Login-independent listing rendering; `{id}` is replaced by the listing id
    pub guest_endpoint: String,

    pub blocked_url_patterns: Vec<String>,
    pub overlay_selectors: Vec<String>,

    /// Retry policy around launches and navigations
    pub retry: RetryConfig,
}

impl Default for BrowserSourceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            query: String::from("Data Scientist"),
            location: String::from("Israel"),
            site: String::from("https://www.linkedin.com"),
            headless: true,
            max_jobs: 60,
            max_iterations: 30,
            time_budget_secs: 600,
            navigation_timeout_secs: 90,
            scroll_pause_ms: 1200,
            storage_state_path: PathBuf::from("linkedin_state.json"),
            guest_endpoint: String::from(
                "https://www.linkedin.com/jobs-guest/jobs/api/jobPosting/{id}",
            ),
            blocked_url_patterns: DEFAULT_BLOCKED_URL_PATTERNS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            overlay_selectors: DEFAULT_OVERLAY_SELECTORS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            retry: RetryConfig::browser(),
        }
    }
}

impl BrowserSourceConfig {
    #[must_use]
    pub fn time_budget(&self) -> Duration {
        Duration::from_secs(self.time_budget_secs)
    }

    #[must_use]
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }

    #[must_use]
    pub fn scroll_pause(&self) -> Duration {
        Duration::from_millis(self.scroll_pause_ms)
    }
}

/// Local rolling store and remote archive
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Base directory for relative local paths
    pub data_dir: PathBuf,

    /// Local rolling store (CSV); relative paths resolve under `data_dir`
    pub csv_path: PathBuf,

    /// Remote archive; disabled when absent
    pub archive: Option<ArchiveConfig>,

    /// Interval used to publish the next scheduled run time
    pub schedule_interval_hours: Option<u64>,

    /// Read-merge-write attempts after a concurrent archive modification
    pub max_conflict_retries: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            csv_path: PathBuf::from("jobs.csv"),
            archive: None,
            schedule_interval_hours: None,
            max_conflict_retries: 3,
        }
    }
}

/// Remote archive location
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    /// S3 bucket; credentials come from the standard AWS environment
    pub bucket: Option<String>,

    /// Local directory standing in for a bucket
    pub local_dir: Option<PathBuf>,

    /// Key prefix for every object
    pub prefix: String,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            bucket: None,
            local_dir: None,
            prefix: String::from("snapshots"),
        }
    }
}

/// HTTP client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Request timeout in seconds
    pub request_timeout_secs: u64,

    /// Rate limit (requests per second)
    pub requests_per_second: u32,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 45,
            requests_per_second: 2,
        }
    }
}

/// Run orchestration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Run collectors concurrently and merge their outputs afterwards
    pub parallel_collectors: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

impl Config {
    /// Load configuration from `path` (defaults when the file is missing)
    /// and apply environment overrides
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            Self::from_file(path)?
        } else {
            Self::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        config.resolve_paths();
        config.validate().context("Invalid configuration")?;
        Ok(config)
    }

    /// Anchor relative local paths at `storage.data_dir`
    pub fn resolve_paths(&mut self) {
        let data_dir = &self.storage.data_dir;
        self.storage.csv_path = data_dir.join(&self.storage.csv_path);

        let browser = &mut self.sources.linkedin_browser;
        browser.storage_state_path = data_dir.join(&browser.storage_state_path);
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    /// Apply overrides from a key lookup (the process environment in production)
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("SERPAPI_API_KEY") {
            self.sources.serpapi.api_key = Some(key);
        }
        if let Some(key) = lookup("SEARCHAPI_API_KEY") {
            self.sources.searchapi.api_key = Some(key);
        }

        if let Some(dir) = lookup("JOBTRAIL_DATA_DIR") {
            self.storage.data_dir = PathBuf::from(dir);
        }

        if let Some(bucket) = lookup("OUTPUT_BUCKET") {
            let archive = self.storage.archive.get_or_insert_with(ArchiveConfig::default);
            archive.bucket = Some(bucket);
        }
        if let Some(prefix) = lookup("OUTPUT_PREFIX") {
            if let Some(archive) = self.storage.archive.as_mut() {
                archive.prefix = prefix.trim_matches('/').to_string();
            }
        }

        let browser = &mut self.sources.linkedin_browser;
        if let Some(path) = lookup("LINKEDIN_STORAGE_STATE") {
            browser.storage_state_path = PathBuf::from(path);
        }
        if let Some(headless) = lookup("LINKEDIN_HEADLESS") {
            browser.headless = headless.eq_ignore_ascii_case("true");
        }
        if let Some(max_jobs) = lookup("LINKEDIN_MAX_JOBS").and_then(|v| v.parse().ok()) {
            browser.max_jobs = max_jobs;
        }

        if let Some(level) = lookup("JOBTRAIL_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("JOBTRAIL_LOG_FORMAT") {
            self.logging.format = format;
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.http.requests_per_second == 0 {
            anyhow::bail!("requests_per_second must be greater than 0");
        }

        if self.retry.max_attempts == 0 {
            anyhow::bail!("retry.max_attempts must be greater than 0");
        }

        let browser = &self.sources.linkedin_browser;
        if browser.enabled {
            if browser.max_jobs == 0 || browser.max_iterations == 0 {
                anyhow::bail!("linkedin_browser.max_jobs and max_iterations must be positive");
            }
            if browser.time_budget_secs == 0 {
                anyhow::bail!("linkedin_browser.time_budget_secs must be positive");
            }
            if !browser.guest_endpoint.contains("{id}") {
                anyhow::bail!("linkedin_browser.guest_endpoint must contain an {{id}} placeholder");
            }
        }

        if !matches!(self.logging.format.as_str(), "text" | "json") {
            anyhow::bail!("logging.format must be text or json");
        }

        if let Some(archive) = &self.storage.archive {
            if archive.bucket.is_none() && archive.local_dir.is_none() {
                anyhow::bail!("storage.archive needs either a bucket or a local_dir");
            }
        }

        Ok(())
    }

    /// Get request timeout as Duration
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.http.request_timeout_secs)
    }
}
