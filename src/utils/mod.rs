//! Common utilities and helper functions
//!
//! This module provides shared utilities used across the application.

pub mod error;
pub mod retry;

use anyhow::{Context, Result};
use regex::Regex;
use std::sync::OnceLock;
use url::Url;

/// Normalize whitespace in text
pub fn normalize_whitespace(text: &str) -> String {
    static WHITESPACE_RE: OnceLock<Regex> = OnceLock::new();

    let re = WHITESPACE_RE.get_or_init(|| Regex::new(r"\s+").expect("Invalid regex pattern"));

    re.replace_all(text.trim(), " ").to_string()
}

/// Extract domain from URL
pub fn extract_domain(url: &str) -> Result<String> {
    let parsed = Url::parse(url).context("Invalid URL")?;

    parsed
        .host_str()
        .map(|s| s.to_string())
        .context("No host in URL")
}

/// Check whether a URL's host is `domain` or one of its subdomains
pub fn host_matches(url: &str, domain: &str) -> bool {
    let domain = domain.trim_start_matches('.').to_lowercase();
    match extract_domain(url) {
        Ok(host) => {
            let host = host.to_lowercase();
            host == domain || host.ends_with(&format!(".{domain}"))
        }
        Err(_) => false,
    }
}
