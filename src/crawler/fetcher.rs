//! HTTP fetcher with rate limiting and retry
//!
//! This module provides the HTTP fetcher shared by the API collectors and the
//! guest-endpoint extraction strategy, with features including:
//! - User-Agent rotation
//! - Rate limiting with governor
//! - Automatic retry with bounded exponential backoff
//! - JSON and text bodies

use crate::utils::error::FetchError;
use crate::utils::retry::{with_retry_if, RetryConfig};
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use rand::seq::SliceRandom;
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT},
    Client,
};
use serde::de::DeserializeOwned;
use std::num::NonZeroU32;
use std::time::Duration;

/// Pool of realistic User-Agent strings for rotation
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
];

/// Rate limited HTTP fetcher
///
/// Cheap to share behind an `Arc`; every collector of a run uses the same
/// instance so the rate limit applies across sources.
pub struct HttpFetcher {
    /// HTTP client with configured timeout and compression
    client: Client,

    /// Rate limiter to control request frequency
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,

    /// Retry policy applied to every request
    retry: RetryConfig,
}

impl HttpFetcher {
    /// Create a new fetcher with default settings
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Http` if the HTTP client cannot be created
    pub fn new(requests_per_second: u32) -> Result<Self, FetchError> {
        Self::with_config(
            requests_per_second,
            RetryConfig::default(),
            Duration::from_secs(45),
        )
    }

    /// Create a new fetcher with custom configuration
    ///
    /// # Arguments
    ///
    /// * `requests_per_second` - Maximum number of requests per second
    /// * `retry` - Retry policy for transient failures
    /// * `timeout` - Request timeout duration
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Http` if the HTTP client cannot be created
    pub fn with_config(
        requests_per_second: u32,
        retry: RetryConfig,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .gzip(true)
            .cookie_store(true)
            .build()?;

        let rate = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        let rate_limiter = RateLimiter::direct(Quota::per_second(rate));

        Ok(Self {
            client,
            rate_limiter,
            retry,
        })
    }

    /// Retry policy used by this fetcher
    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }

    /// GET a JSON document
    ///
    /// # Errors
    ///
    /// Returns the last `FetchError` once retries are exhausted, or the first
    /// non-retryable one
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T, FetchError> {
        let body = self.get_text_with_query(url, query).await?;
        serde_json::from_str(&body).map_err(|e| FetchError::Decode(e.to_string()))
    }

    /// GET a text (HTML) document
    pub async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        self.get_text_with_query(url, &[]).await
    }

    async fn get_text_with_query(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<String, FetchError> {
        with_retry_if(
            &self.retry,
            || self.fetch_once(url, query),
            FetchError::is_recoverable,
        )
        .await
    }

    /// Single attempt: rate limit, send, classify status, read body
    async fn fetch_once(&self, url: &str, query: &[(&str, &str)]) -> Result<String, FetchError> {
        self.rate_limiter.until_ready().await;

        tracing::debug!(url = %url, "Fetching URL");

        let response = self
            .client
            .get(url)
            .query(query)
            .headers(self.build_headers())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FetchError::Timeout
                } else {
                    FetchError::Http(e)
                }
            })?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(FetchError::RateLimit);
        }
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        response.text().await.map_err(FetchError::Http)
    }

    /// Determine if a status code should trigger a retry
    pub fn should_retry(status: u16) -> bool {
        FetchError::Status(status).is_recoverable()
    }

    /// Build HTTP headers for API and guest-page requests
    fn build_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();

        headers.insert(USER_AGENT, HeaderValue::from_static(self.random_user_agent()));
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/json,text/html;q=0.9,*/*;q=0.8"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

        headers
    }

    /// Get a random user agent from the pool
    fn random_user_agent(&self) -> &'static str {
        let mut rng = rand::thread_rng();
        USER_AGENTS.choose(&mut rng).unwrap_or(&USER_AGENTS[0])
    }
}
