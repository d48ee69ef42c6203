//! Third-party search aggregators (SerpAPI, SearchApi.io)
//!
//! Both proxy the same jobs search engine and return `jobs_results` entries
//! with a title, company, location, the site the result came `via` and a
//! list of apply links. Only results attributed to the target job site are
//! kept, keyed by their most specific link onto that site.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;

use crate::config::SearchSourceConfig;
use crate::crawler::fetcher::HttpFetcher;
use crate::crawler::url::{canonicalize_url, extract_listing_id, listing_url};
use crate::crawler::Collector;
use crate::models::{Posting, Source};
use crate::storage::dedup::SeenSet;
use crate::utils::error::CollectorError;
use crate::utils::host_matches;

/// Search API provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchProvider {
    SerpApi,
    SearchApi,
}

impl SearchProvider {
    pub fn source(&self) -> Source {
        match self {
            Self::SerpApi => Source::SerpApi,
            Self::SearchApi => Source::SearchApi,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::SerpApi => "SerpAPI",
            Self::SearchApi => "SearchApi",
        }
    }

    fn default_endpoint(&self) -> &'static str {
        match self {
            Self::SerpApi => "https://serpapi.com/search.json",
            Self::SearchApi => "https://www.searchapi.io/api/v1/search",
        }
    }

    /// Environment variable the key is read from
    pub fn key_variable(&self) -> &'static str {
        match self {
            Self::SerpApi => "SERPAPI_API_KEY",
            Self::SearchApi => "SEARCHAPI_API_KEY",
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    jobs_results: Vec<JobResult>,
}

#[derive(Debug, Default, Deserialize)]
struct JobResult {
    title: Option<String>,
    company_name: Option<String>,
    location: Option<String>,
    via: Option<String>,
    #[serde(default)]
    apply_options: Vec<LinkOption>,
    #[serde(default)]
    related_links: Vec<LinkOption>,
}

#[derive(Debug, Default, Deserialize)]
struct LinkOption {
    link: Option<String>,
}

impl LinkOption {
    fn link(&self) -> Option<&str> {
        self.link.as_deref().map(str::trim).filter(|l| !l.is_empty())
    }
}

/// Collector for a search aggregator
pub struct SearchApiCollector {
    provider: SearchProvider,
    config: SearchSourceConfig,
    fetcher: Arc<HttpFetcher>,
}

impl SearchApiCollector {
    pub fn new(
        provider: SearchProvider,
        config: SearchSourceConfig,
        fetcher: Arc<HttpFetcher>,
    ) -> Self {
        Self {
            provider,
            config,
            fetcher,
        }
    }

    fn is_attributed(&self, result: &JobResult) -> bool {
        let attribution = self.config.attribution.to_lowercase();
        let via_matches = result
            .via
            .as_deref()
            .is_some_and(|via| via.to_lowercase().contains(&attribution));

        via_matches
            || result
                .apply_options
                .iter()
                .filter_map(LinkOption::link)
                .any(|link| host_matches(link, &self.config.target_domain))
    }

    /// Score an apply link: listing on the target site > other target-site
    /// page > anything else
    fn link_score(&self, link: &str) -> u8 {
        if !host_matches(link, &self.config.target_domain) {
            0
        } else if extract_listing_id(link).is_some() {
            2
        } else {
            1
        }
    }

    /// Canonical form of an apply link
    ///
    /// Listing links on the target site collapse to the same URL the browser
    /// collector produces, so both sources dedup against each other.
    fn canonical_link(&self, link: &str, score: u8) -> Option<String> {
        match extract_listing_id(link) {
            Some(id) if score == 2 => Some(listing_url(
                &format!("https://www.{}", self.config.target_domain),
                id,
            )),
            _ => canonicalize_url(link),
        }
    }

    /// Most specific canonical URL for a result
    fn best_url(&self, result: &JobResult) -> Option<String> {
        let mut best: Option<(u8, String)> = None;
        for link in result.apply_options.iter().filter_map(LinkOption::link) {
            let score = self.link_score(link);
            let Some(url) = self.canonical_link(link, score) else {
                continue;
            };
            if best.as_ref().map_or(true, |(current, _)| score > *current) {
                best = Some((score, url));
            }
        }

        best.map(|(_, url)| url).or_else(|| {
            result
                .related_links
                .first()
                .and_then(LinkOption::link)
                .and_then(canonicalize_url)
        })
    }

    fn to_posting(&self, result: JobResult, as_of: NaiveDate) -> Option<Posting> {
        if !self.is_attributed(&result) {
            return None;
        }

        let title = result.title.as_deref().map(str::trim).unwrap_or_default();
        if title.is_empty() {
            return None;
        }
        let url = self.best_url(&result)?;

        let company = result
            .company_name
            .as_deref()
            .map(str::trim)
            .unwrap_or_default();
        let location = result
            .location
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .unwrap_or(self.config.location.as_str());

        Some(Posting::new(
            self.provider.source(),
            title,
            company,
            location,
            url,
            as_of,
        ))
    }
}

#[async_trait]
impl Collector for SearchApiCollector {
    fn name(&self) -> &str {
        self.provider.label()
    }

    async fn collect(
        &self,
        as_of: NaiveDate,
        seen: &SeenSet,
    ) -> Result<Vec<Posting>, CollectorError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(CollectorError::MissingCredentials(self.provider.key_variable()))?;

        let endpoint = self
            .config
            .endpoint
            .as_deref()
            .unwrap_or(self.provider.default_endpoint());
        let query = [
            ("engine", "google_jobs"),
            ("q", self.config.query.as_str()),
            ("location", self.config.location.as_str()),
            ("api_key", api_key),
        ];

        let response: SearchResponse = self.fetcher.get_json(endpoint, &query).await?;
        let total = response.jobs_results.len();

        let postings: Vec<Posting> = response
            .jobs_results
            .into_iter()
            .filter_map(|result| self.to_posting(result, as_of))
            .filter(|posting| !seen.contains(&posting.url))
            .collect();

        tracing::debug!(source = self.name(), total, accepted = postings.len(), "Search results processed");
        Ok(postings)
    }
}
