//! Board-hosted job APIs (Greenhouse, Lever)
//!
//! Both expose every open position of one company as JSON. Postings are
//! filtered by title keyword and location allowlist; missing company,
//! location and URL fields fall back to the board slug, the configured
//! default location and the board's landing page.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;

use crate::config::BoardSourceConfig;
use crate::crawler::fetcher::HttpFetcher;
use crate::crawler::url::canonicalize_url;
use crate::crawler::Collector;
use crate::models::{Posting, Source};
use crate::storage::dedup::SeenSet;
use crate::utils::error::{CollectorError, FetchError};

/// Which board API to query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardKind {
    Greenhouse,
    Lever,
}

impl BoardKind {
    pub fn source(&self) -> Source {
        match self {
            Self::Greenhouse => Source::Greenhouse,
            Self::Lever => Source::Lever,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Greenhouse => "Greenhouse",
            Self::Lever => "Lever",
        }
    }

    fn default_api_base(&self) -> &'static str {
        match self {
            Self::Greenhouse => "https://boards-api.greenhouse.io",
            Self::Lever => "https://api.lever.co",
        }
    }

    /// API URL and query for one board
    fn endpoint(&self, api_base: &str, board: &str) -> (String, [(&'static str, &'static str); 1]) {
        let base = api_base.trim_end_matches('/');
        match self {
            Self::Greenhouse => (
                format!("{base}/v1/boards/{board}/jobs"),
                [("content", "true")],
            ),
            Self::Lever => (format!("{base}/v0/postings/{board}"), [("mode", "json")]),
        }
    }

    /// Landing page used when a posting has no URL of its own
    pub fn fallback_url(&self, board: &str) -> String {
        match self {
            Self::Greenhouse => format!("https://boards.greenhouse.io/{board}"),
            Self::Lever => format!("https://jobs.lever.co/{board}"),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct GreenhouseResponse {
    #[serde(default)]
    jobs: Vec<GreenhouseJob>,
}

#[derive(Debug, Default, Deserialize)]
struct GreenhouseJob {
    title: Option<String>,
    location: Option<NamedField>,
    absolute_url: Option<String>,
    company: Option<NamedField>,
    company_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct NamedField {
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LeverPosting {
    text: Option<String>,
    title: Option<String>,
    categories: Option<LeverCategories>,
    #[serde(rename = "hostedUrl")]
    hosted_url: Option<String>,
    #[serde(rename = "applyUrl")]
    apply_url: Option<String>,
    company: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LeverCategories {
    location: Option<String>,
}

/// Raw fields of one board posting, before filtering
#[derive(Debug, Default)]
struct BoardJob {
    title: String,
    location: String,
    url: String,
    company: String,
}

fn trimmed(value: Option<String>) -> String {
    value.map(|s| s.trim().to_string()).unwrap_or_default()
}

impl From<GreenhouseJob> for BoardJob {
    fn from(job: GreenhouseJob) -> Self {
        let company = job
            .company
            .and_then(|c| c.name)
            .or(job.company_name);
        Self {
            title: trimmed(job.title),
            location: trimmed(job.location.and_then(|l| l.name)),
            url: trimmed(job.absolute_url),
            company: trimmed(company),
        }
    }
}

impl From<LeverPosting> for BoardJob {
    fn from(job: LeverPosting) -> Self {
        let title = job.text.filter(|t| !t.trim().is_empty()).or(job.title);
        let url = job
            .hosted_url
            .filter(|u| !u.trim().is_empty())
            .or(job.apply_url);
        Self {
            title: trimmed(title),
            location: trimmed(job.categories.and_then(|c| c.location)),
            url: trimmed(url),
            company: trimmed(job.company),
        }
    }
}

/// Collector for a board API
pub struct BoardApiCollector {
    kind: BoardKind,
    config: BoardSourceConfig,
    fetcher: Arc<HttpFetcher>,
    title_keywords: Vec<String>,
    location_tokens: Vec<String>,
}

impl BoardApiCollector {
    pub fn new(kind: BoardKind, config: BoardSourceConfig, fetcher: Arc<HttpFetcher>) -> Self {
        let title_keywords = config
            .title_keywords
            .iter()
            .map(|k| k.to_lowercase())
            .collect();
        let location_tokens = config
            .location_tokens
            .iter()
            .map(|t| t.to_lowercase())
            .collect();

        Self {
            kind,
            config,
            fetcher,
            title_keywords,
            location_tokens,
        }
    }

    async fn fetch_board(&self, board: &str) -> Result<Vec<BoardJob>, FetchError> {
        let api_base = self
            .config
            .api_base
            .as_deref()
            .unwrap_or(self.kind.default_api_base());
        let (url, query) = self.kind.endpoint(api_base, board);

        let jobs = match self.kind {
            BoardKind::Greenhouse => self
                .fetcher
                .get_json::<GreenhouseResponse>(&url, &query)
                .await?
                .jobs
                .into_iter()
                .map(BoardJob::from)
                .collect(),
            BoardKind::Lever => self
                .fetcher
                .get_json::<Vec<LeverPosting>>(&url, &query)
                .await?
                .into_iter()
                .map(BoardJob::from)
                .collect(),
        };

        Ok(jobs)
    }

    fn title_matches(&self, title: &str) -> bool {
        let title = title.to_lowercase();
        self.title_keywords.iter().any(|k| title.contains(k.as_str()))
    }

    /// Empty locations pass; others must mention an allowlisted token
    fn location_matches(&self, location: &str) -> bool {
        if location.is_empty() {
            return true;
        }
        let location = location.to_lowercase();
        self.location_tokens.iter().any(|t| location.contains(t.as_str()))
    }

    fn to_posting(&self, board: &str, job: BoardJob, as_of: NaiveDate) -> Option<Posting> {
        if job.title.is_empty() || !self.title_matches(&job.title) {
            return None;
        }
        if !self.location_matches(&job.location) {
            return None;
        }

        let url = canonicalize_url(&job.url)
            .or_else(|| canonicalize_url(&self.kind.fallback_url(board)))?;
        let company = if job.company.is_empty() {
            board.to_string()
        } else {
            job.company
        };
        let location = if job.location.is_empty() {
            self.config.default_location.clone()
        } else {
            job.location
        };

        Some(Posting::new(
            self.kind.source(),
            job.title,
            company,
            location,
            url,
            as_of,
        ))
    }
}

#[async_trait]
impl Collector for BoardApiCollector {
    fn name(&self) -> &str {
        self.kind.label()
    }

    async fn collect(
        &self,
        as_of: NaiveDate,
        seen: &SeenSet,
    ) -> Result<Vec<Posting>, CollectorError> {
        let mut postings = Vec::new();

        for board in &self.config.boards {
            let jobs = match self.fetch_board(board).await {
                Ok(jobs) => jobs,
                Err(e) => {
                    tracing::warn!(source = self.name(), board = %board, error = %e, "Board fetch failed, skipping");
                    continue;
                }
            };

            let total = jobs.len();
            let before = postings.len();
            postings.extend(
                jobs.into_iter()
                    .filter_map(|job| self.to_posting(board, job, as_of))
                    .filter(|posting| !seen.contains(&posting.url)),
            );

            tracing::debug!(
                source = self.name(),
                board = %board,
                total,
                accepted = postings.len() - before,
                "Board processed"
            );
        }

        Ok(postings)
    }
}
