//! Browser-automation collector
//!
//! Runs an authenticated search in a real browser, discovers listing
//! candidates by scrolling the results (see [`pagination`]), then resolves
//! each candidate's fields through the extraction fallback chain:
//! structured data and the rendered detail page, the search-card hints, and
//! finally the guest endpoint over plain HTTP. Every candidate yields one
//! posting, however many of its fields stayed unresolved.

pub mod chrome;
pub mod pagination;
pub mod session;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::time::Instant;

use crate::config::BrowserSourceConfig;
use crate::crawler::fetcher::HttpFetcher;
use crate::crawler::url::{guest_listing_url, search_url};
use crate::crawler::Collector;
use crate::models::{Posting, Source};
use crate::parser::{self, DetailExtractor, FieldSet, Strategy};
use crate::storage::dedup::SeenSet;
use crate::utils::error::{BrowserError, CollectorError, FetchError};
use crate::utils::retry::with_retry_if;

pub use chrome::{save_session, ChromeLauncher};
pub use pagination::{Candidate, Discovery, PaginationController, StopReason};
pub use session::{BrowserSession, SessionLauncher, StorageState, StoredCookie};

const NAME: &str = "LinkedIn (Browser)";

/// Collector for the browser-driven job search
pub struct BrowserCollector {
    config: BrowserSourceConfig,
    launcher: Arc<dyn SessionLauncher>,
    fetcher: Arc<HttpFetcher>,
    controller: PaginationController,
    detail: DetailExtractor,
}

impl BrowserCollector {
    /// Collector backed by a local Chrome
    pub fn new(config: BrowserSourceConfig, fetcher: Arc<HttpFetcher>) -> Self {
        let launcher = Arc::new(ChromeLauncher::new(&config));
        Self::with_launcher(config, launcher, fetcher)
    }

    pub fn with_launcher(
        config: BrowserSourceConfig,
        launcher: Arc<dyn SessionLauncher>,
        fetcher: Arc<HttpFetcher>,
    ) -> Self {
        let controller = PaginationController::new(&config);
        Self {
            config,
            launcher,
            fetcher,
            controller,
            detail: DetailExtractor::new(),
        }
    }

    /// Resolve one candidate's fields through the fallback chain
    async fn extract(&self, session: &dyn BrowserSession, candidate: &Candidate) -> FieldSet {
        let mut fields = FieldSet::default();
        let mut contributed: Vec<Strategy> = Vec::new();

        let navigated = with_retry_if(
            &self.config.retry,
            || session.goto(&candidate.url),
            BrowserError::is_recoverable,
        )
        .await;

        match navigated {
            Ok(()) => match self.read_page(session).await {
                Ok(html) => {
                    let (page_fields, strategies) = parser::extract_page(&html, &self.detail);
                    fields.fill_missing(page_fields);
                    contributed.extend(strategies);
                }
                Err(e) => {
                    tracing::warn!(url = %candidate.url, error = %e, "Reading detail page failed");
                }
            },
            Err(e) => {
                tracing::warn!(url = %candidate.url, error = %e, "Detail navigation failed, using remaining strategies");
            }
        }

        if !fields.is_complete()
            && fields.fill_missing(candidate.card.clone()) > 0
            && !contributed.contains(&Strategy::RenderedDom)
        {
            contributed.push(Strategy::RenderedDom);
        }

        if !fields.is_complete() {
            if let Some(id) = candidate.listing_id {
                match self.guest_fields(id).await {
                    Ok(guest) => {
                        if fields.fill_missing(guest) > 0 {
                            contributed.push(Strategy::GuestEndpoint);
                        }
                    }
                    Err(e) => {
                        tracing::debug!(url = %candidate.url, error = %e, "Guest endpoint unavailable");
                    }
                }
            }
        }

        if fields.is_complete() {
            tracing::debug!(url = %candidate.url, strategies = ?contributed, "Listing resolved");
        } else {
            tracing::debug!(
                url = %candidate.url,
                strategies = ?contributed,
                missing = ?fields.missing(),
                "Listing partially resolved"
            );
        }

        fields
    }

    async fn read_page(&self, session: &dyn BrowserSession) -> Result<String, BrowserError> {
        session.clear_overlays(&self.config.overlay_selectors).await?;
        session.content().await
    }

    async fn guest_fields(&self, listing_id: u64) -> Result<FieldSet, FetchError> {
        let url = guest_listing_url(&self.config.guest_endpoint, listing_id)?;
        let html = self.fetcher.get_text(&url).await?;
        Ok(self.detail.extract_html(&html))
    }

    fn to_posting(&self, url: String, fields: FieldSet, as_of: NaiveDate) -> Posting {
        let resolved = fields.resolve(&self.config.location);
        Posting::new(
            Source::LinkedInBrowser,
            resolved.title,
            resolved.company,
            resolved.location,
            url,
            as_of,
        )
    }

    /// Discover and extract on an open session
    async fn run_session(
        &self,
        session: &dyn BrowserSession,
        as_of: NaiveDate,
        seen: &SeenSet,
        deadline: Instant,
    ) -> Result<Vec<Posting>, CollectorError> {
        let url = search_url(&self.config.site, &self.config.query, &self.config.location)?;
        let discovery = self.controller.discover(session, &url, seen, deadline).await?;

        let mut postings = Vec::with_capacity(discovery.candidates.len());
        let mut out_of_time = false;

        for candidate in discovery.candidates {
            let fields = if out_of_time {
                candidate.card.clone()
            } else {
                match tokio::time::timeout_at(deadline, self.extract(session, &candidate)).await {
                    Ok(fields) => fields,
                    Err(_) => {
                        tracing::warn!(url = %candidate.url, "Time budget spent, remaining listings keep their card fields");
                        out_of_time = true;
                        candidate.card.clone()
                    }
                }
            };
            postings.push(self.to_posting(candidate.url, fields, as_of));
        }

        let incomplete = postings.iter().filter(|p| p.is_incomplete()).count();
        tracing::info!(
            source = NAME,
            postings = postings.len(),
            incomplete,
            stop = %discovery.stop,
            "Extraction finished"
        );

        Ok(postings)
    }
}

#[async_trait]
impl Collector for BrowserCollector {
    fn name(&self) -> &str {
        NAME
    }

    async fn collect(
        &self,
        as_of: NaiveDate,
        seen: &SeenSet,
    ) -> Result<Vec<Posting>, CollectorError> {
        if !self.config.storage_state_path.exists() {
            return Err(CollectorError::MissingSession(
                self.config.storage_state_path.clone(),
            ));
        }

        let deadline = Instant::now() + self.config.time_budget();
        let launch = with_retry_if(
            &self.config.retry,
            || self.launcher.open(),
            BrowserError::is_recoverable,
        );
        let session = tokio::time::timeout_at(deadline, launch)
            .await
            .map_err(|_| BrowserError::Timeout("browser launch within the time budget".into()))??;

        let result = self.run_session(session.as_ref(), as_of, seen, deadline).await;

        if let Err(e) = session.close().await {
            tracing::debug!(error = %e, "Closing browser session failed");
        }

        result
    }
}
