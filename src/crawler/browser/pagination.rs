//! Search-result discovery with pagination and a wall-clock budget
//!
//! Discovery scrolls the results list until one of three limits is hit:
//! enough new listings, the iteration cap, or the deadline. Listings that
//! are already archived are skipped and do not count toward the target.

use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

use tokio::time::Instant;

use super::session::BrowserSession;
use crate::config::BrowserSourceConfig;
use crate::parser::{CardParser, FieldSet};
use crate::storage::dedup::SeenSet;
use crate::utils::error::BrowserError;
use crate::utils::retry::{with_retry_if, RetryConfig};

/// Why discovery stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    TargetReached,
    MaxIterations,
    TimeBudget,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::TargetReached => "target reached",
            Self::MaxIterations => "max iterations",
            Self::TimeBudget => "time budget",
        })
    }
}

/// A new listing found on the results page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub url: String,
    pub listing_id: Option<u64>,
    /// Fields shown on the result card
    pub card: FieldSet,
}

#[derive(Debug, Clone)]
pub struct Discovery {
    pub candidates: Vec<Candidate>,
    pub stop: StopReason,
    pub iterations: u32,
    /// Cards skipped because their URL was already archived
    pub skipped_seen: usize,
}

pub struct PaginationController {
    site: String,
    target: usize,
    max_iterations: u32,
    scroll_pause: Duration,
    overlay_selectors: Vec<String>,
    retry: RetryConfig,
    parser: CardParser,
}

impl PaginationController {
    pub fn new(config: &BrowserSourceConfig) -> Self {
        Self {
            site: config.site.clone(),
            target: config.max_jobs,
            max_iterations: config.max_iterations,
            scroll_pause: config.scroll_pause(),
            overlay_selectors: config.overlay_selectors.clone(),
            retry: config.retry.clone(),
            parser: CardParser::new(),
        }
    }

    /// Collect new candidates from the search results at `search_url`
    ///
    /// Only the initial navigation is fatal, including when it does not
    /// finish before `deadline`. Failures inside an iteration are logged and
    /// the loop carries on with the next scroll.
    pub async fn discover(
        &self,
        session: &dyn BrowserSession,
        search_url: &str,
        seen: &SeenSet,
        deadline: Instant,
    ) -> Result<Discovery, BrowserError> {
        let navigation = with_retry_if(
            &self.retry,
            || session.goto(search_url),
            BrowserError::is_recoverable,
        );
        tokio::time::timeout_at(deadline, navigation)
            .await
            .map_err(|_| BrowserError::Timeout(format!("{search_url} within the time budget")))??;

        let mut page_urls: HashSet<String> = HashSet::new();
        let mut candidates = Vec::new();
        let mut skipped_seen = 0;
        let mut iterations = 0;

        let stop = loop {
            if candidates.len() >= self.target {
                break StopReason::TargetReached;
            }
            if iterations >= self.max_iterations {
                break StopReason::MaxIterations;
            }
            if Instant::now() >= deadline {
                break StopReason::TimeBudget;
            }
            iterations += 1;

            let before = candidates.len();
            match self.read_cards(session).await {
                Ok(cards) => {
                    for card in cards {
                        if !page_urls.insert(card.url.clone()) {
                            continue;
                        }
                        if seen.contains(&card.url) {
                            skipped_seen += 1;
                            continue;
                        }
                        candidates.push(Candidate {
                            url: card.url,
                            listing_id: card.listing_id,
                            card: card.hints,
                        });
                        if candidates.len() >= self.target {
                            break;
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(iteration = iterations, error = %e, "Reading results failed");
                }
            }

            tracing::debug!(
                iteration = iterations,
                new = candidates.len() - before,
                total = candidates.len(),
                skipped_seen,
                "Discovery step"
            );

            if candidates.len() >= self.target {
                continue;
            }

            if let Err(e) = self.advance(session).await {
                tracing::warn!(iteration = iterations, error = %e, "Scrolling results failed");
            }
            let pause_until = (Instant::now() + self.scroll_pause).min(deadline);
            tokio::time::sleep_until(pause_until).await;
        };

        tracing::info!(
            candidates = candidates.len(),
            iterations,
            skipped_seen,
            stop = %stop,
            "Discovery finished"
        );

        Ok(Discovery {
            candidates,
            stop,
            iterations,
            skipped_seen,
        })
    }

    async fn read_cards(
        &self,
        session: &dyn BrowserSession,
    ) -> Result<Vec<crate::parser::ParsedCard>, BrowserError> {
        session.clear_overlays(&self.overlay_selectors).await?;
        let html = session.content().await?;
        Ok(self.parser.parse_cards(&html, &self.site))
    }

    async fn advance(&self, session: &dyn BrowserSession) -> Result<(), BrowserError> {
        session.clear_overlays(&self.overlay_selectors).await?;
        session.scroll_results().await
    }
}
