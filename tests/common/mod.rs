//! Common test utilities

use std::time::Duration;

use chrono::NaiveDate;
use jobtrail::crawler::HttpFetcher;
use jobtrail::models::{Posting, Source};
use jobtrail::utils::retry::RetryConfig;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Create a test posting with default values
pub fn posting(url: &str, company: &str, collected_at: NaiveDate) -> Posting {
    Posting::new(
        Source::SerpApi,
        "Data Scientist",
        company,
        "Tel Aviv, Israel",
        url,
        collected_at,
    )
}

/// Fetcher with millisecond backoff so retry tests stay fast
#[allow(dead_code)]
pub fn fast_fetcher() -> HttpFetcher {
    HttpFetcher::with_config(
        100,
        RetryConfig::with_delays(3, 5, 20),
        Duration::from_secs(5),
    )
    .unwrap()
}

/// Search-result card markup as rendered for a logged-out visitor
#[allow(dead_code)]
pub fn result_card(id: u64, title: &str, company: Option<&str>) -> String {
    let company = company
        .map(|c| format!(r#"<h4 class="base-search-card__subtitle"><a href="/company/x">{c}</a></h4>"#))
        .unwrap_or_default();
    format!(
        r#"<li><div class="base-card">
             <a class="base-card__full-link" href="https://il.linkedin.com/jobs/view/role-{id}?refId=r">{title}</a>
             <h3 class="base-search-card__title">{title}</h3>
             {company}
           </div></li>"#
    )
}

/// A results page holding `cards`
#[allow(dead_code)]
pub fn results_page(cards: &[String]) -> String {
    format!(
        r#"<html><body><ul class="jobs-search__results-list">{}</ul></body></html>"#,
        cards.concat()
    )
}
