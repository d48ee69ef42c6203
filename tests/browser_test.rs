//! Browser collector driven through a scripted session

mod common;

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use jobtrail::config::BrowserSourceConfig;
use jobtrail::crawler::browser::{
    BrowserCollector, BrowserSession, PaginationController, SessionLauncher, StopReason,
};
use jobtrail::crawler::Collector;
use jobtrail::models::Source;
use jobtrail::storage::SeenSet;
use jobtrail::utils::error::{BrowserError, CollectorError};
use jobtrail::utils::retry::RetryConfig;
use tempfile::NamedTempFile;
use tokio::time::Instant;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SEARCH: &str = "https://www.linkedin.com/jobs/search/?keywords=Data+Scientist&location=Israel";

#[derive(Default)]
struct Recorded {
    current: String,
    scrolls: usize,
    calls: Vec<&'static str>,
    visited: Vec<String>,
}

/// Serves one results page per scroll position and fixed detail pages
#[derive(Clone, Default)]
struct ScriptedSession {
    results: Vec<String>,
    details: HashMap<String, String>,
    unreachable: HashSet<String>,
    goto_delay: Option<Duration>,
    scroll_delay: Option<Duration>,
    state: Arc<Mutex<Recorded>>,
}

impl ScriptedSession {
    fn with_results(results: Vec<String>) -> Self {
        Self {
            results,
            ..Self::default()
        }
    }

    fn calls(&self) -> Vec<&'static str> {
        self.state.lock().unwrap().calls.clone()
    }

    fn visited(&self) -> Vec<String> {
        self.state.lock().unwrap().visited.clone()
    }
}

#[async_trait]
impl BrowserSession for ScriptedSession {
    async fn goto(&self, url: &str) -> Result<(), BrowserError> {
        if let Some(delay) = self.goto_delay {
            tokio::time::sleep(delay).await;
        }
        let mut state = self.state.lock().unwrap();
        state.calls.push("goto");
        state.visited.push(url.to_string());
        if self.unreachable.contains(url) {
            return Err(BrowserError::Navigation {
                url: url.to_string(),
                reason: "net::ERR_CONNECTION_RESET".to_string(),
            });
        }
        state.current = url.to_string();
        Ok(())
    }

    async fn content(&self) -> Result<String, BrowserError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("content");
        if state.current.contains("/jobs/search") {
            let index = state.scrolls.min(self.results.len().saturating_sub(1));
            Ok(self.results.get(index).cloned().unwrap_or_default())
        } else {
            Ok(self
                .details
                .get(&state.current)
                .cloned()
                .unwrap_or_else(|| String::from("<html><body></body></html>")))
        }
    }

    async fn clear_overlays(&self, _selectors: &[String]) -> Result<usize, BrowserError> {
        self.state.lock().unwrap().calls.push("clear");
        Ok(0)
    }

    async fn scroll_results(&self) -> Result<(), BrowserError> {
        {
            let mut state = self.state.lock().unwrap();
            state.calls.push("scroll");
            state.scrolls += 1;
        }
        if let Some(delay) = self.scroll_delay {
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }

    async fn close(&self) -> Result<(), BrowserError> {
        self.state.lock().unwrap().calls.push("close");
        Ok(())
    }
}

struct ScriptedLauncher(ScriptedSession);

struct StalledLauncher;

#[async_trait]
impl SessionLauncher for StalledLauncher {
    async fn open(&self) -> Result<Box<dyn BrowserSession>, BrowserError> {
        tokio::time::sleep(Duration::from_secs(120)).await;
        Ok(Box::new(ScriptedSession::default()))
    }
}

#[async_trait]
impl SessionLauncher for ScriptedLauncher {
    async fn open(&self) -> Result<Box<dyn BrowserSession>, BrowserError> {
        Ok(Box::new(self.0.clone()))
    }
}

fn browser_config(state: &NamedTempFile) -> BrowserSourceConfig {
    BrowserSourceConfig {
        enabled: true,
        max_jobs: 10,
        max_iterations: 5,
        time_budget_secs: 60,
        scroll_pause_ms: 10,
        storage_state_path: state.path().to_path_buf(),
        retry: RetryConfig::with_delays(2, 1, 5),
        ..BrowserSourceConfig::default()
    }
}

fn id(n: u64) -> u64 {
    3_900_000_000 + n
}

fn card(n: u64, title: &str, company: Option<&str>) -> String {
    common::result_card(id(n), title, company)
}

fn page(ns: &[u64]) -> String {
    let cards: Vec<String> = ns
        .iter()
        .map(|n| card(*n, &format!("Role {n}"), Some("Acme")))
        .collect();
    common::results_page(&cards)
}

fn listing(n: u64) -> String {
    format!("https://www.linkedin.com/jobs/view/{}", id(n))
}

#[tokio::test(start_paused = true)]
async fn test_discovery_stops_at_target() {
    let state = NamedTempFile::new().unwrap();
    let config = BrowserSourceConfig {
        max_jobs: 3,
        ..browser_config(&state)
    };
    let session = ScriptedSession::with_results(vec![page(&[1, 2]), page(&[1, 2, 3, 4]), page(&[5])]);

    let discovery = PaginationController::new(&config)
        .discover(&session, SEARCH, &SeenSet::new(), Instant::now() + Duration::from_secs(60))
        .await
        .unwrap();

    assert_eq!(discovery.stop, StopReason::TargetReached);
    assert_eq!(discovery.iterations, 2);
    let urls: Vec<&str> = discovery.candidates.iter().map(|c| c.url.as_str()).collect();
    assert_eq!(urls, vec![listing(1), listing(2), listing(3)]);
}

#[tokio::test(start_paused = true)]
async fn test_discovery_stops_at_iteration_cap_and_skips_seen() {
    let state = NamedTempFile::new().unwrap();
    let config = BrowserSourceConfig {
        max_iterations: 3,
        ..browser_config(&state)
    };
    let session = ScriptedSession::with_results(vec![page(&[1, 2]), page(&[1, 2, 3])]);

    let mut seen = SeenSet::new();
    seen.insert(listing(2));

    let discovery = PaginationController::new(&config)
        .discover(&session, SEARCH, &seen, Instant::now() + Duration::from_secs(60))
        .await
        .unwrap();

    assert_eq!(discovery.stop, StopReason::MaxIterations);
    assert_eq!(discovery.iterations, 3);
    assert_eq!(discovery.skipped_seen, 1);
    let urls: Vec<&str> = discovery.candidates.iter().map(|c| c.url.as_str()).collect();
    assert_eq!(urls, vec![listing(1), listing(3)]);
    assert_eq!(discovery.candidates[0].card.company.as_deref(), Some("Acme"));
}

#[tokio::test(start_paused = true)]
async fn test_discovery_stops_at_deadline() {
    let state = NamedTempFile::new().unwrap();
    let config = BrowserSourceConfig {
        max_iterations: 1000,
        ..browser_config(&state)
    };
    let session = ScriptedSession {
        scroll_delay: Some(Duration::from_secs(4)),
        ..ScriptedSession::with_results(vec![page(&[1])])
    };

    let started = Instant::now();
    let discovery = PaginationController::new(&config)
        .discover(&session, SEARCH, &SeenSet::new(), started + Duration::from_secs(10))
        .await
        .unwrap();

    assert_eq!(discovery.stop, StopReason::TimeBudget);
    assert_eq!(discovery.iterations, 3);
    assert_eq!(discovery.candidates.len(), 1);
    assert!(started.elapsed() >= Duration::from_secs(10));
}

#[tokio::test(start_paused = true)]
async fn test_overlays_cleared_before_every_interaction() {
    let state = NamedTempFile::new().unwrap();
    let config = BrowserSourceConfig {
        max_iterations: 2,
        ..browser_config(&state)
    };
    let session = ScriptedSession::with_results(vec![page(&[1])]);

    PaginationController::new(&config)
        .discover(&session, SEARCH, &SeenSet::new(), Instant::now() + Duration::from_secs(60))
        .await
        .unwrap();

    let calls = session.calls();
    assert_eq!(calls[0], "goto");
    for (i, call) in calls.iter().enumerate() {
        if matches!(*call, "content" | "scroll") {
            assert_eq!(calls[i - 1], "clear", "{call} at {i} not preceded by clear: {calls:?}");
        }
    }
}

#[tokio::test(start_paused = true)]
async fn test_search_navigation_failure_is_fatal() {
    let state = NamedTempFile::new().unwrap();
    let config = browser_config(&state);
    let session = ScriptedSession {
        unreachable: HashSet::from([SEARCH.to_string()]),
        ..ScriptedSession::default()
    };

    let err = PaginationController::new(&config)
        .discover(&session, SEARCH, &SeenSet::new(), Instant::now() + Duration::from_secs(60))
        .await
        .unwrap_err();

    assert!(matches!(err, BrowserError::Navigation { .. }));
    // retried once
    assert_eq!(session.visited().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_slow_search_navigation_respects_deadline() {
    let state = NamedTempFile::new().unwrap();
    let config = browser_config(&state);
    let session = ScriptedSession {
        goto_delay: Some(Duration::from_secs(90)),
        ..ScriptedSession::with_results(vec![page(&[1])])
    };

    let started = Instant::now();
    let err = PaginationController::new(&config)
        .discover(&session, SEARCH, &SeenSet::new(), started + Duration::from_secs(5))
        .await
        .unwrap_err();

    assert!(matches!(err, BrowserError::Timeout(_)));
    assert!(started.elapsed() <= Duration::from_secs(5));
    assert!(session.visited().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_slow_launch_respects_time_budget() {
    let state = NamedTempFile::new().unwrap();
    let config = BrowserSourceConfig {
        time_budget_secs: 10,
        ..browser_config(&state)
    };
    let collector = BrowserCollector::with_launcher(
        config,
        Arc::new(StalledLauncher),
        Arc::new(common::fast_fetcher()),
    );

    let started = Instant::now();
    let err = collector
        .collect(common::date(2024, 5, 1), &SeenSet::new())
        .await
        .unwrap_err();

    assert!(matches!(err, CollectorError::Browser(BrowserError::Timeout(_))));
    assert!(started.elapsed() <= Duration::from_secs(10));
}

#[tokio::test]
async fn test_fallback_chain_resolves_each_candidate() {
    let guest = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/jobPosting/3900000003"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<section class="top-card-layout">
                 <h2 class="top-card-layout__title">Role 3</h2>
                 <a class="topcard__org-name-link">Initech</a>
                 <span class="topcard__flavor--bullet">tel-aviv</span>
               </section>"#,
        ))
        .expect(1)
        .mount(&guest)
        .await;
    Mock::given(method("GET"))
        .and(path("/jobPosting/3900000004"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&guest)
        .await;

    let state = NamedTempFile::new().unwrap();
    let config = BrowserSourceConfig {
        max_iterations: 1,
        guest_endpoint: format!("{}/jobPosting/{{id}}", guest.uri()),
        ..browser_config(&state)
    };

    let cards = vec![
        card(1, "Role 1", Some("Acme")),
        card(2, "Role 2", Some("Acme")),
        card(3, "Role 3", None),
        card(4, "Role 4 Role 4", None),
    ];

    let mut details = HashMap::new();
    details.insert(
        listing(1),
        r#"<html><head><script type="application/ld+json">
            {"@context": "https://schema.org", "@type": "JobPosting",
             "title": "Senior Data Scientist with verification",
             "hiringOrganization": {"@type": "Organization", "name": "Globex"},
             "jobLocation": {"address": {"addressLocality": "Herzliya", "addressCountry": "IL"}}}
           </script></head><body></body></html>"#
            .to_string(),
    );

    let session = ScriptedSession {
        results: vec![common::results_page(&cards)],
        details,
        unreachable: HashSet::from([listing(2)]),
        ..ScriptedSession::default()
    };

    let collector = BrowserCollector::with_launcher(
        config,
        Arc::new(ScriptedLauncher(session.clone())),
        Arc::new(common::fast_fetcher()),
    );

    let postings = collector
        .collect(common::date(2024, 5, 1), &SeenSet::new())
        .await
        .unwrap();

    assert_eq!(postings.len(), 4);
    assert!(postings.iter().all(|p| p.source == Source::LinkedInBrowser));

    // structured data on the detail page
    assert_eq!(postings[0].title, "Senior Data Scientist");
    assert_eq!(postings[0].company, "Globex");
    assert_eq!(postings[0].location, "Herzliya, Israel");

    // detail navigation failed, card hints and the requested location remain
    assert_eq!(postings[1].url, listing(2));
    assert_eq!(postings[1].title, "Role 2");
    assert_eq!(postings[1].company, "Acme");
    assert_eq!(postings[1].location, "Israel");

    // guest endpoint fills what the card lacked
    assert_eq!(postings[2].company, "Initech");
    assert_eq!(postings[2].location, "Tel Aviv, Israel");

    // nothing resolves the company: the posting is kept anyway
    assert_eq!(postings[3].title, "Role 4");
    assert_eq!(postings[3].company, "");
    assert_eq!(postings[3].location, "Israel");

    assert_eq!(session.calls().last(), Some(&"close"));
}

#[tokio::test(start_paused = true)]
async fn test_extraction_stops_at_time_budget() {
    let state = NamedTempFile::new().unwrap();
    // detail pages are unreachable and every retry waits 2s, so the first
    // extraction outlives the 5s budget
    let config = BrowserSourceConfig {
        max_iterations: 1,
        time_budget_secs: 5,
        retry: RetryConfig::with_delays(10, 2000, 2000),
        ..browser_config(&state)
    };

    let cards: Vec<String> = (1..=3)
        .map(|n| card(n, &format!("Role {n}"), Some("Acme")))
        .collect();
    let session = ScriptedSession {
        results: vec![common::results_page(&cards)],
        unreachable: (1..=3).map(listing).collect(),
        ..ScriptedSession::default()
    };

    let collector = BrowserCollector::with_launcher(
        config,
        Arc::new(ScriptedLauncher(session.clone())),
        Arc::new(common::fast_fetcher()),
    );

    let postings = collector
        .collect(common::date(2024, 5, 1), &SeenSet::new())
        .await
        .unwrap();

    assert_eq!(postings.len(), 3);
    assert!(postings.iter().all(|p| p.company == "Acme"));
    assert_eq!(postings[2].title, "Role 3");

    // only the first listing was attempted before the budget ran out
    let detail_visits = session
        .visited()
        .iter()
        .filter(|url| url.contains("/jobs/view/"))
        .count();
    assert!(detail_visits <= 3, "visited {detail_visits} detail pages");
}
