//! Chrome-backed browser sessions over the DevTools protocol

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::network::{
    CookieParam, EnableParams, SetBlockedUrLsParams, TimeSinceEpoch,
};
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use super::session::{BrowserSession, SessionLauncher, StorageState, StoredCookie};
use crate::config::BrowserSourceConfig;
use crate::utils::error::BrowserError;

/// Marker element present only on authenticated pages
const SIGNED_IN_MARKER: &str = "#global-nav";

const CLEAR_OVERLAYS_JS: &str = r#"
(selectors) => {
    let removed = 0;
    for (const selector of selectors) {
        for (const node of document.querySelectorAll(selector)) {
            node.remove();
            removed += 1;
        }
    }
    document.body && document.body.classList.remove('modal-open');
    return removed;
}"#;

const SCROLL_RESULTS_JS: &str = r#"
(() => {
    const list = document.querySelector('.jobs-search-results-list')
        || document.querySelector('.scaffold-layout__list');
    if (list) {
        list.scrollTop = list.scrollHeight;
    } else {
        window.scrollTo(0, document.body.scrollHeight);
    }
    const more = document.querySelector('button.infinite-scroller__show-more-button');
    if (more && !more.disabled) {
        more.click();
    }
    return true;
})()"#;

fn protocol(e: impl std::fmt::Display) -> BrowserError {
    BrowserError::Protocol(e.to_string())
}

/// Launches Chrome with the saved session applied
#[derive(Debug, Clone)]
pub struct ChromeLauncher {
    headless: bool,
    navigation_timeout: Duration,
    blocked_url_patterns: Vec<String>,
    storage_state_path: PathBuf,
}

impl ChromeLauncher {
    pub fn new(config: &BrowserSourceConfig) -> Self {
        Self {
            headless: config.headless,
            navigation_timeout: config.navigation_timeout(),
            blocked_url_patterns: config.blocked_url_patterns.clone(),
            storage_state_path: config.storage_state_path.clone(),
        }
    }
}

/// Start a browser and keep its event handler polled
async fn launch(headless: bool, timeout: Duration) -> Result<(Browser, JoinHandle<()>), BrowserError> {
    let mut builder = BrowserConfig::builder().request_timeout(timeout);
    if !headless {
        builder = builder.with_head();
    }
    let config = builder.build().map_err(BrowserError::Launch)?;

    let (browser, mut handler) = Browser::launch(config)
        .await
        .map_err(|e| BrowserError::Launch(e.to_string()))?;

    let handle = tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            if let Err(e) = event {
                tracing::trace!(error = %e, "Browser handler event error");
            }
        }
    });

    Ok((browser, handle))
}

fn to_cookie_param(cookie: &StoredCookie) -> Result<CookieParam, BrowserError> {
    let mut builder = CookieParam::builder()
        .name(cookie.name.clone())
        .value(cookie.value.clone())
        .domain(cookie.domain.clone())
        .path(cookie.path.clone())
        .secure(cookie.secure)
        .http_only(cookie.http_only);
    if cookie.expires > 0.0 {
        builder = builder.expires(TimeSinceEpoch::new(cookie.expires));
    }
    builder.build().map_err(BrowserError::Session)
}

#[async_trait]
impl SessionLauncher for ChromeLauncher {
    async fn open(&self) -> Result<Box<dyn BrowserSession>, BrowserError> {
        let state = StorageState::load(&self.storage_state_path).await?;
        let (browser, handler) = launch(self.headless, self.navigation_timeout).await?;

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                handler.abort();
                return Err(BrowserError::Launch(e.to_string()));
            }
        };

        let session = ChromeSession {
            browser: Mutex::new(browser),
            handler,
            page,
            navigation_timeout: self.navigation_timeout,
        };

        if let Err(e) = session.prepare(&state, &self.blocked_url_patterns).await {
            let _ = session.close().await;
            return Err(e);
        }

        tracing::debug!(cookies = state.cookies.len(), "Browser session opened");
        Ok(Box::new(session))
    }
}

/// One Chrome page with the browser that owns it
pub struct ChromeSession {
    browser: Mutex<Browser>,
    handler: JoinHandle<()>,
    page: Page,
    navigation_timeout: Duration,
}

impl ChromeSession {
    async fn prepare(&self, state: &StorageState, blocked: &[String]) -> Result<(), BrowserError> {
        if !blocked.is_empty() {
            self.page.execute(EnableParams::default()).await.map_err(protocol)?;
            self.page
                .execute(SetBlockedUrLsParams::new(blocked.to_vec()))
                .await
                .map_err(protocol)?;
        }

        if !state.is_empty() {
            let cookies = state
                .cookies
                .iter()
                .map(to_cookie_param)
                .collect::<Result<Vec<_>, _>>()?;
            self.page.set_cookies(cookies).await.map_err(protocol)?;
        }

        Ok(())
    }
}

#[async_trait]
impl BrowserSession for ChromeSession {
    async fn goto(&self, url: &str) -> Result<(), BrowserError> {
        match tokio::time::timeout(self.navigation_timeout, self.page.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(BrowserError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            }),
            Err(_) => Err(BrowserError::Timeout(url.to_string())),
        }
    }

    async fn content(&self) -> Result<String, BrowserError> {
        self.page.content().await.map_err(protocol)
    }

    async fn clear_overlays(&self, selectors: &[String]) -> Result<usize, BrowserError> {
        if selectors.is_empty() {
            return Ok(0);
        }
        let list = serde_json::to_string(selectors).map_err(protocol)?;
        let script = format!("({CLEAR_OVERLAYS_JS})({list})");
        self.page
            .evaluate(script)
            .await
            .map_err(protocol)?
            .into_value::<usize>()
            .map_err(protocol)
    }

    async fn scroll_results(&self) -> Result<(), BrowserError> {
        self.page.evaluate(SCROLL_RESULTS_JS).await.map_err(protocol)?;
        Ok(())
    }

    async fn close(&self) -> Result<(), BrowserError> {
        if let Err(e) = self.page.clone().close().await {
            tracing::debug!(error = %e, "Page close failed");
        }

        let mut browser = self.browser.lock().await;
        let closed = browser.close().await.map_err(protocol);
        if let Err(e) = browser.wait().await {
            tracing::debug!(error = %e, "Browser process wait failed");
        }
        self.handler.abort();
        closed.map(|_| ())
    }
}

/// Interactive sign-in that records a reusable session
///
/// Opens a visible browser on the site's login page and waits until the
/// signed-in navigation bar appears, then writes the cookies to
/// `state_path`. Credentials are typed by the user, never stored.
pub async fn save_session(
    site: &str,
    state_path: &std::path::Path,
    wait: Duration,
) -> Result<usize, BrowserError> {
    let (mut browser, handler) = launch(false, Duration::from_secs(60)).await?;
    let result = record_session(&browser, site, state_path, wait).await;

    if let Err(e) = browser.close().await {
        tracing::debug!(error = %e, "Browser close failed");
    }
    let _ = browser.wait().await;
    handler.abort();
    result
}

async fn record_session(
    browser: &Browser,
    site: &str,
    state_path: &std::path::Path,
    wait: Duration,
) -> Result<usize, BrowserError> {
    let login = format!("{}/login", site.trim_end_matches('/'));
    let page = browser
        .new_page(login.as_str())
        .await
        .map_err(|e| BrowserError::Navigation {
            url: login.clone(),
            reason: e.to_string(),
        })?;

    tracing::info!(url = %login, timeout_secs = wait.as_secs(), "Sign in using the opened browser window");

    let deadline = tokio::time::Instant::now() + wait;
    loop {
        if page.find_element(SIGNED_IN_MARKER).await.is_ok() {
            break;
        }
        if tokio::time::Instant::now() >= deadline {
            return Err(BrowserError::Timeout(String::from("sign-in")));
        }
        tokio::time::sleep(Duration::from_secs(2)).await;
    }

    let cookies = page.get_cookies().await.map_err(protocol)?;
    let state = StorageState {
        cookies: cookies
            .into_iter()
            .map(|c| StoredCookie {
                name: c.name,
                value: c.value,
                domain: c.domain,
                path: c.path,
                expires: c.expires,
                http_only: c.http_only,
                secure: c.secure,
            })
            .collect(),
    };
    state.save(state_path).await?;

    tracing::info!(cookies = state.cookies.len(), path = %state_path.display(), "Session saved");
    Ok(state.cookies.len())
}
