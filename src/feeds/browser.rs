//! Headless Chromium used to get past anti-bot interstitials.

use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{
    CookieParam, Headers, SetCookiesParams, SetExtraHttpHeadersParams,
};
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::extract::is_challenge_page;
use super::fetcher::BROWSER_USER_AGENT;
use crate::error::{FeedError, Result};
use crate::utils::logging::log_timeout;

/// Overall budget for one render, challenge wait included.
pub const RENDER_TIMEOUT: Duration = Duration::from_secs(30);
const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(20);
const CHALLENGE_POLL_INTERVAL: Duration = Duration::from_secs(3);
const CHALLENGE_MAX_ATTEMPTS: u32 = 5;
const SETTLE_DELAY: Duration = Duration::from_secs(1);

const CHROMIUM_ARGS: [&str; 12] = [
    "--disable-dev-shm-usage",
    "--disable-gpu",
    "--disable-software-rasterizer",
    "--no-zygote",
    "--disable-extensions",
    "--disable-background-networking",
    "--disable-default-apps",
    "--disable-sync",
    "--disable-translate",
    "--hide-scrollbars",
    "--mute-audio",
    "--no-first-run",
];

/// Cookies and User-Agent captured from a real browser for one domain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BrowserSession {
    pub cookies: Vec<(String, String)>,
    /// Overrides the default browser User-Agent when set.
    pub user_agent: Option<String>,
}

/// Something that can load a URL in a real browser and return the final HTML.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    async fn render(&self, url: &str, session: Option<&BrowserSession>) -> Result<String>;
}

struct RunningBrowser {
    browser: Browser,
    handler: JoinHandle<()>,
}

/// Lazily launched Chromium shared by every render in the process.
///
/// The browser starts on the first render and is reused afterwards; it is
/// relaunched if its connection has gone away. Each render gets its own page,
/// which is closed whether or not the render succeeded.
pub struct BrowserHandle {
    chromium_path: String,
    inner: Mutex<Option<RunningBrowser>>,
}

impl BrowserHandle {
    pub fn new(chromium_path: impl Into<String>) -> Self {
        Self {
            chromium_path: chromium_path.into(),
            inner: Mutex::new(None),
        }
    }

    /// Open a fresh page, launching the browser first if needed.
    pub async fn acquire(&self) -> Result<Page> {
        let mut guard = self.inner.lock().await;

        if guard.as_ref().is_some_and(|running| running.handler.is_finished()) {
            warn!("Headless browser connection lost, relaunching");
            *guard = None;
        }

        if guard.is_none() {
            *guard = Some(self.launch().await?);
        }

        match guard.as_ref() {
            Some(running) => Ok(running.browser.new_page("about:blank").await?),
            None => Err(FeedError::Browser("browser not running".to_string())),
        }
    }

    /// Close a page obtained from [`acquire`](Self::acquire).
    pub async fn release(&self, page: Page) {
        if let Err(e) = page.close().await {
            debug!("Failed to close browser page: {}", e);
        }
    }

    /// Close the browser if it was ever started.
    pub async fn shutdown(&self) {
        let running = self.inner.lock().await.take();
        if let Some(mut running) = running {
            info!("Closing headless browser");
            if let Err(e) = running.browser.close().await {
                warn!("Failed to close headless browser: {}", e);
            }
            let _ = running.browser.wait().await;
            running.handler.abort();
        }
    }

    async fn launch(&self) -> Result<RunningBrowser> {
        info!("Launching headless browser ({})", self.chromium_path);

        let config = BrowserConfig::builder()
            .chrome_executable(&self.chromium_path)
            .new_headless_mode()
            .no_sandbox()
            .launch_timeout(RENDER_TIMEOUT)
            .args(CHROMIUM_ARGS)
            .build()
            .map_err(FeedError::Browser)?;

        let (browser, mut handler) = Browser::launch(config).await?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        info!("Headless browser started");
        Ok(RunningBrowser { browser, handler })
    }
}

#[async_trait]
impl PageRenderer for BrowserHandle {
    async fn render(&self, url: &str, session: Option<&BrowserSession>) -> Result<String> {
        let page = self.acquire().await?;

        let result = match tokio::time::timeout(RENDER_TIMEOUT, drive(&page, url, session)).await {
            Ok(result) => result,
            Err(_) => {
                log_timeout("render", RENDER_TIMEOUT.as_secs(), Some(url));
                Err(FeedError::Timeout(RENDER_TIMEOUT.as_secs()))
            }
        };

        self.release(page).await;
        result
    }
}

async fn drive(page: &Page, url: &str, session: Option<&BrowserSession>) -> Result<String> {
    let user_agent = session
        .and_then(|s| s.user_agent.as_deref())
        .unwrap_or(BROWSER_USER_AGENT);
    page.set_user_agent(user_agent).await?;
    page.execute(SetExtraHttpHeadersParams::new(Headers::new(
        serde_json::json!({ "Accept-Language": "en-US,en;q=0.9" }),
    )))
    .await?;

    if let Some(session) = session.filter(|s| !s.cookies.is_empty()) {
        let cookies = session
            .cookies
            .iter()
            .map(|(name, value)| {
                let mut cookie = CookieParam::new(name.clone(), value.clone());
                cookie.url = Some(url.to_string());
                cookie
            })
            .collect();
        page.execute(SetCookiesParams::new(cookies)).await?;
        debug!("Primed browser with {} cookies for {}", session.cookies.len(), url);
    }

    tokio::time::timeout(NAVIGATION_TIMEOUT, page.goto(url))
        .await
        .map_err(|_| FeedError::Timeout(NAVIGATION_TIMEOUT.as_secs()))??;

    for attempt in 1..=CHALLENGE_MAX_ATTEMPTS {
        let html = page.content().await?;
        if !is_challenge_page(&html) {
            break;
        }
        info!(
            "Challenge page detected for {}, waiting ({}/{})",
            url, attempt, CHALLENGE_MAX_ATTEMPTS
        );
        tokio::time::sleep(CHALLENGE_POLL_INTERVAL).await;
    }

    tokio::time::sleep(SETTLE_DELAY).await;

    let html = page.content().await?;
    debug!("Rendered {} ({} chars)", url, html.len());
    Ok(html)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_shutdown_without_launch_is_noop() {
        let handle = BrowserHandle::new("/nonexistent/chromium");
        handle.shutdown().await;
        assert!(handle.inner.lock().await.is_none());
    }

    #[tokio::test]
    async fn test_missing_executable_is_browser_error() {
        let handle = BrowserHandle::new("/nonexistent/chromium-for-tests");
        let err = handle.render("https://example.com/feed", None).await.unwrap_err();
        assert!(matches!(err, FeedError::Browser(_)));
        assert!(handle.inner.lock().await.is_none());
    }
}
