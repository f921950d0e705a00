//! Escalating fetch strategies and the combinator that runs them.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use sqlx::SqlitePool;
use tracing::{debug, info};

use super::browser::{BrowserSession, PageRenderer};
use super::extract::{clean_feed_text, extract_xml_content};
use super::normalize::{normalize, ParsedFeed};
use crate::database::models::RssCookie;
use crate::error::{FeedError, Result};
use crate::utils::logging::log_feed_stage_error;

/// User-Agent sent by every stage, matching a desktop Chrome.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Timeout for the plain HTTP stages.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(15);

const FEED_ACCEPT: &str = "application/rss+xml, application/xml, text/xml, */*";
const FEED_ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";

/// Anything that can turn a feed URL into parsed entries.
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<ParsedFeed>;
}

/// One named way of obtaining a feed.
#[async_trait]
pub trait FetchStrategy: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Whether this strategy can get past a 403. Earlier strategies that see a
    /// 403 skip straight to the first strategy that returns true here.
    fn bypasses_forbidden(&self) -> bool {
        false
    }

    async fn fetch(&self, url: &str) -> Result<ParsedFeed>;
}

/// Build the shared HTTP client with browser-like headers.
pub fn http_client() -> Result<reqwest::Client> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
    headers.insert(ACCEPT, HeaderValue::from_static(FEED_ACCEPT));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(FEED_ACCEPT_LANGUAGE));

    reqwest::Client::builder()
        .default_headers(headers)
        .timeout(FETCH_TIMEOUT)
        .build()
        .map_err(|e| FeedError::Network(e.to_string()))
}

async fn get_checked(client: &reqwest::Client, url: &str) -> Result<reqwest::Response> {
    let response = client.get(url).send().await?;
    let status = response.status();
    if status == reqwest::StatusCode::FORBIDDEN {
        return Err(FeedError::Forbidden);
    }
    if !status.is_success() {
        return Err(FeedError::Http(status.as_u16()));
    }
    Ok(response)
}

/// Stage 1: fetch and hand the raw bytes to the parser.
pub struct DirectStrategy {
    client: reqwest::Client,
}

impl DirectStrategy {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl FetchStrategy for DirectStrategy {
    fn name(&self) -> &'static str {
        "direct"
    }

    async fn fetch(&self, url: &str) -> Result<ParsedFeed> {
        let bytes = get_checked(&self.client, url).await?.bytes().await?;
        normalize(&bytes)
    }
}

/// Stage 2: fetch as text and clean up BOMs and leading junk before parsing.
pub struct ManualStrategy {
    client: reqwest::Client,
}

impl ManualStrategy {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl FetchStrategy for ManualStrategy {
    fn name(&self) -> &'static str {
        "manual"
    }

    async fn fetch(&self, url: &str) -> Result<ParsedFeed> {
        let text = get_checked(&self.client, url).await?.text().await?;
        normalize(clean_feed_text(&text).as_bytes())
    }
}

/// Stage 3: render the page in a headless browser and extract the feed XML.
pub struct RenderStrategy {
    renderer: Arc<dyn PageRenderer>,
    cookies: Option<SqlitePool>,
}

impl RenderStrategy {
    /// `cookies` enables priming the browser with stored per-domain cookies.
    pub fn new(renderer: Arc<dyn PageRenderer>, cookies: Option<SqlitePool>) -> Self {
        Self { renderer, cookies }
    }

    async fn session_for(&self, url: &str) -> Option<BrowserSession> {
        let pool = self.cookies.as_ref()?;
        match RssCookie::find_for_url(pool, url).await {
            Ok(Some(cookie)) => {
                debug!("Using stored cookies of {} for {}", cookie.domain, url);
                Some(BrowserSession {
                    cookies: cookie.pairs(),
                    user_agent: Some(cookie.user_agent).filter(|ua| !ua.trim().is_empty()),
                })
            }
            Ok(None) => None,
            Err(e) => {
                log_feed_stage_error(url, "cookie lookup", &e.to_string());
                None
            }
        }
    }
}

#[async_trait]
impl FetchStrategy for RenderStrategy {
    fn name(&self) -> &'static str {
        "render"
    }

    fn bypasses_forbidden(&self) -> bool {
        true
    }

    async fn fetch(&self, url: &str) -> Result<ParsedFeed> {
        let session = self.session_for(url).await;
        let html = self.renderer.render(url, session.as_ref()).await?;
        let xml = extract_xml_content(&html).ok_or(FeedError::Extract)?;
        debug!("Extracted {} chars of XML from rendered {}", xml.len(), url);
        normalize(xml.as_bytes())
    }
}

/// Tries each strategy in order and returns the first success.
///
/// A 403 from any stage jumps ahead to the next strategy that can bypass it.
/// When everything fails the last stage's error is returned; every stage's
/// reason is logged.
pub struct FeedFetcher {
    strategies: Vec<Box<dyn FetchStrategy>>,
}

impl FeedFetcher {
    pub fn new(strategies: Vec<Box<dyn FetchStrategy>>) -> Self {
        Self { strategies }
    }

    /// The standard direct → manual → render chain.
    pub fn standard(renderer: Arc<dyn PageRenderer>, cookies: Option<SqlitePool>) -> Result<Self> {
        let client = http_client()?;
        Ok(Self::new(vec![
            Box::new(DirectStrategy::new(client.clone())),
            Box::new(ManualStrategy::new(client)),
            Box::new(RenderStrategy::new(renderer, cookies)),
        ]))
    }

    /// Names of the configured strategies, in order.
    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }
}

#[async_trait]
impl FeedSource for FeedFetcher {
    async fn fetch(&self, url: &str) -> Result<ParsedFeed> {
        let mut last_error = FeedError::Network("no fetch strategy configured".to_string());
        let mut skip_to_bypass = false;

        for (stage, strategy) in self.strategies.iter().enumerate() {
            if skip_to_bypass && !strategy.bypasses_forbidden() {
                debug!("Skipping {} stage for {} after 403", strategy.name(), url);
                continue;
            }

            match strategy.fetch(url).await {
                Ok(feed) => {
                    if stage > 0 {
                        info!("Fetched {} via {} stage", url, strategy.name());
                    }
                    return Ok(feed);
                }
                Err(e) => {
                    log_feed_stage_error(url, strategy.name(), &e.to_string());
                    skip_to_bypass = e.is_forbidden();
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }
}
