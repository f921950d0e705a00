//! Error types for the feed pipeline.

use thiserror::Error;

use crate::feeds::fetcher::FETCH_TIMEOUT;

/// Failure of a single feed's pipeline stage.
///
/// Every variant is recoverable: the feed is skipped for the current tick
/// (or, for delivery, the entry is skipped) and the scheduler carries on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FeedError {
    /// The server refused the request with 403 Forbidden.
    #[error("HTTP 403 Forbidden")]
    Forbidden,

    /// Any other non-success HTTP status.
    #[error("HTTP {0}")]
    Http(u16),

    /// Connection or transport failure.
    #[error("network error: {0}")]
    Network(String),

    /// The stage did not finish within its time budget.
    #[error("timed out after {0}s")]
    Timeout(u64),

    /// The rendered page did not contain a feed document.
    #[error("cannot extract XML from page")]
    Extract,

    /// The document is not a valid RSS/Atom feed.
    #[error("parse error: {0}")]
    Parse(String),

    /// The headless browser could not be started or driven.
    #[error("browser error: {0}")]
    Browser(String),

    /// Sending a message to the target chat failed.
    #[error("delivery error: {0}")]
    Delivery(String),

    /// Reading or writing the database failed.
    #[error("storage error: {0}")]
    Storage(String),
}

impl FeedError {
    /// Whether this failure means the site is blocking plain HTTP clients.
    pub fn is_forbidden(&self) -> bool {
        matches!(self, FeedError::Forbidden)
    }
}

impl From<sqlx::Error> for FeedError {
    fn from(e: sqlx::Error) -> Self {
        FeedError::Storage(e.to_string())
    }
}

impl From<reqwest::Error> for FeedError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            return FeedError::Timeout(FETCH_TIMEOUT.as_secs());
        }
        match e.status() {
            Some(status) if status.as_u16() == 403 => FeedError::Forbidden,
            Some(status) => FeedError::Http(status.as_u16()),
            None => FeedError::Network(e.to_string()),
        }
    }
}

impl From<chromiumoxide::error::CdpError> for FeedError {
    fn from(e: chromiumoxide::error::CdpError) -> Self {
        FeedError::Browser(e.to_string())
    }
}

/// Result type alias for feed pipeline operations.
pub type Result<T> = std::result::Result<T, FeedError>;
