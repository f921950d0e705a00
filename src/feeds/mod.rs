//! Feed fetching, parsing, diffing and filtering.
//!
//! Everything in here works on a single feed and never touches the
//! scheduler; the per-tick orchestration lives in `services::rss`.

pub mod browser;
pub mod cursor;
pub mod extract;
pub mod fetcher;
pub mod filter;
pub mod normalize;

pub use browser::{BrowserHandle, BrowserSession, PageRenderer};
pub use cursor::{diff, CursorPolicy, FeedDiff};
pub use fetcher::{FeedFetcher, FeedSource, FetchStrategy};
pub use filter::{matches_keywords, KeywordSet};
pub use normalize::{normalize, FeedEntry, ParsedFeed};
