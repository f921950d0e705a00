use sqlx::SqlitePool;
use thiserror::Error;
use tracing::info;

use crate::database::models::RssFeed;
use crate::error::FeedError;
use crate::feeds::FeedSource;

#[derive(Error, Debug)]
pub enum SubscribeError {
    #[error("{0} is already subscribed")]
    Duplicate(String),

    #[error("cannot read feed: {0}")]
    Fetch(#[from] FeedError),

    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

// Fetches once to validate the feed and learn its title. The cursor starts empty.
pub async fn subscribe(
    pool: &SqlitePool,
    source: &dyn FeedSource,
    user_id: i64,
    chat_id: i64,
    url: &str,
) -> Result<RssFeed, SubscribeError> {
    if RssFeed::find_by_url(pool, url).await?.is_some() {
        return Err(SubscribeError::Duplicate(url.to_string()));
    }

    let parsed = source.fetch(url).await?;
    let title = Some(parsed.title.trim())
        .filter(|t| !t.is_empty())
        .unwrap_or(url);

    match RssFeed::create(pool, user_id, chat_id, url, Some(title)).await {
        Ok(feed) => {
            info!(
                "Feed #{} subscribed: {} ({} entries available)",
                feed.id,
                url,
                parsed.entries.len()
            );
            Ok(feed)
        }
        Err(sqlx::Error::Database(db)) if db.message().contains("UNIQUE") => {
            Err(SubscribeError::Duplicate(url.to_string()))
        }
        Err(e) => Err(e.into()),
    }
}
