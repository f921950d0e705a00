use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A feed subscription. `last_item_id` is the cursor: the identifier of the
/// newest entry already processed, or `None` before the first check.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq, Eq)]
pub struct RssFeed {
    pub id: i64,
    pub user_id: i64,
    pub chat_id: i64,
    pub url: String,
    pub title: Option<String>,
    pub last_item_id: Option<String>,
    pub created_at: i64,
}

const FEED_COLUMNS: &str = "id, user_id, chat_id, url, title, last_item_id, created_at";

impl RssFeed {
    /// Title for messages and logs, falling back to the URL.
    pub fn display_title(&self) -> &str {
        self.title
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(&self.url)
    }

    /// Insert a subscription. Fails with a unique violation if the URL is
    /// already subscribed.
    pub async fn create(
        pool: &sqlx::SqlitePool,
        user_id: i64,
        chat_id: i64,
        url: &str,
        title: Option<&str>,
    ) -> Result<Self, sqlx::Error> {
        let id = sqlx::query(
            "INSERT INTO rss_feeds (user_id, chat_id, url, title) VALUES (?, ?, ?, ?)"
        )
        .bind(user_id)
        .bind(chat_id)
        .bind(url)
        .bind(title)
        .execute(pool)
        .await?
        .last_insert_rowid();

        Self::find_by_id(pool, id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn find_by_id(pool: &sqlx::SqlitePool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, RssFeed>(&format!("SELECT {} FROM rss_feeds WHERE id = ?", FEED_COLUMNS))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_url(pool: &sqlx::SqlitePool, url: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, RssFeed>(&format!("SELECT {} FROM rss_feeds WHERE url = ?", FEED_COLUMNS))
            .bind(url)
            .fetch_optional(pool)
            .await
    }

    pub async fn list_by_owner(pool: &sqlx::SqlitePool, user_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, RssFeed>(&format!(
            "SELECT {} FROM rss_feeds WHERE user_id = ? ORDER BY id",
            FEED_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    pub async fn list_all(pool: &sqlx::SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, RssFeed>(&format!("SELECT {} FROM rss_feeds ORDER BY id", FEED_COLUMNS))
            .fetch_all(pool)
            .await
    }

    /// Persist a new cursor. The only writer is the scheduler, so no
    /// compare-and-set is needed.
    pub async fn update_cursor(
        pool: &sqlx::SqlitePool,
        id: i64,
        last_item_id: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE rss_feeds SET last_item_id = ? WHERE id = ?")
            .bind(last_item_id)
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Delete a subscription owned by `user_id`; returns the number of rows removed.
    pub async fn delete_owned(
        pool: &sqlx::SqlitePool,
        id: i64,
        user_id: i64,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM rss_feeds WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Delete a subscription regardless of owner.
    pub async fn delete_by_id(pool: &sqlx::SqlitePool, id: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM rss_feeds WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
