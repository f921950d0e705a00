use crate::config::DEFAULT_RSS_INTERVAL;

const RSS_INTERVAL_KEY: &str = "rss_interval";

/// Smallest and largest accepted feed check interval, in minutes.
pub const MIN_RSS_INTERVAL: u32 = 1;
pub const MAX_RSS_INTERVAL: u32 = 1440;

/// Key/value settings persisted across restarts.
pub struct Setting;

impl Setting {
    pub async fn get(pool: &sqlx::SqlitePool, key: &str) -> Result<Option<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(pool)
            .await
    }

    pub async fn set(pool: &sqlx::SqlitePool, key: &str, value: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO settings (key, value) VALUES (?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value"
        )
        .bind(key)
        .bind(value)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// The stored feed check interval, if one was set and is usable.
    pub async fn rss_interval(pool: &sqlx::SqlitePool) -> Result<Option<u32>, sqlx::Error> {
        let stored = Self::get(pool, RSS_INTERVAL_KEY).await?;
        Ok(stored
            .and_then(|raw| raw.trim().parse::<u32>().ok())
            .filter(|m| (MIN_RSS_INTERVAL..=MAX_RSS_INTERVAL).contains(m)))
    }

    /// Interval to schedule with: stored value, else `fallback`, else the default.
    pub async fn effective_rss_interval(
        pool: &sqlx::SqlitePool,
        fallback: u32,
    ) -> Result<u32, sqlx::Error> {
        let fallback = if fallback == 0 { DEFAULT_RSS_INTERVAL } else { fallback };
        Ok(Self::rss_interval(pool).await?.unwrap_or(fallback))
    }

    /// Store a new interval. Takes effect on the next start.
    pub async fn set_rss_interval(pool: &sqlx::SqlitePool, minutes: u32) -> Result<(), sqlx::Error> {
        Self::set(pool, RSS_INTERVAL_KEY, &minutes.to_string()).await
    }
}
