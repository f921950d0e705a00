use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

/// Whether a keyword selects entries or rejects them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeywordKind {
    Include,
    Exclude,
}

impl KeywordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeywordKind::Include => "include",
            KeywordKind::Exclude => "exclude",
        }
    }
}

impl fmt::Display for KeywordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeywordKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "include" => Ok(KeywordKind::Include),
            "exclude" => Ok(KeywordKind::Exclude),
            other => Err(format!("unknown keyword type: {}", other)),
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct RssKeyword {
    pub id: i64,
    pub keyword: String,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub kind: String,
}

impl RssKeyword {
    /// Add a keyword. Returns 1 when inserted, 0 when the pair already exists.
    pub async fn add(
        pool: &sqlx::SqlitePool,
        keyword: &str,
        kind: KeywordKind,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("INSERT OR IGNORE INTO rss_keywords (keyword, type) VALUES (?, ?)")
            .bind(keyword)
            .bind(kind.as_str())
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Remove a keyword. Returns the number of rows removed.
    pub async fn delete(
        pool: &sqlx::SqlitePool,
        keyword: &str,
        kind: KeywordKind,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM rss_keywords WHERE keyword = ? AND type = ?")
            .bind(keyword)
            .bind(kind.as_str())
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn list(pool: &sqlx::SqlitePool, kind: KeywordKind) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, RssKeyword>(
            "SELECT id, keyword, type FROM rss_keywords WHERE type = ? ORDER BY id"
        )
        .bind(kind.as_str())
        .fetch_all(pool)
        .await
    }

    /// Just the words of one kind.
    pub async fn words(pool: &sqlx::SqlitePool, kind: KeywordKind) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>("SELECT keyword FROM rss_keywords WHERE type = ? ORDER BY id")
            .bind(kind.as_str())
            .fetch_all(pool)
            .await
    }
}
