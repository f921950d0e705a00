use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Browser cookies captured for a domain, replayed by the render fetcher.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq, Eq)]
pub struct RssCookie {
    pub id: i64,
    pub domain: String,
    pub cookie_string: String,
    pub user_agent: String,
    pub created_at: i64,
    pub updated_at: i64,
}

const COOKIE_COLUMNS: &str = "id, domain, cookie_string, user_agent, created_at, updated_at";

impl RssCookie {
    /// Insert or replace the cookies for `domain`.
    pub async fn set(
        pool: &sqlx::SqlitePool,
        domain: &str,
        cookie_string: &str,
        user_agent: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO rss_cookies (domain, cookie_string, user_agent) VALUES (?, ?, ?)
             ON CONFLICT(domain) DO UPDATE SET
                cookie_string = excluded.cookie_string,
                user_agent = excluded.user_agent,
                updated_at = strftime('%s', 'now')"
        )
        .bind(domain.trim().to_lowercase())
        .bind(cookie_string)
        .bind(user_agent)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn get(pool: &sqlx::SqlitePool, domain: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, RssCookie>(&format!(
            "SELECT {} FROM rss_cookies WHERE domain = ?",
            COOKIE_COLUMNS
        ))
        .bind(domain.trim().to_lowercase())
        .fetch_optional(pool)
        .await
    }

    /// Find cookies for a feed URL: the exact hostname, then the hostname
    /// without `www.`, then any stored domain the root domain is a suffix of.
    pub async fn find_for_url(pool: &sqlx::SqlitePool, url: &str) -> Result<Option<Self>, sqlx::Error> {
        let Some(host) = url::Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_lowercase))
        else {
            return Ok(None);
        };

        if let Some(found) = Self::get(pool, &host).await? {
            return Ok(Some(found));
        }

        let bare = host.strip_prefix("www.").unwrap_or(&host);
        if bare != host {
            if let Some(found) = Self::get(pool, bare).await? {
                return Ok(Some(found));
            }
        }

        let root = root_domain(bare);
        sqlx::query_as::<_, RssCookie>(&format!(
            "SELECT {} FROM rss_cookies WHERE domain = ? OR domain LIKE ? ORDER BY length(domain) LIMIT 1",
            COOKIE_COLUMNS
        ))
        .bind(root)
        .bind(format!("%.{}", root))
        .fetch_optional(pool)
        .await
    }

    pub async fn list(pool: &sqlx::SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, RssCookie>(&format!("SELECT {} FROM rss_cookies ORDER BY domain", COOKIE_COLUMNS))
            .fetch_all(pool)
            .await
    }

    pub async fn delete(pool: &sqlx::SqlitePool, domain: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM rss_cookies WHERE domain = ?")
            .bind(domain.trim().to_lowercase())
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// The stored cookie string as name/value pairs.
    pub fn pairs(&self) -> Vec<(String, String)> {
        parse_cookie_string(&self.cookie_string)
    }
}

/// Last two labels of a hostname (`feeds.example.com` -> `example.com`).
pub fn root_domain(host: &str) -> &str {
    let mut dots = host.rmatch_indices('.');
    match (dots.next(), dots.next()) {
        (Some(_), Some((second, _))) => &host[second + 1..],
        _ => host,
    }
}

/// Split a `Cookie:` header value (`a=1; b=2`) into pairs, skipping malformed parts.
pub fn parse_cookie_string(raw: &str) -> Vec<(String, String)> {
    raw.split(';')
        .filter_map(|part| {
            let (name, value) = part.split_once('=')?;
            let name = name.trim();
            (!name.is_empty()).then(|| (name.to_string(), value.trim().to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cookie_string() {
        let pairs = parse_cookie_string("cf_clearance=abc=; session=42 ;  broken; =x");
        assert_eq!(
            pairs,
            vec![
                ("cf_clearance".to_string(), "abc=".to_string()),
                ("session".to_string(), "42".to_string()),
            ]
        );
        assert!(parse_cookie_string("").is_empty());
    }

    #[test]
    fn test_root_domain() {
        assert_eq!(root_domain("feeds.example.com"), "example.com");
        assert_eq!(root_domain("a.b.example.org"), "example.org");
        assert_eq!(root_domain("example.com"), "example.com");
        assert_eq!(root_domain("localhost"), "localhost");
    }
}
