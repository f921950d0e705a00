use anyhow::{anyhow, Result};
use url::Url;

use crate::database::models::{MAX_RSS_INTERVAL, MIN_RSS_INTERVAL};

const MAX_URL_LENGTH: usize = 2048;
const MAX_KEYWORD_LENGTH: usize = 100;
const MAX_KEYWORDS_PER_COMMAND: usize = 50;
const MAX_REMINDER_LENGTH: usize = 1000;

/// Check that a feed URL is an absolute http(s) URL with a host.
pub fn validate_feed_url(url: &str) -> Result<String> {
    let url = url.trim();

    if url.is_empty() {
        return Err(anyhow!("Feed URL cannot be empty"));
    }

    if url.len() > MAX_URL_LENGTH {
        return Err(anyhow!("Feed URL cannot be longer than {} characters", MAX_URL_LENGTH));
    }

    let parsed = Url::parse(url).map_err(|e| anyhow!("Invalid feed URL: {}", e))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(anyhow!("Feed URL must start with http:// or https://"));
    }

    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(anyhow!("Feed URL must include a host"));
    }

    Ok(url.to_string())
}

/// Parse a check interval in minutes (1 to 1440).
pub fn validate_rss_interval(raw: &str) -> Result<u32> {
    let minutes: u32 = raw
        .trim()
        .parse()
        .map_err(|_| anyhow!("Interval must be a whole number of minutes"))?;

    if !(MIN_RSS_INTERVAL..=MAX_RSS_INTERVAL).contains(&minutes) {
        return Err(anyhow!(
            "Interval must be between {} and {} minutes",
            MIN_RSS_INTERVAL,
            MAX_RSS_INTERVAL
        ));
    }

    Ok(minutes)
}

/// Split a comma separated keyword list, trimming and dropping blanks.
pub fn parse_keyword_list(input: &str) -> Result<Vec<String>> {
    let words: Vec<String> = input
        .split(',')
        .map(|w| w.trim().to_string())
        .filter(|w| !w.is_empty())
        .collect();

    if words.is_empty() {
        return Err(anyhow!("Provide at least one keyword"));
    }

    if words.len() > MAX_KEYWORDS_PER_COMMAND {
        return Err(anyhow!(
            "Cannot add more than {} keywords at once",
            MAX_KEYWORDS_PER_COMMAND
        ));
    }

    if let Some(long) = words.iter().find(|w| w.chars().count() > MAX_KEYWORD_LENGTH) {
        return Err(anyhow!(
            "Keyword '{}...' is too long (max {} characters)",
            long.chars().take(20).collect::<String>(),
            MAX_KEYWORD_LENGTH
        ));
    }

    Ok(words)
}

/// Parse a positive numeric id such as a feed or reminder id.
pub fn parse_id(raw: &str) -> Result<i64> {
    match raw.trim().trim_start_matches('#').parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(anyhow!("'{}' is not a valid id", raw.trim())),
    }
}

pub fn validate_reminder_text(text: &str) -> Result<()> {
    let text = text.trim();

    if text.is_empty() {
        return Err(anyhow!("Reminder text cannot be empty"));
    }

    if text.chars().count() > MAX_REMINDER_LENGTH {
        return Err(anyhow!(
            "Reminder text cannot be longer than {} characters",
            MAX_REMINDER_LENGTH
        ));
    }

    Ok(())
}

/// Check a cookie domain: a bare hostname without scheme, path or port.
pub fn validate_cookie_domain(domain: &str) -> Result<String> {
    let domain = domain.trim().trim_start_matches('.').to_lowercase();

    if domain.is_empty() {
        return Err(anyhow!("Domain cannot be empty"));
    }

    if domain.contains("://") || domain.contains('/') || domain.contains(':') {
        return Err(anyhow!("Give a bare domain such as example.com"));
    }

    if !domain
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
    {
        return Err(anyhow!("Domain contains invalid characters"));
    }

    Ok(domain)
}

pub fn validate_telegram_chat_id(chat_id: i64) -> Result<()> {
    if chat_id == 0 {
        return Err(anyhow!("Chat ID cannot be zero"));
    }

    // User ids fit in 32 bits
    if chat_id > 2147483647 {
        return Err(anyhow!("Invalid user chat ID range"));
    }

    // Supergroups and channels use -100xxxxxxxxxx
    if chat_id < -2000000000000 {
        return Err(anyhow!("Chat ID out of valid range"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_feed_url_valid() {
        assert_eq!(
            validate_feed_url("  https://example.com/feed.xml  ").unwrap(),
            "https://example.com/feed.xml"
        );
        assert!(validate_feed_url("http://blog.example.org/rss?format=atom").is_ok());
    }

    #[test]
    fn test_validate_feed_url_invalid() {
        assert!(validate_feed_url("").is_err());
        assert!(validate_feed_url("example.com/feed").is_err());
        assert!(validate_feed_url("ftp://example.com/feed").is_err());
        assert!(validate_feed_url("file:///etc/passwd").is_err());
        let long = format!("https://example.com/{}", "a".repeat(MAX_URL_LENGTH));
        assert!(validate_feed_url(&long).is_err());
    }

    #[test]
    fn test_validate_rss_interval() {
        assert_eq!(validate_rss_interval("30").unwrap(), 30);
        assert_eq!(validate_rss_interval(" 1 ").unwrap(), 1);
        assert_eq!(validate_rss_interval("1440").unwrap(), 1440);
        assert!(validate_rss_interval("0").is_err());
        assert!(validate_rss_interval("1441").is_err());
        assert!(validate_rss_interval("-5").is_err());
        assert!(validate_rss_interval("ten").is_err());
    }

    #[test]
    fn test_parse_keyword_list() {
        assert_eq!(
            parse_keyword_list(" rust, tokio ,, async ").unwrap(),
            vec!["rust", "tokio", "async"]
        );
        assert_eq!(parse_keyword_list("machine learning").unwrap(), vec!["machine learning"]);
        assert!(parse_keyword_list("").is_err());
        assert!(parse_keyword_list(" , ,").is_err());
        assert!(parse_keyword_list(&"x".repeat(MAX_KEYWORD_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id("42").unwrap(), 42);
        assert_eq!(parse_id("#7").unwrap(), 7);
        assert!(parse_id("0").is_err());
        assert!(parse_id("-3").is_err());
        assert!(parse_id("abc").is_err());
        assert!(parse_id("").is_err());
    }

    #[test]
    fn test_validate_reminder_text() {
        assert!(validate_reminder_text("Stand-up meeting").is_ok());
        assert!(validate_reminder_text("   ").is_err());
        assert!(validate_reminder_text(&"a".repeat(MAX_REMINDER_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_validate_cookie_domain() {
        assert_eq!(validate_cookie_domain(" .Example.COM ").unwrap(), "example.com");
        assert!(validate_cookie_domain("https://example.com").is_err());
        assert!(validate_cookie_domain("example.com/path").is_err());
        assert!(validate_cookie_domain("example.com:8080").is_err());
        assert!(validate_cookie_domain("exa mple.com").is_err());
        assert!(validate_cookie_domain("").is_err());
    }

    #[test]
    fn test_validate_telegram_chat_id() {
        assert!(validate_telegram_chat_id(12345).is_ok());
        assert!(validate_telegram_chat_id(-12345).is_ok());
        assert!(validate_telegram_chat_id(-1001234567890).is_ok());
        assert!(validate_telegram_chat_id(0).is_err());
        assert!(validate_telegram_chat_id(-3000000000000).is_err());
        assert!(validate_telegram_chat_id(3000000000).is_err());
    }
}
