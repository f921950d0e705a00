use anyhow::{anyhow, Result};
use std::env;

const DEFAULT_DATABASE_URL: &str = "sqlite:./data/feedbot.db";
const DEFAULT_CHROMIUM_PATH: &str = "/usr/bin/chromium";

/// Default feed check interval in minutes when nothing is stored in settings.
pub const DEFAULT_RSS_INTERVAL: u32 = 30;

/// Default number of feeds processed concurrently per batch.
pub const DEFAULT_RSS_CONCURRENCY: usize = 3;

#[derive(Debug, Clone)]
pub struct Config {
    pub telegram_bot_token: String,
    pub database_url: String,
    pub http_port: u16,
    pub tg_api_base: Option<String>,
    pub admin_chat_id: Option<i64>,
    pub admin_api_token: Option<String>,
    pub rss_check_interval: u32,
    pub rss_keywords: Vec<String>,
    pub rss_exclude: Vec<String>,
    pub rss_concurrency: usize,
    pub chromium_path: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let token = env::var("TELEGRAM_BOT_TOKEN")
            .map_err(|_| anyhow!("TELEGRAM_BOT_TOKEN must be set"))?;

        if token.trim().is_empty() {
            return Err(anyhow!("TELEGRAM_BOT_TOKEN must be set"));
        }

        let database_url = database_url_from_env();

        let port_str = env::var("HTTP_PORT").unwrap_or_else(|_| "3000".to_string());
        let http_port = port_str
            .trim()
            .parse()
            .map_err(|_| anyhow!("Invalid HTTP_PORT"))?;

        let admin_chat_id = match non_empty_var("ADMIN_CHAT_ID") {
            Some(raw) => Some(
                raw.trim()
                    .parse::<i64>()
                    .map_err(|_| anyhow!("Invalid ADMIN_CHAT_ID"))?,
            ),
            None => None,
        };

        let rss_check_interval = match non_empty_var("RSS_CHECK_INTERVAL") {
            Some(raw) => {
                let minutes = raw
                    .trim()
                    .parse::<u32>()
                    .map_err(|_| anyhow!("Invalid RSS_CHECK_INTERVAL"))?;
                if minutes == 0 {
                    return Err(anyhow!("Invalid RSS_CHECK_INTERVAL"));
                }
                minutes
            }
            None => DEFAULT_RSS_INTERVAL,
        };

        let rss_concurrency = match non_empty_var("RSS_CONCURRENCY") {
            Some(raw) => {
                let value = raw
                    .trim()
                    .parse::<usize>()
                    .map_err(|_| anyhow!("Invalid RSS_CONCURRENCY"))?;
                if value == 0 {
                    return Err(anyhow!("Invalid RSS_CONCURRENCY"));
                }
                value
            }
            None => DEFAULT_RSS_CONCURRENCY,
        };

        Ok(Config {
            telegram_bot_token: token,
            database_url,
            http_port,
            tg_api_base: non_empty_var("TG_API_BASE"),
            admin_chat_id,
            admin_api_token: non_empty_var("ADMIN_API_TOKEN"),
            rss_check_interval,
            rss_keywords: split_list(&env::var("RSS_KEYWORDS").unwrap_or_default()),
            rss_exclude: split_list(&env::var("RSS_EXCLUDE").unwrap_or_default()),
            rss_concurrency,
            chromium_path: non_empty_var("CHROMIUM_PATH")
                .unwrap_or_else(|| DEFAULT_CHROMIUM_PATH.to_string()),
        })
    }
}

/// `DATABASE_URL`, or the default path. Needs no other variable, so tools
/// that only touch the database can use it.
pub fn database_url_from_env() -> String {
    non_empty_var("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string())
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

/// Splits a comma separated list, dropping blank items.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|item| item.trim())
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}
