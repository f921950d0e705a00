//! One feed-check tick: fetch, diff, filter, deliver and persist per feed.

use futures::future::join_all;
use tracing::{debug, info, warn};

use super::delivery::render_feed_message;
use super::scheduler::SchedulerContext;
use crate::database::models::{KeywordKind, RssFeed, RssKeyword};
use crate::error::{FeedError, Result};
use crate::feeds::{diff, KeywordSet};
use crate::utils::logging::{
    log_database_error, log_database_operation, log_feed_event, log_feed_stage_error,
};

/// Outcome of checking a single feed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedReport {
    pub feed_id: i64,
    /// Entries sent to the chat.
    pub delivered: usize,
    /// New entries dropped by the keyword filter.
    pub filtered: usize,
    /// New entries whose delivery failed.
    pub failed: usize,
    /// The error that ended processing of this feed early, if any.
    pub error: Option<FeedError>,
}

impl FeedReport {
    fn new(feed_id: i64) -> Self {
        Self {
            feed_id,
            ..Default::default()
        }
    }

    fn failed_with(mut self, error: FeedError) -> Self {
        self.error = Some(error);
        self
    }
}

/// Check every subscribed feed once.
///
/// Feeds run in batches of `ctx.concurrency`; a batch finishes before the next
/// starts. Failures are confined to their feed. Errors returned here come
/// only from loading the feed or keyword lists. A tick that starts while the
/// previous one is still running is skipped and returns no reports.
pub async fn check_feeds(ctx: &SchedulerContext) -> Result<Vec<FeedReport>> {
    let Some(_guard) = ctx.begin_feed_tick() else {
        warn!("Previous feed check still running, skipping this tick");
        return Ok(Vec::new());
    };

    let feeds = RssFeed::list_all(&ctx.db).await.map_err(|e| {
        log_database_error("list", "rss_feeds", &e.to_string(), None);
        FeedError::from(e)
    })?;
    let keywords = load_keywords(ctx).await?;

    info!("Checking {} feeds", feeds.len());

    let mut reports = Vec::with_capacity(feeds.len());
    for batch in feeds.chunks(ctx.concurrency.max(1)) {
        let results = join_all(batch.iter().map(|feed| process_feed(ctx, feed, &keywords))).await;
        reports.extend(results);
    }

    let delivered: usize = reports.iter().map(|r| r.delivered).sum();
    let failed = reports.iter().filter(|r| r.error.is_some()).count();
    info!(
        "Feed check done: {} feeds, {} entries delivered, {} feeds failed",
        reports.len(),
        delivered,
        failed
    );

    Ok(reports)
}

async fn load_keywords(ctx: &SchedulerContext) -> Result<KeywordSet> {
    let include = RssKeyword::words(&ctx.db, KeywordKind::Include).await;
    let exclude = RssKeyword::words(&ctx.db, KeywordKind::Exclude).await;

    match (include, exclude) {
        (Ok(include), Ok(exclude)) => Ok(KeywordSet::merge(
            &ctx.static_include,
            &ctx.static_exclude,
            include,
            exclude,
        )),
        (Err(e), _) | (_, Err(e)) => {
            log_database_error("list", "rss_keywords", &e.to_string(), None);
            Err(e.into())
        }
    }
}

/// Run the whole pipeline for one feed. Never fails; problems are logged and
/// recorded in the report.
pub async fn process_feed(ctx: &SchedulerContext, feed: &RssFeed, keywords: &KeywordSet) -> FeedReport {
    let report = FeedReport::new(feed.id);
    let label = feed.display_title().to_string();

    let parsed = match ctx.source.fetch(&feed.url).await {
        Ok(parsed) => parsed,
        Err(e) => {
            log_feed_stage_error(&label, "fetch", &e.to_string());
            return report.failed_with(e);
        }
    };

    if parsed.entries.is_empty() {
        log_feed_event(&label, "no entries", None);
        return report;
    }

    let previous = feed.last_item_id.as_deref();
    let changes = diff(previous, &parsed.entries, &ctx.policy);

    match previous {
        None => log_feed_event(&label, "first check", Some("marking newest entries")),
        Some(cursor) if !parsed.entries.iter().any(|e| e.guid == cursor) => log_feed_event(
            &label,
            "cursor not found",
            Some(&format!("taking newest {}", changes.new_entries.len())),
        ),
        Some(_) if !changes.new_entries.is_empty() => log_feed_event(
            &label,
            "new entries",
            Some(&changes.new_entries.len().to_string()),
        ),
        Some(_) => debug!("No new entries for {}", label),
    }

    let feed_title = feed
        .title
        .as_deref()
        .filter(|t| !t.trim().is_empty())
        .or(Some(parsed.title.as_str()).filter(|t| !t.trim().is_empty()))
        .unwrap_or(&feed.url);

    let mut report = report;
    for entry in &changes.new_entries {
        if !ctx.is_running() {
            info!("Scheduler stopped, discarding remaining entries for {}", label);
            return report;
        }

        if keywords.accepts(&entry.title, &entry.content) {
            let text = render_feed_message(feed_title, entry);
            match ctx.sender.send_markdown(feed.chat_id, &text).await {
                Ok(()) => {
                    report.delivered += 1;
                    log_feed_event(&label, "delivered", Some(&entry.title));
                }
                Err(e) => {
                    report.failed += 1;
                    log_feed_stage_error(&label, "deliver", &e.to_string());
                }
            }
        } else {
            report.filtered += 1;
            log_feed_event(&label, "filtered by keywords", Some(&entry.title));
        }

        if let Err(e) = RssFeed::update_cursor(&ctx.db, feed.id, &entry.guid).await {
            log_database_error("update_cursor", "rss_feeds", &e.to_string(), Some(&label));
            return report.failed_with(e.into());
        }
    }

    if let Some(next) = changes.next_cursor.as_deref().filter(|_| changes.cursor_changed(previous)) {
        if let Err(e) = RssFeed::update_cursor(&ctx.db, feed.id, next).await {
            log_database_error("update_cursor", "rss_feeds", &e.to_string(), Some(&label));
            return report.failed_with(e.into());
        }
        log_database_operation("update_cursor", "rss_feeds", Some(&format!("{} -> {}", label, next)));
    }

    report
}
