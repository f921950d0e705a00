//! Periodic jobs: feed checks and reminder delivery.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use sqlx::SqlitePool;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, warn};

use super::alert::AlertService;
use super::delivery::MessageSender;
use super::reminder::deliver_due_reminders;
use super::rss::check_feeds;
use crate::config::{DEFAULT_RSS_CONCURRENCY, DEFAULT_RSS_INTERVAL};
use crate::database::models::Setting;
use crate::feeds::{CursorPolicy, FeedSource};
use crate::utils::logging::log_system_event;

/// Reminder scan schedule: second 0 of every minute.
const REMINDER_SCHEDULE: &str = "0 * * * * *";

/// Everything a scheduler tick needs, shared by both jobs.
pub struct SchedulerContext {
    pub db: SqlitePool,
    pub sender: Arc<dyn MessageSender>,
    pub source: Arc<dyn FeedSource>,
    pub static_include: Vec<String>,
    pub static_exclude: Vec<String>,
    pub policy: CursorPolicy,
    /// Feeds processed concurrently per batch.
    pub concurrency: usize,
    /// Interval used when no interval is stored in settings.
    pub default_interval: u32,
    /// Receives tick-level failures.
    pub alerts: Option<Arc<AlertService>>,
    running: AtomicBool,
    feed_tick_busy: AtomicBool,
    reminder_tick_busy: AtomicBool,
}

impl SchedulerContext {
    pub fn new(db: SqlitePool, sender: Arc<dyn MessageSender>, source: Arc<dyn FeedSource>) -> Self {
        Self {
            db,
            sender,
            source,
            static_include: Vec::new(),
            static_exclude: Vec::new(),
            policy: CursorPolicy::default(),
            concurrency: DEFAULT_RSS_CONCURRENCY,
            default_interval: DEFAULT_RSS_INTERVAL,
            alerts: None,
            running: AtomicBool::new(true),
            feed_tick_busy: AtomicBool::new(false),
            reminder_tick_busy: AtomicBool::new(false),
        }
    }

    pub fn with_keywords(mut self, include: Vec<String>, exclude: Vec<String>) -> Self {
        self.static_include = include;
        self.static_exclude = exclude;
        self
    }

    pub fn with_policy(mut self, policy: CursorPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_default_interval(mut self, minutes: u32) -> Self {
        self.default_interval = minutes;
        self
    }

    pub fn with_alerts(mut self, alerts: Arc<AlertService>) -> Self {
        self.alerts = Some(alerts);
        self
    }

    async fn alert(&self, message: &str) {
        if let Some(alerts) = &self.alerts {
            alerts.notify(message).await;
        }
    }

    /// False once the scheduler has been stopped; in-flight work checks this
    /// before delivering.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::SeqCst);
    }

    /// Mark a feed tick as started. Returns `None` if one is already running.
    pub(crate) fn begin_feed_tick(&self) -> Option<TickGuard<'_>> {
        TickGuard::acquire(&self.feed_tick_busy)
    }

    /// Same as [`begin_feed_tick`](Self::begin_feed_tick) for reminder scans.
    pub(crate) fn begin_reminder_tick(&self) -> Option<TickGuard<'_>> {
        TickGuard::acquire(&self.reminder_tick_busy)
    }
}

/// Clears its busy flag when dropped.
pub(crate) struct TickGuard<'a> {
    busy: &'a AtomicBool,
}

impl<'a> TickGuard<'a> {
    fn acquire(busy: &'a AtomicBool) -> Option<Self> {
        if busy.swap(true, Ordering::SeqCst) {
            return None;
        }
        Some(Self { busy })
    }
}

impl Drop for TickGuard<'_> {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::SeqCst);
    }
}

/// Owns the job scheduler running the feed and reminder jobs.
pub struct SchedulerService {
    ctx: Arc<SchedulerContext>,
    scheduler: JobScheduler,
    interval_minutes: Option<u32>,
}

impl SchedulerService {
    pub async fn new(ctx: Arc<SchedulerContext>) -> Result<Self> {
        let scheduler = JobScheduler::new().await?;

        Ok(Self {
            ctx,
            scheduler,
            interval_minutes: None,
        })
    }

    pub fn context(&self) -> &Arc<SchedulerContext> {
        &self.ctx
    }

    /// Feed check interval in effect, once started.
    pub fn interval_minutes(&self) -> Option<u32> {
        self.interval_minutes
    }

    /// Register both jobs and start ticking. The feed interval is read from
    /// settings here and not again until the next start.
    pub async fn start(&mut self) -> Result<u32> {
        let minutes = match Setting::effective_rss_interval(&self.ctx.db, self.ctx.default_interval).await {
            Ok(minutes) => minutes,
            Err(e) => {
                warn!("Cannot read stored RSS interval, using default: {}", e);
                if self.ctx.default_interval == 0 {
                    DEFAULT_RSS_INTERVAL
                } else {
                    self.ctx.default_interval
                }
            }
        };

        let ctx = self.ctx.clone();
        let feed_job = Job::new_repeated_async(
            Duration::from_secs(u64::from(minutes) * 60),
            move |_uuid, _l| {
                let ctx = ctx.clone();
                Box::pin(async move {
                    if let Err(e) = check_feeds(&ctx).await {
                        error!("Feed check failed: {}", e);
                        ctx.alert(&format!("Feed check failed: {}", e)).await;
                    }
                })
            },
        )?;

        let ctx = self.ctx.clone();
        let reminder_job = Job::new_async(REMINDER_SCHEDULE, move |_uuid, _l| {
            let ctx = ctx.clone();
            Box::pin(async move {
                if let Err(e) = deliver_due_reminders(&ctx).await {
                    error!("Reminder delivery failed: {}", e);
                    ctx.alert(&format!("Reminder scan failed: {}", e)).await;
                }
            })
        })?;

        self.scheduler.add(feed_job).await?;
        self.scheduler.add(reminder_job).await?;
        self.ctx.set_running(true);
        self.scheduler.start().await?;
        self.interval_minutes = Some(minutes);

        log_system_event(
            "Scheduler started",
            Some(&format!("feed interval {} min, reminders every minute", minutes)),
        );
        Ok(minutes)
    }

    /// Stop both jobs. Work already in flight finishes without delivering.
    pub async fn stop(&mut self) -> Result<()> {
        self.ctx.set_running(false);
        self.scheduler.shutdown().await?;
        info!("Scheduler stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result as FeedResult;
    use crate::feeds::ParsedFeed;
    use async_trait::async_trait;

    struct Silent;

    #[async_trait]
    impl MessageSender for Silent {
        async fn send_markdown(&self, _chat_id: i64, _text: &str) -> FeedResult<()> {
            Ok(())
        }
    }

    #[async_trait]
    impl FeedSource for Silent {
        async fn fetch(&self, _url: &str) -> FeedResult<ParsedFeed> {
            Ok(ParsedFeed::default())
        }
    }

    fn context() -> SchedulerContext {
        let pool = SqlitePool::connect_lazy("sqlite::memory:").unwrap();
        SchedulerContext::new(pool, Arc::new(Silent), Arc::new(Silent))
    }

    #[tokio::test]
    async fn test_feed_tick_guard_blocks_overlap() {
        let ctx = context();

        let guard = ctx.begin_feed_tick();
        assert!(guard.is_some());
        assert!(ctx.begin_feed_tick().is_none());

        drop(guard);
        assert!(ctx.begin_feed_tick().is_some());
    }

    #[tokio::test]
    async fn test_reminder_guard_is_independent_of_feed_guard() {
        let ctx = context();

        let feed = ctx.begin_feed_tick();
        let reminder = ctx.begin_reminder_tick();
        assert!(feed.is_some());
        assert!(reminder.is_some());
        assert!(ctx.begin_reminder_tick().is_none());

        drop(reminder);
        assert!(ctx.begin_reminder_tick().is_some());
    }

    #[tokio::test]
    async fn test_builders_clamp_concurrency() {
        let ctx = context().with_concurrency(0).with_default_interval(15);
        assert_eq!(ctx.concurrency, 1);
        assert_eq!(ctx.default_interval, 15);
        assert!(ctx.is_running());

        ctx.set_running(false);
        assert!(!ctx.is_running());
    }
}
