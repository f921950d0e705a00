pub mod message;

use std::sync::Arc;

use teloxide::{dispatching::UpdateHandler, prelude::*};

use crate::bot::commands::Command;
use crate::config::DEFAULT_RSS_INTERVAL;
use crate::database::connection::DatabaseManager;
use crate::feeds::FeedSource;

/// Shared state for command handlers.
#[derive(Clone)]
pub struct BotContext {
    pub db: DatabaseManager,
    /// Used to validate a feed and learn its title on subscribe.
    pub source: Arc<dyn FeedSource>,
    pub admin_id: Option<i64>,
    pub default_interval: u32,
    pub static_include: Vec<String>,
    pub static_exclude: Vec<String>,
}

impl BotContext {
    pub fn new(db: DatabaseManager, source: Arc<dyn FeedSource>) -> Self {
        Self {
            db,
            source,
            admin_id: None,
            default_interval: DEFAULT_RSS_INTERVAL,
            static_include: Vec::new(),
            static_exclude: Vec::new(),
        }
    }

    pub fn with_admin(mut self, admin_id: Option<i64>) -> Self {
        self.admin_id = admin_id;
        self
    }

    pub fn with_default_interval(mut self, minutes: u32) -> Self {
        self.default_interval = minutes;
        self
    }

    pub fn with_keywords(mut self, include: Vec<String>, exclude: Vec<String>) -> Self {
        self.static_include = include;
        self.static_exclude = exclude;
        self
    }

    /// True only for the configured admin; nobody is admin when none is set.
    pub fn is_admin(&self, user_id: i64) -> bool {
        self.admin_id == Some(user_id)
    }

    /// Anyone may change the interval until an admin is configured.
    pub fn may_change_interval(&self, user_id: i64) -> bool {
        self.admin_id.map_or(true, |admin| admin == user_id)
    }
}

pub struct BotHandler {
    ctx: Arc<BotContext>,
}

impl BotHandler {
    pub fn new(ctx: BotContext) -> Self {
        Self { ctx: Arc::new(ctx) }
    }

    pub fn schema(&self) -> UpdateHandler<teloxide::RequestError> {
        let ctx = self.ctx.clone();

        Update::filter_message()
            .filter_command::<Command>()
            .endpoint(move |bot: Bot, msg: Message, cmd: Command| {
                let ctx = ctx.clone();
                async move { message::command_handler(bot, msg, cmd, ctx).await }
            })
    }
}
