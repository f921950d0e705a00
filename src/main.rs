//! # Feed Bot Main Entry Point
//!
//! Initializes logging, loads configuration, sets up the database, starts the
//! feed and reminder scheduler, and runs the Telegram bot next to the admin
//! HTTP server.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use teloxide::prelude::*;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use feedbot::bot::handlers::{BotContext, BotHandler};
use feedbot::config::Config;
use feedbot::database::connection::DatabaseManager;
use feedbot::feeds::{BrowserHandle, FeedFetcher, PageRenderer};
use feedbot::services::alert::AlertService;
use feedbot::services::delivery::MessageSender;
use feedbot::services::panel::PanelService;
use feedbot::services::scheduler::{SchedulerContext, SchedulerService};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "feedbot=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    info!("Starting Feed Bot v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Configuration loaded - Database: {}, HTTP Port: {}, RSS concurrency: {}",
        config.database_url, config.http_port, config.rss_concurrency
    );

    info!("Initializing database connection...");
    let db_manager = DatabaseManager::new(&config.database_url).await?;
    db_manager.run_migrations().await?;
    let db_arc = Arc::new(db_manager);
    info!("Database initialized successfully");

    let mut bot = Bot::new(&config.telegram_bot_token);
    if let Some(base) = &config.tg_api_base {
        let api_url = url::Url::parse(base).map_err(|e| anyhow!("Invalid TG_API_BASE: {}", e))?;
        info!("Using custom Bot API server {}", api_url);
        bot = bot.set_api_url(api_url);
    }
    let sender: Arc<dyn MessageSender> = Arc::new(bot.clone());

    let alerts = Arc::new(AlertService::new(sender.clone(), config.admin_chat_id));
    alerts.clone().install_panic_hook();

    let browser = Arc::new(BrowserHandle::new(config.chromium_path.clone()));
    let renderer: Arc<dyn PageRenderer> = browser.clone();
    let fetcher = Arc::new(FeedFetcher::standard(renderer, Some(db_arc.pool.clone()))?);
    info!("Feed fetch stages: {}", fetcher.strategy_names().join(" -> "));

    let scheduler_ctx = SchedulerContext::new(db_arc.pool.clone(), sender, fetcher.clone())
        .with_keywords(config.rss_keywords.clone(), config.rss_exclude.clone())
        .with_concurrency(config.rss_concurrency)
        .with_default_interval(config.rss_check_interval)
        .with_alerts(alerts.clone());
    let mut scheduler = SchedulerService::new(Arc::new(scheduler_ctx)).await?;
    let minutes = scheduler.start().await?;
    info!("Scheduler started, checking feeds every {} minutes", minutes);

    let handler = BotHandler::new(
        BotContext::new(db_arc.as_ref().clone(), fetcher)
            .with_admin(config.admin_chat_id)
            .with_default_interval(config.rss_check_interval)
            .with_keywords(config.rss_keywords.clone(), config.rss_exclude.clone()),
    );

    let panel = PanelService::with_default_interval(
        db_arc.clone(),
        config.admin_api_token.clone(),
        config.rss_check_interval,
    );
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.http_port))
        .await
        .map_err(|e| anyhow!("Failed to bind to port {}: {}", config.http_port, e))?;
    info!("Admin API listening on port {}", config.http_port);

    let bot_task = tokio::spawn(async move {
        Dispatcher::builder(bot, handler.schema())
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;
    });

    let panel_task = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, panel.router).await {
            error!("Admin API server error: {}", e);
        }
    });

    tokio::select! {
        result = bot_task => {
            if let Err(e) = result {
                error!("Bot task error: {}", e);
                alerts.notify(&format!("Bot task died: {}", e)).await;
            }
        }
        result = panel_task => {
            match result {
                Err(e) => {
                    error!("Admin API task error: {}", e);
                    alerts.notify(&format!("Admin API task died: {}", e)).await;
                }
                Ok(()) => {
                    alerts.notify("Admin API server stopped").await;
                }
            }
        }
    }

    if let Err(e) = scheduler.stop().await {
        warn!("Error stopping scheduler: {}", e);
    }
    browser.shutdown().await;

    info!("Application stopped");
    Ok(())
}
