use anyhow::{anyhow, Result};
use teloxide::prelude::*;

use super::{report_outcome, Caller, StepResult};
use crate::bot::handlers::BotContext;
use crate::database::models::{KeywordKind, RssFeed, RssKeyword, Setting};
use crate::services::subscription::{subscribe, SubscribeError};
use crate::utils::feedback::{CommandFeedback, FeedbackType};
use crate::utils::logging::{log_command_start, log_validation_error};
use crate::utils::markdown::{bold, code, escape_markdown};
use crate::utils::validation::{
    parse_id, parse_keyword_list, validate_feed_url, validate_rss_interval, validate_telegram_chat_id,
};

const KEYWORD_USAGE: &str = "/rss kw add w1,w2 | /rss kw del w1,w2 | /rss kw list";
const EXCLUDE_USAGE: &str = "/rss ex add w1,w2 | /rss ex del w1,w2 | /rss ex list";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeywordOp {
    Add(Vec<String>),
    Delete(Vec<String>),
    List,
}

/// A parsed `/rss` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RssAction {
    Overview,
    Add(String),
    List,
    Delete(i64),
    Interval(u32),
    Keywords(KeywordKind, KeywordOp),
}

impl RssAction {
    pub fn parse(args: &str) -> Result<Self> {
        let args = args.trim();
        let (action, rest) = match args.split_once(char::is_whitespace) {
            Some((action, rest)) => (action, rest.trim()),
            None => (args, ""),
        };

        match action.to_lowercase().as_str() {
            "" => Ok(RssAction::Overview),
            "add" => Ok(RssAction::Add(validate_feed_url(rest)?)),
            "list" => Ok(RssAction::List),
            "del" | "delete" => Ok(RssAction::Delete(parse_id(rest)?)),
            "interval" => Ok(RssAction::Interval(validate_rss_interval(rest)?)),
            "kw" => Ok(RssAction::Keywords(KeywordKind::Include, parse_keyword_op(rest, KEYWORD_USAGE)?)),
            "ex" => Ok(RssAction::Keywords(KeywordKind::Exclude, parse_keyword_op(rest, EXCLUDE_USAGE)?)),
            other => Err(anyhow!("Unknown action '{}'", other)),
        }
    }
}

fn parse_keyword_op(args: &str, usage: &str) -> Result<KeywordOp> {
    let (op, rest) = match args.split_once(char::is_whitespace) {
        Some((op, rest)) => (op, rest),
        None => (args, ""),
    };

    match op.to_lowercase().as_str() {
        "add" => Ok(KeywordOp::Add(parse_keyword_list(rest)?)),
        "del" | "delete" => Ok(KeywordOp::Delete(parse_keyword_list(rest)?)),
        "list" => Ok(KeywordOp::List),
        _ => Err(anyhow!("Usage: {}", usage)),
    }
}

pub async fn handle_rss(bot: Bot, msg: Message, args: String, ctx: &BotContext) -> ResponseResult<()> {
    let caller = Caller::from_message(&msg);
    let feedback = CommandFeedback::new(bot, msg.chat.id);

    log_command_start("rss", &caller.username, caller.user_id, caller.chat_id, Some(&args));

    let action = match RssAction::parse(&args) {
        Ok(action) => action,
        Err(e) => {
            log_validation_error("rss", "args", &args, &e.to_string(), &caller.username, caller.user_id, caller.chat_id);
            feedback
                .validation_error(&e.to_string(), "Send /rss without arguments to see every option.")
                .await?;
            return Ok(());
        }
    };

    let outcome = match action {
        RssAction::Overview => overview(&feedback, ctx).await,
        RssAction::Add(url) => add_feed(&feedback, ctx, &caller, &url).await,
        RssAction::List => list_feeds(&feedback, ctx, caller.user_id).await,
        RssAction::Delete(id) => delete_feed(&feedback, ctx, id, caller.user_id).await,
        RssAction::Interval(minutes) => set_interval(&feedback, ctx, caller.user_id, minutes).await,
        RssAction::Keywords(kind, op) => keywords(&feedback, ctx, kind, op).await,
    };

    report_outcome("rss", &caller, &feedback, outcome).await
}

fn join_or_none(words: &[String]) -> String {
    if words.is_empty() {
        "none".to_string()
    } else {
        words.join(", ")
    }
}

async fn overview(feedback: &CommandFeedback, ctx: &BotContext) -> StepResult {
    let interval = Setting::effective_rss_interval(&ctx.db.pool, ctx.default_interval).await?;
    let mut include = ctx.static_include.clone();
    include.extend(RssKeyword::words(&ctx.db.pool, KeywordKind::Include).await?);
    let mut exclude = ctx.static_exclude.clone();
    exclude.extend(RssKeyword::words(&ctx.db.pool, KeywordKind::Exclude).await?);

    let lines = [
        format!("📰 {}", bold("RSS subscriptions")),
        String::new(),
        format!("{} {}", code("/rss add URL"), escape_markdown("- subscribe")),
        format!("{} {}", code("/rss list"), escape_markdown("- your subscriptions")),
        format!("{} {}", code("/rss del ID"), escape_markdown("- unsubscribe")),
        format!(
            "{} {}",
            code("/rss interval MINUTES"),
            escape_markdown(&format!("- check interval (now {} min)", interval))
        ),
        String::new(),
        bold("Keyword filter:"),
        format!("{} {}", code("/rss kw add|del w1,w2"), escape_markdown("- include words")),
        format!("{} {}", code("/rss ex add|del w1,w2"), escape_markdown("- exclude words")),
        format!("{} {}", code("/rss kw list"), escape_markdown("- stored include words")),
        format!("{} {}", code("/rss ex list"), escape_markdown("- stored exclude words")),
        String::new(),
        escape_markdown(&format!("📌 Keywords: {}", join_or_none(&include))),
        escape_markdown(&format!("🚫 Excluded: {}", join_or_none(&exclude))),
    ];

    feedback.send_markdown(lines.join("\n")).await?;
    Ok(())
}

async fn add_feed(
    feedback: &CommandFeedback,
    ctx: &BotContext,
    caller: &Caller,
    url: &str,
) -> StepResult {
    if let Err(e) = validate_telegram_chat_id(caller.chat_id) {
        feedback
            .validation_error(
                &format!("Invalid chat configuration: {}", e),
                "Subscribe from a regular private chat, group or channel.",
            )
            .await?;
        return Ok(());
    }

    let processing = feedback.send_processing("Reading feed...").await?;

    match subscribe(&ctx.db.pool, ctx.source.as_ref(), caller.user_id, caller.chat_id, url).await {
        Ok(feed) => {
            let text = format!(
                "Subscribed #{}\n\n📰 {}\n🔗 {}",
                feed.id,
                feed.display_title(),
                feed.url
            );
            feedback
                .update_message(processing.id, FeedbackType::Success, &text)
                .await?;
        }
        Err(SubscribeError::Duplicate(_)) => {
            feedback
                .update_message(processing.id, FeedbackType::Error, "This feed is already subscribed")
                .await?;
        }
        Err(SubscribeError::Fetch(e)) => {
            feedback
                .update_message(processing.id, FeedbackType::Error, &format!("Cannot read feed: {}", e))
                .await?;
        }
        Err(SubscribeError::Storage(e)) => return Err(e.into()),
    }
    Ok(())
}

async fn list_feeds(feedback: &CommandFeedback, ctx: &BotContext, user_id: i64) -> StepResult {
    let feeds = RssFeed::list_by_owner(&ctx.db.pool, user_id).await?;
    if feeds.is_empty() {
        feedback.info("No subscriptions yet").await?;
        return Ok(());
    }

    let list = feeds
        .iter()
        .map(|f| {
            escape_markdown(&format!("🔖 #{} | {}\n   {}", f.id, f.title.as_deref().unwrap_or("unknown"), f.url))
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    feedback
        .send_markdown(format!("📰 {}\n\n{}", bold("Your subscriptions"), list))
        .await?;
    Ok(())
}

async fn delete_feed(feedback: &CommandFeedback, ctx: &BotContext, id: i64, user_id: i64) -> StepResult {
    if RssFeed::delete_owned(&ctx.db.pool, id, user_id).await? > 0 {
        feedback.success(&format!("Subscription #{} deleted", id)).await?;
    } else {
        feedback.error(&format!("Subscription #{} not found", id)).await?;
    }
    Ok(())
}

async fn set_interval(feedback: &CommandFeedback, ctx: &BotContext, user_id: i64, minutes: u32) -> StepResult {
    if !ctx.may_change_interval(user_id) {
        feedback.error("Only the bot administrator can change the interval").await?;
        return Ok(());
    }

    Setting::set_rss_interval(&ctx.db.pool, minutes).await?;
    feedback
        .success(&format!(
            "Check interval set to {} minutes\n⚠️ Takes effect after a restart",
            minutes
        ))
        .await?;
    Ok(())
}

async fn keywords(feedback: &CommandFeedback, ctx: &BotContext, kind: KeywordKind, op: KeywordOp) -> StepResult {
    let label = match kind {
        KeywordKind::Include => "keywords",
        KeywordKind::Exclude => "excluded words",
    };

    match op {
        KeywordOp::Add(words) => {
            let mut added = Vec::new();
            for word in words {
                if RssKeyword::add(&ctx.db.pool, &word, kind).await? > 0 {
                    added.push(word);
                }
            }
            if added.is_empty() {
                feedback.warning(&format!("All {} already exist", label)).await?;
            } else {
                feedback.success(&format!("Added {}: {}", label, added.join(", "))).await?;
            }
        }
        KeywordOp::Delete(words) => {
            let mut removed = Vec::new();
            for word in words {
                if RssKeyword::delete(&ctx.db.pool, &word, kind).await? > 0 {
                    removed.push(word);
                }
            }
            if removed.is_empty() {
                feedback.error(&format!("No matching {} found", label)).await?;
            } else {
                feedback.success(&format!("Removed {}: {}", label, removed.join(", "))).await?;
            }
        }
        KeywordOp::List => {
            let stored = RssKeyword::words(&ctx.db.pool, kind).await?;
            let icon = match kind {
                KeywordKind::Include => "📌",
                KeywordKind::Exclude => "🚫",
            };
            let body = if stored.is_empty() {
                escape_markdown("none")
            } else {
                escape_markdown(&stored.join("\n"))
            };
            feedback
                .send_markdown(format!("{} {}\n\n{}", icon, bold(&format!("Stored {}", label)), body))
                .await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_overview_and_list() {
        assert_eq!(RssAction::parse("").unwrap(), RssAction::Overview);
        assert_eq!(RssAction::parse("  list ").unwrap(), RssAction::List);
    }

    #[test]
    fn test_parse_add_validates_url() {
        assert_eq!(
            RssAction::parse("add https://example.com/feed.xml").unwrap(),
            RssAction::Add("https://example.com/feed.xml".to_string())
        );
        assert!(RssAction::parse("add").is_err());
        assert!(RssAction::parse("add ftp://example.com/feed").is_err());
    }

    #[test]
    fn test_parse_delete_and_interval() {
        assert_eq!(RssAction::parse("del #12").unwrap(), RssAction::Delete(12));
        assert_eq!(RssAction::parse("interval 15").unwrap(), RssAction::Interval(15));
        assert!(RssAction::parse("interval 0").is_err());
        assert!(RssAction::parse("interval 1441").is_err());
    }

    #[test]
    fn test_parse_keyword_actions() {
        assert_eq!(
            RssAction::parse("kw add rust, tokio").unwrap(),
            RssAction::Keywords(
                KeywordKind::Include,
                KeywordOp::Add(vec!["rust".to_string(), "tokio".to_string()])
            )
        );
        assert_eq!(
            RssAction::parse("ex del spam").unwrap(),
            RssAction::Keywords(KeywordKind::Exclude, KeywordOp::Delete(vec!["spam".to_string()]))
        );
        assert_eq!(
            RssAction::parse("ex list").unwrap(),
            RssAction::Keywords(KeywordKind::Exclude, KeywordOp::List)
        );
        assert!(RssAction::parse("kw add").is_err());
        assert!(RssAction::parse("kw frobnicate").is_err());
    }

    #[test]
    fn test_parse_unknown_action() {
        assert!(RssAction::parse("subscribe https://example.com").is_err());
    }
}
