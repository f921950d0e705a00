use anyhow::{anyhow, Result};
use chrono::{DateTime, Local, TimeZone, Utc};
use teloxide::prelude::*;

use super::{report_outcome, Caller, StepResult};
use crate::bot::handlers::BotContext;
use crate::database::models::Reminder;
use crate::utils::datetime::{format_datetime, parse_time_string};
use crate::utils::feedback::CommandFeedback;
use crate::utils::logging::{log_command_start, log_validation_error};
use crate::utils::markdown::{bold, escape_markdown};
use crate::utils::validation::{parse_id, validate_reminder_text};

const REMIND_USAGE: &str = "Usage: /remind <time> <text>\n\
Time formats:\n\
• 30m, 2h, 1d (from now)\n\
• 18:30 (today, or tomorrow if passed)\n\
• 12-25 10:00 or 2025-12-25 10:00";

/// Split `/remind` arguments into a due time and the reminder text.
///
/// A first word containing `-` is a date and takes the following word as its
/// time of day. The due time must be after `now`.
pub fn parse_remind_args<Tz: TimeZone>(args: &str, now: &DateTime<Tz>) -> Result<(DateTime<Tz>, String)> {
    let mut words = args.split_whitespace();
    let first = words.next().ok_or_else(|| anyhow!("Missing time and text"))?;

    let time_expr = if first.contains('-') {
        let clock = words.next().ok_or_else(|| anyhow!("Missing time of day after the date"))?;
        format!("{} {}", first, clock)
    } else {
        first.to_string()
    };

    let text = words.collect::<Vec<_>>().join(" ");
    validate_reminder_text(&text)?;

    let due = parse_time_string(&time_expr, now)?;
    if due <= *now {
        return Err(anyhow!("Reminder time must be in the future"));
    }

    Ok((due, text))
}

pub async fn handle_remind(bot: Bot, msg: Message, args: String, ctx: &BotContext) -> ResponseResult<()> {
    let caller = Caller::from_message(&msg);
    let feedback = CommandFeedback::new(bot, msg.chat.id);

    log_command_start("remind", &caller.username, caller.user_id, caller.chat_id, Some(&args));

    if args.trim().is_empty() {
        feedback.info(REMIND_USAGE).await?;
        return Ok(());
    }

    let (due, text) = match parse_remind_args(&args, &Local::now()) {
        Ok(parsed) => parsed,
        Err(e) => {
            log_validation_error("remind", "args", &args, &e.to_string(), &caller.username, caller.user_id, caller.chat_id);
            feedback.validation_error(&e.to_string(), REMIND_USAGE).await?;
            return Ok(());
        }
    };

    let outcome = create(&feedback, ctx, &caller, due, &text).await;
    report_outcome("remind", &caller, &feedback, outcome).await
}

async fn create(
    feedback: &CommandFeedback,
    ctx: &BotContext,
    caller: &Caller,
    due: DateTime<Local>,
    text: &str,
) -> StepResult {
    let reminder = Reminder::create(
        &ctx.db.pool,
        caller.user_id,
        caller.chat_id,
        text,
        due.with_timezone(&Utc),
    )
    .await?;

    feedback
        .success(&format!(
            "Reminder #{} set\n\n⏰ {}\n📝 {}",
            reminder.id,
            format_datetime(&due),
            text
        ))
        .await?;
    Ok(())
}

pub async fn handle_reminders(bot: Bot, msg: Message, ctx: &BotContext) -> ResponseResult<()> {
    let caller = Caller::from_message(&msg);
    let feedback = CommandFeedback::new(bot, msg.chat.id);

    log_command_start("reminders", &caller.username, caller.user_id, caller.chat_id, None);
    let outcome = list(&feedback, ctx, caller.user_id).await;
    report_outcome("reminders", &caller, &feedback, outcome).await
}

async fn list(feedback: &CommandFeedback, ctx: &BotContext, user_id: i64) -> StepResult {
    let reminders = Reminder::list_pending_by_user(&ctx.db.pool, user_id).await?;
    if reminders.is_empty() {
        feedback.info("No pending reminders").await?;
        return Ok(());
    }

    let list = reminders
        .iter()
        .map(|r| {
            let due = r
                .due_at()
                .map(|t| format_datetime(&t.with_timezone(&Local)))
                .unwrap_or_else(|| "?".to_string());
            escape_markdown(&format!("#{} | {}\n📝 {}", r.id, due, r.message))
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    feedback
        .send_markdown(format!(
            "⏰ {}\n\n{}\n\n{}",
            bold("Pending reminders"),
            list,
            escape_markdown("Delete one with /delremind <id>")
        ))
        .await?;
    Ok(())
}

pub async fn handle_delremind(bot: Bot, msg: Message, args: String, ctx: &BotContext) -> ResponseResult<()> {
    let caller = Caller::from_message(&msg);
    let feedback = CommandFeedback::new(bot, msg.chat.id);

    log_command_start("delremind", &caller.username, caller.user_id, caller.chat_id, Some(&args));

    let id = match parse_id(&args) {
        Ok(id) => id,
        Err(e) => {
            log_validation_error("delremind", "id", &args, &e.to_string(), &caller.username, caller.user_id, caller.chat_id);
            feedback.validation_error(&e.to_string(), "Usage: /delremind <id>").await?;
            return Ok(());
        }
    };

    let outcome = delete(&feedback, ctx, id, caller.user_id).await;
    report_outcome("delremind", &caller, &feedback, outcome).await
}

async fn delete(feedback: &CommandFeedback, ctx: &BotContext, id: i64, user_id: i64) -> StepResult {
    if Reminder::delete_owned(&ctx.db.pool, id, user_id).await? > 0 {
        feedback.success(&format!("Reminder #{} deleted", id)).await?;
    } else {
        feedback.error(&format!("Reminder #{} not found", id)).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 14, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_relative_reminder() {
        let (due, text) = parse_remind_args("30m stretch your legs", &now()).unwrap();
        assert_eq!(due, now() + Duration::minutes(30));
        assert_eq!(text, "stretch your legs");
    }

    #[test]
    fn test_dated_reminder_takes_two_words() {
        let (due, text) = parse_remind_args("2025-12-25 10:00 open presents", &now()).unwrap();
        assert_eq!(due, Utc.with_ymd_and_hms(2025, 12, 25, 10, 0, 0).unwrap());
        assert_eq!(text, "open presents");
    }

    #[test]
    fn test_past_date_rejected() {
        let err = parse_remind_args("2024-01-01 10:00 too late", &now()).unwrap_err();
        assert!(err.to_string().contains("future"));
    }

    #[test]
    fn test_missing_text_rejected() {
        assert!(parse_remind_args("2h", &now()).is_err());
        assert!(parse_remind_args("12-25", &now()).is_err());
        assert!(parse_remind_args("soon do things", &now()).is_err());
    }
}
