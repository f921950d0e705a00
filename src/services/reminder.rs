use chrono::Utc;
use tracing::{debug, info, warn};

use super::delivery::render_reminder_message;
use super::scheduler::SchedulerContext;
use crate::database::models::Reminder;
use crate::error::Result;
use crate::utils::logging::log_database_error;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReminderReport {
    pub sent: usize,
    pub failed: usize,
}

/// Send every unsent reminder that is due and mark it sent.
///
/// A reminder whose delivery fails stays unsent and is retried on the next
/// scan. One failure never stops the others. A scan that starts while the
/// previous one is still sending is skipped.
pub async fn deliver_due_reminders(ctx: &SchedulerContext) -> Result<ReminderReport> {
    let Some(_guard) = ctx.begin_reminder_tick() else {
        warn!("Previous reminder scan still running, skipping this one");
        return Ok(ReminderReport::default());
    };

    let due = Reminder::due_pending(&ctx.db, Utc::now()).await.map_err(|e| {
        log_database_error("due_pending", "reminders", &e.to_string(), None);
        e
    })?;

    let mut report = ReminderReport::default();
    if due.is_empty() {
        debug!("No reminders due");
        return Ok(report);
    }

    for reminder in due {
        if !ctx.is_running() {
            info!("Scheduler stopped, leaving remaining reminders for later");
            break;
        }

        let text = render_reminder_message(&reminder.message);
        match ctx.sender.send_markdown(reminder.chat_id, &text).await {
            Ok(()) => {
                if let Err(e) = Reminder::mark_sent(&ctx.db, reminder.id).await {
                    log_database_error(
                        "mark_sent",
                        "reminders",
                        &e.to_string(),
                        Some(&format!("reminder #{}", reminder.id)),
                    );
                    report.failed += 1;
                    continue;
                }
                report.sent += 1;
                info!("Reminder #{} sent to chat {}", reminder.id, reminder.chat_id);
            }
            Err(e) => {
                report.failed += 1;
                warn!("Reminder #{} delivery failed: {}", reminder.id, e);
            }
        }
    }

    Ok(report)
}
