pub mod cookie;
pub mod remind;
pub mod rss;

use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;

use crate::utils::feedback::CommandFeedback;
use crate::utils::logging::{log_command_error, log_command_success};

#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Feed bot commands:")]
pub enum Command {
    #[command(description = "Display this help message")]
    Help,
    #[command(description = "Start the bot")]
    Start,
    #[command(description = "Manage feed subscriptions (add, list, del, interval, kw, ex)")]
    Rss(String),
    #[command(description = "Set a reminder: /remind <time> <text>")]
    Remind(String),
    #[command(description = "List your pending reminders")]
    Reminders,
    #[command(description = "Delete a reminder: /delremind <id>")]
    Delremind(String),
    #[command(description = "Manage stored site cookies (admin only)")]
    Cookie(String),
}

/// Failure of a command step after its arguments were accepted.
pub(crate) enum CommandError {
    Storage(sqlx::Error),
    Telegram(teloxide::RequestError),
}

impl From<sqlx::Error> for CommandError {
    fn from(e: sqlx::Error) -> Self {
        CommandError::Storage(e)
    }
}

impl From<teloxide::RequestError> for CommandError {
    fn from(e: teloxide::RequestError) -> Self {
        CommandError::Telegram(e)
    }
}

pub(crate) type StepResult = std::result::Result<(), CommandError>;

/// Who sent a command, as used in logs and ownership checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub user_id: i64,
    pub chat_id: i64,
    pub username: String,
}

impl Caller {
    pub fn from_message(msg: &Message) -> Self {
        Self {
            user_id: msg.from().map(|u| u.id.0 as i64).unwrap_or(0),
            chat_id: msg.chat.id.0,
            username: msg
                .from()
                .and_then(|u| u.username.clone())
                .unwrap_or_else(|| "unknown".to_string()),
        }
    }
}

/// Log a finished command. Storage failures get a generic reply; Telegram
/// errors are handed back to the dispatcher.
pub(crate) async fn report_outcome(
    command: &str,
    caller: &Caller,
    feedback: &CommandFeedback,
    outcome: StepResult,
) -> ResponseResult<()> {
    match outcome {
        Ok(()) => {
            log_command_success(command, &caller.username, caller.user_id, caller.chat_id, None);
            Ok(())
        }
        Err(CommandError::Storage(e)) => {
            log_command_error(command, &caller.username, caller.user_id, caller.chat_id, &e.to_string());
            feedback.error("Database error, please try again later.").await?;
            Ok(())
        }
        Err(CommandError::Telegram(e)) => {
            log_command_error(command, &caller.username, caller.user_id, caller.chat_id, &e.to_string());
            Err(e)
        }
    }
}
