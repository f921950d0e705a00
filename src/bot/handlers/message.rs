use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;

use super::BotContext;
use crate::bot::commands::{cookie, remind, rss, Command};

const WELCOME: &str = "📰 Welcome to Feed Bot!\n\n\
Subscribe to RSS/Atom feeds with /rss add <url> and new entries will be posted here.\n\
Set reminders with /remind.\n\
Use /help to see all commands.";

pub async fn command_handler(
    bot: Bot,
    msg: Message,
    cmd: Command,
    ctx: Arc<BotContext>,
) -> ResponseResult<()> {
    match cmd {
        Command::Help => {
            bot.send_message(msg.chat.id, Command::descriptions().to_string()).await?;
        }
        Command::Start => {
            bot.send_message(msg.chat.id, WELCOME).await?;
        }
        Command::Rss(args) => rss::handle_rss(bot, msg, args, &ctx).await?,
        Command::Remind(args) => remind::handle_remind(bot, msg, args, &ctx).await?,
        Command::Reminders => remind::handle_reminders(bot, msg, &ctx).await?,
        Command::Delremind(args) => remind::handle_delremind(bot, msg, args, &ctx).await?,
        Command::Cookie(args) => cookie::handle_cookie(bot, msg, args, &ctx).await?,
    }
    Ok(())
}
