use anyhow::{anyhow, Result};
use teloxide::prelude::*;

use super::{report_outcome, Caller, StepResult};
use crate::bot::handlers::BotContext;
use crate::database::models::RssCookie;
use crate::utils::feedback::CommandFeedback;
use crate::utils::logging::{log_command_error, log_command_start, log_validation_error};
use crate::utils::markdown::{bold, escape_markdown};
use crate::utils::validation::validate_cookie_domain;

const COOKIE_USAGE: &str = "/cookie set <domain> <cookie-string> [| user-agent]\n\
/cookie list\n\
/cookie del <domain>";

/// A parsed `/cookie` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CookieAction {
    Set {
        domain: String,
        cookies: String,
        user_agent: String,
    },
    List,
    Delete(String),
}

impl CookieAction {
    pub fn parse(args: &str) -> Result<Self> {
        let args = args.trim();
        let (action, rest) = match args.split_once(char::is_whitespace) {
            Some((action, rest)) => (action, rest.trim()),
            None => (args, ""),
        };

        match action.to_lowercase().as_str() {
            "set" => {
                let (domain, value) = rest
                    .split_once(char::is_whitespace)
                    .ok_or_else(|| anyhow!("Give a domain and a cookie string"))?;
                let domain = validate_cookie_domain(domain)?;
                let (cookies, user_agent) = match value.split_once('|') {
                    Some((cookies, agent)) => (cookies.trim(), agent.trim()),
                    None => (value.trim(), ""),
                };
                if !cookies.contains('=') {
                    return Err(anyhow!("Cookie string must look like name=value; other=value"));
                }
                Ok(CookieAction::Set {
                    domain,
                    cookies: cookies.to_string(),
                    user_agent: user_agent.to_string(),
                })
            }
            "list" => Ok(CookieAction::List),
            "del" | "delete" => Ok(CookieAction::Delete(validate_cookie_domain(rest)?)),
            "" => Err(anyhow!("Missing action")),
            other => Err(anyhow!("Unknown action '{}'", other)),
        }
    }
}

pub async fn handle_cookie(bot: Bot, msg: Message, args: String, ctx: &BotContext) -> ResponseResult<()> {
    let caller = Caller::from_message(&msg);
    let feedback = CommandFeedback::new(bot, msg.chat.id);

    // Cookie values are secrets; only the action is logged.
    let action_word = args.split_whitespace().next().unwrap_or("");
    log_command_start("cookie", &caller.username, caller.user_id, caller.chat_id, Some(action_word));

    if !ctx.is_admin(caller.user_id) {
        log_command_error("cookie", &caller.username, caller.user_id, caller.chat_id, "not an admin");
        feedback.error("Only the bot administrator can manage cookies").await?;
        return Ok(());
    }

    let action = match CookieAction::parse(&args) {
        Ok(action) => action,
        Err(e) => {
            log_validation_error("cookie", "action", action_word, &e.to_string(), &caller.username, caller.user_id, caller.chat_id);
            feedback.validation_error(&e.to_string(), COOKIE_USAGE).await?;
            return Ok(());
        }
    };

    let outcome = match action {
        CookieAction::Set {
            domain,
            cookies,
            user_agent,
        } => set(&feedback, ctx, &domain, &cookies, &user_agent).await,
        CookieAction::List => list(&feedback, ctx).await,
        CookieAction::Delete(domain) => delete(&feedback, ctx, &domain).await,
    };

    report_outcome("cookie", &caller, &feedback, outcome).await
}

async fn set(
    feedback: &CommandFeedback,
    ctx: &BotContext,
    domain: &str,
    cookies: &str,
    user_agent: &str,
) -> StepResult {
    RssCookie::set(&ctx.db.pool, domain, cookies, user_agent).await?;
    let agent_note = if user_agent.is_empty() {
        "default browser User-Agent"
    } else {
        "custom User-Agent"
    };
    feedback
        .success(&format!("Cookies saved for {} ({})", domain, agent_note))
        .await?;
    Ok(())
}

async fn list(feedback: &CommandFeedback, ctx: &BotContext) -> StepResult {
    let cookies = RssCookie::list(&ctx.db.pool).await?;
    if cookies.is_empty() {
        feedback.info("No cookies stored").await?;
        return Ok(());
    }

    let list = cookies
        .iter()
        .map(|c| {
            let names: Vec<String> = c.pairs().into_iter().map(|(name, _)| name).collect();
            escape_markdown(&format!("🍪 {}\n   {}", c.domain, names.join(", ")))
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    feedback
        .send_markdown(format!("{}\n\n{}", bold("Stored cookies"), list))
        .await?;
    Ok(())
}

async fn delete(feedback: &CommandFeedback, ctx: &BotContext, domain: &str) -> StepResult {
    if RssCookie::delete(&ctx.db.pool, domain).await? > 0 {
        feedback.success(&format!("Cookies for {} deleted", domain)).await?;
    } else {
        feedback.error(&format!("No cookies stored for {}", domain)).await?;
    }
    Ok(())
}
