use teloxide::{prelude::*, types::ParseMode, utils::command::BotCommands, utils::html};

use super::{messages, render};
use crate::{
    AppState,
    error::{AppError, Result},
    models::Target,
};

#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
pub enum Command {
    #[command(description = "show the welcome message.")]
    Start,
    #[command(description = "show this list.")]
    Help,
    #[command(description = "show reputation: /rep @handle")]
    Rep(String),
    #[command(description = "authorize a group: /addgroup [chat_id]")]
    AddGroup(String),
    #[command(description = "revoke a group: /delgroup [chat_id]")]
    DelGroup(String),
    #[command(description = "add an admin: /addadmin <user_id>")]
    AddAdmin(String),
    #[command(description = "remove an admin: /deladmin <user_id>")]
    DelAdmin(String),
    #[command(description = "ban a user: /ban <@handle|user_id>")]
    Ban(String),
    #[command(description = "unban a user: /unban <@handle|user_id>")]
    Unban(String),
    #[command(description = "erase a user's votes and ratings: /clear <@handle|user_id>")]
    Clear(String),
    #[command(description = "replace the welcome message: /setwelcome <text>")]
    SetWelcome(String),
    #[command(description = "minimum membership days: /setjoin <chat_id> <days>")]
    SetJoin(String),
    #[command(description = "required channel: /setforce <chat_id> <channel_id>")]
    SetForce(String),
    #[command(description = "ledger totals.")]
    Stats,
}

impl Command {
    fn requires_admin(&self) -> bool {
        !matches!(self, Command::Start | Command::Help | Command::Rep(_))
    }
}

pub async fn handle_command(bot: Bot, msg: Message, cmd: Command, state: AppState) -> Result<()> {
    if messages::enforce_ban(&bot, &msg, &state).await? {
        return Ok(());
    }

    match run(&bot, &msg, cmd, &state).await {
        Ok(()) => Ok(()),
        Err(AppError::Validation(message)) | Err(AppError::BadRequest(message)) => {
            reply(&bot, &msg, html::escape(&message)).await
        }
        Err(AppError::Telegram(e)) => Err(AppError::Telegram(e)),
        Err(e) => {
            tracing::error!(chat_id = msg.chat.id.0, "Command failed: {}", e);
            reply(&bot, &msg, "Something went wrong, please try again later.").await
        }
    }
}

async fn run(bot: &Bot, msg: &Message, cmd: Command, state: &AppState) -> Result<()> {
    let Some(sender) = msg.from() else {
        return Ok(());
    };
    let sender_id = sender.id.0 as i64;
    let is_admin = state.admin.access().is_admin(sender_id).await;

    if cmd.requires_admin() && !is_admin {
        return reply(bot, msg, "This command is for bot admins only.").await;
    }

    match cmd {
        Command::Start => messages::greet(bot, msg, state, is_admin).await,
        Command::Help => reply(bot, msg, html::escape(&Command::descriptions().to_string())).await,
        Command::Rep(arg) => show_reputation(bot, msg, state, &arg, is_admin).await,
        Command::AddGroup(arg) => {
            let chat_id = chat_arg(msg, &arg, "/addgroup [chat_id]")?;
            let changed = state.admin.authorize_chat(chat_id).await?;
            let text = if changed { "Group authorized" } else { "Group was already authorized" };
            reply(bot, msg, format!("{}: <code>{}</code>", text, chat_id)).await
        }
        Command::DelGroup(arg) => {
            let chat_id = chat_arg(msg, &arg, "/delgroup [chat_id]")?;
            let changed = state.admin.revoke_chat(chat_id).await?;
            let text = if changed { "Group revoked" } else { "Group was not authorized" };
            reply(bot, msg, format!("{}: <code>{}</code>", text, chat_id)).await
        }
        Command::AddAdmin(arg) => {
            let user_id = id_arg(&arg, "/addadmin <user_id>")?;
            let changed = state.admin.add_admin(user_id).await?;
            let text = if changed { "Admin added" } else { "Already an admin" };
            reply(bot, msg, format!("{}: <code>{}</code>", text, user_id)).await
        }
        Command::DelAdmin(arg) => {
            let user_id = id_arg(&arg, "/deladmin <user_id>")?;
            let changed = state.admin.remove_admin(user_id).await?;
            let text = if changed { "Admin removed" } else { "Not an admin" };
            reply(bot, msg, format!("{}: <code>{}</code>", text, user_id)).await
        }
        Command::Ban(arg) => {
            let target = target_arg(&arg, "/ban <@handle|user_id>")?;
            state.admin.ban_user(&target).await?;
            reply(bot, msg, format!("Banned {}", html::escape(&target.to_string()))).await
        }
        Command::Unban(arg) => {
            let target = target_arg(&arg, "/unban <@handle|user_id>")?;
            let changed = state.admin.unban_user(&target).await?;
            let text = if changed { "Unbanned" } else { "Not banned:" };
            reply(bot, msg, format!("{} {}", text, html::escape(&target.to_string()))).await
        }
        Command::Clear(arg) => {
            let target = target_arg(&arg, "/clear <@handle|user_id>")?;
            let removed = state.admin.clear_user_data(&target).await?;
            reply(
                bot,
                msg,
                format!(
                    "Cleared {} ({} records removed)",
                    html::escape(&target.to_string()),
                    removed
                ),
            )
            .await
        }
        Command::SetWelcome(text) => {
            if text.trim().is_empty() {
                return Err(usage("/setwelcome <text>"));
            }
            state.admin.set_welcome_message(&text).await?;
            reply(bot, msg, "Welcome message updated.").await
        }
        Command::SetJoin(args) => {
            let (chat_id, days) = pair_arg::<i32>(&args, "/setjoin <chat_id> <days>")?;
            if days < 0 {
                return Err(usage("/setjoin <chat_id> <days>"));
            }
            let settings = state.admin.set_min_join_days(chat_id, days).await?;
            reply(
                bot,
                msg,
                format!(
                    "Group <code>{}</code>: members need {} days to vote.",
                    settings.chat_id, settings.min_join_days
                ),
            )
            .await
        }
        Command::SetForce(args) => {
            let (chat_id, channel_id) = pair_arg::<i64>(&args, "/setforce <chat_id> <channel_id>")?;
            let settings = state.admin.set_force_channel(chat_id, channel_id).await?;
            let text = if settings.force_channel_id == 0 {
                format!("Group <code>{}</code>: no channel required.", settings.chat_id)
            } else {
                format!(
                    "Group <code>{}</code>: voters must join <code>{}</code>.",
                    settings.chat_id, settings.force_channel_id
                )
            };
            reply(bot, msg, text).await
        }
        Command::Stats => {
            let totals = state.admin.totals().await?;
            let chats = state.admin.access().authorized_chats().await.len();
            reply(
                bot,
                msg,
                format!(
                    "<b>Stats</b>\nRated users: {}\nVotes: {}\nAuthorized groups: {}",
                    totals.rated_users, totals.votes, chats
                ),
            )
            .await
        }
    }
}

async fn show_reputation(
    bot: &Bot,
    msg: &Message,
    state: &AppState,
    arg: &str,
    is_admin: bool,
) -> Result<()> {
    let target = target_arg(arg, "/rep <@handle|user_id>")?;
    let in_group = !msg.chat.is_private();
    let chat_id = msg.chat.id.0;

    if in_group && !state.admin.access().is_authorized_chat(chat_id).await {
        return Ok(());
    }
    if !in_group && !is_admin {
        return reply(bot, msg, "Use this command in an authorized group.").await;
    }

    let scope = in_group.then_some(chat_id);
    let stats = state.ledger.get_stats(&target, scope).await?;

    let request = bot
        .send_message(msg.chat.id, render::card(&target, stats))
        .parse_mode(ParseMode::Html);
    if in_group {
        request.reply_markup(render::vote_keyboard(&target)).await?;
    } else {
        request.await?;
    }
    Ok(())
}

async fn reply(bot: &Bot, msg: &Message, text: impl Into<String>) -> Result<()> {
    bot.send_message(msg.chat.id, text)
        .parse_mode(ParseMode::Html)
        .await?;
    Ok(())
}

fn usage(hint: &str) -> AppError {
    AppError::Validation(format!("Usage: {}", hint))
}

/// An explicit chat id, or the current group when none is given.
fn chat_arg(msg: &Message, arg: &str, hint: &str) -> Result<i64> {
    let arg = arg.trim();
    if arg.is_empty() {
        return if msg.chat.is_private() {
            Err(usage(hint))
        } else {
            Ok(msg.chat.id.0)
        };
    }
    arg.parse().map_err(|_| usage(hint))
}

fn id_arg(arg: &str, hint: &str) -> Result<i64> {
    arg.trim().parse().map_err(|_| usage(hint))
}

fn target_arg(arg: &str, hint: &str) -> Result<Target> {
    Target::parse_arg(arg).ok_or_else(|| usage(hint))
}

fn pair_arg<T: std::str::FromStr>(args: &str, hint: &str) -> Result<(i64, T)> {
    let mut parts = args.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(chat_id), Some(value), None) => {
            let chat_id = chat_id.parse().map_err(|_| usage(hint))?;
            let value = value.parse().map_err(|_| usage(hint))?;
            Ok((chat_id, value))
        }
        _ => Err(usage(hint)),
    }
}
