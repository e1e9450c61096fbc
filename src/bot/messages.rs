use teloxide::{
    prelude::*,
    types::ParseMode,
    utils::{command::BotCommands, html},
};

use super::{commands::Command, mentions, render};
use crate::{AppState, error::Result};

/// Removes a banned sender from an authorized group and deletes their
/// message. Returns whether the sender was banned. Platform failures are
/// logged and ignored.
pub async fn enforce_ban(bot: &Bot, msg: &Message, state: &AppState) -> Result<bool> {
    if msg.chat.is_private() || !state.admin.access().is_authorized_chat(msg.chat.id.0).await {
        return Ok(false);
    }
    let Some(sender) = msg.from() else {
        return Ok(false);
    };
    if !state
        .admin
        .is_banned(sender.id.0 as i64, sender.username.as_deref())
        .await?
    {
        return Ok(false);
    }

    tracing::info!(
        chat_id = msg.chat.id.0,
        user_id = sender.id.0,
        "Removing banned user"
    );
    if let Err(e) = bot.ban_chat_member(msg.chat.id, sender.id).await {
        tracing::warn!(chat_id = msg.chat.id.0, "Failed to remove banned user: {}", e);
    }
    if let Err(e) = bot.delete_message(msg.chat.id, msg.id).await {
        tracing::warn!(chat_id = msg.chat.id.0, "Failed to delete banned user's message: {}", e);
    }
    Ok(true)
}

pub async fn handle_group_message(bot: Bot, msg: Message, state: AppState) -> Result<()> {
    let chat_id = msg.chat.id.0;

    // Tenure is tracked even before a group is authorized.
    if let Some(members) = msg.new_chat_members() {
        for member in members {
            state
                .ledger
                .store()
                .record_join(chat_id, member.id.0 as i64, msg.date)
                .await?;
            tracing::debug!(chat_id, user_id = member.id.0, "Member joined");
        }
    }
    // Members who joined before the bot arrived are dated from their first
    // message instead.
    if let Some(sender) = msg.from().filter(|sender| !sender.is_bot) {
        state
            .ledger
            .store()
            .record_first_seen(chat_id, sender.id.0 as i64, msg.date)
            .await?;
    }

    if !state.admin.access().is_authorized_chat(chat_id).await {
        return Ok(());
    }
    if enforce_ban(&bot, &msg, &state).await? {
        return Ok(());
    }

    let Some(text) = msg.text() else {
        return Ok(());
    };
    let entities = msg.entities().unwrap_or_default();
    let targets =
        mentions::extract_targets(text, entities, state.config.max_mentions_per_message);

    for target in targets {
        let stats = match state.ledger.get_stats(&target, Some(chat_id)).await {
            Ok(stats) => stats,
            Err(e) => {
                tracing::error!(chat_id, "Failed to load rating for {}: {}", target, e);
                continue;
            }
        };

        let sent = bot
            .send_message(msg.chat.id, render::card(&target, stats))
            .parse_mode(ParseMode::Html)
            .reply_markup(render::vote_keyboard(&target))
            .reply_to_message_id(msg.id)
            .await;
        if let Err(e) = sent {
            tracing::warn!(chat_id, "Failed to send reputation card: {}", e);
        }
    }

    Ok(())
}

/// Any non-command private message gets the welcome text, or the command
/// list for admins.
pub async fn handle_private_message(bot: Bot, msg: Message, state: AppState) -> Result<()> {
    let Some(sender) = msg.from() else {
        return Ok(());
    };
    let is_admin = state.admin.access().is_admin(sender.id.0 as i64).await;
    greet(&bot, &msg, &state, is_admin).await
}

pub async fn greet(bot: &Bot, msg: &Message, state: &AppState, is_admin: bool) -> Result<()> {
    let text = if is_admin {
        html::escape(&Command::descriptions().to_string())
    } else {
        state.admin.welcome_message().await?
    };

    bot.send_message(msg.chat.id, text)
        .parse_mode(ParseMode::Html)
        .await?;
    Ok(())
}
