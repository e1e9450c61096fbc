use chrono::Utc;
use teloxide::{prelude::*, types::ParseMode};

use super::{directory::TelegramDirectory, payload::VotePayload, render};
use crate::{
    AppState,
    error::Result,
    models::VoteKind,
    services::ledger::{Ballot, VoteDecision},
};

pub async fn handle_callback(bot: Bot, q: CallbackQuery, state: AppState) -> Result<()> {
    let payload = q.data.as_deref().and_then(VotePayload::decode);
    let (Some(payload), Some(message)) = (payload, q.message.as_ref()) else {
        tracing::debug!(data = ?q.data, "Ignoring malformed callback");
        bot.answer_callback_query(q.id).await?;
        return Ok(());
    };

    let chat_id = message.chat.id.0;
    if !state.admin.access().is_authorized_chat(chat_id).await {
        bot.answer_callback_query(q.id)
            .text("This group is not authorized.")
            .await?;
        return Ok(());
    }

    // A voter the bot has never seen starts their tenure now.
    state
        .ledger
        .store()
        .record_first_seen(chat_id, q.from.id.0 as i64, Utc::now())
        .await?;

    let ballot = Ballot {
        chat_id,
        voter_id: q.from.id.0 as i64,
        voter_username: q.from.username.clone(),
        target: payload.target,
        kind: payload.kind,
        // The message that mentioned the target, when the card still points at it.
        evidence_msg_id: Some(
            message
                .reply_to_message()
                .map_or(message.id.0, |mention| mention.id.0) as i64,
        ),
    };

    let directory = TelegramDirectory::new(bot.clone(), state.ledger.store().clone());
    let decision = match state.ledger.cast(&ballot, &directory, Utc::now()).await {
        Ok(decision) => decision,
        Err(e) => {
            tracing::error!(chat_id, voter_id = ballot.voter_id, "Vote failed: {}", e);
            bot.answer_callback_query(q.id)
                .text("Something went wrong, please try again later.")
                .show_alert(true)
                .await?;
            return Ok(());
        }
    };

    let alert = match decision {
        VoteDecision::Accepted { stats, .. } => {
            let edited = bot
                .edit_message_text(message.chat.id, message.id, render::card(&ballot.target, stats))
                .parse_mode(ParseMode::Html)
                .reply_markup(render::vote_keyboard(&ballot.target))
                .await;
            if let Err(e) = edited {
                tracing::warn!(chat_id, "Failed to refresh reputation card: {}", e);
            }

            let text = match ballot.kind {
                VoteKind::Recommend => "Recommended",
                VoteKind::Blacklist => "Blacklisted",
            };
            bot.answer_callback_query(q.id).text(text).await?;
            return Ok(());
        }
        VoteDecision::VoterBanned => "You are banned from voting.".to_string(),
        VoteDecision::TooNew { required_days } => format!(
            "You need to be a member for {} days before voting.",
            required_days
        ),
        VoteDecision::TenureUnknown => {
            "Your membership could not be verified. Please try again later.".to_string()
        }
        VoteDecision::NotSubscribed { channel_id } => {
            format!("Join {} first, then vote again.", channel_reference(&bot, channel_id).await)
        }
        VoteDecision::Cooldown { retry_at } => format!(
            "You already voted in the last {}h. Try again after {} UTC.",
            state.config.vote_cooldown_hours,
            retry_at.format("%Y-%m-%d %H:%M")
        ),
    };

    bot.answer_callback_query(q.id)
        .text(alert)
        .show_alert(true)
        .await?;
    Ok(())
}

/// Public link for the channel when it has one, else its id.
async fn channel_reference(bot: &Bot, channel_id: i64) -> String {
    match bot.get_chat(ChatId(channel_id)).await {
        Ok(chat) => match chat.username() {
            Some(username) => format!("https://t.me/{}", username),
            None => chat
                .title()
                .map(str::to_string)
                .unwrap_or_else(|| format!("channel {}", channel_id)),
        },
        Err(e) => {
            tracing::warn!(channel_id, "Failed to look up forced channel: {}", e);
            format!("channel {}", channel_id)
        }
    }
}
