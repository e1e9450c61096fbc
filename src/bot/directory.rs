use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use teloxide::{
    prelude::*,
    types::{ChatMemberKind, UserId},
};

use crate::{
    error::{AppError, Result},
    services::ledger::{MemberDirectory, MemberRole},
    store::LedgerStore,
};

/// Member lookups backed by the bot API, with join dates from the store.
pub struct TelegramDirectory {
    bot: Bot,
    store: Arc<dyn LedgerStore>,
}

impl TelegramDirectory {
    pub fn new(bot: Bot, store: Arc<dyn LedgerStore>) -> Self {
        Self { bot, store }
    }
}

pub fn member_role(kind: &ChatMemberKind) -> MemberRole {
    if kind.is_owner() {
        MemberRole::Owner
    } else if kind.is_administrator() {
        MemberRole::Administrator
    } else if kind.is_banned() {
        MemberRole::Kicked
    } else if !kind.is_present() {
        MemberRole::Left
    } else {
        MemberRole::Member
    }
}

#[async_trait]
impl MemberDirectory for TelegramDirectory {
    async fn role(&self, chat_id: i64, user_id: i64) -> Result<MemberRole> {
        let user_id = u64::try_from(user_id)
            .map_err(|_| AppError::BadRequest(format!("Invalid user id {}", user_id)))?;

        let member = self
            .bot
            .get_chat_member(ChatId(chat_id), UserId(user_id))
            .await?;
        Ok(member_role(&member.kind))
    }

    async fn joined_at(&self, chat_id: i64, user_id: i64) -> Result<Option<DateTime<Utc>>> {
        self.store.joined_at(chat_id, user_id).await
    }
}
