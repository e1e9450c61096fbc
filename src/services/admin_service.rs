//! Administrative operations shared by the chat console and the dashboard.

use chrono::Utc;
use std::sync::Arc;

use crate::{
    error::{AppError, Result},
    models::{BanRecord, ChatSettings, LedgerTotals, Target},
    services::access::AccessCache,
    store::LedgerStore,
};

/// Used when the welcome row has been removed from the settings table.
pub const DEFAULT_WELCOME: &str = "<b>Reputation</b>\n\nMention @someone to see their reputation.\nRecommend +1, Blacklist -1.\nOne vote per person and type every 24h.";

#[derive(Clone)]
pub struct AdminService {
    store: Arc<dyn LedgerStore>,
    access: AccessCache,
}

impl AdminService {
    pub fn new(store: Arc<dyn LedgerStore>, access: AccessCache) -> Self {
        Self { store, access }
    }

    /// Persists the owner as an admin and fills the access cache.
    pub async fn bootstrap(&self) -> Result<()> {
        let owner_id = self.access.owner_id();
        if self.store.add_admin(owner_id).await? {
            tracing::info!(owner_id, "Owner registered as admin");
        }
        self.access.reload(self.store.as_ref()).await
    }

    pub fn access(&self) -> &AccessCache {
        &self.access
    }

    async fn reload(&self) -> Result<()> {
        self.access.reload(self.store.as_ref()).await
    }

    pub async fn authorize_chat(&self, chat_id: i64) -> Result<bool> {
        let changed = self.store.authorize_chat(chat_id).await?;
        self.reload().await?;
        tracing::info!(chat_id, changed, "Chat authorized");
        Ok(changed)
    }

    pub async fn revoke_chat(&self, chat_id: i64) -> Result<bool> {
        let changed = self.store.revoke_chat(chat_id).await?;
        self.reload().await?;
        tracing::info!(chat_id, changed, "Chat revoked");
        Ok(changed)
    }

    pub async fn add_admin(&self, user_id: i64) -> Result<bool> {
        let changed = self.store.add_admin(user_id).await?;
        self.reload().await?;
        tracing::info!(user_id, changed, "Admin added");
        Ok(changed)
    }

    pub async fn remove_admin(&self, user_id: i64) -> Result<bool> {
        if user_id == self.access.owner_id() {
            return Err(AppError::Validation(
                "The owner cannot be removed".to_string(),
            ));
        }
        let changed = self.store.remove_admin(user_id).await?;
        self.reload().await?;
        tracing::info!(user_id, changed, "Admin removed");
        Ok(changed)
    }

    pub async fn ban_user(&self, target: &Target) -> Result<BanRecord> {
        if target.user_id() == Some(self.access.owner_id()) {
            return Err(AppError::Validation("The owner cannot be banned".to_string()));
        }
        let record = BanRecord::new(target, Utc::now());
        self.store.ban(&record).await?;
        tracing::info!(ban_key = %record.ban_key, "User banned");
        Ok(record)
    }

    pub async fn unban_user(&self, target: &Target) -> Result<bool> {
        let changed = self.store.unban(&target.keys()).await?;
        tracing::info!(target_user = %target, changed, "User unbanned");
        Ok(changed)
    }

    pub async fn is_banned(&self, user_id: i64, username: Option<&str>) -> Result<bool> {
        self.store
            .is_banned(&Target::user(user_id, username).keys())
            .await
    }

    pub async fn list_bans(&self) -> Result<Vec<BanRecord>> {
        self.store.list_bans().await
    }

    /// Removes the target's aggregates and every vote naming them as voter
    /// or target. A bare handle is first resolved to the user behind it so
    /// both key spaces are cleared.
    pub async fn clear_user_data(&self, target: &Target) -> Result<u64> {
        let target = match target {
            Target::Handle { handle } => match self.store.resolve_handle(handle).await? {
                Some(user_id) => Target::user(user_id, Some(handle)),
                None => target.clone(),
            },
            Target::User { .. } => target.clone(),
        };
        let removed = self
            .store
            .clear_user_data(&target.keys(), target.user_id())
            .await?;
        tracing::info!(target_user = %target, removed, "User data cleared");
        Ok(removed)
    }

    pub async fn welcome_message(&self) -> Result<String> {
        Ok(self
            .store
            .welcome_message()
            .await?
            .unwrap_or_else(|| DEFAULT_WELCOME.to_string()))
    }

    pub async fn set_welcome_message(&self, text: &str) -> Result<()> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AppError::Validation(
                "Welcome message cannot be empty".to_string(),
            ));
        }
        self.store.set_welcome_message(text).await?;
        tracing::info!("Welcome message updated");
        Ok(())
    }

    pub async fn chat_settings(&self, chat_id: i64) -> Result<ChatSettings> {
        Ok(self
            .store
            .chat_settings(chat_id)
            .await?
            .unwrap_or_else(|| ChatSettings::unrestricted(chat_id)))
    }

    pub async fn set_chat_settings(&self, settings: ChatSettings) -> Result<ChatSettings> {
        if settings.min_join_days < 0 {
            return Err(AppError::Validation(
                "min_join_days cannot be negative".to_string(),
            ));
        }
        self.store.set_chat_settings(&settings).await?;
        tracing::info!(
            chat_id = settings.chat_id,
            min_join_days = settings.min_join_days,
            force_channel_id = settings.force_channel_id,
            "Chat settings updated"
        );
        Ok(settings)
    }

    /// Updates one field of the chat's settings, keeping the other.
    pub async fn set_min_join_days(&self, chat_id: i64, days: i32) -> Result<ChatSettings> {
        let mut settings = self.chat_settings(chat_id).await?;
        settings.min_join_days = days;
        self.set_chat_settings(settings).await
    }

    pub async fn set_force_channel(&self, chat_id: i64, channel_id: i64) -> Result<ChatSettings> {
        let mut settings = self.chat_settings(chat_id).await?;
        settings.force_channel_id = channel_id;
        self.set_chat_settings(settings).await
    }

    pub async fn list_chat_settings(&self) -> Result<Vec<ChatSettings>> {
        self.store.list_chat_settings().await
    }

    pub async fn totals(&self) -> Result<LedgerTotals> {
        self.store.totals().await
    }
}
