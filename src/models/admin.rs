use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::Target;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BanRecord {
    pub ban_key: String,
    pub user_id: Option<i64>,
    pub username: Option<String>,
    pub banned_at: DateTime<Utc>,
}

impl BanRecord {
    pub fn new(target: &Target, banned_at: DateTime<Utc>) -> Self {
        Self {
            ban_key: target.key(),
            user_id: target.user_id(),
            username: target.username().map(str::to_string),
            banned_at,
        }
    }
}

/// Per-chat voting policy. Zero disables a restriction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSettings {
    pub chat_id: i64,
    pub min_join_days: i32,
    pub force_channel_id: i64,
}

impl ChatSettings {
    pub fn unrestricted(chat_id: i64) -> Self {
        Self {
            chat_id,
            ..Default::default()
        }
    }
}

// Dashboard requests
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub user_id: i64,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub chat_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct AdminRequest {
    pub user_id: i64,
}

#[derive(Debug, Validate, Deserialize)]
pub struct BanRequest {
    #[validate(length(min = 1, max = 64))]
    pub target: String,
}

#[derive(Debug, Validate, Deserialize)]
pub struct WelcomeRequest {
    #[validate(length(min = 1, max = 4096))]
    pub text: String,
}

#[derive(Debug, Validate, Deserialize)]
pub struct ChatSettingsRequest {
    #[validate(range(min = 0, max = 3650))]
    pub min_join_days: i32,
    pub force_channel_id: i64,
}
