//! Persistence behind the ledger.
//!
//! The ledger and the admin service only talk to [`LedgerStore`]; the
//! embedded ([`SqliteStore`]) and networked ([`PgStore`]) adapters differ in
//! SQL dialect and timestamp encoding, never in behaviour.

pub mod postgres;
pub mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    error::Result,
    models::{BanRecord, ChatSettings, LedgerTotals, NewVote, RatingStats, VoteKey, VoteReceipt},
    services::ledger::IncrementPolicy,
};

pub use postgres::PgStore;
pub use sqlite::SqliteStore;

pub const WELCOME_KEY: &str = "welcome";

#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Timestamp of the stored vote for exactly this key, if any.
    async fn last_vote_at(&self, key: &VoteKey) -> Result<Option<DateTime<Utc>>>;

    /// Upserts the vote row and, in the same transaction, bumps the aggregate
    /// counter when `policy` says the vote counts.
    async fn record_vote(&self, vote: &NewVote, policy: IncrementPolicy) -> Result<VoteReceipt>;

    /// Counters for a target. `None` sums every scope.
    async fn rating(&self, target_key: &str, scope_id: Option<i64>) -> Result<RatingStats>;

    /// The user id most recently seen under `handle`, either as a voter or
    /// as the resolved user behind a rating.
    async fn resolve_handle(&self, handle: &str) -> Result<Option<i64>>;

    /// Removes aggregates and votes naming any of `target_keys`, plus every
    /// vote cast by `voter_id`. Returns the number of rows removed.
    async fn clear_user_data(&self, target_keys: &[String], voter_id: Option<i64>) -> Result<u64>;

    async fn totals(&self) -> Result<LedgerTotals>;

    async fn list_admins(&self) -> Result<Vec<i64>>;
    async fn add_admin(&self, user_id: i64) -> Result<bool>;
    async fn remove_admin(&self, user_id: i64) -> Result<bool>;

    async fn list_authorized_chats(&self) -> Result<Vec<i64>>;
    async fn authorize_chat(&self, chat_id: i64) -> Result<bool>;
    async fn revoke_chat(&self, chat_id: i64) -> Result<bool>;

    async fn ban(&self, record: &BanRecord) -> Result<()>;
    async fn unban(&self, ban_keys: &[String]) -> Result<bool>;
    async fn is_banned(&self, ban_keys: &[String]) -> Result<bool>;
    async fn list_bans(&self) -> Result<Vec<BanRecord>>;

    async fn welcome_message(&self) -> Result<Option<String>>;
    async fn set_welcome_message(&self, text: &str) -> Result<()>;

    async fn chat_settings(&self, chat_id: i64) -> Result<Option<ChatSettings>>;
    async fn set_chat_settings(&self, settings: &ChatSettings) -> Result<()>;
    async fn list_chat_settings(&self) -> Result<Vec<ChatSettings>>;

    /// Records (or resets, on rejoin) when a user joined a chat.
    async fn record_join(&self, chat_id: i64, user_id: i64, joined_at: DateTime<Utc>) -> Result<()>;
    /// Records when a user was first seen in a chat. An existing join date
    /// is kept.
    async fn record_first_seen(
        &self,
        chat_id: i64,
        user_id: i64,
        seen_at: DateTime<Utc>,
    ) -> Result<()>;
    async fn joined_at(&self, chat_id: i64, user_id: i64) -> Result<Option<DateTime<Utc>>>;
}
