use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{
    PgPool, Row,
    postgres::{PgPoolOptions, PgRow},
};
use std::time::Duration;

use super::{LedgerStore, WELCOME_KEY};
use crate::{
    error::Result,
    models::{
        BanRecord, ChatSettings, LedgerTotals, NewVote, RatingStats, VoteKey, VoteKind,
        VoteReceipt, user_id_from_key,
    },
    services::ledger::IncrementPolicy,
};

/// Networked store.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(1)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .max_lifetime(Duration::from_secs(1800))
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations/postgres").run(&self.pool).await?;
        Ok(())
    }
}

fn ban_from_row(row: &PgRow) -> Result<BanRecord> {
    Ok(BanRecord {
        ban_key: row.try_get("ban_key")?,
        user_id: row.try_get("user_id")?,
        username: row.try_get("username")?,
        banned_at: row.try_get("banned_at")?,
    })
}

fn settings_from_row(row: &PgRow) -> Result<ChatSettings> {
    Ok(ChatSettings {
        chat_id: row.try_get("chat_id")?,
        min_join_days: row.try_get("min_join_days")?,
        force_channel_id: row.try_get("force_channel_id")?,
    })
}

#[async_trait]
impl LedgerStore for PgStore {
    async fn last_vote_at(&self, key: &VoteKey) -> Result<Option<DateTime<Utc>>> {
        let cast_at = sqlx::query_scalar(
            r#"
            SELECT cast_at FROM votes
            WHERE chat_id = $1 AND voter_id = $2 AND target = $3 AND vote_type = $4
            "#,
        )
        .bind(key.chat_id)
        .bind(key.voter_id)
        .bind(&key.target)
        .bind(key.kind.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(cast_at)
    }

    async fn record_vote(&self, vote: &NewVote, policy: IncrementPolicy) -> Result<VoteReceipt> {
        let target = vote.target.key();
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO votes (chat_id, voter_id, target, vote_type, cast_at, evidence_msg_id, voter_username)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (chat_id, voter_id, target, vote_type) DO NOTHING
            "#,
        )
        .bind(vote.chat_id)
        .bind(vote.voter_id)
        .bind(&target)
        .bind(vote.kind.as_str())
        .bind(vote.cast_at)
        .bind(vote.evidence_msg_id)
        .bind(&vote.voter_username)
        .execute(&mut *tx)
        .await?
        .rows_affected()
            == 1;

        if !inserted {
            sqlx::query(
                r#"
                UPDATE votes SET cast_at = $5, evidence_msg_id = $6,
                    voter_username = COALESCE($7, voter_username)
                WHERE chat_id = $1 AND voter_id = $2 AND target = $3 AND vote_type = $4
                "#,
            )
            .bind(vote.chat_id)
            .bind(vote.voter_id)
            .bind(&target)
            .bind(vote.kind.as_str())
            .bind(vote.cast_at)
            .bind(vote.evidence_msg_id)
            .bind(&vote.voter_username)
            .execute(&mut *tx)
            .await?;
        }

        let counted = policy.counts(inserted);
        if counted {
            let increment = match vote.kind {
                VoteKind::Recommend => {
                    r#"
                    INSERT INTO ratings (scope_id, target, username, recommend_count, blacklist_count)
                    VALUES ($1, $2, $3, 1, 0)
                    ON CONFLICT (scope_id, target) DO UPDATE SET
                        recommend_count = ratings.recommend_count + 1,
                        username = COALESCE(EXCLUDED.username, ratings.username)
                    "#
                }
                VoteKind::Blacklist => {
                    r#"
                    INSERT INTO ratings (scope_id, target, username, recommend_count, blacklist_count)
                    VALUES ($1, $2, $3, 0, 1)
                    ON CONFLICT (scope_id, target) DO UPDATE SET
                        blacklist_count = ratings.blacklist_count + 1,
                        username = COALESCE(EXCLUDED.username, ratings.username)
                    "#
                }
            };
            sqlx::query(increment)
                .bind(vote.scope_id)
                .bind(&target)
                .bind(vote.target.username())
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(VoteReceipt { inserted, counted })
    }

    async fn rating(&self, target_key: &str, scope_id: Option<i64>) -> Result<RatingStats> {
        let row = match scope_id {
            Some(scope_id) => {
                sqlx::query(
                    "SELECT recommend_count, blacklist_count FROM ratings WHERE scope_id = $1 AND target = $2",
                )
                .bind(scope_id)
                .bind(target_key)
                .fetch_optional(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    r#"
                    SELECT COALESCE(SUM(recommend_count), 0)::BIGINT AS recommend_count,
                           COALESCE(SUM(blacklist_count), 0)::BIGINT AS blacklist_count
                    FROM ratings WHERE target = $1
                    "#,
                )
                .bind(target_key)
                .fetch_optional(&self.pool)
                .await?
            }
        };

        let Some(row) = row else {
            return Ok(RatingStats::default());
        };

        Ok(RatingStats::new(
            row.try_get("recommend_count")?,
            row.try_get("blacklist_count")?,
        ))
    }

    async fn resolve_handle(&self, handle: &str) -> Result<Option<i64>> {
        let voter_id: Option<i64> = sqlx::query_scalar(
            "SELECT voter_id FROM votes WHERE voter_username = $1 ORDER BY cast_at DESC LIMIT 1",
        )
        .bind(handle)
        .fetch_optional(&self.pool)
        .await?;
        if voter_id.is_some() {
            return Ok(voter_id);
        }

        let key: Option<String> = sqlx::query_scalar(
            "SELECT target FROM ratings WHERE username = $1 AND target LIKE 'id:%' LIMIT 1",
        )
        .bind(handle)
        .fetch_optional(&self.pool)
        .await?;
        Ok(key.as_deref().and_then(user_id_from_key))
    }

    async fn clear_user_data(&self, target_keys: &[String], voter_id: Option<i64>) -> Result<u64> {
        let mut tx = self.pool.begin().await?;

        let mut removed = sqlx::query("DELETE FROM ratings WHERE target = ANY($1)")
            .bind(target_keys)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        removed += sqlx::query("DELETE FROM votes WHERE target = ANY($1) OR voter_id = $2")
            .bind(target_keys)
            .bind(voter_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;
        Ok(removed)
    }

    async fn totals(&self) -> Result<LedgerTotals> {
        let row = sqlx::query(
            r#"
            SELECT
                (SELECT COUNT(DISTINCT target) FROM ratings) AS rated_users,
                (SELECT COUNT(*) FROM votes) AS votes
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(LedgerTotals {
            rated_users: row.try_get("rated_users")?,
            votes: row.try_get("votes")?,
        })
    }

    async fn list_admins(&self) -> Result<Vec<i64>> {
        let admins = sqlx::query_scalar("SELECT user_id FROM admins ORDER BY user_id")
            .fetch_all(&self.pool)
            .await?;
        Ok(admins)
    }

    async fn add_admin(&self, user_id: i64) -> Result<bool> {
        let result = sqlx::query("INSERT INTO admins (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn remove_admin(&self, user_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM admins WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_authorized_chats(&self) -> Result<Vec<i64>> {
        let chats = sqlx::query_scalar("SELECT chat_id FROM allowed_chats ORDER BY chat_id")
            .fetch_all(&self.pool)
            .await?;
        Ok(chats)
    }

    async fn authorize_chat(&self, chat_id: i64) -> Result<bool> {
        let result = sqlx::query(
            "INSERT INTO allowed_chats (chat_id) VALUES ($1) ON CONFLICT (chat_id) DO NOTHING",
        )
        .bind(chat_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn revoke_chat(&self, chat_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM allowed_chats WHERE chat_id = $1")
            .bind(chat_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn ban(&self, record: &BanRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO banned_users (ban_key, user_id, username, banned_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (ban_key) DO UPDATE SET
                user_id = EXCLUDED.user_id,
                username = COALESCE(EXCLUDED.username, banned_users.username),
                banned_at = EXCLUDED.banned_at
            "#,
        )
        .bind(&record.ban_key)
        .bind(record.user_id)
        .bind(&record.username)
        .bind(record.banned_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn unban(&self, ban_keys: &[String]) -> Result<bool> {
        let result = sqlx::query("DELETE FROM banned_users WHERE ban_key = ANY($1)")
            .bind(ban_keys)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn is_banned(&self, ban_keys: &[String]) -> Result<bool> {
        let banned: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM banned_users WHERE ban_key = ANY($1))",
        )
        .bind(ban_keys)
        .fetch_one(&self.pool)
        .await?;
        Ok(banned)
    }

    async fn list_bans(&self) -> Result<Vec<BanRecord>> {
        let rows = sqlx::query(
            "SELECT ban_key, user_id, username, banned_at FROM banned_users ORDER BY banned_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(ban_from_row).collect()
    }

    async fn welcome_message(&self) -> Result<Option<String>> {
        let text = sqlx::query_scalar("SELECT value FROM bot_settings WHERE key = $1")
            .bind(WELCOME_KEY)
            .fetch_optional(&self.pool)
            .await?;
        Ok(text)
    }

    async fn set_welcome_message(&self, text: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO bot_settings (key, value) VALUES ($1, $2)
            ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value
            "#,
        )
        .bind(WELCOME_KEY)
        .bind(text)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn chat_settings(&self, chat_id: i64) -> Result<Option<ChatSettings>> {
        let row = sqlx::query(
            "SELECT chat_id, min_join_days, force_channel_id FROM chat_settings WHERE chat_id = $1",
        )
        .bind(chat_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(settings_from_row).transpose()
    }

    async fn set_chat_settings(&self, settings: &ChatSettings) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO chat_settings (chat_id, min_join_days, force_channel_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (chat_id) DO UPDATE SET
                min_join_days = EXCLUDED.min_join_days,
                force_channel_id = EXCLUDED.force_channel_id
            "#,
        )
        .bind(settings.chat_id)
        .bind(settings.min_join_days)
        .bind(settings.force_channel_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_chat_settings(&self) -> Result<Vec<ChatSettings>> {
        let rows = sqlx::query(
            "SELECT chat_id, min_join_days, force_channel_id FROM chat_settings ORDER BY chat_id",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(settings_from_row).collect()
    }

    async fn record_join(&self, chat_id: i64, user_id: i64, joined_at: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO member_joins (chat_id, user_id, joined_at) VALUES ($1, $2, $3)
            ON CONFLICT (chat_id, user_id) DO UPDATE SET joined_at = EXCLUDED.joined_at
            "#,
        )
        .bind(chat_id)
        .bind(user_id)
        .bind(joined_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn record_first_seen(
        &self,
        chat_id: i64,
        user_id: i64,
        seen_at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO member_joins (chat_id, user_id, joined_at) VALUES ($1, $2, $3)
            ON CONFLICT (chat_id, user_id) DO NOTHING
            "#,
        )
        .bind(chat_id)
        .bind(user_id)
        .bind(seen_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn joined_at(&self, chat_id: i64, user_id: i64) -> Result<Option<DateTime<Utc>>> {
        let joined_at = sqlx::query_scalar(
            "SELECT joined_at FROM member_joins WHERE chat_id = $1 AND user_id = $2",
        )
        .bind(chat_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(joined_at)
    }
}
