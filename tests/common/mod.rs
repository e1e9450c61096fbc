#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reputation_bot::{
    AppState,
    config::Config,
    error::{AppError, Result},
    services::{
        access::AccessCache,
        admin_service::AdminService,
        ledger::{IncrementPolicy, Ledger, LedgerPolicy, MemberDirectory, MemberRole, RatingScope},
    },
    store::{LedgerStore, SqliteStore},
};
use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};
use tempfile::TempDir;

pub const OWNER_ID: i64 = 1000;
pub const JWT_SECRET: &str = "test-secret";
pub const PASSWORD: &str = "hunter2";

/// A migrated SQLite database in a temporary directory. Keep the `TempDir`
/// alive for as long as the store is used.
pub async fn sqlite_store() -> (Arc<dyn LedgerStore>, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteStore::open(&dir.path().join("ledger.db")).await.unwrap();
    store.migrate().await.unwrap();
    (Arc::new(store), dir)
}

pub fn policy(increment: IncrementPolicy, scope: RatingScope) -> LedgerPolicy {
    LedgerPolicy {
        increment,
        scope,
        ..LedgerPolicy::default()
    }
}

pub fn test_config() -> Config {
    Config {
        database_url: "sqlite::memory:".to_string(),
        db_max_connections: 5,
        bot_token: "123:abc".to_string(),
        owner_id: OWNER_ID,
        jwt_secret: JWT_SECRET.to_string(),
        dashboard_password: PASSWORD.to_string(),
        host: "127.0.0.1".to_string(),
        port: 0,
        allowed_origins: vec!["http://localhost:8080".to_string()],
        rating_scope: RatingScope::PerChat,
        increment_policy: IncrementPolicy::EveryAcceptedVote,
        vote_cooldown_hours: 24,
        max_mentions_per_message: 3,
    }
}

pub async fn app_state(store: Arc<dyn LedgerStore>) -> AppState {
    let config = test_config();
    let ledger = Ledger::new(store.clone(), config.ledger_policy());
    let admin = AdminService::new(store, AccessCache::new(config.owner_id));
    admin.bootstrap().await.unwrap();
    AppState {
        ledger,
        admin,
        config: Arc::new(config),
    }
}

/// In-memory stand-in for the chat platform's member lookups.
#[derive(Default)]
pub struct FakeDirectory {
    roles: HashMap<(i64, i64), MemberRole>,
    joins: HashMap<(i64, i64), DateTime<Utc>>,
    unreachable: HashSet<i64>,
}

impl FakeDirectory {
    pub fn with_role(mut self, chat_id: i64, user_id: i64, role: MemberRole) -> Self {
        self.roles.insert((chat_id, user_id), role);
        self
    }

    pub fn with_join(mut self, chat_id: i64, user_id: i64, at: DateTime<Utc>) -> Self {
        self.joins.insert((chat_id, user_id), at);
        self
    }

    /// Every lookup in `chat_id` fails.
    pub fn unreachable(mut self, chat_id: i64) -> Self {
        self.unreachable.insert(chat_id);
        self
    }

    fn check(&self, chat_id: i64) -> Result<()> {
        if self.unreachable.contains(&chat_id) {
            return Err(AppError::Internal(format!("chat {} unreachable", chat_id)));
        }
        Ok(())
    }
}

#[async_trait]
impl MemberDirectory for FakeDirectory {
    async fn role(&self, chat_id: i64, user_id: i64) -> Result<MemberRole> {
        self.check(chat_id)?;
        Ok(self
            .roles
            .get(&(chat_id, user_id))
            .copied()
            .unwrap_or(MemberRole::Left))
    }

    async fn joined_at(&self, chat_id: i64, user_id: i64) -> Result<Option<DateTime<Utc>>> {
        self.check(chat_id)?;
        Ok(self.joins.get(&(chat_id, user_id)).copied())
    }
}

/// Reports every user as a plain member and reads join dates from the store,
/// as the chat adapter does.
pub struct StoreDirectory(pub Arc<dyn LedgerStore>);

#[async_trait]
impl MemberDirectory for StoreDirectory {
    async fn role(&self, _chat_id: i64, _user_id: i64) -> Result<MemberRole> {
        Ok(MemberRole::Member)
    }

    async fn joined_at(&self, chat_id: i64, user_id: i64) -> Result<Option<DateTime<Utc>>> {
        self.0.joined_at(chat_id, user_id).await
    }
}
