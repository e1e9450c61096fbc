use std::{collections::HashSet, sync::Arc};
use tokio::sync::RwLock;

use crate::{error::Result, store::LedgerStore};

/// Read-through copy of the admin and authorized-chat tables.
///
/// Never authoritative: it is filled from the store at startup and must be
/// reloaded after every write to either table.
#[derive(Clone)]
pub struct AccessCache {
    owner_id: i64,
    admins: Arc<RwLock<HashSet<i64>>>,
    chats: Arc<RwLock<HashSet<i64>>>,
}

impl AccessCache {
    pub fn new(owner_id: i64) -> Self {
        Self {
            owner_id,
            admins: Arc::new(RwLock::new(HashSet::new())),
            chats: Arc::new(RwLock::new(HashSet::new())),
        }
    }

    pub fn owner_id(&self) -> i64 {
        self.owner_id
    }

    pub async fn reload(&self, store: &dyn LedgerStore) -> Result<()> {
        let admins: HashSet<i64> = store.list_admins().await?.into_iter().collect();
        let chats: HashSet<i64> = store.list_authorized_chats().await?.into_iter().collect();

        tracing::debug!(
            admins = admins.len(),
            chats = chats.len(),
            "Access cache reloaded"
        );

        *self.admins.write().await = admins;
        *self.chats.write().await = chats;
        Ok(())
    }

    pub async fn is_admin(&self, user_id: i64) -> bool {
        user_id == self.owner_id || self.admins.read().await.contains(&user_id)
    }

    pub async fn is_authorized_chat(&self, chat_id: i64) -> bool {
        self.chats.read().await.contains(&chat_id)
    }

    pub async fn admins(&self) -> Vec<i64> {
        let mut admins: Vec<i64> = self.admins.read().await.iter().copied().collect();
        admins.sort_unstable();
        admins
    }

    pub async fn authorized_chats(&self) -> Vec<i64> {
        let mut chats: Vec<i64> = self.chats.read().await.iter().copied().collect();
        chats.sort_unstable();
        chats
    }
}
