use std::sync::Arc;

use crate::{
    error::Result,
    store::{LedgerStore, PgStore, SqliteStore},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Sqlite,
    Postgres,
}

impl Backend {
    /// `sqlite:` URLs select the embedded store; anything else is treated
    /// as a PostgreSQL connection string.
    pub fn from_url(database_url: &str) -> Self {
        if database_url.starts_with("sqlite:") {
            Backend::Sqlite
        } else {
            Backend::Postgres
        }
    }
}

/// Opens the configured store and brings its schema up to date.
pub async fn connect_store(database_url: &str, max_connections: u32) -> Result<Arc<dyn LedgerStore>> {
    match Backend::from_url(database_url) {
        Backend::Sqlite => {
            let store = SqliteStore::connect(database_url, max_connections).await?;
            store.migrate().await?;
            tracing::info!("SQLite store ready");
            Ok(Arc::new(store))
        }
        Backend::Postgres => {
            let store = PgStore::connect(database_url, max_connections).await?;
            store.migrate().await?;
            tracing::info!("PostgreSQL store ready");
            Ok(Arc::new(store))
        }
    }
}
