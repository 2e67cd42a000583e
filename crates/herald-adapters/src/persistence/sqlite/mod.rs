mod lock_store;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use herald_ports::error::PortError;

/// Per-call budget for store operations.
const CALL_TIMEOUT: Duration = Duration::from_secs(1);

/// Lock store backed by one SQLite table keyed on `(namespace, id)`.
///
/// `expire_on` is recorded for every entry but never enforced on read;
/// [`SqliteLockStore::purge_expired`] is what bounds the table's growth.
#[derive(Clone)]
pub struct SqliteLockStore {
    pool: SqlitePool,
    table: Arc<str>,
    namespace: String,
}

impl SqliteLockStore {
    pub async fn connect(url: &str, table: &str) -> Result<Self, PortError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(url)
            .await
            .map_err(|e| PortError::Connection(e.to_string()))?;
        Self::new(pool, table).await
    }

    pub async fn new(pool: SqlitePool, table: &str) -> Result<Self, PortError> {
        if !is_identifier(table) {
            return Err(PortError::Persistence(format!("invalid table name: {table:?}")));
        }
        let store = Self {
            pool,
            table: Arc::from(table),
            namespace: String::new(),
        };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), PortError> {
        sqlx::query(&format!(
            "CREATE TABLE IF NOT EXISTS {} (
                namespace TEXT NOT NULL,
                id TEXT NOT NULL,
                value TEXT,
                expire_on INTEGER NOT NULL,
                PRIMARY KEY (namespace, id)
            )",
            self.table
        ))
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Persistence(e.to_string()))?;

        sqlx::query(&format!(
            "CREATE INDEX IF NOT EXISTS idx_{0}_expire_on ON {0}(expire_on)",
            self.table
        ))
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Persistence(e.to_string()))?;

        Ok(())
    }

    /// Deletes every entry, in every namespace, that expired before `now`.
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, PortError> {
        let result = sqlx::query(&format!("DELETE FROM {} WHERE expire_on < ?", self.table))
            .bind(now.timestamp())
            .execute(&self.pool)
            .await
            .map_err(|e| PortError::Persistence(e.to_string()))?;
        Ok(result.rows_affected())
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
