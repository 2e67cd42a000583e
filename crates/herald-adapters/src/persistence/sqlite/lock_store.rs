use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use herald_ports::context::Context;
use herald_ports::error::PortError;
use herald_ports::outbound::LockStore;

use super::{SqliteLockStore, CALL_TIMEOUT};

fn expire_on(now: i64, ttl: Duration) -> i64 {
    now.saturating_add(i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX))
}

#[async_trait]
impl LockStore for SqliteLockStore {
    async fn try_lock(&self, ctx: &Context, key: &str, ttl: Duration) -> Result<bool, PortError> {
        // an expired lock that never got a value was abandoned by a failed
        // delivery and may be taken over; a recorded entry never is
        let sql = format!(
            "INSERT INTO {0} (namespace, id, expire_on) VALUES (?, ?, ?)
             ON CONFLICT (namespace, id) DO UPDATE SET expire_on = excluded.expire_on
             WHERE {0}.value IS NULL AND {0}.expire_on < ?",
            self.table
        );
        let now = Utc::now().timestamp();
        let result = ctx
            .run(CALL_TIMEOUT, async {
                sqlx::query(&sql)
                    .bind(&self.namespace)
                    .bind(key)
                    .bind(expire_on(now, ttl))
                    .bind(now)
                    .execute(&self.pool)
                    .await
                    .map_err(|e| PortError::Persistence(e.to_string()))
            })
            .await
            .inspect_err(|err| {
                tracing::error!(
                    error = %err,
                    namespace = %self.namespace,
                    key,
                    "failed to lock the key"
                );
            })?;

        Ok(result.rows_affected() == 1)
    }

    async fn set(
        &self,
        ctx: &Context,
        key: &str,
        ttl: Duration,
        value: &str,
    ) -> Result<(), PortError> {
        let sql = format!(
            "INSERT INTO {} (namespace, id, value, expire_on) VALUES (?, ?, ?, ?)
             ON CONFLICT (namespace, id) DO UPDATE
             SET value = excluded.value, expire_on = excluded.expire_on",
            self.table
        );
        ctx.run(CALL_TIMEOUT, async {
            sqlx::query(&sql)
                .bind(&self.namespace)
                .bind(key)
                .bind(value)
                .bind(expire_on(Utc::now().timestamp(), ttl))
                .execute(&self.pool)
                .await
                .map_err(|e| PortError::Persistence(e.to_string()))
        })
        .await
        .inspect_err(|err| {
            tracing::error!(
                error = %err,
                namespace = %self.namespace,
                key,
                "failed to set the key"
            );
        })?;

        Ok(())
    }

    async fn get(&self, ctx: &Context, key: &str) -> Result<Option<String>, PortError> {
        let sql = format!(
            "SELECT value FROM {} WHERE namespace = ? AND id = ?",
            self.table
        );
        let row: Option<(Option<String>,)> = ctx
            .run(CALL_TIMEOUT, async {
                sqlx::query_as(&sql)
                    .bind(&self.namespace)
                    .bind(key)
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(|e| PortError::Persistence(e.to_string()))
            })
            .await
            .inspect_err(|err| {
                tracing::error!(
                    error = %err,
                    namespace = %self.namespace,
                    key,
                    "failed to get the key"
                );
            })?;

        Ok(row.and_then(|(value,)| value))
    }

    fn with_namespace(&self, namespace: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            ..self.clone()
        }
    }
}
