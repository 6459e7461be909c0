use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;

use crate::{ContextStore, Result, Storable};

/// PostgreSQL-backed context store.
///
/// Each key maps to one JSONB row. Every store pushes the row's expiry to
/// `now() + ttl`; rows past their expiry are invisible to `get` and can be
/// reclaimed with [`PostgresContextStore::purge_expired`].
#[derive(Clone)]
pub struct PostgresContextStore {
    pool: PgPool,
    ttl: Duration,
}

impl PostgresContextStore {
    /// Creates a new PostgreSQL context store whose entries live for `ttl`.
    pub fn new(pool: PgPool, ttl: Duration) -> Self {
        Self { pool, ttl }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// The time-to-live applied on every store.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    /// Deletes all expired entries, returning how many were removed.
    pub async fn purge_expired(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM placeorder_contexts WHERE expires_at <= now()")
            .execute(&self.pool)
            .await?;
        let purged = result.rows_affected();
        if purged > 0 {
            tracing::info!(purged, "purged expired place-order contexts");
        }
        Ok(purged)
    }
}

#[async_trait]
impl<T: Storable> ContextStore<T> for PostgresContextStore {
    async fn store(&self, key: &str, value: &T) -> Result<()> {
        let payload = serde_json::to_value(value)?;

        sqlx::query(
            r#"
            INSERT INTO placeorder_contexts (context_key, payload, expires_at)
            VALUES ($1, $2, now() + make_interval(secs => $3))
            ON CONFLICT (context_key) DO UPDATE
                SET payload = EXCLUDED.payload, expires_at = EXCLUDED.expires_at
            "#,
        )
        .bind(key)
        .bind(payload)
        .bind(self.ttl.as_secs_f64())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<T>> {
        let payload: Option<serde_json::Value> = sqlx::query_scalar(
            "SELECT payload FROM placeorder_contexts WHERE context_key = $1 AND expires_at > now()",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        let Some(payload) = payload else {
            return Ok(None);
        };

        match serde_json::from_value(payload) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                metrics::counter!("context_store_decode_errors_total").increment(1);
                tracing::warn!(key, error = %e, "stored context could not be decoded, treating as missing");
                Ok(None)
            }
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM placeorder_contexts WHERE context_key = $1")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
