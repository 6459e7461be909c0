use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use uuid::Uuid;

use crate::{LockError, LockGuard, Locker, Release, Result};

/// Lower bound for the extension cadence so tiny leases don't spin.
const MIN_EXTENSION_INTERVAL: Duration = Duration::from_millis(10);

/// PostgreSQL-backed lock shared by every process using the same database.
///
/// A lock is a row in `placeorder_locks` holding the owner's token and lease
/// expiry. Taking the lock is a conditional upsert that only succeeds when no
/// row exists or the existing lease ran out. While held, a background task
/// pushes the expiry forward every third of the lease so a long run is never
/// preempted by its own lease.
#[derive(Clone)]
pub struct PostgresLocker {
    pool: PgPool,
}

impl PostgresLocker {
    /// Creates a new PostgreSQL locker.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }
}

#[async_trait]
impl Locker for PostgresLocker {
    async fn try_lock(&self, key: &str, lease: Duration) -> Result<LockGuard> {
        let token = Uuid::new_v4();
        let acquired: Option<Uuid> = sqlx::query_scalar(
            r#"
            INSERT INTO placeorder_locks (lock_key, token, expires_at)
            VALUES ($1, $2, now() + make_interval(secs => $3))
            ON CONFLICT (lock_key) DO UPDATE
                SET token = EXCLUDED.token, expires_at = EXCLUDED.expires_at
                WHERE placeorder_locks.expires_at <= now()
            RETURNING token
            "#,
        )
        .bind(key)
        .bind(token)
        .bind(lease.as_secs_f64())
        .fetch_optional(&self.pool)
        .await?;

        if acquired.is_none() {
            metrics::counter!("lock_contention_total", "backend" => "postgres").increment(1);
            return Err(LockError::Taken(key.to_string()));
        }

        let (stop_tx, stop_rx) = oneshot::channel();
        let (lost_tx, lost_rx) = watch::channel(false);
        let task = tokio::spawn(keep_alive(
            self.pool.clone(),
            key.to_string(),
            token,
            lease,
            stop_rx,
            lost_tx,
        ));

        tracing::debug!(key, %token, ?lease, "postgres lock acquired");
        Ok(LockGuard::new(
            key,
            PostgresRelease {
                pool: self.pool.clone(),
                token,
                stop: Some(stop_tx),
                task: Some(task),
                lost: lost_rx,
            },
        ))
    }
}

fn extension_interval(lease: Duration) -> Duration {
    (lease / 3).max(MIN_EXTENSION_INTERVAL)
}

async fn extend(pool: &PgPool, key: &str, token: Uuid, lease: Duration) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE placeorder_locks
        SET expires_at = now() + make_interval(secs => $3)
        WHERE lock_key = $1 AND token = $2
        "#,
    )
    .bind(key)
    .bind(token)
    .bind(lease.as_secs_f64())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

async fn keep_alive(
    pool: PgPool,
    key: String,
    token: Uuid,
    lease: Duration,
    mut stop: oneshot::Receiver<()>,
    lost: watch::Sender<bool>,
) {
    let mut ticker = tokio::time::interval(extension_interval(lease));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately; the lease was just written.
    ticker.tick().await;
    let mut extended_at = Instant::now();

    loop {
        tokio::select! {
            _ = &mut stop => break,
            _ = ticker.tick() => match extend(&pool, &key, token, lease).await {
                Ok(true) => {
                    extended_at = Instant::now();
                    tracing::trace!(%key, "lease extended");
                }
                Ok(false) => {
                    tracing::warn!(%key, "lease lost while held, stopping extension");
                    lost.send_replace(true);
                    break;
                }
                Err(e) => {
                    tracing::warn!(%key, error = %e, "failed to extend lease");
                    // Past the last written expiry another holder may take over.
                    if extended_at.elapsed() >= lease {
                        lost.send_replace(true);
                    }
                }
            },
        }
    }
}

struct PostgresRelease {
    pool: PgPool,
    token: Uuid,
    stop: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
    lost: watch::Receiver<bool>,
}

#[async_trait]
impl Release for PostgresRelease {
    async fn release(&mut self, key: &str) -> Result<()> {
        if let Some(stop) = self.stop.take() {
            // The task may already have exited after losing its lease.
            let _ = stop.send(());
        }
        if let Some(task) = self.task.take()
            && let Err(e) = task.await
        {
            tracing::warn!(key, error = %e, "lease extension task ended abnormally");
        }

        sqlx::query("DELETE FROM placeorder_locks WHERE lock_key = $1 AND token = $2")
            .bind(key)
            .bind(self.token)
            .execute(&self.pool)
            .await?;

        tracing::debug!(key, token = %self.token, "postgres lock released");
        Ok(())
    }

    fn is_lost(&self) -> bool {
        *self.lost.borrow()
    }
}

impl Drop for PostgresRelease {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_interval_is_a_third_of_the_lease() {
        assert_eq!(
            extension_interval(Duration::from_secs(30)),
            Duration::from_secs(10)
        );
    }

    #[test]
    fn test_extension_interval_has_a_floor() {
        assert_eq!(
            extension_interval(Duration::from_millis(3)),
            MIN_EXTENSION_INTERVAL
        );
    }
}
