//! Coordinator serializing place-order operations per key.

use std::time::Duration;

use cart::Cart;
use context_store::ContextStore;
use lock::{LockGuard, Locker};
use tokio::time::Instant;

use crate::config::PlaceOrderConfig;
use crate::context::Context;
use crate::error::{PlaceOrderError, Result};
use crate::factory::ProcessFactory;

/// A blocking run never waits longer than this, whatever it is asked for.
const MAX_BLOCKING_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

/// Runs place-order processes under a per-key lock and persists them.
///
/// The coordinator keeps no per-key state of its own: the context store holds
/// the process, the locker decides who may advance it. Every mutation is
/// stored before the lock is released.
pub struct Coordinator<S, L>
where
    S: ContextStore<Context>,
    L: Locker,
{
    store: S,
    locker: L,
    factory: ProcessFactory,
    config: PlaceOrderConfig,
}

impl<S, L> Coordinator<S, L>
where
    S: ContextStore<Context>,
    L: Locker,
{
    /// Creates a new coordinator.
    pub fn new(store: S, locker: L, factory: ProcessFactory, config: PlaceOrderConfig) -> Self {
        Self {
            store,
            locker,
            factory,
            config,
        }
    }

    pub fn config(&self) -> &PlaceOrderConfig {
        &self.config
    }

    /// Starts a new attempt for `key`.
    ///
    /// An unfinished attempt stored under the same key is replaced. No state
    /// is run; the first refresh advances the new process.
    #[tracing::instrument(skip(self, cart, return_url), fields(cart_id = %cart.id))]
    pub async fn start(&self, key: &str, cart: Cart, return_url: &str) -> Result<Context> {
        let guard = self.try_lock(key).await?;
        let result = self.start_locked(&guard, cart, return_url).await;
        self.unlock(guard).await;
        result
    }

    async fn start_locked(
        &self,
        guard: &LockGuard,
        cart: Cart,
        return_url: &str,
    ) -> Result<Context> {
        if let Some(existing) = self.store.get(guard.key()).await?
            && !existing.is_final()
        {
            tracing::info!(
                superseded = %existing.uuid(),
                state = %existing.current_state_name(),
                "Replacing unfinished place order process"
            );
        }

        let context = self.factory.new_process(return_url, cart).into_context();
        self.store_held(guard, &context).await?;

        metrics::counter!("placeorder_started_total").increment(1);
        tracing::info!(process = %context.uuid(), "Place order process started");
        Ok(context)
    }

    /// Returns the last persisted context for `key`.
    pub async fn current(&self, key: &str) -> Result<Context> {
        self.store
            .get(key)
            .await?
            .ok_or(PlaceOrderError::NoProcess)
    }

    /// Returns true if an attempt for `key` exists that has not finished.
    pub async fn has_unfinished_process(&self, key: &str) -> Result<bool> {
        Ok(self
            .store
            .get(key)
            .await?
            .is_some_and(|ctx| !ctx.is_final()))
    }

    /// Advances the process of `key` by one state.
    ///
    /// Returns without doing anything when another request holds the lock;
    /// that request is already advancing the process.
    #[tracing::instrument(skip(self))]
    pub async fn run(&self, key: &str) -> Result<()> {
        let guard = match self.locker.try_lock(key, self.config.lock_lease).await {
            Ok(guard) => guard,
            Err(e) if e.is_taken() => {
                metrics::counter!("placeorder_lock_contention_total").increment(1);
                tracing::debug!("Process is being advanced by another request");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        let result = self.run_locked(&guard).await;
        self.unlock(guard).await;
        result
    }

    async fn run_locked(&self, guard: &LockGuard) -> Result<()> {
        let context = self.current(guard.key()).await?;
        if context.is_final() {
            return Ok(());
        }

        let mut process = self.factory.restore(context);
        process.run().await;
        self.store_held(guard, process.context()).await
    }

    /// Advances the process of `key` until it settles.
    ///
    /// Waits up to `timeout` for the lock, then runs states until the process
    /// is final, waits on the customer, or stops moving. The deadline is
    /// checked between states only; a running state is never interrupted.
    #[tracing::instrument(skip(self))]
    pub async fn run_blocking(&self, key: &str, timeout: Duration) -> Result<Context> {
        let started = Instant::now();
        let deadline = started + timeout.min(MAX_BLOCKING_TIMEOUT);

        let guard = self.wait_for_lock(key, deadline).await?;
        let result = self.run_until_settled(&guard, deadline).await;
        self.unlock(guard).await;

        metrics::histogram!("placeorder_run_blocking_duration_seconds")
            .record(started.elapsed().as_secs_f64());
        result
    }

    async fn wait_for_lock(&self, key: &str, deadline: Instant) -> Result<LockGuard> {
        loop {
            match self.locker.try_lock(key, self.config.lock_lease).await {
                Ok(guard) => return Ok(guard),
                Err(e) if e.is_taken() => {
                    let now = Instant::now();
                    if now >= deadline {
                        metrics::counter!("placeorder_lock_contention_total").increment(1);
                        return Err(PlaceOrderError::Locked);
                    }
                    tokio::time::sleep(self.config.lock_retry_interval.min(deadline - now)).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn run_until_settled(&self, guard: &LockGuard, deadline: Instant) -> Result<Context> {
        let mut process = self.factory.restore(self.current(guard.key()).await?);

        while !process.is_final() {
            if Instant::now() >= deadline {
                tracing::warn!(
                    state = %process.context().current_state_name(),
                    "Process did not settle before the deadline"
                );
                return Err(PlaceOrderError::Timeout(Box::new(process.into_context())));
            }

            let before = process.context().current_state_name();
            process.run().await;
            self.store_held(guard, process.context()).await?;

            let after = process.context().current_state_name();
            if after.is_suspension() || after == before {
                break;
            }
        }

        Ok(process.into_context())
    }

    /// Cancels the process of `key`, compensating its effects newest first.
    ///
    /// The process ends up `Canceled` even when compensations fail; those
    /// failures are returned after the canceled context was stored.
    #[tracing::instrument(skip(self))]
    pub async fn cancel(&self, key: &str) -> Result<Context> {
        if self.current(key).await?.is_final() {
            return Err(PlaceOrderError::AlreadyFinal);
        }

        let guard = self.try_lock(key).await?;
        let result = self.cancel_locked(&guard).await;
        self.unlock(guard).await;
        result
    }

    async fn cancel_locked(&self, guard: &LockGuard) -> Result<Context> {
        // The process may have moved on while the lock was contended.
        let context = self.current(guard.key()).await?;
        if context.is_final() {
            return Err(PlaceOrderError::AlreadyFinal);
        }

        let mut process = self.factory.restore(context);
        let rollback = process.rollback().await;
        process.cancel();
        self.store_held(guard, process.context()).await?;

        metrics::counter!("placeorder_canceled_total").increment(1);
        tracing::info!(process = %process.context().uuid(), "Place order process canceled");

        rollback?;
        Ok(process.into_context())
    }

    /// Removes whatever is stored for `key`.
    ///
    /// Fails with `NoProcess` when nothing readable was stored; the entry is
    /// deleted either way.
    #[tracing::instrument(skip(self))]
    pub async fn clear(&self, key: &str) -> Result<()> {
        let existing = self.store.get(key).await?;
        self.store.delete(key).await?;
        existing.map(|_| ()).ok_or(PlaceOrderError::NoProcess)
    }

    async fn try_lock(&self, key: &str) -> Result<LockGuard> {
        self.locker
            .try_lock(key, self.config.lock_lease)
            .await
            .map_err(|e| {
                if e.is_taken() {
                    metrics::counter!("placeorder_lock_contention_total").increment(1);
                }
                e.into()
            })
    }

    /// Persists `context` unless the lease behind `guard` was lost meanwhile.
    async fn store_held(&self, guard: &LockGuard, context: &Context) -> Result<()> {
        if guard.is_lost() {
            metrics::counter!("placeorder_lease_lost_total").increment(1);
            tracing::warn!(
                key = %guard.key(),
                state = %context.current_state_name(),
                "Lock lease lost, dropping unsaved progress"
            );
            return Err(PlaceOrderError::LeaseLost);
        }
        self.store.store(guard.key(), context).await?;
        Ok(())
    }

    async fn unlock(&self, guard: LockGuard) {
        let key = guard.key().to_string();
        if let Err(e) = guard.unlock().await {
            tracing::warn!(key = %key, error = %e, "Failed to release place order lock");
        }
    }
}
