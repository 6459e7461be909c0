use std::time::Duration;

use async_trait::async_trait;

use crate::Result;

/// Core trait for lock implementations.
#[async_trait]
pub trait Locker: Send + Sync {
    /// Tries to take the lock for `key` without waiting.
    ///
    /// Fails with `LockError::Taken` if another holder's lease is still active.
    /// The lease bounds how long the lock survives a holder that never unlocks.
    async fn try_lock(&self, key: &str, lease: Duration) -> Result<LockGuard>;
}

/// Implementation specific release of a held lock.
#[async_trait]
pub trait Release: Send + Sync {
    /// Gives the lock for `key` back. Called at most once per guard.
    async fn release(&mut self, key: &str) -> Result<()>;

    /// True once the lease ran out or was taken over by another holder.
    fn is_lost(&self) -> bool {
        false
    }
}

/// A held lock. Call [`LockGuard::unlock`] to release it.
///
/// Dropping the guard without unlocking stops any background lease extension;
/// the lease then runs out on its own.
pub struct LockGuard {
    key: String,
    release: Box<dyn Release>,
}

impl LockGuard {
    /// Creates a guard for `key` released through `release`.
    pub fn new(key: impl Into<String>, release: impl Release + 'static) -> Self {
        Self {
            key: key.into(),
            release: Box::new(release),
        }
    }

    /// The locked key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns true if the lease is no longer held.
    ///
    /// Writes made after this point are not exclusive and must be dropped.
    pub fn is_lost(&self) -> bool {
        self.release.is_lost()
    }

    /// Releases the lock.
    pub async fn unlock(mut self) -> Result<()> {
        self.release.release(&self.key).await
    }
}

impl std::fmt::Debug for LockGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockGuard").field("key", &self.key).finish()
    }
}
