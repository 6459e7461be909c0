use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use uuid::Uuid;

use crate::{LockError, LockGuard, Locker, Release, Result};

#[derive(Debug, Clone, Copy)]
struct Lease {
    token: Uuid,
    expires_at: Instant,
}

type Leases = Arc<Mutex<HashMap<String, Lease>>>;

/// In-memory lock for a single process.
///
/// Acquisition is a compare-and-swap on a shared map. Leases are not extended:
/// an entry whose lease ran out counts as free, so a guard that leaked is
/// reclaimed after its lease.
#[derive(Clone, Default)]
pub struct InMemoryLocker {
    leases: Leases,
}

impl InMemoryLocker {
    /// Creates a new locker with no held keys.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if an unexpired lease exists for `key`.
    pub fn is_locked(&self, key: &str) -> bool {
        let leases = self.leases.lock().unwrap_or_else(PoisonError::into_inner);
        leases
            .get(key)
            .is_some_and(|lease| lease.expires_at > Instant::now())
    }
}

#[async_trait]
impl Locker for InMemoryLocker {
    async fn try_lock(&self, key: &str, lease: Duration) -> Result<LockGuard> {
        let token = Uuid::new_v4();
        let now = Instant::now();
        {
            let mut leases = self.leases.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(current) = leases.get(key)
                && current.expires_at > now
            {
                metrics::counter!("lock_contention_total", "backend" => "memory").increment(1);
                return Err(LockError::Taken(key.to_string()));
            }
            leases.insert(
                key.to_string(),
                Lease {
                    token,
                    expires_at: now + lease,
                },
            );
        }

        tracing::trace!(key, ?lease, "in-memory lock acquired");
        Ok(LockGuard::new(
            key,
            MemoryRelease {
                leases: Arc::clone(&self.leases),
                key: key.to_string(),
                token,
                released: false,
            },
        ))
    }
}

struct MemoryRelease {
    leases: Leases,
    key: String,
    token: Uuid,
    released: bool,
}

impl MemoryRelease {
    fn remove_own_lease(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        let mut leases = self.leases.lock().unwrap_or_else(PoisonError::into_inner);
        // The lease may have expired and been taken over by someone else.
        if leases.get(&self.key).is_some_and(|l| l.token == self.token) {
            leases.remove(&self.key);
        }
    }
}

#[async_trait]
impl Release for MemoryRelease {
    async fn release(&mut self, key: &str) -> Result<()> {
        self.remove_own_lease();
        tracing::trace!(key, "in-memory lock released");
        Ok(())
    }

    fn is_lost(&self) -> bool {
        let leases = self.leases.lock().unwrap_or_else(PoisonError::into_inner);
        !leases
            .get(&self.key)
            .is_some_and(|l| l.token == self.token && l.expires_at > Instant::now())
    }
}

impl Drop for MemoryRelease {
    fn drop(&mut self) {
        self.remove_own_lease();
    }
}
