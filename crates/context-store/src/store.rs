use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::Result;

/// Bound for values a context store can hold.
pub trait Storable: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {}

impl<T> Storable for T where T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {}

/// Core trait for context store implementations.
///
/// Exactly one value exists per key: storing replaces whatever was there.
#[async_trait]
pub trait ContextStore<T: Storable>: Send + Sync {
    /// Stores `value` under `key`, replacing any previous value.
    async fn store(&self, key: &str, value: &T) -> Result<()>;

    /// Retrieves the value stored under `key`.
    ///
    /// Returns None if nothing is stored, the entry expired, or the stored
    /// value can no longer be decoded.
    async fn get(&self, key: &str) -> Result<Option<T>>;

    /// Removes the value stored under `key`. Removing a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;
}
