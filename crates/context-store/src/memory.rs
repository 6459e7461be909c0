use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{ContextStore, Result, Storable};

/// In-memory context store for a single process.
///
/// Values are lost when the process exits and never expire.
#[derive(Clone)]
pub struct InMemoryContextStore<T> {
    entries: Arc<RwLock<HashMap<String, T>>>,
}

impl<T> InMemoryContextStore<T> {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Returns the number of stored entries.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Returns true if nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl<T> Default for InMemoryContextStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T: Storable> ContextStore<T> for InMemoryContextStore<T> {
    async fn store(&self, key: &str, value: &T) -> Result<()> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.clone());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<T>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}
