use async_trait::async_trait;
use dashmap::DashMap;
use qrlink_core::error::Result;
use qrlink_core::KeyValueStore;
use std::sync::Arc;

/// In-memory implementation of [`KeyValueStore`] using DashMap.
///
/// Clones share the same map, which lets a test "reload" a registry by
/// building a fresh one over a clone of the store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    storage: Arc<DashMap<String, String>>,
}

impl InMemoryStore {
    /// Creates a new, empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the raw value under `key`, bypassing the async interface.
    pub fn raw(&self, key: &str) -> Option<String> {
        self.storage.get(key).map(|value| value.clone())
    }

    /// Overwrites the raw value under `key`, bypassing the async interface.
    pub fn put_raw(&self, key: impl Into<String>, value: impl Into<String>) {
        self.storage.insert(key.into(), value.into());
    }
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.raw(key))
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        self.storage.insert(key.to_owned(), value);
        Ok(())
    }
}
