use crate::error::Result;
use async_trait::async_trait;

/// A flat string key-value store, the persistence backend for a registry.
///
/// Values are opaque to the store. Writes replace the previous value in
/// full.
#[async_trait]
pub trait KeyValueStore: Send + Sync + 'static {
    /// Returns the value stored under `key`, or `None` if there is none.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: String) -> Result<()>;
}
