use crate::error::Result;
use crate::shortcode::ShortCode;
use async_trait::async_trait;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A stored URL record in the registry.
///
/// Serialized in camelCase with ISO-8601 timestamps, which is the persisted
/// layout of the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlRecord {
    /// Monotonic creation id (milliseconds since the epoch, as a string).
    pub id: String,
    /// The original URL that was shortened.
    pub original_url: String,
    /// Code under which the record is reachable.
    pub short_code: ShortCode,
    /// When the record expires, if ever.
    #[serde(default)]
    pub expires_at: Option<Timestamp>,
    pub created_at: Timestamp,
    #[serde(default)]
    pub clicks: u64,
}

impl UrlRecord {
    /// Returns `true` if the record has an expiration strictly before `now`.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.expires_at.is_some_and(|expires_at| now > expires_at)
    }
}

/// The caller-supplied part of a record; the registry fills in the id,
/// creation time and click counter.
#[derive(Debug, Clone, PartialEq)]
pub struct NewUrlRecord {
    pub original_url: String,
    pub short_code: ShortCode,
    pub expires_at: Option<Timestamp>,
}

/// A read-only view of a registry.
#[async_trait]
pub trait ReadRegistry: Send + Sync + 'static {
    /// Retrieves the record for a given short code.
    /// Returns `None` if the code does not exist. Expired records are
    /// still returned; expiry is the caller's decision.
    async fn find_by_code(&self, code: &ShortCode) -> Result<Option<UrlRecord>>;

    /// Checks whether a short code already exists in the registry.
    async fn contains(&self, code: &ShortCode) -> Result<bool>;

    /// Returns every record, newest first.
    async fn list_all(&self) -> Result<Vec<UrlRecord>>;
}

#[async_trait]
pub trait Registry: ReadRegistry {
    /// Inserts a new record and returns it as stored.
    /// Returns `Err(DuplicateAlias)` if the code already exists, leaving the
    /// registry unchanged.
    async fn insert(&self, record: NewUrlRecord) -> Result<UrlRecord>;

    /// Adds one click to the record for `code` and persists it.
    /// Returns the updated record, or `None` if the code does not exist.
    async fn increment_clicks(&self, code: &ShortCode) -> Result<Option<UrlRecord>>;

    /// Deletes the record for a given short code.
    /// Returns `true` if the record existed and was removed.
    async fn remove(&self, code: &ShortCode) -> Result<bool>;
}

#[async_trait]
impl<T: ReadRegistry + ?Sized> ReadRegistry for Arc<T> {
    async fn find_by_code(&self, code: &ShortCode) -> Result<Option<UrlRecord>> {
        (**self).find_by_code(code).await
    }

    async fn contains(&self, code: &ShortCode) -> Result<bool> {
        (**self).contains(code).await
    }

    async fn list_all(&self) -> Result<Vec<UrlRecord>> {
        (**self).list_all().await
    }
}

#[async_trait]
impl<T: Registry + ?Sized> Registry for Arc<T> {
    async fn insert(&self, record: NewUrlRecord) -> Result<UrlRecord> {
        (**self).insert(record).await
    }

    async fn increment_clicks(&self, code: &ShortCode) -> Result<Option<UrlRecord>> {
        (**self).increment_clicks(code).await
    }

    async fn remove(&self, code: &ShortCode) -> Result<bool> {
        (**self).remove(code).await
    }
}
