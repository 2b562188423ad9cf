use async_trait::async_trait;
use jiff::Timestamp;
use qrlink_core::error::{Result, StorageError};
use qrlink_core::{
    Clock, KeyValueStore, NewUrlRecord, ReadRegistry, Registry, ShortCode, SystemClock, UrlRecord,
};
use std::sync::Arc;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, trace, warn};

/// Key under which the full record list is stored.
pub const STORAGE_KEY: &str = "shortenedUrls";

/// The stored list, split into records and entries that failed to parse.
#[derive(Default)]
struct Document {
    records: Vec<UrlRecord>,
    unparsed: Vec<Value>,
}

/// Code registry persisted as a single JSON list in a [`KeyValueStore`].
///
/// Every operation loads the current list from the store, and every
/// mutation rewrites the list in full. Within one process the
/// read-modify-write cycle is serialized by a lock; across processes the
/// last writer wins.
///
/// Loading never fails on bad data: an unparsable document is treated as
/// an empty registry and individual malformed entries are skipped. Skipped
/// entries are kept as raw JSON and written back, after the parsed records,
/// whenever the list is rewritten.
pub struct LocalRegistry<S> {
    store: S,
    clock: Arc<dyn Clock>,
    lock: Mutex<()>,
}

impl<S: KeyValueStore> LocalRegistry<S> {
    /// Creates a registry over `store`, timestamped by the system clock.
    pub fn new(store: S) -> Self {
        Self::with_clock(store, SystemClock)
    }

    /// Creates a registry over `store` with a custom clock.
    pub fn with_clock(store: S, clock: impl Clock) -> Self {
        Self {
            store,
            clock: Arc::new(clock),
            lock: Mutex::new(()),
        }
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    async fn load(&self) -> Result<Vec<UrlRecord>> {
        Ok(self.load_document().await?.records)
    }

    async fn load_document(&self) -> Result<Document> {
        let Some(raw) = self.store.get(STORAGE_KEY).await? else {
            trace!("registry is empty");
            return Ok(Document::default());
        };

        let entries: Vec<Value> = match serde_json::from_str(&raw) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(
                    error = %err,
                    "stored registry is malformed, starting empty; the next write replaces it"
                );
                return Ok(Document::default());
            }
        };

        let mut document = Document::default();
        for (index, entry) in entries.into_iter().enumerate() {
            match serde_json::from_value(entry.clone()) {
                Ok(record) => document.records.push(record),
                Err(err) => {
                    warn!(index, error = %err, "skipping malformed registry entry");
                    document.unparsed.push(entry);
                }
            }
        }
        Ok(document)
    }

    async fn save(&self, document: &Document) -> Result<()> {
        let mut entries = Vec::with_capacity(document.records.len() + document.unparsed.len());
        for record in &document.records {
            entries.push(
                serde_json::to_value(record)
                    .map_err(|e| StorageError::Serialization(e.to_string()))?,
            );
        }
        entries.extend(document.unparsed.iter().cloned());

        let raw = serde_json::to_string(&entries)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.store.set(STORAGE_KEY, raw).await
    }

    /// Next record id: the current time in milliseconds, bumped past the
    /// largest parsed id so ids stay strictly increasing.
    fn next_id(now: Timestamp, records: &[UrlRecord]) -> String {
        let candidate = now.as_millisecond();
        let latest = records
            .iter()
            .filter_map(|record| record.id.parse::<i64>().ok())
            .max();
        match latest {
            Some(latest) if latest >= candidate => (latest + 1).to_string(),
            _ => candidate.to_string(),
        }
    }
}

#[async_trait]
impl<S: KeyValueStore> ReadRegistry for LocalRegistry<S> {
    async fn find_by_code(&self, code: &ShortCode) -> Result<Option<UrlRecord>> {
        let records = self.load().await?;
        Ok(records.into_iter().find(|record| record.short_code == *code))
    }

    async fn contains(&self, code: &ShortCode) -> Result<bool> {
        let records = self.load().await?;
        Ok(records.iter().any(|record| record.short_code == *code))
    }

    async fn list_all(&self) -> Result<Vec<UrlRecord>> {
        self.load().await
    }
}

#[async_trait]
impl<S: KeyValueStore> Registry for LocalRegistry<S> {
    async fn insert(&self, record: NewUrlRecord) -> Result<UrlRecord> {
        let _guard = self.lock.lock().await;
        let mut document = self.load_document().await?;

        if document
            .records
            .iter()
            .any(|existing| existing.short_code == record.short_code)
        {
            return Err(StorageError::DuplicateAlias(record.short_code.to_string()));
        }

        let now = self.clock.now();
        let stored = UrlRecord {
            id: Self::next_id(now, &document.records),
            original_url: record.original_url,
            short_code: record.short_code,
            expires_at: record.expires_at,
            created_at: now,
            clicks: 0,
        };

        document.records.insert(0, stored.clone());
        self.save(&document).await?;

        debug!(code = %stored.short_code, id = %stored.id, "inserted record");
        Ok(stored)
    }

    async fn increment_clicks(&self, code: &ShortCode) -> Result<Option<UrlRecord>> {
        let _guard = self.lock.lock().await;
        let mut document = self.load_document().await?;

        let Some(record) = document
            .records
            .iter_mut()
            .find(|record| record.short_code == *code)
        else {
            trace!(code = %code, "no record to count a click for");
            return Ok(None);
        };
        record.clicks = record.clicks.saturating_add(1);
        let updated = record.clone();

        self.save(&document).await?;
        debug!(code = %code, clicks = updated.clicks, "recorded click");
        Ok(Some(updated))
    }

    async fn remove(&self, code: &ShortCode) -> Result<bool> {
        let _guard = self.lock.lock().await;
        let mut document = self.load_document().await?;

        let before = document.records.len();
        document.records.retain(|record| record.short_code != *code);
        if document.records.len() == before {
            return Ok(false);
        }

        self.save(&document).await?;
        debug!(code = %code, "removed record");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStore;
    use jiff::SignedDuration;
    use qrlink_core::ManualClock;

    fn code(s: &str) -> ShortCode {
        ShortCode::new_unchecked(s)
    }

    fn new_record(c: &str, url: &str) -> NewUrlRecord {
        NewUrlRecord {
            original_url: url.to_string(),
            short_code: code(c),
            expires_at: None,
        }
    }

    fn start() -> Timestamp {
        Timestamp::from_second(1_700_000_000).unwrap()
    }

    fn setup() -> (LocalRegistry<InMemoryStore>, InMemoryStore, ManualClock) {
        let store = InMemoryStore::new();
        let clock = ManualClock::new(start());
        let registry = LocalRegistry::with_clock(store.clone(), clock.clone());
        (registry, store, clock)
    }

    #[tokio::test]
    async fn insert_and_find() {
        let (registry, _, _) = setup();

        let stored = registry
            .insert(new_record("abc123", "https://example.com"))
            .await
            .unwrap();
        assert_eq!(stored.clicks, 0);
        assert_eq!(stored.created_at, start());
        assert_eq!(stored.id, start().as_millisecond().to_string());

        let found = registry.find_by_code(&code("abc123")).await.unwrap();
        assert_eq!(found, Some(stored));
    }

    #[tokio::test]
    async fn find_nonexistent() {
        let (registry, _, _) = setup();
        assert!(registry.find_by_code(&code("nope")).await.unwrap().is_none());
        assert!(!registry.contains(&code("nope")).await.unwrap());
    }

    #[tokio::test]
    async fn duplicate_alias_leaves_registry_unchanged() {
        let (registry, store, _) = setup();

        registry
            .insert(new_record("my-alias", "https://one.example"))
            .await
            .unwrap();
        let before = store.raw(STORAGE_KEY);

        let err = registry
            .insert(new_record("my-alias", "https://two.example"))
            .await
            .unwrap_err();
        assert_eq!(err, StorageError::DuplicateAlias("my-alias".to_string()));
        assert_eq!(store.raw(STORAGE_KEY), before);
        assert_eq!(registry.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn duplicate_check_includes_expired_records() {
        let (registry, _, clock) = setup();

        let mut record = new_record("old", "https://old.example");
        record.expires_at = Some(start() + SignedDuration::from_secs(1));
        registry.insert(record).await.unwrap();
        clock.advance(SignedDuration::from_hours(1));

        let err = registry
            .insert(new_record("old", "https://new.example"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::DuplicateAlias(_)));
    }

    #[tokio::test]
    async fn list_is_newest_first() {
        let (registry, _, clock) = setup();

        for c in ["first", "second", "third"] {
            registry
                .insert(new_record(c, "https://example.com"))
                .await
                .unwrap();
            clock.advance(SignedDuration::from_secs(1));
        }

        let codes: Vec<String> = registry
            .list_all()
            .await
            .unwrap()
            .into_iter()
            .map(|record| record.short_code.to_string())
            .collect();
        assert_eq!(codes, ["third", "second", "first"]);
    }

    #[tokio::test]
    async fn ids_stay_unique_within_one_millisecond() {
        let (registry, _, _) = setup();

        let a = registry.insert(new_record("a", "https://a.test")).await.unwrap();
        let b = registry.insert(new_record("b", "https://b.test")).await.unwrap();
        let c = registry.insert(new_record("c", "https://c.test")).await.unwrap();

        let ids: Vec<i64> = [a, b, c].iter().map(|r| r.id.parse().unwrap()).collect();
        assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[tokio::test]
    async fn increment_clicks_persists() {
        let (registry, store, clock) = setup();
        registry
            .insert(new_record("abc123", "https://example.com"))
            .await
            .unwrap();

        let updated = registry.increment_clicks(&code("abc123")).await.unwrap();
        assert_eq!(updated.map(|r| r.clicks), Some(1));
        registry.increment_clicks(&code("abc123")).await.unwrap();

        let reloaded = LocalRegistry::with_clock(store, clock);
        let record = reloaded.find_by_code(&code("abc123")).await.unwrap().unwrap();
        assert_eq!(record.clicks, 2);
    }

    #[tokio::test]
    async fn increment_clicks_on_missing_code_is_noop() {
        let (registry, store, _) = setup();
        assert_eq!(registry.increment_clicks(&code("nope")).await.unwrap(), None);
        assert_eq!(store.raw(STORAGE_KEY), None);
    }

    #[tokio::test]
    async fn remove_existing_and_missing() {
        let (registry, _, _) = setup();
        registry
            .insert(new_record("abc123", "https://example.com"))
            .await
            .unwrap();

        assert!(registry.remove(&code("abc123")).await.unwrap());
        assert!(!registry.remove(&code("abc123")).await.unwrap());
        assert!(registry.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn malformed_document_loads_as_empty() {
        let (registry, store, _) = setup();

        for garbage in ["not json", "{\"an\": \"object\"}", "42", ""] {
            store.put_raw(STORAGE_KEY, garbage);
            assert!(registry.list_all().await.unwrap().is_empty());
        }

        // Writing over the corrupt document works.
        registry
            .insert(new_record("abc123", "https://example.com"))
            .await
            .unwrap();
        assert_eq!(registry.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn malformed_entries_are_skipped() {
        let (registry, store, _) = setup();
        store.put_raw(
            STORAGE_KEY,
            r#"[
                {"id":"2","originalUrl":"https://good.example","shortCode":"good","expiresAt":null,"createdAt":"2024-01-01T00:00:00.000Z","clicks":4},
                {"id":"1","originalUrl":"https://bad.example","shortCode":"bad code","createdAt":"2024-01-01T00:00:00.000Z"},
                {"id":"0","shortCode":"nourl","createdAt":"2024-01-01T00:00:00.000Z"},
                "just a string"
            ]"#,
        );

        let records = registry.list_all().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].short_code.as_str(), "good");
        assert_eq!(records[0].clicks, 4);
    }

    #[tokio::test]
    async fn malformed_entries_survive_a_rewrite() {
        let (registry, store, _) = setup();
        store.put_raw(
            STORAGE_KEY,
            r#"[
                {"id":"2","originalUrl":"https://good.example","shortCode":"good","expiresAt":null,"createdAt":"2024-01-01T00:00:00.000Z","clicks":4},
                {"id":"1","originalUrl":"https://bad.example","shortCode":"bad code","createdAt":"2024-01-01T00:00:00.000Z"},
                "just a string"
            ]"#,
        );

        registry.increment_clicks(&code("good")).await.unwrap();
        registry
            .insert(new_record("fresh", "https://fresh.example"))
            .await
            .unwrap();

        let raw = store.raw(STORAGE_KEY).unwrap();
        let entries: Vec<serde_json::Value> = serde_json::from_str(&raw).unwrap();
        assert_eq!(entries.len(), 4);
        assert_eq!(entries[0]["shortCode"], "fresh");
        assert_eq!(entries[1]["shortCode"], "good");
        assert_eq!(entries[1]["clicks"], 5);
        assert_eq!(entries[2]["shortCode"], "bad code");
        assert_eq!(entries[3], "just a string");

        assert_eq!(registry.list_all().await.unwrap().len(), 2);
    }
}
