use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::redirector::Redirector;
use crate::resolution::Resolution;
use async_trait::async_trait;
use qrlink_core::{
    token, AbsoluteUrlValidator, Clock, Registry, ShortCode, SystemClock, UrlValidator,
};
use tracing::{debug, trace, warn};
use typed_builder::TypedBuilder;

/// Default pause between showing "Redirecting..." and navigating.
pub const DEFAULT_REDIRECT_DELAY: Duration = Duration::from_millis(1500);

/// Configures a [`RedirectorService`].
#[derive(Debug, Clone, TypedBuilder)]
pub struct RedirectorConfig {
    /// Cosmetic delay applied by [`RedirectorService::navigate`] and
    /// [`RedirectorService::follow`].
    #[builder(default = DEFAULT_REDIRECT_DELAY)]
    pub redirect_delay: Duration,
}

impl Default for RedirectorConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Service for handling URL redirects.
///
/// Resolution order: self-encoded token first, registry second. Both paths
/// check expiration against the injected clock, and a successful
/// resolution records one click.
#[derive(Clone)]
pub struct RedirectorService<R> {
    registry: Arc<R>,
    clock: Arc<dyn Clock>,
    validator: Arc<dyn UrlValidator>,
    config: RedirectorConfig,
}

impl<R: Registry> RedirectorService<R> {
    /// Creates a new RedirectorService with the given registry.
    pub fn new(registry: R) -> Self {
        Self {
            registry: Arc::new(registry),
            clock: Arc::new(SystemClock),
            validator: Arc::new(AbsoluteUrlValidator),
            config: RedirectorConfig::default(),
        }
    }

    pub fn with_clock(mut self, clock: impl Clock) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn with_validator(mut self, validator: impl UrlValidator) -> Self {
        self.validator = Arc::new(validator);
        self
    }

    pub fn with_config(mut self, config: RedirectorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &RedirectorConfig {
        &self.config
    }

    /// Resolves a short code to its destination.
    ///
    /// # Returns
    ///
    /// * `Resolved(url)` - a live self-encoded token or registry entry
    /// * `Expired` - the token or entry exists but its expiration passed
    /// * `NotFound` - neither path knows the code
    /// * `InvalidInput` - the code is empty
    pub async fn resolve(&self, code: &str) -> Resolution {
        Redirector::resolve(self, code).await
    }

    /// Waits the configured delay, then hands back the destination.
    ///
    /// Returns `None` without waiting if `resolution` is not resolved, and
    /// `None` if `cancelled` completes before the delay is over. Dropping
    /// the returned future cancels as well.
    pub async fn navigate<F>(&self, resolution: &Resolution, cancelled: F) -> Option<String>
    where
        F: Future<Output = ()>,
    {
        let url = resolution.destination_url()?.to_owned();

        tokio::select! {
            biased;
            _ = cancelled => {
                debug!(url = %url, "redirect cancelled");
                None
            }
            _ = tokio::time::sleep(self.config.redirect_delay) => Some(url),
        }
    }

    /// Resolves `code`, then waits the configured delay before handing back
    /// the destination.
    ///
    /// The destination is `None` when the code did not resolve or when
    /// `cancelled` completes first. The click is recorded at resolution
    /// time, so a cancelled redirect still counts.
    pub async fn follow<F>(&self, code: &str, cancelled: F) -> (Resolution, Option<String>)
    where
        F: Future<Output = ()>,
    {
        let resolution = self.resolve(code).await;
        let destination = self.navigate(&resolution, cancelled).await;
        (resolution, destination)
    }

    /// Records a click for a self-encoded token. A token is usually not in
    /// the registry, so a miss is expected and failures are only logged.
    async fn record_token_click(&self, code: &str) {
        let Ok(code) = ShortCode::new(code) else {
            return;
        };
        match self.registry.increment_clicks(&code).await {
            Ok(Some(record)) => trace!(code = %code, clicks = record.clicks, "counted token click"),
            Ok(None) => trace!(code = %code, "token is not in the registry"),
            Err(err) => warn!(code = %code, error = %err, "failed to count token click"),
        }
    }

    async fn resolve_from_registry(&self, code: &str) -> Resolution {
        let Ok(code) = ShortCode::new(code) else {
            trace!(code, "code is not a valid registry key");
            return Resolution::NotFound;
        };

        let record = match self.registry.find_by_code(&code).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                trace!(code = %code, "short code not found");
                return Resolution::NotFound;
            }
            Err(err) => {
                warn!(code = %code, error = %err, "registry lookup failed");
                return Resolution::NotFound;
            }
        };

        if record.is_expired(self.clock.now()) {
            debug!(code = %code, "record has expired");
            return Resolution::Expired;
        }

        if let Err(err) = self.registry.increment_clicks(&code).await {
            warn!(code = %code, error = %err, "failed to count click");
        }

        debug!(code = %code, url = %record.original_url, "resolved short code");
        Resolution::Resolved(record.original_url)
    }
}

#[async_trait]
impl<R: Registry> Redirector for RedirectorService<R> {
    async fn resolve(&self, code: &str) -> Resolution {
        let code = code.trim();
        if code.is_empty() {
            debug!("empty short code");
            return Resolution::InvalidInput;
        }
        trace!(code, "resolving short code");

        match token::decode(code) {
            Ok(payload) if payload.is_expired(self.clock.now()) => {
                debug!(code, "self-encoded token has expired");
                return Resolution::Expired;
            }
            Ok(payload) if self.validator.is_valid(&payload.url) => {
                self.record_token_click(code).await;
                debug!(code, url = %payload.url, "resolved self-encoded token");
                return Resolution::Resolved(payload.url);
            }
            Ok(payload) => {
                debug!(code, url = %payload.url, "token carries an invalid url, trying registry");
            }
            Err(err) => {
                trace!(code, error = %err, "not a self-encoded token");
            }
        }

        self.resolve_from_registry(code).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use base64::Engine as _;
    use jiff::{SignedDuration, Timestamp};
    use qrlink_core::error::{Result as StorageResult, StorageError};
    use qrlink_core::{
        KeyValueStore, ManualClock, NewUrlRecord, ReadRegistry, UrlRecord,
    };
    use qrlink_storage::{InMemoryStore, LocalRegistry};

    fn start() -> Timestamp {
        Timestamp::from_second(1_700_000_000).unwrap()
    }

    struct Fixture {
        service: RedirectorService<Arc<LocalRegistry<InMemoryStore>>>,
        registry: Arc<LocalRegistry<InMemoryStore>>,
        clock: ManualClock,
    }

    fn fixture() -> Fixture {
        let clock = ManualClock::new(start());
        let registry = Arc::new(LocalRegistry::with_clock(
            InMemoryStore::new(),
            clock.clone(),
        ));
        let service = RedirectorService::new(registry.clone()).with_clock(clock.clone());
        Fixture {
            service,
            registry,
            clock,
        }
    }

    async fn insert(registry: &LocalRegistry<InMemoryStore>, code: &str, url: &str, expires_at: Option<Timestamp>) {
        registry
            .insert(NewUrlRecord {
                original_url: url.to_string(),
                short_code: ShortCode::new(code).unwrap(),
                expires_at,
            })
            .await
            .unwrap();
    }

    async fn clicks(registry: &LocalRegistry<InMemoryStore>, code: &str) -> u64 {
        registry
            .find_by_code(&ShortCode::new(code).unwrap())
            .await
            .unwrap()
            .map(|record| record.clicks)
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn empty_code_is_invalid_input() {
        let f = fixture();
        assert_eq!(f.service.resolve("").await, Resolution::InvalidInput);
        assert_eq!(f.service.resolve("   ").await, Resolution::InvalidInput);
    }

    #[tokio::test]
    async fn resolve_existing_code_counts_one_click() {
        let f = fixture();
        insert(&f.registry, "abc123", "https://example.com", None).await;

        let result = f.service.resolve("abc123").await;
        assert_eq!(result, Resolution::Resolved("https://example.com".to_string()));
        assert_eq!(clicks(&f.registry, "abc123").await, 1);

        f.service.resolve("abc123").await;
        assert_eq!(clicks(&f.registry, "abc123").await, 2);
    }

    #[tokio::test]
    async fn resolve_nonexistent_code() {
        let f = fixture();
        assert_eq!(f.service.resolve("nope").await, Resolution::NotFound);
        assert_eq!(f.service.resolve("not/a/code").await, Resolution::NotFound);
    }

    #[tokio::test]
    async fn resolve_expired_record_does_not_count() {
        let f = fixture();
        insert(
            &f.registry,
            "soon",
            "https://example.com",
            Some(start() + SignedDuration::from_mins(5)),
        )
        .await;

        assert!(f.service.resolve("soon").await.is_resolved());
        f.clock.advance(SignedDuration::from_mins(5));
        // Still live at the exact expiration instant.
        assert!(f.service.resolve("soon").await.is_resolved());
        f.clock.advance(SignedDuration::from_millis(1));
        assert_eq!(f.service.resolve("soon").await, Resolution::Expired);
        assert_eq!(clicks(&f.registry, "soon").await, 2);
    }

    #[tokio::test]
    async fn resolve_self_encoded_token_without_registry() {
        let f = fixture();
        let token = token::encode("https://x.test/path", None);

        let result = f.service.resolve(&token).await;
        assert_eq!(result, Resolution::Resolved("https://x.test/path".to_string()));
        assert!(f.registry.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn resolve_expired_token() {
        let f = fixture();
        let an_hour_ago = (start() - SignedDuration::from_hours(1)).as_second();
        let token = token::encode("https://x.test", Some(an_hour_ago));

        assert_eq!(f.service.resolve(&token).await, Resolution::Expired);
    }

    #[tokio::test]
    async fn token_expiring_later_resolves() {
        let f = fixture();
        let token = token::encode("https://x.test", Some(start().as_second() + 60));

        assert!(f.service.resolve(&token).await.is_resolved());
        f.clock.advance(SignedDuration::from_secs(60));
        assert!(f.service.resolve(&token).await.is_resolved());
        f.clock.advance(SignedDuration::from_millis(500));
        assert_eq!(f.service.resolve(&token).await, Resolution::Expired);
    }

    #[tokio::test]
    async fn fractional_token_exp_resolves() {
        let f = fixture();
        let raw = format!(r#"{{"url":"https://x.test","exp":{}.75}}"#, start().as_second() + 60);
        let token = base64::engine::general_purpose::STANDARD
            .encode(raw)
            .replace('=', "")
            .replace('+', "-")
            .replace('/', "_");

        assert_eq!(
            f.service.resolve(&token).await,
            Resolution::Resolved("https://x.test".to_string())
        );
    }

    #[tokio::test]
    async fn token_in_registry_counts_click() {
        let f = fixture();
        let token = token::encode("https://x.test", None);
        insert(&f.registry, &token, "https://x.test", None).await;

        assert!(f.service.resolve(&token).await.is_resolved());
        assert_eq!(clicks(&f.registry, &token).await, 1);
    }

    #[tokio::test]
    async fn token_with_invalid_url_falls_back_to_registry() {
        let f = fixture();
        // base64 of {"url":"a"}: decodes, but "a" is not an absolute url.
        let code = "eyJ1cmwiOiJhIn0";
        assert_eq!(f.service.resolve(code).await, Resolution::NotFound);

        insert(&f.registry, code, "https://alias.example", None).await;
        assert_eq!(
            f.service.resolve(code).await,
            Resolution::Resolved("https://alias.example".to_string())
        );
    }

    #[tokio::test]
    async fn surrounding_whitespace_is_ignored() {
        let f = fixture();
        insert(&f.registry, "abc123", "https://example.com", None).await;
        assert!(f.service.resolve("  abc123\n").await.is_resolved());
    }

    /// A store whose reads and writes can be made to fail.
    #[derive(Clone, Default)]
    struct FlakyStore {
        inner: InMemoryStore,
        fail_reads: bool,
        fail_writes: bool,
    }

    #[async_trait]
    impl KeyValueStore for FlakyStore {
        async fn get(&self, key: &str) -> StorageResult<Option<String>> {
            if self.fail_reads {
                return Err(StorageError::Unavailable("disk on fire".into()));
            }
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: String) -> StorageResult<()> {
            if self.fail_writes {
                return Err(StorageError::Io("read-only".into()));
            }
            self.inner.set(key, value).await
        }
    }

    fn seeded_store() -> InMemoryStore {
        let store = InMemoryStore::new();
        let record = UrlRecord {
            id: "1".into(),
            original_url: "https://example.com".into(),
            short_code: ShortCode::new("abc123").unwrap(),
            expires_at: None,
            created_at: start(),
            clicks: 0,
        };
        store.put_raw(
            qrlink_storage::STORAGE_KEY,
            serde_json::to_string(&vec![record]).unwrap(),
        );
        store
    }

    #[tokio::test]
    async fn unreadable_storage_reports_not_found() {
        let store = FlakyStore {
            inner: seeded_store(),
            fail_reads: true,
            ..Default::default()
        };
        let service = RedirectorService::new(LocalRegistry::new(store));
        assert_eq!(service.resolve("abc123").await, Resolution::NotFound);
    }

    #[tokio::test]
    async fn unwritable_storage_still_resolves() {
        let store = FlakyStore {
            inner: seeded_store(),
            fail_writes: true,
            ..Default::default()
        };
        let service = RedirectorService::new(LocalRegistry::new(store));
        assert_eq!(
            service.resolve("abc123").await,
            Resolution::Resolved("https://example.com".to_string())
        );
    }

    #[tokio::test]
    async fn navigate_waits_then_returns_destination() {
        let f = fixture();
        let service = f.service.with_config(
            RedirectorConfig::builder()
                .redirect_delay(Duration::ZERO)
                .build(),
        );
        let resolution = Resolution::Resolved("https://example.com".to_string());

        let url = service
            .navigate(&resolution, std::future::pending())
            .await;
        assert_eq!(url.as_deref(), Some("https://example.com"));
    }

    #[tokio::test]
    async fn navigate_can_be_cancelled() {
        let f = fixture();
        let service = f.service.with_config(
            RedirectorConfig::builder()
                .redirect_delay(Duration::from_secs(3600))
                .build(),
        );
        let resolution = Resolution::Resolved("https://example.com".to_string());

        let url = service.navigate(&resolution, std::future::ready(())).await;
        assert_eq!(url, None);
    }

    #[tokio::test]
    async fn navigate_ignores_unresolved() {
        let f = fixture();
        assert_eq!(
            f.service
                .navigate(&Resolution::Expired, std::future::pending())
                .await,
            None
        );
    }

    #[tokio::test]
    async fn follow_resolves_then_returns_destination() {
        let f = fixture();
        insert(&f.registry, "abc123", "https://example.com", None).await;
        let service = f.service.with_config(
            RedirectorConfig::builder()
                .redirect_delay(Duration::ZERO)
                .build(),
        );

        let (resolution, url) = service.follow("abc123", std::future::pending()).await;
        assert!(resolution.is_resolved());
        assert_eq!(url.as_deref(), Some("https://example.com"));
        assert_eq!(clicks(&f.registry, "abc123").await, 1);
    }

    #[tokio::test]
    async fn follow_cancelled_still_counts_click() {
        let f = fixture();
        insert(&f.registry, "abc123", "https://example.com", None).await;

        let (resolution, url) = f.service.follow("abc123", std::future::ready(())).await;
        assert!(resolution.is_resolved());
        assert_eq!(url, None);
        assert_eq!(clicks(&f.registry, "abc123").await, 1);
    }

    #[tokio::test]
    async fn follow_unknown_code_does_not_wait() {
        let f = fixture();
        let service = f.service.with_config(
            RedirectorConfig::builder()
                .redirect_delay(Duration::from_secs(3600))
                .build(),
        );

        let (resolution, url) = service.follow("missing", std::future::pending()).await;
        assert_eq!(resolution, Resolution::NotFound);
        assert_eq!(url, None);
    }

    #[test]
    fn default_config() {
        assert_eq!(
            RedirectorConfig::default().redirect_delay,
            DEFAULT_REDIRECT_DELAY
        );
    }
}
