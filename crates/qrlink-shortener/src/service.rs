use crate::error::{Result, ShortenerError};
use crate::shortener::{ExpirationPolicy, ShortenParams, Shortener};
use async_trait::async_trait;
use jiff::{SignedDuration, Timestamp};
use qrlink_core::{
    token, AbsoluteUrlValidator, Clock, NewUrlRecord, Registry, ShortCode, SystemClock, UrlRecord,
    UrlValidator,
};
use qrlink_generator::Generator;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// How many generated codes are tried before giving up on a free one.
pub const MAX_GENERATION_ATTEMPTS: usize = 16;

/// A concrete implementation of the `Shortener` trait.
///
/// This service wraps a `Registry` and a `Generator` to handle:
/// - URL validation through an injectable [`UrlValidator`]
/// - custom aliases, rejecting ones already taken
/// - generated codes, retried until one is free
/// - expiration policy conversion against an injectable [`Clock`]
#[derive(Clone)]
pub struct ShortenerService<R, G> {
    registry: Arc<R>,
    generator: Arc<G>,
    clock: Arc<dyn Clock>,
    validator: Arc<dyn UrlValidator>,
}

impl<R: Registry, G: Generator> ShortenerService<R, G> {
    /// Creates a new `ShortenerService` with the system clock and the
    /// absolute-URL validator.
    pub fn new(registry: R, generator: G) -> Self {
        Self {
            registry: Arc::new(registry),
            generator: Arc::new(generator),
            clock: Arc::new(SystemClock),
            validator: Arc::new(AbsoluteUrlValidator),
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

    /// Returns the registry this service writes to.
    pub fn registry(&self) -> &R {
        &self.registry
    }

    /// Trims the URL and checks it against the validator.
    fn validate_url(&self, url: &str) -> Result<String> {
        let url = url.trim();
        if url.is_empty() {
            return Err(ShortenerError::InvalidUrl(
                "URL cannot be empty".to_string(),
            ));
        }
        if !self.validator.is_valid(url) {
            return Err(ShortenerError::InvalidUrl(format!(
                "not an absolute URL: {}",
                url
            )));
        }
        Ok(url.to_string())
    }

    /// Validates a user-chosen alias.
    ///
    /// Besides the alphabet and length rules, an alias must not itself be a
    /// working self-encoded token: resolution tries tokens first, so such an
    /// alias would never reach its registry record.
    fn validate_alias(&self, alias: &str) -> Result<ShortCode> {
        let code = ShortCode::alias(alias.trim())?;
        if let Ok(payload) = token::decode(code.as_str()) {
            if self.validator.is_valid(&payload.url) {
                return Err(ShortenerError::InvalidShortCode(format!(
                    "alias '{}' is reserved: it decodes as a self-encoded link",
                    code
                )));
            }
        }
        Ok(code)
    }

    /// Generates a short code that is not yet in the registry.
    async fn generate_unique_code(&self) -> Result<ShortCode> {
        for attempt in 1..=MAX_GENERATION_ATTEMPTS {
            let code: ShortCode = self.generator.generate().into();
            if !self.registry.contains(&code).await? {
                return Ok(code);
            }
            debug!(code = %code, attempt, "generated code collides, retrying");
        }
        warn!(
            attempts = MAX_GENERATION_ATTEMPTS,
            "could not generate a free short code"
        );
        Err(ShortenerError::GenerationExhausted(MAX_GENERATION_ATTEMPTS))
    }

    /// Converts an expiration policy to an absolute timestamp.
    fn expires_at(&self, expiration: ExpirationPolicy) -> Result<Option<Timestamp>> {
        match expiration {
            ExpirationPolicy::Never => Ok(None),
            ExpirationPolicy::AfterDuration(duration) => {
                let duration = SignedDuration::try_from(duration)
                    .map_err(|e| ShortenerError::InvalidExpiration(e.to_string()))?;
                let at = self
                    .clock
                    .now()
                    .checked_add(duration)
                    .map_err(|e| ShortenerError::InvalidExpiration(e.to_string()))?;
                Ok(Some(at))
            }
            ExpirationPolicy::AtTimestamp(timestamp) => Ok(Some(timestamp)),
        }
    }
}

#[async_trait]
impl<R: Registry, G: Generator> Shortener for ShortenerService<R, G> {
    async fn shorten(&self, params: ShortenParams) -> Result<UrlRecord> {
        let original_url = self.validate_url(&params.original_url)?;

        // Blank aliases count as absent.
        let custom_alias = params
            .custom_alias
            .as_deref()
            .map(str::trim)
            .filter(|alias| !alias.is_empty());

        let short_code = match custom_alias {
            Some(alias) => {
                let code = self.validate_alias(alias)?;
                if self.registry.contains(&code).await? {
                    return Err(ShortenerError::AliasConflict(code.to_string()));
                }
                code
            }
            None => self.generate_unique_code().await?,
        };

        let expires_at = self.expires_at(params.expiration)?;

        let record = self
            .registry
            .insert(NewUrlRecord {
                original_url,
                short_code,
                expires_at,
            })
            .await?;

        info!(code = %record.short_code, url = %record.original_url, "shortened url");
        Ok(record)
    }

    async fn shorten_self_encoded(
        &self,
        original_url: &str,
        expiration: ExpirationPolicy,
    ) -> Result<ShortCode> {
        let original_url = self.validate_url(original_url)?;
        let exp = self.expires_at(expiration)?.map(|at| at.as_second());

        let code = ShortCode::new_unchecked(token::encode(&original_url, exp));
        info!(url = %original_url, exp = ?exp, "encoded self-contained link");
        Ok(code)
    }

    async fn list(&self) -> Result<Vec<UrlRecord>> {
        Ok(self.registry.list_all().await?)
    }

    async fn delete(&self, code: &ShortCode) -> Result<bool> {
        Ok(self.registry.remove(code).await?)
    }
}
