use crate::error::Result;
use async_trait::async_trait;
use jiff::Timestamp;
use qrlink_core::{ShortCode, UrlRecord};
use std::fmt::Display;
use std::time::Duration;

/// Expiration policy for a shortened URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpirationPolicy {
    /// The shortened URL never expires.
    Never,
    /// The shortened URL expires after a certain duration from now.
    AfterDuration(Duration),
    /// The shortened URL expires at a specific timestamp.
    AtTimestamp(Timestamp),
}

/// Units offered when picking a relative expiration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpirationUnit {
    Minutes,
    Hours,
    Days,
    Weeks,
    /// Fixed 30-day months.
    Months,
}

impl ExpirationUnit {
    pub fn seconds(self) -> u64 {
        match self {
            ExpirationUnit::Minutes => 60,
            ExpirationUnit::Hours => 60 * 60,
            ExpirationUnit::Days => 24 * 60 * 60,
            ExpirationUnit::Weeks => 7 * 24 * 60 * 60,
            ExpirationUnit::Months => 30 * 24 * 60 * 60,
        }
    }
}

impl Display for ExpirationUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ExpirationUnit::Minutes => "minutes",
            ExpirationUnit::Hours => "hours",
            ExpirationUnit::Days => "days",
            ExpirationUnit::Weeks => "weeks",
            ExpirationUnit::Months => "months",
        };
        f.write_str(name)
    }
}

impl ExpirationPolicy {
    /// Expire `value` units from now. A value of zero means the link never
    /// expires.
    pub fn after(value: u64, unit: ExpirationUnit) -> Self {
        if value == 0 {
            return ExpirationPolicy::Never;
        }
        ExpirationPolicy::AfterDuration(Duration::from_secs(value.saturating_mul(unit.seconds())))
    }
}

/// Parameters for creating a shortened URL.
#[derive(Debug, Clone)]
pub struct ShortenParams {
    /// The original URL to be shortened.
    pub original_url: String,
    /// The expiration policy for the shortened URL.
    pub expiration: ExpirationPolicy,
    /// Optional custom alias for the shortened URL, validated by the
    /// service.
    pub custom_alias: Option<String>,
}

impl ShortenParams {
    pub fn new(original_url: impl Into<String>) -> Self {
        Self {
            original_url: original_url.into(),
            expiration: ExpirationPolicy::Never,
            custom_alias: None,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.custom_alias = Some(alias.into());
        self
    }

    pub fn with_expiration(mut self, expiration: ExpirationPolicy) -> Self {
        self.expiration = expiration;
        self
    }
}

#[async_trait]
pub trait Shortener: Send + Sync + 'static {
    /// Creates a registry-backed short link and returns the stored record.
    async fn shorten(&self, params: ShortenParams) -> Result<UrlRecord>;

    /// Creates a self-encoded token carrying the URL and expiration.
    /// Nothing is stored.
    async fn shorten_self_encoded(
        &self,
        original_url: &str,
        expiration: ExpirationPolicy,
    ) -> Result<ShortCode>;

    /// Lists every registry-backed link, newest first.
    async fn list(&self) -> Result<Vec<UrlRecord>>;

    /// Deletes a registry-backed link.
    /// Returns `true` if the record existed and was removed.
    async fn delete(&self, code: &ShortCode) -> Result<bool>;
}
