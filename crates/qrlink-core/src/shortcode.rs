use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

/// A short code identifying a shortened link.
///
/// Registry-backed codes (random or custom aliases) and self-encoded tokens
/// share one representation. Both are non-empty strings over the URL-path
/// safe alphabet `[A-Za-z0-9_-]`. Custom aliases are additionally capped at
/// [`MAX_ALIAS_LENGTH`] characters, see [`ShortCode::alias`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ShortCode(String);

/// Longest custom alias a user may pick.
pub const MAX_ALIAS_LENGTH: usize = 20;

impl ShortCode {
    /// Creates a new `ShortCode` after checking the alphabet.
    ///
    /// No length cap is applied, since self-encoded tokens grow with
    /// their payload.
    pub fn new(code: impl Into<String>) -> Result<Self, CoreError> {
        let code = code.into();
        Self::validate_alphabet(&code)?;
        Ok(Self(code))
    }

    /// Creates a user-chosen alias: `[A-Za-z0-9_-]{1,20}`.
    pub fn alias(code: impl Into<String>) -> Result<Self, CoreError> {
        let code = code.into();
        Self::validate_alphabet(&code)?;
        if code.len() > MAX_ALIAS_LENGTH {
            return Err(CoreError::InvalidShortCode(format!(
                "alias must be at most {} characters, got {}",
                MAX_ALIAS_LENGTH,
                code.len()
            )));
        }
        Ok(Self(code))
    }

    /// Creates a `ShortCode` without validation.
    ///
    /// Use this only for codes produced by trusted internal sources
    /// (generators and the token encoder).
    pub fn new_unchecked(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Generates the full shortened URL based on the provided base URL.
    pub fn to_url(&self, base_url: &str) -> String {
        format!("{}/{}", base_url.trim_end_matches('/'), self.0)
    }

    /// Returns the short code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate_alphabet(code: &str) -> Result<(), CoreError> {
        if code.is_empty() {
            return Err(CoreError::InvalidShortCode(
                "short code cannot be empty".to_string(),
            ));
        }

        if !code
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(CoreError::InvalidShortCode(format!(
                "must contain only alphanumeric characters, hyphens, or underscores: '{}'",
                code
            )));
        }

        Ok(())
    }
}

impl Display for ShortCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ShortCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for ShortCode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for ShortCode {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ShortCode> for String {
    fn from(value: ShortCode) -> Self {
        value.0
    }
}
