//! Self-encoded tokens.
//!
//! A self-encoded token carries its own destination and expiration, so it
//! resolves anywhere without a registry lookup. The wire form is the JSON
//! object `{"url": ..., "exp": ...}` encoded as base64, with `+` replaced by
//! `-`, `/` replaced by `_`, and the trailing `=` padding removed.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Decoded contents of a self-encoded token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EncodedPayload {
    /// Destination URL.
    pub url: String,
    /// Expiration in epoch seconds, `None` if the link never expires.
    pub exp: Option<i64>,
}

/// Why a short code is not a self-encoded token.
///
/// Decoding failure is an expected outcome: it sends resolution to the
/// registry.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("token is empty")]
    Empty,
    #[error("token contains a character outside the url-safe alphabet: {0:?}")]
    InvalidCharacter(char),
    #[error("token is not valid base64: {0}")]
    Base64(String),
    #[error("token payload is not utf-8")]
    Utf8,
    #[error("token payload is not valid json: {0}")]
    Json(String),
    #[error("token payload has no url")]
    MissingUrl,
}

// Lenient shape used while decoding, so a missing `url` is reported as
// `MissingUrl` rather than as a generic json error. Other encoders may
// write a fractional `exp`; it is floored to whole seconds.
#[derive(Deserialize)]
struct RawPayload {
    url: Option<String>,
    #[serde(default)]
    exp: Option<f64>,
}

impl EncodedPayload {
    pub fn new(url: impl Into<String>, exp: Option<i64>) -> Self {
        Self {
            url: url.into(),
            exp,
        }
    }

    /// The expiration as a timestamp.
    ///
    /// Returns `None` when the token never expires, or when `exp` is out of
    /// the representable range.
    pub fn expires_at(&self) -> Option<Timestamp> {
        self.exp.and_then(|exp| Timestamp::from_second(exp).ok())
    }

    /// Returns `true` if the token carries an expiration strictly before
    /// `now`.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        match self.exp {
            None => false,
            Some(exp) => match Timestamp::from_second(exp) {
                Ok(expires_at) => now > expires_at,
                // Outside jiff's range: far past or far future.
                Err(_) => exp < 0,
            },
        }
    }
}

/// Encodes a destination and optional expiration (epoch seconds) into a
/// self-encoded token.
pub fn encode(url: &str, exp: Option<i64>) -> String {
    let payload = EncodedPayload::new(url, exp);
    encode_payload(&payload)
}

/// Encodes an [`EncodedPayload`] into a self-encoded token.
pub fn encode_payload(payload: &EncodedPayload) -> String {
    // Serializing a struct of a string and an optional integer cannot fail.
    let json = serde_json::to_string(payload).unwrap_or_default();
    STANDARD
        .encode(json.as_bytes())
        .chars()
        .filter(|c| *c != '=')
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            other => other,
        })
        .collect()
}

/// Decodes a self-encoded token.
///
/// Never panics; every malformed input is reported as a [`DecodeError`].
pub fn decode(code: &str) -> Result<EncodedPayload, DecodeError> {
    if code.is_empty() {
        return Err(DecodeError::Empty);
    }

    let mut standard = String::with_capacity(code.len() + 3);
    for c in code.chars() {
        match c {
            '-' => standard.push('+'),
            '_' => standard.push('/'),
            c if c.is_ascii_alphanumeric() => standard.push(c),
            other => return Err(DecodeError::InvalidCharacter(other)),
        }
    }
    while standard.len() % 4 != 0 {
        standard.push('=');
    }

    let bytes = STANDARD
        .decode(standard.as_bytes())
        .map_err(|e| DecodeError::Base64(e.to_string()))?;
    let json = std::str::from_utf8(&bytes).map_err(|_| DecodeError::Utf8)?;
    let raw: RawPayload =
        serde_json::from_str(json).map_err(|e| DecodeError::Json(e.to_string()))?;

    match raw.url {
        Some(url) if !url.is_empty() => Ok(EncodedPayload {
            url,
            // `as` saturates on out-of-range values.
            exp: raw.exp.map(|exp| exp.floor() as i64),
        }),
        _ => Err(DecodeError::MissingUrl),
    }
}
