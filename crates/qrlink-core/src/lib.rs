//! Core types and traits for the qrlink toolkit.
//!
//! This crate provides the types shared by the shortener and the
//! redirector: short codes, URL records, the registry and storage
//! contracts, the injectable clock and URL validator, and the codec for
//! self-encoded tokens.

pub mod clock;
pub mod error;
pub mod registry;
pub mod shortcode;
pub mod store;
pub mod token;
pub mod validate;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{CoreError, StorageError};
pub use registry::{NewUrlRecord, ReadRegistry, Registry, UrlRecord};
pub use shortcode::ShortCode;
pub use store::KeyValueStore;
pub use token::{DecodeError, EncodedPayload};
pub use validate::{AbsoluteUrlValidator, UrlValidator};
