//! URL shortener service implementation.
//!
//! This crate provides [`ShortenerService`], which validates destinations,
//! picks or generates short codes, applies expiration policies and writes
//! records to a [`Registry`](qrlink_core::Registry). It can also produce
//! self-encoded tokens that need no registry at all.

pub mod error;
pub mod service;
pub mod shortener;

pub use error::ShortenerError;
pub use service::ShortenerService;
pub use shortener::{ExpirationPolicy, ExpirationUnit, ShortenParams, Shortener};
