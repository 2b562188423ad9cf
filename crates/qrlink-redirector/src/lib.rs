//! Redirect resolution.
//!
//! [`RedirectorService`] turns a short code into a [`Resolution`]. It first
//! tries to decode the code as a self-encoded token, which works without any
//! shared storage, and falls back to the registry for aliases and random
//! codes.
//!
//! # Example
//!
//! ```rust
//! use qrlink_redirector::{RedirectorService, Resolution};
//! use qrlink_storage::{InMemoryStore, LocalRegistry};
//!
//! # async fn example() {
//! let service = RedirectorService::new(LocalRegistry::new(InMemoryStore::new()));
//!
//! match service.resolve("abc123").await {
//!     Resolution::Resolved(url) => println!("Redirect to: {}", url),
//!     other => println!("{}: {}", other.title(), other.message()),
//! }
//! # }
//! ```

pub mod redirector;
pub mod resolution;
pub mod service;

pub use redirector::Redirector;
pub use resolution::{Resolution, ResolutionKind, ResolutionResult};
pub use service::{RedirectorConfig, RedirectorService};
