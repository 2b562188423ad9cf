//! Storage backends and the local code registry.
//!
//! [`LocalRegistry`] keeps every [`UrlRecord`](qrlink_core::UrlRecord) as one
//! JSON list under a fixed key of a [`KeyValueStore`](qrlink_core::KeyValueStore).
//! Two stores are provided: [`InMemoryStore`] for tests and embedding, and
//! [`FileStore`] for persistence on disk.

pub mod file;
pub mod memory;
pub mod registry;

pub use file::FileStore;
pub use memory::InMemoryStore;
pub use registry::{LocalRegistry, STORAGE_KEY};
