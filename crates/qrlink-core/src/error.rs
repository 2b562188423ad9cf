use thiserror::Error;

/// Result type for registry and storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("invalid short code: {0}")]
    InvalidShortCode(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("alias already exists: {0}")]
    DuplicateAlias(String),
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
    #[error("storage io failed: {0}")]
    Io(String),
    #[error("stored data could not be serialized: {0}")]
    Serialization(String),
}
