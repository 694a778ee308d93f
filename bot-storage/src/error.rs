//! Error types for the storage layer.

use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur in storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error (file system).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file is missing or unusable.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A required key file was not provisioned.
    #[error("key material missing: {0}")]
    KeyMissing(&'static str),

    /// The persisted state byte is outside the known range.
    #[error("corrupt device state: {0}")]
    CorruptState(#[from] bot_types::Error),
}
