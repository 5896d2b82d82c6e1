//! Key-value persistence port

use async_trait::async_trait;
use thiserror::Error;

/// Storage failures. Writes are best-effort throughout the engine:
/// callers log these and move on, they never abort a send.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// The underlying medium failed.
    #[error("storage I/O error: {0}")]
    Io(String),

    /// A stored value could not be encoded or decoded.
    #[error("storage serialization error: {0}")]
    Serialization(String),
}

/// Port over an opaque string-keyed persistence medium.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Reads the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the medium cannot be read.
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the medium cannot be written.
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removes `key` if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the medium cannot be written.
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}
