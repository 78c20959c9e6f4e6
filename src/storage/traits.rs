//! Storage port trait definitions

use std::fmt;
use thiserror::Error;

/// Errors that can occur while reading or writing a storage area
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Which of the two storage areas a value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageScope {
    /// Cleared when the tab or browser closes.
    Tab,
    /// Survives restarts until explicitly cleared.
    Durable,
}

impl fmt::Display for StorageScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageScope::Tab => f.write_str("tab"),
            StorageScope::Durable => f.write_str("durable"),
        }
    }
}

/// A string key/value storage area.
///
/// All access is synchronous. Implementations must be safe to share between
/// the page runtime and its timers, hence `Send + Sync`.
pub trait StoragePort: Send + Sync {
    /// Read a value
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write a value, replacing any previous one
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove a value. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// All keys currently present
    fn keys(&self) -> Result<Vec<String>, StorageError>;

    /// Remove every key in the area
    fn clear(&self) -> Result<(), StorageError>;

    /// Remove every key starting with `prefix`, returning how many went.
    fn remove_prefixed(&self, prefix: &str) -> Result<usize, StorageError> {
        let doomed: Vec<String> = self
            .keys()?
            .into_iter()
            .filter(|k| k.starts_with(prefix))
            .collect();
        for key in &doomed {
            self.remove(key)?;
        }
        Ok(doomed.len())
    }
}
