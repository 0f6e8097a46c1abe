//! Persisted client-side state for the console.
//!
//! The console keeps a handful of string values under fixed, well-known keys (the
//! token pair, the cached profile and a small auth snapshot). Backends expose plain
//! string reads and batched writes; a batch is applied as one unit so the token pair
//! can never be observed half-written. Interpreting the values (and treating corrupt
//! ones as absent) is left to the session layer.

mod file;

pub use file::FileStorage;

use std::{
    collections::HashMap,
    fmt,
    sync::{Mutex, PoisonError},
};
use thiserror::Error;

/// Access token storage key.
pub const ACCESS_TOKEN_KEY: &str = "jank-access-token";
/// Refresh token storage key.
pub const REFRESH_TOKEN_KEY: &str = "jank-refresh-token";
/// Cached user profile (JSON) storage key.
pub const USER_INFO_KEY: &str = "jank-user-info";
/// Authentication state snapshot (JSON) storage key.
pub const AUTH_STORE_KEY: &str = "jank-auth-store";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("state file I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("state file could not be encoded: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum StorageOp {
    Set(String, String),
    Remove(String),
}

/// Ordered set of writes applied atomically by a [`Storage`] backend.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StorageBatch {
    ops: Vec<StorageOp>,
}

impl StorageBatch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn set(mut self, key: &str, value: impl Into<String>) -> Self {
        self.ops.push(StorageOp::Set(key.to_string(), value.into()));
        self
    }

    #[must_use]
    pub fn remove(mut self, key: &str) -> Self {
        self.ops.push(StorageOp::Remove(key.to_string()));
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    fn apply_to(self, map: &mut HashMap<String, String>) {
        for op in self.ops {
            match op {
                StorageOp::Set(key, value) => {
                    map.insert(key, value);
                }
                StorageOp::Remove(key) => {
                    map.remove(&key);
                }
            }
        }
    }
}

/// Key/value backend for persisted console state.
pub trait Storage: Send + Sync + fmt::Debug {
    /// Returns the raw value stored under `key`, if any.
    fn get(&self, key: &str) -> Option<String>;

    /// Applies every operation in `batch` as a single unit.
    ///
    /// # Errors
    /// Returns an error if the backend cannot persist the batch; in that case none
    /// of its operations are visible.
    fn apply(&self, batch: StorageBatch) -> Result<(), StorageError>;
}

/// In-memory backend, used by tests and by callers that do not want persistence.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a backend pre-populated with `entries`.
    #[must_use]
    pub fn with_entries<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let values = entries
            .into_iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        Self {
            values: Mutex::new(values),
        }
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn apply(&self, batch: StorageBatch) -> Result<(), StorageError> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        batch.apply_to(&mut values);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_storage_applies_batches_in_order() {
        let storage = MemoryStorage::new();
        let batch = StorageBatch::new()
            .set(ACCESS_TOKEN_KEY, "a1")
            .set(REFRESH_TOKEN_KEY, "r1")
            .remove(ACCESS_TOKEN_KEY)
            .set(ACCESS_TOKEN_KEY, "a2");

        assert!(storage.apply(batch).is_ok());

        assert_eq!(storage.get(ACCESS_TOKEN_KEY).as_deref(), Some("a2"));
        assert_eq!(storage.get(REFRESH_TOKEN_KEY).as_deref(), Some("r1"));
        assert_eq!(storage.get(USER_INFO_KEY), None);
    }

    #[test]
    fn memory_storage_with_entries() {
        let storage = MemoryStorage::with_entries([(ACCESS_TOKEN_KEY, "token")]);
        assert_eq!(storage.get(ACCESS_TOKEN_KEY).as_deref(), Some("token"));

        assert!(storage
            .apply(StorageBatch::new().remove(ACCESS_TOKEN_KEY))
            .is_ok());
        assert_eq!(storage.get(ACCESS_TOKEN_KEY), None);
    }
}
