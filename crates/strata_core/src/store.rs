//! # Durable Key-Value Store
//!
//! The host owns persistence; generation only sees string keys mapping to
//! string values. Backends may impose a per-value size ceiling, which is
//! why larger payloads go through [`crate::SegmentedStore`].

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::error::{StoreError, StoreResult};

/// Host-provided durable storage.
///
/// Methods take `&self` so one store can be shared between the generator
/// and the host.
pub trait KeyValueStore: Send + Sync {
    /// Reads a value; `None` if absent.
    fn get(&self, key: &str) -> Option<String>;

    /// Writes a value, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Backend-specific failure, including values over the size ceiling.
    fn set(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Removes a value. Deleting an absent key is not an error.
    fn delete(&self, key: &str);
}

/// In-memory store with an optional per-value ceiling.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, String>>,
    value_limit: Option<usize>,
}

impl MemoryStore {
    /// Creates an unbounded store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store rejecting values longer than `limit` bytes.
    #[must_use]
    pub fn with_value_limit(limit: usize) -> Self {
        Self {
            values: RwLock::new(HashMap::new()),
            value_limit: Some(limit),
        }
    }

    /// Number of stored keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }

    /// Snapshot of all keys, sorted.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.values.read().keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        if let Some(limit) = self.value_limit {
            if value.len() > limit {
                return Err(StoreError::ValueTooLarge {
                    key: key.to_owned(),
                    len: value.len(),
                    limit,
                });
            }
        }
        self.values.write().insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn delete(&self, key: &str) {
        self.values.write().remove(key);
    }
}
