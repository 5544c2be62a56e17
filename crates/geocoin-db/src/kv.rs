//! The durable key-value store interface and its in-memory implementation.
//!
//! # Key Patterns
//!
//! | Pattern | Value |
//! |---------|-------|
//! | `player:state` | JSON player record |
//! | `cache:{i}:{j}` | Cache memento for cell `(i, j)` |
//!
//! Both halves of a cache key are signed decimal integers, so any address in
//! the `i64` plane round-trips through its key without loss.

use std::collections::BTreeMap;

use geocoin_types::CellAddress;

use crate::error::DbError;

/// Key holding the persisted player record.
pub const PLAYER_STATE_KEY: &str = "player:state";

/// Prefix shared by every cache memento key.
pub const CACHE_KEY_PREFIX: &str = "cache:";

/// Storage key for the memento of `cell`.
pub fn cache_key(cell: CellAddress) -> String {
    format!("{CACHE_KEY_PREFIX}{}:{}", cell.i, cell.j)
}

/// Recover the cell address from a cache key.
///
/// Returns `None` for keys outside the cache namespace or with malformed
/// coordinates.
pub fn parse_cache_key(key: &str) -> Option<CellAddress> {
    key.strip_prefix(CACHE_KEY_PREFIX)?.parse().ok()
}

/// A durable string-to-string store.
///
/// Implementations must apply [`save_batch`] atomically: after a crash
/// either every entry of the batch is visible or none is.
///
/// [`save_batch`]: KeyValueStore::save_batch
pub trait KeyValueStore {
    /// Read the value at `key`, or `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the backing storage cannot be read.
    fn load(&self, key: &str) -> Result<Option<String>, DbError>;

    /// Write every `(key, value)` pair as one atomic unit.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the write fails; no entry is applied then.
    fn save_batch(&mut self, entries: &[(String, String)]) -> Result<(), DbError>;

    /// Delete `key` if present.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the backing storage cannot be written.
    fn remove(&mut self, key: &str) -> Result<(), DbError>;

    /// All keys currently stored, in ascending order.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the backing storage cannot be read.
    fn keys(&self) -> Result<Vec<String>, DbError>;

    /// Delete everything.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the backing storage cannot be written.
    fn clear(&mut self) -> Result<(), DbError>;

    /// Write a single entry.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the write fails.
    fn save(&mut self, key: &str, value: &str) -> Result<(), DbError> {
        self.save_batch(&[(key.to_owned(), value.to_owned())])
    }
}

/// A store that lives only as long as the process.
///
/// Used when no storage path is configured and as the fallback after the
/// durable store becomes unavailable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    /// Create an empty store.
    pub const fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<String>, DbError> {
        Ok(self.entries.get(key).cloned())
    }

    fn save_batch(&mut self, entries: &[(String, String)]) -> Result<(), DbError> {
        for (key, value) in entries {
            self.entries.insert(key.clone(), value.clone());
        }
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), DbError> {
        self.entries.remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, DbError> {
        Ok(self.entries.keys().cloned().collect())
    }

    fn clear(&mut self) -> Result<(), DbError> {
        self.entries.clear();
        Ok(())
    }
}
