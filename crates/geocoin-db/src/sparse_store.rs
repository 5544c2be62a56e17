//! Sparse map from cell address to cache memento.
//!
//! Only cells whose cache has ever been materialized and flushed appear
//! here; absence means "never touched, generate fresh". Entries are never
//! pruned during a session, so a cache emptied to zero stays empty rather
//! than regenerating. Only an explicit [`clear`] forgets cells.
//!
//! The store tracks which entries changed since the last successful write
//! so the session can persist them, together with the player record, in one
//! atomic batch.
//!
//! [`clear`]: SparseStateStore::clear

use std::collections::{BTreeMap, BTreeSet};

use geocoin_types::{CellAddress, Memento};

use crate::error::DbError;
use crate::kv::{CACHE_KEY_PREFIX, KeyValueStore, cache_key, parse_cache_key};

/// In-memory mirror of every stored memento plus a dirty set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SparseStateStore {
    mementos: BTreeMap<CellAddress, Memento>,
    dirty: BTreeSet<CellAddress>,
}

impl SparseStateStore {
    /// Create an empty store.
    pub const fn new() -> Self {
        Self {
            mementos: BTreeMap::new(),
            dirty: BTreeSet::new(),
        }
    }

    /// Bulk-load every cache memento from `kv`.
    ///
    /// Keys in the cache namespace whose coordinates cannot be decoded are
    /// deleted from `kv` and skipped. Memento contents are not validated
    /// here; that happens when a cache is restored from them.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if `kv` cannot be read.
    pub fn load_all(kv: &mut dyn KeyValueStore) -> Result<Self, DbError> {
        let mut store = Self::new();
        for key in kv.keys()? {
            if !key.starts_with(CACHE_KEY_PREFIX) {
                continue;
            }
            let Some(cell) = parse_cache_key(&key) else {
                tracing::warn!(key, "Discarding undecodable cache key");
                if let Err(e) = kv.remove(&key) {
                    tracing::warn!(key, error = %e, "Failed to delete undecodable cache key");
                }
                continue;
            };
            if let Some(raw) = kv.load(&key)? {
                store.mementos.insert(cell, Memento::new(raw));
            }
        }
        tracing::debug!(cells = store.mementos.len(), "Loaded sparse state store");
        Ok(store)
    }

    /// The memento stored for `cell`, if any.
    pub fn get(&self, cell: CellAddress) -> Option<&Memento> {
        self.mementos.get(&cell)
    }

    /// Record `memento` for `cell`, marking it for the next persist.
    ///
    /// Writing a memento identical to the stored one is a no-op.
    pub fn put(&mut self, cell: CellAddress, memento: Memento) {
        if self.mementos.get(&cell) == Some(&memento) {
            return;
        }
        self.mementos.insert(cell, memento);
        self.dirty.insert(cell);
    }

    /// Forget `cell` in memory and delete its durable entry.
    ///
    /// Used to discard a memento that failed to decode.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the durable delete fails; the in-memory entry
    /// is removed regardless.
    pub fn discard(&mut self, cell: CellAddress, kv: &mut dyn KeyValueStore) -> Result<(), DbError> {
        self.mementos.remove(&cell);
        self.dirty.remove(&cell);
        kv.remove(&cache_key(cell))
    }

    /// Whether a memento exists for `cell`.
    pub fn contains(&self, cell: CellAddress) -> bool {
        self.mementos.contains_key(&cell)
    }

    /// Number of cells with a memento.
    pub fn len(&self) -> usize {
        self.mementos.len()
    }

    /// Whether no cell has a memento.
    pub fn is_empty(&self) -> bool {
        self.mementos.is_empty()
    }

    /// Whether any entry changed since the last [`mark_clean`].
    ///
    /// [`mark_clean`]: SparseStateStore::mark_clean
    pub fn has_pending(&self) -> bool {
        !self.dirty.is_empty()
    }

    /// Key/value pairs changed since the last [`mark_clean`].
    ///
    /// [`mark_clean`]: SparseStateStore::mark_clean
    pub fn pending_entries(&self) -> Vec<(String, String)> {
        self.dirty
            .iter()
            .filter_map(|cell| {
                self.mementos
                    .get(cell)
                    .map(|m| (cache_key(*cell), m.as_str().to_owned()))
            })
            .collect()
    }

    /// Forget the dirty set after a successful write.
    pub fn mark_clean(&mut self) {
        self.dirty.clear();
    }

    /// Write pending entries to `kv` as one batch.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the write fails; entries stay pending.
    pub fn persist(&mut self, kv: &mut dyn KeyValueStore) -> Result<(), DbError> {
        let entries = self.pending_entries();
        if entries.is_empty() {
            return Ok(());
        }
        kv.save_batch(&entries)?;
        self.mark_clean();
        Ok(())
    }

    /// Forget every memento.
    pub fn clear(&mut self) {
        self.mementos.clear();
        self.dirty.clear();
    }

    /// Iterate over stored cells and their mementos in address order.
    pub fn iter(&self) -> impl Iterator<Item = (&CellAddress, &Memento)> {
        self.mementos.iter()
    }
}
