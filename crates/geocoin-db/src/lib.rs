//! Persistence layer for the Geocoin cache game.
//!
//! The game keeps all authoritative state in a small key-value store: one
//! entry for the player and one per cell whose cache has ever been
//! materialized. This crate provides the store interface, two backends, and
//! the sparse in-memory index of cache mementos.
//!
//! # Architecture
//!
//! ```text
//! Session event
//!     |
//!     +-- mutate caches / player in memory
//!     |
//!     +-- SparseStateStore.put(cell, memento)   (marks dirty)
//!     |
//!     +-- save_batch(dirty mementos + player)   --> KeyValueStore
//!         |-- FileStore    (JSON document, atomic rename)
//!         +-- MemoryStore  (no durability)
//! ```
//!
//! # Modules
//!
//! - [`kv`] -- [`KeyValueStore`] trait, key patterns, [`MemoryStore`]
//! - [`file_store`] -- [`FileStore`] single-file backend
//! - [`sparse_store`] -- [`SparseStateStore`] cell-to-memento index
//! - [`error`] -- Shared error types

pub mod error;
pub mod file_store;
pub mod kv;
pub mod sparse_store;

// Re-export primary types for convenience.
pub use error::DbError;
pub use file_store::FileStore;
pub use kv::{
    CACHE_KEY_PREFIX, KeyValueStore, MemoryStore, PLAYER_STATE_KEY, cache_key, parse_cache_key,
};
pub use sparse_store::SparseStateStore;
