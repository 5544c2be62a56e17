//! Grid geometry, deterministic content, and cache state for Geocoin.
//!
//! This crate models the sparse, effectively infinite grid the player walks
//! across: how a point becomes a cell, how a cell's cache is derived from its
//! coordinates alone, and how a cache's mutable state is captured in and
//! restored from a memento.
//!
//! # Modules
//!
//! - [`grid`] -- Point-to-cell mapping, cell bounds, and neighborhoods.
//! - [`luck`] -- SHA-256 draws keyed by cell and purpose, plus spawn rules.
//! - [`registry`] -- Flyweight table of canonical [`Cell`]s.
//! - [`cache`] -- The [`Cache`] entity and its token moves.
//! - [`memento`] -- Strict, versioned memento codec.
//! - [`error`] -- Error types for world operations.
//!
//! [`Cell`]: registry::Cell
//! [`Cache`]: cache::Cache

pub mod cache;
pub mod error;
pub mod grid;
pub mod luck;
pub mod memento;
pub mod registry;

// Re-export primary types at crate root.
pub use cache::Cache;
pub use error::WorldError;
pub use grid::{DEFAULT_TILE_DEGREES, Grid};
pub use luck::{
    DEFAULT_INITIAL_VALUE_SCALE, DEFAULT_SPAWN_PROBABILITY, FixedLuck, HashLuck,
    INITIAL_VALUE_TAG, LuckSource, SPAWN_TAG, SpawnRules, luck_value,
};
pub use memento::MEMENTO_VERSION;
pub use registry::{Cell, CellRegistry};
