//! Error types for the `geocoin-world` crate.
//!
//! All fallible operations in this crate return [`WorldError`] through the
//! standard [`Result`] type alias.

use geocoin_types::GeoPoint;

/// Errors that can occur in grid, generation, and memento operations.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// The tile size is not a finite positive number of degrees.
    #[error("tile size must be finite and positive, got {0}")]
    InvalidTileSize(f64),

    /// The spawn probability lies outside `[0, 1]`.
    #[error("spawn probability must be within [0, 1], got {0}")]
    InvalidSpawnProbability(f64),

    /// The initial value scale is zero.
    #[error("initial value scale must be at least 1, got {0}")]
    InvalidValueScale(u32),

    /// The point cannot be mapped to a cell (non-finite or beyond the
    /// addressable range).
    #[error("point {0} cannot be mapped to a cell")]
    PointOutOfRange(GeoPoint),

    /// A memento string failed to parse or validate.
    #[error("malformed memento: {reason}")]
    Deserialization {
        /// What was wrong with the input.
        reason: String,
    },

    /// Encoding a memento failed.
    #[error("memento encoding error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A token count does not fit the cache value type.
    #[error("arithmetic overflow in world calculation")]
    ArithmeticOverflow,
}

impl WorldError {
    /// Shorthand for a [`WorldError::Deserialization`] with the given reason.
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::Deserialization {
            reason: reason.into(),
        }
    }
}
