//! Error types for the persistence layer.
//!
//! All errors are propagated via [`DbError`], which wraps the underlying
//! I/O and JSON errors with context about which operation failed.

/// Errors that can occur in the persistence layer.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// Reading or writing the backing file failed.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Encoding a stored document failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored document or key could not be decoded.
    #[error("malformed stored data at {location}: {reason}")]
    Deserialization {
        /// The key or file that held the bad data.
        location: String,
        /// What was wrong with it.
        reason: String,
    },

    /// The durable store cannot be used at all.
    #[error("storage unavailable: {reason}")]
    StorageUnavailable {
        /// Why the store is unavailable.
        reason: String,
    },
}
