//! Error types for the game session.
//!
//! Nothing here is fatal to a running session. Corrupt stored data and an
//! unusable durable store are recovered from inside the session and only
//! logged; the variants below reach the caller when a single request cannot
//! be carried out.

use geocoin_db::DbError;
use geocoin_ledger::LedgerError;
use geocoin_types::CellAddress;
use geocoin_world::WorldError;

use crate::config::ConfigError;

/// Errors returned by [`GameSession`](crate::GameSession) operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The configuration is unusable.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// A position could not be mapped or a memento could not be encoded.
    #[error("world error: {0}")]
    World(#[from] WorldError),

    /// The player record could not be built or encoded.
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// Opening the durable store failed before the session existed.
    #[error("storage error: {0}")]
    Db(#[from] DbError),

    /// No cache is materialized at the requested cell.
    #[error("no active cache at cell {0}")]
    CacheNotActive(CellAddress),
}
