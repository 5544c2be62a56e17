//! Player ledger and token exchange for the Geocoin cache game.
//!
//! Tokens are minted once, when a cache is first generated, and from then on
//! only change hands. This crate owns the player's side of that accounting
//! and the two operations that move tokens between player and cache.
//!
//! # Modules
//!
//! - [`player`] -- [`PlayerLedger`]: position, score, held tokens, trail,
//!   and the persisted player record.
//! - [`exchange`] -- `collect` and `deposit`.
//! - [`conservation`] -- Audit that exchanges neither create nor destroy
//!   tokens.
//!
//! # Usage
//!
//! ```
//! use geocoin_ledger::{ExchangeOutcome, PlayerLedger, collect};
//! use geocoin_types::GeoPoint;
//! use geocoin_world::{Cache, CellRegistry, Grid};
//!
//! let grid = Grid::default();
//! let mut registry = CellRegistry::new(grid);
//! let mut cache = Cache::mint(registry.get_or_create(10, 20), 2);
//! let mut player = PlayerLedger::new(&grid, GeoPoint::new(0.001, 0.002)).ok();
//!
//! if let Some(player) = player.as_mut() {
//!     assert_eq!(collect(&mut cache, player), ExchangeOutcome::Applied);
//!     assert_eq!(player.score(), 1);
//! }
//! assert_eq!(cache.value(), 1);
//! ```

pub mod conservation;
pub mod exchange;
pub mod player;

// Re-export primary types at crate root.
pub use conservation::{ConservationResult, Holdings, tally, verify_conservation};
pub use exchange::{ExchangeOutcome, SkipReason, collect, deposit};
pub use player::{MAX_TRAIL_POINTS, PLAYER_RECORD_VERSION, PlayerLedger};

use geocoin_world::WorldError;

/// Errors that can occur in player ledger operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// A position could not be mapped to a cell.
    #[error("world error: {0}")]
    World(#[from] WorldError),

    /// A persisted player record failed to parse or validate.
    #[error("malformed player record: {reason}")]
    Deserialization {
        /// What was wrong with the input.
        reason: String,
    },

    /// Encoding the player record failed.
    #[error("player record encoding error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The score counter would overflow.
    #[error("player score overflow")]
    ScoreOverflow,
}

impl LedgerError {
    /// Shorthand for a [`LedgerError::Deserialization`] with the given reason.
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::Deserialization {
            reason: reason.into(),
        }
    }
}
