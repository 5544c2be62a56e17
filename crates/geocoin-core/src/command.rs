//! Named game operations.
//!
//! Every user interaction is expressed as a [`Command`] and executed by
//! [`GameSession::execute`](crate::GameSession::execute). Commands refer to
//! caches by cell address rather than by reference, so nothing outside the
//! session holds on to live cache state.

use geocoin_ledger::ExchangeOutcome;
use geocoin_types::{CellAddress, Direction, GeoPoint};
use serde::{Deserialize, Serialize};

/// A single player action.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    /// Take one token from the cache at `cell`.
    Collect {
        /// Target cache.
        cell: CellAddress,
    },
    /// Give one token to the cache at `cell`.
    Deposit {
        /// Target cache.
        cell: CellAddress,
    },
    /// Move the player to an explicit position.
    MoveTo {
        /// New position.
        position: GeoPoint,
    },
    /// Move the player one tile.
    Step {
        /// Direction of travel.
        direction: Direction,
    },
    /// Forget all state and start over.
    Reset,
}

/// Result of a player move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// The player moved and the neighborhood was rebuilt.
    Moved {
        /// Cell now containing the player.
        cell: CellAddress,
        /// Whether the move crossed a cell boundary.
        crossed: bool,
    },
    /// A sensor fix arrived while tracking was off.
    Ignored,
}

/// Result of an executed [`Command`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    /// A collect or deposit ran.
    Exchange(ExchangeOutcome),
    /// A move ran.
    Move(MoveOutcome),
    /// The session was reset.
    Reset,
}
