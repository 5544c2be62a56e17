//! Read-only snapshots handed to the rendering layer.
//!
//! Views are plain copies; mutating them has no effect on game state. They
//! are exported as `TypeScript` bindings for the map front end.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::cell::{CellAddress, CellBounds, GeoPoint};
use crate::token::Token;

/// Snapshot of one active cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct CacheView {
    /// The cell holding the cache.
    pub cell: CellAddress,
    /// Real-world rectangle of the cell, for drawing the marker.
    pub bounds: CellBounds,
    /// Number of tokens inside.
    pub value: u32,
    /// Tokens inside, oldest first.
    pub tokens: Vec<Token>,
}

/// Snapshot of the player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PlayerView {
    /// Current position.
    pub position: GeoPoint,
    /// Cell containing `position`.
    pub cell: CellAddress,
    /// Current score.
    pub score: u32,
    /// Tokens held, oldest first.
    pub tokens: Vec<Token>,
    /// Whether sensor fixes currently move the player.
    pub tracking: bool,
}

/// One recorded point of the movement trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(deny_unknown_fields)]
#[ts(export, export_to = "bindings/")]
pub struct TrailPoint {
    /// Where the player was.
    pub position: GeoPoint,
    /// When the point was appended.
    pub recorded_at: DateTime<Utc>,
}
