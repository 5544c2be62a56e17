//! Player position, score, held tokens, and movement trail.
//!
//! [`PlayerLedger`] is the authoritative in-memory player state. Score and
//! held tokens only change through the exchange protocol in
//! [`crate::exchange`], which moves them in lockstep.
//!
//! # Persisted form
//!
//! ```text
//! {"version":1,
//!  "position":{"lat":..,"lng":..},
//!  "score":N,
//!  "tokens":[{"origin":"i:j","serial":k}, ...],
//!  "trail":[{"position":{..},"recorded_at":"RFC 3339"}, ...]}
//! ```
//!
//! The current cell is not stored; it is re-derived from `position` on load
//! so it can never disagree with the grid geometry in use.
//!
//! The trail keeps at most [`MAX_TRAIL_POINTS`] entries. Older points are
//! dropped from the front, so the record stays bounded however long a
//! session runs.

use chrono::Utc;
use geocoin_types::{CellAddress, GeoPoint, PlayerView, Token, TrailPoint};
use geocoin_world::Grid;
use geocoin_world::memento::check_token_identities;
use serde::{Deserialize, Serialize};

use crate::LedgerError;

/// Current player record schema version.
pub const PLAYER_RECORD_VERSION: u32 = 1;

/// Most trail points kept in memory and in the player record.
pub const MAX_TRAIL_POINTS: usize = 1024;

#[derive(Serialize)]
struct PlayerRecordRef<'a> {
    version: u32,
    position: GeoPoint,
    score: u32,
    tokens: &'a [Token],
    trail: &'a [TrailPoint],
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct PlayerRecord {
    version: u32,
    position: GeoPoint,
    score: u32,
    tokens: Vec<Token>,
    #[serde(default)]
    trail: Vec<TrailPoint>,
}

/// The player's mutable state.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerLedger {
    position: GeoPoint,
    cell: CellAddress,
    score: u32,
    tokens: Vec<Token>,
    trail: Vec<TrailPoint>,
}

impl PlayerLedger {
    /// A new player standing at `start` with no score and no tokens.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::World`] if `start` cannot be mapped to a cell.
    pub fn new(grid: &Grid, start: GeoPoint) -> Result<Self, LedgerError> {
        let cell = grid.point_to_cell(start)?;
        Ok(Self {
            position: start,
            cell,
            score: 0,
            tokens: Vec::new(),
            trail: Vec::new(),
        })
    }

    /// Current position.
    pub const fn position(&self) -> GeoPoint {
        self.position
    }

    /// Cell containing the current position.
    pub const fn cell(&self) -> CellAddress {
        self.cell
    }

    /// Current score.
    pub const fn score(&self) -> u32 {
        self.score
    }

    /// Tokens held, oldest first.
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Recorded movement trail, oldest first.
    pub fn trail(&self) -> &[TrailPoint] {
        &self.trail
    }

    /// Move to `position`, re-deriving the current cell.
    ///
    /// Returns `true` if the player crossed into a different cell. On error
    /// the player is not moved.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::World`] if `position` cannot be mapped.
    pub fn relocate(&mut self, grid: &Grid, position: GeoPoint) -> Result<bool, LedgerError> {
        let cell = grid.point_to_cell(position)?;
        let crossed = cell != self.cell;
        self.position = position;
        self.cell = cell;
        Ok(crossed)
    }

    /// Append the current position to the movement trail.
    ///
    /// Once the trail holds [`MAX_TRAIL_POINTS`] entries the oldest is
    /// dropped.
    pub fn record_movement_history(&mut self) {
        self.trail.push(TrailPoint {
            position: self.position,
            recorded_at: Utc::now(),
        });
        truncate_trail(&mut self.trail);
    }

    pub(crate) fn receive(&mut self, token: Token) -> Result<(), LedgerError> {
        let score = self.score.checked_add(1).ok_or(LedgerError::ScoreOverflow)?;
        self.tokens.push(token);
        self.score = score;
        Ok(())
    }

    pub(crate) fn surrender(&mut self) -> Option<Token> {
        let score = self.score.checked_sub(1)?;
        let token = self.tokens.pop()?;
        self.score = score;
        Some(token)
    }

    /// Read-only snapshot for rendering.
    pub fn view(&self, tracking: bool) -> PlayerView {
        PlayerView {
            position: self.position,
            cell: self.cell,
            score: self.score,
            tokens: self.tokens.clone(),
            tracking,
        }
    }

    /// Serialize to the persisted record form.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Serialization`] if JSON encoding fails.
    pub fn to_record(&self) -> Result<String, LedgerError> {
        let record = PlayerRecordRef {
            version: PLAYER_RECORD_VERSION,
            position: self.position,
            score: self.score,
            tokens: &self.tokens,
            trail: &self.trail,
        };
        Ok(serde_json::to_string(&record)?)
    }

    /// Parse and validate a persisted record.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Deserialization`] for a shape mismatch, an
    /// unsupported version, a score that disagrees with the token count,
    /// duplicate or malformed tokens, or an unmappable position.
    pub fn from_record(grid: &Grid, raw: &str) -> Result<Self, LedgerError> {
        let record: PlayerRecord =
            serde_json::from_str(raw).map_err(|e| LedgerError::malformed(e.to_string()))?;

        if record.version != PLAYER_RECORD_VERSION {
            return Err(LedgerError::malformed(format!(
                "unsupported player record version {}",
                record.version
            )));
        }
        let held = u32::try_from(record.tokens.len()).map_err(|_| LedgerError::ScoreOverflow)?;
        if record.score != held {
            return Err(LedgerError::malformed(format!(
                "score {} does not match {held} held tokens",
                record.score
            )));
        }
        check_token_identities(&record.tokens)
            .map_err(|e| LedgerError::malformed(e.to_string()))?;
        if !record.position.is_finite() || record.trail.iter().any(|p| !p.position.is_finite()) {
            return Err(LedgerError::malformed("non-finite coordinates"));
        }
        let cell = grid
            .point_to_cell(record.position)
            .map_err(|e| LedgerError::malformed(e.to_string()))?;
        let mut trail = record.trail;
        truncate_trail(&mut trail);

        Ok(Self {
            position: record.position,
            cell,
            score: record.score,
            tokens: record.tokens,
            trail,
        })
    }
}

/// Drop the oldest points beyond [`MAX_TRAIL_POINTS`].
fn truncate_trail(trail: &mut Vec<TrailPoint>) {
    let excess = trail.len().saturating_sub(MAX_TRAIL_POINTS);
    if excess > 0 {
        trail.drain(..excess);
    }
}
