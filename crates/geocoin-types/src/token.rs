//! Collectible tokens and opaque cache mementos.
//!
//! A [`Token`] is identified by the tag of the cell that minted it plus a
//! serial number dense within that cell. Identity never changes; only the
//! owner (a cache or the player) does.

use core::fmt;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::cell::CellAddress;

/// A uniquely identified collectible unit.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(deny_unknown_fields)]
#[ts(export, export_to = "bindings/")]
pub struct Token {
    /// Tag (`"i:j"`) of the cell where the token was minted.
    pub origin: String,
    /// Serial number, unique within `origin`.
    pub serial: u32,
}

impl Token {
    /// Mint a token for `cell` with the given serial.
    pub fn minted_at(cell: CellAddress, serial: u32) -> Self {
        Self {
            origin: cell.tag(),
            serial,
        }
    }

    /// Parse the origin tag back into a cell address.
    pub fn origin_cell(&self) -> Option<CellAddress> {
        self.origin.parse().ok()
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.origin, self.serial)
    }
}

/// Serialized snapshot of a cache's mutable state.
///
/// The contents are opaque to everything except the codec in
/// `geocoin-world`; the store only moves these strings around.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Memento(String);

impl Memento {
    /// Wrap an already-encoded memento string.
    pub const fn new(encoded: String) -> Self {
        Self(encoded)
    }

    /// Borrow the encoded form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Return the encoded form.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl From<String> for Memento {
    fn from(encoded: String) -> Self {
        Self(encoded)
    }
}

impl fmt::Display for Memento {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
