//! Grid coordinates: continuous geographic points and discrete cell addresses.
//!
//! A [`CellAddress`] names one fixed-size tile of an unbounded grid laid over
//! the globe. Row `i` indexes latitude, column `j` indexes longitude. The
//! address space is the full `i64` plane, so addresses are always handled as
//! composite keys and never as dense array offsets.
//!
//! The textual form `"i:j"` doubles as the origin tag stamped on every token
//! minted in that cell.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Separator between the two components of a cell tag.
pub const TAG_SEPARATOR: char = ':';

/// A geographic point in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct GeoPoint {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lng: f64,
}

impl GeoPoint {
    /// Create a point from latitude and longitude.
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Whether both coordinates are finite numbers.
    pub const fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lat, self.lng)
    }
}

/// Integer address of one grid cell.
///
/// Two addresses are equal iff both components are equal. Ordering is
/// row-major (`i` first, then `j`), which gives deterministic iteration
/// order for every map keyed by address.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export, export_to = "bindings/")]
pub struct CellAddress {
    /// Latitude row.
    pub i: i64,
    /// Longitude column.
    pub j: i64,
}

impl CellAddress {
    /// Create an address from its row and column.
    pub const fn new(i: i64, j: i64) -> Self {
        Self { i, j }
    }

    /// Return the address displaced by `(di, dj)`, or `None` on overflow.
    pub const fn offset(self, di: i64, dj: i64) -> Option<Self> {
        let Some(i) = self.i.checked_add(di) else {
            return None;
        };
        let Some(j) = self.j.checked_add(dj) else {
            return None;
        };
        Some(Self { i, j })
    }

    /// The origin tag for tokens minted in this cell (`"i:j"`).
    pub fn tag(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{TAG_SEPARATOR}{}", self.i, self.j)
    }
}

/// Error returned when a string is not a well-formed `"i:j"` cell tag.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed cell tag: {0:?}")]
pub struct ParseCellError(pub String);

impl FromStr for CellAddress {
    type Err = ParseCellError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || ParseCellError(s.to_owned());
        let (i, j) = s.split_once(TAG_SEPARATOR).ok_or_else(malformed)?;
        let i = i.parse::<i64>().map_err(|_| malformed())?;
        let j = j.parse::<i64>().map_err(|_| malformed())?;
        Ok(Self { i, j })
    }
}

/// Axis-aligned rectangle covered by one cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct CellBounds {
    /// Minimum latitude and longitude corner.
    pub south_west: GeoPoint,
    /// Maximum latitude and longitude corner.
    pub north_east: GeoPoint,
}

impl CellBounds {
    /// Whether `point` lies strictly inside the rectangle.
    pub fn contains_strict(&self, point: GeoPoint) -> bool {
        point.lat > self.south_west.lat
            && point.lat < self.north_east.lat
            && point.lng > self.south_west.lng
            && point.lng < self.north_east.lng
    }

    /// The rectangle's center point.
    pub fn center(&self) -> GeoPoint {
        GeoPoint {
            lat: self.south_west.lat.midpoint(self.north_east.lat),
            lng: self.south_west.lng.midpoint(self.north_east.lng),
        }
    }
}

/// One-tile movement directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum Direction {
    /// Increasing latitude.
    North,
    /// Decreasing latitude.
    South,
    /// Increasing longitude.
    East,
    /// Decreasing longitude.
    West,
}

impl Direction {
    /// Cell displacement `(di, dj)` for one step in this direction.
    pub const fn cell_offset(self) -> (i64, i64) {
        match self {
            Self::North => (1, 0),
            Self::South => (-1, 0),
            Self::East => (0, 1),
            Self::West => (0, -1),
        }
    }
}
