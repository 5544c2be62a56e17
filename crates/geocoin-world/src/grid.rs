//! Coordinate mapping between geographic points and grid cells.
//!
//! The grid is a uniform lattice of square tiles `tile_degrees` on a side,
//! anchored at `(0, 0)`. A point maps to the tile whose south-west corner is
//! `floor(point / tile_degrees)`:
//!
//! ```text
//! i = floor(lat / tile)      bounds = [i * tile, j * tile]
//! j = floor(lng / tile)            .. [(i + 1) * tile, (j + 1) * tile]
//! ```
//!
//! Flooring (rather than truncation) keeps negative coordinates consistent:
//! `-0.00005` with a tile of `0.0001` lands in row `-1`, not row `0`.

use geocoin_types::{CellAddress, CellBounds, Direction, GeoPoint};

use crate::error::WorldError;

/// Tile size used by the reference deployment (about 11 m of latitude).
pub const DEFAULT_TILE_DEGREES: f64 = 1e-4;

/// The lattice geometry: tile size and point/cell conversions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Grid {
    tile_degrees: f64,
}

impl Grid {
    /// Create a grid with the given tile size in degrees.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidTileSize`] unless the size is finite and
    /// strictly positive.
    pub fn new(tile_degrees: f64) -> Result<Self, WorldError> {
        if !tile_degrees.is_finite() || tile_degrees <= 0.0 {
            return Err(WorldError::InvalidTileSize(tile_degrees));
        }
        Ok(Self { tile_degrees })
    }

    /// Tile edge length in degrees.
    pub const fn tile_degrees(&self) -> f64 {
        self.tile_degrees
    }

    /// Map a point to the address of the cell containing it.
    ///
    /// Pure: the same point always yields the same address.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::PointOutOfRange`] for non-finite coordinates or
    /// points whose index would not fit in an `i64`.
    pub fn point_to_cell(&self, point: GeoPoint) -> Result<CellAddress, WorldError> {
        let i = self.axis_index(point.lat).ok_or(WorldError::PointOutOfRange(point))?;
        let j = self.axis_index(point.lng).ok_or(WorldError::PointOutOfRange(point))?;
        Ok(CellAddress::new(i, j))
    }

    /// The real-world rectangle covered by `cell`.
    pub fn cell_bounds(&self, cell: CellAddress) -> CellBounds {
        CellBounds {
            south_west: GeoPoint::new(self.edge(cell.i), self.edge(cell.j)),
            north_east: GeoPoint::new(self.far_edge(cell.i), self.far_edge(cell.j)),
        }
    }

    /// The center point of `cell`, which always maps back to `cell`.
    pub fn cell_center(&self, cell: CellAddress) -> GeoPoint {
        self.cell_bounds(cell).center()
    }

    /// All cells within `radius` tiles of `center` (a square), row-major.
    ///
    /// Cells whose address would overflow are skipped.
    pub fn neighborhood(&self, center: CellAddress, radius: u32) -> Vec<CellAddress> {
        let r = i64::from(radius);
        (-r..=r)
            .flat_map(|di| (-r..=r).filter_map(move |dj| center.offset(di, dj)))
            .collect()
    }

    /// The point one tile away from `point` in `direction`.
    pub fn step(&self, point: GeoPoint, direction: Direction) -> GeoPoint {
        let (di, dj) = direction.cell_offset();
        GeoPoint::new(
            self.tile_degrees.mul_add(unit(di), point.lat),
            self.tile_degrees.mul_add(unit(dj), point.lng),
        )
    }

    fn axis_index(&self, degrees: f64) -> Option<i64> {
        let scaled = (degrees / self.tile_degrees).floor();
        // i64::MAX is not exactly representable; 2^63 is the first value past it.
        #[allow(clippy::cast_precision_loss)]
        let limit = i64::MAX as f64;
        if !scaled.is_finite() || scaled < -limit || scaled >= limit {
            return None;
        }
        #[allow(clippy::cast_possible_truncation)]
        Some(scaled as i64)
    }

    #[allow(clippy::cast_precision_loss)]
    fn edge(&self, index: i64) -> f64 {
        index as f64 * self.tile_degrees
    }

    fn far_edge(&self, index: i64) -> f64 {
        index.checked_add(1).map_or_else(
            || self.edge(index) + self.tile_degrees,
            |next| self.edge(next),
        )
    }
}

impl Default for Grid {
    fn default() -> Self {
        Self {
            tile_degrees: DEFAULT_TILE_DEGREES,
        }
    }
}

#[allow(clippy::cast_precision_loss)]
const fn unit(offset: i64) -> f64 {
    offset as f64
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn grid() -> Grid {
        Grid::default()
    }

    #[test]
    fn rejects_degenerate_tile_sizes() {
        assert!(Grid::new(0.0).is_err());
        assert!(Grid::new(-1e-4).is_err());
        assert!(Grid::new(f64::NAN).is_err());
        assert!(Grid::new(f64::INFINITY).is_err());
        assert!(Grid::new(1e-4).is_ok());
    }

    #[test]
    fn maps_reference_start_point() {
        let cell = grid()
            .point_to_cell(GeoPoint::new(36.989_493_795_784_01, -122.062_771_285_485_04))
            .unwrap();
        assert_eq!(cell, CellAddress::new(369_894, -1_220_628));
    }

    #[test]
    fn floors_negative_coordinates() {
        let cell = grid().point_to_cell(GeoPoint::new(-0.000_05, 0.000_05)).unwrap();
        assert_eq!(cell, CellAddress::new(-1, 0));
    }

    #[test]
    fn mapping_is_pure() {
        let p = GeoPoint::new(51.477_8, -0.001_5);
        let a = grid().point_to_cell(p).unwrap();
        let b = grid().point_to_cell(p).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn center_maps_back_to_its_cell() {
        let g = grid();
        for cell in [
            CellAddress::new(0, 0),
            CellAddress::new(-1, -1),
            CellAddress::new(369_894, -1_220_628),
            CellAddress::new(-899_999, 1_799_999),
        ] {
            let center = g.cell_center(cell);
            assert!(g.cell_bounds(cell).contains_strict(center));
            assert_eq!(g.point_to_cell(center).unwrap(), cell);
        }
    }

    #[test]
    fn bounds_span_one_tile() {
        let g = Grid::new(0.5).unwrap();
        let b = g.cell_bounds(CellAddress::new(3, -2));
        assert!((b.south_west.lat - 1.5).abs() < 1e-12);
        assert!((b.south_west.lng + 1.0).abs() < 1e-12);
        assert!((b.north_east.lat - 2.0).abs() < 1e-12);
        assert!((b.north_east.lng + 0.5).abs() < 1e-12);
    }

    #[test]
    fn rejects_unmappable_points() {
        assert!(grid().point_to_cell(GeoPoint::new(f64::NAN, 0.0)).is_err());
        assert!(grid().point_to_cell(GeoPoint::new(0.0, f64::INFINITY)).is_err());
        assert!(grid().point_to_cell(GeoPoint::new(1e300, 0.0)).is_err());
    }

    #[test]
    fn neighborhood_is_square_and_row_major() {
        let cells = grid().neighborhood(CellAddress::new(10, 20), 1);
        assert_eq!(cells.len(), 9);
        assert_eq!(cells.first(), Some(&CellAddress::new(9, 19)));
        assert_eq!(cells.get(4), Some(&CellAddress::new(10, 20)));
        assert_eq!(cells.last(), Some(&CellAddress::new(11, 21)));
        assert_eq!(grid().neighborhood(CellAddress::new(0, 0), 8).len(), 289);
    }

    #[test]
    fn neighborhood_skips_overflowing_cells() {
        let cells = grid().neighborhood(CellAddress::new(i64::MAX, 0), 1);
        assert_eq!(cells.len(), 6);
    }

    #[test]
    fn step_moves_exactly_one_cell() {
        let g = grid();
        let start = g.cell_center(CellAddress::new(5, 5));
        let north = g.step(start, Direction::North);
        let west = g.step(start, Direction::West);
        assert_eq!(g.point_to_cell(north).unwrap(), CellAddress::new(6, 5));
        assert_eq!(g.point_to_cell(west).unwrap(), CellAddress::new(5, 4));
    }
}
