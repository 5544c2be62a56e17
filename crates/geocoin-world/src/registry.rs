//! Flyweight registry of canonical cells.
//!
//! Each `(i, j)` gets exactly one shared [`Cell`] for the lifetime of the
//! registry. The cell carries the intrinsic, immutable data every cache in
//! that tile needs (address, bounds, origin tag), so respawning a
//! neighborhood after every move allocates nothing for cells already seen.
//!
//! Sharing is an optimization only: [`Cell`] equality is by address, and
//! callers may compare handles with [`Arc::ptr_eq`] or by value alike.
//! There is no eviction; the registry grows with the set of visited cells.

use std::collections::BTreeMap;
use std::sync::Arc;

use geocoin_types::{CellAddress, CellBounds};

use crate::grid::Grid;

/// Canonical, immutable data for one grid cell.
#[derive(Debug)]
pub struct Cell {
    address: CellAddress,
    bounds: CellBounds,
    tag: String,
}

impl Cell {
    fn new(grid: &Grid, address: CellAddress) -> Self {
        Self {
            address,
            bounds: grid.cell_bounds(address),
            tag: address.tag(),
        }
    }

    /// The cell's address.
    pub const fn address(&self) -> CellAddress {
        self.address
    }

    /// The cell's real-world rectangle.
    pub const fn bounds(&self) -> CellBounds {
        self.bounds
    }

    /// Origin tag (`"i:j"`) stamped on tokens minted here.
    pub fn tag(&self) -> &str {
        &self.tag
    }
}

impl PartialEq for Cell {
    fn eq(&self, other: &Self) -> bool {
        self.address == other.address
    }
}

impl Eq for Cell {}

/// Interning table from address to canonical [`Cell`].
#[derive(Debug, Clone, Default)]
pub struct CellRegistry {
    grid: Grid,
    cells: BTreeMap<CellAddress, Arc<Cell>>,
}

impl CellRegistry {
    /// Create an empty registry over `grid`.
    pub const fn new(grid: Grid) -> Self {
        Self {
            grid,
            cells: BTreeMap::new(),
        }
    }

    /// The grid geometry cells are created with.
    pub const fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Return the canonical cell for `(i, j)`, interning it on first request.
    pub fn get_or_create(&mut self, i: i64, j: i64) -> Arc<Cell> {
        self.intern(CellAddress::new(i, j))
    }

    /// Return the canonical cell for `address`, interning it on first request.
    pub fn intern(&mut self, address: CellAddress) -> Arc<Cell> {
        let grid = self.grid;
        Arc::clone(
            self.cells
                .entry(address)
                .or_insert_with(|| Arc::new(Cell::new(&grid, address))),
        )
    }

    /// Look up an already-interned cell without creating it.
    pub fn get(&self, address: CellAddress) -> Option<Arc<Cell>> {
        self.cells.get(&address).cloned()
    }

    /// Number of interned cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether no cell has been interned yet.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_coordinates_share_one_instance() {
        let mut registry = CellRegistry::new(Grid::default());
        let a = registry.get_or_create(10, 20);
        let b = registry.get_or_create(10, 20);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn distinct_coordinates_get_distinct_cells() {
        let mut registry = CellRegistry::new(Grid::default());
        let a = registry.get_or_create(10, 20);
        let b = registry.get_or_create(20, 10);
        assert!(!Arc::ptr_eq(&a, &b));
        assert_ne!(*a, *b);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn cell_precomputes_tag_and_bounds() {
        let grid = Grid::default();
        let mut registry = CellRegistry::new(grid);
        let cell = registry.get_or_create(-3, 7);
        assert_eq!(cell.tag(), "-3:7");
        assert_eq!(cell.bounds(), grid.cell_bounds(CellAddress::new(-3, 7)));
    }

    #[test]
    fn get_does_not_intern() {
        let mut registry = CellRegistry::new(Grid::default());
        assert!(registry.get(CellAddress::new(1, 1)).is_none());
        assert!(registry.is_empty());
        let _ = registry.intern(CellAddress::new(1, 1));
        assert!(registry.get(CellAddress::new(1, 1)).is_some());
    }
}
