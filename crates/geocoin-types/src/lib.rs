//! Shared type definitions for the Geocoin cache game.
//!
//! This crate is the single source of truth for the value types that flow
//! between the grid, the player ledger, the persistence layer, and the
//! rendering collaborator. Types that reach the map front end are exported
//! to `TypeScript` via `ts-rs`.
//!
//! # Modules
//!
//! - [`cell`] -- Geographic points, cell addresses, bounds, and directions
//! - [`token`] -- Token identity and the opaque [`Memento`] wrapper
//! - [`views`] -- Read-only snapshots for rendering

pub mod cell;
pub mod token;
pub mod views;

// Re-export all public types at crate root for convenience.
pub use cell::{CellAddress, CellBounds, Direction, GeoPoint, ParseCellError, TAG_SEPARATOR};
pub use token::{Memento, Token};
pub use views::{CacheView, PlayerView, TrailPoint};

#[cfg(test)]
mod tests {
    //! `TypeScript` binding generation for the rendering layer.

    #[test]
    fn export_bindings() {
        // The files are written to the `bindings/` directory relative to the
        // crate root.
        use ts_rs::TS;

        let _ = crate::cell::GeoPoint::export_all();
        let _ = crate::cell::CellAddress::export_all();
        let _ = crate::cell::CellBounds::export_all();
        let _ = crate::cell::Direction::export_all();
        let _ = crate::token::Token::export_all();
        let _ = crate::views::CacheView::export_all();
        let _ = crate::views::PlayerView::export_all();
        let _ = crate::views::TrailPoint::export_all();
    }
}
