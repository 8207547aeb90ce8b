//! Primary grid math: pure coordinate-to-cell conversion, no state.
//!
//! Cells are aligned to the absolute (lat −90, lon −180) origin, never to the
//! viewport, so `R{row}C{col}` always names the same geography regardless of
//! how the map has been panned or zoomed.

use crate::geo::{GeoBounds, LatLon};
use crate::numbers;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier of a primary grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellId {
    pub row: i64,
    pub col: i64,
}

impl CellId {
    #[must_use]
    pub const fn new(row: i64, col: i64) -> Self {
        Self { row, col }
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R{}C{}", self.row, self.col)
    }
}

/// One primary grid cell: id plus grid-aligned bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridCell {
    pub id: CellId,
    pub bounds: GeoBounds,
}

fn cell_bounds(id: CellId, step_deg: f64) -> GeoBounds {
    let row = id.row as f64;
    let col = id.col as f64;
    GeoBounds::from_edges(
        row * step_deg - 90.0,
        col * step_deg - 180.0,
        (row + 1.0) * step_deg - 90.0,
        (col + 1.0) * step_deg - 180.0,
    )
}

/// Resolve the cell containing a point.
///
/// Row and column come from floor division of the origin-shifted coordinates
/// by the angular step; every point inside the returned bounds resolves back
/// to the same id.
#[must_use]
pub fn cell_for_lat_lon(lat: f64, lon: f64, step_deg: f64) -> Option<GridCell> {
    let row = numbers::floor_index(lat + 90.0, step_deg)?;
    let col = numbers::floor_index(lon + 180.0, step_deg)?;
    let id = CellId::new(row, col);
    Some(GridCell {
        id,
        bounds: cell_bounds(id, step_deg),
    })
}

/// Enumerate every cell whose extent intersects `viewport`, row-major.
///
/// Alignment is to the global step grid, not the viewport edges. Degenerate
/// viewports enumerate nothing.
#[must_use]
pub fn cells_in_viewport(viewport: &GeoBounds, step_deg: f64) -> Vec<GridCell> {
    if viewport.is_empty() {
        return Vec::new();
    }
    let Some(row_start) = numbers::floor_index(viewport.sw.lat + 90.0, step_deg) else {
        return Vec::new();
    };
    let Some(row_end) = numbers::ceil_index(viewport.ne.lat + 90.0, step_deg) else {
        return Vec::new();
    };
    let Some(col_start) = numbers::floor_index(viewport.sw.lon + 180.0, step_deg) else {
        return Vec::new();
    };
    let Some(col_end) = numbers::ceil_index(viewport.ne.lon + 180.0, step_deg) else {
        return Vec::new();
    };

    let mut cells = Vec::new();
    for row in row_start..row_end {
        for col in col_start..col_end {
            let id = CellId::new(row, col);
            cells.push(GridCell {
                id,
                bounds: cell_bounds(id, step_deg),
            });
        }
    }
    cells
}
