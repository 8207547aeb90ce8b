//! Session-wide selection state.
//!
//! One instance per session, owned by `MapSession` and mutated only by the
//! overlay components in response to user gestures. A subcell can only exist
//! while its parent cell is the current selection; road data can only exist
//! while a subcell is selected.

use crate::geo::GeoBounds;
use crate::geojson::FeatureCollection;
use crate::subgrid::SubCell;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SelectionState {
    pub grid_visible: bool,
    pub selected_cell_bounds: Option<GeoBounds>,
    pub selected_subcell: Option<SubCell>,
    pub scan_completed: bool,
    pub road_geojson: Option<FeatureCollection>,
    pub road_mapping_completed: bool,
}

impl SelectionState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop everything that hangs off the selected parent cell: subcell,
    /// scan flag, and fetched road data. The parent selection itself stays.
    pub fn clear_parent_artifacts(&mut self) {
        self.selected_subcell = None;
        self.scan_completed = false;
        self.clear_road_artifacts();
    }

    /// Drop fetched road data and its completion flag.
    pub fn clear_road_artifacts(&mut self) {
        self.road_geojson = None;
        self.road_mapping_completed = false;
    }

    /// Full teardown, used when grid visibility toggles off.
    pub fn clear_all(&mut self) {
        self.selected_cell_bounds = None;
        self.clear_parent_artifacts();
    }

    /// Replace the selected parent cell, invalidating dependent state first.
    pub fn select_parent(&mut self, bounds: GeoBounds) {
        self.clear_parent_artifacts();
        self.selected_cell_bounds = Some(bounds);
    }

    /// Replace the selected subcell, invalidating road data from any prior
    /// subcell selection.
    pub fn select_subcell(&mut self, subcell: SubCell) {
        self.clear_road_artifacts();
        self.selected_subcell = Some(subcell);
    }
}
