//! Primary grid overlay: visibility state machine, grid drawing, and cell
//! selection.

use crate::camera::{CameraRequest, Viewport};
use crate::events::MapEvent;
use crate::grid;
use crate::layers::{LayerKey, Shape, ShapeStyle};
use crate::session::EngineCtx;

const LINE_COLOR: &str = "#00bcd4";
const HIGHLIGHT_COLOR: &str = "#ffc107";

/// Visibility state of the primary grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridVisibility {
    Hidden,
    Visible,
}

#[derive(Debug)]
pub struct PrimaryGridOverlay {
    visibility: GridVisibility,
}

impl Default for PrimaryGridOverlay {
    fn default() -> Self {
        Self::new()
    }
}

impl PrimaryGridOverlay {
    #[must_use]
    pub fn new() -> Self {
        Self {
            visibility: GridVisibility::Hidden,
        }
    }

    #[must_use]
    pub const fn is_visible(&self) -> bool {
        matches!(self.visibility, GridVisibility::Visible)
    }

    /// Flip visibility. Showing draws the viewport grid; hiding clears every
    /// grid layer and resets the parent selection. Emits `gridToggled` on
    /// both transitions and reports the new visibility.
    pub(crate) fn toggle(&mut self, ctx: &mut EngineCtx<'_>, viewport: &Viewport) -> bool {
        match self.visibility {
            GridVisibility::Hidden => {
                self.visibility = GridVisibility::Visible;
                ctx.state.grid_visible = true;
                self.redraw(ctx, viewport);
                ctx.bus.emit(MapEvent::GridToggled { visible: true });
                true
            }
            GridVisibility::Visible => {
                self.visibility = GridVisibility::Hidden;
                ctx.layers.clear_many(&[
                    LayerKey::GridLines,
                    LayerKey::GridLabels,
                    LayerKey::GridHighlight,
                ]);
                ctx.state.grid_visible = false;
                ctx.state.clear_all();
                ctx.bus.emit(MapEvent::GridToggled { visible: false });
                false
            }
        }
    }

    /// Recompute and redraw all visible cells. Full redraw; the cell count is
    /// viewport-bounded so diffing is not worth its bookkeeping.
    pub(crate) fn on_viewport_change(&mut self, ctx: &mut EngineCtx<'_>, viewport: &Viewport) {
        if !self.is_visible() {
            return;
        }
        self.redraw(ctx, viewport);
        // Keep the highlight in sync with the retained selection.
        if let Some(bounds) = ctx.state.selected_cell_bounds {
            ctx.layers.clear(LayerKey::GridHighlight);
            ctx.layers.push(
                LayerKey::GridHighlight,
                Shape::Rect {
                    bounds,
                    style: ShapeStyle::filled(HIGHLIGHT_COLOR, 2.0, 1.0, 0.15),
                },
            );
        }
    }

    /// Resolve a click to its cell, highlight it, and emit
    /// `gridCellSelected`. Returns the selected cell bounds so the session
    /// can notify downstream components.
    pub(crate) fn on_click(
        &mut self,
        ctx: &mut EngineCtx<'_>,
        lat: f64,
        lon: f64,
    ) -> Option<crate::geo::GeoBounds> {
        if !self.is_visible() {
            return None;
        }
        let cell = grid::cell_for_lat_lon(lat, lon, ctx.cfg.grid.step_deg)?;
        ctx.layers.clear(LayerKey::GridHighlight);
        ctx.layers.push(
            LayerKey::GridHighlight,
            Shape::Rect {
                bounds: cell.bounds,
                style: ShapeStyle::filled(HIGHLIGHT_COLOR, 2.0, 1.0, 0.15),
            },
        );
        ctx.state.select_parent(cell.bounds);
        ctx.bus.emit(MapEvent::GridCellSelected {
            bounds: cell.bounds,
        });
        Some(cell.bounds)
    }

    /// Smoothly recenter on the clicked cell. Purely a viewing convenience;
    /// no selection state changes.
    pub(crate) fn on_double_click(&mut self, ctx: &mut EngineCtx<'_>, lat: f64, lon: f64) {
        if !self.is_visible() {
            return;
        }
        let Some(cell) = grid::cell_for_lat_lon(lat, lon, ctx.cfg.grid.step_deg) else {
            return;
        };
        ctx.camera.push(CameraRequest::FlyTo {
            center: cell.bounds.center(),
            zoom: ctx.cfg.camera.cell_focus_zoom,
            duration_ms: ctx.cfg.camera.fly_duration_ms,
        });
    }

    fn redraw(&self, ctx: &mut EngineCtx<'_>, viewport: &Viewport) {
        ctx.layers
            .clear_many(&[LayerKey::GridLines, LayerKey::GridLabels]);
        let cells = grid::cells_in_viewport(&viewport.bounds, ctx.cfg.grid.step_deg);
        let draw_labels = viewport.zoom >= ctx.cfg.grid.label_zoom_threshold;
        for cell in &cells {
            ctx.layers.push(
                LayerKey::GridLines,
                Shape::Rect {
                    bounds: cell.bounds,
                    style: ShapeStyle::stroke(LINE_COLOR, 1.0, 0.6),
                },
            );
            if draw_labels {
                ctx.layers.push(
                    LayerKey::GridLabels,
                    Shape::Label {
                        at: cell.bounds.center(),
                        text: cell.id.to_string(),
                    },
                );
            }
        }
    }
}
