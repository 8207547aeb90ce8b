//! Subgrid engine: N×N subdivision of a selected primary cell and the
//! animated scan that reveals it.
//!
//! The scan is a deterministic timeline advanced by `tick(now_ms)`: subcells
//! are revealed in a shuffled order, one per reveal delay, then a uniformly
//! random target is flashed and flown to. `subgridCellSelected` fires only
//! after the animation settles. All randomness comes from the session's
//! seed-derived streams, so a seed replays the same scan.

use crate::events::MapEvent;
use crate::geo::GeoBounds;
use crate::layers::{LayerKey, Shape, ShapeStyle};
use crate::rng::RngBundle;
use crate::session::EngineCtx;
use rand::Rng;
use rand::seq::SliceRandom;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

const SUBCELL_COLOR: &str = "#8bc34a";
const HIGHLIGHT_COLOR: &str = "#ff5722";

/// Identifier of a subcell, local to its parent cell's N×N subdivision.
///
/// Serialized as the printable form `SubR{row}C{col}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubCellId {
    pub row: u32,
    pub col: u32,
}

impl SubCellId {
    #[must_use]
    pub const fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }
}

impl fmt::Display for SubCellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SubR{}C{}", self.row, self.col)
    }
}

impl FromStr for SubCellId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s
            .strip_prefix("SubR")
            .ok_or_else(|| format!("missing SubR prefix: {s}"))?;
        let (row, col) = rest
            .split_once('C')
            .ok_or_else(|| format!("missing C separator: {s}"))?;
        let row = row.parse().map_err(|_| format!("bad row: {s}"))?;
        let col = col.parse().map_err(|_| format!("bad col: {s}"))?;
        Ok(Self { row, col })
    }
}

impl Serialize for SubCellId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SubCellId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(D::Error::custom)
    }
}

/// One subcell of a subdivided primary cell.
///
/// The wire form carries `row` and `col` alongside the printable id, as
/// event consumers expect.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubCell {
    pub id: SubCellId,
    pub bounds: GeoBounds,
}

impl SubCell {
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.id.row
    }

    #[must_use]
    pub const fn col(&self) -> u32 {
        self.id.col
    }
}

#[derive(Serialize, Deserialize)]
struct SubCellWire {
    id: SubCellId,
    bounds: GeoBounds,
    row: u32,
    col: u32,
}

impl Serialize for SubCell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        SubCellWire {
            id: self.id,
            bounds: self.bounds,
            row: self.id.row,
            col: self.id.col,
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SubCell {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = SubCellWire::deserialize(deserializer)?;
        if wire.row != wire.id.row || wire.col != wire.id.col {
            return Err(D::Error::custom(format!(
                "subcell row/col ({}, {}) disagree with id {}",
                wire.row, wire.col, wire.id
            )));
        }
        Ok(Self {
            id: wire.id,
            bounds: wire.bounds,
        })
    }
}

/// Subdivide `parent` into an n×n grid of subcells, row-major from the
/// south-west corner. The subcells tile the parent exactly.
#[must_use]
pub fn subdivide(parent: &GeoBounds, n: u32) -> Vec<SubCell> {
    let n = n.max(1);
    let (height, width) = parent.span();
    let lat_step = height / f64::from(n);
    let lon_step = width / f64::from(n);
    let mut cells = Vec::with_capacity((n * n) as usize);
    for row in 0..n {
        for col in 0..n {
            let south = parent.sw.lat + lat_step * f64::from(row);
            let west = parent.sw.lon + lon_step * f64::from(col);
            // The outer edge snaps to the parent bound to avoid float drift.
            let north = if row + 1 == n {
                parent.ne.lat
            } else {
                parent.sw.lat + lat_step * f64::from(row + 1)
            };
            let east = if col + 1 == n {
                parent.ne.lon
            } else {
                parent.sw.lon + lon_step * f64::from(col + 1)
            };
            cells.push(SubCell {
                id: SubCellId::new(row, col),
                bounds: GeoBounds::from_edges(south, west, north, east),
            });
        }
    }
    cells
}

/// Where the engine is in its parent-selection/scan lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubgridPhase {
    Idle,
    ParentSelected,
    Scanning,
    SubcellSelected,
}

#[derive(Debug, Clone)]
struct ScanTimeline {
    order: Vec<usize>,
    started_at_ms: u64,
    revealed: usize,
    /// Picked only once every subcell has been drawn.
    target: Option<usize>,
    flashes_done: u32,
}

/// Progress snapshot of an in-flight or finished scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanProgress {
    pub revealed: usize,
    pub total: usize,
}

#[derive(Debug)]
pub struct SubgridEngine {
    phase: SubgridPhase,
    parent_bounds: Option<GeoBounds>,
    cells: Vec<SubCell>,
    timeline: Option<ScanTimeline>,
}

impl Default for SubgridEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SubgridEngine {
    #[must_use]
    pub fn new() -> Self {
        Self {
            phase: SubgridPhase::Idle,
            parent_bounds: None,
            cells: Vec::new(),
            timeline: None,
        }
    }

    #[must_use]
    pub const fn phase(&self) -> SubgridPhase {
        self.phase
    }

    /// Reveal progress of the current scan, if one has run.
    #[must_use]
    pub fn scan_progress(&self) -> Option<ScanProgress> {
        self.timeline.as_ref().map(|timeline| ScanProgress {
            revealed: timeline.revealed,
            total: timeline.order.len(),
        })
    }

    /// Subcells of the current subdivision, empty outside a scan.
    #[must_use]
    pub fn cells(&self) -> &[SubCell] {
        &self.cells
    }

    /// A new parent cell was selected; drop any prior subdivision.
    pub(crate) fn on_parent_selected(&mut self, ctx: &mut EngineCtx<'_>, bounds: GeoBounds) {
        self.cancel_active_scan(ctx);
        self.clear_visuals(ctx);
        self.cells.clear();
        self.parent_bounds = Some(bounds);
        self.phase = SubgridPhase::ParentSelected;
    }

    /// The grid was hidden; return to Idle and clear everything.
    pub(crate) fn on_grid_hidden(&mut self, ctx: &mut EngineCtx<'_>) {
        self.cancel_active_scan(ctx);
        self.clear_visuals(ctx);
        self.cells.clear();
        self.parent_bounds = None;
        self.phase = SubgridPhase::Idle;
    }

    /// Begin the scan animation over the selected parent cell.
    ///
    /// No-op with a warning when no parent is selected or a scan is already
    /// running. Reports whether a scan actually started.
    pub(crate) fn start_scan(
        &mut self,
        ctx: &mut EngineCtx<'_>,
        rng: &RngBundle,
        now_ms: u64,
    ) -> bool {
        match self.phase() {
            SubgridPhase::ParentSelected | SubgridPhase::SubcellSelected => {}
            SubgridPhase::Idle => {
                log::warn!("scan requested with no parent cell selected; ignoring");
                return false;
            }
            SubgridPhase::Scanning => {
                log::warn!("scan requested while a scan is already running; ignoring");
                return false;
            }
        }
        let Some(parent) = self.parent_bounds else {
            log::warn!("scan requested with no parent bounds recorded; ignoring");
            return false;
        };

        // A re-scan invalidates the previous subcell selection and road data.
        ctx.state.clear_parent_artifacts();
        self.clear_visuals(ctx);

        self.cells = subdivide(&parent, ctx.cfg.scan.subdivisions);
        let mut order: Vec<usize> = (0..self.cells.len()).collect();
        order.shuffle(&mut *rng.reveal());
        log::debug!(
            "scan started over {} subcells, reveal delay {}ms",
            order.len(),
            ctx.cfg.scan.reveal_delay_ms
        );
        self.timeline = Some(ScanTimeline {
            order,
            started_at_ms: now_ms,
            revealed: 0,
            target: None,
            flashes_done: 0,
        });
        self.phase = SubgridPhase::Scanning;
        ctx.bus.emit(MapEvent::ScanStarted);
        true
    }

    /// Advance the scan timeline to `now_ms`.
    pub(crate) fn tick(&mut self, ctx: &mut EngineCtx<'_>, rng: &RngBundle, now_ms: u64) {
        if self.phase() != SubgridPhase::Scanning {
            return;
        }
        let Some(mut timeline) = self.timeline.take() else {
            return;
        };

        let total = timeline.order.len();
        let delay = ctx.cfg.scan.reveal_delay_ms;
        let elapsed = now_ms.saturating_sub(timeline.started_at_ms);

        // Reveal every subcell whose slot has elapsed: slot k fires at
        // started + k × delay.
        let due = usize::try_from(elapsed / delay + 1).unwrap_or(usize::MAX);
        while timeline.revealed < total.min(due) {
            let cell = self.cells[timeline.order[timeline.revealed]];
            draw_subcell(ctx, &cell);
            timeline.revealed += 1;
        }

        // Flash-and-settle only begins once the full sweep has been drawn.
        let reveal_end = delay.saturating_mul(total as u64);
        if timeline.revealed == total && elapsed >= reveal_end {
            let target = *timeline.target.get_or_insert_with(|| {
                rng.pick().gen_range(0..total)
            });
            let flash_elapsed = elapsed - reveal_end;
            let flashes_due = (flash_elapsed / ctx.cfg.scan.flash_interval_ms)
                .min(u64::from(ctx.cfg.scan.flash_repeats));
            while u64::from(timeline.flashes_done) < flashes_due {
                timeline.flashes_done += 1;
                let cell = self.cells[target];
                ctx.layers.clear(LayerKey::SubgridHighlight);
                // Odd pulses draw the highlight, even pulses leave it clear.
                if timeline.flashes_done % 2 == 1 {
                    draw_highlight(ctx, &cell);
                }
            }

            if timeline.flashes_done >= ctx.cfg.scan.flash_repeats {
                let cell = self.cells[target];
                self.settle(ctx, cell);
                return;
            }
        }

        self.timeline = Some(timeline);
    }

    /// Select a drawn subcell directly (a click on its rectangle).
    ///
    /// Valid while the scan is running (cancels the remaining animation) or
    /// after it has settled; a subcell that has not been drawn yet cannot be
    /// clicked. Reports whether a selection was made.
    pub(crate) fn select_subcell(&mut self, ctx: &mut EngineCtx<'_>, id: SubCellId) -> bool {
        let Some(index) = self.cells.iter().position(|cell| cell.id == id) else {
            log::warn!("subcell {id} selected but no subdivision is drawn; ignoring");
            return false;
        };
        match self.phase() {
            SubgridPhase::Scanning => {
                let revealed = self
                    .timeline
                    .as_ref()
                    .is_some_and(|timeline| {
                        timeline.order[..timeline.revealed].contains(&index)
                    });
                if !revealed {
                    log::warn!("subcell {id} is not revealed yet; ignoring");
                    return false;
                }
                // Manual pick mid-scan cancels the rest of the animation.
                self.timeline = None;
                ctx.bus.emit(MapEvent::ScanCompleted { success: false });
                let cell = self.cells[index];
                self.settle_selection(ctx, cell);
                true
            }
            SubgridPhase::SubcellSelected => {
                let cell = self.cells[index];
                self.settle_selection(ctx, cell);
                true
            }
            SubgridPhase::Idle | SubgridPhase::ParentSelected => {
                log::warn!("subcell {id} selected outside a scan; ignoring");
                false
            }
        }
    }

    /// Natural completion: emit `scanCompleted{success:true}` then select.
    fn settle(&mut self, ctx: &mut EngineCtx<'_>, cell: SubCell) {
        self.timeline = None;
        ctx.state.scan_completed = true;
        ctx.bus.emit(MapEvent::ScanCompleted { success: true });
        ctx.camera.push(crate::camera::CameraRequest::FlyTo {
            center: cell.bounds.center(),
            zoom: ctx.cfg.camera.subcell_focus_zoom,
            duration_ms: ctx.cfg.camera.fly_duration_ms,
        });
        self.settle_selection(ctx, cell);
    }

    fn settle_selection(&mut self, ctx: &mut EngineCtx<'_>, cell: SubCell) {
        ctx.layers.clear(LayerKey::SubgridHighlight);
        draw_highlight(ctx, &cell);
        ctx.state.select_subcell(cell);
        self.phase = SubgridPhase::SubcellSelected;
        ctx.bus.emit(MapEvent::SubgridCellSelected { data: cell });
    }

    fn cancel_active_scan(&mut self, ctx: &mut EngineCtx<'_>) {
        if self.phase() == SubgridPhase::Scanning && self.timeline.take().is_some() {
            ctx.bus.emit(MapEvent::ScanCompleted { success: false });
        }
    }

    fn clear_visuals(&self, ctx: &mut EngineCtx<'_>) {
        ctx.layers
            .clear_many(&[LayerKey::Subgrid, LayerKey::SubgridHighlight]);
    }
}

fn draw_subcell(ctx: &mut EngineCtx<'_>, cell: &SubCell) {
    ctx.layers.push(
        LayerKey::Subgrid,
        Shape::Rect {
            bounds: cell.bounds,
            style: ShapeStyle::filled(SUBCELL_COLOR, 1.0, 0.9, 0.08),
        },
    );
    ctx.layers.push(
        LayerKey::Subgrid,
        Shape::Label {
            at: cell.bounds.center(),
            text: cell.id.to_string(),
        },
    );
}

fn draw_highlight(ctx: &mut EngineCtx<'_>, cell: &SubCell) {
    ctx.layers.push(
        LayerKey::SubgridHighlight,
        Shape::Rect {
            bounds: cell.bounds,
            style: ShapeStyle::filled(HIGHLIGHT_COLOR, 3.0, 1.0, 0.35),
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subcell_id_round_trips_printable_form() {
        let id = SubCellId::new(3, 4);
        assert_eq!(id.to_string(), "SubR3C4");
        assert_eq!("SubR3C4".parse::<SubCellId>().unwrap(), id);
        assert!("R3C4".parse::<SubCellId>().is_err());
        assert!("SubR3".parse::<SubCellId>().is_err());

        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"SubR3C4\"");
        let restored: SubCellId = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, id);
    }

    #[test]
    fn subcell_wire_form_carries_row_col_and_corner_bounds() {
        let cell = SubCell {
            id: SubCellId::new(2, 3),
            bounds: GeoBounds::from_edges(1.0, 2.0, 3.0, 4.0),
        };
        let json = serde_json::to_value(cell).unwrap();
        assert_eq!(json["id"], "SubR2C3");
        assert_eq!(json["row"], 2);
        assert_eq!(json["col"], 3);
        assert_eq!(json["bounds"], serde_json::json!([[1.0, 2.0], [3.0, 4.0]]));

        let restored: SubCell = serde_json::from_value(json).unwrap();
        assert_eq!(restored, cell);

        let skewed = serde_json::json!({
            "id": "SubR2C3",
            "bounds": [[1.0, 2.0], [3.0, 4.0]],
            "row": 9,
            "col": 3
        });
        assert!(serde_json::from_value::<SubCell>(skewed).is_err());
    }

    #[test]
    fn subdivision_tiles_parent_exactly() {
        let parent = GeoBounds::from_edges(40.1477648, -105.1130304, 40.238208, -105.0225872);
        let cells = subdivide(&parent, 5);
        assert_eq!(cells.len(), 25);

        // Distinct ids covering SubR0C0..SubR4C4.
        for row in 0..5 {
            for col in 0..5 {
                assert!(
                    cells
                        .iter()
                        .any(|cell| cell.id == SubCellId::new(row, col)),
                    "missing SubR{row}C{col}"
                );
            }
        }

        // Area conservation within floating-point tolerance.
        let (height, width) = parent.span();
        let parent_area = height * width;
        let sum: f64 = cells
            .iter()
            .map(|cell| {
                let (h, w) = cell.bounds.span();
                h * w
            })
            .sum();
        assert!((sum - parent_area).abs() < 1e-12);

        // Outer edges snap to the parent exactly.
        let ne_corner = cells
            .iter()
            .find(|cell| cell.id == SubCellId::new(4, 4))
            .unwrap();
        assert_eq!(ne_corner.bounds.ne, parent.ne);

        // Each subcell edge is one fifth of the parent span.
        let (h, w) = cells[0].bounds.span();
        assert!((h - height / 5.0).abs() < 1e-12);
        assert!((w - width / 5.0).abs() < 1e-12);
    }

    #[test]
    fn subdivision_has_no_overlaps() {
        let parent = GeoBounds::from_edges(0.0, 0.0, 1.0, 1.0);
        let cells = subdivide(&parent, 3);
        for (i, a) in cells.iter().enumerate() {
            for b in &cells[i + 1..] {
                let overlap_lat = a.bounds.sw.lat < b.bounds.ne.lat - 1e-12
                    && a.bounds.ne.lat > b.bounds.sw.lat + 1e-12;
                let overlap_lon = a.bounds.sw.lon < b.bounds.ne.lon - 1e-12
                    && a.bounds.ne.lon > b.bounds.sw.lon + 1e-12;
                assert!(
                    !(overlap_lat && overlap_lon),
                    "{} overlaps {}",
                    a.id,
                    b.id
                );
            }
        }
    }

    #[test]
    fn engine_starts_idle() {
        let engine = SubgridEngine::new();
        assert_eq!(engine.phase(), SubgridPhase::Idle);
        assert!(engine.scan_progress().is_none());
        assert!(engine.cells().is_empty());
    }
}
