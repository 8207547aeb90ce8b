//! High-level session binding the overlay components to shared state.
//!
//! `MapSession` replaces the original's document-level custom-event wiring
//! and hidden module globals: it owns the one `SelectionState`, the event
//! bus, the layer set, and the camera queue, and routes events between the
//! grid overlay, the subgrid engine, and the road mapper.

use crate::camera::{CameraRequest, Viewport};
use crate::config::OverlayCfg;
use crate::events::{EventBus, EventRecord};
use crate::geo::LatLon;
use crate::layers::LayerSet;
use crate::overlay::PrimaryGridOverlay;
use crate::overpass::OverpassResponse;
use crate::rng::RngBundle;
use crate::roads::{RoadFetchError, RoadMapper, RoadRequest};
use crate::state::SelectionState;
use crate::subgrid::{ScanProgress, SubCellId, SubgridEngine, SubgridPhase};
use anyhow::Context;

/// Borrowed view of the session's shared resources, handed to components.
pub struct EngineCtx<'a> {
    pub cfg: &'a OverlayCfg,
    pub state: &'a mut SelectionState,
    pub bus: &'a mut EventBus,
    pub layers: &'a mut LayerSet,
    pub camera: &'a mut Vec<CameraRequest>,
}

macro_rules! ctx {
    ($session:ident) => {
        EngineCtx {
            cfg: &$session.cfg,
            state: &mut $session.state,
            bus: &mut $session.bus,
            layers: &mut $session.layers,
            camera: &mut $session.camera,
        }
    };
}

/// One map session: configuration, selection state, and the three overlay
/// components.
#[derive(Debug)]
pub struct MapSession {
    cfg: OverlayCfg,
    seed: u64,
    viewport: Viewport,
    state: SelectionState,
    bus: EventBus,
    layers: LayerSet,
    camera: Vec<CameraRequest>,
    rng: RngBundle,
    overlay: PrimaryGridOverlay,
    subgrid: SubgridEngine,
    roads: RoadMapper,
}

impl MapSession {
    /// Create a session from a validated configuration.
    ///
    /// # Panics
    ///
    /// Panics when the supplied configuration violates validation rules.
    #[must_use]
    pub fn new(cfg: OverlayCfg, seed: u64, viewport: Viewport) -> Self {
        cfg.validate().expect("valid overlay config");
        let mut cfg = cfg;
        cfg.sanitize();
        Self {
            cfg,
            seed,
            viewport,
            state: SelectionState::new(),
            bus: EventBus::new(),
            layers: LayerSet::new(),
            camera: Vec::new(),
            rng: RngBundle::from_user_seed(seed),
            overlay: PrimaryGridOverlay::new(),
            subgrid: SubgridEngine::new(),
            roads: RoadMapper::new(),
        }
    }

    /// Create a session from a JSON configuration document.
    ///
    /// # Errors
    ///
    /// Returns an error when the document does not parse or fails validation.
    pub fn from_json_cfg(json: &str, seed: u64, viewport: Viewport) -> anyhow::Result<Self> {
        let cfg: OverlayCfg =
            serde_json::from_str(json).context("parsing overlay configuration")?;
        cfg.validate().context("validating overlay configuration")?;
        Ok(Self::new(cfg, seed, viewport))
    }

    #[must_use]
    pub const fn config(&self) -> &OverlayCfg {
        &self.cfg
    }

    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    #[must_use]
    pub const fn state(&self) -> &SelectionState {
        &self.state
    }

    #[must_use]
    pub const fn layers(&self) -> &LayerSet {
        &self.layers
    }

    #[must_use]
    pub const fn viewport(&self) -> Viewport {
        self.viewport
    }

    #[must_use]
    pub fn is_grid_visible(&self) -> bool {
        self.overlay.is_visible()
    }

    #[must_use]
    pub const fn subgrid_phase(&self) -> SubgridPhase {
        self.subgrid.phase()
    }

    #[must_use]
    pub fn scan_progress(&self) -> Option<ScanProgress> {
        self.subgrid.scan_progress()
    }

    /// Subcells of the current subdivision (empty before a scan).
    #[must_use]
    pub fn subcells(&self) -> &[crate::subgrid::SubCell] {
        self.subgrid.cells()
    }

    /// Register an event listener; it runs synchronously at emit time.
    pub fn subscribe(&mut self, listener: impl FnMut(&EventRecord) + 'static) {
        self.bus.subscribe(listener);
    }

    /// Take every retained event record.
    pub fn drain_events(&mut self) -> Vec<EventRecord> {
        self.bus.drain()
    }

    /// Take the queued camera intents for the host renderer.
    pub fn take_camera_requests(&mut self) -> Vec<CameraRequest> {
        std::mem::take(&mut self.camera)
    }

    /// Deterministically reseed the session's RNG streams.
    pub fn reseed(&mut self, seed: u64) {
        self.seed = seed;
        self.rng = RngBundle::from_user_seed(seed);
    }

    /// Toggle primary grid visibility. Hiding tears down the subgrid and any
    /// road artifacts.
    pub fn toggle_grid(&mut self) {
        let viewport = self.viewport;
        let visible = self.overlay.toggle(&mut ctx!(self), &viewport);
        if !visible {
            self.subgrid.on_grid_hidden(&mut ctx!(self));
            self.roads.invalidate(&mut ctx!(self));
        }
    }

    /// Keyboard entry point. `g` toggles the grid unless a text input is
    /// focused; reports whether the key was consumed.
    pub fn handle_key(&mut self, key: char, text_input_focused: bool) -> bool {
        if text_input_focused || !key.eq_ignore_ascii_case(&'g') {
            return false;
        }
        self.toggle_grid();
        true
    }

    /// The host map's view changed; redraw the visible grid.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        self.overlay.on_viewport_change(&mut ctx!(self), &viewport);
    }

    /// A primary-grid click: select the cell under the cursor.
    pub fn click(&mut self, lat: f64, lon: f64) {
        let selected = self.overlay.on_click(&mut ctx!(self), lat, lon);
        if let Some(bounds) = selected {
            self.subgrid.on_parent_selected(&mut ctx!(self), bounds);
            self.roads.invalidate(&mut ctx!(self));
        }
    }

    /// A primary-grid double click: recenter on the cell under the cursor.
    pub fn double_click(&mut self, lat: f64, lon: f64) {
        self.overlay.on_double_click(&mut ctx!(self), lat, lon);
    }

    /// Kick off the subgrid scan animation over the selected cell.
    pub fn start_subgrid_scan(&mut self, now_ms: u64) {
        let started = self.subgrid.start_scan(&mut ctx!(self), &self.rng, now_ms);
        if started {
            self.roads.invalidate(&mut ctx!(self));
        }
    }

    /// Advance the scan animation to `now_ms`.
    pub fn tick(&mut self, now_ms: u64) {
        self.subgrid.tick(&mut ctx!(self), &self.rng, now_ms);
    }

    /// Select a drawn subcell directly (a click on its rectangle).
    pub fn select_subcell(&mut self, id: SubCellId) {
        let selected = self.subgrid.select_subcell(&mut ctx!(self), id);
        if selected {
            // A fresh subcell selection invalidates rendered roads.
            self.roads.invalidate(&mut ctx!(self));
        }
    }

    /// Begin a road mapping round for the selected subcell; returns the
    /// request the embedder should execute.
    pub fn begin_road_mapping(&mut self, origin: Option<LatLon>) -> Option<RoadRequest> {
        self.roads.begin_mapping(&mut ctx!(self), origin)
    }

    /// Feed a completed road fetch back into the session.
    pub fn apply_road_response(
        &mut self,
        token: u64,
        outcome: Result<OverpassResponse, RoadFetchError>,
    ) {
        self.roads.apply_response(&mut ctx!(self), token, outcome);
    }
}
