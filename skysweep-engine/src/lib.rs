//! Skysweep Overlay Engine
//!
//! Platform-agnostic core logic for the Skysweep tactical map: a coarse
//! lat/lon grid over the viewport, an animated N×N sensor scan of one
//! selected cell, and road mapping of the scanned subcell against an
//! Overpass-style road dataset.
//!
//! The crate owns no UI and opens no sockets. Rendering is expressed as
//! retained layer groups plus queued camera intents that a host map consumes,
//! and road fetching is split at the async seam: the engine prepares tokened
//! queries and applies completed responses, the embedder performs the HTTP
//! round-trip.

pub mod camera;
pub mod config;
pub mod events;
pub mod geo;
pub mod geojson;
pub mod grid;
pub mod layers;
pub mod numbers;
pub mod overlay;
pub mod overpass;
pub mod rng;
pub mod roads;
pub mod session;
pub mod state;
pub mod subgrid;

// Re-export commonly used types
pub use camera::{CameraRequest, Viewport};
pub use config::{CameraCfg, GridCfg, OverlayCfg, OverlayConfigError, RoadsCfg, ScanCfg};
pub use events::{EventBus, EventRecord, MapEvent};
pub use geo::{GeoBounds, LatLon, haversine_km};
pub use geojson::{Feature, FeatureCollection, Geometry};
pub use grid::{CellId, GridCell, cell_for_lat_lon, cells_in_viewport};
pub use layers::{LayerKey, LayerSet, Shape, ShapeStyle};
pub use overpass::{OverpassResponse, RoadClass, RoadClassSet, build_query, to_geojson};
pub use rng::RngBundle;
pub use roads::{RoadFetchError, RoadRequest};
pub use session::MapSession;
pub use state::SelectionState;
pub use subgrid::{ScanProgress, SubCell, SubCellId, SubgridPhase, subdivide};
