//! Viewport description and camera intents for the host renderer.

use crate::geo::{GeoBounds, LatLon};
use serde::{Deserialize, Serialize};

/// The host map's current view.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub bounds: GeoBounds,
    pub zoom: f64,
}

impl Viewport {
    #[must_use]
    pub const fn new(bounds: GeoBounds, zoom: f64) -> Self {
        Self { bounds, zoom }
    }
}

/// A camera motion the engine wants the host renderer to perform.
///
/// The headless engine cannot move the map itself; intents are queued on the
/// session and drained by the embedder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CameraRequest {
    FlyTo {
        center: LatLon,
        zoom: f64,
        duration_ms: u64,
    },
    FitBounds {
        bounds: GeoBounds,
        /// Fractional padding around the fitted bounds.
        padding: f64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requests_round_trip_through_serde() {
        let fly = CameraRequest::FlyTo {
            center: LatLon::new(40.19, -105.07),
            zoom: 15.0,
            duration_ms: 1_500,
        };
        let json = serde_json::to_value(&fly).expect("serialize");
        assert_eq!(json["kind"], "fly_to");
        let restored: CameraRequest = serde_json::from_value(json).expect("deserialize");
        assert_eq!(restored, fly);
    }
}
