//! Road mapping: query preparation, response application, and the
//! origin-to-target reference line.
//!
//! The fetch itself is the embedder's job. `begin_mapping` clears old road
//! artifacts synchronously and hands back a tokened request; the embedder
//! performs the HTTP round-trip and feeds the outcome to `apply_response`.
//! Responses carrying anything but the latest token are dropped whole, so a
//! rapid re-trigger can never paint stale roads over a newer selection.

use crate::camera::CameraRequest;
use crate::events::MapEvent;
use crate::geo::{self, GeoBounds, LatLon};
use crate::geojson::Geometry;
use crate::layers::{LayerKey, Shape, ShapeStyle};
use crate::overpass::{self, OverpassResponse};
use crate::session::EngineCtx;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use thiserror::Error;

const ROAD_COLOR: &str = "#e91e63";
const REFERENCE_COLOR: &str = "#ffffff";
const REFERENCE_DASH: &str = "6 8";

/// Failure classification for a road fetch, carried in `roadMappingFailed`.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RoadFetchError {
    #[error("road query timed out")]
    Timeout,
    #[error("road query transport failed: {message}")]
    Transport { message: String },
    #[error("road query returned HTTP {status}")]
    Status { status: u16 },
    #[error("road response could not be decoded: {message}")]
    Decode { message: String },
}

/// A prepared road query awaiting its response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadRequest {
    /// Monotonic token; only the latest token's response is applied.
    pub token: u64,
    /// Overpass QL query string, ready to be sent as the `data` parameter.
    pub query: String,
    pub bounds: GeoBounds,
    pub origin: Option<LatLon>,
}

#[derive(Debug, Clone, Copy)]
struct PendingFetch {
    token: u64,
    bounds: GeoBounds,
    origin: Option<LatLon>,
}

/// Stateless trigger apart from the in-flight request bookkeeping.
#[derive(Debug, Default)]
pub struct RoadMapper {
    next_token: u64,
    pending: Option<PendingFetch>,
}

impl RoadMapper {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Token of the request currently awaiting a response.
    #[must_use]
    pub fn pending_token(&self) -> Option<u64> {
        self.pending.map(|pending| pending.token)
    }

    /// Start a road mapping round for the selected subcell.
    ///
    /// Clears previously rendered roads and stored data synchronously, emits
    /// `roadMappingStarted`, and returns the request to execute. No-op with a
    /// warning when no subcell is selected.
    pub(crate) fn begin_mapping(
        &mut self,
        ctx: &mut EngineCtx<'_>,
        origin: Option<LatLon>,
    ) -> Option<RoadRequest> {
        let Some(subcell) = ctx.state.selected_subcell else {
            log::warn!("road mapping requested with no subcell selected; ignoring");
            return None;
        };
        let bounds = subcell.bounds;

        self.clear_rendered(ctx);
        ctx.state.clear_road_artifacts();
        ctx.bus.emit(MapEvent::RoadMappingStarted);

        self.next_token += 1;
        let token = self.next_token;
        self.pending = Some(PendingFetch {
            token,
            bounds,
            origin,
        });
        let query = overpass::build_query(&bounds, &ctx.cfg.roads.classes, ctx.cfg.roads.timeout_secs);
        log::debug!("road mapping round {token} started for {bounds:?}");
        Some(RoadRequest {
            token,
            query,
            bounds,
            origin,
        })
    }

    /// Apply a fetch outcome. Responses for anything but the latest token are
    /// dropped entirely.
    pub(crate) fn apply_response(
        &mut self,
        ctx: &mut EngineCtx<'_>,
        token: u64,
        outcome: Result<OverpassResponse, RoadFetchError>,
    ) {
        let Some(pending) = self.pending else {
            log::debug!("road response {token} arrived with no round in flight; dropping");
            return;
        };
        if pending.token != token {
            log::debug!(
                "road response {token} superseded by round {}; dropping",
                pending.token
            );
            return;
        }
        self.pending = None;

        let response = match outcome {
            Ok(response) => response,
            Err(error) => {
                log::warn!("road mapping round {token} failed: {error}");
                ctx.bus.emit(MapEvent::RoadMappingFailed {
                    error: error.to_string(),
                });
                return;
            }
        };

        let collection = overpass::to_geojson(&response);
        if collection.is_empty() {
            ctx.bus.emit(MapEvent::RoadMappingCompleted {
                success: false,
                data: None,
                message: Some(String::from("no mapped roads in the scanned sector")),
            });
            return;
        }

        for feature in &collection.features {
            if let Geometry::LineString { coordinates } = &feature.geometry {
                let points: SmallVec<[LatLon; 4]> = coordinates
                    .iter()
                    .map(|&[lon, lat]| LatLon::new(lat, lon))
                    .collect();
                ctx.layers.push(
                    LayerKey::Roads,
                    Shape::Line {
                        points,
                        style: ShapeStyle::stroke(ROAD_COLOR, 2.0, 0.9),
                    },
                );
            }
        }

        if let Some(origin) = pending.origin {
            draw_reference_line(ctx, origin, &pending.bounds);
        }

        ctx.state.road_geojson = Some(collection.clone());
        ctx.state.road_mapping_completed = true;
        log::debug!(
            "road mapping round {token} completed with {} features",
            collection.len()
        );
        ctx.bus.emit(MapEvent::RoadMappingCompleted {
            success: true,
            data: Some(collection),
            message: None,
        });
    }

    /// Drop rendered road artifacts and forget any in-flight round, without
    /// emitting events. Used when the selection changes or the grid hides.
    pub(crate) fn invalidate(&mut self, ctx: &mut EngineCtx<'_>) {
        self.clear_rendered(ctx);
        self.pending = None;
    }

    fn clear_rendered(&self, ctx: &mut EngineCtx<'_>) {
        ctx.layers
            .clear_many(&[LayerKey::Roads, LayerKey::ReferenceLine]);
    }
}

fn draw_reference_line(ctx: &mut EngineCtx<'_>, origin: LatLon, target: &GeoBounds) {
    let center = target.center();
    let distance_km = geo::haversine_km(origin, center);
    let points: SmallVec<[LatLon; 4]> = SmallVec::from_slice(&[origin, center]);
    ctx.layers.push(
        LayerKey::ReferenceLine,
        Shape::Line {
            points,
            style: ShapeStyle::stroke(REFERENCE_COLOR, 2.0, 0.8).dashed(REFERENCE_DASH),
        },
    );
    let midpoint = LatLon::new(
        (origin.lat + center.lat) / 2.0,
        (origin.lon + center.lon) / 2.0,
    );
    ctx.layers.push(
        LayerKey::ReferenceLine,
        Shape::Label {
            at: midpoint,
            text: format!("{distance_km:.2} km"),
        },
    );
    ctx.camera.push(CameraRequest::FitBounds {
        bounds: target.extended_to(origin),
        padding: ctx.cfg.roads.fit_padding,
    });
}
