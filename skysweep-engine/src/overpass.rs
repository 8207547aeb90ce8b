//! Overpass query construction and response conversion.
//!
//! The engine builds Overpass QL strings and converts Overpass JSON into
//! GeoJSON; the HTTP round-trip itself belongs to the embedder.

use crate::geo::GeoBounds;
use crate::geojson::{Feature, FeatureCollection};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use smallvec::SmallVec;
use std::collections::BTreeMap;
use std::fmt;

/// Highway classes requested from the road dataset.
///
/// Queries always include the `_link` ramp variant of each class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoadClass {
    Motorway,
    Trunk,
    Primary,
    Secondary,
    Tertiary,
    Unclassified,
    Residential,
}

impl RoadClass {
    /// Every supported class, in query order.
    #[must_use]
    pub const fn all() -> [Self; 7] {
        [
            Self::Motorway,
            Self::Trunk,
            Self::Primary,
            Self::Secondary,
            Self::Tertiary,
            Self::Unclassified,
            Self::Residential,
        ]
    }

    /// The OSM `highway` tag value for this class.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Motorway => "motorway",
            Self::Trunk => "trunk",
            Self::Primary => "primary",
            Self::Secondary => "secondary",
            Self::Tertiary => "tertiary",
            Self::Unclassified => "unclassified",
            Self::Residential => "residential",
        }
    }
}

impl fmt::Display for RoadClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Whitelist of road classes; small enough to live inline.
pub type RoadClassSet = SmallVec<[RoadClass; 8]>;

/// Build the Overpass QL way-query for `bounds`.
///
/// The regex alternation folds in `_link` ramps; the timeout is the
/// server-side budget, client timeouts are the embedder's concern.
#[must_use]
pub fn build_query(bounds: &GeoBounds, classes: &[RoadClass], timeout_secs: u32) -> String {
    let alternation = classes
        .iter()
        .map(|class| class.tag())
        .collect::<Vec<_>>()
        .join("|");
    format!(
        "[out:json][timeout:{timeout}];way[\"highway\"~\"^({alternation})(_link)?$\"]({s},{w},{n},{e});out geom;",
        timeout = timeout_secs,
        s = bounds.sw.lat,
        w = bounds.sw.lon,
        n = bounds.ne.lat,
        e = bounds.ne.lon,
    )
}

/// A vertex of a way geometry as Overpass returns it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverpassPoint {
    pub lat: f64,
    pub lon: f64,
}

/// One element of an Overpass response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverpassElement {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: u64,
    #[serde(default)]
    pub geometry: Vec<OverpassPoint>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

/// Overpass JSON response body.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OverpassResponse {
    #[serde(default)]
    pub elements: Vec<OverpassElement>,
}

impl OverpassResponse {
    /// Parse a raw Overpass JSON body.
    ///
    /// # Errors
    ///
    /// Returns the underlying serde error when the body is not Overpass JSON.
    pub fn from_json(body: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(body)
    }
}

/// Convert an Overpass response to a GeoJSON feature collection.
///
/// Only `way` elements with at least two geometry vertices survive; tags are
/// carried across as feature properties, plus the way id.
#[must_use]
pub fn to_geojson(response: &OverpassResponse) -> FeatureCollection {
    let features = response
        .elements
        .iter()
        .filter(|element| element.kind == "way" && element.geometry.len() >= 2)
        .map(|element| {
            let coordinates = element
                .geometry
                .iter()
                .map(|point| [point.lon, point.lat])
                .collect();
            let mut properties = Map::new();
            properties.insert(String::from("id"), Value::from(element.id));
            for (key, value) in &element.tags {
                properties.insert(key.clone(), Value::from(value.clone()));
            }
            Feature::line_string(coordinates, properties)
        })
        .collect();
    FeatureCollection::new(features)
}
