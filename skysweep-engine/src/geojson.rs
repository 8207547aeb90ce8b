//! Minimal GeoJSON output model for fetched road geometry.
//!
//! Coordinates follow the GeoJSON convention: `[lon, lat]`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// GeoJSON geometry, restricted to the kinds the overlay produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    LineString { coordinates: Vec<[f64; 2]> },
    Point { coordinates: [f64; 2] },
}

/// A single GeoJSON feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub properties: Map<String, Value>,
    pub geometry: Geometry,
}

impl Feature {
    #[must_use]
    pub fn line_string(coordinates: Vec<[f64; 2]>, properties: Map<String, Value>) -> Self {
        Self {
            kind: String::from("Feature"),
            properties,
            geometry: Geometry::LineString { coordinates },
        }
    }
}

/// A GeoJSON feature collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    pub kind: String,
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    #[must_use]
    pub fn new(features: Vec<Feature>) -> Self {
        Self {
            kind: String::from("FeatureCollection"),
            features,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }
}

impl Default for FeatureCollection {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}
