//! Retained drawable layers.
//!
//! The engine never renders; it maintains named groups of shapes that a host
//! renderer draws each frame. Each group is owned by exactly one component,
//! which keeps clearing semantics local and avoids cross-component races on
//! the shared map.

use crate::geo::{GeoBounds, LatLon};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::HashMap;

/// Identifies a layer group and the component that owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerKey {
    /// Primary grid cell outlines (grid overlay).
    GridLines,
    /// Primary grid cell-id labels (grid overlay).
    GridLabels,
    /// Selected primary cell highlight (grid overlay).
    GridHighlight,
    /// Revealed subcell rectangles and labels (subgrid engine).
    Subgrid,
    /// Flash/selection highlight on a subcell (subgrid engine).
    SubgridHighlight,
    /// Fetched road geometry (road mapper).
    Roads,
    /// Origin-to-target reference line and distance label (road mapper).
    ReferenceLine,
}

impl LayerKey {
    /// Every key, in draw order.
    #[must_use]
    pub const fn all() -> [Self; 7] {
        [
            Self::GridLines,
            Self::GridLabels,
            Self::GridHighlight,
            Self::Subgrid,
            Self::SubgridHighlight,
            Self::Roads,
            Self::ReferenceLine,
        ]
    }
}

/// Stroke/fill styling for a shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeStyle {
    pub color: String,
    pub weight: f32,
    pub opacity: f32,
    #[serde(default)]
    pub fill_opacity: f32,
    /// SVG-style dash pattern, e.g. `"8 6"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dash: Option<String>,
}

impl ShapeStyle {
    #[must_use]
    pub fn stroke(color: &str, weight: f32, opacity: f32) -> Self {
        Self {
            color: color.to_string(),
            weight,
            opacity,
            fill_opacity: 0.0,
            dash: None,
        }
    }

    #[must_use]
    pub fn filled(color: &str, weight: f32, opacity: f32, fill_opacity: f32) -> Self {
        Self {
            fill_opacity,
            ..Self::stroke(color, weight, opacity)
        }
    }

    #[must_use]
    pub fn dashed(mut self, pattern: &str) -> Self {
        self.dash = Some(pattern.to_string());
        self
    }
}

/// A drawable primitive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum Shape {
    Rect {
        bounds: GeoBounds,
        style: ShapeStyle,
    },
    Line {
        points: SmallVec<[LatLon; 4]>,
        style: ShapeStyle,
    },
    Label {
        at: LatLon,
        text: String,
    },
}

/// All layer groups of one session.
#[derive(Debug, Default)]
pub struct LayerSet {
    groups: HashMap<LayerKey, Vec<Shape>>,
}

impl LayerSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: LayerKey, shape: Shape) {
        self.groups.entry(key).or_default().push(shape);
    }

    pub fn clear(&mut self, key: LayerKey) {
        self.groups.remove(&key);
    }

    pub fn clear_many(&mut self, keys: &[LayerKey]) {
        for key in keys {
            self.groups.remove(key);
        }
    }

    #[must_use]
    pub fn shapes(&self, key: LayerKey) -> &[Shape] {
        self.groups.get(&key).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn len(&self, key: LayerKey) -> usize {
        self.groups.get(&key).map_or(0, Vec::len)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.values().all(Vec::is_empty)
    }

    /// Total shape count across all groups.
    #[must_use]
    pub fn total_len(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }
}
