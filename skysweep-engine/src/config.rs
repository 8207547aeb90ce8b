//! Overlay configuration: serde-loaded sections with validation and clamping.

use crate::geo;
use crate::overpass::{RoadClass, RoadClassSet};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised when overlay configuration invariants are violated.
#[derive(Debug, Error, PartialEq)]
pub enum OverlayConfigError {
    #[error("{field} must be at least {min:.4} (got {value:.4})")]
    MinViolation {
        field: &'static str,
        min: f64,
        value: f64,
    },
    #[error("{field} must be between {min:.4} and {max:.4} (got {value:.4})")]
    RangeViolation {
        field: &'static str,
        min: f64,
        max: f64,
        value: f64,
    },
    #[error("roads.classes must not be empty")]
    EmptyRoadClasses,
}

/// Top-level configuration for a map session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayCfg {
    #[serde(default)]
    pub grid: GridCfg,
    #[serde(default)]
    pub scan: ScanCfg,
    #[serde(default)]
    pub roads: RoadsCfg,
    #[serde(default)]
    pub camera: CameraCfg,
}

impl OverlayCfg {
    /// Validate configuration invariants before sanitization.
    ///
    /// # Errors
    ///
    /// Returns `OverlayConfigError` when any field violates the documented
    /// bounds.
    pub fn validate(&self) -> Result<(), OverlayConfigError> {
        self.grid.validate()?;
        self.scan.validate()?;
        self.roads.validate()?;
        self.camera.validate()?;
        Ok(())
    }

    pub fn sanitize(&mut self) {
        self.grid.sanitize();
        self.scan.sanitize();
        self.roads.sanitize();
        self.camera.sanitize();
    }
}

impl Default for OverlayCfg {
    fn default() -> Self {
        Self {
            grid: GridCfg::default(),
            scan: ScanCfg::default(),
            roads: RoadsCfg::default(),
            camera: CameraCfg::default(),
        }
    }
}

/// Primary grid parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridCfg {
    /// Angular step for both axes. The shared step means cells compress
    /// east-west away from the equator; accepted approximation.
    #[serde(default = "GridCfg::default_step_deg")]
    pub step_deg: f64,
    /// Cell-id labels are drawn only at or above this zoom level.
    #[serde(default = "GridCfg::default_label_zoom_threshold")]
    pub label_zoom_threshold: f64,
}

impl GridCfg {
    fn default_step_deg() -> f64 {
        geo::default_step_deg()
    }

    const fn default_label_zoom_threshold() -> f64 {
        10.0
    }

    fn validate(&self) -> Result<(), OverlayConfigError> {
        if !(0.001..=10.0).contains(&self.step_deg) {
            return Err(OverlayConfigError::RangeViolation {
                field: "grid.step_deg",
                min: 0.001,
                max: 10.0,
                value: self.step_deg,
            });
        }
        if !(0.0..=22.0).contains(&self.label_zoom_threshold) {
            return Err(OverlayConfigError::RangeViolation {
                field: "grid.label_zoom_threshold",
                min: 0.0,
                max: 22.0,
                value: self.label_zoom_threshold,
            });
        }
        Ok(())
    }

    fn sanitize(&mut self) {
        if !self.step_deg.is_finite() || self.step_deg <= 0.0 {
            self.step_deg = Self::default_step_deg();
        }
        self.step_deg = self.step_deg.clamp(0.001, 10.0);
        self.label_zoom_threshold = self.label_zoom_threshold.clamp(0.0, 22.0);
    }
}

impl Default for GridCfg {
    fn default() -> Self {
        Self {
            step_deg: Self::default_step_deg(),
            label_zoom_threshold: Self::default_label_zoom_threshold(),
        }
    }
}

/// Subgrid scan animation parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanCfg {
    /// Subdivision factor; a scan reveals `subdivisions²` subcells.
    #[serde(default = "ScanCfg::default_subdivisions")]
    pub subdivisions: u32,
    /// Delay between consecutive subcell reveals. Total reveal time is
    /// `subdivisions² × reveal_delay_ms`.
    #[serde(default = "ScanCfg::default_reveal_delay_ms")]
    pub reveal_delay_ms: u64,
    /// Highlight pulses played on the picked subcell before the fly-to.
    #[serde(default = "ScanCfg::default_flash_repeats")]
    pub flash_repeats: u32,
    #[serde(default = "ScanCfg::default_flash_interval_ms")]
    pub flash_interval_ms: u64,
}

impl ScanCfg {
    const fn default_subdivisions() -> u32 {
        5
    }

    const fn default_reveal_delay_ms() -> u64 {
        120
    }

    const fn default_flash_repeats() -> u32 {
        3
    }

    const fn default_flash_interval_ms() -> u64 {
        200
    }

    fn validate(&self) -> Result<(), OverlayConfigError> {
        if !(2..=12).contains(&self.subdivisions) {
            return Err(OverlayConfigError::RangeViolation {
                field: "scan.subdivisions",
                min: 2.0,
                max: 12.0,
                value: f64::from(self.subdivisions),
            });
        }
        if self.reveal_delay_ms == 0 {
            return Err(OverlayConfigError::MinViolation {
                field: "scan.reveal_delay_ms",
                min: 1.0,
                value: 0.0,
            });
        }
        if self.flash_interval_ms == 0 {
            return Err(OverlayConfigError::MinViolation {
                field: "scan.flash_interval_ms",
                min: 1.0,
                value: 0.0,
            });
        }
        Ok(())
    }

    fn sanitize(&mut self) {
        self.subdivisions = self.subdivisions.clamp(2, 12);
        self.reveal_delay_ms = self.reveal_delay_ms.max(1);
        self.flash_interval_ms = self.flash_interval_ms.max(1);
    }

    /// Subcell count for one scan.
    #[must_use]
    pub const fn cell_count(&self) -> usize {
        (self.subdivisions * self.subdivisions) as usize
    }
}

impl Default for ScanCfg {
    fn default() -> Self {
        Self {
            subdivisions: Self::default_subdivisions(),
            reveal_delay_ms: Self::default_reveal_delay_ms(),
            flash_repeats: Self::default_flash_repeats(),
            flash_interval_ms: Self::default_flash_interval_ms(),
        }
    }
}

/// Road mapping parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadsCfg {
    /// Highway classes requested from the road dataset; `_link` ramps of each
    /// class are always included.
    #[serde(default = "RoadsCfg::default_classes")]
    pub classes: RoadClassSet,
    /// Server-side query timeout sent in the Overpass QL header.
    #[serde(default = "RoadsCfg::default_timeout_secs")]
    pub timeout_secs: u32,
    /// Fractional padding applied when fitting origin + target into view.
    #[serde(default = "RoadsCfg::default_fit_padding")]
    pub fit_padding: f64,
    #[serde(default = "RoadsCfg::default_endpoint")]
    pub endpoint: String,
}

impl RoadsCfg {
    fn default_classes() -> RoadClassSet {
        RoadClass::all().into_iter().collect()
    }

    const fn default_timeout_secs() -> u32 {
        25
    }

    const fn default_fit_padding() -> f64 {
        0.15
    }

    fn default_endpoint() -> String {
        String::from("https://overpass-api.de/api/interpreter")
    }

    fn validate(&self) -> Result<(), OverlayConfigError> {
        if self.classes.is_empty() {
            return Err(OverlayConfigError::EmptyRoadClasses);
        }
        if !(1..=600).contains(&self.timeout_secs) {
            return Err(OverlayConfigError::RangeViolation {
                field: "roads.timeout_secs",
                min: 1.0,
                max: 600.0,
                value: f64::from(self.timeout_secs),
            });
        }
        if !(0.0..=2.0).contains(&self.fit_padding) {
            return Err(OverlayConfigError::RangeViolation {
                field: "roads.fit_padding",
                min: 0.0,
                max: 2.0,
                value: self.fit_padding,
            });
        }
        Ok(())
    }

    fn sanitize(&mut self) {
        if self.classes.is_empty() {
            self.classes = Self::default_classes();
        } else {
            let mut seen: Vec<RoadClass> = Vec::new();
            self.classes.retain(|class| {
                if seen.contains(class) {
                    false
                } else {
                    seen.push(*class);
                    true
                }
            });
        }
        self.timeout_secs = self.timeout_secs.clamp(1, 600);
        if !self.fit_padding.is_finite() {
            self.fit_padding = Self::default_fit_padding();
        }
        self.fit_padding = self.fit_padding.clamp(0.0, 2.0);
        if self.endpoint.trim().is_empty() {
            self.endpoint = Self::default_endpoint();
        }
    }
}

impl Default for RoadsCfg {
    fn default() -> Self {
        Self {
            classes: Self::default_classes(),
            timeout_secs: Self::default_timeout_secs(),
            fit_padding: Self::default_fit_padding(),
            endpoint: Self::default_endpoint(),
        }
    }
}

/// Camera motion parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraCfg {
    /// Duration of the double-click recenter and the post-scan fly-to.
    #[serde(default = "CameraCfg::default_fly_duration_ms")]
    pub fly_duration_ms: u64,
    #[serde(default = "CameraCfg::default_cell_focus_zoom")]
    pub cell_focus_zoom: f64,
    #[serde(default = "CameraCfg::default_subcell_focus_zoom")]
    pub subcell_focus_zoom: f64,
}

impl CameraCfg {
    const fn default_fly_duration_ms() -> u64 {
        1_500
    }

    const fn default_cell_focus_zoom() -> f64 {
        13.0
    }

    const fn default_subcell_focus_zoom() -> f64 {
        15.0
    }

    fn validate(&self) -> Result<(), OverlayConfigError> {
        if self.fly_duration_ms == 0 {
            return Err(OverlayConfigError::MinViolation {
                field: "camera.fly_duration_ms",
                min: 1.0,
                value: 0.0,
            });
        }
        for (field, value) in [
            ("camera.cell_focus_zoom", self.cell_focus_zoom),
            ("camera.subcell_focus_zoom", self.subcell_focus_zoom),
        ] {
            if !(1.0..=22.0).contains(&value) {
                return Err(OverlayConfigError::RangeViolation {
                    field,
                    min: 1.0,
                    max: 22.0,
                    value,
                });
            }
        }
        Ok(())
    }

    fn sanitize(&mut self) {
        self.fly_duration_ms = self.fly_duration_ms.max(1);
        self.cell_focus_zoom = self.cell_focus_zoom.clamp(1.0, 22.0);
        self.subcell_focus_zoom = self.subcell_focus_zoom.clamp(1.0, 22.0);
    }
}

impl Default for CameraCfg {
    fn default() -> Self {
        Self {
            fly_duration_ms: Self::default_fly_duration_ms(),
            cell_focus_zoom: Self::default_cell_focus_zoom(),
            subcell_focus_zoom: Self::default_subcell_focus_zoom(),
        }
    }
}
