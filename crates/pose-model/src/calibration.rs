//! Calibration data types.
//!
//! Calibration asks the user to fixate a short sequence of known screen
//! positions, collects the raw gaze points the pipeline produced while they
//! did, and fits a per-axis affine correction from the aggregate.

use serde::{Deserialize, Serialize};

use crate::screen::{ScreenGeometry, ScreenPoint};

/// A fixed calibration target position, normalized to `[0, 1]` fractions
/// of screen width/height.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationTarget {
    pub u: f64,
    pub v: f64,
}

impl CalibrationTarget {
    pub const fn new(u: f64, v: f64) -> Self {
        Self { u, v }
    }

    /// Pixel position of this target on the given screen.
    pub fn to_pixels(&self, geometry: &ScreenGeometry) -> ScreenPoint {
        geometry.to_pixels(self.u, self.v)
    }
}

/// The standard 7-point target layout: center, four corners pulled in
/// from the edges, and the horizontal mid-edges.
pub fn default_targets() -> Vec<CalibrationTarget> {
    vec![
        CalibrationTarget::new(0.5, 0.5),
        CalibrationTarget::new(0.1, 0.1),
        CalibrationTarget::new(0.9, 0.1),
        CalibrationTarget::new(0.9, 0.9),
        CalibrationTarget::new(0.1, 0.9),
        CalibrationTarget::new(0.5, 0.1),
        CalibrationTarget::new(0.5, 0.9),
    ]
}

/// One raw gaze point collected while the user fixated the current target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationSample {
    /// Raw (uncalibrated) gated pipeline output.
    pub point: ScreenPoint,

    /// Seconds since tracking start.
    pub timestamp_s: f64,

    /// Sample confidence in `[0, 1]`.
    pub confidence: f64,
}

/// Aggregated result for one completed target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationPointResult {
    /// Where the target was shown, in pixels.
    pub target_point: ScreenPoint,

    /// Confidence-weighted average of the cleaned raw samples.
    pub measured_point: ScreenPoint,

    /// Composite quality score in `[0, 1]`.
    pub quality: f64,

    /// When the target's collection window closed.
    pub timestamp_s: f64,
}

/// Per-axis affine correction mapping raw projected points to true screen
/// points: `calibrated = raw * scale + offset`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationTransform {
    pub scale_x: f64,
    pub scale_y: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

impl CalibrationTransform {
    /// The identity correction (no scale, no offset).
    pub const IDENTITY: CalibrationTransform = CalibrationTransform {
        scale_x: 1.0,
        scale_y: 1.0,
        offset_x: 0.0,
        offset_y: 0.0,
    };

    /// Apply the correction to a raw point.
    pub fn apply(&self, raw: ScreenPoint) -> ScreenPoint {
        ScreenPoint {
            x: raw.x * self.scale_x + self.offset_x,
            y: raw.y * self.scale_y + self.offset_y,
        }
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }
}

impl Default for CalibrationTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}
