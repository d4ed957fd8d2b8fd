//! Pipeline configuration.
//!
//! Every tunable constant of the estimation pipeline lives here, with
//! defaults matching the reference device. All values are overridable so a
//! host application can adapt to its display and tracker.

use serde::{Deserialize, Serialize};

use lookpoint_pose_model::{default_targets, CalibrationTarget, ScreenGeometry};

/// Configuration for the full gaze pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Physical screen dimensions in pixels.
    pub screen: ScreenGeometry,

    /// Distance of the virtual screen plane ahead of the eye, in scene
    /// units (meters).
    pub plane_distance: f64,

    /// Device-specific scale mapping plane-intersection units to pixels.
    pub projection_scale: f64,

    /// Overscan fraction for the outlier clamp rectangle (per side).
    pub overscan: f64,

    /// Frame-to-frame distance (px) above which a jump is damped.
    pub jump_threshold_px: f64,

    /// Fraction of the way toward a damped jump that is accepted.
    pub damping_factor: f64,

    /// Moving-average window for the smoothing filter.
    pub smoothing_window: usize,

    /// Head motion compensation settings.
    pub head: HeadCompensationConfig,

    /// Calibration procedure settings.
    pub calibration: CalibrationConfig,
}

/// Configuration for head motion compensation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeadCompensationConfig {
    /// Number of recent head transforms retained.
    pub history_window: usize,

    /// How many of the most recent transforms the stability check spans.
    pub stability_span: usize,

    /// Max pairwise translation variation (scene units) for "stable".
    pub stability_translation: f64,

    /// Max pairwise rotation variation (radians) for "stable".
    pub stability_rotation_rad: f64,

    /// Strength of the yaw/pitch direction correction.
    pub compensation_factor: f64,
}

/// Configuration for the calibration procedure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationConfig {
    /// Fixed target positions, normalized to screen fractions.
    pub targets: Vec<CalibrationTarget>,

    /// Settling time after a target is shown before collection starts.
    pub warmup_secs: f64,

    /// Duration of the data-collection window per target.
    pub collect_secs: f64,

    /// Delay before re-showing a target after a failed collection.
    pub retry_delay_secs: f64,

    /// Minimum cleaned samples required to accept a target.
    pub min_samples: usize,

    /// Collection buffer capacity (oldest dropped beyond this).
    pub max_samples: usize,

    /// Minimum per-sample confidence kept during cleaning.
    pub confidence_threshold: f64,

    /// Distance to the previous sample (px) under which the proximity
    /// confidence bonus applies.
    pub proximity_px: f64,

    /// Minimum per-target quality admitted into the fit.
    pub point_quality_threshold: f64,

    /// Minimum overall quality for a successful calibration.
    pub overall_quality_threshold: f64,

    /// Retry cap per target. `None` retries indefinitely until the target
    /// collects enough samples.
    pub max_retries_per_target: Option<u32>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            screen: ScreenGeometry::default(),
            plane_distance: 0.6,
            projection_scale: 1000.0,
            overscan: 0.2,
            jump_threshold_px: 200.0,
            damping_factor: 0.3,
            smoothing_window: 5,
            head: HeadCompensationConfig::default(),
            calibration: CalibrationConfig::default(),
        }
    }
}

impl Default for HeadCompensationConfig {
    fn default() -> Self {
        Self {
            history_window: 10,
            stability_span: 3,
            stability_translation: 0.01,
            stability_rotation_rad: 0.05,
            compensation_factor: 0.8,
        }
    }
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            targets: default_targets(),
            warmup_secs: 0.8,
            collect_secs: 3.0,
            retry_delay_secs: 0.5,
            min_samples: 15,
            max_samples: 60,
            confidence_threshold: 0.6,
            proximity_px: 300.0,
            point_quality_threshold: 0.3,
            overall_quality_threshold: 0.4,
            max_retries_per_target: None,
        }
    }
}
