//! Outlier gating for the projected point stream.
//!
//! Two defenses against implausible projector output: a clamp into an
//! expanded screen rectangle to bound pathological values, and damping of
//! large frame-to-frame jumps. Jumps are damped rather than dropped, so
//! fast-but-genuine saccades still move the point — just not all at once.

use lookpoint_pose_model::{PixelRect, ScreenGeometry, ScreenPoint};

use crate::config::PipelineConfig;

/// Stateful per-frame gate over projected screen points.
#[derive(Debug, Clone)]
pub struct OutlierGate {
    bounds: PixelRect,
    jump_threshold_px: f64,
    damping_factor: f64,
    last_accepted: Option<ScreenPoint>,
}

impl OutlierGate {
    pub fn new(screen: ScreenGeometry, overscan: f64, jump_threshold_px: f64, damping_factor: f64) -> Self {
        Self {
            bounds: screen.overscan_bounds(overscan),
            jump_threshold_px,
            damping_factor,
            last_accepted: None,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(
            config.screen,
            config.overscan,
            config.jump_threshold_px,
            config.damping_factor,
        )
    }

    /// Gate one incoming point, returning the accepted point.
    pub fn filter(&mut self, point: ScreenPoint) -> ScreenPoint {
        let clamped = self.bounds.clamp(point);

        let accepted = match self.last_accepted {
            Some(last) if last.distance_to(&clamped) > self.jump_threshold_px => {
                ScreenPoint::lerp(&last, &clamped, self.damping_factor)
            }
            _ => clamped,
        };

        self.last_accepted = Some(accepted);
        accepted
    }

    /// Forget the last accepted point.
    pub fn reset(&mut self) {
        self.last_accepted = None;
    }
}
