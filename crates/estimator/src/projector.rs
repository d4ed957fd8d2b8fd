//! Screen-plane projection.
//!
//! Converts a 3D eye position and unit gaze direction into the 2D pixel
//! point where the ray crosses a virtual plane a fixed distance ahead of
//! the eye along the viewing axis.

use glam::Vec3;

use lookpoint_pose_model::{ScreenGeometry, ScreenPoint};

use crate::config::PipelineConfig;

/// Smallest axial direction component the projection will divide by.
/// Rays nearly parallel to the screen plane are clamped to this instead
/// of producing an unbounded (or NaN) intersection.
const MIN_AXIAL_COMPONENT: f64 = 1e-4;

/// Projects eye rays onto the screen plane. Pure; holds only configuration.
#[derive(Debug, Clone)]
pub struct GeometryProjector {
    screen: ScreenGeometry,
    plane_distance: f64,
    scale: f64,
}

impl GeometryProjector {
    pub fn new(screen: ScreenGeometry, plane_distance: f64, scale: f64) -> Self {
        Self {
            screen,
            plane_distance,
            scale,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.screen, config.plane_distance, config.projection_scale)
    }

    /// Intersect the ray `(position, direction)` with the screen plane and
    /// map the hit to pixel coordinates.
    ///
    /// The axial component of `direction` is clamped away from zero, so
    /// this never divides by zero and always returns finite coordinates
    /// for finite inputs.
    pub fn project(&self, position: Vec3, direction: Vec3) -> ScreenPoint {
        let dz = direction.z as f64;
        let dz = if dz.abs() < MIN_AXIAL_COMPONENT {
            // 0.0_f64.signum() is 1.0, so an exactly-parallel ray resolves
            // toward positive z rather than panicking or overflowing.
            MIN_AXIAL_COMPONENT * dz.signum()
        } else {
            dz
        };

        let t = -self.plane_distance / dz;
        let plane_x = position.x as f64 + t * direction.x as f64;
        let plane_y = position.y as f64 + t * direction.y as f64;

        let center = self.screen.center();
        ScreenPoint {
            x: center.x - plane_x * self.scale,
            y: center.y + plane_y * self.scale,
        }
    }

    /// Invert the projection: the unit gaze direction from `position`
    /// whose ray hits `target`. Synthetic sources and calibration
    /// fixtures use this to aim generated samples at known pixels.
    pub fn direction_for(&self, position: Vec3, target: ScreenPoint) -> Vec3 {
        let center = self.screen.center();
        let plane_x = (center.x - target.x) / self.scale;
        let plane_y = (target.y - center.y) / self.scale;

        let dx = (plane_x - position.x as f64) / self.plane_distance;
        let dy = (plane_y - position.y as f64) / self.plane_distance;
        Vec3::new(dx as f32, dy as f32, -1.0).normalize()
    }
}
