//! Screen-pixel geometry types.
//!
//! Gaze points are expressed in screen-pixel coordinates: `(0, 0)` is the
//! top-left corner, `(width, height)` the bottom-right.

use serde::{Deserialize, Serialize};

/// A 2D point in screen-pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

impl ScreenPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance_to(&self, other: &ScreenPoint) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    /// Linear interpolation between two points.
    pub fn lerp(a: &ScreenPoint, b: &ScreenPoint, t: f64) -> ScreenPoint {
        let t = t.clamp(0.0, 1.0);
        ScreenPoint {
            x: a.x + (b.x - a.x) * t,
            y: a.y + (b.y - a.y) * t,
        }
    }
}

/// An axis-aligned rectangle in screen-pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelRect {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl PixelRect {
    /// Whether a point lies inside (inclusive).
    pub fn contains(&self, point: &ScreenPoint) -> bool {
        point.x >= self.min_x
            && point.x <= self.max_x
            && point.y >= self.min_y
            && point.y <= self.max_y
    }

    /// Clamp a point into the rectangle.
    pub fn clamp(&self, point: ScreenPoint) -> ScreenPoint {
        ScreenPoint {
            x: point.x.clamp(self.min_x, self.max_x),
            y: point.y.clamp(self.min_y, self.max_y),
        }
    }
}

/// Physical screen dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenGeometry {
    pub width_px: f64,
    pub height_px: f64,
}

impl ScreenGeometry {
    pub fn new(width_px: f64, height_px: f64) -> Self {
        Self {
            width_px,
            height_px,
        }
    }

    /// The screen center point.
    pub fn center(&self) -> ScreenPoint {
        ScreenPoint::new(self.width_px / 2.0, self.height_px / 2.0)
    }

    /// The visible screen rectangle.
    pub fn bounds(&self) -> PixelRect {
        PixelRect {
            min_x: 0.0,
            min_y: 0.0,
            max_x: self.width_px,
            max_y: self.height_px,
        }
    }

    /// The screen rectangle expanded by `overscan` on each side
    /// (fraction of the corresponding dimension).
    pub fn overscan_bounds(&self, overscan: f64) -> PixelRect {
        PixelRect {
            min_x: -self.width_px * overscan,
            min_y: -self.height_px * overscan,
            max_x: self.width_px * (1.0 + overscan),
            max_y: self.height_px * (1.0 + overscan),
        }
    }

    /// Whether a point is on the visible screen.
    pub fn contains(&self, point: &ScreenPoint) -> bool {
        self.bounds().contains(point)
    }

    /// Convert a normalized `(u, v)` position (fractions of width/height)
    /// to pixel coordinates.
    pub fn to_pixels(&self, u: f64, v: f64) -> ScreenPoint {
        ScreenPoint::new(u * self.width_px, v * self.height_px)
    }
}

impl Default for ScreenGeometry {
    fn default() -> Self {
        Self {
            width_px: 1920.0,
            height_px: 1080.0,
        }
    }
}
