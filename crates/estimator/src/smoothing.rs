//! Moving-average smoothing for the emitted gaze point.

use std::collections::VecDeque;

use lookpoint_pose_model::ScreenPoint;

/// Bounded moving average over recent gaze points.
///
/// The window shrinks during warm-up: before `window` samples accumulate,
/// the mean spans however many exist.
#[derive(Debug, Clone)]
pub struct SmoothingFilter {
    window: usize,
    history: VecDeque<ScreenPoint>,
}

impl SmoothingFilter {
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(1),
            history: VecDeque::with_capacity(window.max(1)),
        }
    }

    /// Push a point and return the mean over the current window.
    pub fn push(&mut self, point: ScreenPoint) -> ScreenPoint {
        if self.history.len() >= self.window {
            self.history.pop_front();
        }
        self.history.push_back(point);

        let n = self.history.len() as f64;
        let sum_x: f64 = self.history.iter().map(|p| p.x).sum();
        let sum_y: f64 = self.history.iter().map(|p| p.y).sum();
        ScreenPoint::new(sum_x / n, sum_y / n)
    }

    /// Clear the window.
    pub fn reset(&mut self) {
        self.history.clear();
    }
}
