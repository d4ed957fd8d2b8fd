//! Clock and timing utilities for the tracking loop.
//!
//! All pose samples are timestamped relative to a monotonic epoch recorded
//! when tracking starts. This module provides:
//! - Capturing the epoch
//! - Converting between elapsed time representations
//! - Pacing the pose-delivery loop at a fixed cadence

use std::time::Instant;

/// A tracking clock that provides monotonic timestamps relative to
/// a fixed epoch (the moment tracking started).
#[derive(Debug, Clone)]
pub struct TrackingClock {
    /// The instant tracking started.
    epoch: Instant,

    /// Wall-clock time at epoch (ISO 8601 string).
    epoch_wall: String,
}

impl TrackingClock {
    /// Create a new tracking clock anchored to now.
    pub fn start() -> Self {
        Self {
            epoch: Instant::now(),
            epoch_wall: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Seconds elapsed since tracking start.
    pub fn elapsed_secs(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }

    /// Nanoseconds elapsed since tracking start.
    pub fn elapsed_ns(&self) -> u64 {
        self.epoch.elapsed().as_nanos() as u64
    }

    /// Wall-clock time at tracking start.
    pub fn epoch_wall(&self) -> &str {
        &self.epoch_wall
    }

    /// The underlying epoch instant.
    pub fn epoch(&self) -> Instant {
        self.epoch
    }
}

/// Frame rate controller for pose-sample pacing.
///
/// The external tracker delivers frames at a nominal cadence (~60 Hz);
/// replay sources use this to reproduce that cadence.
#[derive(Debug)]
pub struct RateController {
    target_interval_s: f64,
    last_tick_s: Option<f64>,
}

impl RateController {
    /// Create a controller targeting the given Hz rate.
    pub fn new(target_hz: u32) -> Self {
        Self {
            target_interval_s: 1.0 / target_hz.max(1) as f64,
            last_tick_s: None,
        }
    }

    /// Check if enough time has passed for the next tick.
    /// Returns true and updates internal state if ready.
    /// The first call always returns true.
    pub fn should_tick(&mut self, now_s: f64) -> bool {
        match self.last_tick_s {
            None => {
                self.last_tick_s = Some(now_s);
                true
            }
            Some(last) if now_s >= last + self.target_interval_s => {
                self.last_tick_s = Some(now_s);
                true
            }
            _ => false,
        }
    }

    /// Target interval in seconds.
    pub fn interval_s(&self) -> f64 {
        self.target_interval_s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_elapsed() {
        let clock = TrackingClock::start();
        assert!(clock.elapsed_secs() < 1.0);
    }

    #[test]
    fn test_rate_controller() {
        let mut ctrl = RateController::new(60);
        assert!(ctrl.should_tick(0.0)); // first tick always fires
        assert!(!ctrl.should_tick(0.001)); // 1ms later, too soon
        assert!(ctrl.should_tick(0.017)); // ~17ms later, should fire (60Hz ~ 16.67ms)
    }

    #[test]
    fn test_rate_controller_interval() {
        let ctrl = RateController::new(60);
        assert!((ctrl.interval_s() - 1.0 / 60.0).abs() < 1e-12);
    }
}
