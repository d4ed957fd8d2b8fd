//! Frame pipeline orchestration.
//!
//! One [`GazePipeline::process`] call takes a pose sample through every
//! stage in a fixed order: calibration deadlines, head compensation,
//! projection, outlier gating, calibration ingest/apply, smoothing. The
//! pipeline owns no clock and no threads; the session layer feeds it
//! samples one at a time.

use glam::Vec3;
use lookpoint_pose_model::{CalibrationTransform, PoseSample, ScreenGeometry, ScreenPoint};

use crate::calibration::{CalibrationEngine, CalibrationEvent, EngineState};
use crate::config::PipelineConfig;
use crate::head::HeadMotionCompensator;
use crate::outlier::OutlierGate;
use crate::projector::GeometryProjector;
use crate::smoothing::SmoothingFilter;

/// One frame of pipeline output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GazeFrame {
    /// Final gaze point: calibrated and smoothed.
    pub point: ScreenPoint,

    /// The gated point before calibration and smoothing. This is what
    /// calibration collects, so consumers can display both.
    pub raw_point: ScreenPoint,

    /// Timestamp of the pose sample that produced this frame.
    pub timestamp_s: f64,
}

/// The complete gaze estimation pipeline for one screen.
pub struct GazePipeline {
    config: PipelineConfig,
    projector: GeometryProjector,
    gate: OutlierGate,
    smoothing: SmoothingFilter,
    head: HeadMotionCompensator,
    calibration: CalibrationEngine,
}

impl GazePipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            projector: GeometryProjector::from_config(&config),
            gate: OutlierGate::from_config(&config),
            smoothing: SmoothingFilter::new(config.smoothing_window),
            head: HeadMotionCompensator::new(config.head.clone()),
            calibration: CalibrationEngine::new(config.calibration.clone(), config.screen),
            config,
        }
    }

    /// Process one pose sample.
    ///
    /// Invalid samples produce no frame but still drive calibration
    /// deadlines, so a run cannot stall while the tracker loses the face.
    pub fn process(&mut self, sample: &PoseSample) -> (Option<GazeFrame>, Vec<CalibrationEvent>) {
        let events = self.calibration.advance(sample.timestamp_s);

        if !sample.is_valid {
            return (None, events);
        }

        self.head.observe(sample.head_transform);
        let (position, direction) = self
            .head
            .compensate(sample.eye_midpoint(), sample.mean_direction());

        let projected = self.projector.project(position, direction);
        let gated = self.gate.filter(projected);

        if self.calibration.is_collecting() {
            self.calibration.ingest(gated, sample.timestamp_s);
        }

        let calibrated = self.calibration.apply(gated);
        let point = self.smoothing.push(calibrated);

        let frame = GazeFrame {
            point,
            raw_point: gated,
            timestamp_s: sample.timestamp_s,
        };
        (Some(frame), events)
    }

    /// Advance calibration deadlines without a sample, e.g. when the
    /// source has gone quiet mid-run.
    pub fn tick(&mut self, now_s: f64) -> Vec<CalibrationEvent> {
        self.calibration.advance(now_s)
    }

    /// Begin a calibration run. The current head pose becomes the
    /// compensation reference so the fit is anchored to it.
    pub fn start_calibration(&mut self, now_s: f64) -> Vec<CalibrationEvent> {
        self.head.set_reference();
        self.calibration.start(now_s)
    }

    /// Drop the calibration transform, reverting to identity.
    pub fn reset_calibration(&mut self) {
        self.calibration.reset();
    }

    /// Clear the gate and smoothing history, e.g. after the source
    /// teleports (seek in a replay).
    pub fn reset_filters(&mut self) {
        self.gate.reset();
        self.smoothing.reset();
    }

    /// Re-anchor head compensation to the most recent head pose.
    pub fn set_head_reference(&mut self) {
        self.head.set_reference();
    }

    /// Forget the head reference entirely.
    pub fn reset_head_reference(&mut self) {
        self.head.reset();
    }

    pub fn is_calibrated(&self) -> bool {
        self.calibration.is_calibrated()
    }

    pub fn is_calibrating(&self) -> bool {
        self.calibration.is_active()
    }

    pub fn calibration_state(&self) -> EngineState {
        self.calibration.state()
    }

    pub fn calibration_transform(&self) -> CalibrationTransform {
        self.calibration.transform()
    }

    /// Per-target results from the current or most recent calibration run.
    pub fn calibration_results(&self) -> &[lookpoint_pose_model::CalibrationPointResult] {
        self.calibration.results()
    }

    /// Install a previously saved calibration transform.
    pub fn restore_calibration(&mut self, transform: CalibrationTransform) {
        self.calibration.restore_transform(transform);
    }

    pub fn screen(&self) -> ScreenGeometry {
        self.config.screen
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// The gaze direction that would land exactly on `target` for an eye
    /// at `position`, inverting the projection. Used by synthetic sources
    /// and calibration fixtures.
    pub fn direction_for(&self, position: Vec3, target: ScreenPoint) -> Vec3 {
        self.projector.direction_for(position, target)
    }
}
