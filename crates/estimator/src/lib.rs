//! Lookpoint Estimator
//!
//! The gaze estimation core. Each incoming pose sample flows through:
//!
//! 1. **HeadMotionCompensator** — corrects the eye ray for head drift
//!    relative to a reference pose.
//! 2. **GeometryProjector** — intersects the corrected ray with the screen
//!    plane and maps it to pixels.
//! 3. **OutlierGate** — clamps pathological values and damps implausible
//!    frame-to-frame jumps.
//! 4. **CalibrationEngine** — collects fixation samples during calibration
//!    and applies the fitted per-axis affine correction afterwards.
//! 5. **SmoothingFilter** — bounded moving average over the visible point.
//!
//! [`GazePipeline`] wires the stages together; all of them are pure or
//! single-owner stateful, with time injected by the caller so tests run on
//! a virtual clock.

pub mod calibration;
pub mod config;
pub mod head;
pub mod outlier;
pub mod pipeline;
pub mod projector;
pub mod smoothing;

pub use calibration::{CalibrationEngine, CalibrationEvent, EngineState};
pub use config::{CalibrationConfig, HeadCompensationConfig, PipelineConfig};
pub use head::HeadMotionCompensator;
pub use outlier::OutlierGate;
pub use pipeline::{GazeFrame, GazePipeline};
pub use projector::GeometryProjector;
pub use smoothing::SmoothingFilter;
