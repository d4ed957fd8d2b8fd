//! Lookpoint Pose Model
//!
//! Typed data model shared by the estimator and session crates:
//! - Per-frame pose samples from the face tracker, with JSONL stream support
//! - Screen-pixel geometry and point types
//! - Calibration targets, samples, results, and the fitted transform

pub mod calibration;
pub mod sample;
pub mod screen;

pub use calibration::*;
pub use sample::*;
pub use screen::*;
