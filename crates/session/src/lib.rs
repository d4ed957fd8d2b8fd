//! Lookpoint Session
//!
//! Owns the tracking loop: a pluggable pose source feeds the estimation
//! pipeline on a single async task, and consumers receive gaze frames and
//! calibration events over a channel. Supported sources:
//!
//! - **Replay:** recorded JSONL pose streams, paced or as fast as possible
//! - **Synthetic:** generated fixations for demos and self-checks
//!
//! All pipeline access is serialized through the session task; there is
//! no shared mutable pipeline state.

pub mod replay;
pub mod session;

use lookpoint_common::error::LookpointResult;
use lookpoint_pose_model::PoseSample;

pub use replay::{ReplaySource, SyntheticSource};
pub use session::{GazeEvent, SessionHandle, SessionState, SessionStats, TrackingSession};

/// Trait for pose sample sources.
pub trait PoseSource: Send {
    /// Poll for the next pose sample. Returns `None` if no sample is due
    /// yet.
    fn poll(&mut self) -> LookpointResult<Option<PoseSample>>;

    /// Source name for logging.
    fn name(&self) -> &str;

    /// Check if the source can deliver samples on this system.
    fn is_available(&self) -> bool;

    /// Whether the source has permanently run out of samples.
    fn is_finished(&self) -> bool {
        false
    }
}
