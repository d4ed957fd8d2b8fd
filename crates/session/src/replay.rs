//! Replay and synthetic pose sources.

use std::path::Path;

use glam::{Mat4, Vec3};
use lookpoint_common::clock::TrackingClock;
use lookpoint_common::error::{LookpointError, LookpointResult};
use lookpoint_estimator::GeometryProjector;
use lookpoint_pose_model::{
    parse_header, parse_samples, PoseSample, PoseStreamHeader, ScreenGeometry, ScreenPoint,
};

use crate::PoseSource;

/// Plays back a recorded JSONL pose stream.
///
/// Paced mode releases each sample once the wall clock reaches its
/// timestamp (scaled by `speed`); unpaced mode releases samples as fast
/// as the session polls, which is what batch tools want.
#[derive(Debug)]
pub struct ReplaySource {
    samples: Vec<PoseSample>,
    header: Option<PoseStreamHeader>,
    index: usize,
    clock: Option<TrackingClock>,
    speed: f64,
}

impl ReplaySource {
    /// Load a recorded stream from disk, paced in real time.
    pub fn from_file(path: &Path) -> LookpointResult<Self> {
        if !path.exists() {
            return Err(LookpointError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_jsonl(&content)
    }

    /// Parse a recorded stream from JSONL content, paced in real time.
    pub fn from_jsonl(content: &str) -> LookpointResult<Self> {
        let header = parse_header(content);
        let samples = parse_samples(content)?;
        tracing::info!(samples = samples.len(), "Pose stream loaded");
        Ok(Self {
            samples,
            header,
            index: 0,
            clock: Some(TrackingClock::start()),
            speed: 1.0,
        })
    }

    /// Release samples as fast as they are polled instead of pacing them
    /// against the wall clock.
    pub fn unpaced(mut self) -> Self {
        self.clock = None;
        self
    }

    /// Playback speed multiplier for paced replay.
    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = speed.max(0.01);
        self
    }

    /// Wrap an in-memory sample list, unpaced.
    pub fn from_samples(samples: Vec<PoseSample>) -> Self {
        Self {
            samples,
            header: None,
            index: 0,
            clock: None,
            speed: 1.0,
        }
    }

    pub fn header(&self) -> Option<&PoseStreamHeader> {
        self.header.as_ref()
    }

    /// Screen geometry recorded with the stream, if the header carried one.
    pub fn screen(&self) -> Option<ScreenGeometry> {
        self.header
            .as_ref()
            .map(|h| ScreenGeometry::new(h.screen_width_px, h.screen_height_px))
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl PoseSource for ReplaySource {
    fn poll(&mut self) -> LookpointResult<Option<PoseSample>> {
        let Some(sample) = self.samples.get(self.index) else {
            return Ok(None);
        };
        if let Some(ref clock) = self.clock {
            let due_s = sample.timestamp_s / self.speed;
            if clock.elapsed_secs() < due_s {
                return Ok(None);
            }
        }
        self.index += 1;
        Ok(Some(*sample))
    }

    fn name(&self) -> &str {
        "replay"
    }

    fn is_available(&self) -> bool {
        !self.samples.is_empty()
    }

    fn is_finished(&self) -> bool {
        self.index >= self.samples.len()
    }
}

/// Generates a steady fixation at a fixed screen point.
///
/// Used by self-check commands and session tests; stands in for a live
/// tracker without any hardware. Optional seeded jitter makes the stream
/// look like a real fixation instead of a mathematically perfect one.
#[derive(Debug)]
pub struct SyntheticSource {
    projector: GeometryProjector,
    eye_midpoint: Vec3,
    target: ScreenPoint,
    sample_interval_s: f64,
    jitter_px: f64,
    rng_state: u64,
    produced: usize,
    limit: usize,
}

impl SyntheticSource {
    pub fn new(screen: ScreenGeometry, target: ScreenPoint, sample_rate_hz: u32, count: usize) -> Self {
        let config = lookpoint_estimator::PipelineConfig {
            screen,
            ..Default::default()
        };
        Self {
            projector: GeometryProjector::from_config(&config),
            eye_midpoint: Vec3::ZERO,
            target,
            sample_interval_s: 1.0 / f64::from(sample_rate_hz.max(1)),
            jitter_px: 0.0,
            rng_state: 0x5eed_1009,
            produced: 0,
            limit: count,
        }
    }

    /// Add seeded uniform jitter of up to `px` pixels per axis around the
    /// fixation point. Deterministic for a given seed.
    pub fn with_jitter(mut self, px: f64, seed: u64) -> Self {
        self.jitter_px = px.max(0.0);
        self.rng_state = seed | 1;
        self
    }

    /// Re-aim the fixation at a new screen point.
    pub fn look_at(&mut self, target: ScreenPoint) {
        self.target = target;
    }

    // xorshift64*, plenty for fixation noise
    fn next_unit(&mut self) -> f64 {
        let mut x = self.rng_state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.rng_state = x;
        let bits = x.wrapping_mul(0x2545_f491_4f6c_dd1d) >> 11;
        bits as f64 / (1u64 << 53) as f64
    }
}

impl PoseSource for SyntheticSource {
    fn poll(&mut self) -> LookpointResult<Option<PoseSample>> {
        if self.produced >= self.limit {
            return Ok(None);
        }
        let timestamp_s = self.produced as f64 * self.sample_interval_s;
        let mut aim = self.target;
        if self.jitter_px > 0.0 {
            aim.x += (self.next_unit() * 2.0 - 1.0) * self.jitter_px;
            aim.y += (self.next_unit() * 2.0 - 1.0) * self.jitter_px;
        }
        let direction = self.projector.direction_for(self.eye_midpoint, aim);
        self.produced += 1;
        Ok(Some(PoseSample::binocular(
            timestamp_s,
            self.eye_midpoint,
            direction,
            Mat4::IDENTITY,
        )))
    }

    fn name(&self) -> &str {
        "synthetic"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn is_finished(&self) -> bool {
        self.produced >= self.limit
    }
}
