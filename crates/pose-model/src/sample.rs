//! Per-frame pose samples from the external face tracker.
//!
//! Recorded pose streams are stored in append-only JSONL format: a header
//! comment line followed by one sample per line. Eye positions are in
//! scene units (meters) in a right-handed device-centered frame; eye
//! directions are unit vectors in the same frame.

use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

/// One frame's worth of eye/head geometry from the tracking collaborator.
///
/// Consumed and discarded immediately; the pipeline never holds on to a
/// sample past the frame it arrived in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PoseSample {
    /// Seconds since tracking start.
    #[serde(rename = "t")]
    pub timestamp_s: f64,

    /// Left eye position (scene units).
    pub eye_position_left: Vec3,

    /// Right eye position (scene units).
    pub eye_position_right: Vec3,

    /// Left eye unit gaze direction.
    pub eye_direction_left: Vec3,

    /// Right eye unit gaze direction.
    pub eye_direction_right: Vec3,

    /// Rigid head transform (rotation + translation) in the device frame.
    pub head_transform: Mat4,

    /// Whether the tracker considers this frame valid.
    pub is_valid: bool,
}

impl PoseSample {
    /// Construct a valid sample with both eyes sharing one direction,
    /// offset symmetrically around a midpoint. Convenient for replay
    /// generators and tests.
    pub fn binocular(
        timestamp_s: f64,
        eye_midpoint: Vec3,
        direction: Vec3,
        head_transform: Mat4,
    ) -> Self {
        let half_ipd = Vec3::new(0.032, 0.0, 0.0);
        Self {
            timestamp_s,
            eye_position_left: eye_midpoint - half_ipd,
            eye_position_right: eye_midpoint + half_ipd,
            eye_direction_left: direction.normalize(),
            eye_direction_right: direction.normalize(),
            head_transform,
            is_valid: true,
        }
    }

    /// An invalid (untracked) frame at the given timestamp.
    pub fn invalid(timestamp_s: f64) -> Self {
        Self {
            timestamp_s,
            eye_position_left: Vec3::ZERO,
            eye_position_right: Vec3::ZERO,
            eye_direction_left: Vec3::Z,
            eye_direction_right: Vec3::Z,
            head_transform: Mat4::IDENTITY,
            is_valid: false,
        }
    }

    /// Midpoint of the two eye positions.
    pub fn eye_midpoint(&self) -> Vec3 {
        (self.eye_position_left + self.eye_position_right) * 0.5
    }

    /// Mean gaze direction of the two eyes, renormalized.
    ///
    /// Falls back to the left-eye direction if the two directions cancel
    /// out exactly (degenerate tracker output).
    pub fn mean_direction(&self) -> Vec3 {
        let mean = (self.eye_direction_left + self.eye_direction_right) * 0.5;
        if mean.length_squared() > f32::EPSILON {
            mean.normalize()
        } else {
            self.eye_direction_left
        }
    }
}

/// Stream of pose samples with recording metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoseStreamHeader {
    /// Schema version for forward compatibility.
    pub schema_version: String,

    /// Wall-clock time at tracking start (ISO 8601).
    pub epoch_wall: String,

    /// Screen dimensions in physical pixels at recording time.
    pub screen_width_px: f64,
    pub screen_height_px: f64,

    /// Nominal sample rate delivered by the tracker (Hz).
    pub sample_rate_hz: u32,
}

impl Default for PoseStreamHeader {
    fn default() -> Self {
        Self {
            schema_version: "1.0".to_string(),
            epoch_wall: String::new(),
            screen_width_px: 1920.0,
            screen_height_px: 1080.0,
            sample_rate_hz: 60,
        }
    }
}

/// Parse samples from JSONL content (one JSON object per line).
pub fn parse_samples(jsonl: &str) -> Result<Vec<PoseSample>, serde_json::Error> {
    jsonl
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(serde_json::from_str)
        .collect()
}

/// Parse the header comment line of a recorded stream, if present.
pub fn parse_header(jsonl: &str) -> Option<PoseStreamHeader> {
    let first = jsonl.lines().next()?.trim();
    let body = first.strip_prefix("# ")?;
    serde_json::from_str(body).ok()
}

/// Serialize a stream (header comment plus one sample per line).
pub fn serialize_stream(
    header: &PoseStreamHeader,
    samples: &[PoseSample],
) -> Result<String, serde_json::Error> {
    let mut output = String::new();
    output.push_str("# ");
    output.push_str(&serde_json::to_string(header)?);
    output.push('\n');
    for sample in samples {
        output.push_str(&serde_json::to_string(sample)?);
        output.push('\n');
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_at(t: f64) -> PoseSample {
        PoseSample::binocular(
            t,
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(0.05, -0.02, -1.0),
            Mat4::IDENTITY,
        )
    }

    #[test]
    fn test_sample_roundtrip() {
        let sample = sample_at(1.5);
        let json = serde_json::to_string(&sample).unwrap();
        let parsed: PoseSample = serde_json::from_str(&json).unwrap();
        assert_eq!(sample, parsed);
    }

    #[test]
    fn test_stream_roundtrip() {
        let header = PoseStreamHeader::default();
        let samples = vec![sample_at(0.0), sample_at(1.0 / 60.0), sample_at(2.0 / 60.0)];
        let jsonl = serialize_stream(&header, &samples).unwrap();

        let parsed_header = parse_header(&jsonl).unwrap();
        assert_eq!(parsed_header.schema_version, "1.0");
        assert_eq!(parsed_header.sample_rate_hz, 60);

        let parsed = parse_samples(&jsonl).unwrap();
        assert_eq!(parsed, samples);
    }

    #[test]
    fn test_parse_samples_skips_header_comment() {
        let jsonl = serialize_stream(&PoseStreamHeader::default(), &[sample_at(0.5)]).unwrap();
        let parsed = parse_samples(&jsonl).unwrap();
        assert_eq!(parsed.len(), 1);
        assert!((parsed[0].timestamp_s - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_binocular_symmetry() {
        let sample = sample_at(0.0);
        let midpoint = sample.eye_midpoint();
        assert!(midpoint.length() < 1e-6);
        assert!((sample.eye_position_right.x - 0.032).abs() < 1e-6);
        assert!((sample.eye_position_left.x + 0.032).abs() < 1e-6);
    }

    #[test]
    fn test_mean_direction_is_unit() {
        let sample = PoseSample {
            eye_direction_left: Vec3::new(0.1, 0.0, -1.0).normalize(),
            eye_direction_right: Vec3::new(-0.1, 0.0, -1.0).normalize(),
            ..sample_at(0.0)
        };
        let mean = sample.mean_direction();
        assert!((mean.length() - 1.0).abs() < 1e-5);
        assert!(mean.x.abs() < 1e-6); // symmetric directions cancel laterally
    }

    #[test]
    fn test_invalid_sample() {
        let sample = PoseSample::invalid(2.0);
        assert!(!sample.is_valid);
        assert_eq!(sample.head_transform, Mat4::IDENTITY);
    }
}
