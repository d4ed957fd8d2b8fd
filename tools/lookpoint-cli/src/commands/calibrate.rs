//! Run a synthetic calibration sequence.
//!
//! Simulates a user fixating each target with an optional systematic gaze
//! error, on a virtual 60 Hz timeline. Useful for verifying the fit logic
//! and producing a transform file without any tracking hardware.

use std::path::PathBuf;

use glam::{Mat4, Vec3};
use lookpoint_estimator::{CalibrationEvent, GazePipeline, PipelineConfig};
use lookpoint_pose_model::{PoseSample, ScreenPoint};

const SAMPLE_INTERVAL_S: f64 = 1.0 / 60.0;
const TIMEOUT_S: f64 = 600.0;

pub fn run(
    error_x: f64,
    error_y: f64,
    max_retries: u32,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let mut config = PipelineConfig::default();
    config.calibration.max_retries_per_target = Some(max_retries);
    let target_count = config.calibration.targets.len();
    let mut pipeline = GazePipeline::new(config);

    println!("Synthetic calibration: {target_count} targets, simulated error ({error_x:+.0}, {error_y:+.0}) px");

    let mut now_s = 0.0;
    let mut fixation: Option<ScreenPoint> = None;
    let mut pending = pipeline.start_calibration(now_s);

    let (success, quality) = 'run: loop {
        for event in pending.drain(..) {
            match event {
                CalibrationEvent::ShowTarget { index, position } => {
                    println!(
                        "  Target {}/{} at ({:.0}, {:.0})",
                        index + 1,
                        target_count,
                        position.x,
                        position.y
                    );
                    // The simulated tracker reports gaze displaced by the
                    // systematic error while the user fixates the target.
                    fixation = Some(ScreenPoint::new(position.x + error_x, position.y + error_y));
                }
                CalibrationEvent::Completed { success, quality } => {
                    break 'run (success, quality);
                }
            }
        }

        now_s += SAMPLE_INTERVAL_S;
        if now_s > TIMEOUT_S {
            anyhow::bail!("Calibration did not finish within {TIMEOUT_S}s of virtual time");
        }

        let sample = match fixation {
            Some(point) => {
                let direction = pipeline.direction_for(Vec3::ZERO, point);
                PoseSample::binocular(now_s, Vec3::ZERO, direction, Mat4::IDENTITY)
            }
            None => PoseSample::invalid(now_s),
        };
        let (_, events) = pipeline.process(&sample);
        pending = events;
    };

    println!();
    if !success {
        anyhow::bail!("Calibration failed (quality {quality:.3})");
    }

    let transform = pipeline.calibration_transform();
    println!("Calibration succeeded (quality {quality:.3})");
    for (i, result) in pipeline.calibration_results().iter().enumerate() {
        println!(
            "  target {}: measured ({:.0}, {:.0}) quality {:.3}",
            i + 1,
            result.measured_point.x,
            result.measured_point.y,
            result.quality
        );
    }
    println!(
        "  scale:  ({:.4}, {:.4})",
        transform.scale_x, transform.scale_y
    );
    println!(
        "  offset: ({:.1}, {:.1})",
        transform.offset_x, transform.offset_y
    );

    // Sanity check: the fitted transform should undo the simulated error.
    let center = pipeline.screen().center();
    let corrected = transform.apply(ScreenPoint::new(center.x + error_x, center.y + error_y));
    println!(
        "  residual at center: ({:.2}, {:.2}) px",
        corrected.x - center.x,
        corrected.y - center.y
    );

    if let Some(path) = output {
        let json = serde_json::to_string_pretty(&transform)?;
        std::fs::write(&path, json)?;
        println!("Transform written to {}", path.display());
    }

    Ok(())
}
