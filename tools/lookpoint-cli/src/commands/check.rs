//! Check configuration and pipeline health.

use glam::Vec3;
use lookpoint_common::config::AppConfig;
use lookpoint_estimator::{GazePipeline, PipelineConfig};
use lookpoint_pose_model::PoseSample;

pub fn run() -> anyhow::Result<()> {
    println!("Lookpoint System Check");
    println!("{}", "=".repeat(50));

    let config = AppConfig::load();
    let config_path = AppConfig::path();
    if config_path.exists() {
        println!("[OK] Configuration loaded from {}", config_path.display());
    } else {
        // First run: persist the defaults so they can be edited.
        config.save()?;
        println!("[OK] Default configuration written to {}", config_path.display());
    }
    println!("     Calibrations dir: {}", config.calibrations_dir.display());
    println!(
        "     Screen defaults:  {}x{} px @ {} Hz",
        config.tracking.screen_width_px,
        config.tracking.screen_height_px,
        config.tracking.sample_rate_hz
    );

    if config.calibrations_dir.exists() {
        let saved = std::fs::read_dir(&config.calibrations_dir)
            .map(|entries| entries.count())
            .unwrap_or(0);
        println!("[OK] Calibrations dir exists ({saved} entries)");
    } else {
        println!("[WARN] Calibrations dir does not exist yet (created on first save)");
    }

    // Pipeline self-test: a straight-ahead gaze must land on the screen
    // center with an identity calibration.
    let mut pipeline = GazePipeline::new(PipelineConfig::default());
    let sample = PoseSample::binocular(0.0, Vec3::ZERO, Vec3::NEG_Z, glam::Mat4::IDENTITY);
    let (frame, _) = pipeline.process(&sample);
    let center = pipeline.screen().center();
    match frame {
        Some(frame) if frame.point.distance_to(&center) < 1e-3 => {
            println!("[OK] Pipeline self-test: straight-ahead gaze hits screen center");
        }
        Some(frame) => {
            println!(
                "[FAIL] Pipeline self-test: expected ({:.0}, {:.0}), got ({:.1}, {:.1})",
                center.x, center.y, frame.point.x, frame.point.y
            );
        }
        None => println!("[FAIL] Pipeline self-test: no frame produced"),
    }

    println!();
    println!("Lookpoint is ready. Run 'lookpoint calibrate' for a synthetic demo.");
    Ok(())
}
