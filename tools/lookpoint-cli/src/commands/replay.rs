//! Replay a recorded pose stream through the estimation pipeline.

use std::io::Write;
use std::path::PathBuf;

use lookpoint_estimator::{CalibrationEvent, PipelineConfig};
use lookpoint_pose_model::{CalibrationTransform, ScreenPoint};
use lookpoint_session::{GazeEvent, ReplaySource, TrackingSession};

pub async fn run(
    path: PathBuf,
    unpaced: bool,
    speed: f64,
    calibration: Option<PathBuf>,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let mut source = ReplaySource::from_file(&path)?.with_speed(speed);
    if unpaced {
        source = source.unpaced();
    }

    let mut config = PipelineConfig::default();
    if let Some(screen) = source.screen() {
        config.screen = screen;
    }

    let transform = match calibration {
        Some(ref path) => {
            let content = std::fs::read_to_string(path)?;
            let transform: CalibrationTransform = serde_json::from_str(&content)?;
            println!(
                "Loaded calibration: scale ({:.3}, {:.3}), offset ({:.1}, {:.1})",
                transform.scale_x, transform.scale_y, transform.offset_x, transform.offset_y
            );
            Some(transform)
        }
        None => None,
    };

    println!("Replaying {} ({} samples)", path.display(), source.len());

    let mut handle = TrackingSession::spawn_calibrated(Box::new(source), config, transform);

    let mut sink = match output {
        Some(ref path) => Some(std::io::BufWriter::new(std::fs::File::create(path)?)),
        None => None,
    };

    let mut frames: u64 = 0;
    let mut sum = ScreenPoint::new(0.0, 0.0);
    let mut first_s = None;
    let mut last_s = 0.0;

    while let Some(event) = handle.events.recv().await {
        match event {
            GazeEvent::Frame(frame) => {
                frames += 1;
                sum.x += frame.point.x;
                sum.y += frame.point.y;
                first_s.get_or_insert(frame.timestamp_s);
                last_s = frame.timestamp_s;
                if let Some(ref mut sink) = sink {
                    let line = serde_json::json!({
                        "t": frame.timestamp_s,
                        "x": frame.point.x,
                        "y": frame.point.y,
                        "raw_x": frame.raw_point.x,
                        "raw_y": frame.raw_point.y,
                    });
                    writeln!(sink, "{line}")?;
                }
            }
            GazeEvent::Calibration(CalibrationEvent::Completed { success, quality }) => {
                println!("Calibration finished: success={success} quality={quality:.3}");
            }
            _ => {}
        }
    }

    if let Some(mut sink) = sink {
        sink.flush()?;
    }

    let stats = handle.join().await?;
    println!();
    println!("Frames:          {frames}");
    println!("Invalid samples: {}", stats.invalid_samples);
    if frames > 0 {
        let span = last_s - first_s.unwrap_or(0.0);
        println!(
            "Stream span:     {span:.2}s  (mean gaze {:.0}, {:.0})",
            sum.x / frames as f64,
            sum.y / frames as f64
        );
    }
    if let Some(ref path) = output {
        println!("Gaze points written to {}", path.display());
    }

    Ok(())
}
