//! Show pose stream information.

use std::path::PathBuf;

use lookpoint_pose_model::{parse_header, parse_samples};

pub fn run(path: PathBuf) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(&path)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", path.display()))?;

    let samples = parse_samples(&content)
        .map_err(|e| anyhow::anyhow!("Failed to parse pose stream: {e}"))?;

    println!("Pose stream: {}", path.display());
    match parse_header(&content) {
        Some(header) => {
            println!("  Schema:     {}", header.schema_version);
            println!("  Recorded:   {}", header.epoch_wall);
            println!(
                "  Screen:     {}x{} px",
                header.screen_width_px, header.screen_height_px
            );
            println!("  Rate:       {} Hz", header.sample_rate_hz);
        }
        None => println!("  (no header line)"),
    }
    println!();

    let valid = samples.iter().filter(|s| s.is_valid).count();
    println!("Samples:      {}", samples.len());
    if !samples.is_empty() {
        let duration = samples.last().map(|s| s.timestamp_s).unwrap_or(0.0)
            - samples.first().map(|s| s.timestamp_s).unwrap_or(0.0);
        println!("  Valid:      {valid} ({:.1}%)", 100.0 * valid as f64 / samples.len() as f64);
        println!("  Duration:   {duration:.2}s");
        if duration > 0.0 {
            println!(
                "  Mean rate:  {:.1} Hz",
                (samples.len() as f64 - 1.0) / duration
            );
        }
    }

    Ok(())
}
