//! Lookpoint CLI — Command-line interface for gaze stream replay and
//! calibration.
//!
//! Usage:
//!   lookpoint replay <PATH>    Run a recorded pose stream through the pipeline
//!   lookpoint calibrate        Run a synthetic calibration sequence
//!   lookpoint info <PATH>      Show pose stream information
//!   lookpoint check            Check configuration and pipeline health

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "lookpoint",
    about = "Screen gaze estimation from head and eye pose streams",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Append log output to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a recorded pose stream through the estimation pipeline
    Replay {
        /// Path to the recorded JSONL pose stream
        path: PathBuf,

        /// Process samples as fast as possible instead of real time
        #[arg(long)]
        unpaced: bool,

        /// Playback speed multiplier (paced mode only)
        #[arg(long, default_value = "1.0")]
        speed: f64,

        /// Calibration transform file to apply (JSON)
        #[arg(short, long)]
        calibration: Option<PathBuf>,

        /// Write estimated gaze points to this file (JSONL)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run a synthetic calibration sequence and report the fitted transform
    Calibrate {
        /// Simulated horizontal gaze error in pixels
        #[arg(long, default_value = "0.0")]
        error_x: f64,

        /// Simulated vertical gaze error in pixels
        #[arg(long, default_value = "0.0")]
        error_y: f64,

        /// Retries allowed per target before the run is abandoned
        #[arg(long, default_value = "3")]
        max_retries: u32,

        /// Write the fitted transform to this file (JSON)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show pose stream information
    Info {
        /// Path to the recorded JSONL pose stream
        path: PathBuf,
    },

    /// Check configuration and pipeline health
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    lookpoint_common::logging::init_logging(&lookpoint_common::config::LoggingConfig {
        level: log_level.to_string(),
        json: false,
        file: cli.log_file,
    });

    match cli.command {
        Commands::Replay {
            path,
            unpaced,
            speed,
            calibration,
            output,
        } => commands::replay::run(path, unpaced, speed, calibration, output).await,
        Commands::Calibrate {
            error_x,
            error_y,
            max_retries,
            output,
        } => commands::calibrate::run(error_x, error_y, max_retries, output),
        Commands::Info { path } => commands::info::run(path),
        Commands::Check => commands::check::run(),
    }
}
