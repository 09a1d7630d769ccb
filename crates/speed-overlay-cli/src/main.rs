//! Speed Overlay CLI - Per-vehicle speed labels for tracked video streams
//!
//! Command-line interface for the plugin-based speed overlay pipeline.

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

mod commands;

use commands::calibration::CheckCalibrationCommand;
use commands::run::RunCommand;

#[derive(Parser)]
#[command(
    name = "speed-overlay",
    version,
    about = "Per-vehicle speed estimates from tracked detections",
    long_about = "Turn a stream of tracked vehicle detections into per-vehicle speed labels.\n\
                  Detection and tracking happen upstream (YOLO + ByteTrack or similar);\n\
                  this tool applies the perspective calibration and the bounded-history\n\
                  speed estimator, and emits one label per detection per frame.",
    after_help = "EXAMPLES:\n  \
                  # Validate a calibration file before going live\n  \
                  speed-overlay check-calibration --calibration calibration.yaml\n\n  \
                  # Label a recorded detection stream\n  \
                  speed-overlay run detections.json --calibration calibration.yaml --fps 30\n  \
                  speed-overlay run detections.json --output labels.json\n\n  \
                  # List available plugins\n  \
                  speed-overlay plugins"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Label a detection stream with per-vehicle speeds
    Run(RunCommand),

    /// Validate calibration geometry without processing any frames
    CheckCalibration(CheckCalibrationCommand),

    /// List available plugins
    Plugins,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging (suppress for plugins command to reduce noise)
    let log_level = match &cli.command {
        Commands::Plugins => Level::WARN,
        _ => {
            if cli.verbose {
                Level::DEBUG
            } else {
                Level::INFO
            }
        }
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    match cli.command {
        Commands::Run(cmd) => cmd.execute(cli.verbose).await,
        Commands::CheckCalibration(cmd) => cmd.execute().await,
        Commands::Plugins => commands::plugins::list_plugins().await,
    }
}
