//! Run command - label a detection stream with per-vehicle speeds

use super::manifest::speed_overlay_manifest;
use anyhow::{Context as _, Result};
use clap::Args;
use speed_overlay_core::{Context, Operation, Plugin, PluginData, PluginRequest};
use speed_overlay_pipeline::{OverlayConfig, SpeedOverlayPlugin};
use std::path::PathBuf;
use tracing::warn;

#[derive(Args)]
pub struct RunCommand {
    /// Detection stream: JSON array of tracked detections with frame indices
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Calibration YAML (source quad, target plane, sampling rate)
    #[arg(short, long)]
    calibration: Option<PathBuf>,

    /// Override the sampling rate (frames per second of the source video)
    #[arg(long)]
    fps: Option<u32>,

    /// Override the plane-units-to-meters scale factor
    #[arg(long)]
    meters_per_unit: Option<f64>,

    /// Override the stale-track budget in seconds
    #[arg(long)]
    stale_after: Option<f32>,

    /// Write the label JSON here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl RunCommand {
    pub async fn execute(self, verbose: bool) -> Result<()> {
        if !self.input.exists() {
            anyhow::bail!("Detection file does not exist: {}", self.input.display());
        }

        let overlay = match &self.calibration {
            Some(path) => {
                let contents = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                serde_yaml::from_str::<OverlayConfig>(&contents)
                    .with_context(|| format!("Failed to parse {}", path.display()))?
            }
            None => {
                warn!("No calibration file given, using the built-in reference calibration");
                OverlayConfig::default()
            }
        };

        let plugin = SpeedOverlayPlugin::new(speed_overlay_manifest(), overlay);
        let request = PluginRequest {
            operation: Operation::SpeedOverlay {
                sampling_rate: self.fps,
                meters_per_unit: self.meters_per_unit,
                stale_after_seconds: self.stale_after,
            },
            input: PluginData::FilePath(self.input.clone()),
        };

        let output_type = request.operation.output_type();
        if !plugin.produces_output(output_type) {
            anyhow::bail!(
                "Plugin {} cannot produce {output_type} output",
                plugin.name()
            );
        }

        let ctx = if verbose {
            Context::debug()
        } else {
            Context::live()
        };

        let response = plugin
            .execute(&ctx, &request)
            .await
            .context("Speed overlay failed")?;

        for warning in &response.warnings {
            warn!("{warning}");
        }

        let output = match response.output {
            PluginData::Json(value) => serde_json::to_string_pretty(&value)?,
            _ => anyhow::bail!("Unexpected non-JSON plugin output"),
        };

        match &self.output {
            Some(path) => {
                std::fs::write(path, output)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                eprintln!("Labels written to {}", path.display());
            }
            None => println!("{output}"),
        }

        Ok(())
    }
}
