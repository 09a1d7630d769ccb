//! Check-calibration command - fail fast on bad geometry

use anyhow::{Context as _, Result};
use clap::Args;
use speed_overlay_common::Point2D;
use speed_overlay_pipeline::OverlayConfig;
use std::path::PathBuf;

#[derive(Args)]
pub struct CheckCalibrationCommand {
    /// Calibration YAML to validate (defaults to the built-in reference)
    #[arg(short, long)]
    calibration: Option<PathBuf>,
}

impl CheckCalibrationCommand {
    pub async fn execute(self) -> Result<()> {
        let overlay = match &self.calibration {
            Some(path) => {
                let contents = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                serde_yaml::from_str::<OverlayConfig>(&contents)
                    .with_context(|| format!("Failed to parse {}", path.display()))?
            }
            None => OverlayConfig::default(),
        };

        if overlay.sampling_rate == 0 {
            anyhow::bail!("Sampling rate must be a positive integer");
        }
        if let Some(video) = &overlay.video {
            video.validate().context("Video properties rejected")?;
        }

        let mapper = overlay
            .calibration
            .build_mapper()
            .context("Calibration rejected")?;

        println!("Calibration OK");
        println!(
            "  Target plane: {}x{} units",
            overlay.calibration.target_width, overlay.calibration.target_height
        );
        println!("  Sampling rate: {} fps", overlay.sampling_rate);
        if let Some(video) = &overlay.video {
            println!(
                "  Source video: {}x{} at {} fps",
                video.width, video.height, video.fps
            );
        }
        println!("  Corner mapping:");
        for corner in &overlay.calibration.source_quad {
            let ground = mapper.transform_point(Point2D::new(corner[0], corner[1]))?;
            println!(
                "    ({:>8.1}, {:>8.1}) px -> ({:>6.2}, {:>6.2})",
                corner[0], corner[1], ground.x, ground.y
            );
        }

        Ok(())
    }
}
