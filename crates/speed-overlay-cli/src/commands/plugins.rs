//! Plugins listing command

use super::manifest::{ground_projection_manifest, speed_overlay_manifest};
use anyhow::Result;
use speed_overlay_core::Plugin;
use speed_overlay_perspective::GroundProjectionPlugin;
use speed_overlay_pipeline::{OverlayConfig, SpeedOverlayPlugin};

pub async fn list_plugins() -> Result<()> {
    println!("Available plugins:");

    let plugins: Vec<Box<dyn Plugin>> = vec![
        Box::new(SpeedOverlayPlugin::new(
            speed_overlay_manifest(),
            OverlayConfig::default(),
        )),
        Box::new(GroundProjectionPlugin::new(
            ground_projection_manifest(),
            Default::default(),
        )),
    ];

    for plugin in &plugins {
        let config = plugin.config();
        println!("\n{}", plugin.name());
        println!("  Description: {}", config.description);
        println!("  Inputs: {}", config.inputs.join(", "));
        println!("  Outputs: {}", config.outputs.join(", "));
        println!(
            "  Max detections per frame: {}",
            config.config.max_detections_per_frame
        );
        println!("  Experimental: {}", config.config.experimental);
    }

    Ok(())
}
