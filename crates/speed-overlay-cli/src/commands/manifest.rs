//! Built-in plugin manifests shared by the run and plugins commands

use speed_overlay_core::{PluginConfig, RuntimeConfig};

pub fn speed_overlay_manifest() -> PluginConfig {
    PluginConfig {
        name: "speed-overlay".to_string(),
        description: "Per-vehicle speed labels from tracked detections".to_string(),
        inputs: vec!["TrackedDetections".to_string()],
        outputs: vec!["SpeedLabels".to_string()],
        config: RuntimeConfig {
            max_detections_per_frame: 256,
            experimental: false,
        },
    }
}

pub fn ground_projection_manifest() -> PluginConfig {
    PluginConfig {
        name: "ground-projection".to_string(),
        description: "Project pixel points onto the calibrated ground plane".to_string(),
        inputs: vec!["PixelPoints".to_string()],
        outputs: vec!["GroundPositions".to_string()],
        config: RuntimeConfig {
            max_detections_per_frame: 256,
            experimental: false,
        },
    }
}
