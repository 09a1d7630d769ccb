//! Plugin wrapper for the speed overlay pipeline

use crate::{FrameOrchestrator, OverlayConfig};
use async_trait::async_trait;
use serde_json::json;
use speed_overlay_common::Detection;
use speed_overlay_core::{
    Context, Operation, Plugin, PluginConfig, PluginData, PluginError, PluginRequest,
    PluginResponse,
};
use std::collections::HashSet;
use std::path::Path;
use std::time::Instant;
use tracing::info;

/// Frames are stored densely, so an absurd index in a malformed stream would
/// allocate that many empty frames. About nine hours of video at 30 fps.
const MAX_FRAME_INDEX: usize = 1_000_000;

/// Speed overlay plugin implementation
pub struct SpeedOverlayPlugin {
    config: PluginConfig,
    overlay: OverlayConfig,
}

impl SpeedOverlayPlugin {
    /// Create new speed overlay plugin
    pub fn new(config: PluginConfig, overlay: OverlayConfig) -> Self {
        Self { config, overlay }
    }

    /// Load plugin from YAML configuration
    pub fn from_yaml(yaml_path: impl AsRef<Path>) -> Result<Self, PluginError> {
        let contents = std::fs::read_to_string(yaml_path.as_ref())?;
        let config: PluginConfig = serde_yaml::from_str(&contents)?;

        Ok(Self::new(config, OverlayConfig::default()))
    }
}

#[async_trait]
impl Plugin for SpeedOverlayPlugin {
    fn name(&self) -> &str {
        "speed-overlay"
    }

    fn config(&self) -> &PluginConfig {
        &self.config
    }

    fn supports_input(&self, input_type: &str) -> bool {
        input_type == "TrackedDetections"
    }

    fn produces_output(&self, output_type: &str) -> bool {
        output_type == "SpeedLabels"
    }

    async fn execute(
        &self,
        ctx: &Context,
        request: &PluginRequest,
    ) -> Result<PluginResponse, PluginError> {
        let start = Instant::now();

        // Operation parameters override the configured defaults
        let mut overlay = self.overlay.clone();
        match &request.operation {
            Operation::SpeedOverlay {
                sampling_rate,
                meters_per_unit,
                stale_after_seconds,
            } => {
                if let Some(rate) = sampling_rate {
                    overlay.sampling_rate = *rate;
                }
                if let Some(scale) = meters_per_unit {
                    overlay.meters_per_unit = *scale;
                }
                if let Some(stale) = stale_after_seconds {
                    overlay.stale_after_seconds = Some(*stale);
                }
            }
            _ => {
                return Err(PluginError::InvalidInput(
                    "Expected SpeedOverlay operation".to_string(),
                ))
            }
        }

        // Flat array of detections, each with a frame_idx field, grouped per frame
        let detections: Vec<Detection> = match &request.input {
            PluginData::Json(json_val) => serde_json::from_value(json_val.clone())
                .map_err(|e| PluginError::InvalidInput(format!("Bad detection input: {e}")))?,
            PluginData::FilePath(path) => {
                let contents = std::fs::read_to_string(path)?;
                serde_json::from_str(&contents)
                    .map_err(|e| PluginError::InvalidInput(format!("Bad detection file: {e}")))?
            }
        };

        let mut frames: Vec<Vec<Detection>> = Vec::with_capacity(100);
        for detection in detections {
            let frame_idx = detection.frame_idx as usize;
            if frame_idx > MAX_FRAME_INDEX {
                return Err(PluginError::InvalidInput(format!(
                    "Frame index {frame_idx} exceeds the supported maximum of {MAX_FRAME_INDEX}"
                )));
            }
            if frames.len() <= frame_idx {
                frames.resize(frame_idx + 1, Vec::new());
            }
            frames[frame_idx].push(detection);
        }

        if frames.is_empty() {
            return Err(PluginError::ExecutionFailed(
                "No detections found in input data".to_string(),
            ));
        }

        if ctx.verbose {
            info!(
                "Speed overlay: {} frames, {} detections at {} fps",
                frames.len(),
                frames.iter().map(|f| f.len()).sum::<usize>(),
                overlay.sampling_rate
            );
        }

        let mut orchestrator = FrameOrchestrator::new(overlay)
            .map_err(|e| PluginError::ExecutionFailed(e.to_string()))?;

        let max_per_frame = self.config.config.max_detections_per_frame as usize;
        let mut warnings = Vec::new();
        let mut seen_tracks: HashSet<u32> = HashSet::new();
        let mut frame_records = Vec::with_capacity(frames.len());

        for (frame_idx, frame_detections) in frames.iter().enumerate() {
            if frame_detections.len() > max_per_frame {
                warnings.push(format!(
                    "Frame {}: {} detections exceed the configured limit of {}",
                    frame_idx,
                    frame_detections.len(),
                    max_per_frame
                ));
            }
            seen_tracks.extend(frame_detections.iter().map(|d| d.track_id));

            let labels = orchestrator.process_frame(frame_detections);

            let mut label_records = Vec::with_capacity(labels.len());
            label_records.extend(labels.iter().zip(frame_detections.iter()).map(
                |(label, detection)| {
                    let mut record = json!({
                        "track_id": label.track_id,
                        "class_name": label.class_name,
                        "speed_kmh": label.speed_kmh,
                        "text": label.text,
                    });
                    if ctx.save_intermediates {
                        record["anchor"] =
                            json!({"x": detection.anchor.x, "y": detection.anchor.y});
                    }
                    record
                },
            ));

            frame_records.push(json!({
                "frame": frame_idx,
                "labels": label_records,
            }));
        }

        let elapsed = start.elapsed();
        let result = json!({
            "frames": frame_records,
            "total_frames": frames.len(),
            "total_tracks": seen_tracks.len(),
        });

        info!(
            "Speed overlay complete: {} tracks, {} frames in {:.2}ms",
            seen_tracks.len(),
            frames.len(),
            elapsed.as_millis()
        );

        Ok(PluginResponse {
            output: PluginData::Json(result),
            duration: elapsed,
            warnings,
        })
    }
}
