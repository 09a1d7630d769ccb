//! Plugin wrapper for ground-plane projection

use crate::{CalibrationConfig, PerspectiveError};
use async_trait::async_trait;
use serde_json::{json, Value};
use speed_overlay_common::Point2D;
use speed_overlay_core::{
    Context, Operation, Plugin, PluginConfig, PluginData, PluginError, PluginRequest,
    PluginResponse,
};
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};

/// Ground projection plugin implementation
pub struct GroundProjectionPlugin {
    config: PluginConfig,
    calibration: CalibrationConfig,
}

impl GroundProjectionPlugin {
    /// Create new ground projection plugin
    pub fn new(config: PluginConfig, calibration: CalibrationConfig) -> Self {
        Self {
            config,
            calibration,
        }
    }

    /// Load plugin from YAML configuration
    pub fn from_yaml(yaml_path: impl AsRef<Path>) -> Result<Self, PluginError> {
        let contents = std::fs::read_to_string(yaml_path.as_ref())?;
        let config: PluginConfig = serde_yaml::from_str(&contents)?;

        Ok(Self::new(config, CalibrationConfig::default()))
    }
}

#[async_trait]
impl Plugin for GroundProjectionPlugin {
    fn name(&self) -> &str {
        "ground-projection"
    }

    fn config(&self) -> &PluginConfig {
        &self.config
    }

    fn supports_input(&self, input_type: &str) -> bool {
        input_type == "PixelPoints"
    }

    fn produces_output(&self, output_type: &str) -> bool {
        output_type == "GroundPositions"
    }

    async fn execute(
        &self,
        ctx: &Context,
        request: &PluginRequest,
    ) -> Result<PluginResponse, PluginError> {
        let start = Instant::now();

        // Operation parameters override the configured calibration
        let mut calibration = self.calibration.clone();
        match &request.operation {
            Operation::GroundProjection {
                source_quad,
                target_width,
                target_height,
            } => {
                if let Some(quad) = source_quad {
                    calibration.source_quad = *quad;
                }
                if let Some(width) = target_width {
                    calibration.target_width = *width;
                }
                if let Some(height) = target_height {
                    calibration.target_height = *height;
                }
            }
            _ => {
                return Err(PluginError::InvalidInput(
                    "Expected GroundProjection operation".to_string(),
                ))
            }
        }

        let mapper = calibration
            .build_mapper()
            .map_err(|e| PluginError::ExecutionFailed(e.to_string()))?;

        let points: Vec<Point2D> = match &request.input {
            PluginData::Json(json_val) => {
                let array = json_val.as_array().ok_or_else(|| {
                    PluginError::InvalidInput("Expected JSON array of points".to_string())
                })?;

                let mut points = Vec::with_capacity(array.len());
                for p in array {
                    let x = p.get("x").and_then(|v| v.as_f64());
                    let y = p.get("y").and_then(|v| v.as_f64());
                    match (x, y) {
                        (Some(x), Some(y)) => points.push(Point2D::new(x, y)),
                        _ => {
                            return Err(PluginError::InvalidInput(format!(
                                "Point is missing x/y coordinates: {p}"
                            )))
                        }
                    }
                }
                points
            }
            _ => {
                return Err(PluginError::InvalidInput(
                    "Expected JSON point input".to_string(),
                ))
            }
        };

        if ctx.verbose {
            info!("Projecting {} pixel points onto ground plane", points.len());
        }

        // One bad point must not fail the batch; it is reported as null
        // with a warning, matching the per-point degradation contract.
        let mut warnings = Vec::new();
        let mut positions = Vec::with_capacity(points.len());
        for p in &points {
            match mapper.transform_point(*p) {
                Ok(ground) => positions.push(json!({"x": ground.x, "y": ground.y})),
                Err(e @ PerspectiveError::DegenerateProjection { .. }) => {
                    warn!("Skipping point ({}, {}): {e}", p.x, p.y);
                    warnings.push(e.to_string());
                    positions.push(Value::Null);
                }
                Err(e) => return Err(PluginError::ExecutionFailed(e.to_string())),
            }
        }

        let elapsed = start.elapsed();
        info!(
            "Ground projection complete: {} points in {:.2}ms",
            positions.len(),
            elapsed.as_millis()
        );

        Ok(PluginResponse {
            output: PluginData::Json(json!({
                "positions": positions,
                "total_points": points.len(),
            })),
            duration: elapsed,
            warnings,
        })
    }
}
