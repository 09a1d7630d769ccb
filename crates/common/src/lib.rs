//! Common types shared across the speed overlay pipeline

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors for shared type validation
#[derive(Debug, Error)]
pub enum CommonError {
    #[error("Sampling rate must be a positive integer, got {0}")]
    InvalidSamplingRate(u32),

    #[error("Invalid video dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
}

/// A 2D point, used for both pixel-space and metric-plane coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A single tracked detection handed over by the external tracker.
///
/// Identity assignment across frames and region-of-interest filtering have
/// already happened upstream; the anchor point is the bottom-center of the
/// detection's bounding box in pixel coordinates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Detection {
    /// Stable track id from the external tracker
    pub track_id: u32,
    pub class_name: String,
    /// Anchor point in pixel space
    pub anchor: Point2D,
    pub frame_idx: u32,
}

/// Source video properties consumed at startup
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    /// Frames per second; also the position history capacity
    pub fps: u32,
}

impl VideoInfo {
    /// Validate startup configuration before any frame is processed
    pub fn validate(&self) -> Result<(), CommonError> {
        if self.fps == 0 {
            return Err(CommonError::InvalidSamplingRate(self.fps));
        }
        if self.width == 0 || self.height == 0 {
            return Err(CommonError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }
}

/// A rendered label for one detection in one frame
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameLabel {
    pub track_id: u32,
    pub class_name: String,
    /// Estimated speed in km/h, absent while the track has too little history
    pub speed_kmh: Option<f64>,
    /// Display text handed to the external renderer
    pub text: String,
}
