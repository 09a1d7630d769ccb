//! Per-frame orchestration of the speed overlay core
//!
//! The orchestrator receives tracked detections from the external tracker
//! once per frame, maps their anchor points onto the metric ground plane,
//! feeds each identity's history buffer, and hands back one label per
//! detection for the external renderer.
//!
//! One bad sample never stops the stream: a detection whose anchor has no
//! finite ground projection keeps its identity and class label and simply
//! carries no speed figure for that frame.
//!
//! # Example
//! ```
//! use speed_overlay_common::{Detection, Point2D};
//! use speed_overlay_pipeline::{FrameOrchestrator, OverlayConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut orchestrator = FrameOrchestrator::new(OverlayConfig::default())?;
//! let detections = vec![Detection {
//!     track_id: 7,
//!     class_name: "car".to_string(),
//!     anchor: Point2D::new(1800.0, 1200.0),
//!     frame_idx: 0,
//! }];
//! let labels = orchestrator.process_frame(&detections);
//! assert_eq!(labels[0].text, "#7 car");
//! # Ok(())
//! # }
//! ```

pub mod plugin;

pub use plugin::SpeedOverlayPlugin;

use serde::{Deserialize, Serialize};
use speed_overlay_common::{CommonError, Detection, FrameLabel, VideoInfo};
use speed_overlay_perspective::{CalibrationConfig, PerspectiveError, PerspectiveMapper};
use speed_overlay_speed_estimation::{
    format_label, SpeedEstimationError, SpeedEstimator, SpeedEstimatorConfig,
};
use speed_overlay_track_history::{TrackBuffer, TrackBufferConfig, TrackHistoryError};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Orchestration errors; all construction-time and fatal
#[derive(Debug, Error)]
pub enum OverlayError {
    #[error("Perspective error: {0}")]
    Perspective(#[from] PerspectiveError),

    #[error("Track history error: {0}")]
    TrackHistory(#[from] TrackHistoryError),

    #[error("Speed estimation error: {0}")]
    SpeedEstimation(#[from] SpeedEstimationError),

    #[error("Invalid video properties: {0}")]
    Video(#[from] CommonError),
}

/// Full overlay configuration consumed at startup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlayConfig {
    /// Perspective calibration (source quad and target plane)
    pub calibration: CalibrationConfig,

    /// Frames per second of the source video
    pub sampling_rate: u32,

    /// Scale factor when the target plane is not calibrated in meters
    pub meters_per_unit: f64,

    /// Drop histories for identities unseen this long (None = keep forever)
    pub stale_after_seconds: Option<f32>,

    /// Source video properties when known; validated at startup
    #[serde(default)]
    pub video: Option<VideoInfo>,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            calibration: CalibrationConfig::default(),
            sampling_rate: 30,
            meters_per_unit: 1.0,
            stale_after_seconds: Some(2.0),
            video: None,
        }
    }
}

/// Drives the perspective mapper, track buffer and speed estimator once per
/// frame, in frame-arrival order
pub struct FrameOrchestrator {
    mapper: PerspectiveMapper,
    buffer: TrackBuffer,
    estimator: SpeedEstimator,
    frame_idx: u32,
}

impl FrameOrchestrator {
    /// Build the orchestrator, failing fast before any frame is processed
    pub fn new(config: OverlayConfig) -> Result<Self, OverlayError> {
        if let Some(video) = &config.video {
            video.validate()?;
            if video.fps != config.sampling_rate {
                warn!(
                    "Video reports {} fps but the sampling rate is {}",
                    video.fps, config.sampling_rate
                );
            }
        }

        let mapper = config.calibration.build_mapper()?;

        let stale_after_frames = config
            .stale_after_seconds
            .map(|s| (s * config.sampling_rate as f32).ceil() as u32);
        let buffer = TrackBuffer::new(TrackBufferConfig {
            capacity: config.sampling_rate,
            stale_after_frames,
        })?;

        let estimator = SpeedEstimator::new(SpeedEstimatorConfig {
            sampling_rate: config.sampling_rate,
            meters_per_unit: config.meters_per_unit,
        })?;

        info!(
            "Frame orchestrator ready: {} fps window, stale budget {:?} frames",
            config.sampling_rate, stale_after_frames
        );

        Ok(Self {
            mapper,
            buffer,
            estimator,
            frame_idx: 0,
        })
    }

    /// Process one frame's detections and return one label per detection,
    /// in input order. Advances the frame counter exactly once.
    pub fn process_frame(&mut self, detections: &[Detection]) -> Vec<FrameLabel> {
        let mut labels = Vec::with_capacity(detections.len());

        for detection in detections {
            let ground = match self.mapper.transform_point(detection.anchor) {
                Ok(p) => p,
                Err(e) => {
                    // Unreliable measurement: keep the identity and class,
                    // drop the speed figure for this frame
                    warn!(
                        "Frame {}: dropping sample for track {}: {e}",
                        self.frame_idx, detection.track_id
                    );
                    labels.push(FrameLabel {
                        track_id: detection.track_id,
                        class_name: detection.class_name.clone(),
                        speed_kmh: None,
                        text: format_label(detection.track_id, &detection.class_name, None),
                    });
                    continue;
                }
            };

            self.buffer
                .push(detection.track_id, ground.y, self.frame_idx);

            let history = self.buffer.history_of(detection.track_id);
            let speed = self.estimator.estimate(&history);

            labels.push(FrameLabel {
                track_id: detection.track_id,
                class_name: detection.class_name.clone(),
                speed_kmh: speed.map(|s| s.speed_kmh),
                text: format_label(detection.track_id, &detection.class_name, speed.as_ref()),
            });
        }

        let pruned = self.buffer.prune_stale(self.frame_idx);
        if pruned > 0 {
            debug!("Frame {}: pruned {} vanished tracks", self.frame_idx, pruned);
        }

        self.frame_idx += 1;
        labels
    }

    /// Explicit end-of-track signal from trackers that report one
    pub fn end_track(&mut self, track_id: u32) {
        self.buffer.remove(track_id);
    }

    /// Frames processed so far
    pub fn frames_processed(&self) -> u32 {
        self.frame_idx
    }

    /// Identities currently buffered
    pub fn num_tracks(&self) -> usize {
        self.buffer.num_tracks()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use speed_overlay_common::Point2D;

    fn detection(track_id: u32, class_name: &str, x: f64, y: f64) -> Detection {
        Detection {
            track_id,
            class_name: class_name.to_string(),
            anchor: Point2D::new(x, y),
            frame_idx: 0,
        }
    }

    /// Identity-like calibration: a 10x10 pixel square onto a 10x10 plane,
    /// so anchor y equals plane y and expected speeds are easy to state
    fn unit_config(sampling_rate: u32) -> OverlayConfig {
        OverlayConfig {
            calibration: CalibrationConfig {
                source_quad: [[0.0, 0.0], [9.0, 0.0], [9.0, 9.0], [0.0, 9.0]],
                target_width: 10.0,
                target_height: 10.0,
            },
            sampling_rate,
            meters_per_unit: 1.0,
            stale_after_seconds: None,
            video: None,
        }
    }

    #[test]
    fn test_construction_fails_on_bad_geometry() {
        let config = OverlayConfig {
            calibration: CalibrationConfig {
                source_quad: [[0.0, 0.0], [1.0, 1.0], [2.0, 2.0], [0.0, 5.0]],
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(
            FrameOrchestrator::new(config),
            Err(OverlayError::Perspective(_))
        ));
    }

    #[test]
    fn test_construction_fails_on_zero_fps() {
        let config = OverlayConfig {
            sampling_rate: 0,
            ..unit_config(30)
        };
        assert!(FrameOrchestrator::new(config).is_err());
    }

    #[test]
    fn test_construction_fails_on_bad_video_properties() {
        let config = OverlayConfig {
            video: Some(VideoInfo {
                width: 0,
                height: 2160,
                fps: 30,
            }),
            ..unit_config(30)
        };
        assert!(matches!(
            FrameOrchestrator::new(config),
            Err(OverlayError::Video(CommonError::InvalidDimensions { .. }))
        ));
    }

    #[test]
    fn test_horizon_anchor_degrades_to_speedless_label() {
        // The reference calibration is a true perspective mapping, so it has
        // a horizon line where the homogeneous weight vanishes
        let config = OverlayConfig::default();
        let mapper = config.calibration.build_mapper().unwrap();
        let m = *mapper.transform().matrix();
        assert!(m[2][1].abs() > 1e-12);
        let horizon_x = 1800.0;
        let horizon_y = -(m[2][0] * horizon_x + m[2][2]) / m[2][1];

        let mut orchestrator = FrameOrchestrator::new(config).unwrap();
        for _ in 0..15 {
            orchestrator.process_frame(&[detection(7, "car", 1800.0, 1200.0)]);
        }

        // A horizon-line anchor keeps its identity and class but carries no
        // speed figure, and the sample never enters the history
        let labels = orchestrator.process_frame(&[detection(7, "car", horizon_x, horizon_y)]);
        assert_eq!(labels[0].track_id, 7);
        assert_eq!(labels[0].class_name, "car");
        assert!(labels[0].speed_kmh.is_none());
        assert_eq!(labels[0].text, "#7 car");

        // The next finite anchor estimates again from the intact history
        let labels = orchestrator.process_frame(&[detection(7, "car", 1800.0, 1200.0)]);
        assert!(labels[0].speed_kmh.is_some());
    }

    #[test]
    fn test_label_absent_then_present() {
        let mut orchestrator = FrameOrchestrator::new(unit_config(30)).unwrap();

        // 14 frames: below the half-second threshold
        let mut last = Vec::new();
        for _ in 0..14 {
            last = orchestrator.process_frame(&[detection(7, "car", 5.0, 5.0)]);
        }
        assert_eq!(last[0].text, "#7 car");
        assert!(last[0].speed_kmh.is_none());

        // 15th frame: estimate becomes present
        let labels = orchestrator.process_frame(&[detection(7, "car", 5.0, 5.0)]);
        assert!(labels[0].speed_kmh.is_some());
        assert_eq!(labels[0].text, "#7 car 0 km/h");
    }

    #[test]
    fn test_reference_scenario_through_orchestrator() {
        // 100x260-ish plane so the raw spec values survive the mapping:
        // use a tall identity-like calibration covering y 0..=299
        let config = OverlayConfig {
            calibration: CalibrationConfig {
                source_quad: [[0.0, 0.0], [299.0, 0.0], [299.0, 299.0], [0.0, 299.0]],
                target_width: 300.0,
                target_height: 300.0,
            },
            sampling_rate: 30,
            meters_per_unit: 1.0,
            stale_after_seconds: None,
            video: None,
        };
        let mut orchestrator = FrameOrchestrator::new(config).unwrap();

        let mut labels = Vec::new();
        for _ in 0..14 {
            labels = orchestrator.process_frame(&[detection(7, "car", 10.0, 100.0)]);
        }
        assert!(labels[0].speed_kmh.is_none());

        labels = orchestrator.process_frame(&[detection(7, "car", 10.0, 80.0)]);
        let speed = labels[0].speed_kmh.unwrap();
        assert!((speed - 144.0).abs() < 1e-6);
        assert_eq!(labels[0].text, "#7 car 144 km/h");
    }

    #[test]
    fn test_labels_preserve_detection_order() {
        let mut orchestrator = FrameOrchestrator::new(unit_config(30)).unwrap();
        let detections = vec![
            detection(3, "truck", 2.0, 2.0),
            detection(1, "car", 5.0, 5.0),
            detection(9, "bus", 7.0, 7.0),
        ];

        let labels = orchestrator.process_frame(&detections);
        let ids: Vec<u32> = labels.iter().map(|l| l.track_id).collect();
        assert_eq!(ids, vec![3, 1, 9]);
    }

    #[test]
    fn test_end_track_clears_history() {
        let mut orchestrator = FrameOrchestrator::new(unit_config(30)).unwrap();
        for _ in 0..20 {
            orchestrator.process_frame(&[detection(7, "car", 5.0, 5.0)]);
        }
        assert_eq!(orchestrator.num_tracks(), 1);

        orchestrator.end_track(7);
        assert_eq!(orchestrator.num_tracks(), 0);
    }

    #[test]
    fn test_stale_tracks_pruned() {
        let config = OverlayConfig {
            stale_after_seconds: Some(0.5),
            ..unit_config(30)
        };
        let mut orchestrator = FrameOrchestrator::new(config).unwrap();

        orchestrator.process_frame(&[detection(7, "car", 5.0, 5.0)]);
        // Vehicle leaves the region; 16 empty frames exceed the 15-frame budget
        for _ in 0..16 {
            orchestrator.process_frame(&[]);
        }
        assert_eq!(orchestrator.num_tracks(), 0);
    }

    #[test]
    fn test_empty_frame_is_fine() {
        let mut orchestrator = FrameOrchestrator::new(unit_config(30)).unwrap();
        let labels = orchestrator.process_frame(&[]);
        assert!(labels.is_empty());
        assert_eq!(orchestrator.frames_processed(), 1);
    }
}
