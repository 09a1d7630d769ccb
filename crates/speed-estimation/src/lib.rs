//! Speed estimation from bounded position histories
//!
//! Converts a metric-plane position history into a km/h figure. A history
//! shorter than half a second of samples has too little temporal baseline
//! and yields no estimate; once the threshold is met the estimate is the
//! absolute displacement between the newest and oldest sample over the
//! elapsed window. There is deliberately no outlier rejection on jitter.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Unit conversion from (metric units per second) to km/h, assuming the
/// ground plane is calibrated in meters
const MPS_TO_KMH: f64 = 3.6;

/// Speed estimation errors
#[derive(Debug, Error)]
pub enum SpeedEstimationError {
    #[error("Sampling rate must be a positive integer, got {0}")]
    InvalidSamplingRate(u32),
}

/// Speed estimator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeedEstimatorConfig {
    /// Frames per second of the source video; the time base for estimates
    pub sampling_rate: u32,

    /// Scale applied when the ground plane is not calibrated in meters
    /// (default: 1.0, plane units are meters)
    pub meters_per_unit: f64,
}

impl Default for SpeedEstimatorConfig {
    fn default() -> Self {
        Self {
            sampling_rate: 30,
            meters_per_unit: 1.0,
        }
    }
}

/// A speed estimate derived on demand; never stored
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeedSample {
    /// Absolute displacement between newest and oldest sample, plane units
    pub distance: f64,
    /// Window covered by the history, seconds
    pub elapsed_seconds: f64,
    /// Resulting speed in km/h; always non-negative
    pub speed_kmh: f64,
}

/// Stateless estimator over position histories
#[derive(Debug, Clone)]
pub struct SpeedEstimator {
    config: SpeedEstimatorConfig,
    /// Minimum history length for a reliable estimate (half a second)
    min_samples: usize,
}

impl SpeedEstimator {
    pub fn new(config: SpeedEstimatorConfig) -> Result<Self, SpeedEstimationError> {
        if config.sampling_rate == 0 {
            return Err(SpeedEstimationError::InvalidSamplingRate(
                config.sampling_rate,
            ));
        }

        let min_samples = (config.sampling_rate / 2) as usize;
        Ok(Self {
            config,
            min_samples,
        })
    }

    pub fn sampling_rate(&self) -> u32 {
        self.config.sampling_rate
    }

    /// Estimate the speed for a history of vertical coordinates, oldest to
    /// newest. Returns `None` while the history is shorter than half a
    /// second of samples; never an error once the threshold is met.
    pub fn estimate(&self, history: &[f64]) -> Option<SpeedSample> {
        if history.len() < self.min_samples {
            return None;
        }

        // At fps 1 the threshold is 0; an empty history still yields None here
        let first = *history.first()?;
        let last = *history.last()?;

        let distance = (last - first).abs() * self.config.meters_per_unit;
        let elapsed_seconds = history.len() as f64 / self.config.sampling_rate as f64;
        let speed_kmh = distance / elapsed_seconds * MPS_TO_KMH;

        debug!(
            "Speed estimate: {:.1} units over {:.2}s -> {:.1} km/h",
            distance, elapsed_seconds, speed_kmh
        );

        Some(SpeedSample {
            distance,
            elapsed_seconds,
            speed_kmh,
        })
    }
}

/// Render the display label for one detection.
///
/// `"#<id> <class>"` while the speed is absent, otherwise
/// `"#<id> <class> <kmh> km/h"` with the speed truncated to an integer.
pub fn format_label(track_id: u32, class_name: &str, speed: Option<&SpeedSample>) -> String {
    match speed {
        Some(sample) => format!(
            "#{} {} {} km/h",
            track_id, class_name, sample.speed_kmh as u64
        ),
        None => format!("#{} {}", track_id, class_name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn estimator_at(fps: u32) -> SpeedEstimator {
        SpeedEstimator::new(SpeedEstimatorConfig {
            sampling_rate: fps,
            meters_per_unit: 1.0,
        })
        .unwrap()
    }

    #[test]
    fn test_zero_sampling_rate_rejected() {
        let result = SpeedEstimator::new(SpeedEstimatorConfig {
            sampling_rate: 0,
            meters_per_unit: 1.0,
        });
        assert!(matches!(
            result,
            Err(SpeedEstimationError::InvalidSamplingRate(0))
        ));
    }

    #[test]
    fn test_threshold_gate_at_half_second() {
        let estimator = estimator_at(30);

        let mut history = vec![100.0; 14];
        assert!(estimator.estimate(&history).is_none());

        history.push(80.0);
        assert!(estimator.estimate(&history).is_some());
    }

    #[test]
    fn test_reference_scenario_144_kmh() {
        // 14 samples at 100 plus one at 80, 30 fps:
        // distance 20, elapsed 0.5s, 20 / 0.5 * 3.6 = 144 km/h
        let estimator = estimator_at(30);
        let mut history = vec![100.0; 14];
        history.push(80.0);

        let sample = estimator.estimate(&history).unwrap();
        assert_eq!(sample.distance, 20.0);
        assert_eq!(sample.elapsed_seconds, 0.5);
        assert!((sample.speed_kmh - 144.0).abs() < 1e-9);

        assert_eq!(format_label(7, "car", Some(&sample)), "#7 car 144 km/h");
    }

    #[test]
    fn test_speed_never_negative() {
        let estimator = estimator_at(30);

        // Vehicle moving toward the camera: coordinates decrease
        let decreasing: Vec<f64> = (0..30).map(|i| 250.0 - i as f64).collect();
        // And away: coordinates increase
        let increasing: Vec<f64> = (0..30).map(|i| i as f64).collect();

        for history in [decreasing, increasing] {
            let sample = estimator.estimate(&history).unwrap();
            assert!(sample.speed_kmh >= 0.0);
        }
    }

    #[test]
    fn test_stationary_vehicle() {
        let estimator = estimator_at(30);
        let history = vec![42.0; 30];
        let sample = estimator.estimate(&history).unwrap();
        assert_eq!(sample.speed_kmh, 0.0);
    }

    #[test]
    fn test_meters_per_unit_scaling() {
        let scaled = SpeedEstimator::new(SpeedEstimatorConfig {
            sampling_rate: 30,
            meters_per_unit: 2.0,
        })
        .unwrap();

        let mut history = vec![100.0; 14];
        history.push(80.0);
        let sample = scaled.estimate(&history).unwrap();
        assert!((sample.speed_kmh - 288.0).abs() < 1e-9);
    }

    #[test]
    fn test_label_without_speed() {
        assert_eq!(format_label(12, "truck", None), "#12 truck");
    }

    #[test]
    fn test_truncation_not_rounding() {
        let sample = SpeedSample {
            distance: 0.0,
            elapsed_seconds: 1.0,
            speed_kmh: 99.9,
        };
        assert_eq!(format_label(1, "car", Some(&sample)), "#1 car 99 km/h");
    }
}
