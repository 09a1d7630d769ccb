//! Operation specifications for the analysis plugins

use serde::{Deserialize, Serialize};

/// The operation a plugin is asked to perform
///
/// Parameters are optional; a plugin falls back to its configured defaults
/// for any parameter left unset.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Operation {
    /// Project pixel-space points onto the calibrated ground plane
    GroundProjection {
        /// Source quadrilateral corners in pixel space (TL, TR, BR, BL)
        source_quad: Option<[[f64; 2]; 4]>,
        /// Target plane width in metric units
        target_width: Option<f64>,
        /// Target plane height in metric units
        target_height: Option<f64>,
    },

    /// Produce per-detection speed labels for a tracked detection stream
    SpeedOverlay {
        /// Frames per second of the source video
        sampling_rate: Option<u32>,
        /// Scale factor when the target plane is not calibrated in meters
        meters_per_unit: Option<f64>,
        /// Drop histories for identities unseen for this many seconds
        stale_after_seconds: Option<f32>,
    },
}

impl Operation {
    /// Output type produced by this operation
    pub fn output_type(&self) -> &'static str {
        match self {
            Operation::GroundProjection { .. } => "GroundPositions",
            Operation::SpeedOverlay { .. } => "SpeedLabels",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_serialization_roundtrip() {
        let op = Operation::SpeedOverlay {
            sampling_rate: Some(30),
            meters_per_unit: None,
            stale_after_seconds: Some(2.0),
        };
        let json = serde_json::to_string(&op).unwrap();
        let back: Operation = serde_json::from_str(&json).unwrap();
        match back {
            Operation::SpeedOverlay { sampling_rate, .. } => {
                assert_eq!(sampling_rate, Some(30));
            }
            _ => panic!("Expected SpeedOverlay variant"),
        }
    }

    #[test]
    fn test_output_types() {
        let op = Operation::GroundProjection {
            source_quad: None,
            target_width: None,
            target_height: None,
        };
        assert_eq!(op.output_type(), "GroundPositions");

        let op = Operation::SpeedOverlay {
            sampling_rate: None,
            meters_per_unit: None,
            stale_after_seconds: None,
        };
        assert_eq!(op.output_type(), "SpeedLabels");
    }
}
