//! Bounded per-identity position histories
//!
//! Each tracked identity keeps at most one second of metric-plane vertical
//! coordinates, one sample per frame. Once a history is full the oldest
//! sample is evicted first, so the window always covers the most recent
//! second of observations.
//!
//! Identities the tracker stops reporting would otherwise accumulate
//! forever; the buffer records the frame index of each identity's last push
//! and offers [`TrackBuffer::prune_stale`] alongside the explicit
//! [`TrackBuffer::remove`] hook.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use thiserror::Error;
use tracing::debug;

/// Track history errors
#[derive(Debug, Error)]
pub enum TrackHistoryError {
    #[error("History capacity must be at least 1, got {0}")]
    InvalidCapacity(u32),
}

/// Track buffer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackBufferConfig {
    /// Samples kept per identity; equals the source video's frames per second
    pub capacity: u32,

    /// Drop an identity after this many frames without a push (None = never)
    pub stale_after_frames: Option<u32>,
}

impl Default for TrackBufferConfig {
    fn default() -> Self {
        Self {
            capacity: 30,
            stale_after_frames: Some(60),
        }
    }
}

/// One identity's samples plus the frame it was last seen in
#[derive(Debug, Clone)]
struct PositionHistory {
    samples: VecDeque<f64>,
    last_seen: u32,
}

/// Per-identity bounded history of metric-plane vertical coordinates
#[derive(Debug)]
pub struct TrackBuffer {
    capacity: usize,
    stale_after_frames: Option<u32>,
    histories: HashMap<u32, PositionHistory>,
}

impl TrackBuffer {
    /// Create a buffer whose per-identity capacity is the sampling rate
    pub fn new(config: TrackBufferConfig) -> Result<Self, TrackHistoryError> {
        if config.capacity == 0 {
            return Err(TrackHistoryError::InvalidCapacity(config.capacity));
        }

        Ok(Self {
            capacity: config.capacity as usize,
            stale_after_frames: config.stale_after_frames,
            histories: HashMap::new(),
        })
    }

    /// Append a sample for `track_id`, creating its history on first use.
    ///
    /// Strict FIFO: when the history is full the oldest sample is evicted
    /// before the new one is appended. The caller pushes at most once per
    /// identity per frame, in frame-arrival order.
    pub fn push(&mut self, track_id: u32, value: f64, frame_idx: u32) {
        let history = self
            .histories
            .entry(track_id)
            .or_insert_with(|| PositionHistory {
                samples: VecDeque::with_capacity(self.capacity),
                last_seen: frame_idx,
            });

        if history.samples.len() == self.capacity {
            history.samples.pop_front();
        }
        history.samples.push_back(value);
        history.last_seen = frame_idx;
    }

    /// Snapshot of an identity's samples, oldest to newest.
    ///
    /// An unknown identity yields an empty vec, not an error.
    pub fn history_of(&self, track_id: u32) -> Vec<f64> {
        self.histories
            .get(&track_id)
            .map(|h| h.samples.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Number of samples currently held for an identity
    pub fn len_of(&self, track_id: u32) -> usize {
        self.histories
            .get(&track_id)
            .map(|h| h.samples.len())
            .unwrap_or(0)
    }

    /// Explicit eviction for callers that can detect a track has ended.
    ///
    /// No-op for unknown identities.
    pub fn remove(&mut self, track_id: u32) {
        self.histories.remove(&track_id);
    }

    /// Drop identities whose last push is older than the configured budget.
    ///
    /// Returns the number of histories dropped.
    pub fn prune_stale(&mut self, current_frame: u32) -> usize {
        let Some(max_age) = self.stale_after_frames else {
            return 0;
        };

        let before = self.histories.len();
        self.histories
            .retain(|_, h| current_frame.saturating_sub(h.last_seen) <= max_age);
        let dropped = before - self.histories.len();

        if dropped > 0 {
            debug!(
                "Pruned {} stale track histories at frame {}",
                dropped, current_frame
            );
        }
        dropped
    }

    /// Number of identities currently buffered
    pub fn num_tracks(&self) -> usize {
        self.histories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.histories.is_empty()
    }

    /// Per-identity sample capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
