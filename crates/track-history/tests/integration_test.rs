//! Integration tests for track history buffering

use speed_overlay_track_history::{TrackBuffer, TrackBufferConfig};

#[test]
fn test_one_second_window_at_30_fps() {
    let mut buffer = TrackBuffer::new(TrackBufferConfig {
        capacity: 30,
        stale_after_frames: None,
    })
    .unwrap();

    // Two vehicles observed over three seconds of video
    for frame in 0..90u32 {
        buffer.push(7, 250.0 - frame as f64, frame);
        buffer.push(9, 10.0 + 0.5 * frame as f64, frame);
    }

    for id in [7, 9] {
        assert_eq!(buffer.len_of(id), 30);
    }

    // Window holds exactly the last second of samples
    let history = buffer.history_of(7);
    assert_eq!(history[0], 250.0 - 60.0);
    assert_eq!(history[29], 250.0 - 89.0);
}

#[test]
fn test_interleaved_pushes_stay_ordered() {
    let mut buffer = TrackBuffer::new(TrackBufferConfig {
        capacity: 10,
        stale_after_frames: None,
    })
    .unwrap();

    for frame in 0..5u32 {
        buffer.push(1, frame as f64, frame);
        buffer.push(2, 100.0 + frame as f64, frame);
        buffer.push(3, 200.0 + frame as f64, frame);
    }

    assert_eq!(buffer.history_of(1), vec![0.0, 1.0, 2.0, 3.0, 4.0]);
    assert_eq!(buffer.history_of(2), vec![100.0, 101.0, 102.0, 103.0, 104.0]);
    assert_eq!(buffer.history_of(3), vec![200.0, 201.0, 202.0, 203.0, 204.0]);
}

#[test]
fn test_long_running_stream_stays_bounded_with_pruning() {
    let mut buffer = TrackBuffer::new(TrackBufferConfig {
        capacity: 30,
        stale_after_frames: Some(60),
    })
    .unwrap();

    // A new identity appears every frame and is never seen again
    for frame in 0..1_000u32 {
        buffer.push(frame, 0.0, frame);
        buffer.prune_stale(frame);
    }

    // Only identities from the last 61 frames survive
    assert!(buffer.num_tracks() <= 61);
}
