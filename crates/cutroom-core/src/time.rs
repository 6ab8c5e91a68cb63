#[must_use]
pub fn seconds_to_frames(seconds: f64, frame_rate: f64) -> u64 {
    if seconds <= 0.0 || !seconds.is_finite() || frame_rate <= 0.0 || !frame_rate.is_finite() {
        return 0;
    }

    (seconds * frame_rate).round() as u64
}

#[must_use]
pub fn frames_to_seconds(frames: u64, frame_rate: f64) -> f64 {
    if frame_rate <= 0.0 || !frame_rate.is_finite() {
        return 0.0;
    }

    frames as f64 / frame_rate
}

/// Rounds `seconds` to the nearest frame boundary.
#[must_use]
pub fn snap_to_frame(seconds: f64, frame_rate: f64) -> f64 {
    frames_to_seconds(seconds_to_frames(seconds, frame_rate), frame_rate)
}
