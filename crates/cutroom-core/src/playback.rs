use serde::{Deserialize, Serialize};

pub const DEFAULT_ZOOM: f64 = 1.0;
pub const DEFAULT_MIN_ZOOM: f64 = 0.1;
pub const DEFAULT_MAX_ZOOM: f64 = 10.0;

/// Playhead and viewport state. Lives next to the engine but is not part of
/// the timeline invariants and is never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlaybackState {
    pub current_time: f64,
    pub is_playing: bool,
    pub zoom: f64,
    pub scroll_x: f64,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            current_time: 0.0,
            is_playing: false,
            zoom: DEFAULT_ZOOM,
            scroll_x: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ZoomBounds {
    pub min: f64,
    pub max: f64,
}

impl Default for ZoomBounds {
    fn default() -> Self {
        Self {
            min: DEFAULT_MIN_ZOOM,
            max: DEFAULT_MAX_ZOOM,
        }
    }
}

impl ZoomBounds {
    /// Normalizes swapped or non-positive bounds.
    #[must_use]
    pub fn sanitized(self) -> Self {
        let min = if self.min.is_finite() && self.min > 0.0 {
            self.min
        } else {
            DEFAULT_MIN_ZOOM
        };
        let max = if self.max.is_finite() && self.max > 0.0 {
            self.max
        } else {
            DEFAULT_MAX_ZOOM
        };
        Self {
            min: min.min(max),
            max: min.max(max),
        }
    }

    #[must_use]
    pub fn clamp(self, zoom: f64) -> f64 {
        clamp_finite(zoom, self.min, self.max)
    }
}

/// Clamps `value` into `[min, max]`; NaN lands on `min`.
#[must_use]
pub fn clamp_finite(value: f64, min: f64, max: f64) -> f64 {
    if value.is_nan() {
        return min;
    }
    value.clamp(min, max)
}
