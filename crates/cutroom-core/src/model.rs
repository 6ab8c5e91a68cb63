use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::ids::{ClipId, EffectId, SourceId, TrackId};

/// Shortest clip the timeline will hold, in seconds.
pub const MIN_CLIP_DURATION: f64 = 0.1;
pub const DEFAULT_FRAME_RATE: f64 = 30.0;
/// Tolerance used when comparing trim windows against clip durations.
pub const TIME_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub aspect_ratio: AspectRatio,
    pub frame_rate: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    duration: f64,
}

impl Project {
    #[must_use]
    pub fn new(name: impl Into<String>, aspect_ratio: AspectRatio, frame_rate: f64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            aspect_ratio,
            frame_rate: if frame_rate.is_finite() && frame_rate > 0.0 {
                frame_rate
            } else {
                DEFAULT_FRAME_RATE
            },
            created_at: now,
            updated_at: now,
            duration: 0.0,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Total timeline length in seconds, derived from the clip set.
    #[must_use]
    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub(crate) fn set_derived_duration(&mut self, duration: f64) {
        self.duration = duration;
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "16:9")]
    Landscape,
    #[serde(rename = "9:16")]
    Portrait,
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "4:5")]
    Vertical,
}

impl AspectRatio {
    /// Width and height terms of the ratio.
    #[must_use]
    pub const fn terms(self) -> (u32, u32) {
        match self {
            Self::Landscape => (16, 9),
            Self::Portrait => (9, 16),
            Self::Square => (1, 1),
            Self::Vertical => (4, 5),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TrackKind {
    Video,
    Audio,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Track {
    pub id: TrackId,
    pub name: String,
    pub kind: TrackKind,
    /// Stacking rank; 0 is the bottom layer.
    pub order: usize,
    pub is_muted: bool,
    pub is_locked: bool,
    pub is_visible: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Video,
    Audio,
    Image,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MediaSource {
    pub id: SourceId,
    pub name: String,
    pub path: String,
    pub kind: MediaKind,
    /// Length of the raw media in seconds; 0 until measured.
    #[serde(default)]
    pub duration: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Clip {
    pub id: ClipId,
    pub source_id: SourceId,
    pub track_id: TrackId,
    pub start_time: f64,
    pub duration: f64,
    pub source_start_offset: f64,
    pub source_end_offset: f64,
    #[serde(default)]
    pub effects: Vec<Effect>,
}

impl Clip {
    #[must_use]
    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration
    }

    #[must_use]
    pub fn contains_time(&self, time: f64) -> bool {
        time >= self.start_time && time < self.end_time()
    }

    /// Length of the trimmed window inside the source.
    #[must_use]
    pub fn window_length(&self) -> f64 {
        self.source_end_offset - self.source_start_offset
    }

    #[must_use]
    pub fn window_matches_duration(&self) -> bool {
        (self.window_length() - self.duration).abs() <= TIME_EPSILON * self.duration.max(1.0)
    }

    #[must_use]
    pub fn effect(&self, effect_id: EffectId) -> Option<&Effect> {
        self.effects.iter().find(|effect| effect.id == effect_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Effect {
    pub id: EffectId,
    pub kind: String,
    pub enabled: bool,
    #[serde(default)]
    pub params: BTreeMap<String, Value>,
}
