pub mod config;
pub mod derived;
pub mod diagnostics;
pub mod engine;
pub mod fixtures;
pub mod ids;
pub mod model;
pub mod persistence;
pub mod playback;
pub mod registry;
pub mod report;
pub mod selectors;
pub mod session;
pub mod time;

pub use config::EngineConfig;
pub use diagnostics::{TelemetryGuard, init_tracing};
pub use engine::{
    AddClipRequest, AddEffectRequest, AddSourceRequest, AddTrackRequest, Adjustment, ClipPatch,
    Edit, EffectPatch, Engine, EngineError, ProjectPatch, Removal, TrackPatch,
};
pub use ids::{ClipId, EffectId, IdAllocator, SourceId, TrackId};
pub use model::{
    AspectRatio, Clip, Effect, MIN_CLIP_DURATION, MediaKind, MediaSource, Project, Track,
    TrackKind,
};
pub use persistence::ProjectSnapshot;
pub use playback::PlaybackState;
pub use report::{TimelineReport, generate_timeline_report};
pub use session::SharedEngine;
