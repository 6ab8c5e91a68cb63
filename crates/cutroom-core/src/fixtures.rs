use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    engine::{
        AddClipRequest, AddEffectRequest, AddSourceRequest, AddTrackRequest, Engine, EngineError,
    },
    ids::IdAllocator,
    model::{AspectRatio, MediaKind, Project, TrackKind},
};

/// A small vertical-video edit with stable ids and timestamps: an interview
/// cut with b-roll on the main track and a music bed underneath.
pub fn demo_engine() -> Result<Engine, EngineError> {
    let mut project = Project::new("Cutroom Demo", AspectRatio::Portrait, 30.0);
    project.id = Uuid::from_u128(0x9ed0_a3fa_4064_458f_b95f_1fdd_0bc4_f0be);

    let mut engine = Engine::with_allocator(project, IdAllocator::sequential());
    let main = engine.add_track(AddTrackRequest {
        name: "Main".to_string(),
        kind: TrackKind::Video,
    })?;
    let music = engine.add_track(AddTrackRequest {
        name: "Music".to_string(),
        kind: TrackKind::Audio,
    })?;

    let interview = engine.add_source(AddSourceRequest {
        name: "Interview".to_string(),
        path: "media/interview.mp4".to_string(),
        kind: MediaKind::Video,
        duration: 120.0,
    })?;
    let broll = engine.add_source(AddSourceRequest {
        name: "City b-roll".to_string(),
        path: "media/broll-city.mp4".to_string(),
        kind: MediaKind::Video,
        duration: 45.0,
    })?;
    let bed = engine.add_source(AddSourceRequest {
        name: "Music bed".to_string(),
        path: "media/bed.mp3".to_string(),
        kind: MediaKind::Audio,
        duration: 180.0,
    })?;

    let opener = engine
        .add_clip(AddClipRequest {
            source_id: interview.id,
            track_id: main.id,
            start_time: 0.0,
            duration: 8.0,
            source_start_offset: 10.0,
            source_end_offset: 18.0,
        })?
        .into_entity();
    engine.add_clip(AddClipRequest {
        source_id: broll.id,
        track_id: main.id,
        start_time: 8.0,
        duration: 4.0,
        source_start_offset: 3.0,
        source_end_offset: 7.0,
    })?;
    let underscore = engine
        .add_clip(AddClipRequest {
            source_id: bed.id,
            track_id: music.id,
            start_time: 0.0,
            duration: 12.0,
            source_start_offset: 0.0,
            source_end_offset: 12.0,
        })?
        .into_entity();

    engine.add_effect(
        opener.id,
        AddEffectRequest::new("color_grade")
            .with_param("lut", "warm")
            .with_param("intensity", 0.6),
    )?;
    engine.add_effect(
        underscore.id,
        AddEffectRequest::new("fade_in").with_param("seconds", 1.5),
    )?;

    let mut snapshot = engine.snapshot();
    let fixed_timestamp = DateTime::<Utc>::from_timestamp(1_771_804_800, 0).unwrap_or_default();
    snapshot.project.created_at = fixed_timestamp;
    snapshot.project.updated_at = fixed_timestamp;

    Engine::restore_with_allocator(snapshot, IdAllocator::sequential())
}
