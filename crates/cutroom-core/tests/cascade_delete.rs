use cutroom_core::{
    AddClipRequest, AddSourceRequest, AddTrackRequest, ClipId, Engine, EngineError, MediaKind,
    SourceId, TrackId, TrackKind, TrackPatch,
};

struct Graph {
    engine: Engine,
    video: TrackId,
    audio: TrackId,
    camera: SourceId,
    voice: SourceId,
    clips: Vec<ClipId>,
}

fn graph() -> Graph {
    let mut engine = Engine::default();
    let video = engine
        .add_track(AddTrackRequest {
            name: "V1".to_string(),
            kind: TrackKind::Video,
        })
        .expect("track should be added")
        .id;
    let audio = engine
        .add_track(AddTrackRequest {
            name: "A1".to_string(),
            kind: TrackKind::Audio,
        })
        .expect("track should be added")
        .id;
    let camera = engine
        .add_source(AddSourceRequest {
            name: "camera".to_string(),
            path: "camera.mov".to_string(),
            kind: MediaKind::Video,
            duration: 90.0,
        })
        .expect("source should be added")
        .id;
    let voice = engine
        .add_source(AddSourceRequest {
            name: "voice".to_string(),
            path: "voice.wav".to_string(),
            kind: MediaKind::Audio,
            duration: 90.0,
        })
        .expect("source should be added")
        .id;

    let placements = [
        (video, camera, 0.0, 4.0),
        (video, camera, 4.0, 6.0),
        (audio, voice, 0.0, 12.0),
        (audio, camera, 12.0, 3.0),
    ];
    let clips = placements
        .into_iter()
        .map(|(track_id, source_id, start_time, duration)| {
            engine
                .add_clip(AddClipRequest {
                    source_id,
                    track_id,
                    start_time,
                    duration,
                    source_start_offset: 0.0,
                    source_end_offset: duration,
                })
                .expect("graph clip should be added")
                .entity()
                .id
        })
        .collect();

    Graph {
        engine,
        video,
        audio,
        camera,
        voice,
        clips,
    }
}

#[test]
fn removing_a_track_removes_its_clips_and_prunes_selection() {
    let Graph {
        mut engine,
        video,
        audio,
        clips,
        ..
    } = graph();

    engine.select_clip(clips[0], false).expect("select first");
    engine.select_clip(clips[2], true).expect("select third");

    let removal = engine.remove_track(video).expect("track should be removed");
    assert_eq!(removal.entity.id, video);
    assert_eq!(removal.cascaded_clips, vec![clips[0], clips[1]]);

    assert!(engine.clips().all(|clip| clip.track_id != video));
    assert_eq!(engine.selected_clip_ids(), &[clips[2]]);
    assert!((engine.project().duration() - 15.0).abs() < 1e-9);

    let remaining = engine.track(audio).expect("audio track remains");
    assert_eq!(remaining.order, 0);
}

#[test]
fn removing_a_source_removes_every_clip_that_references_it() {
    let Graph {
        mut engine,
        camera,
        voice,
        clips,
        ..
    } = graph();

    engine.select_clip(clips[3], false).expect("select last");
    let removal = engine.remove_source(camera).expect("source should be removed");

    assert_eq!(removal.cascaded_clips, vec![clips[0], clips[1], clips[3]]);
    assert_eq!(engine.clip_count(), 1);
    assert!(engine.clips().all(|clip| clip.source_id == voice));
    assert!(engine.selected_clip_ids().is_empty());
    assert!((engine.project().duration() - 12.0).abs() < 1e-9);
    assert!(engine.source(camera).is_none());
}

#[test]
fn removing_everything_returns_duration_to_zero() {
    let Graph {
        mut engine,
        video,
        audio,
        ..
    } = graph();

    engine.remove_track(video).expect("remove video");
    engine.remove_track(audio).expect("remove audio");

    assert_eq!(engine.clip_count(), 0);
    assert!(engine.project().duration().abs() < f64::EPSILON);
}

#[test]
fn removing_unknown_entities_is_an_error_and_changes_nothing() {
    let Graph { mut engine, .. } = graph();
    let before = engine.snapshot();

    let ghost_track = TrackId(uuid::Uuid::from_u128(31));
    let ghost_source = SourceId(uuid::Uuid::from_u128(32));
    assert!(matches!(
        engine.remove_track(ghost_track),
        Err(EngineError::TrackNotFound(id)) if id == ghost_track
    ));
    assert!(matches!(
        engine.remove_source(ghost_source),
        Err(EngineError::SourceNotFound(id)) if id == ghost_source
    ));

    let after = engine.snapshot();
    assert_eq!(before.clips, after.clips);
    assert_eq!(before.tracks, after.tracks);
    assert_eq!(before.sources, after.sources);
}

#[test]
fn track_order_stays_dense_through_reorders_and_removals() {
    let Graph {
        mut engine,
        video,
        audio,
        ..
    } = graph();
    let titles = engine
        .add_track(AddTrackRequest {
            name: "Titles".to_string(),
            kind: TrackKind::Video,
        })
        .expect("track should be added")
        .id;
    assert_eq!(engine.track(titles).map(|track| track.order), Some(2));

    let moved = engine.reorder_track(titles, 0).expect("reorder should work");
    assert_eq!(moved.order, 0);
    let orders: Vec<(TrackId, usize)> = engine
        .tracks()
        .map(|track| (track.id, track.order))
        .collect();
    assert_eq!(orders, vec![(titles, 0), (video, 1), (audio, 2)]);

    assert!(matches!(
        engine.reorder_track(video, 3),
        Err(EngineError::InvalidReorder { index: 3, len: 3 })
    ));

    engine.remove_track(video).expect("remove video");
    let orders: Vec<usize> = engine.tracks().map(|track| track.order).collect();
    assert_eq!(orders, vec![0, 1]);
}

#[test]
fn update_track_merges_only_given_fields() {
    let Graph {
        mut engine, audio, ..
    } = graph();

    let updated = engine
        .update_track(
            audio,
            TrackPatch {
                is_muted: Some(true),
                name: Some("Dialogue".to_string()),
                ..TrackPatch::default()
            },
        )
        .expect("update should succeed");

    assert!(updated.is_muted);
    assert!(updated.is_visible);
    assert!(!updated.is_locked);
    assert_eq!(updated.name, "Dialogue");
    assert_eq!(updated.kind, TrackKind::Audio);
    assert_eq!(engine.track(audio), Some(&updated));
}
