use std::time::Instant;

use cutroom_core::{
    AddClipRequest, AddEffectRequest, AddSourceRequest, AddTrackRequest, ClipId, Engine,
    MediaKind, TrackKind, selectors::export_timeline,
};

fn budget_ms_from_env(key: &str, fallback: u128) -> u128 {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse::<u128>().ok())
        .unwrap_or(fallback)
}

fn perf_engine() -> (Engine, Vec<ClipId>) {
    let mut engine = Engine::default();
    let source = engine
        .add_source(AddSourceRequest {
            name: "Perf reel".to_string(),
            path: "media/perf.mp4".to_string(),
            kind: MediaKind::Video,
            duration: 3_600.0,
        })
        .expect("source should be added");

    let mut clip_ids = Vec::new();
    for track_index in 0..8_u32 {
        let track = engine
            .add_track(AddTrackRequest {
                name: format!("Track {}", track_index + 1),
                kind: if track_index % 2 == 0 {
                    TrackKind::Video
                } else {
                    TrackKind::Audio
                },
            })
            .expect("track should be added");

        for clip_index in 0..250_u32 {
            let start_time = f64::from(clip_index) * 2.0;
            let clip = engine
                .add_clip(AddClipRequest {
                    source_id: source.id,
                    track_id: track.id,
                    start_time,
                    duration: 2.0,
                    source_start_offset: start_time,
                    source_end_offset: start_time + 2.0,
                })
                .expect("clip should be added")
                .into_entity();
            engine
                .add_effect(clip.id, AddEffectRequest::new("gain").with_param("db", -3.0))
                .expect("effect should be added");
            clip_ids.push(clip.id);
        }
    }

    (engine, clip_ids)
}

#[test]
fn bulk_edits_and_export_stay_within_budget() {
    let max_build_ms = budget_ms_from_env("CUTROOM_PERF_MAX_BUILD_MS", 2_000);
    let max_edit_ms = budget_ms_from_env("CUTROOM_PERF_MAX_EDIT_MS", 2_000);
    let max_export_ms = budget_ms_from_env("CUTROOM_PERF_MAX_EXPORT_MS", 1_000);

    let build_start = Instant::now();
    let (mut engine, clip_ids) = perf_engine();
    let build_elapsed_ms = build_start.elapsed().as_millis();
    assert_eq!(engine.clip_count(), 2_000);
    assert!(
        build_elapsed_ms <= max_build_ms,
        "timeline build regression: {build_elapsed_ms}ms exceeded budget {max_build_ms}ms"
    );

    let edit_start = Instant::now();
    for clip_id in clip_ids.iter().step_by(4) {
        engine
            .trim_clip_end(*clip_id, 1.5)
            .expect("trim should succeed");
    }
    let edit_elapsed_ms = edit_start.elapsed().as_millis();
    assert!(
        edit_elapsed_ms <= max_edit_ms,
        "trim regression: {edit_elapsed_ms}ms exceeded budget {max_edit_ms}ms"
    );

    let export_start = Instant::now();
    let export = export_timeline(&engine);
    let export_elapsed_ms = export_start.elapsed().as_millis();
    assert_eq!(export.tracks.len(), 8);
    assert!(
        export_elapsed_ms <= max_export_ms,
        "export regression: {export_elapsed_ms}ms exceeded budget {max_export_ms}ms"
    );
}
