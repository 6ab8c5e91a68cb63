use cutroom_core::{
    AspectRatio,
    fixtures::demo_engine,
    selectors::{
        clips_at, clips_for_analysis, clips_on_track, export_timeline, selected_clips,
        tracks_in_order,
    },
};

#[test]
fn analysis_view_orders_by_start_then_stacking() {
    let engine = demo_engine().expect("demo edit should build");
    let clips = clips_for_analysis(&engine);

    let paths: Vec<&str> = clips.iter().map(|clip| clip.source_path.as_str()).collect();
    assert_eq!(
        paths,
        vec!["media/interview.mp4", "media/bed.mp3", "media/broll-city.mp4"]
    );
    assert_eq!(clips[0].effect_kinds, vec!["color_grade"]);
    assert!((clips[2].end_time - 12.0).abs() < 1e-9);
    assert!((clips[0].source_start_offset - 10.0).abs() < 1e-9);
}

#[test]
fn export_quantizes_placement_to_frames() {
    let engine = demo_engine().expect("demo edit should build");
    let export = export_timeline(&engine);

    assert_eq!(export.aspect_ratio, AspectRatio::Portrait);
    assert_eq!(export.total_frames, 360);
    assert_eq!(export.tracks.len(), 2);
    assert_eq!(export.tracks[0].name, "Main");
    assert_eq!(export.tracks[1].name, "Music");
    assert!((export.tracks[0].extent - 12.0).abs() < 1e-9);

    let main = &export.tracks[0].clips;
    assert_eq!(main.len(), 2);
    assert_eq!((main[0].start_frame, main[0].frame_count), (0, 240));
    assert_eq!((main[1].start_frame, main[1].frame_count), (240, 120));
    assert_eq!(main[0].effects[0].kind, "color_grade");
}

#[test]
fn playhead_hits_are_bottom_layer_first() {
    let engine = demo_engine().expect("demo edit should build");

    let hits = clips_at(&engine, 9.0);
    let tracks = tracks_in_order(&engine);
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].track_id, tracks[0].id);
    assert_eq!(hits[1].track_id, tracks[1].id);

    assert!(clips_at(&engine, 12.0).is_empty());
}

#[test]
fn track_and_selection_views_follow_engine_state() {
    let mut engine = demo_engine().expect("demo edit should build");
    let main = tracks_in_order(&engine)[0].id;

    let on_main = clips_on_track(&engine, main);
    assert_eq!(on_main.len(), 2);
    assert!(on_main[0].start_time < on_main[1].start_time);

    engine.select_clip(on_main[1].id, true).expect("select");
    engine.select_clip(on_main[0].id, true).expect("select");
    let selected = selected_clips(&engine);
    assert_eq!(selected, vec![on_main[1].clone(), on_main[0].clone()]);
}
