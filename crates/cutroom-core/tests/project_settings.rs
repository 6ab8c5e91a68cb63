use cutroom_core::{AspectRatio, Engine, ProjectPatch, fixtures::demo_engine};

#[test]
fn update_project_merges_settings_and_ignores_bad_frame_rates() {
    let mut engine = demo_engine().expect("demo edit should build");
    let before = engine.project().clone();

    let updated = engine.update_project(ProjectPatch {
        name: Some("Launch teaser".to_string()),
        frame_rate: Some(f64::NAN),
        ..ProjectPatch::default()
    });
    assert_eq!(updated.name, "Launch teaser");
    assert_eq!(updated.aspect_ratio, before.aspect_ratio);
    assert!((updated.frame_rate - before.frame_rate).abs() < f64::EPSILON);
    assert!(updated.updated_at >= before.updated_at);

    let updated = engine.update_project(ProjectPatch {
        aspect_ratio: Some(AspectRatio::Square),
        frame_rate: Some(24.0),
        ..ProjectPatch::default()
    });
    assert_eq!(updated.aspect_ratio, AspectRatio::Square);
    assert!((updated.frame_rate - 24.0).abs() < f64::EPSILON);
    assert!((engine.project().duration() - 12.0).abs() < 1e-9);
}

#[test]
fn create_project_starts_from_an_empty_graph() {
    let mut engine = demo_engine().expect("demo edit should build");
    let old_id = engine.project().id;
    let first_clip = engine.clips().next().expect("demo has clips").id;
    engine.select_clip(first_clip, false).expect("select");
    engine.seek(6.0);
    engine.set_zoom(3.0);

    engine.create_project("Fresh cut".to_string(), AspectRatio::Vertical, 25.0);

    assert_ne!(engine.project().id, old_id);
    assert_eq!(engine.project().name, "Fresh cut");
    assert_eq!(engine.project().aspect_ratio, AspectRatio::Vertical);
    assert_eq!(engine.clip_count(), 0);
    assert_eq!(engine.tracks().count(), 0);
    assert_eq!(engine.sources().count(), 0);
    assert!(engine.selected_clip_ids().is_empty());
    assert!(engine.project().duration().abs() < f64::EPSILON);
    assert!(engine.playback().current_time.abs() < f64::EPSILON);
    assert!((engine.playback().zoom - 3.0).abs() < f64::EPSILON);
}

#[test]
fn default_engine_uses_landscape_at_thirty_fps() {
    let engine = Engine::default();

    assert_eq!(engine.project().aspect_ratio, AspectRatio::Landscape);
    assert_eq!(engine.project().aspect_ratio.terms(), (16, 9));
    assert!((engine.project().frame_rate - 30.0).abs() < f64::EPSILON);
}
