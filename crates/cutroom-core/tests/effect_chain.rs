use cutroom_core::{
    AddClipRequest, AddEffectRequest, AddSourceRequest, AddTrackRequest, ClipId, EffectId,
    EffectPatch, Engine, EngineError, MediaKind,
};
use serde_json::{Value, json};

fn engine_with_clip() -> (Engine, ClipId) {
    let mut engine = Engine::default();
    let track = engine
        .add_track(AddTrackRequest::default())
        .expect("track should be added");
    let source = engine
        .add_source(AddSourceRequest {
            name: "hero".to_string(),
            path: "hero.mp4".to_string(),
            kind: MediaKind::Video,
            duration: 20.0,
        })
        .expect("source should be added");
    let clip = engine
        .add_clip(AddClipRequest {
            source_id: source.id,
            track_id: track.id,
            start_time: 0.0,
            duration: 10.0,
            source_start_offset: 0.0,
            source_end_offset: 10.0,
        })
        .expect("clip should be added")
        .into_entity();
    (engine, clip.id)
}

fn chain_kinds(engine: &Engine, clip_id: ClipId) -> Vec<String> {
    engine
        .clip(clip_id)
        .expect("clip exists")
        .effects
        .iter()
        .map(|effect| effect.kind.clone())
        .collect()
}

#[test]
fn effects_append_in_compositing_order() {
    let (mut engine, clip_id) = engine_with_clip();

    for kind in ["stabilize", "color_grade", "vignette"] {
        engine
            .add_effect(clip_id, AddEffectRequest::new(kind))
            .expect("effect should be added");
    }

    assert_eq!(
        chain_kinds(&engine, clip_id),
        vec!["stabilize", "color_grade", "vignette"]
    );
}

#[test]
fn update_effect_merges_params_and_null_deletes() {
    let (mut engine, clip_id) = engine_with_clip();
    let effect = engine
        .add_effect(
            clip_id,
            AddEffectRequest::new("blur")
                .with_param("radius", 4.0)
                .with_param("mode", "gaussian"),
        )
        .expect("effect should be added");

    let mut patch = EffectPatch {
        enabled: Some(false),
        ..EffectPatch::default()
    };
    patch.params.insert("radius".to_string(), json!(9.5));
    patch.params.insert("mode".to_string(), Value::Null);
    patch.params.insert("edges".to_string(), json!("clamp"));

    let updated = engine
        .update_effect(clip_id, effect.id, patch)
        .expect("update should succeed");

    assert!(!updated.enabled);
    assert_eq!(updated.kind, "blur");
    assert_eq!(updated.params.get("radius"), Some(&json!(9.5)));
    assert_eq!(updated.params.get("edges"), Some(&json!("clamp")));
    assert!(!updated.params.contains_key("mode"));
}

#[test]
fn remove_and_move_effects() {
    let (mut engine, clip_id) = engine_with_clip();
    let ids: Vec<EffectId> = ["a", "b", "c", "d"]
        .into_iter()
        .map(|kind| {
            engine
                .add_effect(clip_id, AddEffectRequest::new(kind))
                .expect("effect should be added")
                .id
        })
        .collect();

    let removed = engine
        .remove_effect(clip_id, ids[1])
        .expect("remove should succeed");
    assert_eq!(removed.kind, "b");
    assert_eq!(chain_kinds(&engine, clip_id), vec!["a", "c", "d"]);

    engine
        .move_effect(clip_id, ids[3], 0)
        .expect("move should succeed");
    assert_eq!(chain_kinds(&engine, clip_id), vec!["d", "a", "c"]);

    assert!(matches!(
        engine.move_effect(clip_id, ids[0], 3),
        Err(EngineError::InvalidReorder { index: 3, len: 3 })
    ));
    assert!(matches!(
        engine.remove_effect(clip_id, ids[1]),
        Err(EngineError::EffectNotFound { effect_id, .. }) if effect_id == ids[1]
    ));
}

#[test]
fn effect_operations_on_missing_clip_fail() {
    let (mut engine, clip_id) = engine_with_clip();
    let effect = engine
        .add_effect(clip_id, AddEffectRequest::new("sharpen"))
        .expect("effect should be added");
    engine.remove_clip(clip_id).expect("remove clip");

    assert!(matches!(
        engine.add_effect(clip_id, AddEffectRequest::new("glow")),
        Err(EngineError::ClipNotFound(_))
    ));
    assert!(matches!(
        engine.update_effect(clip_id, effect.id, EffectPatch::default()),
        Err(EngineError::ClipNotFound(_))
    ));
    assert!(matches!(
        engine.remove_effect(clip_id, effect.id),
        Err(EngineError::ClipNotFound(_))
    ));
}

#[test]
fn split_copies_the_chain_with_fresh_ids() {
    let (mut engine, clip_id) = engine_with_clip();
    let original = engine
        .add_effect(clip_id, AddEffectRequest::new("lut").with_param("name", "teal"))
        .expect("effect should be added");

    let (left, right) = engine.split_clip(clip_id, 4.0).expect("split should work");

    assert_eq!(left.effects, vec![original.clone()]);
    assert_eq!(right.effects.len(), 1);
    assert_ne!(right.effects[0].id, original.id);
    assert_eq!(right.effects[0].kind, original.kind);
    assert_eq!(right.effects[0].params, original.params);
}
