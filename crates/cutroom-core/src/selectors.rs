//! Read-only projections of the timeline for collaborators outside the
//! engine (AI analysis, export). Everything returned here is an owned
//! snapshot; changes go back through [`Engine`] methods.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::{
    derived,
    engine::Engine,
    ids::{ClipId, EffectId, SourceId, TrackId},
    model::{AspectRatio, Clip, Effect, MediaKind, Track, TrackKind},
    time::seconds_to_frames,
};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AnalysisClip {
    pub clip_id: ClipId,
    pub track_id: TrackId,
    pub track_kind: TrackKind,
    pub source_id: SourceId,
    pub source_path: String,
    pub source_kind: MediaKind,
    pub start_time: f64,
    pub end_time: f64,
    pub source_start_offset: f64,
    pub source_end_offset: f64,
    pub effect_kinds: Vec<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ExportTimeline {
    pub name: String,
    pub aspect_ratio: AspectRatio,
    pub frame_rate: f64,
    pub duration: f64,
    pub total_frames: u64,
    /// Bottom layer first.
    pub tracks: Vec<ExportTrack>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ExportTrack {
    pub track_id: TrackId,
    pub name: String,
    pub kind: TrackKind,
    pub order: usize,
    pub is_muted: bool,
    pub is_visible: bool,
    /// End of the last clip on this track.
    pub extent: f64,
    pub clips: Vec<ExportClip>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ExportClip {
    pub clip_id: ClipId,
    pub source_id: SourceId,
    pub source_path: String,
    pub start_time: f64,
    pub duration: f64,
    pub start_frame: u64,
    pub frame_count: u64,
    pub source_start_offset: f64,
    pub source_end_offset: f64,
    pub effects: Vec<ExportEffect>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ExportEffect {
    pub effect_id: EffectId,
    pub kind: String,
    pub enabled: bool,
    pub params: BTreeMap<String, Value>,
}

impl From<&Effect> for ExportEffect {
    fn from(effect: &Effect) -> Self {
        Self {
            effect_id: effect.id,
            kind: effect.kind.clone(),
            enabled: effect.enabled,
            params: effect.params.clone(),
        }
    }
}

/// Every clip with its source and track resolved, ordered by start time and
/// then by track stacking order.
#[must_use]
pub fn clips_for_analysis(engine: &Engine) -> Vec<AnalysisClip> {
    let mut clips: Vec<(usize, AnalysisClip)> = engine
        .clips()
        .filter_map(|clip| {
            let track = engine.track(clip.track_id)?;
            let source = engine.source(clip.source_id)?;
            Some((
                track.order,
                AnalysisClip {
                    clip_id: clip.id,
                    track_id: track.id,
                    track_kind: track.kind,
                    source_id: source.id,
                    source_path: source.path.clone(),
                    source_kind: source.kind,
                    start_time: clip.start_time,
                    end_time: clip.end_time(),
                    source_start_offset: clip.source_start_offset,
                    source_end_offset: clip.source_end_offset,
                    effect_kinds: clip
                        .effects
                        .iter()
                        .map(|effect| effect.kind.clone())
                        .collect(),
                },
            ))
        })
        .collect();

    clips.sort_by(|(left_order, left), (right_order, right)| {
        left.start_time
            .total_cmp(&right.start_time)
            .then(left_order.cmp(right_order))
    });
    clips.into_iter().map(|(_, clip)| clip).collect()
}

/// The whole edit, track by track, with frame-quantized placement.
#[must_use]
pub fn export_timeline(engine: &Engine) -> ExportTimeline {
    let project = engine.project();
    let frame_rate = project.frame_rate;

    let tracks = engine
        .tracks()
        .map(|track| ExportTrack {
            track_id: track.id,
            name: track.name.clone(),
            kind: track.kind,
            order: track.order,
            is_muted: track.is_muted,
            is_visible: track.is_visible,
            extent: derived::track_extent(engine.clips(), track.id),
            clips: clips_on_track(engine, track.id)
                .into_iter()
                .map(|clip| {
                    let start_frame = seconds_to_frames(clip.start_time, frame_rate);
                    let end_frame = seconds_to_frames(clip.end_time(), frame_rate);
                    ExportClip {
                        clip_id: clip.id,
                        source_id: clip.source_id,
                        source_path: engine
                            .source(clip.source_id)
                            .map(|source| source.path.clone())
                            .unwrap_or_default(),
                        start_time: clip.start_time,
                        duration: clip.duration,
                        start_frame,
                        frame_count: end_frame.saturating_sub(start_frame),
                        source_start_offset: clip.source_start_offset,
                        source_end_offset: clip.source_end_offset,
                        effects: clip.effects.iter().map(ExportEffect::from).collect(),
                    }
                })
                .collect(),
        })
        .collect();

    ExportTimeline {
        name: project.name.clone(),
        aspect_ratio: project.aspect_ratio,
        frame_rate,
        duration: project.duration(),
        total_frames: seconds_to_frames(project.duration(), frame_rate),
        tracks,
    }
}

/// Clips on one track sorted by start time.
#[must_use]
pub fn clips_on_track(engine: &Engine, track_id: TrackId) -> Vec<Clip> {
    let mut clips: Vec<Clip> = engine
        .clips()
        .filter(|clip| clip.track_id == track_id)
        .cloned()
        .collect();
    clips.sort_by(|left, right| left.start_time.total_cmp(&right.start_time));
    clips
}

/// Clips under the playhead position `time`, bottom layer first.
#[must_use]
pub fn clips_at(engine: &Engine, time: f64) -> Vec<Clip> {
    let mut hits: Vec<(usize, Clip)> = engine
        .clips()
        .filter(|clip| clip.contains_time(time))
        .map(|clip| {
            let order = engine.track(clip.track_id).map_or(usize::MAX, |track| track.order);
            (order, clip.clone())
        })
        .collect();
    hits.sort_by_key(|(order, _)| *order);
    hits.into_iter().map(|(_, clip)| clip).collect()
}

/// Selected clips in selection order.
#[must_use]
pub fn selected_clips(engine: &Engine) -> Vec<Clip> {
    engine
        .selected_clip_ids()
        .iter()
        .filter_map(|clip_id| engine.clip(*clip_id).cloned())
        .collect()
}

#[must_use]
pub fn tracks_in_order(engine: &Engine) -> Vec<Track> {
    engine.tracks().cloned().collect()
}
