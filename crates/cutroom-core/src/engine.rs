use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::{
    config::EngineConfig,
    derived,
    ids::{ClipId, EffectId, IdAllocator, SourceId, TrackId},
    model::{
        AspectRatio, Clip, DEFAULT_FRAME_RATE, Effect, MIN_CLIP_DURATION, MediaKind, MediaSource,
        Project, TIME_EPSILON, Track, TrackKind,
    },
    persistence::{ProjectSnapshot, SNAPSHOT_SCHEMA_VERSION},
    playback::{PlaybackState, ZoomBounds, clamp_finite},
    registry::Registry,
};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("media source not found: {0}")]
    SourceNotFound(SourceId),
    #[error("track not found: {0}")]
    TrackNotFound(TrackId),
    #[error("clip not found: {0}")]
    ClipNotFound(ClipId),
    #[error("effect {effect_id} not found on clip {clip_id}")]
    EffectNotFound { clip_id: ClipId, effect_id: EffectId },
    #[error("invalid clip {clip_id}: {reason}")]
    InvalidClip { clip_id: ClipId, reason: String },
    #[error("{field} must be a finite number of seconds, got {value}")]
    NonFiniteTime { field: &'static str, value: f64 },
    #[error("invalid reorder to index {index} of {len}")]
    InvalidReorder { index: usize, len: usize },
    #[error("clip {clip_id} references missing {reference}")]
    DanglingReference {
        clip_id: ClipId,
        reference: &'static str,
    },
    #[error("id already in use: {0}")]
    DuplicateId(Uuid),
    #[error("unsupported snapshot schema version {0}")]
    UnsupportedSchema(u32),
    #[error("io error: {0}")]
    Io(String),
}

impl From<anyhow::Error> for EngineError {
    fn from(value: anyhow::Error) -> Self {
        Self::Io(value.to_string())
    }
}

/// A numeric field the engine adjusted before applying a request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Adjustment {
    pub field: &'static str,
    pub requested: f64,
    pub applied: f64,
}

/// Outcome of an edit that can clamp its arguments.
#[derive(Debug, Clone, PartialEq)]
pub enum Edit<T> {
    Applied(T),
    Clamped {
        entity: T,
        adjustments: Vec<Adjustment>,
    },
}

impl<T> Edit<T> {
    fn new(entity: T, adjustments: Vec<Adjustment>) -> Self {
        if adjustments.is_empty() {
            Self::Applied(entity)
        } else {
            Self::Clamped {
                entity,
                adjustments,
            }
        }
    }

    #[must_use]
    pub fn entity(&self) -> &T {
        match self {
            Self::Applied(entity) | Self::Clamped { entity, .. } => entity,
        }
    }

    #[must_use]
    pub fn into_entity(self) -> T {
        match self {
            Self::Applied(entity) | Self::Clamped { entity, .. } => entity,
        }
    }

    #[must_use]
    pub fn is_clamped(&self) -> bool {
        matches!(self, Self::Clamped { .. })
    }

    #[must_use]
    pub fn adjustments(&self) -> &[Adjustment] {
        match self {
            Self::Applied(_) => &[],
            Self::Clamped { adjustments, .. } => adjustments,
        }
    }
}

/// An entity removal together with the clips it took down with it.
#[derive(Debug, Clone, PartialEq)]
pub struct Removal<T> {
    pub entity: T,
    pub cascaded_clips: Vec<ClipId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddSourceRequest {
    pub name: String,
    pub path: String,
    pub kind: MediaKind,
    #[serde(default)]
    pub duration: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddTrackRequest {
    pub name: String,
    pub kind: TrackKind,
}

impl Default for AddTrackRequest {
    fn default() -> Self {
        Self {
            name: "Track".to_string(),
            kind: TrackKind::Video,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackPatch {
    pub name: Option<String>,
    pub kind: Option<TrackKind>,
    pub is_muted: Option<bool>,
    pub is_locked: Option<bool>,
    pub is_visible: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectPatch {
    pub name: Option<String>,
    pub aspect_ratio: Option<AspectRatio>,
    pub frame_rate: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddClipRequest {
    pub source_id: SourceId,
    pub track_id: TrackId,
    pub start_time: f64,
    pub duration: f64,
    pub source_start_offset: f64,
    pub source_end_offset: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClipPatch {
    pub source_id: Option<SourceId>,
    pub track_id: Option<TrackId>,
    pub start_time: Option<f64>,
    pub duration: Option<f64>,
    pub source_start_offset: Option<f64>,
    pub source_end_offset: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddEffectRequest {
    pub kind: String,
    #[serde(default)]
    pub params: BTreeMap<String, Value>,
}

impl AddEffectRequest {
    #[must_use]
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            params: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }
}

/// Field-level effect update. `params` entries are merged key by key and a
/// `null` value removes the key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EffectPatch {
    pub kind: Option<String>,
    pub enabled: Option<bool>,
    #[serde(default)]
    pub params: BTreeMap<String, Value>,
}

/// Entity a clip can depend on. Every removal path resolves its cascade
/// through this.
#[derive(Debug, Clone, Copy)]
enum Anchor {
    Clip(ClipId),
    Track(TrackId),
    Source(SourceId),
}

impl Anchor {
    fn holds(self, clip: &Clip) -> bool {
        match self {
            Self::Clip(clip_id) => clip.id == clip_id,
            Self::Track(track_id) => clip.track_id == track_id,
            Self::Source(source_id) => clip.source_id == source_id,
        }
    }
}

/// The editing session: project header, entity registries, selection and
/// playback. All structural changes go through its methods.
#[derive(Debug, Clone)]
pub struct Engine {
    project: Project,
    sources: Registry<SourceId, MediaSource>,
    tracks: Registry<TrackId, Track>,
    clips: Registry<ClipId, Clip>,
    selection: Vec<ClipId>,
    playback: PlaybackState,
    zoom_bounds: ZoomBounds,
    ids: IdAllocator,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(Project::new(
            "Untitled",
            AspectRatio::default(),
            DEFAULT_FRAME_RATE,
        ))
    }
}

impl Engine {
    #[must_use]
    pub fn new(project: Project) -> Self {
        Self::with_allocator(project, IdAllocator::default())
    }

    #[must_use]
    pub fn with_allocator(mut project: Project, ids: IdAllocator) -> Self {
        project.set_derived_duration(0.0);
        Self {
            project,
            sources: Registry::new(),
            tracks: Registry::new(),
            clips: Registry::new(),
            selection: Vec::new(),
            playback: PlaybackState::default(),
            zoom_bounds: ZoomBounds::default(),
            ids,
        }
    }

    #[must_use]
    pub fn from_config(config: &EngineConfig) -> Self {
        let mut engine = Self::new(Project::new(
            config.project.default_name.clone(),
            config.project.default_aspect_ratio,
            config.project.default_frame_rate,
        ));
        engine.zoom_bounds = ZoomBounds {
            min: config.playback.min_zoom,
            max: config.playback.max_zoom,
        }
        .sanitized();
        engine.playback.zoom = engine.zoom_bounds.clamp(config.playback.default_zoom);
        engine
    }

    /// Rebuilds an engine from a snapshot, rejecting dangling references,
    /// repeated ids and clips that break the timing invariants. The stored
    /// duration is ignored and recomputed. Every restored id is reserved in
    /// `ids`, so later edits never hand one out again.
    #[instrument(skip(snapshot, ids), fields(project_id = %snapshot.project.id))]
    pub fn restore_with_allocator(
        snapshot: ProjectSnapshot,
        ids: IdAllocator,
    ) -> Result<Self, EngineError> {
        if snapshot.schema_version != SNAPSHOT_SCHEMA_VERSION {
            return Err(EngineError::UnsupportedSchema(snapshot.schema_version));
        }

        let mut engine = Self::with_allocator(snapshot.project, ids);
        for source in snapshot.sources {
            let id = source.id.as_uuid();
            if !engine.sources.insert_new(source.id, source) {
                return Err(duplicate(id));
            }
            engine.ids.reserve(id);
        }

        let mut tracks = snapshot.tracks;
        tracks.sort_by_key(|track| track.order);
        for track in tracks {
            let id = track.id.as_uuid();
            if !engine.tracks.insert_new(track.id, track) {
                return Err(duplicate(id));
            }
            engine.ids.reserve(id);
        }
        engine.rerank_tracks();

        let mut effect_ids = HashSet::new();
        for clip in snapshot.clips {
            engine.validate_restored_clip(&clip)?;
            for effect in &clip.effects {
                if !effect_ids.insert(effect.id) {
                    return Err(duplicate(effect.id.as_uuid()));
                }
                engine.ids.reserve(effect.id.as_uuid());
            }
            let id = clip.id.as_uuid();
            if !engine.clips.insert_new(clip.id, clip) {
                return Err(duplicate(id));
            }
            engine.ids.reserve(id);
        }

        engine.recompute_derived();
        info!(
            sources = engine.sources.len(),
            tracks = engine.tracks.len(),
            clips = engine.clips.len(),
            duration = engine.project.duration(),
            "engine restored"
        );
        Ok(engine)
    }

    pub fn restore(snapshot: ProjectSnapshot) -> Result<Self, EngineError> {
        Self::restore_with_allocator(snapshot, IdAllocator::default())
    }

    #[must_use]
    pub fn snapshot(&self) -> ProjectSnapshot {
        ProjectSnapshot {
            schema_version: SNAPSHOT_SCHEMA_VERSION,
            project: self.project.clone(),
            sources: self.sources.values().cloned().collect(),
            tracks: self.tracks.values().cloned().collect(),
            clips: self.clips.values().cloned().collect(),
        }
    }

    #[must_use]
    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn sources(&self) -> impl Iterator<Item = &MediaSource> {
        self.sources.values()
    }

    /// Tracks in stacking order, bottom layer first.
    pub fn tracks(&self) -> impl Iterator<Item = &Track> {
        self.tracks.values()
    }

    pub fn clips(&self) -> impl Iterator<Item = &Clip> {
        self.clips.values()
    }

    #[must_use]
    pub fn source(&self, source_id: SourceId) -> Option<&MediaSource> {
        self.sources.get(&source_id)
    }

    #[must_use]
    pub fn track(&self, track_id: TrackId) -> Option<&Track> {
        self.tracks.get(&track_id)
    }

    #[must_use]
    pub fn clip(&self, clip_id: ClipId) -> Option<&Clip> {
        self.clips.get(&clip_id)
    }

    #[must_use]
    pub fn clip_count(&self) -> usize {
        self.clips.len()
    }

    #[must_use]
    pub fn selected_clip_ids(&self) -> &[ClipId] {
        &self.selection
    }

    #[must_use]
    pub fn playback(&self) -> &PlaybackState {
        &self.playback
    }

    #[must_use]
    pub fn zoom_bounds(&self) -> ZoomBounds {
        self.zoom_bounds
    }

    #[instrument(skip(self))]
    pub fn create_project(&mut self, name: String, aspect_ratio: AspectRatio, frame_rate: f64) {
        self.project = Project::new(name, aspect_ratio, frame_rate);
        self.sources = Registry::new();
        self.tracks = Registry::new();
        self.clips = Registry::new();
        self.selection.clear();
        self.playback = PlaybackState {
            zoom: self.playback.zoom,
            ..PlaybackState::default()
        };
        info!(project_id = %self.project.id, "project created");
    }

    #[instrument(skip(self), fields(project_id = %self.project.id))]
    pub fn update_project(&mut self, patch: ProjectPatch) -> Project {
        if let Some(name) = patch.name {
            self.project.name = name;
        }
        if let Some(aspect_ratio) = patch.aspect_ratio {
            self.project.aspect_ratio = aspect_ratio;
        }
        if let Some(frame_rate) = patch.frame_rate {
            if frame_rate.is_finite() && frame_rate > 0.0 {
                self.project.frame_rate = frame_rate;
            } else {
                warn!(frame_rate, "ignored invalid frame rate");
            }
        }
        self.project.touch();
        info!("project settings updated");
        self.project.clone()
    }

    #[instrument(skip(self), fields(project_id = %self.project.id, source_name = %request.name, kind = ?request.kind))]
    pub fn add_source(&mut self, request: AddSourceRequest) -> Result<MediaSource, EngineError> {
        let source = MediaSource {
            id: self.ids.source_id(),
            name: request.name,
            path: request.path,
            kind: request.kind,
            duration: if request.duration.is_finite() {
                request.duration.max(0.0)
            } else {
                0.0
            },
        };
        if !self.sources.insert_new(source.id, source.clone()) {
            return Err(duplicate(source.id.as_uuid()));
        }
        self.project.touch();
        info!(source_id = %source.id, "media source added");
        Ok(source)
    }

    #[instrument(skip(self), fields(project_id = %self.project.id, source_id = %source_id))]
    pub fn remove_source(
        &mut self,
        source_id: SourceId,
    ) -> Result<Removal<MediaSource>, EngineError> {
        let source = self
            .sources
            .remove(&source_id)
            .ok_or(EngineError::SourceNotFound(source_id))?;
        let cascaded_clips = self.cascade(Anchor::Source(source_id));
        info!(cascaded = cascaded_clips.len(), "media source removed");
        Ok(Removal {
            entity: source,
            cascaded_clips,
        })
    }

    #[instrument(skip(self), fields(project_id = %self.project.id, track_name = %request.name, track_kind = ?request.kind))]
    pub fn add_track(&mut self, request: AddTrackRequest) -> Result<Track, EngineError> {
        let track = Track {
            id: self.ids.track_id(),
            name: request.name,
            kind: request.kind,
            order: self.tracks.len(),
            is_muted: false,
            is_locked: false,
            is_visible: true,
        };
        if !self.tracks.insert_new(track.id, track.clone()) {
            return Err(duplicate(track.id.as_uuid()));
        }
        self.project.touch();
        info!(track_id = %track.id, order = track.order, "track added");
        Ok(track)
    }

    #[instrument(skip(self), fields(project_id = %self.project.id, track_id = %track_id))]
    pub fn remove_track(&mut self, track_id: TrackId) -> Result<Removal<Track>, EngineError> {
        let track = self
            .tracks
            .remove(&track_id)
            .ok_or(EngineError::TrackNotFound(track_id))?;
        self.rerank_tracks();
        let cascaded_clips = self.cascade(Anchor::Track(track_id));
        info!(cascaded = cascaded_clips.len(), "track removed");
        Ok(Removal {
            entity: track,
            cascaded_clips,
        })
    }

    #[instrument(skip(self), fields(project_id = %self.project.id, track_id = %track_id))]
    pub fn update_track(
        &mut self,
        track_id: TrackId,
        patch: TrackPatch,
    ) -> Result<Track, EngineError> {
        let updated_track = {
            let track = self
                .tracks
                .get_mut(&track_id)
                .ok_or(EngineError::TrackNotFound(track_id))?;

            if let Some(name) = patch.name {
                track.name = name;
            }
            if let Some(kind) = patch.kind {
                track.kind = kind;
            }
            if let Some(is_muted) = patch.is_muted {
                track.is_muted = is_muted;
            }
            if let Some(is_locked) = patch.is_locked {
                track.is_locked = is_locked;
            }
            if let Some(is_visible) = patch.is_visible {
                track.is_visible = is_visible;
            }

            track.clone()
        };
        self.project.touch();
        info!(
            is_muted = updated_track.is_muted,
            is_locked = updated_track.is_locked,
            is_visible = updated_track.is_visible,
            "track updated"
        );
        Ok(updated_track)
    }

    /// Moves a track to `to` in the stack and re-ranks every `order`.
    #[instrument(skip(self), fields(project_id = %self.project.id, track_id = %track_id))]
    pub fn reorder_track(&mut self, track_id: TrackId, to: usize) -> Result<Track, EngineError> {
        if !self.tracks.contains(&track_id) {
            return Err(EngineError::TrackNotFound(track_id));
        }
        if to >= self.tracks.len() {
            return Err(EngineError::InvalidReorder {
                index: to,
                len: self.tracks.len(),
            });
        }
        if self.tracks.position(&track_id) == Some(to) {
            debug!("reorder noop");
        } else {
            self.tracks.move_to(&track_id, to);
            self.rerank_tracks();
            self.project.touch();
            info!("track reordered");
        }
        self.tracks
            .get(&track_id)
            .cloned()
            .ok_or(EngineError::TrackNotFound(track_id))
    }

    #[instrument(skip(self, request), fields(project_id = %self.project.id, track_id = %request.track_id, source_id = %request.source_id))]
    pub fn add_clip(&mut self, request: AddClipRequest) -> Result<Edit<Clip>, EngineError> {
        self.require_track(request.track_id)?;
        self.require_source(request.source_id)?;

        let mut adjustments = Vec::new();
        let start_time = at_least(
            "start_time",
            finite("start_time", request.start_time)?,
            0.0,
            &mut adjustments,
        );
        let duration = at_least(
            "duration",
            finite("duration", request.duration)?,
            MIN_CLIP_DURATION,
            &mut adjustments,
        );
        let source_start_offset = at_least(
            "source_start_offset",
            finite("source_start_offset", request.source_start_offset)?,
            0.0,
            &mut adjustments,
        );
        let requested_end = finite("source_end_offset", request.source_end_offset)?;
        let source_end_offset = source_start_offset + duration;
        if !approx_eq(requested_end, source_end_offset) {
            adjustments.push(Adjustment {
                field: "source_end_offset",
                requested: requested_end,
                applied: source_end_offset,
            });
        }

        let clip = Clip {
            id: self.ids.clip_id(),
            source_id: request.source_id,
            track_id: request.track_id,
            start_time,
            duration,
            source_start_offset,
            source_end_offset,
            effects: Vec::new(),
        };
        if !self.clips.insert_new(clip.id, clip.clone()) {
            return Err(duplicate(clip.id.as_uuid()));
        }
        self.settle();

        if !adjustments.is_empty() {
            debug!(?adjustments, "clip request clamped");
        }
        info!(clip_id = %clip.id, duration = self.project.duration(), "clip added");
        Ok(Edit::new(clip, adjustments))
    }

    #[instrument(skip(self), fields(project_id = %self.project.id, clip_id = %clip_id))]
    pub fn remove_clip(&mut self, clip_id: ClipId) -> Result<Clip, EngineError> {
        let clip = self
            .clips
            .get(&clip_id)
            .cloned()
            .ok_or(EngineError::ClipNotFound(clip_id))?;
        self.cascade(Anchor::Clip(clip_id));
        info!(duration = self.project.duration(), "clip removed");
        Ok(clip)
    }

    /// Merges `patch` into the clip. The merged clip is validated as a whole
    /// and committed only if it keeps the trim window consistent.
    #[instrument(skip(self), fields(project_id = %self.project.id, clip_id = %clip_id))]
    pub fn update_clip(
        &mut self,
        clip_id: ClipId,
        patch: ClipPatch,
    ) -> Result<Edit<Clip>, EngineError> {
        let mut next = self
            .clips
            .get(&clip_id)
            .cloned()
            .ok_or(EngineError::ClipNotFound(clip_id))?;
        if let Some(track_id) = patch.track_id {
            self.require_track(track_id)?;
            next.track_id = track_id;
        }
        if let Some(source_id) = patch.source_id {
            self.require_source(source_id)?;
            next.source_id = source_id;
        }

        let mut adjustments = Vec::new();
        if let Some(start_time) = patch.start_time {
            next.start_time = at_least(
                "start_time",
                finite("start_time", start_time)?,
                0.0,
                &mut adjustments,
            );
        }

        let source_start_offset = patch
            .source_start_offset
            .map(|value| finite("source_start_offset", value))
            .transpose()?;
        let source_end_offset = patch
            .source_end_offset
            .map(|value| finite("source_end_offset", value))
            .transpose()?;
        let duration = patch
            .duration
            .map(|value| finite("duration", value))
            .transpose()?;

        if let Some(offset) = source_start_offset {
            if offset < 0.0 {
                return Err(invalid(clip_id, "source_start_offset must not be negative"));
            }
            next.source_start_offset = offset;
        }

        match (duration, source_end_offset) {
            (Some(duration), None) => {
                next.duration = at_least("duration", duration, MIN_CLIP_DURATION, &mut adjustments);
                next.source_end_offset = next.source_start_offset + next.duration;
            }
            (Some(duration), Some(end)) => {
                if duration < MIN_CLIP_DURATION {
                    return Err(invalid(clip_id, "duration is below the 0.1s minimum"));
                }
                next.duration = duration;
                next.source_end_offset = end;
            }
            (None, Some(end)) => {
                next.source_end_offset = end;
                next.duration = end - next.source_start_offset;
            }
            (None, None) => {
                if source_start_offset.is_some() {
                    next.duration = next.source_end_offset - next.source_start_offset;
                }
            }
        }

        if next.duration < MIN_CLIP_DURATION - TIME_EPSILON {
            return Err(invalid(
                clip_id,
                "trim window is shorter than the 0.1s minimum",
            ));
        }
        if !next.window_matches_duration() {
            return Err(invalid(
                clip_id,
                "source window length does not match clip duration",
            ));
        }

        self.clips.insert(clip_id, next.clone());
        self.settle();
        if !adjustments.is_empty() {
            debug!(?adjustments, "clip patch clamped");
        }
        info!(duration = self.project.duration(), "clip updated");
        Ok(Edit::new(next, adjustments))
    }

    #[instrument(skip(self), fields(project_id = %self.project.id, clip_id = %clip_id, track_id = %track_id))]
    pub fn move_clip(
        &mut self,
        clip_id: ClipId,
        track_id: TrackId,
        start_time: f64,
    ) -> Result<Edit<Clip>, EngineError> {
        self.require_track(track_id)?;
        let mut adjustments = Vec::new();
        let start_time = at_least(
            "start_time",
            finite("start_time", start_time)?,
            0.0,
            &mut adjustments,
        );

        let updated_clip = {
            let clip = self
                .clips
                .get_mut(&clip_id)
                .ok_or(EngineError::ClipNotFound(clip_id))?;
            clip.track_id = track_id;
            clip.start_time = start_time;
            clip.clone()
        };
        self.settle();
        info!(duration = self.project.duration(), "clip moved");
        Ok(Edit::new(updated_clip, adjustments))
    }

    /// Moves the clip's in-point. The source window start shifts by the same
    /// delta as the timeline start, so the out-point stays put. The delta is
    /// limited so that start time and source offset stay non-negative and
    /// the clip keeps its minimum duration.
    #[instrument(skip(self), fields(project_id = %self.project.id, clip_id = %clip_id))]
    pub fn trim_clip_start(
        &mut self,
        clip_id: ClipId,
        new_start_time: f64,
    ) -> Result<Edit<Clip>, EngineError> {
        let requested = finite("start_time", new_start_time)?;
        let (updated_clip, adjustments) = {
            let clip = self
                .clips
                .get_mut(&clip_id)
                .ok_or(EngineError::ClipNotFound(clip_id))?;

            let requested_delta = requested - clip.start_time;
            let lower = -clip.start_time.min(clip.source_start_offset).max(0.0);
            let upper = (clip.duration - MIN_CLIP_DURATION).max(0.0);
            let delta = requested_delta.clamp(lower, upper);

            clip.start_time = (clip.start_time + delta).max(0.0);
            clip.source_start_offset = (clip.source_start_offset + delta).max(0.0);
            clip.duration = (clip.duration - delta).max(MIN_CLIP_DURATION);
            clip.source_end_offset = clip.source_start_offset + clip.duration;

            let mut adjustments = Vec::new();
            if requested_delta < lower || requested_delta > upper {
                adjustments.push(Adjustment {
                    field: "start_time",
                    requested,
                    applied: clip.start_time,
                });
            }
            (clip.clone(), adjustments)
        };
        self.settle();
        if !adjustments.is_empty() {
            debug!(?adjustments, "trim start clamped");
        }
        info!(
            start_time = updated_clip.start_time,
            duration = updated_clip.duration,
            "clip start trimmed"
        );
        Ok(Edit::new(updated_clip, adjustments))
    }

    #[instrument(skip(self), fields(project_id = %self.project.id, clip_id = %clip_id))]
    pub fn trim_clip_end(
        &mut self,
        clip_id: ClipId,
        new_duration: f64,
    ) -> Result<Edit<Clip>, EngineError> {
        let mut adjustments = Vec::new();
        let duration = at_least(
            "duration",
            finite("duration", new_duration)?,
            MIN_CLIP_DURATION,
            &mut adjustments,
        );
        let updated_clip = {
            let clip = self
                .clips
                .get_mut(&clip_id)
                .ok_or(EngineError::ClipNotFound(clip_id))?;
            clip.duration = duration;
            clip.source_end_offset = clip.source_start_offset + duration;
            clip.clone()
        };
        self.settle();
        info!(duration = updated_clip.duration, "clip end trimmed");
        Ok(Edit::new(updated_clip, adjustments))
    }

    /// Cuts a clip in two at timeline position `at`. The left half keeps the
    /// id and effect chain; the right half gets a new id and a copy of the
    /// chain with fresh effect ids.
    #[instrument(skip(self), fields(project_id = %self.project.id, clip_id = %clip_id))]
    pub fn split_clip(&mut self, clip_id: ClipId, at: f64) -> Result<(Clip, Clip), EngineError> {
        let at = finite("at", at)?;
        let original = self
            .clips
            .get(&clip_id)
            .cloned()
            .ok_or(EngineError::ClipNotFound(clip_id))?;

        let left_duration = at - original.start_time;
        let right_duration = original.end_time() - at;
        if left_duration < MIN_CLIP_DURATION || right_duration < MIN_CLIP_DURATION {
            warn!("split point too close to clip edge");
            return Err(invalid(
                clip_id,
                "split point must leave both halves at least 0.1s long",
            ));
        }

        let mut left = original.clone();
        left.duration = left_duration;
        left.source_end_offset = left.source_start_offset + left_duration;

        let right_effects = original
            .effects
            .iter()
            .map(|effect| Effect {
                id: self.ids.effect_id(),
                ..effect.clone()
            })
            .collect();
        let right = Clip {
            id: self.ids.clip_id(),
            source_id: original.source_id,
            track_id: original.track_id,
            start_time: at,
            duration: right_duration,
            source_start_offset: left.source_end_offset,
            source_end_offset: left.source_end_offset + right_duration,
            effects: right_effects,
        };

        if !self.clips.insert_new(right.id, right.clone()) {
            return Err(duplicate(right.id.as_uuid()));
        }
        self.clips.insert(left.id, left.clone());
        self.settle();
        info!(right_clip_id = %right.id, "clip split");
        Ok((left, right))
    }

    #[instrument(skip(self, request), fields(project_id = %self.project.id, clip_id = %clip_id, effect = %request.kind))]
    pub fn add_effect(
        &mut self,
        clip_id: ClipId,
        request: AddEffectRequest,
    ) -> Result<Effect, EngineError> {
        let clip = self
            .clips
            .get_mut(&clip_id)
            .ok_or(EngineError::ClipNotFound(clip_id))?;

        let effect = Effect {
            id: self.ids.effect_id(),
            kind: request.kind,
            enabled: true,
            params: request.params,
        };
        clip.effects.push(effect.clone());
        self.settle();
        info!(effect_id = %effect.id, "effect added to clip");
        Ok(effect)
    }

    #[instrument(skip(self), fields(project_id = %self.project.id, clip_id = %clip_id, effect_id = %effect_id))]
    pub fn remove_effect(
        &mut self,
        clip_id: ClipId,
        effect_id: EffectId,
    ) -> Result<Effect, EngineError> {
        let clip = self
            .clips
            .get_mut(&clip_id)
            .ok_or(EngineError::ClipNotFound(clip_id))?;
        let index = clip
            .effects
            .iter()
            .position(|effect| effect.id == effect_id)
            .ok_or(EngineError::EffectNotFound { clip_id, effect_id })?;

        let effect = clip.effects.remove(index);
        self.settle();
        info!("effect removed from clip");
        Ok(effect)
    }

    #[instrument(skip(self, patch), fields(project_id = %self.project.id, clip_id = %clip_id, effect_id = %effect_id))]
    pub fn update_effect(
        &mut self,
        clip_id: ClipId,
        effect_id: EffectId,
        patch: EffectPatch,
    ) -> Result<Effect, EngineError> {
        let updated_effect = {
            let effect = self
                .clips
                .get_mut(&clip_id)
                .ok_or(EngineError::ClipNotFound(clip_id))?
                .effects
                .iter_mut()
                .find(|effect| effect.id == effect_id)
                .ok_or(EngineError::EffectNotFound { clip_id, effect_id })?;

            if let Some(kind) = patch.kind {
                effect.kind = kind;
            }
            if let Some(enabled) = patch.enabled {
                effect.enabled = enabled;
            }
            for (key, value) in patch.params {
                if value.is_null() {
                    effect.params.remove(&key);
                } else {
                    effect.params.insert(key, value);
                }
            }
            effect.clone()
        };
        self.settle();
        info!(
            enabled = updated_effect.enabled,
            params = updated_effect.params.len(),
            "effect updated"
        );
        Ok(updated_effect)
    }

    /// Moves an effect to `to` within its clip's chain. Later effects
    /// composite on top of earlier ones.
    #[instrument(skip(self), fields(project_id = %self.project.id, clip_id = %clip_id, effect_id = %effect_id))]
    pub fn move_effect(
        &mut self,
        clip_id: ClipId,
        effect_id: EffectId,
        to: usize,
    ) -> Result<Effect, EngineError> {
        let moved = {
            let clip = self
                .clips
                .get_mut(&clip_id)
                .ok_or(EngineError::ClipNotFound(clip_id))?;
            let from = clip
                .effects
                .iter()
                .position(|effect| effect.id == effect_id)
                .ok_or(EngineError::EffectNotFound { clip_id, effect_id })?;
            if to >= clip.effects.len() {
                return Err(EngineError::InvalidReorder {
                    index: to,
                    len: clip.effects.len(),
                });
            }
            if from == to {
                debug!("effect reorder noop");
                return Ok(clip.effects[from].clone());
            }

            let effect = clip.effects.remove(from);
            clip.effects.insert(to, effect.clone());
            effect
        };
        self.settle();
        info!("effect reordered");
        Ok(moved)
    }

    /// Selects a clip, either replacing the selection or appending to it.
    /// Appending an already selected clip leaves the selection unchanged.
    #[instrument(skip(self), fields(clip_id = %clip_id))]
    pub fn select_clip(
        &mut self,
        clip_id: ClipId,
        add_to_selection: bool,
    ) -> Result<&[ClipId], EngineError> {
        if !self.clips.contains(&clip_id) {
            return Err(EngineError::ClipNotFound(clip_id));
        }

        if add_to_selection {
            if !self.selection.contains(&clip_id) {
                self.selection.push(clip_id);
            }
        } else {
            self.selection.clear();
            self.selection.push(clip_id);
        }
        debug!(selected = self.selection.len(), "selection changed");
        Ok(self.selection.as_slice())
    }

    pub fn deselect_clip(&mut self, clip_id: ClipId) -> bool {
        let before = self.selection.len();
        self.selection.retain(|selected| *selected != clip_id);
        self.selection.len() != before
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Moves the playhead, clamped to `[0, project duration]`.
    #[instrument(skip(self))]
    pub fn seek(&mut self, time: f64) -> f64 {
        self.playback.current_time = clamp_finite(time, 0.0, self.project.duration());
        debug!(current_time = self.playback.current_time, "playhead moved");
        self.playback.current_time
    }

    pub fn play(&mut self) {
        self.set_transport(true);
    }

    pub fn pause(&mut self) {
        self.set_transport(false);
    }

    /// Flips between playing and paused. Returns the new state.
    pub fn toggle_playback(&mut self) -> bool {
        let is_playing = !self.playback.is_playing;
        self.set_transport(is_playing);
        is_playing
    }

    pub fn set_zoom(&mut self, zoom: f64) -> f64 {
        self.playback.zoom = self.zoom_bounds.clamp(zoom);
        self.playback.zoom
    }

    pub fn set_scroll_x(&mut self, scroll_x: f64) -> f64 {
        self.playback.scroll_x = clamp_finite(scroll_x, 0.0, f64::MAX);
        self.playback.scroll_x
    }

    #[instrument(skip(self), fields(project_id = %self.project.id))]
    fn set_transport(&mut self, is_playing: bool) {
        self.playback.is_playing = is_playing;
        info!(is_playing, "transport state changed");
    }

    fn require_track(&self, track_id: TrackId) -> Result<(), EngineError> {
        if self.tracks.contains(&track_id) {
            Ok(())
        } else {
            warn!(%track_id, "rejected reference to unknown track");
            Err(EngineError::TrackNotFound(track_id))
        }
    }

    fn require_source(&self, source_id: SourceId) -> Result<(), EngineError> {
        if self.sources.contains(&source_id) {
            Ok(())
        } else {
            warn!(%source_id, "rejected reference to unknown media source");
            Err(EngineError::SourceNotFound(source_id))
        }
    }

    fn validate_restored_clip(&self, clip: &Clip) -> Result<(), EngineError> {
        if !self.tracks.contains(&clip.track_id) {
            return Err(EngineError::DanglingReference {
                clip_id: clip.id,
                reference: "track",
            });
        }
        if !self.sources.contains(&clip.source_id) {
            return Err(EngineError::DanglingReference {
                clip_id: clip.id,
                reference: "media source",
            });
        }
        for (field, value) in [
            ("start_time", clip.start_time),
            ("duration", clip.duration),
            ("source_start_offset", clip.source_start_offset),
            ("source_end_offset", clip.source_end_offset),
        ] {
            finite(field, value)?;
        }
        if clip.start_time < 0.0 || clip.source_start_offset < 0.0 {
            return Err(invalid(clip.id, "negative start time or source offset"));
        }
        if clip.duration < MIN_CLIP_DURATION - TIME_EPSILON {
            return Err(invalid(clip.id, "duration is below the 0.1s minimum"));
        }
        if !clip.window_matches_duration() {
            return Err(invalid(
                clip.id,
                "source window length does not match clip duration",
            ));
        }
        Ok(())
    }

    /// Removes every clip depending on `anchor`, prunes the selection and
    /// settles derived state. Returns the removed clip ids.
    fn cascade(&mut self, anchor: Anchor) -> Vec<ClipId> {
        let removed: Vec<ClipId> = self
            .clips
            .drain_where(|clip| anchor.holds(clip))
            .into_iter()
            .map(|(clip_id, _)| clip_id)
            .collect();
        if !removed.is_empty() {
            self.selection.retain(|selected| !removed.contains(selected));
            debug!(?anchor, removed = removed.len(), "cascade removed clips");
        }
        self.settle();
        removed
    }

    fn rerank_tracks(&mut self) {
        let ids: Vec<TrackId> = self.tracks.keys().copied().collect();
        for (rank, track_id) in ids.iter().enumerate() {
            if let Some(track) = self.tracks.get_mut(track_id) {
                track.order = rank;
            }
        }
    }

    /// Recomputes derived aggregates after a structural change and pulls the
    /// playhead back inside a shortened timeline.
    fn settle(&mut self) {
        self.recompute_derived();
        let duration = self.project.duration();
        if self.playback.current_time > duration {
            self.playback.current_time = duration;
            debug!(current_time = duration, "playhead clamped to new end");
        }
        self.project.touch();
    }

    fn recompute_derived(&mut self) {
        let duration = derived::project_duration(self.clips.values());
        self.project.set_derived_duration(duration);
    }
}

fn finite(field: &'static str, value: f64) -> Result<f64, EngineError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(EngineError::NonFiniteTime { field, value })
    }
}

fn at_least(
    field: &'static str,
    requested: f64,
    minimum: f64,
    adjustments: &mut Vec<Adjustment>,
) -> f64 {
    if requested < minimum {
        adjustments.push(Adjustment {
            field,
            requested,
            applied: minimum,
        });
        minimum
    } else {
        requested
    }
}

fn approx_eq(left: f64, right: f64) -> bool {
    (left - right).abs() <= TIME_EPSILON * left.abs().max(right.abs()).max(1.0)
}

fn duplicate(id: Uuid) -> EngineError {
    warn!(%id, "rejected id that is already in use");
    EngineError::DuplicateId(id)
}

fn invalid(clip_id: ClipId, reason: &str) -> EngineError {
    warn!(%clip_id, reason, "rejected clip edit");
    EngineError::InvalidClip {
        clip_id,
        reason: reason.to_string(),
    }
}
