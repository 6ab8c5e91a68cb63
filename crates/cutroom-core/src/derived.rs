//! Aggregates computed from the clip set. Nothing here is stored
//! independently; the engine re-runs these after each structural edit.

use crate::{ids::TrackId, model::Clip};

/// Latest clip end time, or 0 for an empty timeline.
#[must_use]
pub fn project_duration<'a>(clips: impl IntoIterator<Item = &'a Clip>) -> f64 {
    clips
        .into_iter()
        .map(Clip::end_time)
        .fold(0.0_f64, f64::max)
}

/// Latest clip end time on a single track.
#[must_use]
pub fn track_extent<'a>(clips: impl IntoIterator<Item = &'a Clip>, track_id: TrackId) -> f64 {
    project_duration(clips.into_iter().filter(|clip| clip.track_id == track_id))
}
