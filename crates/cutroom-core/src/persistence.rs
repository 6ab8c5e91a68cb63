use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::{
    engine::Engine,
    model::{Clip, MediaSource, Project, Track},
};

pub const SNAPSHOT_SCHEMA_VERSION: u32 = 1;

/// Serializable form of the project graph. Selection and playback state are
/// session-local and not part of it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectSnapshot {
    pub schema_version: u32,
    pub project: Project,
    pub sources: Vec<MediaSource>,
    pub tracks: Vec<Track>,
    pub clips: Vec<Clip>,
}

#[instrument(skip(snapshot), fields(project_id = %snapshot.project.id, path = %path.display()))]
pub fn save_snapshot(path: &Path, snapshot: &ProjectSnapshot) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory: {}", parent.display()))?;
    }

    let json = serde_json::to_vec_pretty(snapshot).context("failed to serialize project")?;
    let mut temp_file = tempfile::NamedTempFile::new_in(
        path.parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .map_or_else(|| Path::new(".").to_path_buf(), Path::to_path_buf),
    )
    .context("failed to create temp project file")?;

    temp_file
        .write_all(&json)
        .context("failed to write temp project file")?;
    temp_file
        .persist(path)
        .map_err(|error| anyhow::anyhow!(error.error))
        .with_context(|| format!("failed to persist project: {}", path.display()))?;

    info!(clips = snapshot.clips.len(), "project saved");
    Ok(())
}

#[instrument(fields(path = %path.display()))]
pub fn load_snapshot(path: &Path) -> Result<ProjectSnapshot> {
    let content =
        fs::read(path).with_context(|| format!("failed to read project: {}", path.display()))?;
    let snapshot: ProjectSnapshot =
        serde_json::from_slice(&content).context("invalid project json")?;
    info!(project_id = %snapshot.project.id, "project loaded");
    Ok(snapshot)
}

/// Loads a snapshot and rebuilds a validated engine from it.
pub fn load_engine(path: &Path) -> Result<Engine> {
    let snapshot = load_snapshot(path)?;
    Engine::restore(snapshot)
        .with_context(|| format!("project failed validation: {}", path.display()))
}

#[instrument(skip(engine), fields(project_id = %engine.project().id, autosave_dir = %autosave_dir.display()))]
pub fn autosave(engine: &Engine, autosave_dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(autosave_dir).with_context(|| {
        format!(
            "failed to create autosave directory: {}",
            autosave_dir.display()
        )
    })?;

    let file_name = format!("{}.autosave.cutroom.json", engine.project().id);
    let autosave_path = autosave_dir.join(file_name);
    save_snapshot(&autosave_path, &engine.snapshot())?;

    debug!(path = %autosave_path.display(), "autosave complete");
    Ok(autosave_path)
}
