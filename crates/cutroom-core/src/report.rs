use std::{fs, path::Path};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::instrument;

use crate::{engine::Engine, selectors::export_timeline};

const REPORT_SCHEMA_VERSION: u32 = 1;

/// Fingerprint of a timeline. Timestamps are excluded from the hashes, so a
/// deterministic build of the same edit always reports the same values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimelineReport {
    pub schema_version: u32,
    pub project_id: String,
    pub track_count: usize,
    pub clip_count: usize,
    pub effect_count: usize,
    pub duration: f64,
    pub graph_hash: String,
    pub export_hash: String,
}

#[instrument(skip(engine), fields(project_id = %engine.project().id))]
pub fn generate_timeline_report(engine: &Engine) -> Result<TimelineReport> {
    let mut snapshot = engine.snapshot();
    snapshot.project.created_at = DateTime::<Utc>::UNIX_EPOCH;
    snapshot.project.updated_at = DateTime::<Utc>::UNIX_EPOCH;
    let graph_bytes = serde_json::to_vec(&snapshot).context("failed to serialize project graph")?;
    let export_bytes = serde_json::to_vec(&export_timeline(engine))
        .context("failed to serialize export timeline")?;

    Ok(TimelineReport {
        schema_version: REPORT_SCHEMA_VERSION,
        project_id: engine.project().id.to_string(),
        track_count: snapshot.tracks.len(),
        clip_count: snapshot.clips.len(),
        effect_count: snapshot.clips.iter().map(|clip| clip.effects.len()).sum(),
        duration: engine.project().duration(),
        graph_hash: hash_hex(&graph_bytes),
        export_hash: hash_hex(&export_bytes),
    })
}

pub fn read_timeline_report(path: &Path) -> Result<TimelineReport> {
    let bytes = fs::read(path)
        .with_context(|| format!("failed to read timeline report: {}", path.display()))?;
    let report: TimelineReport =
        serde_json::from_slice(&bytes).context("failed to parse timeline report json")?;
    Ok(report)
}

pub fn write_timeline_report(path: &Path, report: &TimelineReport) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create report directory: {}", parent.display()))?;
    }

    let json =
        serde_json::to_vec_pretty(report).context("failed to encode timeline report json")?;
    fs::write(path, json)
        .with_context(|| format!("failed to write timeline report: {}", path.display()))?;
    Ok(())
}

fn hash_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    format!("{digest:x}")
}
