use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use chrono::Utc;
use tracing::{Span, info, info_span, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use crate::{config::DiagnosticsConfig, model::Project};

const FALLBACK_FILTER: &str = "info,cutroom_core=debug";

/// Keeps the file writer alive; drop it last to flush buffered log lines.
pub struct TelemetryGuard {
    pub session_id: Uuid,
    pub log_file: PathBuf,
    _file_guard: WorkerGuard,
}

impl TelemetryGuard {
    /// Span tying every engine event of this process to the project being
    /// edited. Enter it once the project is loaded.
    #[must_use]
    pub fn editing_span(&self, project: &Project) -> Span {
        info_span!(
            "editing_session",
            session_id = %self.session_id,
            project_id = %project.id,
            project_name = %project.name,
            aspect_ratio = ?project.aspect_ratio,
            frame_rate = project.frame_rate,
        )
    }
}

/// Installs the global subscriber: env filter, optional compact stdout, and
/// a JSON log file per session under `log_dir`. `RUST_LOG` wins over the
/// configured filter; an unparsable filter falls back to the built-in one.
pub fn init_tracing(
    log_dir: impl AsRef<Path>,
    config: &DiagnosticsConfig,
) -> anyhow::Result<TelemetryGuard> {
    let log_dir = log_dir.as_ref();
    fs::create_dir_all(log_dir)
        .with_context(|| format!("failed to create log directory: {}", log_dir.display()))?;

    let session_id = Uuid::new_v4();
    let file_name = log_file_name(
        &config.trace_file_prefix,
        &Utc::now().format("%Y%m%d-%H%M%S").to_string(),
        session_id,
    );
    let log_file = log_dir.join(&file_name);
    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (file_writer, file_guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.rust_log_filter))
        .unwrap_or_else(|_| EnvFilter::new(FALLBACK_FILTER));

    let stdout_layer = config.stdout.then(|| {
        tracing_subscriber::fmt::layer()
            .compact()
            .with_thread_ids(true)
            .with_target(true)
    });

    let file_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(file_writer);

    if let Err(error) = tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
    {
        warn!(?error, "global tracing subscriber already initialized");
    } else {
        info!(%session_id, log_file = %log_file.display(), "tracing initialized");
    }

    Ok(TelemetryGuard {
        session_id,
        log_file,
        _file_guard: file_guard,
    })
}

/// `<prefix>-<timestamp>-<first 8 hex digits of the session>.log`, so
/// sessions started in the same second still get their own file.
fn log_file_name(prefix: &str, timestamp: &str, session_id: Uuid) -> String {
    let simple = session_id.simple().to_string();
    let short = simple.get(..8).unwrap_or(&simple);
    format!("{prefix}-{timestamp}-{short}.log")
}
