use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use cutroom_core::{
    Engine, EngineConfig,
    diagnostics::init_tracing,
    fixtures::demo_engine,
    generate_timeline_report,
    persistence::{autosave, load_engine, save_snapshot},
    report::{read_timeline_report, write_timeline_report},
};

#[derive(Debug, Parser)]
#[command(name = "cutroom-cli")]
#[command(about = "Headless tools for Cutroom timeline snapshots and reports")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long)]
    log_dir: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Write the demo edit as a project snapshot.
    DemoSnapshot {
        #[arg(long, default_value = "data/demo.cutroom.json")]
        output: PathBuf,
    },
    /// Fingerprint a snapshot, or the demo edit when no input is given.
    Report {
        #[arg(long)]
        input: Option<PathBuf>,

        #[arg(long, default_value = "data/reports/timeline.json")]
        output: PathBuf,
    },
    /// Compare a snapshot's fingerprint against a previously written report.
    Verify {
        #[arg(long)]
        input: Option<PathBuf>,

        #[arg(long)]
        expected: PathBuf,
    },
    /// Write an autosave copy into the configured autosave directory.
    Autosave {
        #[arg(long)]
        input: Option<PathBuf>,

        #[arg(long)]
        dir: Option<PathBuf>,
    },
}

fn load_or_demo(input: Option<&Path>) -> anyhow::Result<Engine> {
    match input {
        Some(path) => load_engine(path),
        None => demo_engine().context("failed to build demo edit"),
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = EngineConfig::load_or_default()?;
    let log_dir = cli
        .log_dir
        .clone()
        .unwrap_or_else(|| config.paths.logs_dir.clone());
    let telemetry = init_tracing(&log_dir, &config.diagnostics)?;

    match cli.command {
        Commands::DemoSnapshot { output } => {
            let engine = load_or_demo(None)?;
            let _session = telemetry.editing_span(engine.project()).entered();
            save_snapshot(&output, &engine.snapshot())?;
            tracing::info!(path = %output.display(), "demo snapshot written");
        }
        Commands::Report { input, output } => {
            let engine = load_or_demo(input.as_deref())?;
            let _session = telemetry.editing_span(engine.project()).entered();
            let report = generate_timeline_report(&engine)?;
            write_timeline_report(&output, &report)?;
            tracing::info!(
                path = %output.display(),
                clips = report.clip_count,
                duration = report.duration,
                "timeline report generated"
            );
        }
        Commands::Verify { input, expected } => {
            let engine = load_or_demo(input.as_deref())?;
            let _session = telemetry.editing_span(engine.project()).entered();
            let expected_report = read_timeline_report(&expected)?;
            let actual = generate_timeline_report(&engine)?;
            if actual.graph_hash != expected_report.graph_hash
                || actual.export_hash != expected_report.export_hash
            {
                tracing::warn!(
                    expected_graph = %expected_report.graph_hash,
                    actual_graph = %actual.graph_hash,
                    "timeline fingerprint mismatch"
                );
                bail!(
                    "timeline does not match report {}",
                    expected.display()
                );
            }
            tracing::info!(path = %expected.display(), "timeline matches report");
        }
        Commands::Autosave { input, dir } => {
            let engine = load_or_demo(input.as_deref())?;
            let _session = telemetry.editing_span(engine.project()).entered();
            let autosave_dir = dir.unwrap_or_else(|| config.paths.autosave_dir.clone());
            let path = autosave(&engine, &autosave_dir)?;
            tracing::info!(path = %path.display(), "autosave written");
        }
    }

    Ok(())
}
