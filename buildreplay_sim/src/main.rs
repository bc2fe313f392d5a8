//! BuildReplay CLI
//!
//! Load a recorded (or synthetic) construction episode, navigate it and
//! report or export the resulting cell state.

use buildreplay_core::{EngineConfig, PlacementSeries, ReplayEngine};
use buildreplay_sim::{
    generate, DriverError, PlaybackConfig, PlaybackResult, PlaybackRunner, SnapshotExport,
    SynthConfig, TracingSink,
};
use clap::Parser;
use std::sync::{Arc, Mutex};
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// BuildReplay episode timeline CLI
#[derive(Parser, Debug)]
#[command(name = "buildreplay")]
#[command(about = "Replay a recorded construction episode over its cell grid", long_about = None)]
struct Args {
    /// Recorded actions file (numpy repr or nested list)
    #[arg(short, long)]
    actions: Option<String>,

    /// Valid placements file (nested lists/tuples)
    #[arg(short = 'V', long)]
    valid: Option<String>,

    /// Generate a synthetic episode from this seed instead of reading files
    #[arg(long)]
    synthetic: Option<u64>,

    /// Steps in a synthetic episode
    #[arg(long, default_value = "120")]
    steps: usize,

    /// Playback cadence in steps per second (1-60)
    #[arg(short, long, default_value = "6")]
    fps: u32,

    /// Slice filter expression over x, y, z (e.g. "z <= 3 && x > 2")
    #[arg(short, long)]
    slice: Option<String>,

    /// Step to seek to before playback
    #[arg(short, long)]
    goto: Option<i64>,

    /// Play from the current step to the end
    #[arg(short, long)]
    play: bool,

    /// Pace playback on the wall clock instead of a virtual clock
    #[arg(long)]
    realtime: bool,

    /// Export a JSON snapshot to this path
    #[arg(long)]
    export: Option<String>,

    /// JSON output for scripting
    #[arg(long)]
    json: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn read(path: &str) -> Result<String, DriverError> {
    std::fs::read_to_string(path).map_err(|e| DriverError::read(path, e))
}

fn episode_text(args: &Args) -> Result<(String, String), DriverError> {
    if let Some(seed) = args.synthetic {
        info!("Generating synthetic episode (seed={}, steps={})", seed, args.steps);
        let episode = generate(&SynthConfig {
            seed,
            steps: args.steps,
            ..Default::default()
        });
        return Ok((episode.actions_text, episode.valid_text));
    }
    match (&args.actions, &args.valid) {
        (Some(actions), Some(valid)) => Ok((read(actions)?, read(valid)?)),
        _ => Err(DriverError::NoInput),
    }
}

fn play(args: &Args, engine: &mut ReplayEngine) -> Result<PlaybackResult, DriverError> {
    let runner = PlaybackRunner::new(PlaybackConfig {
        cadence: args.fps,
        max_steps: None,
        realtime: args.realtime,
    });
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;
    Ok(runtime.block_on(runner.play(engine)))
}

fn run(args: &Args) -> Result<(), DriverError> {
    let (actions_text, valid_text) = episode_text(args)?;

    let series = Arc::new(Mutex::new(PlacementSeries::new()));
    let mut engine = ReplayEngine::new(EngineConfig {
        cadence_steps_per_sec: args.fps,
        ..Default::default()
    });
    engine.add_render_sink(Box::new(TracingSink::new()));
    engine.add_telemetry_sink(Box::new(TracingSink::new()));
    engine.add_telemetry_sink(Box::new(series.clone()));

    let report = engine.load_episode(&actions_text, &valid_text)?;

    if let Some(expression) = &args.slice {
        engine.set_slice_filter(expression)?;
    }
    if let Some(step) = args.goto {
        engine.seek(step);
    }

    let playback = if args.play { Some(play(args, &mut engine)?) } else { None };

    let state = engine.state();
    let series = series.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

    if args.json {
        let summary = serde_json::json!({
            "episode_id": report.episode_id,
            "step_count": state.step_count,
            "current_step": state.current_step,
            "cells": state.cells.len(),
            "visible_cells": state.cells.iter().filter(|c| c.visible).count(),
            "anomalies": state.anomalies.iter().map(ToString::to_string).collect::<Vec<_>>(),
            "placements": series.grand_total(),
            "playback": playback,
        });
        match serde_json::to_string_pretty(&summary) {
            Ok(text) => println!("{}", text),
            Err(e) => error!("Failed to serialize summary: {}", e),
        }
    } else {
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        info!("Step {} / {}", state.current_step, state.step_count.saturating_sub(1));
        if let Some(legend) = engine.step_legend(state.current_step) {
            for (discipline, slot) in legend {
                info!("  {:<18} {:?}", discipline.name(), slot);
            }
        }
        let visible: Vec<_> = engine
            .cells()
            .sorted()
            .into_iter()
            .filter(|c| c.visible)
            .collect();
        info!("{} cells ({} visible)", engine.cells().len(), visible.len());
        for cell in visible {
            info!("  {}", cell);
        }
        if !state.anomalies.is_empty() {
            warn!("{} out-of-range actions so far", state.anomalies.len());
        }
    }

    if let Some(path) = &args.export {
        let export = SnapshotExport::capture(&engine, &series);
        export.write_to_file(path)?;
        info!("Exported snapshot to {}", path);
    }

    Ok(())
}

fn main() {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    if !args.json {
        info!("BuildReplay v0.1.0");
    }

    if let Err(e) = run(&args) {
        error!("{}", e);
        std::process::exit(1);
    }
}
