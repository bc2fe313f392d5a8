//! BuildReplay Playback Driver
//!
//! Headless harness around the replay engine:
//! - **Synthetic episodes**: seeded generator emitting recorder-format text
//! - **Playback**: virtual-clock or real-time cadence ticks until the end
//! - **Export**: JSON snapshot of live state, final state and telemetry
//!
//! # Usage
//!
//! ```ignore
//! use buildreplay_sim::{generate, PlaybackRunner, PlaybackConfig, SynthConfig};
//! use buildreplay_core::ReplayEngine;
//!
//! let episode = generate(&SynthConfig { seed: 7, ..Default::default() });
//! let mut engine = ReplayEngine::default();
//! engine.load_episode(&episode.actions_text, &episode.valid_text)?;
//! let result = PlaybackRunner::new(PlaybackConfig::default()).run(&mut engine);
//! ```

mod clock;
mod error;
mod exporter;
mod player;
mod sinks;
mod synth;

pub use clock::VirtualClock;
pub use error::DriverError;
pub use exporter::{DisciplineSeries, SnapshotExport};
pub use player::{PlaybackConfig, PlaybackResult, PlaybackRunner};
pub use sinks::TracingSink;
pub use synth::{generate, SynthConfig, SyntheticEpisode};
