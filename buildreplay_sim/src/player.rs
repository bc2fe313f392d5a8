//! Playback runner: drives an engine from play to the final step.
//!
//! Two modes, selected by [`PlaybackConfig::realtime`] in `play`:
//! - `run`: ticks against a [`VirtualClock`], deterministic and instant
//! - `run_realtime`: ticks on a `tokio::time::interval` at the cadence

use crate::clock::VirtualClock;
use buildreplay_core::{Advance, ReplayEngine};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

/// Playback configuration.
#[derive(Debug, Clone)]
pub struct PlaybackConfig {
    /// Steps per second
    pub cadence: u32,

    /// Stop after this many advances (None = until the final step)
    pub max_steps: Option<usize>,

    /// Wall-clock pacing instead of the virtual clock
    pub realtime: bool,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            cadence: 6,
            max_steps: None,
            realtime: false,
        }
    }
}

/// Summary of one playback run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackResult {
    pub start_step: usize,
    pub final_step: usize,
    pub steps_advanced: usize,
    /// Playback time elapsed (virtual or wall clock)
    pub elapsed: Duration,
    pub reached_end: bool,
}

pub struct PlaybackRunner {
    config: PlaybackConfig,
    clock: VirtualClock,
}

impl PlaybackRunner {
    pub fn new(config: PlaybackConfig) -> Self {
        Self::with_clock(config, VirtualClock::new())
    }

    /// Runner sharing an existing clock.
    pub fn with_clock(config: PlaybackConfig, clock: VirtualClock) -> Self {
        Self { config, clock }
    }

    pub fn clock(&self) -> &VirtualClock {
        &self.clock
    }

    fn start(&self, engine: &mut ReplayEngine) -> Option<usize> {
        if engine.step_count() == 0 {
            info!("No episode loaded, nothing to play");
            return None;
        }
        let cadence = engine.set_cadence(self.config.cadence);
        engine.play();
        info!(
            "Playing from step {} of {} at {} steps/s",
            engine.current_step(),
            engine.step_count(),
            cadence
        );
        Some(engine.current_step())
    }

    /// Handles one tick outcome; returns `Some(reached_end)` once playback stops.
    fn on_tick(
        &self,
        engine: &mut ReplayEngine,
        result: Advance,
        advanced: &mut usize,
    ) -> Option<bool> {
        match result {
            Advance::Moved(step) => {
                *advanced += 1;
                debug!("Advanced to step {}", step);
                if self.config.max_steps.is_some_and(|max| *advanced >= max) {
                    engine.pause();
                    return Some(engine.navigator().is_at_end());
                }
                None
            }
            Advance::ReachedEnd => Some(true),
            Advance::Idle if !engine.is_playing() => Some(engine.navigator().is_at_end()),
            Advance::Idle => None,
        }
    }

    /// Plays with the pacing chosen by `config.realtime`.
    pub async fn play(&self, engine: &mut ReplayEngine) -> PlaybackResult {
        if self.config.realtime {
            self.run_realtime(engine).await
        } else {
            self.run(engine)
        }
    }

    /// Plays on the virtual clock until the engine pauses.
    pub fn run(&self, engine: &mut ReplayEngine) -> PlaybackResult {
        let started_at = self.clock.now();
        let Some(start_step) = self.start(engine) else {
            return self.idle_result(engine);
        };

        let interval = engine.navigator().interval();
        let mut advanced = 0;
        let reached_end = loop {
            let result = engine.tick(self.clock.now());
            if let Some(reached_end) = self.on_tick(engine, result, &mut advanced) {
                break reached_end;
            }
            self.clock.advance(interval);
        };

        self.finish(engine, start_step, advanced, self.clock.now() - started_at, reached_end)
    }

    /// Plays in real time, one tick per cadence interval.
    pub async fn run_realtime(&self, engine: &mut ReplayEngine) -> PlaybackResult {
        let started_at = tokio::time::Instant::now();
        let Some(start_step) = self.start(engine) else {
            return self.idle_result(engine);
        };

        let mut ticker = tokio::time::interval(engine.navigator().interval());
        let mut advanced = 0;
        let reached_end = loop {
            ticker.tick().await;
            let result = engine.tick(started_at.elapsed());
            if let Some(reached_end) = self.on_tick(engine, result, &mut advanced) {
                break reached_end;
            }
        };

        self.finish(engine, start_step, advanced, started_at.elapsed(), reached_end)
    }

    fn idle_result(&self, engine: &ReplayEngine) -> PlaybackResult {
        PlaybackResult {
            start_step: engine.current_step(),
            final_step: engine.current_step(),
            steps_advanced: 0,
            elapsed: Duration::ZERO,
            reached_end: false,
        }
    }

    fn finish(
        &self,
        engine: &ReplayEngine,
        start_step: usize,
        steps_advanced: usize,
        elapsed: Duration,
        reached_end: bool,
    ) -> PlaybackResult {
        info!(
            "Playback stopped at step {} after {} advances ({:.2}s)",
            engine.current_step(),
            steps_advanced,
            elapsed.as_secs_f64()
        );
        PlaybackResult {
            start_step,
            final_step: engine.current_step(),
            steps_advanced,
            elapsed,
            reached_end,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use buildreplay_core::EngineConfig;

    const VALID: &str = "[[(0, 0, 0), (1, 0, 0)], [], [], [], [], [], [], []]";

    fn engine_with_steps(n: usize) -> ReplayEngine {
        let rows: Vec<String> = (0..n)
            .map(|i| format!("[{}, 0, 0, 0, 0, 0, 0, 0]", i % 2))
            .collect();
        let actions = format!("[{}]", rows.join(", "));
        let mut engine = ReplayEngine::new(EngineConfig::default());
        engine.load_episode(&actions, VALID).unwrap();
        engine
    }

    #[test]
    fn test_virtual_run_reaches_end() {
        let mut engine = engine_with_steps(10);
        let runner = PlaybackRunner::new(PlaybackConfig {
            cadence: 10,
            ..Default::default()
        });
        let result = runner.run(&mut engine);

        assert!(result.reached_end);
        assert_eq!(result.final_step, 9);
        assert_eq!(result.steps_advanced, 9);
        // 9 advances plus the end tick, 100ms apart
        assert_eq!(result.elapsed, Duration::from_millis(900));
        assert!(!engine.is_playing());
    }

    #[test]
    fn test_max_steps_pauses_early() {
        let mut engine = engine_with_steps(10);
        engine.seek(2);
        let runner = PlaybackRunner::new(PlaybackConfig {
            max_steps: Some(3),
            ..Default::default()
        });
        let result = runner.run(&mut engine);

        assert!(!result.reached_end);
        assert_eq!(result.start_step, 2);
        assert_eq!(result.final_step, 5);
        assert!(!engine.is_playing());
    }

    #[test]
    fn test_empty_engine_is_idle() {
        let mut engine = ReplayEngine::default();
        let result = PlaybackRunner::new(PlaybackConfig::default()).run(&mut engine);
        assert_eq!(result.steps_advanced, 0);
        assert!(!result.reached_end);
    }

    #[tokio::test(start_paused = true)]
    async fn test_realtime_run_paces_by_cadence() {
        let mut engine = engine_with_steps(5);
        let runner = PlaybackRunner::new(PlaybackConfig {
            cadence: 4,
            realtime: true,
            ..Default::default()
        });
        let result = runner.run_realtime(&mut engine).await;

        assert!(result.reached_end);
        assert_eq!(result.final_step, 4);
        // four 250ms intervals between the first and the end tick
        assert!(result.elapsed >= Duration::from_secs(1));
        assert!(result.elapsed < Duration::from_millis(1250));
    }

    #[tokio::test(start_paused = true)]
    async fn test_play_dispatches_on_realtime_flag() {
        let virtual_runner = PlaybackRunner::new(PlaybackConfig {
            cadence: 2,
            ..Default::default()
        });
        let mut engine = engine_with_steps(3);
        let wall_start = tokio::time::Instant::now();
        let result = virtual_runner.play(&mut engine).await;
        assert!(result.reached_end);
        assert_eq!(wall_start.elapsed(), Duration::ZERO);
        assert_eq!(virtual_runner.clock().now(), Duration::from_secs(1));

        let realtime_runner = PlaybackRunner::new(PlaybackConfig {
            cadence: 2,
            realtime: true,
            ..Default::default()
        });
        let mut engine = engine_with_steps(3);
        let result = realtime_runner.play(&mut engine).await;
        assert!(result.reached_end);
        assert!(wall_start.elapsed() >= Duration::from_secs(1));
        assert_eq!(realtime_runner.clock().now(), Duration::ZERO);
    }
}
