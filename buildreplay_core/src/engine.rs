//! Replay Engine - the navigation surface over one loaded episode.
//!
//! An engine instance owns everything: catalog, action rows, cell state,
//! navigator, slice filter and its sinks. There are no process-wide caches,
//! so independent engines can coexist.
//!
//! # Seek strategy
//!
//! - Moving exactly one step forward applies that single step in place
//! - Any other move rebuilds from step 0 (cost O(step_count x 8) decodes)
//!
//! Both paths produce identical counts; rebuild trades recomputation for
//! simplicity and is never partially visible.
//!
//! # Usage
//!
//! ```ignore
//! use buildreplay_core::{ReplayEngine, EngineConfig};
//!
//! let mut engine = ReplayEngine::new(EngineConfig::default());
//! engine.load_episode(&actions_text, &valid_text)?;
//! engine.seek(40);
//! engine.set_slice_filter("z <= 3")?;
//! let state = engine.state();
//! ```

use crate::aggregator::{AppliedStep, CellStateMap};
use crate::catalog::{ActionMatrix, CellCoord, PlacementCatalog};
use crate::decoder::{describe_row, ActionSlot, DecodeAnomaly};
use crate::discipline::Discipline;
use crate::error::{EpisodeError, SliceError};
use crate::navigator::{Advance, Navigator};
use crate::sink::{CellUpdate, RenderSink};
use crate::slice::SliceFilter;
use crate::telemetry::TelemetrySink;
use crate::text::{parse_actions_text, parse_catalog_text};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Configuration for a replay engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Initial playback cadence in steps per second (clamped to [1, 60])
    pub cadence_steps_per_sec: u32,

    /// Emit a warning log line per decode anomaly
    pub log_anomalies: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cadence_steps_per_sec: 6,
            log_anomalies: true,
        }
    }
}

/// A loaded episode.
#[derive(Debug, Clone)]
pub struct Episode {
    pub id: Uuid,
    pub catalog: PlacementCatalog,
    pub actions: ActionMatrix,
}

/// Summary returned by a successful load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadReport {
    pub episode_id: Uuid,
    pub step_count: usize,
    pub catalog_entries: usize,
}

/// Snapshot returned by [`ReplayEngine::state`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineState {
    pub current_step: usize,
    pub step_count: usize,
    pub playing: bool,
    /// Cells ordered by coordinate
    pub cells: Vec<CellUpdate>,
    /// Decode anomalies met while reaching the current step
    pub anomalies: Vec<DecodeAnomaly>,
}

/// The whole episode replayed, independent of the navigator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalState {
    pub episode_id: Uuid,
    pub step_count: usize,
    pub cells: Vec<CellUpdate>,
}

fn visibility(slice: &Option<SliceFilter>) -> impl Fn(CellCoord) -> bool + '_ {
    move |coord| slice.as_ref().map_or(true, |f| f.matches(coord))
}

/// Timeline engine over one episode at a time.
pub struct ReplayEngine {
    config: EngineConfig,
    episode: Option<Episode>,
    cells: CellStateMap,
    navigator: Navigator,
    slice: Option<SliceFilter>,
    /// Last step applied to `cells`
    applied_through: Option<usize>,
    anomalies: Vec<DecodeAnomaly>,
    render_sinks: Vec<Box<dyn RenderSink>>,
    telemetry_sinks: Vec<Box<dyn TelemetrySink>>,
}

impl ReplayEngine {
    /// Creates an engine with no episode loaded.
    pub fn new(config: EngineConfig) -> Self {
        let navigator = Navigator::new(0, config.cadence_steps_per_sec);
        Self {
            config,
            episode: None,
            cells: CellStateMap::new(),
            navigator,
            slice: None,
            applied_through: None,
            anomalies: Vec::new(),
            render_sinks: Vec::new(),
            telemetry_sinks: Vec::new(),
        }
    }

    pub fn add_render_sink(&mut self, sink: Box<dyn RenderSink>) {
        self.render_sinks.push(sink);
    }

    pub fn add_telemetry_sink(&mut self, sink: Box<dyn TelemetrySink>) {
        self.telemetry_sinks.push(sink);
    }

    // ------------------------------------------------------------------
    // Loading
    // ------------------------------------------------------------------

    /// Parses both texts and, only if both succeed, replaces the episode.
    ///
    /// On error the previously loaded episode stays fully intact.
    pub fn load_episode(
        &mut self,
        actions_text: &str,
        catalog_text: &str,
    ) -> Result<LoadReport, EpisodeError> {
        let actions = parse_actions_text(actions_text).map_err(|e| {
            warn!("Actions parse error: {}", e);
            e
        })?;
        let catalog = parse_catalog_text(catalog_text).map_err(|e| {
            warn!("Valid parse error: {}", e);
            e
        })?;
        Ok(self.install(catalog, actions))
    }

    /// Same as [`Self::load_episode`] for already-structured JSON input.
    pub fn load_episode_json(
        &mut self,
        actions: &Value,
        catalog: &Value,
    ) -> Result<LoadReport, EpisodeError> {
        let actions = ActionMatrix::from_value(actions)?;
        let catalog = PlacementCatalog::from_value(catalog)?;
        Ok(self.install(catalog, actions))
    }

    /// Installs a validated episode, discarding all prior state.
    pub fn install(&mut self, catalog: PlacementCatalog, actions: ActionMatrix) -> LoadReport {
        let episode = Episode {
            id: Uuid::new_v4(),
            catalog,
            actions,
        };
        let report = LoadReport {
            episode_id: episode.id,
            step_count: episode.actions.len(),
            catalog_entries: episode.catalog.total_entries(),
        };

        self.navigator = Navigator::new(report.step_count, self.navigator.cadence());
        self.episode = Some(episode);
        self.cells.clear();
        self.applied_through = None;
        self.anomalies.clear();
        for sink in &mut self.telemetry_sinks {
            sink.reset();
        }

        info!(
            "Episode ready: {} steps, {} catalog entries (id={})",
            report.step_count, report.catalog_entries, report.episode_id
        );

        if report.step_count > 0 {
            self.show_step(0);
        } else {
            self.reset_render_sinks();
        }
        report
    }

    pub fn episode(&self) -> Option<&Episode> {
        self.episode.as_ref()
    }

    // ------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------

    /// Jumps to a step, clamped to the episode. No-op without steps.
    pub fn seek(&mut self, step: i64) -> Option<usize> {
        let target = self.navigator.seek(step)?;
        self.show_step(target);
        Some(target)
    }

    pub fn play(&mut self) {
        self.navigator.play();
    }

    pub fn pause(&mut self) {
        self.navigator.pause();
    }

    pub fn toggle_play(&mut self) {
        self.navigator.toggle();
    }

    pub fn is_playing(&self) -> bool {
        self.navigator.is_playing()
    }

    /// Sets playback cadence; returns the clamped value.
    pub fn set_cadence(&mut self, steps_per_sec: u32) -> u32 {
        self.navigator.set_cadence(steps_per_sec)
    }

    pub fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    /// Unconditional playback tick.
    pub fn advance(&mut self) -> Advance {
        let result = self.navigator.advance();
        self.after_advance(result)
    }

    /// Cadence-driven playback tick; `now` is a monotonic clock reading.
    pub fn tick(&mut self, now: Duration) -> Advance {
        let result = self.navigator.advance_if_due(now);
        self.after_advance(result)
    }

    fn after_advance(&mut self, result: Advance) -> Advance {
        match result {
            Advance::Moved(step) => self.show_step(step),
            Advance::ReachedEnd => {
                info!("Reached final step {}, pausing", self.navigator.current())
            }
            Advance::Idle => {}
        }
        result
    }

    /// Brings the cell state to `target`, incrementally when possible.
    fn show_step(&mut self, target: usize) {
        let Some(episode) = self.episode.as_ref() else {
            return;
        };

        match self.applied_through {
            Some(at) if at == target => {}
            Some(at) if at + 1 == target => {
                let applied = self.cells.apply_step(&episode.catalog, &episode.actions, target);
                self.cells.set_visibility_of(&applied.touched, visibility(&self.slice));
                self.applied_through = Some(target);
                self.publish_step(&applied);
                for coord in &applied.touched {
                    if let Some(cell) = self.cells.get(*coord) {
                        let update = CellUpdate::from(cell);
                        for sink in &mut self.render_sinks {
                            sink.update_cell(&update);
                        }
                    }
                }
                self.anomalies.extend(applied.anomalies);
            }
            _ => {
                debug!("Rebuilding through step {}", target);
                let applied = self
                    .cells
                    .rebuild_through(&episode.catalog, &episode.actions, target);
                self.cells.set_visibility(visibility(&self.slice));
                self.applied_through = Some(target);
                self.anomalies.clear();
                for step in &applied {
                    self.publish_step(step);
                }
                self.anomalies.extend(applied.into_iter().flat_map(|s| s.anomalies));
                self.reset_render_sinks();
            }
        }
    }

    fn publish_step(&mut self, applied: &AppliedStep) {
        if self.config.log_anomalies {
            for anomaly in &applied.anomalies {
                warn!("{}", anomaly);
            }
        }
        for sink in &mut self.telemetry_sinks {
            sink.record_step(applied.step, &applied.totals);
        }
    }

    /// Resets render sinks and streams every current cell.
    fn reset_render_sinks(&mut self) {
        let id = self.episode.as_ref().map(|e| e.id).unwrap_or_else(Uuid::nil);
        let updates = self.cell_updates();
        for sink in &mut self.render_sinks {
            sink.reset(id);
            for update in &updates {
                sink.update_cell(update);
            }
        }
    }

    // ------------------------------------------------------------------
    // Slice filter
    // ------------------------------------------------------------------

    /// Compiles and installs a slice filter. An empty expression clears it.
    ///
    /// A rejected expression leaves the current filter in effect.
    pub fn set_slice_filter(&mut self, expression: &str) -> Result<(), SliceError> {
        match SliceFilter::compile(expression) {
            Ok(filter) => {
                match &filter {
                    Some(f) => info!("Slice filter set: {}", f.expression()),
                    None => info!("Slice filter cleared"),
                }
                self.slice = filter;
                self.refresh_visibility();
                Ok(())
            }
            Err(e) => {
                warn!("Slice filter rejected: {}", e);
                Err(e)
            }
        }
    }

    pub fn clear_slice_filter(&mut self) {
        self.slice = None;
        self.refresh_visibility();
    }

    pub fn slice_expression(&self) -> Option<&str> {
        self.slice.as_ref().map(SliceFilter::expression)
    }

    fn cell_updates(&self) -> Vec<CellUpdate> {
        self.cells
            .sorted()
            .into_iter()
            .map(CellUpdate::from)
            .collect()
    }

    fn refresh_visibility(&mut self) {
        self.cells.set_visibility(visibility(&self.slice));
        let updates = self.cell_updates();
        for sink in &mut self.render_sinks {
            for update in &updates {
                sink.update_cell(update);
            }
        }
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn current_step(&self) -> usize {
        self.navigator.current()
    }

    pub fn step_count(&self) -> usize {
        self.navigator.step_count()
    }

    pub fn cells(&self) -> &CellStateMap {
        &self.cells
    }

    /// Anomalies met while reaching the current step.
    pub fn anomalies(&self) -> &[DecodeAnomaly] {
        &self.anomalies
    }

    /// Current navigable state.
    pub fn state(&self) -> EngineState {
        EngineState {
            current_step: self.navigator.current(),
            step_count: self.navigator.step_count(),
            playing: self.navigator.is_playing(),
            cells: self.cells.sorted().into_iter().map(CellUpdate::from).collect(),
            anomalies: self.anomalies.clone(),
        }
    }

    /// Final state of the whole episode; the live state is untouched.
    ///
    /// Visibility follows the current slice filter.
    pub fn final_state(&self) -> Option<FinalState> {
        let episode = self.episode.as_ref()?;
        let mut cells = CellStateMap::compute_final_state(&episode.catalog, &episode.actions);
        cells.set_visibility(visibility(&self.slice));
        Some(FinalState {
            episode_id: episode.id,
            step_count: episode.actions.len(),
            cells: cells.sorted().into_iter().map(CellUpdate::from).collect(),
        })
    }

    /// What each discipline does at a step (clamped to the episode).
    pub fn step_legend(&self, step: usize) -> Option<Vec<(Discipline, ActionSlot)>> {
        let episode = self.episode.as_ref()?;
        let last = episode.actions.len().checked_sub(1)?;
        let row = episode.actions.row(step.min(last))?;
        Some(describe_row(&episode.catalog, row))
    }
}

impl Default for ReplayEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}
