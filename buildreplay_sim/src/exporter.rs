//! JSON exporter for replay snapshots.
//!
//! Captures the live state, the final state and the cumulative placement
//! series of one episode, for external viewers and charting.

use buildreplay_core::{CellUpdate, Discipline, PlacementSeries, ReplayEngine};
use buildreplay_core::telemetry::SeriesPoint;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use uuid::Uuid;

/// Cumulative placements of one discipline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisciplineSeries {
    pub color: String,
    pub total: u64,
    pub points: Vec<SeriesPoint>,
}

/// Complete snapshot export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotExport {
    pub episode_id: Option<Uuid>,

    pub step_count: usize,

    /// Step shown when the export was taken
    pub current_step: usize,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub slice: Option<String>,

    /// Live cells at `current_step`
    pub cells: Vec<CellUpdate>,

    /// Cells after the whole episode
    pub final_cells: Vec<CellUpdate>,

    /// Cumulative placements per discipline
    pub series: BTreeMap<Discipline, DisciplineSeries>,

    /// Decode anomalies up to `current_step`
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub anomalies: Vec<String>,
}

impl SnapshotExport {
    /// Captures the engine's current and final state.
    pub fn capture(engine: &ReplayEngine, series: &PlacementSeries) -> Self {
        let state = engine.state();
        let final_state = engine.final_state();
        Self {
            episode_id: final_state.as_ref().map(|f| f.episode_id),
            step_count: state.step_count,
            current_step: state.current_step,
            slice: engine.slice_expression().map(str::to_string),
            cells: state.cells,
            final_cells: final_state.map(|f| f.cells).unwrap_or_default(),
            series: Discipline::ALL
                .iter()
                .map(|d| {
                    let entry = DisciplineSeries {
                        color: d.color().to_string(),
                        total: series.total(*d),
                        points: series.points(*d).to_vec(),
                    };
                    (*d, entry)
                })
                .collect(),
            anomalies: state.anomalies.iter().map(ToString::to_string).collect(),
        }
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: &str) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}
