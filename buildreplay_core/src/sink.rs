//! Render sink seam.
//!
//! The engine streams per-cell updates to any number of render sinks and
//! never assumes a rendering technology. Axis remapping, colours, meshes and
//! images all live on the sink side.

use crate::aggregator::CellState;
use crate::catalog::CellCoord;
use crate::discipline::Discipline;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// One cell as a render sink should draw it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellUpdate {
    pub coord: CellCoord,

    /// Counts in discipline order (layering order)
    pub counts: BTreeMap<Discipline, u32>,

    pub requirements: BTreeMap<Discipline, u32>,

    /// Completion ratio in `[0, 1]`
    pub completion: f64,

    pub visible: bool,
}

impl From<&CellState> for CellUpdate {
    fn from(cell: &CellState) -> Self {
        Self {
            coord: cell.coord,
            counts: cell.counts.clone(),
            requirements: cell.requirements.clone(),
            completion: cell.completion(),
            visible: cell.visible,
        }
    }
}

/// Consumer of per-cell render updates.
pub trait RenderSink: Send {
    /// All previously drawn cells are gone (new episode or full rebuild).
    fn reset(&mut self, episode_id: Uuid);

    /// A cell was created, changed counts, or changed visibility.
    fn update_cell(&mut self, update: &CellUpdate);
}

impl<S: RenderSink> RenderSink for Arc<Mutex<S>> {
    fn reset(&mut self, episode_id: Uuid) {
        if let Ok(mut sink) = self.lock() {
            sink.reset(episode_id);
        }
    }

    fn update_cell(&mut self, update: &CellUpdate) {
        if let Ok(mut sink) = self.lock() {
            sink.update_cell(update);
        }
    }
}

/// In-memory render sink mirroring the latest update per cell.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    pub episode_id: Option<Uuid>,
    pub cells: HashMap<CellCoord, CellUpdate>,
    pub resets: usize,
    pub updates: usize,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Coordinates currently marked visible, sorted.
    pub fn visible(&self) -> Vec<CellCoord> {
        let mut coords: Vec<CellCoord> = self
            .cells
            .values()
            .filter(|c| c.visible)
            .map(|c| c.coord)
            .collect();
        coords.sort();
        coords
    }
}

impl RenderSink for RecordingSink {
    fn reset(&mut self, episode_id: Uuid) {
        self.episode_id = Some(episode_id);
        self.cells.clear();
        self.resets += 1;
    }

    fn update_cell(&mut self, update: &CellUpdate) {
        self.cells.insert(update.coord, update.clone());
        self.updates += 1;
    }
}
