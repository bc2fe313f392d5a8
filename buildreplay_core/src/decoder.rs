//! Action Decoder - turns one recorded step into placement events.
//!
//! Decoding is a pure function of (catalog, step row): no dependency on
//! earlier steps. Per discipline the recorded index is either
//! - the no-op sentinel (catalog length): nothing happens
//! - a valid index in `[0, len)`: one unit placed at that catalog coordinate
//! - anything else: a non-fatal anomaly, reported and skipped

use crate::catalog::{ActionRow, CellCoord, PlacementCatalog};
use crate::discipline::Discipline;
use serde::{Deserialize, Serialize};

/// One unit of work placed by a discipline at a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementEvent {
    pub discipline: Discipline,
    pub coord: CellCoord,
}

/// A recorded index outside its discipline's catalog (sentinel excluded).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DecodeAnomaly {
    pub step: usize,
    pub discipline: Discipline,
    pub index: i64,
}

impl std::fmt::Display for DecodeAnomaly {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Step {}, {}: idx {} OOR", self.step, self.discipline, self.index)
    }
}

/// Events and anomalies decoded from a single step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepDecode {
    pub events: Vec<PlacementEvent>,
    pub anomalies: Vec<DecodeAnomaly>,
}

/// What a single row entry means for its discipline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionSlot {
    NoOp,
    Place { coord: CellCoord },
    Invalid { index: i64 },
}

/// Interprets one discipline's entry of a row.
pub fn decode_slot(catalog: &PlacementCatalog, discipline: Discipline, index: i64) -> ActionSlot {
    let list = catalog.discipline(discipline);
    if index == list.noop_index() as i64 {
        return ActionSlot::NoOp;
    }
    usize::try_from(index)
        .ok()
        .and_then(|i| list.entry(i))
        .map(|entry| ActionSlot::Place { coord: entry.coord })
        .unwrap_or(ActionSlot::Invalid { index })
}

/// Decodes one step. Anomalies never stop the remaining disciplines.
pub fn decode_step(catalog: &PlacementCatalog, step: usize, row: &ActionRow) -> StepDecode {
    let mut out = StepDecode::default();
    for discipline in Discipline::ALL {
        match decode_slot(catalog, discipline, row.get(discipline)) {
            ActionSlot::NoOp => {}
            ActionSlot::Place { coord } => out.events.push(PlacementEvent { discipline, coord }),
            ActionSlot::Invalid { index } => out.anomalies.push(DecodeAnomaly {
                step,
                discipline,
                index,
            }),
        }
    }
    out
}

/// Per-discipline legend for one step, in discipline order.
pub fn describe_row(catalog: &PlacementCatalog, row: &ActionRow) -> Vec<(Discipline, ActionSlot)> {
    Discipline::ALL
        .iter()
        .map(|d| (*d, decode_slot(catalog, *d, row.get(*d))))
        .collect()
}
