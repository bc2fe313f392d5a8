//! Cell State Aggregator - accumulated work per cell.
//!
//! Owns the mapping from cell coordinate to per-discipline completed-unit
//! counts and lazily recorded requirements. Two ways to move the state:
//! - [`CellStateMap::apply_step`]: one step's decoded events, in place
//! - [`CellStateMap::rebuild_through`]: clear and replay `0..=target`
//!
//! Counts only ever grow along the timeline and a requirement, once recorded
//! for a (cell, discipline) pair, never changes.

use crate::catalog::{ActionMatrix, CellCoord, PlacementCatalog};
use crate::completion::completion_ratio;
use crate::decoder::{decode_step, DecodeAnomaly, PlacementEvent};
use crate::discipline::Discipline;
use crate::telemetry::StepTotals;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Accumulated state of a single cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellState {
    pub coord: CellCoord,

    /// Completed units per discipline that has placed here
    pub counts: BTreeMap<Discipline, u32>,

    /// Requirement per discipline, cached on first placement
    pub requirements: BTreeMap<Discipline, u32>,

    /// Slice filter visibility
    pub visible: bool,
}

impl CellState {
    pub fn new(coord: CellCoord) -> Self {
        Self {
            coord,
            counts: BTreeMap::new(),
            requirements: BTreeMap::new(),
            visible: true,
        }
    }

    /// Completion ratio in `[0, 1]`.
    pub fn completion(&self) -> f64 {
        completion_ratio(&self.counts, &self.requirements)
    }

    /// Units placed here by a discipline.
    pub fn count(&self, discipline: Discipline) -> u32 {
        self.counts.get(&discipline).copied().unwrap_or(0)
    }

    /// Units placed here by all disciplines.
    pub fn total_units(&self) -> u32 {
        self.counts.values().sum()
    }

    /// Discipline share of this cell's work, in discipline order.
    ///
    /// Render sinks use it to layer bands bottom to top.
    pub fn mix(&self) -> Vec<(Discipline, f64)> {
        let total = self.total_units();
        if total == 0 {
            return Vec::new();
        }
        self.counts
            .iter()
            .filter(|(_, n)| **n > 0)
            .map(|(d, n)| (*d, f64::from(*n) / f64::from(total)))
            .collect()
    }
}

impl std::fmt::Display for CellState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} overall {:.1}%", self.coord, self.completion() * 100.0)?;
        for (d, n) in &self.counts {
            match self.requirements.get(d) {
                Some(req) => write!(f, " | {}: {} / {}", d, n, req)?,
                None => write!(f, " | {}: {}", d, n)?,
            }
        }
        Ok(())
    }
}

/// Outcome of applying one step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppliedStep {
    pub step: usize,
    pub totals: StepTotals,
    /// Cells whose counts changed, sorted
    pub touched: Vec<CellCoord>,
    pub anomalies: Vec<DecodeAnomaly>,
}

/// The live per-cell state.
#[derive(Debug, Clone, Default)]
pub struct CellStateMap {
    cells: HashMap<CellCoord, CellState>,
}

impl CellStateMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn get(&self, coord: CellCoord) -> Option<&CellState> {
        self.cells.get(&coord)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CellState> {
        self.cells.values()
    }

    /// Cells ordered by coordinate.
    pub fn sorted(&self) -> Vec<&CellState> {
        let mut cells: Vec<&CellState> = self.cells.values().collect();
        cells.sort_by_key(|c| c.coord);
        cells
    }

    pub fn clear(&mut self) {
        self.cells.clear();
    }

    fn add_work(&mut self, catalog: &PlacementCatalog, event: PlacementEvent) {
        let cell = self
            .cells
            .entry(event.coord)
            .or_insert_with(|| CellState::new(event.coord));
        *cell.counts.entry(event.discipline).or_insert(0) += 1;
        if !cell.requirements.contains_key(&event.discipline) {
            if let Some(req) = catalog.discipline(event.discipline).requirement_at(event.coord) {
                cell.requirements.insert(event.discipline, req);
            }
        }
    }

    /// Decodes `step` and adds one unit per resulting event.
    ///
    /// A step outside the recorded range applies nothing.
    pub fn apply_step(
        &mut self,
        catalog: &PlacementCatalog,
        actions: &ActionMatrix,
        step: usize,
    ) -> AppliedStep {
        let Some(row) = actions.row(step) else {
            return AppliedStep {
                step,
                ..Default::default()
            };
        };

        let decoded = decode_step(catalog, step, row);
        let mut totals = StepTotals::default();
        let mut touched = BTreeSet::new();
        for event in decoded.events {
            self.add_work(catalog, event);
            totals.add(event.discipline);
            touched.insert(event.coord);
        }

        AppliedStep {
            step,
            totals,
            touched: touched.into_iter().collect(),
            anomalies: decoded.anomalies,
        }
    }

    /// Clears all cells and replays steps `0..=target` in order.
    ///
    /// `target` past the end replays everything. The replay is built in a
    /// fresh map and swapped in, so no partial rebuild is ever observable.
    pub fn rebuild_through(
        &mut self,
        catalog: &PlacementCatalog,
        actions: &ActionMatrix,
        target: usize,
    ) -> Vec<AppliedStep> {
        let mut fresh = CellStateMap::new();
        let applied = (0..actions.len().min(target.saturating_add(1)))
            .map(|step| fresh.apply_step(catalog, actions, step))
            .collect();
        *self = fresh;
        applied
    }

    /// State after the whole episode, independent of any live state.
    pub fn compute_final_state(catalog: &PlacementCatalog, actions: &ActionMatrix) -> CellStateMap {
        let mut state = CellStateMap::new();
        for step in 0..actions.len() {
            state.apply_step(catalog, actions, step);
        }
        state
    }

    /// Recomputes visibility of every cell.
    pub fn set_visibility(&mut self, mut predicate: impl FnMut(CellCoord) -> bool) {
        for cell in self.cells.values_mut() {
            cell.visible = predicate(cell.coord);
        }
    }

    /// Recomputes visibility of specific cells.
    pub fn set_visibility_of(
        &mut self,
        coords: &[CellCoord],
        mut predicate: impl FnMut(CellCoord) -> bool,
    ) {
        for coord in coords {
            if let Some(cell) = self.cells.get_mut(coord) {
                cell.visible = predicate(*coord);
            }
        }
    }

    /// Per-cell per-discipline counts, for comparing states.
    pub fn count_table(&self) -> BTreeMap<CellCoord, BTreeMap<Discipline, u32>> {
        self.cells
            .iter()
            .map(|(coord, cell)| (*coord, cell.counts.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ActionRow, RawPlacement};
    use approx::assert_relative_eq;

    /// Equipment catalog with `([2,2,2], 3)` and a bare `[0,0,0]`.
    fn episode(rows: Vec<[i64; 8]>) -> (PlacementCatalog, ActionMatrix) {
        let mut lists = vec![Vec::new(); 8];
        lists[Discipline::Equipment.index()] = vec![
            RawPlacement::WithRequirement(CellCoord::new(2, 2, 2), 3),
            RawPlacement::Bare(CellCoord::ORIGIN),
        ];
        lists[Discipline::Piping.index()] =
            vec![RawPlacement::WithRequirement(CellCoord::new(2, 2, 2), 1)];
        let catalog = PlacementCatalog::from_raw(lists).unwrap();
        let actions = ActionMatrix::from_rows(rows.into_iter().map(ActionRow).collect());
        (catalog, actions)
    }

    // Equipment sentinel is 2, piping sentinel is 1, every other discipline 0.
    const IDLE: [i64; 8] = [0, 0, 1, 2, 0, 0, 0, 0];

    fn equipment(index: i64) -> [i64; 8] {
        let mut row = IDLE;
        row[Discipline::Equipment.index()] = index;
        row
    }

    #[test]
    fn test_apply_step_creates_cell_and_requirement() {
        let (catalog, actions) = episode(vec![equipment(0)]);
        let mut state = CellStateMap::new();
        let applied = state.apply_step(&catalog, &actions, 0);

        assert_eq!(applied.touched, vec![CellCoord::new(2, 2, 2)]);
        assert_eq!(applied.totals.get(Discipline::Equipment), 1);
        let cell = state.get(CellCoord::new(2, 2, 2)).unwrap();
        assert_eq!(cell.count(Discipline::Equipment), 1);
        assert_eq!(cell.requirements.get(&Discipline::Equipment), Some(&3));
        assert!(cell.visible);
    }

    #[test]
    fn test_completion_progression() {
        let (catalog, actions) = episode(vec![equipment(0); 4]);
        let mut state = CellStateMap::new();
        let coord = CellCoord::new(2, 2, 2);

        let expected = [1.0 / 3.0, 2.0 / 3.0, 1.0, 1.0];
        for (step, want) in expected.iter().enumerate() {
            state.apply_step(&catalog, &actions, step);
            assert_relative_eq!(state.get(coord).unwrap().completion(), *want);
        }
        // raw count keeps growing past the requirement
        assert_eq!(state.get(coord).unwrap().count(Discipline::Equipment), 4);
    }

    #[test]
    fn test_untracked_cell_completion_zero() {
        let (catalog, actions) = episode(vec![equipment(1)]);
        let mut state = CellStateMap::new();
        state.apply_step(&catalog, &actions, 0);
        let cell = state.get(CellCoord::ORIGIN).unwrap();
        assert!(cell.requirements.is_empty());
        assert_eq!(cell.completion(), 0.0);
    }

    #[test]
    fn test_rebuild_matches_final_state() {
        let mut last = IDLE;
        last[Discipline::Piping.index()] = 0;
        let (catalog, actions) =
            episode(vec![equipment(0), equipment(1), IDLE, last, equipment(7)]);

        let mut state = CellStateMap::new();
        let applied = state.rebuild_through(&catalog, &actions, actions.len() - 1);
        assert_eq!(applied.len(), 5);
        assert_eq!(applied[4].anomalies.len(), 1);

        let final_state = CellStateMap::compute_final_state(&catalog, &actions);
        assert_eq!(state.count_table(), final_state.count_table());

        let cell = state.get(CellCoord::new(2, 2, 2)).unwrap();
        assert_relative_eq!(cell.completion(), 0.5); // (1 + 1) / (3 + 1)
    }

    #[test]
    fn test_rebuild_clears_previous_state() {
        let (catalog, actions) = episode(vec![equipment(0), equipment(1)]);
        let mut state = CellStateMap::new();
        state.rebuild_through(&catalog, &actions, 1);
        assert_eq!(state.len(), 2);
        state.rebuild_through(&catalog, &actions, 0);
        assert_eq!(state.len(), 1);
        assert!(state.get(CellCoord::ORIGIN).is_none());
    }

    #[test]
    fn test_apply_out_of_range_step() {
        let (catalog, actions) = episode(vec![equipment(0)]);
        let mut state = CellStateMap::new();
        let applied = state.apply_step(&catalog, &actions, 10);
        assert!(applied.touched.is_empty());
        assert!(state.is_empty());
    }

    #[test]
    fn test_mix_and_display() {
        let mut row = equipment(0);
        row[Discipline::Piping.index()] = 0;
        let (catalog, actions) = episode(vec![row, equipment(0), equipment(0)]);
        let state = CellStateMap::compute_final_state(&catalog, &actions);
        let cell = state.get(CellCoord::new(2, 2, 2)).unwrap();

        let mix = cell.mix();
        assert_eq!(mix[0].0, Discipline::Piping);
        assert_relative_eq!(mix[0].1, 0.25);
        assert_relative_eq!(mix[1].1, 0.75);
        assert_eq!(
            cell.to_string(),
            "(2,2,2) overall 100.0% | piping: 1 / 1 | equipment: 3 / 3"
        );
    }
}
