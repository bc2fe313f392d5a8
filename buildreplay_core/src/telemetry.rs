//! Per-step placement totals and the cumulative placement series.
//!
//! Telemetry is purely additive: sinks receive each applied step's
//! per-discipline totals and never feed back into the engine.

use crate::discipline::Discipline;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};

/// Units placed per discipline during one step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepTotals(BTreeMap<Discipline, u32>);

impl StepTotals {
    pub fn add(&mut self, discipline: Discipline) {
        *self.0.entry(discipline).or_insert(0) += 1;
    }

    /// Units placed by a discipline (0 when absent).
    pub fn get(&self, discipline: Discipline) -> u32 {
        self.0.get(&discipline).copied().unwrap_or(0)
    }

    /// Units placed by all disciplines.
    pub fn total(&self) -> u32 {
        self.0.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Discipline, u32)> + '_ {
        self.0.iter().map(|(d, n)| (*d, *n))
    }
}

/// Receives per-step totals as steps are applied.
pub trait TelemetrySink: Send {
    /// Called every time a step is applied, including during rebuilds.
    fn record_step(&mut self, step: usize, totals: &StepTotals);

    /// Called when a new episode replaces the old one.
    fn reset(&mut self);
}

/// Shared handle, so a caller can read the sink while the engine owns it.
impl<S: TelemetrySink> TelemetrySink for Arc<Mutex<S>> {
    fn record_step(&mut self, step: usize, totals: &StepTotals) {
        if let Ok(mut sink) = self.lock() {
            sink.record_step(step, totals);
        }
    }

    fn reset(&mut self) {
        if let Ok(mut sink) = self.lock() {
            sink.reset();
        }
    }
}

/// A point of a cumulative series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub step: usize,
    pub cumulative: u64,
}

/// Cumulative placements per discipline over the timeline.
///
/// Steps are de-duplicated: rebuilding through steps already recorded never
/// double counts. Every discipline gets a point for every recorded step so
/// lines stay flat while a discipline is idle.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlacementSeries {
    totals: BTreeMap<Discipline, u64>,
    points: BTreeMap<Discipline, Vec<SeriesPoint>>,
    #[serde(skip)]
    seen: HashSet<usize>,
    max_cumulative: u64,
}

impl PlacementSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Running total for a discipline.
    pub fn total(&self, discipline: Discipline) -> u64 {
        self.totals.get(&discipline).copied().unwrap_or(0)
    }

    /// Recorded points for a discipline.
    pub fn points(&self, discipline: Discipline) -> &[SeriesPoint] {
        self.points.get(&discipline).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Placements recorded across all disciplines.
    pub fn grand_total(&self) -> u64 {
        self.totals.values().sum()
    }

    /// Largest cumulative value across disciplines (chart y-range).
    pub fn max_cumulative(&self) -> u64 {
        self.max_cumulative
    }

    /// Number of distinct steps recorded.
    pub fn steps_recorded(&self) -> usize {
        self.seen.len()
    }
}

impl TelemetrySink for PlacementSeries {
    fn record_step(&mut self, step: usize, totals: &StepTotals) {
        if !self.seen.insert(step) {
            return;
        }
        for discipline in Discipline::ALL {
            let total = self.totals.entry(discipline).or_insert(0);
            *total += u64::from(totals.get(discipline));
            let cumulative = *total;
            self.points
                .entry(discipline)
                .or_default()
                .push(SeriesPoint { step, cumulative });
            self.max_cumulative = self.max_cumulative.max(cumulative);
        }
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}
