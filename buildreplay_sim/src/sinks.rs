//! Log-backed sinks for headless runs.

use buildreplay_core::{CellUpdate, RenderSink, StepTotals, TelemetrySink};
use tracing::debug;
use uuid::Uuid;

/// Render sink that logs every cell update at debug level.
#[derive(Debug, Default)]
pub struct TracingSink {
    updates: usize,
}

impl TracingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Updates logged since the last reset.
    pub fn updates(&self) -> usize {
        self.updates
    }
}

impl RenderSink for TracingSink {
    fn reset(&mut self, episode_id: Uuid) {
        debug!("render reset (episode {})", episode_id);
        self.updates = 0;
    }

    fn update_cell(&mut self, update: &CellUpdate) {
        self.updates += 1;
        debug!(
            "cell {} completion {:.1}% units {}{}",
            update.coord,
            update.completion * 100.0,
            update.counts.values().sum::<u32>(),
            if update.visible { "" } else { " (sliced)" }
        );
    }
}

impl TelemetrySink for TracingSink {
    fn record_step(&mut self, step: usize, totals: &StepTotals) {
        if !totals.is_empty() {
            let parts: Vec<String> = totals.iter().map(|(d, n)| format!("{}={}", d, n)).collect();
            debug!("step {} placed {}", step, parts.join(" "));
        }
    }

    fn reset(&mut self) {}
}
