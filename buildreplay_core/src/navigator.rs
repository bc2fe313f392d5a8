//! Timeline Navigator - step pointer, clamped seek and playback cadence.
//!
//! The navigator only decides *which* step should be shown; the engine
//! performs the matching rebuild or incremental apply.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Cadence bounds in steps per second.
pub const MIN_CADENCE: u32 = 1;
pub const MAX_CADENCE: u32 = 60;

/// Playback state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    Paused,
    Playing,
}

/// Result of an `advance()` tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// Moved to this step
    Moved(usize),
    /// Was at the final step while playing; now paused
    ReachedEnd,
    /// Not playing or no episode
    Idle,
}

/// Step pointer plus play/pause cadence state.
#[derive(Debug, Clone)]
pub struct Navigator {
    current: usize,
    step_count: usize,
    state: PlaybackState,
    cadence: u32,
    last_advance: Option<Duration>,
}

impl Navigator {
    /// Creates a paused navigator over `step_count` steps.
    pub fn new(step_count: usize, cadence: u32) -> Self {
        Self {
            current: 0,
            step_count,
            state: PlaybackState::Paused,
            cadence: cadence.clamp(MIN_CADENCE, MAX_CADENCE),
            last_advance: None,
        }
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn step_count(&self) -> usize {
        self.step_count
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    /// Steps per second.
    pub fn cadence(&self) -> u32 {
        self.cadence
    }

    /// Time between advances at the current cadence.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(1) / self.cadence
    }

    pub fn is_at_end(&self) -> bool {
        self.step_count == 0 || self.current + 1 >= self.step_count
    }

    /// Sets the cadence, clamped to `[1, 60]`. Returns the applied value.
    pub fn set_cadence(&mut self, steps_per_sec: u32) -> u32 {
        self.cadence = steps_per_sec.clamp(MIN_CADENCE, MAX_CADENCE);
        self.cadence
    }

    pub fn play(&mut self) {
        self.state = PlaybackState::Playing;
    }

    pub fn pause(&mut self) {
        self.state = PlaybackState::Paused;
    }

    pub fn toggle(&mut self) {
        match self.state {
            PlaybackState::Paused => self.play(),
            PlaybackState::Playing => self.pause(),
        }
    }

    /// Moves the pointer, clamped to `[0, step_count - 1]`.
    ///
    /// Returns the new step, or `None` when there are no steps.
    pub fn seek(&mut self, step: i64) -> Option<usize> {
        if self.step_count == 0 {
            return None;
        }
        let last = (self.step_count - 1) as i64;
        self.current = step.clamp(0, last) as usize;
        Some(self.current)
    }

    /// One playback tick: next step, or pause at the final step.
    pub fn advance(&mut self) -> Advance {
        if !self.is_playing() || self.step_count == 0 {
            return Advance::Idle;
        }
        if self.is_at_end() {
            self.pause();
            return Advance::ReachedEnd;
        }
        self.current += 1;
        Advance::Moved(self.current)
    }

    /// Advances only when playing and one interval has passed since the
    /// last advance. `now` is any monotonic clock reading; a reading
    /// earlier than the last advance means a new clock and counts as due.
    pub fn advance_if_due(&mut self, now: Duration) -> Advance {
        if !self.is_playing() {
            return Advance::Idle;
        }
        if let Some(last) = self.last_advance {
            if now >= last && now - last < self.interval() {
                return Advance::Idle;
            }
        }
        self.last_advance = Some(now);
        self.advance()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seek_clamps() {
        let mut nav = Navigator::new(5, 6);
        assert_eq!(nav.seek(3), Some(3));
        assert_eq!(nav.seek(99), Some(4));
        assert_eq!(nav.seek(-7), Some(0));
    }

    #[test]
    fn test_seek_empty_is_noop() {
        let mut nav = Navigator::new(0, 6);
        assert_eq!(nav.seek(2), None);
        assert_eq!(nav.current(), 0);
    }

    #[test]
    fn test_cadence_clamped() {
        let mut nav = Navigator::new(3, 0);
        assert_eq!(nav.cadence(), 1);
        assert_eq!(nav.set_cadence(120), 60);
        assert_eq!(nav.set_cadence(10), 10);
        assert_eq!(nav.interval(), Duration::from_millis(100));
    }

    #[test]
    fn test_advance_pauses_at_end() {
        let mut nav = Navigator::new(3, 6);
        assert_eq!(nav.advance(), Advance::Idle);

        nav.play();
        assert_eq!(nav.advance(), Advance::Moved(1));
        assert_eq!(nav.advance(), Advance::Moved(2));
        assert_eq!(nav.advance(), Advance::ReachedEnd);
        assert_eq!(nav.state(), PlaybackState::Paused);
        assert_eq!(nav.current(), 2);
    }

    #[test]
    fn test_toggle() {
        let mut nav = Navigator::new(3, 6);
        nav.toggle();
        assert!(nav.is_playing());
        nav.toggle();
        assert!(!nav.is_playing());
    }

    #[test]
    fn test_advance_if_due_respects_cadence() {
        let mut nav = Navigator::new(10, 10);
        nav.play();
        assert_eq!(nav.advance_if_due(Duration::from_millis(0)), Advance::Moved(1));
        assert_eq!(nav.advance_if_due(Duration::from_millis(50)), Advance::Idle);
        assert_eq!(nav.advance_if_due(Duration::from_millis(100)), Advance::Moved(2));
        nav.pause();
        assert_eq!(nav.advance_if_due(Duration::from_millis(500)), Advance::Idle);
        assert_eq!(nav.current(), 2);
    }

    #[test]
    fn test_advance_if_due_after_clock_reset() {
        let mut nav = Navigator::new(10, 1);
        nav.play();
        assert_eq!(nav.advance_if_due(Duration::from_secs(30)), Advance::Moved(1));
        assert_eq!(nav.advance_if_due(Duration::ZERO), Advance::Moved(2));
    }
}
