//! Virtual clock for deterministic playback.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Manually advanced clock, shared between clones.
///
/// Playback against this clock never sleeps: the runner advances it by one
/// cadence interval per tick, so a run is reproducible regardless of host load.
#[derive(Debug, Clone, Default)]
pub struct VirtualClock {
    elapsed: Arc<Mutex<Duration>>,
}

impl VirtualClock {
    pub fn new() -> Self {
        Self::default()
    }

    fn guard(&self) -> MutexGuard<'_, Duration> {
        self.elapsed.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Current virtual time since the clock was created.
    pub fn now(&self) -> Duration {
        *self.guard()
    }

    /// Advances virtual time by the given duration.
    pub fn advance(&self, by: Duration) {
        *self.guard() += by;
    }

    /// Sets the virtual time to a specific value.
    pub fn set(&self, to: Duration) {
        *self.guard() = to;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_time() {
        let clock = VirtualClock::new();
        let other = clock.clone();
        clock.advance(Duration::from_millis(250));
        other.advance(Duration::from_millis(250));
        assert_eq!(clock.now(), Duration::from_millis(500));

        other.set(Duration::ZERO);
        assert_eq!(clock.now(), Duration::ZERO);
    }
}
