use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Host time, used for load deadlines. Frame steps drive animation; this does not.
pub trait Clock {
    /// Time since some fixed origin. Must never go backwards.
    fn now(&self) -> Duration;
}

/// Monotonic wall time.
#[derive(Clone, Copy, Debug)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// A clock that only moves when told to. Clones share the same time.
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    now: Rc<Cell<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves time forward; negative or non-finite steps are ignored.
    pub fn advance(&self, secs: f32) {
        if secs.is_finite() && secs > 0.0 {
            self.now.set(self.now.get() + Duration::from_secs_f32(secs));
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clones_share_time() {
        let clock = ManualClock::new();
        let handle = clock.clone();
        handle.advance(1.5);
        handle.advance(-3.0);
        handle.advance(f32::NAN);
        assert_eq!(clock.now(), Duration::from_millis(1500));
    }

    #[test]
    fn system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let first = clock.now();
        assert!(clock.now() >= first);
    }
}
