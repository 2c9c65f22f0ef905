//! This module contains the [`Clock`] boundary used by time based [`YieldCondition`](crate::coroutine::YieldCondition)s.
use std::cell::Cell;
use std::fmt::Debug;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// A monotonic time source.
///
/// [`now`](Clock::now) returns the time elapsed since the clock's epoch. Only differences between two readings
/// of the same clock are meaningful.
pub trait Clock: Debug {
    /// Returns the elapsed time since the epoch of the clock.
    fn now(&self) -> Duration;
}

/// The shared clock type stored by the scheduler.
pub type SharedClock = Rc<dyn Clock>;

/// A [`Clock`] backed by [`Instant`]. The epoch is the moment of construction or of the last [`restart`](MonotonicClock::restart).
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    start: Cell<Instant>,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self { start: Cell::new(Instant::now()) }
    }

    /// Resets the epoch to now and returns the time elapsed before the reset.
    pub fn restart(&self) -> Duration {
        let now = Instant::now();
        let elapsed = now - self.start.get();
        self.start.set(now);
        elapsed
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.start.get().elapsed()
    }
}

/// A simulated [`Clock`]. Clones share the same time, so a test can keep one clone and hand another to the scheduler.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use cotick::time::{Clock, ManualClock};
///
/// let clock = ManualClock::new();
/// let shared = clock.clone();
/// clock.advance(Duration::from_millis(10));
/// assert_eq!(shared.now(), Duration::from_millis(10));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves the time forward by `dur`.
    pub fn advance(&self, dur: Duration) {
        self.now.set(self.now.get().saturating_add(dur));
    }

    /// Sets the current time. Setting a time earlier than the current one is allowed, but breaks monotonicity
    /// for everything reading this clock.
    pub fn set(&self, now: Duration) {
        self.now.set(now);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }
}
