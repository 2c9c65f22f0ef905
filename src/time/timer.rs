//! This module contains [`Timer`], the fixed-rate driver for a control loop that calls
//! [`step_all`](crate::scheduler::CoroutineManager::step_all) once per tick.
use std::thread;
use std::time::{Duration, Instant};
use crossbeam_utils::Backoff;
use log::warn;
use crate::cfg::TimerCfg;
use crate::error::Result;
use crate::time::{Clock, MonotonicClock};

/// How [`Timer::wait`] spends the remaining time of a period.
///
/// On platforms with a coarse sleep granularity (around 1 ms on Windows), use [`Busy`](WaitMode::Busy)
/// for loops running at 1 kHz or faster. [`Hybrid`](WaitMode::Hybrid) is usually more accurate than
/// [`Sleep`](WaitMode::Sleep), because sleeping can overshoot the requested period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitMode {
    /// Spins for the whole remaining time.
    Busy,
    /// Sleeps for the whole remaining time.
    Sleep,
    /// Sleeps a fraction of the remaining time, then spins for the rest.
    Hybrid,
}

/// Number of ticks before deadline miss warnings can be logged.
const WARNING_GRACE_TICKS: u64 = 1000;

fn wait_busy(deadline: Instant) {
    let backoff = Backoff::new();
    while Instant::now() < deadline {
        backoff.spin();
    }
}

fn wait_sleep(dur: Duration) {
    thread::sleep(dur);
}

/// Waits out the rest of a fixed period on every [`wait`](Timer::wait), and counts the ticks whose deadline was missed.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use cotick::cfg::TimerCfg;
/// use cotick::time::{Timer, WaitMode};
///
/// let mut timer = Timer::new(TimerCfg::with_period(Duration::from_millis(1)).wait_mode(WaitMode::Sleep)).unwrap();
/// for _ in 0..3 {
///     // do the work of one tick here
///     timer.wait();
/// }
/// assert_eq!(timer.ticks(), 3);
/// ```
#[derive(Debug)]
pub struct Timer {
    cfg: TimerCfg,
    clock: MonotonicClock,
    prev: Instant,
    ticks: u64,
    misses: u64,
    waited: Duration,
}

impl Timer {
    /// Creates and starts a [`Timer`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`](crate::error::Error::InvalidConfig) if `cfg` does not pass [`TimerCfg::validate`].
    pub fn new(cfg: TimerCfg) -> Result<Self> {
        cfg.validate()?;
        Ok(Self {
            cfg,
            clock: MonotonicClock::new(),
            prev: Instant::now(),
            ticks: 0,
            misses: 0,
            waited: Duration::ZERO,
        })
    }

    pub fn set_wait_mode(&mut self, wait_mode: WaitMode) {
        self.cfg = self.cfg.wait_mode(wait_mode);
    }

    pub fn set_warnings(&mut self, enabled: bool) {
        self.cfg = self.cfg.warnings(enabled);
    }

    /// Sets the fraction of the remaining time that [`WaitMode::Hybrid`] sleeps.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`](crate::error::Error::InvalidConfig) and keeps the old value
    /// if `percentage` is not within `[0, 1]`.
    pub fn set_hybrid_percentage(&mut self, percentage: f64) -> Result<()> {
        self.replace_cfg(self.cfg.hybrid_percentage(percentage))
    }

    /// Sets the miss rate at which deadline miss warnings start.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`](crate::error::Error::InvalidConfig) and keeps the old value
    /// if `rate` is not within `[0, 1]`.
    pub fn set_acceptable_miss_rate(&mut self, rate: f64) -> Result<()> {
        self.replace_cfg(self.cfg.acceptable_miss_rate(rate))
    }

    fn replace_cfg(&mut self, cfg: TimerCfg) -> Result<()> {
        cfg.validate()?;
        self.cfg = cfg;
        Ok(())
    }

    /// Resets the tick and miss counters and returns the elapsed time before the reset.
    pub fn restart(&mut self) -> Duration {
        self.ticks = 0;
        self.misses = 0;
        self.waited = Duration::ZERO;
        self.prev = Instant::now();
        self.clock.restart()
    }

    /// Waits until one period has passed since the previous [`wait`](Timer::wait) (or the start).
    /// Returns the elapsed time since the start.
    ///
    /// If the period has already passed, it does not wait and counts a miss.
    pub fn wait(&mut self) -> Duration {
        let period = self.cfg.period();
        let spent = self.prev.elapsed();

        if spent > period {
            self.misses += 1;
            self.warn_on_misses();
        } else if spent < period {
            let remaining = period - spent;
            self.waited += remaining;
            let deadline = self.prev + period;
            match self.cfg.get_wait_mode() {
                WaitMode::Busy => wait_busy(deadline),
                WaitMode::Sleep => wait_sleep(remaining),
                WaitMode::Hybrid => {
                    wait_sleep(remaining.mul_f64(self.cfg.get_hybrid_percentage()));
                    wait_busy(deadline);
                }
            }
        }

        self.prev = Instant::now();
        self.ticks += 1;
        self.elapsed()
    }

    fn warn_on_misses(&self) {
        if !self.cfg.warnings_enabled() || self.ticks <= WARNING_GRACE_TICKS {
            return;
        }
        let miss_rate = self.miss_rate();
        if miss_rate >= self.cfg.get_acceptable_miss_rate() {
            warn!(
                "timer miss rate of {:.4} exceeded acceptable rate of {:.4}",
                miss_rate,
                self.cfg.get_acceptable_miss_rate()
            );
        }
    }

    /// Returns the actual elapsed time since the start or the last [`restart`](Timer::restart).
    pub fn elapsed(&self) -> Duration {
        self.clock.now()
    }

    /// Returns the ideal elapsed time, the number of ticks times the period.
    pub fn elapsed_ideal(&self) -> Duration {
        let nanos = self.cfg.period().as_nanos().saturating_mul(self.ticks as u128);
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    pub fn miss_rate(&self) -> f64 {
        if self.ticks == 0 {
            return 0.0;
        }
        self.misses as f64 / self.ticks as f64
    }

    pub fn period(&self) -> Duration {
        self.cfg.period()
    }

    /// Returns the frequency in hertz.
    pub fn frequency(&self) -> f64 {
        1.0 / self.cfg.period().as_secs_f64()
    }

    /// Returns the ratio of time spent waiting to the total elapsed time.
    pub fn wait_ratio(&self) -> f64 {
        let elapsed = self.elapsed().as_secs_f64();
        if elapsed == 0.0 {
            return 0.0;
        }
        self.waited.as_secs_f64() / elapsed
    }
}
