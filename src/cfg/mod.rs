use std::time::Duration;
use crate::error::{Error, Result};
use crate::time::WaitMode;

/// The configuration of a [`CoroutineManager`](crate::scheduler::CoroutineManager).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManagerCfg {
    initial_capacity: usize,
}

impl ManagerCfg {
    pub const fn default() -> Self {
        Self {
            initial_capacity: 8,
        }
    }

    /// Sets how many coroutines the manager can hold before it reallocates.
    pub const fn with_initial_capacity(mut self, initial_capacity: usize) -> Self {
        self.initial_capacity = initial_capacity;
        self
    }

    pub fn initial_capacity(&self) -> usize {
        self.initial_capacity
    }
}

impl Default for ManagerCfg {
    fn default() -> Self {
        ManagerCfg::default()
    }
}

/// The configuration of a [`Timer`](crate::time::Timer).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimerCfg {
    period: Duration,
    wait_mode: WaitMode,
    hybrid_percentage: f64,
    acceptable_miss_rate: f64,
    warnings: bool,
}

impl TimerCfg {
    /// 1 kHz, busy waiting, deadline miss warnings enabled.
    pub const fn default() -> Self {
        Self {
            period: Duration::from_millis(1),
            wait_mode: WaitMode::Busy,
            hybrid_percentage: 0.9,
            acceptable_miss_rate: 0.01,
            warnings: true,
        }
    }

    /// Creates a config with the given tick period and default values for everything else.
    pub const fn with_period(period: Duration) -> Self {
        let mut cfg = Self::default();
        cfg.period = period;
        cfg
    }

    /// Creates a config ticking `hz` times per second. A frequency that is not positive, not finite,
    /// or so low that the period does not fit a [`Duration`] gives a zero period, which
    /// [`validate`](TimerCfg::validate) rejects.
    pub fn with_frequency(hz: f64) -> Self {
        let period = if hz > 0.0 {
            Duration::try_from_secs_f64(1.0 / hz).unwrap_or(Duration::ZERO)
        } else {
            Duration::ZERO
        };
        Self::with_period(period)
    }

    pub const fn wait_mode(mut self, wait_mode: WaitMode) -> Self {
        self.wait_mode = wait_mode;
        self
    }

    /// Sets the fraction of the remaining time that [`WaitMode::Hybrid`] spends sleeping.
    pub fn hybrid_percentage(mut self, hybrid_percentage: f64) -> Self {
        self.hybrid_percentage = hybrid_percentage;
        self
    }

    /// Sets the miss rate at which deadline miss warnings start.
    pub fn acceptable_miss_rate(mut self, rate: f64) -> Self {
        self.acceptable_miss_rate = rate;
        self
    }

    pub const fn warnings(mut self, enabled: bool) -> Self {
        self.warnings = enabled;
        self
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn get_wait_mode(&self) -> WaitMode {
        self.wait_mode
    }

    pub fn get_hybrid_percentage(&self) -> f64 {
        self.hybrid_percentage
    }

    pub fn get_acceptable_miss_rate(&self) -> f64 {
        self.acceptable_miss_rate
    }

    pub fn warnings_enabled(&self) -> bool {
        self.warnings
    }

    pub fn validate(&self) -> Result<()> {
        if self.period.is_zero() {
            return Err(Error::InvalidConfig("timer period must be greater than zero"));
        }
        if !(0.0..=1.0).contains(&self.hybrid_percentage) {
            return Err(Error::InvalidConfig("hybrid percentage must be within [0, 1]"));
        }
        if !(0.0..=1.0).contains(&self.acceptable_miss_rate) {
            return Err(Error::InvalidConfig("acceptable miss rate must be within [0, 1]"));
        }
        Ok(())
    }
}

impl Default for TimerCfg {
    fn default() -> Self {
        TimerCfg::default()
    }
}
