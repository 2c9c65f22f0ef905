//! This module contains a description of [`YieldCondition`], the reason a coroutine is suspended.
//! Please use high-level functions from [`yielding`](crate::coroutine::yielding) to build conditions if it is possible.
use std::fmt::{Debug, Formatter};
use std::time::Duration;
use crate::time::SharedClock;

/// A user defined reason for suspension. Implement it to extend the built-in [`YieldCondition`] variants.
///
/// [`is_satisfied`](Condition::is_satisfied) may be called many times before it returns `true`.
/// It must not report a stale `true`: the answer may change only through time or external state.
pub trait Condition {
    /// Returns `true` if the coroutine waiting on this condition can be resumed.
    fn is_satisfied(&mut self) -> bool;
}

/// Waits until `duration` has elapsed on `clock` since the moment of creation.
pub struct TimeElapsed {
    clock: SharedClock,
    start: Duration,
    duration: Duration,
}

impl TimeElapsed {
    /// Captures the start mark from `clock` right now, not at the first poll.
    pub fn new(clock: SharedClock, duration: Duration) -> Self {
        let start = clock.now();
        Self { clock, start, duration }
    }

    /// Returns the time elapsed since the start mark.
    pub fn elapsed(&self) -> Duration {
        self.clock.now().saturating_sub(self.start)
    }

    /// Returns the time left until the condition is satisfied.
    pub fn remaining(&self) -> Duration {
        self.duration.saturating_sub(self.elapsed())
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn is_satisfied(&self) -> bool {
        self.elapsed() >= self.duration
    }
}

/// The boxed predicate of [`Until`](YieldCondition::Until) and [`While`](YieldCondition::While).
pub type Predicate = Box<dyn FnMut() -> bool>;

/// The reason a coroutine is suspended. This is the one way for a coroutine body to tell the scheduler when to resume it.
///
/// A condition is owned by the [`Enumerator`](crate::scheduler::Enumerator) of its coroutine
/// and is replaced on every yield.
pub enum YieldCondition {
    /// `Immediate` is always satisfied.
    ///
    /// If yielded, the coroutine is resumed on the next step.
    Immediate,

    /// [`TimeElapsed`] takes a clock and a duration.
    ///
    /// If yielded, the coroutine is resumed once at least the duration has elapsed since the condition was created.
    ///
    /// The duration is measured on the clock the condition was built with, not on the manager's clock.
    /// Inside a body, build it with [`Context::wait_for`](crate::coroutine::Context::wait_for) so that a manager
    /// driven by a [`ManualClock`](crate::time::ManualClock) controls it.
    TimeElapsed(TimeElapsed),

    /// `Until` takes a predicate.
    ///
    /// If yielded, the coroutine is resumed once the predicate returns `true`.
    Until(Predicate),

    /// `While` takes a predicate.
    ///
    /// If yielded, the coroutine is resumed once the predicate returns `false`.
    While(Predicate),

    /// `Custom` takes a user defined [`Condition`].
    Custom(Box<dyn Condition>),
}

impl YieldCondition {
    /// Create a YieldCondition variant [`Immediate`](YieldCondition::Immediate).
    pub fn immediate() -> Self {
        YieldCondition::Immediate
    }

    /// Create a YieldCondition variant [`TimeElapsed`](YieldCondition::TimeElapsed).
    pub fn time_elapsed(clock: SharedClock, duration: Duration) -> Self {
        YieldCondition::TimeElapsed(TimeElapsed::new(clock, duration))
    }

    /// Create a YieldCondition variant [`Until`](YieldCondition::Until).
    pub fn until<P: FnMut() -> bool + 'static>(predicate: P) -> Self {
        YieldCondition::Until(Box::new(predicate))
    }

    /// Create a YieldCondition variant [`While`](YieldCondition::While).
    pub fn while_<P: FnMut() -> bool + 'static>(predicate: P) -> Self {
        YieldCondition::While(Box::new(predicate))
    }

    /// Create a YieldCondition variant [`Custom`](YieldCondition::Custom).
    pub fn custom<C: Condition + 'static>(condition: C) -> Self {
        YieldCondition::Custom(Box::new(condition))
    }

    /// Returns `true` if the suspended coroutine can be resumed.
    ///
    /// # Panics
    ///
    /// Panics if the user predicate or the custom condition panics.
    pub fn is_satisfied(&mut self) -> bool {
        match self {
            YieldCondition::Immediate => true,
            YieldCondition::TimeElapsed(time) => time.is_satisfied(),
            YieldCondition::Until(predicate) => predicate(),
            YieldCondition::While(predicate) => !predicate(),
            YieldCondition::Custom(condition) => condition.is_satisfied(),
        }
    }
}

impl Default for YieldCondition {
    fn default() -> Self {
        YieldCondition::Immediate
    }
}

impl Debug for YieldCondition {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            YieldCondition::Immediate => f.write_str("Immediate"),
            YieldCondition::TimeElapsed(time) => f
                .debug_struct("TimeElapsed")
                .field("start", &time.start)
                .field("duration", &time.duration)
                .finish(),
            YieldCondition::Until(_) => f.write_str("Until(..)"),
            YieldCondition::While(_) => f.write_str("While(..)"),
            YieldCondition::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;
    use crate::time::ManualClock;

    #[test]
    fn test_immediate() {
        let mut condition = YieldCondition::default();
        assert!(condition.is_satisfied());
        assert!(condition.is_satisfied());
    }

    #[test]
    fn test_time_elapsed_captures_start_at_creation() {
        let clock = ManualClock::new();
        clock.advance(Duration::from_secs(10));
        let mut condition = YieldCondition::time_elapsed(Rc::new(clock.clone()), Duration::from_millis(20));

        clock.advance(Duration::from_millis(19));
        assert!(!condition.is_satisfied());
        clock.advance(Duration::from_millis(1));
        assert!(condition.is_satisfied());
        assert!(condition.is_satisfied());
    }

    #[test]
    fn test_time_elapsed_zero() {
        let clock = ManualClock::new();
        let mut condition = YieldCondition::time_elapsed(Rc::new(clock), Duration::ZERO);
        assert!(condition.is_satisfied());
    }

    #[test]
    fn test_time_elapsed_remaining() {
        let clock = ManualClock::new();
        let time = TimeElapsed::new(Rc::new(clock.clone()), Duration::from_millis(30));
        clock.advance(Duration::from_millis(10));
        assert_eq!(time.elapsed(), Duration::from_millis(10));
        assert_eq!(time.remaining(), Duration::from_millis(20));
        clock.advance(Duration::from_millis(50));
        assert_eq!(time.remaining(), Duration::ZERO);
    }

    #[test]
    fn test_until_and_while() {
        let flag = Rc::new(Cell::new(false));
        let until_flag = flag.clone();
        let while_flag = flag.clone();
        let mut until = YieldCondition::until(move || until_flag.get());
        let mut while_ = YieldCondition::while_(move || while_flag.get());

        assert!(!until.is_satisfied());
        assert!(while_.is_satisfied());

        flag.set(true);
        assert!(until.is_satisfied());
        assert!(!while_.is_satisfied());
    }

    #[test]
    fn test_custom() {
        struct Countdown(u32);

        impl Condition for Countdown {
            fn is_satisfied(&mut self) -> bool {
                if self.0 == 0 {
                    return true;
                }
                self.0 -= 1;
                false
            }
        }

        let mut condition = YieldCondition::custom(Countdown(2));
        assert!(!condition.is_satisfied());
        assert!(!condition.is_satisfied());
        assert!(condition.is_satisfied());
    }

    #[test]
    #[should_panic(expected = "predicate failed")]
    fn test_predicate_panic_propagates() {
        let mut condition = YieldCondition::until(|| panic!("predicate failed"));
        condition.is_satisfied();
    }

    #[test]
    fn test_debug() {
        assert_eq!(format!("{:?}", YieldCondition::Immediate), "Immediate");
        assert_eq!(format!("{:?}", YieldCondition::until(|| true)), "Until(..)");
    }
}
