//! This module contains functions for the high-level working with the scheduler. For example, [`wait_for`].
use std::rc::Rc;
use std::time::Duration;
use crate::coroutine::{Coroutine, YieldCondition};
use crate::time::{MonotonicClock, SharedClock};

/// Returns [`YieldCondition::Immediate`]. If yielded, the coroutine is resumed on the next step.
///
/// # Example
///
/// ```
/// use cotick::coroutine::{from_fn, yield_now, CoroutineState};
///
/// let mut done = false;
/// let routine = from_fn(move |_cx| {
///     if done {
///         return CoroutineState::Complete;
///     }
///     done = true;
///     // let the other coroutines run first
///     CoroutineState::Yielded(yield_now())
/// });
/// # let _ = routine;
/// ```
pub fn yield_now() -> YieldCondition {
    YieldCondition::immediate()
}

/// Returns a [`TimeElapsed`](YieldCondition::TimeElapsed) condition measured with a new [`MonotonicClock`].
/// The time starts now.
///
/// Use [`Context::wait_for`](crate::coroutine::Context::wait_for) to measure with the scheduler's clock instead.
/// A condition from this function ignores simulated time:
///
/// ```
/// use std::rc::Rc;
/// use std::time::Duration;
/// use cotick::coroutine::{wait_for, Steps};
/// use cotick::scheduler::CoroutineManager;
/// use cotick::time::ManualClock;
///
/// let clock = ManualClock::new();
/// let mut manager = CoroutineManager::with_clock(Rc::new(clock.clone()));
/// let real = manager.start(Steps::new().then(|_| Some(wait_for(Duration::from_secs(60))))).unwrap();
/// let simulated = manager.start(Steps::new().then(|cx| Some(cx.wait_for(Duration::from_secs(60))))).unwrap();
///
/// clock.advance(Duration::from_secs(60));
/// manager.step_all().unwrap();
/// assert!(!real.is_over());
/// assert!(simulated.is_over());
/// ```
pub fn wait_for(duration: Duration) -> YieldCondition {
    YieldCondition::time_elapsed(Rc::new(MonotonicClock::new()), duration)
}

/// Returns a [`TimeElapsed`](YieldCondition::TimeElapsed) condition measured with `clock`. The time starts now.
pub fn wait_for_clock(clock: SharedClock, duration: Duration) -> YieldCondition {
    YieldCondition::time_elapsed(clock, duration)
}

/// Returns an [`Until`](YieldCondition::Until) condition. If yielded, the coroutine waits until `predicate` returns `true`.
pub fn wait_until<P: FnMut() -> bool + 'static>(predicate: P) -> YieldCondition {
    YieldCondition::until(predicate)
}

/// Returns a [`While`](YieldCondition::While) condition. If yielded, the coroutine waits while `predicate` returns `true`.
pub fn wait_while<P: FnMut() -> bool + 'static>(predicate: P) -> YieldCondition {
    YieldCondition::while_(predicate)
}

/// Returns a condition that is satisfied once `coroutine` is over (completed, stopped or failed).
pub fn wait_coroutine(coroutine: &Coroutine) -> YieldCondition {
    YieldCondition::custom(coroutine.clone())
}
