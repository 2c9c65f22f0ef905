use log::{debug, error, warn};
use crate::error::Result;
use crate::scheduler::CoroutineManager;
use crate::time::Timer;
use crate::utils::{pin_current, CoreId};

/// Drives `manager` at the rate of `timer` until no coroutine is left. Returns the number of ticks.
/// This function will block the current thread.
///
/// Every tick starts the injected routines, calls [`step_all`](CoroutineManager::step_all) and then waits for the timer.
/// Failures of single coroutines are logged and do not stop the loop.
///
/// # Examples:
///
/// ```
/// use std::time::Duration;
/// use cotick::cfg::TimerCfg;
/// use cotick::coroutine::{from_fn, CoroutineState};
/// use cotick::run;
/// use cotick::scheduler::CoroutineManager;
/// use cotick::time::{Timer, WaitMode};
///
/// let mut manager = CoroutineManager::new();
/// let mut blinks = 0;
/// manager.start(from_fn(move |cx| {
///     if blinks == 3 {
///         return CoroutineState::Complete;
///     }
///     blinks += 1;
///     println!("blink");
///     CoroutineState::Yielded(cx.wait_for(Duration::from_millis(2)))
/// })).unwrap();
///
/// let mut timer = Timer::new(TimerCfg::with_period(Duration::from_millis(1)).wait_mode(WaitMode::Sleep)).unwrap();
/// let ticks = run(&mut manager, &mut timer);
/// assert!(ticks >= 3);
/// ```
pub fn run(manager: &mut CoroutineManager, timer: &mut Timer) -> u64 {
    let mut ticks = 0;
    loop {
        log_failures(manager.drain_injected());
        log_failures(manager.step_all());
        ticks += 1;

        if manager.is_empty() {
            break;
        }
        timer.wait();
    }

    debug!("run finished after {} tick(s)", ticks);
    ticks
}

/// Pins the current thread to `core` and runs [`run`].
/// This function will block the current thread.
///
/// # Note
///
/// A control loop pinned to a dedicated core misses fewer deadlines.
/// Use [`control_core`](crate::utils::control_core) to pick a core. If pinning fails, the loop runs unpinned.
pub fn run_on_core(core: CoreId, manager: &mut CoroutineManager, timer: &mut Timer) -> u64 {
    if !pin_current(core) {
        warn!("failed to pin the control loop to core {}", core.id);
    }
    run(manager, timer)
}

fn log_failures<T>(result: Result<T>) {
    if let Err(err) = result {
        for failure in err.failures() {
            error!("{}", failure);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;
    use std::time::Duration;
    use crate::cfg::TimerCfg;
    use crate::coroutine::{from_fn, wait_until, yield_now, CoroutineState, Steps};
    use crate::time::WaitMode;

    fn timer() -> Timer {
        Timer::new(TimerCfg::with_period(Duration::from_micros(200)).wait_mode(WaitMode::Sleep).warnings(false)).unwrap()
    }

    #[test]
    fn test_run_until_empty() {
        let mut manager = CoroutineManager::new();
        let mut left = 5;
        manager
            .start(from_fn(move |_| {
                if left == 0 {
                    return CoroutineState::Complete;
                }
                left -= 1;
                CoroutineState::Yielded(yield_now())
            }))
            .unwrap();

        assert_eq!(run(&mut manager, &mut timer()), 5);
        assert!(manager.is_empty());
    }

    #[test]
    fn test_run_survives_failures() {
        let mut manager = CoroutineManager::new();
        manager
            .start(from_fn(|_| CoroutineState::Yielded(wait_until(|| panic!("broken sensor")))))
            .unwrap();
        let done = Rc::new(Cell::new(false));
        let done_ = done.clone();
        manager
            .start(Steps::new().then(|_| Some(yield_now())).then(|_| Some(yield_now())).then(move |_| {
                done_.set(true);
                None
            }))
            .unwrap();

        assert_eq!(run(&mut manager, &mut timer()), 2);
        assert!(done.get());
    }

    #[test]
    fn test_run_starts_injected() {
        let mut manager = CoroutineManager::new();
        manager.injector().inject(|| Steps::new().then(|_| Some(yield_now())));
        // started and finished within the first tick
        assert_eq!(run(&mut manager, &mut timer()), 1);
    }

    #[test]
    fn test_run_on_core() {
        let mut manager = CoroutineManager::new();
        manager.start(Steps::new().then(|_| Some(yield_now()))).unwrap();
        if let Some(core) = crate::utils::control_core() {
            assert_eq!(run_on_core(core, &mut manager, &mut timer()), 1);
        }
    }
}
