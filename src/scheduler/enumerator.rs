//! This module contains [`Enumerator`], the single-step driver of one coroutine.
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;
use log::{debug, trace};
use crate::coroutine::{Context, Coroutine, CoroutineState, Routine, RoutineImpl, Status, YieldCondition};
use crate::error::{Error, Result};
use crate::scheduler::manager::Shared;
use crate::time::{MonotonicClock, SharedClock};
use crate::utils::panic_message;

/// Pairs a coroutine body with its pending [`YieldCondition`] and advances it one step at a time.
///
/// An [`Enumerator`] is usually owned by a [`CoroutineManager`](crate::scheduler::CoroutineManager),
/// but it can be stepped manually too.
///
/// Dropping an [`Enumerator`] drops the body without running it again, and marks an unfinished coroutine as
/// [`Stopped`](Status::Stopped).
pub struct Enumerator {
    coroutine: Coroutine,
    routine: Option<RoutineImpl>,
    pending: Option<YieldCondition>,
    clock: SharedClock,
}

impl Enumerator {
    /// Creates an [`Enumerator`] measuring time with a new [`MonotonicClock`] and runs the body up to its first yield point.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BodyPanicked`] if the body panics before its first yield point.
    pub fn new<R: Routine + 'static>(routine: R) -> Result<Self> {
        Self::with_clock(routine, Rc::new(MonotonicClock::new()))
    }

    /// Same as [`new`](Enumerator::new), but the body sees `clock` through its [`Context`].
    pub fn with_clock<R: Routine + 'static>(routine: R, clock: SharedClock) -> Result<Self> {
        let shared = Shared::new(clock);
        Self::start(&shared, Box::new(routine))
    }

    /// Creates an [`Enumerator`] registered to `shared` and runs the body up to its first yield point.
    pub(crate) fn start(shared: &Rc<Shared>, routine: RoutineImpl) -> Result<Self> {
        let coroutine = Coroutine::new(shared.next_id(), Rc::downgrade(shared));
        let mut enumerator = Self {
            coroutine,
            routine: Some(routine),
            pending: None,
            clock: shared.clock().clone(),
        };

        debug!("coroutine {} started", enumerator.coroutine.id());
        enumerator.resume()?;
        Ok(enumerator)
    }

    /// Returns the handle of the coroutine.
    pub fn coroutine(&self) -> &Coroutine {
        &self.coroutine
    }

    /// Returns the condition the coroutine is suspended on.
    pub fn pending(&self) -> Option<&YieldCondition> {
        self.pending.as_ref()
    }

    /// Advances the coroutine. Returns `Ok(true)` while the coroutine still has work
    /// and `Ok(false)` once it is over and should be reclaimed.
    ///
    /// A single call resumes the body at most once. A body that yields an already satisfied condition is resumed on the
    /// next call, not in this one.
    ///
    /// Stepping a coroutine that is already over does nothing and returns `Ok(false)`.
    ///
    /// # Errors
    ///
    /// If the pending condition or the body panics, the coroutine becomes [`Failed`](Status::Failed)
    /// and the panic is returned as [`Error::ConditionPanicked`] or [`Error::BodyPanicked`].
    /// Every following call returns `Ok(false)`.
    pub fn step(&mut self) -> Result<bool> {
        if self.coroutine.is_over() {
            return Ok(false);
        }

        if self.coroutine.is_stop_requested() {
            debug!("coroutine {} stopped", self.coroutine.id());
            self.finish(Status::Stopped);
            return Ok(false);
        }

        if let Some(condition) = self.pending.as_mut() {
            match catch_unwind(AssertUnwindSafe(|| condition.is_satisfied())) {
                Ok(true) => {}
                Ok(false) => return Ok(true),
                Err(payload) => {
                    self.finish(Status::Failed);
                    return Err(Error::ConditionPanicked {
                        id: self.coroutine.id(),
                        message: panic_message(payload.as_ref()),
                    });
                }
            }
        }

        self.pending = None;
        self.resume()
    }

    /// Resumes the body once and stores the condition it yielded.
    fn resume(&mut self) -> Result<bool> {
        let Some(routine) = self.routine.as_mut() else {
            return Ok(false);
        };

        self.coroutine.set_status(Status::Resuming);
        let mut cx = Context::new(&self.clock, &self.coroutine);
        let state = catch_unwind(AssertUnwindSafe(|| routine.resume(&mut cx)));

        match state {
            Ok(CoroutineState::Yielded(condition)) => {
                trace!("coroutine {} yielded {:?}", self.coroutine.id(), condition);
                self.pending = Some(condition);
                self.coroutine.set_status(Status::Suspended);
                Ok(true)
            }
            Ok(CoroutineState::Complete) => {
                debug!("coroutine {} completed", self.coroutine.id());
                self.finish(Status::Completed);
                Ok(false)
            }
            Err(payload) => {
                self.finish(Status::Failed);
                Err(Error::BodyPanicked {
                    id: self.coroutine.id(),
                    message: panic_message(payload.as_ref()),
                })
            }
        }
    }

    /// Moves the coroutine to a terminal status and releases the body.
    fn finish(&mut self, status: Status) {
        self.coroutine.set_status(status);
        self.pending = None;
        self.routine = None;
    }
}

impl Drop for Enumerator {
    fn drop(&mut self) {
        if !self.coroutine.is_over() {
            self.coroutine.set_status(Status::Stopped);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::time::Duration;
    use crate::coroutine::{from_fn, wait_until, yield_now, Steps};
    use crate::time::ManualClock;

    fn counter() -> (Rc<Cell<u32>>, Rc<Cell<u32>>) {
        let counter = Rc::new(Cell::new(0));
        (counter.clone(), counter)
    }

    #[test]
    fn test_runs_eagerly_to_first_yield() {
        let (runs, inner) = counter();
        let enumerator = Enumerator::new(from_fn(move |_| {
            inner.set(inner.get() + 1);
            CoroutineState::Yielded(yield_now())
        }))
        .unwrap();

        assert_eq!(runs.get(), 1);
        assert_eq!(enumerator.coroutine().status(), Status::Suspended);
        assert!(enumerator.pending().is_some());
    }

    #[test]
    fn test_completes_immediately_without_yield() {
        let mut enumerator = Enumerator::new(Steps::new()).unwrap();
        assert!(enumerator.coroutine().is_over());
        assert_eq!(enumerator.coroutine().status(), Status::Completed);
        assert!(!enumerator.step().unwrap());
    }

    #[test]
    fn test_satisfied_condition_is_not_resumed_twice_in_one_step() {
        let (runs, inner) = counter();
        let mut enumerator = Enumerator::new(from_fn(move |_| {
            inner.set(inner.get() + 1);
            CoroutineState::Yielded(yield_now())
        }))
        .unwrap();

        for expected in 2..6 {
            assert!(enumerator.step().unwrap());
            assert_eq!(runs.get(), expected);
        }
    }

    #[test]
    fn test_waits_for_condition() {
        let flag = Rc::new(Cell::new(false));
        let (runs, inner) = counter();
        let flag_ = flag.clone();
        let mut enumerator = Enumerator::new(
            Steps::new()
                .then(move |_| {
                    let flag = flag_.clone();
                    Some(wait_until(move || flag.get()))
                })
                .then(move |_| {
                    inner.set(inner.get() + 1);
                    None
                }),
        )
        .unwrap();

        assert!(enumerator.step().unwrap());
        assert!(enumerator.step().unwrap());
        assert_eq!(runs.get(), 0);

        flag.set(true);
        assert!(!enumerator.step().unwrap());
        assert_eq!(runs.get(), 1);
        assert_eq!(enumerator.coroutine().status(), Status::Completed);
    }

    #[test]
    fn test_stop_is_observed_on_next_step() {
        let (runs, inner) = counter();
        let mut enumerator = Enumerator::new(from_fn(move |_| {
            inner.set(inner.get() + 1);
            CoroutineState::Yielded(wait_until(|| false))
        }))
        .unwrap();

        let coroutine = enumerator.coroutine().clone();
        coroutine.stop();
        assert!(!coroutine.is_over());

        assert!(!enumerator.step().unwrap());
        assert!(coroutine.is_over());
        assert_eq!(coroutine.status(), Status::Stopped);
        assert_eq!(runs.get(), 1);
        assert!(enumerator.pending().is_none());
    }

    #[test]
    fn test_stop_takes_priority_over_satisfied_condition() {
        let (runs, inner) = counter();
        let mut enumerator = Enumerator::new(from_fn(move |_| {
            inner.set(inner.get() + 1);
            CoroutineState::Yielded(yield_now())
        }))
        .unwrap();

        enumerator.coroutine().stop();
        assert!(!enumerator.step().unwrap());
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn test_body_can_stop_itself() {
        let mut enumerator = Enumerator::new(from_fn(|cx| {
            cx.coroutine().stop();
            CoroutineState::Yielded(yield_now())
        }))
        .unwrap();

        assert_eq!(enumerator.coroutine().status(), Status::Suspended);
        assert!(!enumerator.step().unwrap());
        assert_eq!(enumerator.coroutine().status(), Status::Stopped);
    }

    #[test]
    fn test_condition_panic_fails_coroutine() {
        let mut enumerator = Enumerator::new(from_fn(|_| {
            CoroutineState::Yielded(wait_until(|| panic!("sensor unavailable")))
        }))
        .unwrap();

        let err = enumerator.step().unwrap_err();
        assert!(matches!(&err, Error::ConditionPanicked { message, .. } if message == "sensor unavailable"));
        assert_eq!(enumerator.coroutine().status(), Status::Failed);
        assert!(enumerator.coroutine().is_over());
        assert!(!enumerator.step().unwrap());
    }

    #[test]
    fn test_body_panic_fails_coroutine() {
        let mut stage = 0;
        let mut enumerator = Enumerator::new(from_fn(move |_| {
            stage += 1;
            if stage == 2 {
                panic!("body failed");
            }
            CoroutineState::Yielded(yield_now())
        }))
        .unwrap();

        assert!(matches!(enumerator.step(), Err(Error::BodyPanicked { .. })));
        assert_eq!(enumerator.coroutine().status(), Status::Failed);
        assert!(!enumerator.step().unwrap());
    }

    #[test]
    fn test_panic_before_first_yield() {
        let result = Enumerator::new(from_fn(|_| panic!("failed on start")));
        assert!(matches!(result, Err(Error::BodyPanicked { .. })));
    }

    #[test]
    fn test_drop_releases_body_and_marks_stopped() {
        struct Guard(Rc<Cell<bool>>);

        impl Drop for Guard {
            fn drop(&mut self) {
                self.0.set(true);
            }
        }

        let released = Rc::new(Cell::new(false));
        let guard = Guard(released.clone());
        let (runs, inner) = counter();
        let enumerator = Enumerator::new(from_fn(move |_| {
            let _ = &guard;
            inner.set(inner.get() + 1);
            CoroutineState::Yielded(wait_until(|| false))
        }))
        .unwrap();

        let coroutine = enumerator.coroutine().clone();
        drop(enumerator);
        assert!(released.get());
        assert_eq!(coroutine.status(), Status::Stopped);
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn test_wait_for_with_clock() {
        let clock = ManualClock::new();
        let mut enumerator = Enumerator::with_clock(
            Steps::new().then(|cx| Some(cx.wait_for(Duration::from_millis(20)))),
            Rc::new(clock.clone()),
        )
        .unwrap();

        clock.advance(Duration::from_millis(19));
        assert!(enumerator.step().unwrap());
        clock.advance(Duration::from_millis(1));
        assert!(!enumerator.step().unwrap());
    }
}
