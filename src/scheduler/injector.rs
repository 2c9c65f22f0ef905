//! This module contains [`Injector`], the queue other threads use to hand routines over to a
//! [`CoroutineManager`](crate::scheduler::CoroutineManager).
//!
//! Routines are usually not [`Send`], so an [`Injector`] carries a [`Send`] factory instead,
//! and the factory builds the routine on the manager's thread.
use crossbeam::channel::Sender;
use crate::coroutine::{Context, CoroutineState, Routine, RoutineImpl};

/// Builds a routine on the manager's thread.
pub type RoutineFactory = Box<dyn FnOnce() -> RoutineImpl + Send>;

/// A [`Send`] + [`Clone`] handle for starting routines in a manager from any thread.
///
/// Injected routines are started by [`drain_injected`](crate::scheduler::CoroutineManager::drain_injected),
/// which [`run`](crate::run::run) calls once per tick.
///
/// # Example
///
/// ```
/// use cotick::coroutine::{yield_now, Steps};
/// use cotick::scheduler::CoroutineManager;
///
/// let mut manager = CoroutineManager::new();
/// let injector = manager.injector();
///
/// std::thread::spawn(move || {
///     injector.inject(|| Steps::new().then(|_| Some(yield_now())));
/// })
/// .join()
/// .unwrap();
///
/// assert_eq!(manager.drain_injected().unwrap(), 1);
/// assert_eq!(manager.count(), 1);
/// ```
#[derive(Clone)]
pub struct Injector {
    sender: Sender<RoutineFactory>,
}

impl Injector {
    pub(crate) fn new(sender: Sender<RoutineFactory>) -> Self {
        Self { sender }
    }

    /// Queues `factory`. Returns `false` if the manager has been dropped.
    pub fn inject<F, R>(&self, factory: F) -> bool
    where
        F: FnOnce() -> R + Send + 'static,
        R: Routine + 'static,
    {
        let factory: RoutineFactory = Box::new(move || Box::new(factory()) as RoutineImpl);
        self.sender.send(factory).is_ok()
    }
}

/// The routine started for an injected factory. The factory runs on the first resumption,
/// so a panicking factory fails like a panicking body.
pub(crate) struct Injected {
    factory: Option<RoutineFactory>,
    routine: Option<RoutineImpl>,
}

impl Injected {
    pub(crate) fn new(factory: RoutineFactory) -> Self {
        Self { factory: Some(factory), routine: None }
    }
}

impl Routine for Injected {
    fn resume(&mut self, cx: &mut Context<'_>) -> CoroutineState {
        if let Some(factory) = self.factory.take() {
            self.routine = Some(factory());
        }

        match self.routine.as_mut() {
            Some(routine) => routine.resume(cx),
            None => CoroutineState::Complete,
        }
    }
}
