//! This module contains [`CoroutineManager`], which owns many coroutines and advances them once per tick,
//! and [`Spawner`], which lets coroutine bodies start and stop coroutines while they are stepped.
use std::cell::{Cell, RefCell};
use std::fmt::{Debug, Formatter};
use std::mem;
use std::rc::{Rc, Weak};
use crossbeam::channel::{unbounded, Receiver, Sender};
use log::{debug, trace, warn};
use crate::cfg::ManagerCfg;
use crate::coroutine::{Coroutine, CoroutineId, Routine, RoutineImpl};
use crate::error::{Error, Result};
use crate::scheduler::enumerator::Enumerator;
use crate::scheduler::injector::{Injected, Injector, RoutineFactory};
use crate::time::{MonotonicClock, SharedClock};

/// The state shared between a manager, its spawners and the handles it gives out.
pub(crate) struct Shared {
    clock: SharedClock,
    /// Coroutines registered since the last adoption into the manager.
    incoming: RefCell<Vec<Enumerator>>,
    /// Registered coroutines that are not reclaimed yet, including `incoming`.
    registered: Cell<usize>,
    next_id: Cell<u64>,
}

impl Shared {
    pub(crate) fn new(clock: SharedClock) -> Rc<Self> {
        Rc::new(Self {
            clock,
            incoming: RefCell::new(Vec::new()),
            registered: Cell::new(0),
            next_id: Cell::new(1),
        })
    }

    pub(crate) fn clock(&self) -> &SharedClock {
        &self.clock
    }

    pub(crate) fn next_id(&self) -> CoroutineId {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        CoroutineId(id)
    }

    /// Starts `routine` and queues it for adoption. A coroutine that is already over after its first slice is not registered.
    fn register(self: &Rc<Self>, routine: RoutineImpl) -> Result<Coroutine> {
        let enumerator = Enumerator::start(self, routine)?;
        let coroutine = enumerator.coroutine().clone();
        if coroutine.is_over() {
            return Ok(coroutine);
        }

        self.incoming.borrow_mut().push(enumerator);
        self.registered.set(self.registered.get() + 1);
        Ok(coroutine)
    }

    fn stop(self: &Rc<Self>, coroutine: &Coroutine) {
        if coroutine.belongs_to(self) {
            coroutine.stop();
        } else {
            warn!("ignoring stop of coroutine {}: it belongs to another manager", coroutine.id());
        }
    }
}

/// Owns a collection of coroutines and advances all of them once per external tick.
///
/// The manager is single-threaded: every method, and every coroutine body, runs on the thread that owns it.
/// Other threads can hand work over with an [`Injector`].
///
/// # Example
///
/// ```
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use std::time::Duration;
/// use cotick::coroutine::{wait_until, Steps};
/// use cotick::scheduler::CoroutineManager;
/// use cotick::time::ManualClock;
///
/// let clock = ManualClock::new();
/// let mut manager = CoroutineManager::with_clock(Rc::new(clock.clone()));
/// let flag = Rc::new(Cell::new(false));
///
/// manager.start(Steps::new().then(|cx| Some(cx.wait_for(Duration::from_millis(20))))).unwrap();
/// let flag_ = flag.clone();
/// manager.start(Steps::new().then(move |_| {
///     let flag = flag_.clone();
///     Some(wait_until(move || flag.get()))
/// })).unwrap();
///
/// clock.advance(Duration::from_millis(10));
/// manager.step_all().unwrap();
/// assert_eq!(manager.count(), 2);
///
/// flag.set(true);
/// clock.advance(Duration::from_millis(10));
/// manager.step_all().unwrap();
/// assert_eq!(manager.count(), 0);
/// ```
pub struct CoroutineManager {
    coroutines: Vec<Enumerator>,
    shared: Rc<Shared>,
    injector: Sender<RoutineFactory>,
    injected: Receiver<RoutineFactory>,
}

impl CoroutineManager {
    /// Creates a manager measuring time with a [`MonotonicClock`].
    pub fn new() -> Self {
        Self::with_cfg(ManagerCfg::default())
    }

    pub fn with_cfg(cfg: ManagerCfg) -> Self {
        Self::with_clock_and_cfg(Rc::new(MonotonicClock::new()), cfg)
    }

    pub fn with_clock(clock: SharedClock) -> Self {
        Self::with_clock_and_cfg(clock, ManagerCfg::default())
    }

    pub fn with_clock_and_cfg(clock: SharedClock, cfg: ManagerCfg) -> Self {
        let (injector, injected) = unbounded();
        Self {
            coroutines: Vec::with_capacity(cfg.initial_capacity()),
            shared: Shared::new(clock),
            injector,
            injected,
        }
    }

    /// Returns the clock the coroutine bodies see through their [`Context`](crate::coroutine::Context).
    pub fn clock(&self) -> &SharedClock {
        self.shared.clock()
    }

    /// Returns a [`Spawner`] that coroutine bodies can capture to start and stop coroutines of this manager.
    pub fn spawner(&self) -> Spawner {
        Spawner { shared: Rc::downgrade(&self.shared) }
    }

    /// Returns an [`Injector`] that other threads can use to hand routines over to this manager.
    pub fn injector(&self) -> Injector {
        Injector::new(self.injector.clone())
    }

    /// Registers `routine` and runs it up to its first yield point. Returns the handle of the new coroutine.
    ///
    /// If the body finishes without yielding, the returned handle is already over and nothing is registered.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BodyPanicked`] if the body panics before its first yield point. Nothing is registered then.
    pub fn start<R: Routine + 'static>(&mut self, routine: R) -> Result<Coroutine> {
        let coroutine = self.shared.register(Box::new(routine))?;
        self.adopt_incoming();
        Ok(coroutine)
    }

    /// Requests `coroutine` to stop. It is stopped on its next step and reclaimed during that [`step_all`](Self::step_all).
    ///
    /// Does nothing if the coroutine is already over or was started by another manager.
    pub fn stop(&self, coroutine: &Coroutine) {
        self.shared.stop(coroutine);
    }

    /// Requests every registered coroutine to stop.
    pub fn stop_all(&self) {
        debug!("stopping {} coroutine(s)", self.count());
        for enumerator in self.coroutines.iter() {
            enumerator.coroutine().stop();
        }
        for enumerator in self.shared.incoming.borrow().iter() {
            enumerator.coroutine().stop();
        }
    }

    /// Returns the number of registered coroutines, including stopped coroutines that are not reclaimed yet.
    pub fn count(&self) -> usize {
        self.shared.registered.get()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Steps every registered coroutine exactly once, in registration order, and reclaims every coroutine that is over.
    /// Usually called once per tick of the control loop.
    ///
    /// Coroutines started during the pass (with a [`Spawner`]) are counted right away but are first stepped by the next call.
    ///
    /// Returns the number of reclaimed coroutines.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Failures`] with every condition or body that panicked during the pass.
    /// The failed coroutines are reclaimed, and the other coroutines are stepped as usual.
    pub fn step_all(&mut self) -> Result<usize> {
        self.adopt_incoming();

        let before = self.coroutines.len();
        let mut failures = Vec::new();
        self.coroutines.retain_mut(|enumerator| match enumerator.step() {
            Ok(alive) => alive,
            Err(err) => {
                failures.push(err);
                false
            }
        });

        let reclaimed = before - self.coroutines.len();
        self.shared.registered.set(self.shared.registered.get() - reclaimed);
        self.adopt_incoming();
        debug_assert_eq!(self.coroutines.len(), self.shared.registered.get());

        if reclaimed > 0 {
            debug!("reclaimed {} coroutine(s), {} left", reclaimed, self.coroutines.len());
        }

        if failures.is_empty() {
            Ok(reclaimed)
        } else {
            Err(Error::Failures(failures))
        }
    }

    /// Starts every routine handed over by an [`Injector`] since the last call. Returns the number of started routines.
    ///
    /// The routines are built and started on the calling thread, in the order they were injected.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Failures`] with every routine that panicked while it was built or run up to its first yield point.
    /// The other routines are started as usual.
    pub fn drain_injected(&mut self) -> Result<usize> {
        let mut started = 0;
        let mut failures = Vec::new();
        while let Ok(factory) = self.injected.try_recv() {
            match self.shared.register(Box::new(Injected::new(factory))) {
                Ok(_) => started += 1,
                Err(err) => failures.push(err),
            }
        }
        self.adopt_incoming();

        if started > 0 {
            trace!("started {} injected routine(s)", started);
        }

        if failures.is_empty() {
            Ok(started)
        } else {
            Err(Error::Failures(failures))
        }
    }

    /// Moves coroutines registered through [`Shared`] into the stepped collection.
    fn adopt_incoming(&mut self) {
        let incoming = mem::take(&mut *self.shared.incoming.borrow_mut());
        self.coroutines.extend(incoming);
    }
}

impl Default for CoroutineManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for CoroutineManager {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoroutineManager")
            .field("count", &self.count())
            .field("clock", self.clock())
            .finish()
    }
}

/// Starts and stops coroutines of a [`CoroutineManager`] from inside coroutine bodies.
///
/// A [`Spawner`] does not keep its manager alive. Once the manager is dropped,
/// [`start`](Spawner::start) returns [`Error::Closed`] and [`stop`](Spawner::stop) does nothing.
#[derive(Clone)]
pub struct Spawner {
    shared: Weak<Shared>,
}

impl Spawner {
    /// Registers `routine` and runs it up to its first yield point, see [`CoroutineManager::start`].
    ///
    /// When called during [`step_all`](CoroutineManager::step_all), the new coroutine is counted immediately
    /// and first stepped by the next `step_all`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Closed`] if the manager has been dropped, or [`Error::BodyPanicked`]
    /// if the body panics before its first yield point.
    pub fn start<R: Routine + 'static>(&self, routine: R) -> Result<Coroutine> {
        let shared = self.shared.upgrade().ok_or(Error::Closed)?;
        shared.register(Box::new(routine))
    }

    /// Requests `coroutine` to stop, see [`CoroutineManager::stop`].
    pub fn stop(&self, coroutine: &Coroutine) {
        if let Some(shared) = self.shared.upgrade() {
            shared.stop(coroutine);
        }
    }

    /// Returns the number of coroutines registered in the manager, see [`CoroutineManager::count`].
    /// Returns zero once the manager is dropped.
    pub fn count(&self) -> usize {
        self.shared.upgrade().map_or(0, |shared| shared.registered.get())
    }
}
