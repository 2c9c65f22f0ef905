//! This module contains a description of [`Coroutine`], [`Routine`] and [`RoutineImpl`] for working with the scheduler.
//! [`Routine`] is the resumable body, [`Coroutine`] is the handle used to observe and stop it.
use std::cell::Cell;
use std::fmt::{Debug, Display, Formatter};
use std::rc::{Rc, Weak};
use std::time::Duration;
use log::debug;
use crate::coroutine::{Condition, YieldCondition};
use crate::scheduler::manager::Shared;
use crate::time::SharedClock;

/// The id of a coroutine, unique within the manager that started it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CoroutineId(pub(crate) u64);

impl CoroutineId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl Display for CoroutineId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The lifecycle state of a coroutine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// Waiting for its pending [`YieldCondition`] (or for the next step if there is none).
    Suspended,
    /// The body is running right now.
    Resuming,
    /// The body has returned.
    Completed,
    /// The coroutine was stopped with [`Coroutine::stop`] and will never run again.
    Stopped,
    /// A condition or the body panicked. The coroutine will never run again.
    Failed,
}

impl Status {
    /// Returns `true` for [`Completed`](Status::Completed), [`Stopped`](Status::Stopped) and [`Failed`](Status::Failed).
    pub fn is_terminal(self) -> bool {
        matches!(self, Status::Completed | Status::Stopped | Status::Failed)
    }
}

struct Inner {
    id: CoroutineId,
    status: Cell<Status>,
    stop_requested: Cell<bool>,
    owner: Weak<Shared>,
}

/// A handle to one coroutine. Cloning the handle is cheap, all clones observe the same coroutine.
///
/// The handle does not own the body. The body is owned by the [`Enumerator`](crate::scheduler::Enumerator),
/// and it is dropped as soon as the coroutine reaches a terminal [`Status`].
///
/// The handle is not [`Send`]: a coroutine lives on the thread that drives its manager.
#[derive(Clone)]
pub struct Coroutine {
    inner: Rc<Inner>,
}

impl Coroutine {
    pub(crate) fn new(id: CoroutineId, owner: Weak<Shared>) -> Self {
        Self {
            inner: Rc::new(Inner {
                id,
                status: Cell::new(Status::Suspended),
                stop_requested: Cell::new(false),
                owner,
            }),
        }
    }

    pub fn id(&self) -> CoroutineId {
        self.inner.id
    }

    /// Requests the coroutine to stop. Idempotent.
    ///
    /// The request is observed at the top of the next step, code that is already running is never interrupted.
    /// Stopping a coroutine that is already over does nothing.
    pub fn stop(&self) {
        if self.is_over() || self.inner.stop_requested.replace(true) {
            return;
        }
        debug!("stop requested for coroutine {}", self.inner.id);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.inner.stop_requested.get()
    }

    /// Returns `true` once the body has completed, or the coroutine has been stopped or has failed.
    pub fn is_over(&self) -> bool {
        self.status().is_terminal()
    }

    pub fn status(&self) -> Status {
        self.inner.status.get()
    }

    pub(crate) fn set_status(&self, status: Status) {
        self.inner.status.set(status);
    }

    /// Returns `true` if the coroutine was registered by the manager `shared` belongs to.
    pub(crate) fn belongs_to(&self, shared: &Rc<Shared>) -> bool {
        std::ptr::eq(self.inner.owner.as_ptr(), Rc::as_ptr(shared))
    }
}

impl PartialEq for Coroutine {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Coroutine {}

impl Debug for Coroutine {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coroutine")
            .field("id", &self.inner.id)
            .field("status", &self.status())
            .field("stop_requested", &self.is_stop_requested())
            .finish()
    }
}

/// Waiting on a coroutine handle suspends until that coroutine is over.
impl Condition for Coroutine {
    fn is_satisfied(&mut self) -> bool {
        self.is_over()
    }
}

/// The result of one resumption of a [`Routine`].
#[derive(Debug)]
pub enum CoroutineState {
    /// The body suspended itself until the condition is satisfied.
    Yielded(YieldCondition),
    /// The body has returned.
    Complete,
}

/// What a body can see while it is resumed.
pub struct Context<'a> {
    clock: &'a SharedClock,
    coroutine: &'a Coroutine,
}

impl<'a> Context<'a> {
    pub(crate) fn new(clock: &'a SharedClock, coroutine: &'a Coroutine) -> Self {
        Self { clock, coroutine }
    }

    /// Returns the clock of the scheduler that resumes the body.
    pub fn clock(&self) -> &SharedClock {
        self.clock
    }

    pub fn now(&self) -> Duration {
        self.clock.now()
    }

    /// Returns a [`TimeElapsed`](YieldCondition::TimeElapsed) condition measured with the scheduler's clock.
    pub fn wait_for(&self, duration: Duration) -> YieldCondition {
        YieldCondition::time_elapsed(self.clock.clone(), duration)
    }

    /// Returns the handle of the running coroutine.
    pub fn coroutine(&self) -> &Coroutine {
        self.coroutine
    }
}

/// A resumable coroutine body, written as an explicit state machine.
///
/// Every call of [`resume`](Routine::resume) runs the body from its current state up to the next yield point
/// (returning [`CoroutineState::Yielded`]) or to its end (returning [`CoroutineState::Complete`]).
/// The scheduler never calls `resume` again after `Complete`.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use cotick::coroutine::{Context, CoroutineState, Routine};
///
/// struct Blink {
///     times: u32,
/// }
///
/// impl Routine for Blink {
///     fn resume(&mut self, cx: &mut Context<'_>) -> CoroutineState {
///         if self.times == 0 {
///             return CoroutineState::Complete;
///         }
///         self.times -= 1;
///         CoroutineState::Yielded(cx.wait_for(Duration::from_millis(500)))
///     }
/// }
/// ```
pub trait Routine {
    fn resume(&mut self, cx: &mut Context<'_>) -> CoroutineState;
}

/// The alias for [`Box`]<dyn [`Routine`]>.
/// The scheduler works only with this type of the bodies.
pub type RoutineImpl = Box<dyn Routine>;

impl Routine for Box<dyn Routine> {
    fn resume(&mut self, cx: &mut Context<'_>) -> CoroutineState {
        (**self).resume(cx)
    }
}

/// A [`Routine`] made of a closure. Created with [`from_fn`].
pub struct FromFn<F> {
    f: F,
}

impl<F> Routine for FromFn<F>
where
    F: FnMut(&mut Context<'_>) -> CoroutineState,
{
    fn resume(&mut self, cx: &mut Context<'_>) -> CoroutineState {
        (self.f)(cx)
    }
}

/// Creates a [`Routine`] from a closure. The closure keeps its own step index and locals in its captures.
///
/// # Example
///
/// ```
/// use cotick::coroutine::{from_fn, wait_until, CoroutineState};
///
/// let mut stage = 0;
/// let routine = from_fn(move |_cx| {
///     stage += 1;
///     match stage {
///         1 => CoroutineState::Yielded(wait_until(|| true)),
///         _ => CoroutineState::Complete,
///     }
/// });
/// # let _ = routine;
/// ```
pub fn from_fn<F>(f: F) -> FromFn<F>
where
    F: FnMut(&mut Context<'_>) -> CoroutineState,
{
    FromFn { f }
}

/// One stage of [`Steps`]. Returns the condition to suspend on, or `None` to continue with the next stage.
pub type Stage = Box<dyn FnMut(&mut Context<'_>) -> Option<YieldCondition>>;

/// A [`Routine`] made of an ordered list of stages.
///
/// A resumption runs stages one by one until a stage returns a condition. The body completes after the last stage.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use cotick::coroutine::Steps;
///
/// let routine = Steps::new()
///     .then(|_cx| {
///         println!("start");
///         None
///     })
///     .then(|cx| Some(cx.wait_for(Duration::from_secs(2))))
///     .then(|_cx| {
///         println!("two seconds later");
///         None
///     });
/// assert_eq!(routine.len(), 3);
/// ```
#[derive(Default)]
pub struct Steps {
    stages: Vec<Stage>,
    next: usize,
}

impl Steps {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a stage.
    pub fn then<F>(mut self, stage: F) -> Self
    where
        F: FnMut(&mut Context<'_>) -> Option<YieldCondition> + 'static,
    {
        self.stages.push(Box::new(stage));
        self
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl Routine for Steps {
    fn resume(&mut self, cx: &mut Context<'_>) -> CoroutineState {
        while let Some(stage) = self.stages.get_mut(self.next) {
            self.next += 1;
            if let Some(condition) = stage(cx) {
                return CoroutineState::Yielded(condition);
            }
        }
        CoroutineState::Complete
    }
}
