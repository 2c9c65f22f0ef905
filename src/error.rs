//! This module contains the [`Error`] type returned by the scheduler.
//!
//! User code (conditions and bodies) reports failure by panicking. The scheduler isolates the panic,
//! marks the offending coroutine as [`Failed`](crate::coroutine::Status::Failed) and converts the panic into an [`Error`].
use crate::coroutine::CoroutineId;

/// The error type of the crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A [`YieldCondition`](crate::coroutine::YieldCondition) panicked while it was polled.
    #[error("coroutine {id} failed while polling its yield condition: {message}")]
    ConditionPanicked { id: CoroutineId, message: String },

    /// The body of the coroutine panicked while it was resumed.
    #[error("coroutine {id} failed while resuming: {message}")]
    BodyPanicked { id: CoroutineId, message: String },

    /// One or more coroutines failed during a single [`step_all`](crate::scheduler::CoroutineManager::step_all) pass.
    #[error("{} coroutine(s) failed during the tick", .0.len())]
    Failures(Vec<Error>),

    /// The manager has been dropped.
    #[error("the coroutine manager has been dropped")]
    Closed,

    /// A configuration value is out of range.
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

impl Error {
    /// Returns the id of the failed coroutine, if the error belongs to exactly one coroutine.
    pub fn coroutine_id(&self) -> Option<CoroutineId> {
        match self {
            Error::ConditionPanicked { id, .. } | Error::BodyPanicked { id, .. } => Some(*id),
            Error::Failures(_) | Error::Closed | Error::InvalidConfig(_) => None,
        }
    }

    /// Returns the individual failures. A single failure is returned as a one-element slice.
    pub fn failures(&self) -> &[Error] {
        match self {
            Error::Failures(errors) => errors,
            other => std::slice::from_ref(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
