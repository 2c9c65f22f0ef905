//! A single-threaded cooperative coroutine scheduler for fixed-rate control loops.
//!
//! Coroutine bodies are explicit state machines ([`Routine`](coroutine::Routine)) that suspend on a
//! [`YieldCondition`](coroutine::YieldCondition). A [`CoroutineManager`] advances every body at most once per tick,
//! and the external loop (for example [`run`]) calls [`step_all`](CoroutineManager::step_all) once per tick.
//!
//! Time based waits inside a body should be built with [`Context::wait_for`](coroutine::Context::wait_for),
//! which measures on the manager's [`Clock`](time::Clock). The free [`wait_for`](coroutine::wait_for)
//! always measures wall time, even when the manager runs on a [`ManualClock`](time::ManualClock).

pub mod coroutine;
pub mod macros;
pub mod scheduler;
pub mod time;
pub mod cfg;
pub mod run;
pub mod utils;
pub mod error;

pub use error::{Error, Result};
pub use scheduler::{CoroutineManager, Enumerator, Injector, Spawner};
pub use run::*;
