pub mod coroutine;
pub mod yield_condition;
pub mod yielding;

pub use coroutine::*;
pub use yield_condition::*;
pub use yielding::*;
