pub mod enumerator;
pub mod injector;
pub mod manager;

pub use enumerator::*;
pub use injector::Injector;
pub use manager::{CoroutineManager, Spawner};
