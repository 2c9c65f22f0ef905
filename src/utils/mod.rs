pub mod core;
pub mod panic;

pub use self::core::*;
pub use panic::*;
