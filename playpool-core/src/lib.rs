/// The current version of the player pool core.
pub const VERSION: &str = "0.1.0";

pub mod core;

#[cfg(any(test, feature = "testing"))]
pub mod testing;
