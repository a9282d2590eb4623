pub use errors::*;
pub use helper::*;
pub use lifecycle::*;

mod errors;
mod helper;
mod lifecycle;
