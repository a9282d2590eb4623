pub use cache::*;
pub use errors::*;
pub use session::*;

mod cache;
mod errors;
mod session;
