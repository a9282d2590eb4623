pub use config::*;
pub use engine::*;
pub use errors::*;
pub use factory::*;
pub use player::*;
pub use pool::*;

mod config;
mod engine;
mod errors;
mod factory;
mod player;
mod pool;
