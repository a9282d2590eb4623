pub use callbacks::*;

pub mod drm;
pub mod media;
pub mod platform;
pub mod playable;
pub mod players;

mod callbacks;
