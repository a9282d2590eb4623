pub use drm::*;
pub use errors::*;
pub use playback_info::*;
pub use source::*;
pub use volume::*;

mod drm;
mod errors;
mod playback_info;
mod source;
mod volume;
