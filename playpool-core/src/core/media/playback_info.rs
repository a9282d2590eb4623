use derive_more::Display;
use serde::{Deserialize, Serialize};

/// The resumable position within a media source.
#[derive(Debug, Display, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[display("window_index: {:?}, position_ms: {}", window_index, position_ms)]
pub struct PlaybackInfo {
    /// The window to resume, `None` when the window is unset
    pub window_index: Option<u32>,
    /// The resume offset within the window in millis
    pub position_ms: u64,
}

impl PlaybackInfo {
    pub fn new(window_index: Option<u32>, position_ms: u64) -> Self {
        Self {
            window_index,
            position_ms,
        }
    }

    /// Verify if this playback info describes an actual resume position.
    /// Only non-trivial playback info is applied to a player.
    pub fn is_non_trivial(&self) -> bool {
        self.window_index.is_some() || self.position_ms > 0
    }

    /// Reset the playback info to the unset state.
    pub fn reset(&mut self) {
        self.window_index = None;
        self.position_ms = 0;
    }
}
