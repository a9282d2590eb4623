use std::fmt::Debug;
use std::sync::Arc;

use derive_more::Display;
#[cfg(any(test, feature = "testing"))]
use mockall::automock;
use serde::{Deserialize, Serialize};

use crate::core::drm::DrmSessionManager;
use crate::core::media::{CacheSpec, MediaSource};
use crate::core::players::{BandwidthMeterSpec, ExtensionRendererMode, QualityPolicy, Result};
use crate::core::CoreCallbacks;

/// The playback state reported by an engine.
#[derive(Debug, Display, Default, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// No media is loaded
    #[default]
    #[display("idle")]
    Idle,
    /// Media is loaded but not enough data is available to play
    #[display("buffering")]
    Buffering,
    /// The engine can immediately play from the current position
    #[display("ready")]
    Ready,
    /// The media has been played till the end
    #[display("ended")]
    Ended,
}

/// The repeat mode of an engine.
#[derive(
    Debug, Display, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
pub enum RepeatMode {
    #[default]
    #[display("off")]
    Off,
    #[display("one")]
    One,
    #[display("all")]
    All,
}

/// The speed and pitch of the playback.
#[derive(Debug, Display, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[display("speed: {}, pitch: {}", speed, pitch)]
pub struct PlaybackParameters {
    pub speed: f32,
    pub pitch: f32,
}

impl PlaybackParameters {
    pub fn new(speed: f32, pitch: f32) -> Self {
        Self { speed, pitch }
    }
}

impl Default for PlaybackParameters {
    fn default() -> Self {
        Self {
            speed: 1.0,
            pitch: 1.0,
        }
    }
}

/// The rendering surface on which an engine draws its video output.
#[derive(Debug, Display, Clone, PartialEq, Eq, Hash)]
#[display("surface {}", id)]
pub struct Surface {
    pub id: u64,
}

impl Surface {
    pub fn new(id: u64) -> Self {
        Self { id }
    }
}

/// The buffering policy of an engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadControl {
    pub min_buffer_ms: u32,
    pub max_buffer_ms: u32,
    pub buffer_for_playback_ms: u32,
    pub buffer_for_playback_after_rebuffer_ms: u32,
}

impl Default for LoadControl {
    fn default() -> Self {
        Self {
            min_buffer_ms: 50_000,
            max_buffer_ms: 50_000,
            buffer_for_playback_ms: 2_500,
            buffer_for_playback_after_rebuffer_ms: 5_000,
        }
    }
}

/// The track selection parameters of an engine.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TrackSelectorParameters {
    pub max_video_height: Option<u32>,
    pub max_video_bitrate: Option<u64>,
    pub force_lowest_bitrate: bool,
}

impl From<&QualityPolicy> for TrackSelectorParameters {
    fn from(value: &QualityPolicy) -> Self {
        Self {
            max_video_height: value.max_video_height,
            max_video_bitrate: value.max_video_bitrate,
            force_lowest_bitrate: value.force_lowest_bitrate,
        }
    }
}

/// The assembled parameters for constructing a new engine.
#[derive(Debug, Clone)]
pub struct EngineRequest {
    pub extension_mode: ExtensionRendererMode,
    pub track_selector: TrackSelectorParameters,
    pub load_control: LoadControl,
    pub meter: BandwidthMeterSpec,
    pub cache: Option<CacheSpec>,
    pub drm_session_manager: Option<Arc<dyn DrmSessionManager>>,
}

/// The notifications published by an engine.
/// These notifications might arrive on an arbitrary thread.
#[derive(Debug, Display, Clone, PartialEq)]
pub enum PlayerEvent {
    #[display("state changed to {} (play when ready {})", state, play_when_ready)]
    StateChanged {
        play_when_ready: bool,
        state: EngineState,
    },
    #[display("error {}", _0)]
    Error(String),
    #[display("rendered first frame")]
    RenderedFirstFrame,
    #[display("video size changed to {}x{}", width, height)]
    VideoSizeChanged { width: u32, height: u32 },
}

/// The media engine which decodes and renders a single media source at a time.
#[cfg_attr(any(test, feature = "testing"), automock)]
pub trait Engine: Debug + Send {
    /// Load the given media source.
    fn prepare(&mut self, source: MediaSource, reset_position: bool);

    fn set_play_when_ready(&mut self, play_when_ready: bool);

    fn play_when_ready(&self) -> bool;

    /// Stop the playback, releasing the loaded media source when `reset` is `true`.
    fn stop(&mut self, reset: bool);

    /// Release all resources of the engine, the engine can't be used afterward.
    fn release(&mut self);

    /// Set the linear output volume within the range `[0, 1]`.
    fn set_volume(&mut self, volume: f32);

    fn volume(&self) -> f32;

    fn set_playback_parameters(&mut self, parameters: PlaybackParameters);

    fn playback_parameters(&self) -> PlaybackParameters;

    fn set_repeat_mode(&mut self, repeat_mode: RepeatMode);

    fn repeat_mode(&self) -> RepeatMode;

    /// Seek to the position within the given window, or within the current window when `None`.
    fn seek_to(&mut self, window_index: Option<u32>, position_ms: u64);

    fn current_window_index(&self) -> u32;

    fn current_position_ms(&self) -> u64;

    fn is_current_window_seekable(&self) -> bool;

    fn playback_state(&self) -> EngineState;

    /// Attach the given rendering surface, or detach the current one when `None`.
    fn set_surface(&mut self, surface: Option<Surface>);
}

/// Creates new media engine instances.
#[cfg_attr(any(test, feature = "testing"), automock)]
pub trait EngineFactory: Debug + Send + Sync {
    /// Create a new engine for the given request.
    /// The engine publishes its notifications to the given `events`.
    fn create_engine(
        &self,
        request: EngineRequest,
        events: Arc<CoreCallbacks<PlayerEvent>>,
    ) -> Result<Box<dyn Engine>>;
}
