use std::fmt::Debug;

use derive_more::Display;
#[cfg(any(test, feature = "testing"))]
use mockall::automock;

use crate::core::media::{MediaItem, PlaybackInfo, VolumeInfo};
use crate::core::playable::Result;
use crate::core::players::{PlaybackParameters, PlayerEvent, RepeatMode, Surface};
use crate::core::{CallbackHandle, CoreCallback};

/// The lifecycle state of a playable.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum PlayableState {
    /// No media is being played, a player might still be owned after a reset
    #[display("idle")]
    Idle,
    #[display("prepared")]
    Prepared,
    #[display("playing")]
    Playing,
    #[display("paused")]
    Paused,
    /// The playable has returned its player and can't be used anymore
    #[display("released")]
    Released,
}

/// The lifecycle of a single playback session over a pooled player.
///
/// The session moves from `Idle` to `Prepared`, from which it can be played and paused.
/// A reset moves the session back to `Idle` while keeping its player,
/// a release returns the player to the pool and ends the session.
#[cfg_attr(any(test, feature = "testing"), automock)]
pub trait Playable: Debug + Send {
    /// Get the current lifecycle state.
    fn state(&self) -> PlayableState;

    /// Prepare the playable, acquiring a player when none is owned yet.
    /// The media source is only loaded when `load_source` is `true`.
    ///
    /// Preparing an already prepared playable has no effect.
    fn prepare(&mut self, load_source: bool) -> Result<()>;

    /// Start or resume the playback, loading the media source when this didn't happen yet.
    ///
    /// A session which still owns a player after a reset can be played without a new preparation.
    fn play(&mut self) -> Result<()>;

    fn pause(&mut self) -> Result<()>;

    /// Move back to the idle state while keeping the owned player and registered callbacks.
    ///
    /// The engine is stopped with a position reset, so the playback info is cleared as well
    /// instead of keeping the last captured position. The volume info is left untouched.
    fn reset(&mut self) -> Result<()>;

    /// Release the playable and return its player to the pool.
    fn release(&mut self) -> Result<()>;

    /// Replace the media item, which is only allowed while idle.
    fn set_media(&mut self, media: MediaItem) -> Result<()>;

    fn set_playback_info(&mut self, playback_info: PlaybackInfo);

    fn playback_info(&self) -> PlaybackInfo;

    /// Update the volume info of the owned player.
    ///
    /// It returns `true` when the volume info has been changed, else `false`.
    fn set_volume_info(&mut self, volume_info: VolumeInfo) -> Result<bool>;

    fn volume_info(&self) -> Result<VolumeInfo>;

    fn is_playing(&self) -> Result<bool>;

    fn set_parameters(&mut self, parameters: PlaybackParameters) -> Result<()>;

    fn parameters(&self) -> Result<PlaybackParameters>;

    fn set_repeat_mode(&mut self, repeat_mode: RepeatMode) -> Result<()>;

    fn repeat_mode(&self) -> Result<RepeatMode>;

    /// Attach the given rendering surface, or detach the current one when `None`.
    fn set_surface(&mut self, surface: Option<Surface>) -> Result<()>;

    fn surface(&self) -> Option<Surface>;

    /// Register a callback for the player notifications.
    /// Callbacks should be registered before preparing to observe the preparation notifications.
    fn add_event_callback(&mut self, callback: CoreCallback<PlayerEvent>) -> Result<CallbackHandle>;

    fn remove_event_callback(&mut self, handle: CallbackHandle) -> Result<bool>;

    fn add_volume_callback(&mut self, callback: CoreCallback<VolumeInfo>) -> Result<CallbackHandle>;

    fn remove_volume_callback(&mut self, handle: CallbackHandle) -> Result<bool>;
}
