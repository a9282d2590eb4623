use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use derive_more::Display;
use log::{debug, trace, warn};

use crate::core::media::{
    DefaultMediaSourceFactory, MediaItem, MediaSourceFactory, PlaybackInfo, VolumeInfo,
};
use crate::core::playable::{Playable, PlayableError, PlayableState, Result};
use crate::core::players::{
    Config, PlaybackParameters, Player, PlayerEvent, PlayerPool, RepeatMode, Surface,
};
use crate::core::{CallbackHandle, CoreCallback, CoreCallbacks};

/// The [Playable] implementation which drives a single playback session over a pooled player.
///
/// The player is acquired from the pool on the first preparation and is returned to the pool
/// on release. The volume, repeat mode and playback parameters of the session are applied
/// to every acquired player, as the pool might hand out a player which was used by another session.
#[derive(Debug, Display)]
#[display("playable {}", media)]
pub struct PlayableHelper {
    config: Config,
    media: MediaItem,
    pool: PlayerPool,
    source_factory: Arc<dyn MediaSourceFactory>,
    state: PlayableState,
    player: Option<Player>,
    binding: Option<PlayerBinding>,
    source_loaded: bool,
    playback_info: PlaybackInfo,
    volume_info: VolumeInfo,
    parameters: PlaybackParameters,
    repeat_mode: RepeatMode,
    surface: Option<Surface>,
    events: Arc<CoreCallbacks<PlayerEvent>>,
    volume_callbacks: Arc<CoreCallbacks<VolumeInfo>>,
}

impl PlayableHelper {
    pub fn builder() -> PlayableHelperBuilder {
        PlayableHelperBuilder::default()
    }

    /// Get the config of the players used by this playable.
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn media(&self) -> &MediaItem {
        &self.media
    }

    fn ensure_not_released(&self) -> Result<()> {
        if self.state == PlayableState::Released {
            return Err(PlayableError::Released);
        }

        Ok(())
    }

    fn player(&self) -> Result<&Player> {
        self.ensure_not_released()?;
        self.player.as_ref().ok_or(PlayableError::NotPrepared)
    }

    fn player_mut(&mut self) -> Result<&mut Player> {
        self.ensure_not_released()?;
        self.player.as_mut().ok_or(PlayableError::NotPrepared)
    }

    fn ensure_player(&mut self) -> Result<()> {
        if self.player.is_some() {
            return Ok(());
        }

        let mut player = self.pool.acquire_for(&self.config, &self.media)?;
        player.set_volume_info(self.volume_info);
        player.set_repeat_mode(self.repeat_mode);
        player.set_playback_parameters(self.parameters);
        self.binding = Some(PlayerBinding::bind(
            &player,
            self.events.clone(),
            self.volume_callbacks.clone(),
        ));

        debug!("Acquired {} for {}", player, self);
        self.player = Some(player);
        Ok(())
    }

    fn ensure_source(&mut self) -> Result<()> {
        if self.source_loaded {
            return Ok(());
        }

        let source = self.source_factory.create_media_source(&self.media)?;
        let reset_position = !self.playback_info.is_non_trivial();
        self.player_mut()?.prepare(source, reset_position);
        self.source_loaded = true;
        Ok(())
    }

    fn current_playback_info(&self) -> PlaybackInfo {
        match self.player.as_ref() {
            Some(player) if self.source_loaded && player.is_current_window_seekable() => {
                PlaybackInfo::new(
                    Some(player.current_window_index()),
                    player.current_position_ms(),
                )
            }
            _ => self.playback_info,
        }
    }

    fn take_player(&mut self) -> Option<Player> {
        let player = self.player.take()?;
        if let Some(binding) = self.binding.take() {
            binding.unbind(&player);
        }
        Some(player)
    }
}

impl Playable for PlayableHelper {
    fn state(&self) -> PlayableState {
        self.state
    }

    fn prepare(&mut self, load_source: bool) -> Result<()> {
        match self.state {
            PlayableState::Released => Err(PlayableError::Released),
            PlayableState::Idle => {
                self.ensure_player()?;
                if self.playback_info.is_non_trivial() {
                    let info = self.playback_info;
                    self.player_mut()?
                        .seek_to(info.window_index, info.position_ms);
                }
                if load_source {
                    self.ensure_source()?;
                }

                self.state = PlayableState::Prepared;
                debug!("Prepared {}", self);
                Ok(())
            }
            state => {
                trace!("{} is already prepared ({})", self, state);
                Ok(())
            }
        }
    }

    fn play(&mut self) -> Result<()> {
        match self.state {
            PlayableState::Released => Err(PlayableError::Released),
            PlayableState::Idle if self.player.is_none() => Err(PlayableError::NotPrepared),
            PlayableState::Playing => Ok(()),
            PlayableState::Idle | PlayableState::Prepared | PlayableState::Paused => {
                self.ensure_source()?;
                self.player_mut()?.set_play_when_ready(true);
                self.state = PlayableState::Playing;
                debug!("Playing {}", self);
                Ok(())
            }
        }
    }

    fn pause(&mut self) -> Result<()> {
        match self.state {
            PlayableState::Released => Err(PlayableError::Released),
            PlayableState::Playing => {
                self.player_mut()?.set_play_when_ready(false);
                self.state = PlayableState::Paused;
                debug!("Paused {}", self);
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn reset(&mut self) -> Result<()> {
        self.ensure_not_released()?;
        if let Some(player) = self.player.as_mut() {
            player.set_play_when_ready(false);
            player.stop(true);
        }

        self.source_loaded = false;
        self.playback_info.reset();
        self.state = PlayableState::Idle;
        debug!("Reset {}", self);
        Ok(())
    }

    fn release(&mut self) -> Result<()> {
        self.ensure_not_released()?;
        self.playback_info = self.current_playback_info();
        self.state = PlayableState::Released;
        self.source_loaded = false;
        self.events.clear();
        self.volume_callbacks.clear();

        let surface = self.surface.take();
        if let Some(mut player) = self.take_player() {
            if surface.is_some() {
                player.set_surface(None);
            }
            player.set_play_when_ready(false);
            let outcome = self.pool.release(player, &self.config)?;
            debug!("Released {}, its player has been {}", self, outcome);
        }

        Ok(())
    }

    fn set_media(&mut self, media: MediaItem) -> Result<()> {
        match self.state {
            PlayableState::Released => Err(PlayableError::Released),
            PlayableState::Idle => {
                debug!("Updating media of {} to {}", self, media);
                let protection_changed = self.media.drm != media.drm;
                self.media = media;
                if protection_changed {
                    if let Some(player) = self.take_player() {
                        debug!("Protection of {} changed, returning {}", self, player);
                        self.pool.release(player, &self.config)?;
                    }
                }
                Ok(())
            }
            state => Err(PlayableError::InvalidState(state)),
        }
    }

    fn set_playback_info(&mut self, playback_info: PlaybackInfo) {
        self.playback_info = playback_info;
        if !playback_info.is_non_trivial() {
            return;
        }

        if let Some(player) = self.player.as_mut() {
            player.seek_to(playback_info.window_index, playback_info.position_ms);
        }
    }

    fn playback_info(&self) -> PlaybackInfo {
        self.current_playback_info()
    }

    fn set_volume_info(&mut self, volume_info: VolumeInfo) -> Result<bool> {
        let changed = self.player_mut()?.set_volume_info(volume_info);
        if changed {
            self.volume_info = volume_info;
        }
        Ok(changed)
    }

    fn volume_info(&self) -> Result<VolumeInfo> {
        Ok(self.player()?.volume_info())
    }

    fn is_playing(&self) -> Result<bool> {
        Ok(self.player()?.is_playing())
    }

    fn set_parameters(&mut self, parameters: PlaybackParameters) -> Result<()> {
        self.player_mut()?.set_playback_parameters(parameters);
        self.parameters = parameters;
        Ok(())
    }

    fn parameters(&self) -> Result<PlaybackParameters> {
        Ok(self.player()?.playback_parameters())
    }

    fn set_repeat_mode(&mut self, repeat_mode: RepeatMode) -> Result<()> {
        self.player_mut()?.set_repeat_mode(repeat_mode);
        self.repeat_mode = repeat_mode;
        Ok(())
    }

    fn repeat_mode(&self) -> Result<RepeatMode> {
        Ok(self.player()?.repeat_mode())
    }

    fn set_surface(&mut self, surface: Option<Surface>) -> Result<()> {
        self.player()?;
        if self.surface == surface {
            return Ok(());
        }

        self.player_mut()?.set_surface(surface.clone());
        debug!("Updated surface of {} to {:?}", self, surface);
        self.surface = surface;
        Ok(())
    }

    fn surface(&self) -> Option<Surface> {
        self.surface.clone()
    }

    fn add_event_callback(&mut self, callback: CoreCallback<PlayerEvent>) -> Result<CallbackHandle> {
        self.ensure_not_released()?;
        Ok(self.events.add(callback))
    }

    fn remove_event_callback(&mut self, handle: CallbackHandle) -> Result<bool> {
        self.ensure_not_released()?;
        Ok(self.events.remove(&handle))
    }

    fn add_volume_callback(&mut self, callback: CoreCallback<VolumeInfo>) -> Result<CallbackHandle> {
        self.ensure_not_released()?;
        Ok(self.volume_callbacks.add(callback))
    }

    fn remove_volume_callback(&mut self, handle: CallbackHandle) -> Result<bool> {
        self.ensure_not_released()?;
        Ok(self.volume_callbacks.remove(&handle))
    }
}

impl Drop for PlayableHelper {
    fn drop(&mut self) {
        if let Some(player) = self.take_player() {
            warn!("{} has been dropped without being released", self);
            if let Err(e) = self.pool.release(player, &self.config) {
                warn!("Failed to return the player of {}, {}", self, e);
            }
        }
    }
}

/// The forwarding of the player notifications to the callbacks of a playable.
///
/// Notifications which arrive after the binding has been detached are ignored,
/// as the player might already be owned by another session.
#[derive(Debug)]
struct PlayerBinding {
    attached: Arc<AtomicBool>,
    event_handle: CallbackHandle,
    volume_handle: CallbackHandle,
}

impl PlayerBinding {
    fn bind(
        player: &Player,
        events: Arc<CoreCallbacks<PlayerEvent>>,
        volume_callbacks: Arc<CoreCallbacks<VolumeInfo>>,
    ) -> Self {
        let attached = Arc::new(AtomicBool::new(true));

        let event_attached = attached.clone();
        let event_handle = player.add_event_callback(Box::new(move |event| {
            if event_attached.load(Ordering::Acquire) {
                events.invoke(event);
            } else {
                trace!("Ignoring stale player event {}", event);
            }
        }));
        let volume_attached = attached.clone();
        let volume_handle = player.add_volume_callback(Box::new(move |volume_info| {
            if volume_attached.load(Ordering::Acquire) {
                volume_callbacks.invoke(volume_info);
            } else {
                trace!("Ignoring stale volume change {}", volume_info);
            }
        }));

        Self {
            attached,
            event_handle,
            volume_handle,
        }
    }

    fn unbind(self, player: &Player) {
        self.attached.store(false, Ordering::Release);
        player.remove_event_callback(&self.event_handle);
        player.remove_volume_callback(&self.volume_handle);
    }
}

/// Builder for the [PlayableHelper].
#[derive(Debug, Default)]
pub struct PlayableHelperBuilder {
    config: Option<Config>,
    media: Option<MediaItem>,
    pool: Option<PlayerPool>,
    source_factory: Option<Arc<dyn MediaSourceFactory>>,
    playback_info: Option<PlaybackInfo>,
    volume_info: Option<VolumeInfo>,
    repeat_mode: Option<RepeatMode>,
}

impl PlayableHelperBuilder {
    /// Set the config of the players, defaults to [Config::default].
    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    pub fn media(mut self, media: MediaItem) -> Self {
        self.media = Some(media);
        self
    }

    pub fn pool(mut self, pool: PlayerPool) -> Self {
        self.pool = Some(pool);
        self
    }

    /// Set the factory of the media sources, defaults to a [DefaultMediaSourceFactory] of the config.
    pub fn source_factory(mut self, source_factory: Arc<dyn MediaSourceFactory>) -> Self {
        self.source_factory = Some(source_factory);
        self
    }

    /// Set the position from which the playback should resume.
    pub fn playback_info(mut self, playback_info: PlaybackInfo) -> Self {
        self.playback_info = Some(playback_info);
        self
    }

    pub fn volume_info(mut self, volume_info: VolumeInfo) -> Self {
        self.volume_info = Some(volume_info);
        self
    }

    pub fn repeat_mode(mut self, repeat_mode: RepeatMode) -> Self {
        self.repeat_mode = Some(repeat_mode);
        self
    }

    /// Build the playable helper.
    ///
    /// # Panics
    ///
    /// It panics when the media or pool has not been set.
    pub fn build(self) -> PlayableHelper {
        let config = self.config.unwrap_or_default();
        let source_factory = self
            .source_factory
            .unwrap_or_else(|| Arc::new(DefaultMediaSourceFactory::new(&config)));

        PlayableHelper {
            media: self.media.expect("expected the media to have been set"),
            pool: self.pool.expect("expected the pool to have been set"),
            source_factory,
            state: PlayableState::Idle,
            player: None,
            binding: None,
            source_loaded: false,
            playback_info: self.playback_info.unwrap_or_default(),
            volume_info: self.volume_info.unwrap_or_default(),
            parameters: PlaybackParameters::default(),
            repeat_mode: self.repeat_mode.unwrap_or_default(),
            surface: None,
            events: Arc::new(CoreCallbacks::default()),
            volume_callbacks: Arc::new(CoreCallbacks::default()),
            config,
        }
    }
}
