use std::sync::Arc;

use derive_more::Display;
use fx_handle::Handle;
use log::{debug, trace};

use crate::core::drm::DrmSessionManager;
use crate::core::media::{DrmDescriptor, MediaSource, VolumeInfo};
use crate::core::players::{
    Config, Engine, EngineState, PlaybackParameters, PlayerEvent, RepeatMode, Surface,
};
use crate::core::{CallbackHandle, CoreCallback, CoreCallbacks};

/// The unique identifier of a player instance.
pub type PlayerHandle = Handle;

/// A media engine instance which is bound to the [Config] it was built for.
///
/// A player is exclusively owned by either the pool or a single playback session.
/// Its engine is torn down on [Player::release] or when the player is dropped.
#[derive(Debug, Display)]
#[display("player {}", handle)]
pub struct Player {
    handle: PlayerHandle,
    config: Config,
    engine: Box<dyn Engine>,
    drm: Option<DrmDescriptor>,
    drm_session_manager: Option<Arc<dyn DrmSessionManager>>,
    volume_info: VolumeInfo,
    events: Arc<CoreCallbacks<PlayerEvent>>,
    volume_callbacks: CoreCallbacks<VolumeInfo>,
    released: bool,
}

impl Player {
    /// Create a new player for the given engine.
    ///
    /// The `events` must be the registry into which the engine publishes its notifications.
    pub fn new(
        config: Config,
        mut engine: Box<dyn Engine>,
        events: Arc<CoreCallbacks<PlayerEvent>>,
    ) -> Self {
        let volume_info = VolumeInfo::default();
        engine.set_volume(volume_info.effective_volume());

        Self {
            handle: PlayerHandle::new(),
            config,
            engine,
            drm: None,
            drm_session_manager: None,
            volume_info,
            events,
            volume_callbacks: CoreCallbacks::default(),
            released: false,
        }
    }

    /// Mark the player as built for the protected content of the given descriptor.
    ///
    /// The session manager is absent when the protection couldn't be resolved,
    /// the player is still bound to the protected content in that case.
    pub fn with_drm(
        mut self,
        drm: DrmDescriptor,
        drm_session_manager: Option<Arc<dyn DrmSessionManager>>,
    ) -> Self {
        self.drm = Some(drm);
        self.drm_session_manager = drm_session_manager;
        self
    }

    pub fn handle(&self) -> PlayerHandle {
        self.handle.clone()
    }

    /// Get the config this player was built for.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the descriptor of the protected content this player was built for.
    pub fn drm(&self) -> Option<&DrmDescriptor> {
        self.drm.as_ref()
    }

    /// Verify if this player was built for protected content.
    pub fn is_protected(&self) -> bool {
        self.drm.is_some()
    }

    pub fn drm_session_manager(&self) -> Option<&Arc<dyn DrmSessionManager>> {
        self.drm_session_manager.as_ref()
    }

    pub fn volume_info(&self) -> VolumeInfo {
        self.volume_info
    }

    /// Update the volume info of the player.
    ///
    /// The effective volume is applied to the engine and the volume callbacks are invoked
    /// when the info differs from the current one.
    ///
    /// It returns `true` when the volume info has been changed, else `false`.
    pub fn set_volume_info(&mut self, volume_info: VolumeInfo) -> bool {
        if self.volume_info == volume_info {
            trace!("Volume info of {} is already {}", self, volume_info);
            return false;
        }

        self.volume_info = volume_info;
        self.engine.set_volume(volume_info.effective_volume());
        debug!("Updated volume info of {} to {}", self, volume_info);
        self.volume_callbacks.invoke(volume_info);
        true
    }

    pub fn add_volume_callback(&self, callback: CoreCallback<VolumeInfo>) -> CallbackHandle {
        self.volume_callbacks.add(callback)
    }

    pub fn remove_volume_callback(&self, handle: &CallbackHandle) -> bool {
        self.volume_callbacks.remove(handle)
    }

    /// Register a callback for the notifications of the engine.
    /// The callback might be invoked on an arbitrary thread.
    pub fn add_event_callback(&self, callback: CoreCallback<PlayerEvent>) -> CallbackHandle {
        self.events.add(callback)
    }

    pub fn remove_event_callback(&self, handle: &CallbackHandle) -> bool {
        self.events.remove(handle)
    }

    pub fn prepare(&mut self, source: MediaSource, reset_position: bool) {
        debug!("Preparing {} with {}", self, source);
        self.engine.prepare(source, reset_position)
    }

    pub fn set_play_when_ready(&mut self, play_when_ready: bool) {
        self.engine.set_play_when_ready(play_when_ready)
    }

    pub fn play_when_ready(&self) -> bool {
        self.engine.play_when_ready()
    }

    /// Verify if the player is actually playing, which is when it should play and is ready to do so.
    pub fn is_playing(&self) -> bool {
        self.engine.play_when_ready() && self.engine.playback_state() == EngineState::Ready
    }

    pub fn stop(&mut self, reset: bool) {
        self.engine.stop(reset)
    }

    pub fn set_playback_parameters(&mut self, parameters: PlaybackParameters) {
        self.engine.set_playback_parameters(parameters)
    }

    pub fn playback_parameters(&self) -> PlaybackParameters {
        self.engine.playback_parameters()
    }

    pub fn set_repeat_mode(&mut self, repeat_mode: RepeatMode) {
        self.engine.set_repeat_mode(repeat_mode)
    }

    pub fn repeat_mode(&self) -> RepeatMode {
        self.engine.repeat_mode()
    }

    pub fn seek_to(&mut self, window_index: Option<u32>, position_ms: u64) {
        trace!(
            "Seeking {} to window {:?} at {}ms",
            self,
            window_index,
            position_ms
        );
        self.engine.seek_to(window_index, position_ms)
    }

    pub fn current_window_index(&self) -> u32 {
        self.engine.current_window_index()
    }

    pub fn current_position_ms(&self) -> u64 {
        self.engine.current_position_ms()
    }

    pub fn is_current_window_seekable(&self) -> bool {
        self.engine.is_current_window_seekable()
    }

    pub fn playback_state(&self) -> EngineState {
        self.engine.playback_state()
    }

    pub fn set_surface(&mut self, surface: Option<Surface>) {
        self.engine.set_surface(surface)
    }

    /// Release the player and tear down its engine.
    pub fn release(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        if self.released {
            return;
        }

        self.released = true;
        self.events.clear();
        self.volume_callbacks.clear();
        self.engine.release();
        debug!("Released {}", self);
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::players::MockEngine;
    use crate::init_logger;
    use crate::testing::{EngineProbe, StubEngine};
    use std::sync::mpsc::channel;
    use std::time::Duration;

    fn new_player(probe: &Arc<EngineProbe>) -> Player {
        let events = Arc::new(CoreCallbacks::default());
        Player::new(
            Config::default(),
            Box::new(StubEngine::new(probe.clone(), events.clone())),
            events,
        )
    }

    mod set_volume_info {
        use super::*;

        #[test]
        fn test_mute_keeps_volume_level() {
            init_logger!();
            let probe = Arc::new(EngineProbe::default());
            let mut player = new_player(&probe);

            assert_eq!(true, player.set_volume_info(VolumeInfo::new(true, 0.7)));
            assert_eq!(true, player.set_volume_info(VolumeInfo::new(false, 0.7)));

            assert_eq!(vec![1.0, 0.0, 0.7], probe.volumes());
            assert_eq!(0.7, player.volume_info().volume());
        }

        #[test]
        fn test_unchanged_volume_info() {
            init_logger!();
            let (tx, rx) = channel();
            let probe = Arc::new(EngineProbe::default());
            let mut player = new_player(&probe);
            player.add_volume_callback(Box::new(move |e| tx.send(e).unwrap()));

            let result = player.set_volume_info(VolumeInfo::default());

            assert_eq!(false, result);
            assert!(
                rx.recv_timeout(Duration::from_millis(50)).is_err(),
                "expected no volume notification"
            );
        }

        #[test]
        fn test_notify_volume_callbacks() {
            init_logger!();
            let (tx, rx) = channel();
            let probe = Arc::new(EngineProbe::default());
            let mut player = new_player(&probe);
            player.add_volume_callback(Box::new(move |e| tx.send(e).unwrap()));

            player.set_volume_info(VolumeInfo::new(false, 0.25));

            let result = rx.recv_timeout(Duration::from_millis(50)).unwrap();
            assert_eq!(VolumeInfo::new(false, 0.25), result);
        }
    }

    mod release {
        use super::*;

        #[test]
        fn test_release() {
            init_logger!();
            let probe = Arc::new(EngineProbe::default());
            let player = new_player(&probe);

            player.release();

            assert_eq!(1, probe.releases());
        }

        #[test]
        fn test_drop_releases_engine_once() {
            init_logger!();
            let mut engine = MockEngine::new();
            engine.expect_set_volume().return_const(());
            engine.expect_release().times(1).return_const(());
            let events = Arc::new(CoreCallbacks::default());
            let player = Player::new(Config::default(), Box::new(engine), events.clone());
            player.add_event_callback(Box::new(|_| {}));

            drop(player);

            assert_eq!(true, events.is_empty());
        }
    }

    #[test]
    fn test_is_playing() {
        init_logger!();
        let probe = Arc::new(EngineProbe::default());
        let mut player = new_player(&probe);

        player.set_play_when_ready(true);
        assert_eq!(false, player.is_playing());

        player.prepare(
            MediaSource {
                uri: url::Url::parse("https://cdn.local/video.mp4").unwrap(),
                content_type: crate::core::media::ContentType::Progressive,
                cache: None,
            },
            true,
        );
        assert_eq!(true, player.is_playing());
    }
}
