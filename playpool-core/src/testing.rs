use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};

use log::{trace, LevelFilter};
use log4rs::append::console::ConsoleAppender;
use log4rs::config::{Appender, Logger, Root};
use log4rs::encode::pattern::PatternEncoder;
use log4rs::Config;

use crate::core::media::MediaSource;
use crate::core::players::{
    Engine, EngineFactory, EngineRequest, EngineState, PlaybackParameters, PlayerEvent,
    RepeatMode, Result, Surface,
};
use crate::core::CoreCallbacks;

static INIT: Once = Once::new();

/// Initializes the logger with the specified log level.
#[macro_export]
macro_rules! init_logger {
    ($level:expr) => {
        $crate::testing::init_logger_level($level)
    };
    () => {
        $crate::testing::init_logger_level(log::LevelFilter::Trace)
    };
}

/// Initializes the logger with the specified log level.
pub fn init_logger_level(level: LevelFilter) {
    INIT.call_once(|| {
        log4rs::init_config(Config::builder()
            .appender(Appender::builder().build("stdout", Box::new(ConsoleAppender::builder()
                .encoder(Box::new(PatternEncoder::new("\x1B[37m{d(%Y-%m-%d %H:%M:%S%.3f)}\x1B[0m {h({l:>5.5})} \x1B[35m{I:>6.6}\x1B[0m \x1B[37m---\x1B[0m \x1B[37m[{T:>15.15}]\x1B[0m \x1B[36m{t:<60.60}\x1B[0m \x1B[37m:\x1B[0m {m}{n}")))
                .build())))
            .logger(Logger::builder().build("mockall", LevelFilter::Info))
            .build(Root::builder().appender("stdout").build(level))
            .unwrap())
            .unwrap();
    })
}

/// Records the interactions of all [StubEngine] instances which share it.
#[derive(Debug, Default)]
pub struct EngineProbe {
    constructions: AtomicUsize,
    releases: AtomicUsize,
    prepares: AtomicUsize,
    stops: AtomicUsize,
    seeks: Mutex<Vec<(Option<u32>, u64)>>,
    volumes: Mutex<Vec<f32>>,
    play_when_ready: Mutex<Vec<bool>>,
    surfaces: Mutex<Vec<Option<Surface>>>,
}

impl EngineProbe {
    /// The number of created engines.
    pub fn constructions(&self) -> usize {
        self.constructions.load(Ordering::SeqCst)
    }

    /// The number of released engines.
    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    pub fn prepares(&self) -> usize {
        self.prepares.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    pub fn seeks(&self) -> Vec<(Option<u32>, u64)> {
        self.seeks.lock().expect("failed to acquire lock").clone()
    }

    /// The linear volumes which have been applied to the engines, in order.
    pub fn volumes(&self) -> Vec<f32> {
        self.volumes.lock().expect("failed to acquire lock").clone()
    }

    pub fn play_when_ready(&self) -> Vec<bool> {
        self.play_when_ready
            .lock()
            .expect("failed to acquire lock")
            .clone()
    }

    pub fn surfaces(&self) -> Vec<Option<Surface>> {
        self.surfaces.lock().expect("failed to acquire lock").clone()
    }
}

/// An in-memory engine which becomes ready as soon as a source is prepared.
#[derive(Debug)]
pub struct StubEngine {
    probe: Arc<EngineProbe>,
    events: Arc<CoreCallbacks<PlayerEvent>>,
    play_when_ready: bool,
    state: EngineState,
    volume: f32,
    parameters: PlaybackParameters,
    repeat_mode: RepeatMode,
    window_index: u32,
    position_ms: u64,
}

impl StubEngine {
    pub fn new(probe: Arc<EngineProbe>, events: Arc<CoreCallbacks<PlayerEvent>>) -> Self {
        probe.constructions.fetch_add(1, Ordering::SeqCst);
        Self {
            probe,
            events,
            play_when_ready: false,
            state: EngineState::Idle,
            volume: 1.0,
            parameters: PlaybackParameters::default(),
            repeat_mode: RepeatMode::default(),
            window_index: 0,
            position_ms: 0,
        }
    }

    fn update_state(&mut self, state: EngineState) {
        self.state = state;
        self.publish_state();
    }

    fn publish_state(&self) {
        self.events.invoke(PlayerEvent::StateChanged {
            play_when_ready: self.play_when_ready,
            state: self.state,
        });
    }
}

impl Engine for StubEngine {
    fn prepare(&mut self, source: MediaSource, reset_position: bool) {
        trace!("Stub engine is preparing {}", source);
        self.probe.prepares.fetch_add(1, Ordering::SeqCst);
        if reset_position {
            self.window_index = 0;
            self.position_ms = 0;
        }
        self.update_state(EngineState::Buffering);
        self.update_state(EngineState::Ready);
    }

    fn set_play_when_ready(&mut self, play_when_ready: bool) {
        self.probe
            .play_when_ready
            .lock()
            .expect("failed to acquire lock")
            .push(play_when_ready);
        if self.play_when_ready != play_when_ready {
            self.play_when_ready = play_when_ready;
            self.publish_state();
        }
    }

    fn play_when_ready(&self) -> bool {
        self.play_when_ready
    }

    fn stop(&mut self, reset: bool) {
        self.probe.stops.fetch_add(1, Ordering::SeqCst);
        if reset {
            self.window_index = 0;
            self.position_ms = 0;
        }
        self.update_state(EngineState::Idle);
    }

    fn release(&mut self) {
        self.probe.releases.fetch_add(1, Ordering::SeqCst);
        self.state = EngineState::Idle;
    }

    fn set_volume(&mut self, volume: f32) {
        self.probe
            .volumes
            .lock()
            .expect("failed to acquire lock")
            .push(volume);
        self.volume = volume;
    }

    fn volume(&self) -> f32 {
        self.volume
    }

    fn set_playback_parameters(&mut self, parameters: PlaybackParameters) {
        self.parameters = parameters;
    }

    fn playback_parameters(&self) -> PlaybackParameters {
        self.parameters
    }

    fn set_repeat_mode(&mut self, repeat_mode: RepeatMode) {
        self.repeat_mode = repeat_mode;
    }

    fn repeat_mode(&self) -> RepeatMode {
        self.repeat_mode
    }

    fn seek_to(&mut self, window_index: Option<u32>, position_ms: u64) {
        self.probe
            .seeks
            .lock()
            .expect("failed to acquire lock")
            .push((window_index, position_ms));
        if let Some(window_index) = window_index {
            self.window_index = window_index;
        }
        self.position_ms = position_ms;
    }

    fn current_window_index(&self) -> u32 {
        self.window_index
    }

    fn current_position_ms(&self) -> u64 {
        self.position_ms
    }

    fn is_current_window_seekable(&self) -> bool {
        self.state != EngineState::Idle
    }

    fn playback_state(&self) -> EngineState {
        self.state
    }

    fn set_surface(&mut self, surface: Option<Surface>) {
        self.probe
            .surfaces
            .lock()
            .expect("failed to acquire lock")
            .push(surface);
    }
}

/// Creates [StubEngine] instances which all report to the same probe.
#[derive(Debug)]
pub struct StubEngineFactory {
    probe: Arc<EngineProbe>,
}

impl StubEngineFactory {
    pub fn new(probe: Arc<EngineProbe>) -> Self {
        Self { probe }
    }
}

impl EngineFactory for StubEngineFactory {
    fn create_engine(
        &self,
        request: EngineRequest,
        events: Arc<CoreCallbacks<PlayerEvent>>,
    ) -> Result<Box<dyn Engine>> {
        trace!("Creating stub engine for {:?}", request.extension_mode);
        Ok(Box::new(StubEngine::new(self.probe.clone(), events)))
    }
}
