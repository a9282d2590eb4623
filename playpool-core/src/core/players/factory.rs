use std::fmt::Debug;
use std::sync::Arc;

use log::{debug, warn};
#[cfg(any(test, feature = "testing"))]
use mockall::automock;

use crate::core::drm::{DrmSessionCache, DrmSessionManager};
use crate::core::media::DrmDescriptor;
use crate::core::players::{
    Config, EngineFactory, EngineRequest, LoadControl, Player, Result, TrackSelectorParameters,
};
use crate::core::CoreCallbacks;

/// Builds new players which are bound to a single [Config].
#[cfg_attr(any(test, feature = "testing"), automock)]
pub trait PlayerFactory: Debug + Send + Sync {
    /// Create a new player for content protected by the given descriptor,
    /// or for unprotected content when the descriptor is absent.
    ///
    /// # Returns
    ///
    /// It returns the new player, or a [crate::core::players::PlayerError] when the engine
    /// couldn't be created.
    fn create_player(&self, drm: Option<DrmDescriptor>) -> Result<Player>;
}

/// The default player factory which assembles the engine from the [Config] policies.
#[derive(Debug)]
pub struct DefaultPlayerFactory {
    config: Config,
    engine_factory: Arc<dyn EngineFactory>,
    drm_cache: Option<Arc<DrmSessionCache>>,
}

impl DefaultPlayerFactory {
    pub fn new(
        config: Config,
        engine_factory: Arc<dyn EngineFactory>,
        drm_cache: Option<Arc<DrmSessionCache>>,
    ) -> Self {
        Self {
            config,
            engine_factory,
            drm_cache,
        }
    }

    fn session_manager(&self, drm: Option<&DrmDescriptor>) -> Option<Arc<dyn DrmSessionManager>> {
        match (drm, self.drm_cache.as_ref()) {
            (Some(descriptor), Some(cache)) => cache.session_manager(Some(descriptor)),
            (Some(descriptor), None) => {
                warn!(
                    "Unable to protect the player for {}, no session cache available",
                    descriptor
                );
                None
            }
            (None, _) => None,
        }
    }
}

impl PlayerFactory for DefaultPlayerFactory {
    fn create_player(&self, drm: Option<DrmDescriptor>) -> Result<Player> {
        let drm_session_manager = self.session_manager(drm.as_ref());
        let request = EngineRequest {
            extension_mode: self.config.extension_mode,
            track_selector: TrackSelectorParameters::from(&self.config.quality),
            load_control: LoadControl::default(),
            meter: self.config.meter.clone(),
            cache: self.config.cache.clone(),
            drm_session_manager: drm_session_manager.clone(),
        };
        let events = Arc::new(CoreCallbacks::default());
        let engine = self.engine_factory.create_engine(request, events.clone())?;
        let mut player = Player::new(self.config.clone(), engine, events);
        if let Some(drm) = drm {
            player = player.with_drm(drm, drm_session_manager);
        }

        debug!("Created new {} for config [{}]", player, self.config);
        Ok(player)
    }
}
