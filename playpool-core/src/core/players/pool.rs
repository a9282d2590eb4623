use std::collections::{HashMap, HashSet};
use std::fmt::{Debug, Formatter};
use std::sync::{Arc, Mutex};

use derive_more::Display;
use log::{debug, error, info, trace};

use crate::core::drm::DrmSessionCache;
use crate::core::media::{DrmDescriptor, MediaItem};
use crate::core::platform::Capabilities;
use crate::core::players::{
    Config, DefaultPlayerFactory, EngineFactory, Player, PlayerError, PlayerFactory, PlayerHandle,
    Result,
};

/// The outcome of releasing a player into the pool.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// The player is retained for reuse
    #[display("pooled")]
    Pooled,
    /// The player has been destroyed, either because the pool of the config was full
    /// or because the player was built for protected content
    #[display("destroyed")]
    Destroyed,
}

/// The shared pool of idle players, keyed by their [Config].
///
/// Players are created on demand when no idle player of an equal config is available,
/// acquiring never waits for a player to become available.
/// Each config retains at most [PlayerPool::capacity] idle players.
///
/// Players of protected content are never recycled, they're always created for the content
/// and destroyed when released.
#[derive(Debug, Clone)]
pub struct PlayerPool {
    inner: Arc<InnerPlayerPool>,
}

impl PlayerPool {
    pub fn builder() -> PlayerPoolBuilder {
        PlayerPoolBuilder::default()
    }

    /// Acquire a player for the given config.
    ///
    /// It returns an idle player which has been released under an equal config when available,
    /// else a new player is created by the factory of the config.
    pub fn acquire(&self, config: &Config) -> Result<Player> {
        self.inner.acquire(config)
    }

    /// Acquire a player for the given config which is able to play the given media item.
    ///
    /// A new player is always created for protected items,
    /// else this behaves as [PlayerPool::acquire].
    pub fn acquire_for(&self, config: &Config, media: &MediaItem) -> Result<Player> {
        match media.drm.as_ref() {
            Some(drm) => self.inner.create(config, Some(drm.clone())),
            None => self.inner.acquire(config),
        }
    }

    /// Release the given player back into the pool of the given config.
    ///
    /// # Returns
    ///
    /// It returns whether the player has been pooled or destroyed.
    /// It returns [PlayerError::ConfigMismatch] when the player wasn't built for the given config,
    /// or [PlayerError::UnknownPlayer] when the player wasn't created by this pool,
    /// in which case the player is destroyed.
    pub fn release(&self, player: Player, config: &Config) -> Result<ReleaseOutcome> {
        self.inner.release(player, config)
    }

    /// Register the factory which creates the players of the given config.
    /// It replaces the factory which was previously used for the config.
    pub fn add_player_factory(&self, config: Config, factory: Arc<dyn PlayerFactory>) {
        self.inner.add_player_factory(config, factory)
    }

    /// Get the maximum number of idle players retained per config.
    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Get the number of idle players of the given config.
    pub fn idle_count(&self, config: &Config) -> usize {
        self.inner
            .pools
            .lock()
            .expect("failed to acquire lock")
            .get(config)
            .map(|e| e.len())
            .unwrap_or(0)
    }

    /// Destroy all idle players of all configs.
    pub fn clear(&self) {
        self.inner.clear()
    }
}

/// Builder for the [PlayerPool].
#[derive(Debug, Default)]
pub struct PlayerPoolBuilder {
    capabilities: Option<Capabilities>,
    engine_factory: Option<Arc<dyn EngineFactory>>,
    drm_cache: Option<Arc<DrmSessionCache>>,
}

impl PlayerPoolBuilder {
    /// Set the platform capabilities which determine the pool capacity.
    pub fn capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = Some(capabilities);
        self
    }

    /// Set the engine factory used by the default player factories.
    pub fn engine_factory(mut self, engine_factory: Arc<dyn EngineFactory>) -> Self {
        self.engine_factory = Some(engine_factory);
        self
    }

    /// Set the DRM session cache used by the default player factories.
    pub fn drm_cache(mut self, drm_cache: Arc<DrmSessionCache>) -> Self {
        self.drm_cache = Some(drm_cache);
        self
    }

    /// Build the player pool.
    ///
    /// # Panics
    ///
    /// It panics when the engine factory has not been set.
    pub fn build(self) -> PlayerPool {
        let capabilities = self.capabilities.unwrap_or_else(Capabilities::detect);
        let capacity = capabilities.pool_capacity();
        debug!("Creating player pool with capacity {}", capacity);

        PlayerPool {
            inner: Arc::new(InnerPlayerPool {
                capacity,
                engine_factory: self
                    .engine_factory
                    .expect("expected the engine factory to have been set"),
                drm_cache: self.drm_cache,
                owned: Default::default(),
                pools: Default::default(),
                factories: Default::default(),
            }),
        }
    }
}

struct InnerPlayerPool {
    capacity: usize,
    engine_factory: Arc<dyn EngineFactory>,
    drm_cache: Option<Arc<DrmSessionCache>>,
    /// The handles of all live players created by this pool
    owned: Mutex<HashSet<PlayerHandle>>,
    pools: Mutex<HashMap<Config, Vec<Player>>>,
    factories: Mutex<HashMap<Config, Arc<dyn PlayerFactory>>>,
}

impl InnerPlayerPool {
    fn acquire(&self, config: &Config) -> Result<Player> {
        let idle = self
            .pools
            .lock()
            .expect("failed to acquire lock")
            .get_mut(config)
            .and_then(|e| e.pop());
        if let Some(player) = idle {
            trace!("Reusing idle {} for config [{}]", player, config);
            return Ok(player);
        }

        self.create(config, None)
    }

    fn create(&self, config: &Config, drm: Option<DrmDescriptor>) -> Result<Player> {
        let factory = self.factory(config);
        let player = factory.create_player(drm)?;
        self.owned
            .lock()
            .expect("failed to acquire lock")
            .insert(player.handle());
        trace!("Created {} for config [{}]", player, config);
        Ok(player)
    }

    fn release(&self, mut player: Player, config: &Config) -> Result<ReleaseOutcome> {
        if !self
            .owned
            .lock()
            .expect("failed to acquire lock")
            .contains(&player.handle())
        {
            let err = PlayerError::UnknownPlayer(player.to_string());
            error!("Unable to pool {}, {}", player, err);
            player.release();
            return Err(err);
        }
        if player.config() != config {
            let err = PlayerError::ConfigMismatch {
                expected: player.config().to_string(),
                actual: config.to_string(),
            };
            error!("Unable to pool {}, {}", player, err);
            self.destroy(player);
            return Err(err);
        }
        if player.is_protected() {
            debug!("Destroying {} of protected content", player);
            self.destroy(player);
            return Ok(ReleaseOutcome::Destroyed);
        }

        player.stop(true);
        let rejected = {
            let mut pools = self.pools.lock().expect("failed to acquire lock");
            let pool = pools.entry(config.clone()).or_default();
            if pool.len() < self.capacity {
                trace!("Pooling {}, {} idle players", player, pool.len() + 1);
                pool.push(player);
                None
            } else {
                Some(player)
            }
        };

        match rejected {
            None => Ok(ReleaseOutcome::Pooled),
            Some(player) => {
                debug!("Pool of config [{}] is full, destroying {}", config, player);
                self.destroy(player);
                Ok(ReleaseOutcome::Destroyed)
            }
        }
    }

    fn destroy(&self, player: Player) {
        self.owned
            .lock()
            .expect("failed to acquire lock")
            .remove(&player.handle());
        player.release();
    }

    fn add_player_factory(&self, config: Config, factory: Arc<dyn PlayerFactory>) {
        debug!("Registering player factory {:?} for config [{}]", factory, config);
        self.factories
            .lock()
            .expect("failed to acquire lock")
            .insert(config, factory);
    }

    fn factory(&self, config: &Config) -> Arc<dyn PlayerFactory> {
        self.factories
            .lock()
            .expect("failed to acquire lock")
            .entry(config.clone())
            .or_insert_with(|| {
                Arc::new(DefaultPlayerFactory::new(
                    config.clone(),
                    self.engine_factory.clone(),
                    self.drm_cache.clone(),
                ))
            })
            .clone()
    }

    fn clear(&self) {
        let players: Vec<Player> = self
            .pools
            .lock()
            .expect("failed to acquire lock")
            .drain()
            .flat_map(|(_, players)| players)
            .collect();

        let total = players.len();
        for player in players {
            self.destroy(player);
        }
        info!("Destroyed a total of {} idle players", total);
    }
}

impl Debug for InnerPlayerPool {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InnerPlayerPool")
            .field("capacity", &self.capacity)
            .field("engine_factory", &self.engine_factory)
            .field("drm_cache", &self.drm_cache)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::media::{CacheSpec, DrmDescriptor, MediaItem};
    use crate::core::players::{MockPlayerFactory, QualityPolicy};
    use crate::init_logger;
    use crate::testing::{EngineProbe, StubEngineFactory};
    use std::path::PathBuf;
    use std::thread;

    fn capabilities(parallelism: usize) -> Capabilities {
        Capabilities {
            drm_supported: true,
            platform_hint: 0,
            available_parallelism: parallelism,
        }
    }

    fn new_pool(probe: &Arc<EngineProbe>, parallelism: usize) -> PlayerPool {
        PlayerPool::builder()
            .capabilities(capabilities(parallelism))
            .engine_factory(Arc::new(StubEngineFactory::new(probe.clone())))
            .build()
    }

    fn new_config() -> Config {
        Config::builder()
            .cache(CacheSpec {
                directory: PathBuf::from("/tmp/media"),
                max_bytes: 1024,
            })
            .quality(QualityPolicy {
                max_video_height: Some(1080),
                ..QualityPolicy::default()
            })
            .build()
    }

    mod acquire {
        use super::*;

        #[test]
        fn test_reuse_for_structurally_equal_config() {
            init_logger!();
            let probe = Arc::new(EngineProbe::default());
            let pool = new_pool(&probe, 2);
            let a = new_config();
            let b = new_config();

            let player = pool.acquire(&a).unwrap();
            let handle = player.handle();
            pool.release(player, &a).unwrap();
            let result = pool.acquire(&b).unwrap();

            assert_eq!(handle, result.handle());
            assert_eq!(1, probe.constructions());
        }

        #[test]
        fn test_distinct_configs_use_distinct_pools() {
            init_logger!();
            let probe = Arc::new(EngineProbe::default());
            let pool = new_pool(&probe, 2);
            let config = new_config();

            let player = pool.acquire(&config).unwrap();
            pool.release(player, &config).unwrap();
            let result = pool.acquire(&Config::default()).unwrap();

            assert_eq!(&Config::default(), result.config());
            assert_eq!(2, probe.constructions());
            assert_eq!(1, pool.idle_count(&config));
        }

        #[test]
        fn test_factory_failure() {
            init_logger!();
            let probe = Arc::new(EngineProbe::default());
            let pool = new_pool(&probe, 1);
            let mut factory = MockPlayerFactory::new();
            factory
                .expect_create_player()
                .returning(|_| Err(PlayerError::Engine("out of decoders".to_string())));
            pool.add_player_factory(Config::default(), Arc::new(factory));

            let result = pool.acquire(&Config::default());

            assert_eq!(
                Some(PlayerError::Engine("out of decoders".to_string())),
                result.err()
            );
        }

        #[test]
        fn test_player_factory_override() {
            init_logger!();
            let probe = Arc::new(EngineProbe::default());
            let override_probe = Arc::new(EngineProbe::default());
            let pool = new_pool(&probe, 1);
            let config = new_config();
            pool.add_player_factory(
                config.clone(),
                Arc::new(DefaultPlayerFactory::new(
                    config.clone(),
                    Arc::new(StubEngineFactory::new(override_probe.clone())),
                    None,
                )),
            );

            let _player = pool.acquire(&config).unwrap();

            assert_eq!(0, probe.constructions());
            assert_eq!(1, override_probe.constructions());
        }

        #[test]
        fn test_acquire_for_unprotected_media() {
            init_logger!();
            let probe = Arc::new(EngineProbe::default());
            let pool = new_pool(&probe, 2);
            let config = new_config();
            let media = MediaItem::parse("https://cdn.local/video.mpd").unwrap();

            let player = pool.acquire_for(&config, &media).unwrap();
            let handle = player.handle();
            pool.release(player, &config).unwrap();
            let result = pool.acquire_for(&new_config(), &media).unwrap();

            assert_eq!(handle, result.handle());
            assert_eq!(false, result.is_protected());
            assert_eq!(1, probe.constructions());
        }

        #[test]
        fn test_acquire_for_protected_media() {
            init_logger!();
            let probe = Arc::new(EngineProbe::default());
            let pool = new_pool(&probe, 2);
            let config = new_config();
            let media = MediaItem::parse("https://cdn.local/video.mpd")
                .unwrap()
                .with_drm(DrmDescriptor::new("widevine"));
            let idle = pool.acquire(&config).unwrap();
            pool.release(idle, &config).unwrap();

            let result = pool.acquire_for(&config, &media).unwrap();

            assert_eq!(Some(&DrmDescriptor::new("widevine")), result.drm());
            assert_eq!(2, probe.constructions());
            assert_eq!(1, pool.idle_count(&config));
        }
    }

    mod release {
        use super::*;

        #[test]
        fn test_release_beyond_capacity() {
            init_logger!();
            let probe = Arc::new(EngineProbe::default());
            let pool = new_pool(&probe, 3);
            let config = new_config();
            let capacity = pool.capacity();
            let players: Vec<Player> = (0..capacity + 1)
                .map(|_| pool.acquire(&config).unwrap())
                .collect();

            let outcomes: Vec<ReleaseOutcome> = players
                .into_iter()
                .map(|e| pool.release(e, &config).unwrap())
                .collect();

            assert_eq!(3, capacity);
            assert_eq!(ReleaseOutcome::Destroyed, outcomes[capacity]);
            assert_eq!(capacity, pool.idle_count(&config));
            assert_eq!(1, probe.releases());

            let _reacquired: Vec<Player> = (0..capacity)
                .map(|_| pool.acquire(&config).unwrap())
                .collect();
            assert_eq!(capacity + 1, probe.constructions());
            let _fresh = pool.acquire(&config).unwrap();
            assert_eq!(capacity + 2, probe.constructions());
        }

        #[test]
        fn test_release_config_mismatch() {
            init_logger!();
            let probe = Arc::new(EngineProbe::default());
            let pool = new_pool(&probe, 2);
            let player = pool.acquire(&new_config()).unwrap();

            let result = pool.release(player, &Config::default());

            assert!(
                matches!(result, Err(PlayerError::ConfigMismatch { .. })),
                "expected a config mismatch, got {:?} instead",
                result
            );
            assert_eq!(1, probe.releases());
            assert_eq!(0, pool.idle_count(&Config::default()));
            assert_eq!(0, pool.idle_count(&new_config()));
        }

        #[test]
        fn test_release_protected_player() {
            init_logger!();
            let probe = Arc::new(EngineProbe::default());
            let pool = new_pool(&probe, 2);
            let config = new_config();
            let media = MediaItem::parse("https://cdn.local/video.mpd")
                .unwrap()
                .with_drm(DrmDescriptor::new("widevine"));
            let player = pool.acquire_for(&config, &media).unwrap();

            let result = pool.release(player, &config).unwrap();

            assert_eq!(ReleaseOutcome::Destroyed, result);
            assert_eq!(1, probe.releases());
            assert_eq!(0, pool.idle_count(&config));
        }

        #[test]
        fn test_release_unknown_player() {
            init_logger!();
            let probe = Arc::new(EngineProbe::default());
            let pool = new_pool(&probe, 2);
            let other_pool = new_pool(&probe, 2);
            let config = new_config();
            let player = other_pool.acquire(&config).unwrap();

            let result = pool.release(player, &config);

            assert!(
                matches!(result, Err(PlayerError::UnknownPlayer(_))),
                "expected an unknown player error, got {:?} instead",
                result
            );
            assert_eq!(1, probe.releases());
            assert_eq!(0, pool.idle_count(&config));
        }

        #[test]
        fn test_release_stops_player() {
            init_logger!();
            let probe = Arc::new(EngineProbe::default());
            let pool = new_pool(&probe, 2);
            let config = new_config();
            let player = pool.acquire(&config).unwrap();

            let result = pool.release(player, &config).unwrap();

            assert_eq!(ReleaseOutcome::Pooled, result);
            assert_eq!(1, probe.stops());
            assert_eq!(0, probe.releases());
        }
    }

    #[test]
    fn test_clear() {
        init_logger!();
        let probe = Arc::new(EngineProbe::default());
        let pool = new_pool(&probe, 2);
        let config = new_config();
        let first = pool.acquire(&config).unwrap();
        let second = pool.acquire(&Config::default()).unwrap();
        pool.release(first, &config).unwrap();
        pool.release(second, &Config::default()).unwrap();

        pool.clear();

        assert_eq!(2, probe.releases());
        assert_eq!(0, pool.idle_count(&config));
    }

    #[test]
    fn test_concurrent_acquire_release() {
        init_logger!();
        let probe = Arc::new(EngineProbe::default());
        let pool = new_pool(&probe, 2);
        let configs = vec![new_config(), Config::default()];

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let pool = pool.clone();
                let config = configs[i % configs.len()].clone();
                thread::spawn(move || {
                    for _ in 0..25 {
                        let player = pool.acquire(&config).unwrap();
                        pool.release(player, &config).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        for config in &configs {
            assert!(pool.idle_count(config) <= pool.capacity());
        }
        let idle: usize = configs.iter().map(|e| pool.idle_count(e)).sum();
        assert_eq!(probe.constructions() - probe.releases(), idle);
    }
}
