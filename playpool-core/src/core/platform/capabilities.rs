use derive_more::Display;
use log::debug;
use serde::{Deserialize, Serialize};

const DEFAULT_DRM_SUPPORTED: fn() -> bool = || true;
const DEFAULT_PLATFORM_HINT: fn() -> u32 = || 0;
const DEFAULT_AVAILABLE_PARALLELISM: fn() -> usize = num_cpus::get;

/// The divider applied to the platform hint when sizing player pools.
const PLATFORM_HINT_DIVIDER: u32 = 6;

/// The capabilities of the platform on which players are created.
///
/// The capabilities are resolved once at startup and passed to the pool and DRM session cache,
/// instead of querying the platform throughout the playback logic.
#[derive(Debug, Display, Clone, PartialEq, Serialize, Deserialize)]
#[display(
    "drm_supported: {}, platform_hint: {}, available_parallelism: {}",
    drm_supported,
    platform_hint,
    available_parallelism
)]
pub struct Capabilities {
    /// Indicates if protected content is supported on this platform
    #[serde(default = "DEFAULT_DRM_SUPPORTED")]
    pub drm_supported: bool,
    /// The device API level or runtime hint of the platform
    #[serde(default = "DEFAULT_PLATFORM_HINT")]
    pub platform_hint: u32,
    /// The available hardware concurrency
    #[serde(default = "DEFAULT_AVAILABLE_PARALLELISM")]
    pub available_parallelism: usize,
}

impl Capabilities {
    /// Resolve the capabilities of the current runtime.
    pub fn detect() -> Self {
        let capabilities = Self::default();
        debug!("Detected platform capabilities {}", capabilities);
        capabilities
    }

    /// The maximum number of idle players which are retained per pool.
    ///
    /// It's the largest of `ceil(platform_hint / 6)` and the available parallelism, with a minimum of 1.
    pub fn pool_capacity(&self) -> usize {
        let hinted = self.platform_hint.div_ceil(PLATFORM_HINT_DIVIDER) as usize;
        hinted.max(self.available_parallelism).max(1)
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            drm_supported: DEFAULT_DRM_SUPPORTED(),
            platform_hint: DEFAULT_PLATFORM_HINT(),
            available_parallelism: DEFAULT_AVAILABLE_PARALLELISM(),
        }
    }
}
