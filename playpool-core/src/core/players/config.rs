use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::core::media::CacheSpec;

const DEFAULT_INITIAL_BITRATE_ESTIMATE: fn() -> u64 = || 1_000_000;
const DEFAULT_SLIDING_WINDOW_MAX_WEIGHT: fn() -> u32 = || 2000;

/// The usage of extension renderers, e.g. software decoders, by a player.
#[derive(
    Debug, Display, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
pub enum ExtensionRendererMode {
    /// Only the platform renderers are used
    #[default]
    #[display("off")]
    Off,
    /// Extension renderers are used when no platform renderer is available
    #[display("on")]
    On,
    /// Extension renderers are preferred over the platform renderers
    #[display("prefer")]
    Prefer,
}

/// The bandwidth meter shared by all players of a [Config].
#[derive(Debug, Display, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[display("{}bps/{}", initial_bitrate_estimate, sliding_window_max_weight)]
pub struct BandwidthMeterSpec {
    /// The initial bitrate estimate in bits per second
    #[serde(default = "DEFAULT_INITIAL_BITRATE_ESTIMATE")]
    pub initial_bitrate_estimate: u64,
    /// The maximum weight of the sliding bandwidth window
    #[serde(default = "DEFAULT_SLIDING_WINDOW_MAX_WEIGHT")]
    pub sliding_window_max_weight: u32,
}

impl Default for BandwidthMeterSpec {
    fn default() -> Self {
        Self {
            initial_bitrate_estimate: DEFAULT_INITIAL_BITRATE_ESTIMATE(),
            sliding_window_max_weight: DEFAULT_SLIDING_WINDOW_MAX_WEIGHT(),
        }
    }
}

/// The track quality constraints of the players of a [Config].
#[derive(Debug, Display, Default, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[display(
    "max_video_height: {:?}, max_video_bitrate: {:?}, force_lowest_bitrate: {}",
    max_video_height,
    max_video_bitrate,
    force_lowest_bitrate
)]
pub struct QualityPolicy {
    /// The maximum video height in pixels, `None` when unconstrained
    #[serde(default)]
    pub max_video_height: Option<u32>,
    /// The maximum video bitrate in bits per second, `None` when unconstrained
    #[serde(default)]
    pub max_video_bitrate: Option<u64>,
    /// Always select the lowest bitrate track
    #[serde(default)]
    pub force_lowest_bitrate: bool,
}

/// The identity of a player pool which describes how its players are built.
///
/// Configs are compared structurally, two equal configs always share the same pool
/// even when they are distinct instances.
/// The content protection isn't part of the config, it's resolved per media item.
#[derive(Debug, Display, Default, Clone, PartialEq, Eq, Hash)]
#[display(
    "extension_mode: {}, cache: {:?}, meter: {}, quality: [{}]",
    extension_mode,
    cache,
    meter,
    quality
)]
pub struct Config {
    pub extension_mode: ExtensionRendererMode,
    pub cache: Option<CacheSpec>,
    pub meter: BandwidthMeterSpec,
    pub quality: QualityPolicy,
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for the [Config].
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    extension_mode: Option<ExtensionRendererMode>,
    cache: Option<CacheSpec>,
    meter: Option<BandwidthMeterSpec>,
    quality: Option<QualityPolicy>,
}

impl ConfigBuilder {
    pub fn extension_mode(mut self, extension_mode: ExtensionRendererMode) -> Self {
        self.extension_mode = Some(extension_mode);
        self
    }

    pub fn cache(mut self, cache: CacheSpec) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn meter(mut self, meter: BandwidthMeterSpec) -> Self {
        self.meter = Some(meter);
        self
    }

    pub fn quality(mut self, quality: QualityPolicy) -> Self {
        self.quality = Some(quality);
        self
    }

    pub fn build(self) -> Config {
        Config {
            extension_mode: self.extension_mode.unwrap_or_default(),
            cache: self.cache,
            meter: self.meter.unwrap_or_default(),
            quality: self.quality.unwrap_or_default(),
        }
    }
}
