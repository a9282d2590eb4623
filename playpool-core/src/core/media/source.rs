use std::fmt::Debug;
use std::path::PathBuf;

use derive_more::Display;
use log::{debug, trace, warn};
#[cfg(any(test, feature = "testing"))]
use mockall::automock;
use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::core::media::{DrmDescriptor, MediaError, Result};
use crate::core::players::Config;

const SMOOTH_STREAMING_PATTERN: &str = r"(?i)\.isml?(/manifest(\(.+\))?)?$";

/// The content type of a media source, inferred from the media uri or an explicit media type.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContentType {
    #[display("DASH")]
    Dash,
    #[display("HLS")]
    Hls,
    #[display("SmoothStreaming")]
    SmoothStreaming,
    #[display("Progressive")]
    Progressive,
}

impl ContentType {
    /// All content types which can be inferred.
    pub fn all() -> Vec<ContentType> {
        vec![
            ContentType::Dash,
            ContentType::Hls,
            ContentType::SmoothStreaming,
            ContentType::Progressive,
        ]
    }
}

/// The media cache used by the sources of a [Config].
#[derive(Debug, Display, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[display("{:?} ({} bytes)", directory, max_bytes)]
pub struct CacheSpec {
    /// The directory in which the media data is cached
    pub directory: PathBuf,
    /// The maximum size of the cache in bytes
    pub max_bytes: u64,
}

/// A content item which can be played by a playable.
#[derive(Debug, Display, Clone, PartialEq, Eq, Hash)]
#[display("{}", uri)]
pub struct MediaItem {
    /// The uri of the content
    pub uri: Url,
    /// The explicit media type of the content, e.g. `m3u8`, which overrules the uri inference
    pub media_type: Option<String>,
    /// The content protection of the item
    pub drm: Option<DrmDescriptor>,
}

impl MediaItem {
    pub fn new(uri: Url) -> Self {
        Self {
            uri,
            media_type: None,
            drm: None,
        }
    }

    /// Parse the given uri into a new media item.
    pub fn parse(uri: &str) -> Result<Self> {
        Url::parse(uri)
            .map(Self::new)
            .map_err(|e| MediaError::InvalidUri(format!("{}, {}", uri, e)))
    }

    pub fn with_media_type<S: Into<String>>(mut self, media_type: S) -> Self {
        self.media_type = Some(media_type.into());
        self
    }

    pub fn with_drm(mut self, drm: DrmDescriptor) -> Self {
        self.drm = Some(drm);
        self
    }

    /// Verify if the content of this item is protected.
    pub fn is_protected(&self) -> bool {
        self.drm.is_some()
    }
}

/// The engine ready description of the source to load for a media item.
#[derive(Debug, Display, Clone, PartialEq)]
#[display("{} ({})", uri, content_type)]
pub struct MediaSource {
    pub uri: Url,
    pub content_type: ContentType,
    pub cache: Option<CacheSpec>,
}

/// Creates the media sources which are loaded by a player.
#[cfg_attr(any(test, feature = "testing"), automock)]
pub trait MediaSourceFactory: Debug + Send + Sync {
    /// Create the media source for the given media item.
    ///
    /// # Returns
    ///
    /// It returns [MediaError::UnsupportedContentType] when the inferred content type of the item
    /// can't be handled by this factory.
    fn create_media_source(&self, item: &MediaItem) -> Result<MediaSource>;
}

/// The default media source factory which infers the content type of a media item.
#[derive(Debug)]
pub struct DefaultMediaSourceFactory {
    cache: Option<CacheSpec>,
    supported_types: Vec<ContentType>,
    smooth_streaming_regex: Regex,
}

impl DefaultMediaSourceFactory {
    /// Create a new factory for the given config which supports all content types.
    pub fn new(config: &Config) -> Self {
        Self::with_supported_types(config, ContentType::all())
    }

    /// Create a new factory for the given config which supports only the given content types.
    pub fn with_supported_types(config: &Config, supported_types: Vec<ContentType>) -> Self {
        Self {
            cache: config.cache.clone(),
            supported_types,
            smooth_streaming_regex: Regex::new(SMOOTH_STREAMING_PATTERN)
                .expect("expected a valid smooth streaming pattern"),
        }
    }

    /// Infer the content type of the given media item.
    ///
    /// An explicit media type is handled as if it were the file extension of the content.
    pub fn infer_content_type(&self, item: &MediaItem) -> ContentType {
        let name = match item.media_type.as_ref() {
            Some(media_type) => format!(".{}", media_type.trim_start_matches('.')),
            None => item.uri.path().to_string(),
        }
        .to_lowercase();

        if name.ends_with(".mpd") {
            ContentType::Dash
        } else if name.ends_with(".m3u8") {
            ContentType::Hls
        } else if self.smooth_streaming_regex.is_match(name.as_str()) {
            ContentType::SmoothStreaming
        } else {
            ContentType::Progressive
        }
    }
}

impl MediaSourceFactory for DefaultMediaSourceFactory {
    fn create_media_source(&self, item: &MediaItem) -> Result<MediaSource> {
        let content_type = self.infer_content_type(item);
        trace!("Inferred content type {} for {}", content_type, item);
        if !self.supported_types.contains(&content_type) {
            warn!("Content type {} of {} is not supported", content_type, item);
            return Err(MediaError::UnsupportedContentType(content_type.to_string()));
        }

        let source = MediaSource {
            uri: item.uri.clone(),
            content_type,
            cache: self.cache.clone(),
        };
        debug!("Created media source {}", source);
        Ok(source)
    }
}
