use derive_more::Display;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The UUID of the Widevine DRM scheme.
pub const WIDEVINE_UUID: Uuid = Uuid::from_u128(0xedef8ba9_79d6_4ace_a3c8_27dcd51d21ed);
/// The UUID of the PlayReady DRM scheme.
pub const PLAYREADY_UUID: Uuid = Uuid::from_u128(0x9a04f079_9840_4286_ab92_e65be0885f95);
/// The UUID of the ClearKey DRM scheme.
pub const CLEARKEY_UUID: Uuid = Uuid::from_u128(0xe2719d58_a985_b3c9_781a_b030af78d30e);

/// Identifies the content protection scheme of a media item and its license parameters.
///
/// Descriptors are totally ordered and hashable, so they can be used as cache keys.
#[derive(
    Debug, Display, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[display("{}", scheme_type)]
pub struct DrmDescriptor {
    /// The DRM scheme type, e.g. `widevine` or a scheme UUID
    pub scheme_type: String,
    /// The license server url
    pub license_url: Option<String>,
    /// The flat list of key request properties, alternating name and value
    pub key_request_properties: Vec<String>,
    /// Indicates if multiple sessions may be opened for the content
    pub multi_session: bool,
}

impl DrmDescriptor {
    pub fn new<S: Into<String>>(scheme_type: S) -> Self {
        Self {
            scheme_type: scheme_type.into(),
            license_url: None,
            key_request_properties: vec![],
            multi_session: false,
        }
    }

    pub fn with_license_url<S: Into<String>>(mut self, license_url: S) -> Self {
        self.license_url = Some(license_url.into());
        self
    }

    pub fn with_key_request_properties(mut self, properties: Vec<String>) -> Self {
        self.key_request_properties = properties;
        self
    }

    pub fn with_multi_session(mut self, multi_session: bool) -> Self {
        self.multi_session = multi_session;
        self
    }

    /// Resolve the scheme UUID of this descriptor.
    ///
    /// It returns `None` when the scheme type is neither a known scheme name nor a valid UUID.
    pub fn scheme_uuid(&self) -> Option<Uuid> {
        match self.scheme_type.to_lowercase().as_str() {
            "widevine" => Some(WIDEVINE_UUID),
            "playready" => Some(PLAYREADY_UUID),
            "clearkey" => Some(CLEARKEY_UUID),
            e => Uuid::parse_str(e).ok(),
        }
    }

    /// Get the key request properties as ordered `(name, value)` pairs.
    /// A trailing unpaired entry is dropped.
    pub fn key_request_headers(&self) -> Vec<(String, String)> {
        self.key_request_properties
            .iter()
            .cloned()
            .tuples::<(String, String)>()
            .collect()
    }
}
