use std::fmt::Debug;
use std::sync::Arc;

use derive_more::Display;
#[cfg(any(test, feature = "testing"))]
use mockall::automock;
use uuid::Uuid;

use crate::core::drm::DrmBuildError;

/// A constructed session manager of a protection scheme.
/// The session manager is shared between all players which play content of the same descriptor.
#[cfg_attr(any(test, feature = "testing"), automock)]
pub trait DrmSessionManager: Debug + Send + Sync {
    /// Get the scheme UUID which is handled by this session manager.
    fn scheme(&self) -> Uuid;

    /// Verify if the session manager allows multiple sessions for the content.
    fn is_multi_session(&self) -> bool;
}

/// The parameters for constructing a new [DrmSessionManager].
#[derive(Debug, Display, Clone, PartialEq)]
#[display("{}", scheme)]
pub struct DrmSessionRequest {
    /// The resolved scheme UUID
    pub scheme: Uuid,
    /// The license server url
    pub license_url: Option<String>,
    /// The ordered key request headers as `(name, value)` pairs
    pub key_request_headers: Vec<(String, String)>,
    /// Indicates if multiple sessions may be opened
    pub multi_session: bool,
}

/// The media engine primitive which constructs protection session managers.
#[cfg_attr(any(test, feature = "testing"), automock)]
pub trait DrmSessionBuilder: Debug + Send + Sync {
    /// Build a new session manager for the given request.
    ///
    /// # Returns
    ///
    /// It returns the session manager, or a [DrmBuildError] when the engine can't construct it.
    fn build(
        &self,
        request: DrmSessionRequest,
    ) -> Result<Arc<dyn DrmSessionManager>, DrmBuildError>;
}
