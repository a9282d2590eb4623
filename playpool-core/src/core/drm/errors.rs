use thiserror::Error;

/// The DRM result type.
pub type Result<T> = std::result::Result<T, DrmError>;

/// The memoized failure outcome of a DRM session manager lookup.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DrmError {
    /// The platform doesn't support protected content at all.
    #[error("protected content is not supported on this platform")]
    NotSupported,
    /// The scheme of the descriptor could not be resolved or is not supported by the engine.
    #[error("protection scheme \"{0}\" is not supported")]
    UnsupportedScheme(String),
    /// The engine failed to construct the session manager.
    #[error("failed to create the protection session manager, {0}")]
    Unknown(String),
}

/// The failure reported by a [crate::core::drm::DrmSessionBuilder].
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DrmBuildError {
    #[error("the scheme is not supported")]
    UnsupportedScheme,
    #[error("{0}")]
    Other(String),
}
