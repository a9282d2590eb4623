use thiserror::Error;

/// The media result type.
pub type Result<T> = std::result::Result<T, MediaError>;

/// The errors which can occur while describing or building media sources.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum MediaError {
    #[error("invalid media uri {0}")]
    InvalidUri(String),
    #[error("unsupported content type {0}")]
    UnsupportedContentType(String),
}
