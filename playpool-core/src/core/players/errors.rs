use thiserror::Error;

/// The player result type.
pub type Result<T> = std::result::Result<T, PlayerError>;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum PlayerError {
    /// The media engine could not be created.
    #[error("failed to create the engine, {0}")]
    Engine(String),
    /// The player has been released under a config which doesn't match the config it was built for.
    #[error("player of config [{expected}] can't be released under config [{actual}]")]
    ConfigMismatch { expected: String, actual: String },
    /// The player hasn't been created by the pool it's released into.
    #[error("{0} is not owned by this pool")]
    UnknownPlayer(String),
}
