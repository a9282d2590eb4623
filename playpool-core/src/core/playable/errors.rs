use thiserror::Error;

use crate::core::media::MediaError;
use crate::core::playable::PlayableState;
use crate::core::players::PlayerError;

/// The playable result type.
pub type Result<T> = std::result::Result<T, PlayableError>;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum PlayableError {
    /// The operation requires a player, which is only owned after the playable has been prepared.
    #[error("the playable has not been prepared")]
    NotPrepared,
    /// The playable has been released and can't be used anymore.
    #[error("the playable has been released")]
    Released,
    /// The operation is not allowed in the current state.
    #[error("operation is not allowed in state {0}")]
    InvalidState(PlayableState),
    #[error("a player error occurred, {0}")]
    Player(#[from] PlayerError),
    #[error("a media error occurred, {0}")]
    Media(#[from] MediaError),
}
