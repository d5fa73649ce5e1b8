//! Domain-level error types.

use thiserror::Error;

use super::value_object::{GameId, Identity, RoomId};

/// Validation failure of a value object.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValueObjectError {
    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("{0} must be at most {1} characters")]
    TooLong(&'static str, usize),
}

/// Failure reported by a repository implementation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("identity '{0}' is already connected")]
    DuplicateIdentity(Identity),

    #[error("room '{0}' not found")]
    RoomNotFound(RoomId),
}

/// Room membership rule violations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RoomError {
    #[error("connection is already a member of room '{0}'")]
    AlreadyMember(RoomId),
}

/// Game session rule violations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GameError {
    #[error("game '{0}' not found")]
    NotFound(GameId),

    #[error("game '{0}' already has two participants")]
    SessionFull(GameId),

    #[error("game '{0}' is finished")]
    Finished(GameId),

    #[error("'{0}' is not a participant of this game")]
    NotParticipant(Identity),

    #[error("game '{0}' is not accepting input")]
    NotActive(GameId),
}
