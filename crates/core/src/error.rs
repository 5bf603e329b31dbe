//! Error types for Muster Core

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Already a member of this lobby")]
    AlreadyMember,

    #[error("A join request is already pending")]
    DuplicateRequest,

    #[error("Lobby is at capacity")]
    LobbyFull,

    #[error("Host cannot kick themselves")]
    SelfKick,

    #[error("Capacity {requested} is below the current player count {current}")]
    CapacityBelowCurrent { requested: u32, current: u32 },

    #[error("Host must transfer ownership before leaving")]
    HostCannotLeave,

    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    #[error("Capacity must be at least 2, got {0}")]
    InvalidCapacity(u32),

    #[error("Concurrent write conflict, retry the operation")]
    Conflict,
}

pub type Result<T> = std::result::Result<T, Error>;
