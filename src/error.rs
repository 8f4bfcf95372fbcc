//! Error types for tank_link

use thiserror::Error;

/// Library error type
#[derive(Debug, Error)]
pub enum Error {
    /// No broker endpoint configured; the link is never constructed
    #[error("proxy URL is not configured")]
    MissingProxyUrl,

    #[error("character id must not be empty")]
    EmptyCharacterId,

    #[error("unknown role: {0:?}")]
    UnknownRole(String),

    #[error("malformed seat: {0:?}")]
    MalformedSeat(String),

    #[error("seat {0} is not part of the roster")]
    SeatNotInRoster(String),

    /// Transport-level failure (open, send after close, remote error)
    #[error("transport error: {0}")]
    Transport(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for tank_link operations
pub type Result<T> = std::result::Result<T, Error>;
