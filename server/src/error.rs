//! Errors that end a player session.
//!
//! Protocol mistakes (bad guesses, unknown commands) are answered in-band and
//! never reach this type; see [`shared::ProtocolError`].

use std::io;

/// Reasons a session stops. None of them affect other sessions.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Another connected session already holds the requested name
    #[error("name {0:?} is already in use")]
    NameTaken(String),

    /// The requested name failed the name policy
    #[error("name {0:?} was refused")]
    InvalidName(String),

    /// The peer closed or reset the connection, or a read failed
    #[error("connection lost: {0}")]
    ConnectionLost(#[from] io::Error),

    /// The session's writer failed, or its peer stopped reading and the
    /// outbox overflowed
    #[error("failed to deliver message to {0}")]
    SendFailure(String),
}
