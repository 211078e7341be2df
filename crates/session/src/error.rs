//! Session error types

use kuteera_http::ClientError;
use thiserror::Error;

/// Errors surfaced by session lifecycle operations
#[derive(Debug, Error)]
pub enum SessionError {
    /// Backend call failed
    #[error("Backend request failed: {0}")]
    Client(#[from] ClientError),

    /// The refreshed identity is not allowed to hold this session
    #[error("Role {0} may not hold an admin session")]
    WrongRole(String),

    /// The session was ended while the request was in flight
    #[error("Session ended before the refresh completed")]
    Ended,
}
