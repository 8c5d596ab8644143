//! Error types for the fake service.

use larder_protocol::ProtocolError;
use thiserror::Error;

/// Result type for fake service handlers.
pub type ServerResult<T> = Result<T, ServerError>;

/// Reasons the fake service refuses a request.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Malformed request.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Email or password did not match.
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Missing, forged, expired or spent token.
    #[error("not authorized: {0}")]
    NotAuthorized(String),

    /// No route for the path.
    #[error("no route for {0}")]
    NotFound(String),

    /// Batch refused by configuration.
    #[error("batch rejected with status {status}")]
    Rejected {
        /// Status returned to the client.
        status: u16,
    },

    /// Undecodable payload.
    #[error("codec error: {0}")]
    Codec(#[from] ProtocolError),
}

impl ServerError {
    /// Returns the HTTP status the fake service answers with.
    pub fn status(&self) -> u16 {
        match self {
            ServerError::InvalidRequest(_) | ServerError::Codec(_) => 400,
            ServerError::AuthenticationFailed(_) | ServerError::NotAuthorized(_) => 401,
            ServerError::NotFound(_) => 404,
            ServerError::Rejected { status } => *status,
        }
    }

    /// Returns true if this is a client error (4xx).
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status())
    }
}
