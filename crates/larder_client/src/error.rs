//! Error types for the client.

use crate::transport::TransportError;
use larder_core::CoreError;
use larder_protocol::{HandlerId, ProtocolError};
use thiserror::Error;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur in client operations.
#[derive(Error, Debug)]
pub enum ClientError {
    /// The service rejected the account credentials.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// A token refresh was rejected with a status other than 401.
    ///
    /// Kept apart from [`Authentication`](ClientError::Authentication) so a
    /// server outage during refresh reads as retryable instead of as bad
    /// credentials. A 401 on refresh falls back to a full credential fetch.
    #[error("token refresh failed with status {status}")]
    TokenRefresh {
        /// HTTP status.
        status: u16,
    },

    /// Network or connection failure.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The server rejected an operation batch.
    #[error("server rejected {handler} with status {status}")]
    Sync {
        /// Handler of the first operation in the batch.
        handler: HandlerId,
        /// HTTP status.
        status: u16,
    },

    /// The credentials file could not be read or written.
    #[error("credential persistence failed: {0}")]
    Persistence(String),

    /// A request failed with an unexpected status.
    #[error("unexpected status {status} from {path}")]
    UnexpectedStatus {
        /// Request path.
        path: String,
        /// HTTP status.
        status: u16,
    },

    /// Encoding or decoding failed.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Entity misuse, such as reassigning a locked field.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The account has no recipe data container.
    #[error("account has no recipe data id")]
    MissingRecipeData,

    /// The account has no meal-planning calendar.
    #[error("account has no meal-planning calendar")]
    MissingCalendar,

    /// A referenced entity does not exist.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Entity kind.
        kind: &'static str,
        /// Entity id.
        id: String,
    },
}

impl ClientError {
    /// Creates a persistence error.
    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence(message.into())
    }

    /// Creates a not found error.
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Returns true if this error can be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Transport(_) => true,
            ClientError::UnexpectedStatus { status, .. }
            | ClientError::TokenRefresh { status }
            | ClientError::Sync { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_errors() {
        assert!(ClientError::Transport(TransportError::ConnectionClosed).is_retryable());
        assert!(ClientError::Sync {
            handler: HandlerId::UncheckAll,
            status: 503
        }
        .is_retryable());
        assert!(!ClientError::Sync {
            handler: HandlerId::UncheckAll,
            status: 400
        }
        .is_retryable());
        assert!(ClientError::UnexpectedStatus {
            path: "data/user-data/get".into(),
            status: 502
        }
        .is_retryable());
        assert!(!ClientError::Authentication("bad password".into()).is_retryable());
        assert!(!ClientError::MissingCalendar.is_retryable());
    }

    #[test]
    fn error_display() {
        let err = ClientError::Sync {
            handler: HandlerId::SetListItemName,
            status: 422,
        };
        assert_eq!(
            err.to_string(),
            "server rejected set-list-item-name with status 422"
        );

        let err: ClientError = CoreError::locked_field("item", "list_id").into();
        assert_eq!(
            err.to_string(),
            "item.list_id is already assigned and cannot change"
        );

        assert_eq!(
            ClientError::not_found("item", "i7").to_string(),
            "item not found: i7"
        );
    }
}
