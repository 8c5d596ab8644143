//! Error types for protocol encoding and batching.

use crate::operation::Endpoint;
use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors that can occur while building or encoding protocol messages.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Serialization to the wire format failed.
    #[error("encode error: {0}")]
    Encode(String),

    /// Deserialization from the wire format failed.
    #[error("decode error: {0}")]
    Decode(String),

    /// A handler name was not recognized.
    #[error("unknown operation handler: {0}")]
    UnknownHandler(String),

    /// An operation was added to a batch bound for a different endpoint.
    #[error("operation for {actual} cannot join a batch for {expected}")]
    MixedEndpoints {
        /// Endpoint of the batch.
        expected: Endpoint,
        /// Endpoint of the rejected operation.
        actual: Endpoint,
    },

    /// An empty batch was submitted for encoding.
    #[error("operation batch is empty")]
    EmptyBatch,
}

impl ProtocolError {
    /// Creates an encode error.
    pub fn encode(message: impl Into<String>) -> Self {
        Self::Encode(message.into())
    }

    /// Creates a decode error.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode(message.into())
    }
}
