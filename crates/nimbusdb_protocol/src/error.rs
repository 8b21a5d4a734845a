//! Error types for the protocol crate.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors that can occur while building or parsing protocol commands.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// A caller-supplied argument was rejected before any request was built.
    #[error("invalid argument `{argument}`: {message}")]
    InvalidArgument {
        /// Name of the offending argument.
        argument: &'static str,
        /// Why it was rejected.
        message: String,
    },

    /// A precondition of correct use was violated.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// The server returned a response the command cannot interpret.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// JSON encoding or decoding failed.
    #[error("serialization failure: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ProtocolError {
    /// Creates an `InvalidArgument` error for the named argument.
    pub fn invalid_argument(argument: &'static str, message: impl Into<String>) -> Self {
        ProtocolError::InvalidArgument {
            argument,
            message: message.into(),
        }
    }
}
