//! Error types for the client crate.

use nimbusdb_protocol::{DocumentConflict, ProtocolError};
use std::time::Duration;
use thiserror::Error;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur while driving commands, queries and conflict
/// resolution.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Bad caller input, detected before any I/O.
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

    /// The server returned a shape the client cannot interpret.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// JSON decoding of a result failed; the whole batch is aborted.
    #[error("serialization failure: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The queried index does not exist.
    #[error("index does not exist: {index}")]
    IndexNotFound {
        /// Name of the missing index.
        index: String,
    },

    /// Divergent replica revisions; resolution is up to the caller.
    #[error("{conflict}")]
    DocumentConflict {
        /// The full candidate set.
        conflict: DocumentConflict,
    },

    /// The staleness budget was exhausted before a non-stale result.
    #[error("waited {elapsed:?} for the query to return a non-stale result")]
    Timeout {
        /// Wall-clock time spent waiting.
        elapsed: Duration,
    },

    /// A node-level failure reported by the executor.
    #[error("node failure: {message}")]
    NodeFailure {
        /// Description of the failure.
        message: String,
        /// Whether the executor may retry on another node.
        retryable: bool,
    },
}

impl ClientError {
    /// Creates an `InvalidArgument` error for the named argument.
    pub fn invalid_argument(argument: &'static str, message: impl Into<String>) -> Self {
        ClientError::InvalidArgument {
            argument,
            message: message.into(),
        }
    }

    /// True when the external executor may retry the exchange.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, ClientError::NodeFailure { retryable: true, .. })
    }
}

impl From<ProtocolError> for ClientError {
    fn from(err: ProtocolError) -> Self {
        // Argument and precondition failures keep their condition across
        // the layer boundary instead of collapsing into a generic wrap.
        match err {
            ProtocolError::InvalidArgument { argument, message } => {
                ClientError::InvalidArgument { argument, message }
            }
            ProtocolError::InvalidOperation(message) => ClientError::InvalidOperation(message),
            ProtocolError::InvalidResponse(message) => ClientError::InvalidResponse(message),
            ProtocolError::Serialization(err) => ClientError::Serialization(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_retryable_node_failures_retry() {
        let transient = ClientError::NodeFailure {
            message: "connection refused".to_string(),
            retryable: true,
        };
        assert!(transient.is_retryable());

        let terminal = ClientError::NodeFailure {
            message: "all nodes exhausted".to_string(),
            retryable: false,
        };
        assert!(!terminal.is_retryable());

        assert!(!ClientError::Timeout {
            elapsed: Duration::from_secs(2)
        }
        .is_retryable());
    }

    #[test]
    fn protocol_conditions_survive_the_boundary() {
        let err: ClientError =
            ProtocolError::invalid_argument("id", "must not be empty").into();
        assert!(matches!(
            err,
            ClientError::InvalidArgument { argument: "id", .. }
        ));

        let err: ClientError = ProtocolError::InvalidOperation("no page size".to_string()).into();
        assert!(matches!(err, ClientError::InvalidOperation(_)));
    }

    #[test]
    fn timeout_reports_elapsed_time() {
        let err = ClientError::Timeout {
            elapsed: Duration::from_millis(2000),
        };
        assert!(err.to_string().contains("2"));
    }
}
