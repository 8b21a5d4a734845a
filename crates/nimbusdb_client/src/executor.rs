//! Command execution seam.
//!
//! The client composes requests and parses responses; actually sending
//! them, choosing a node, retrying on transient failure and consulting
//! the response cache is the executor's job. The trait abstracts that
//! boundary, and [`MockExecutor`] stands in for it in tests.

use crate::error::{ClientError, ClientResult};
use nimbusdb_protocol::{
    DocumentConflict, GetConflictsResult, ProtocolCommand, RawResponse, RequestDescription,
    ServerNode,
};
use parking_lot::Mutex;
use std::collections::VecDeque;

/// Sends one composed request and returns the raw response.
pub trait CommandExecutor: Send + Sync {
    /// Executes the request. `is_read` is a routing and caching hint:
    /// only pure reads may be served from non-primary nodes or cache.
    fn execute(&self, request: &RequestDescription, is_read: bool) -> ClientResult<RawResponse>;
}

/// Drives one command through an executor: build, send, parse.
///
/// The command instance is executed at most once; stale-result retries
/// at a higher layer construct a fresh command instead of resending
/// this one.
pub fn execute_command<C: ProtocolCommand>(
    executor: &dyn CommandExecutor,
    node: &ServerNode,
    command: &mut C,
) -> ClientResult<()> {
    let request = command.build_request(node)?;
    let response = executor.execute(&request, command.is_read_request())?;

    match response.status {
        // Missing resource: the result simply stays empty.
        404 => Ok(()),
        // Conflict: divergent revisions, or a concurrency-token mismatch
        // on a conflicted document. Either way the payload carries the
        // candidate set for the caller to resolve.
        409 => Err(parse_conflict(response.body.as_deref())),
        status if response.is_success() => {
            command.parse_response(response.body.as_deref(), false)?;
            tracing::trace!(status, uri = %request.uri, "command completed");
            Ok(())
        }
        status if status >= 500 => Err(ClientError::NodeFailure {
            message: format!("server returned status {status}"),
            retryable: true,
        }),
        status => Err(ClientError::InvalidResponse(format!(
            "unexpected status {status}"
        ))),
    }
}

fn parse_conflict(body: Option<&str>) -> ClientError {
    let Some(body) = body else {
        return ClientError::InvalidResponse(
            "conflict response is missing its candidate payload".to_string(),
        );
    };
    let listing: GetConflictsResult = match serde_json::from_str(body) {
        Ok(listing) => listing,
        Err(err) => return ClientError::Serialization(err),
    };
    match DocumentConflict::from_listing(listing) {
        Some(conflict) => ClientError::DocumentConflict { conflict },
        None => ClientError::InvalidResponse(
            "conflict response carried fewer than two candidates".to_string(),
        ),
    }
}

/// An executor that replays canned responses, for tests.
///
/// Responses are consumed in FIFO order; when the queue is empty the
/// default response, if set, is repeated. Every request is recorded.
#[derive(Debug, Default)]
pub struct MockExecutor {
    responses: Mutex<VecDeque<RawResponse>>,
    default_response: Mutex<Option<RawResponse>>,
    requests: Mutex<Vec<RequestDescription>>,
}

impl MockExecutor {
    /// Creates an empty mock.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues one response.
    pub fn enqueue(&self, response: RawResponse) {
        self.responses.lock().push_back(response);
    }

    /// Sets the response repeated once the queue runs dry.
    pub fn set_default_response(&self, response: RawResponse) {
        *self.default_response.lock() = Some(response);
    }

    /// Returns every request executed so far.
    pub fn requests(&self) -> Vec<RequestDescription> {
        self.requests.lock().clone()
    }

    /// Number of requests executed so far.
    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }
}

impl CommandExecutor for MockExecutor {
    fn execute(&self, request: &RequestDescription, _is_read: bool) -> ClientResult<RawResponse> {
        self.requests.lock().push(request.clone());

        if let Some(response) = self.responses.lock().pop_front() {
            return Ok(response);
        }
        if let Some(response) = self.default_response.lock().clone() {
            return Ok(response);
        }
        Err(ClientError::NodeFailure {
            message: "no mock response queued".to_string(),
            retryable: false,
        })
    }
}
