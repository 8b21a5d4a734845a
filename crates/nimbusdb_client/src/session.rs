//! Session context: the collaborator bundle operations run against.

use crate::config::ClientConfig;
use crate::conventions::Conventions;
use crate::error::{ClientError, ClientResult};
use crate::executor::{execute_command, CommandExecutor};
use crate::tracking::{EntityTracker, METADATA_ID, METADATA_KEY};
use nimbusdb_protocol::commands::{GetDocumentCommand, PutDocumentCommand, PutResult};
use nimbusdb_protocol::{ChangeVector, ProtocolCommand, ServerNode};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};

/// Ambient state threaded explicitly through operations: conventions,
/// identity tracking and the request counter, plus the executor and the
/// node commands are addressed to.
///
/// Nothing here is global; query and conflict logic stay unit-testable
/// against a mock executor and an in-memory tracker.
pub struct SessionContext<E: CommandExecutor, T: EntityTracker> {
    config: ClientConfig,
    conventions: Conventions,
    node: ServerNode,
    executor: E,
    tracker: T,
    request_count: AtomicU64,
}

impl<E: CommandExecutor, T: EntityTracker> SessionContext<E, T> {
    /// Creates a session context.
    pub fn new(
        config: ClientConfig,
        conventions: Conventions,
        node: ServerNode,
        executor: E,
        tracker: T,
    ) -> Self {
        Self {
            config,
            conventions,
            node,
            executor,
            tracker,
            request_count: AtomicU64::new(0),
        }
    }

    /// The session configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The session conventions.
    pub fn conventions(&self) -> &Conventions {
        &self.conventions
    }

    /// The node this session addresses.
    pub fn node(&self) -> &ServerNode {
        &self.node
    }

    /// The command executor.
    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// The identity tracker.
    pub fn tracker(&self) -> &T {
        &self.tracker
    }

    /// Counts one outgoing request and returns the new total.
    pub fn increment_request_count(&self) -> u64 {
        self.request_count.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Number of requests issued through this session.
    pub fn request_count(&self) -> u64 {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Loads one document and tracks it.
    ///
    /// Returns `None` when the document does not exist. Loading a
    /// conflicted identifier fails with `DocumentConflict` carrying the
    /// full candidate set; the load never picks a winner implicitly.
    pub fn load(&self, id: &str) -> ClientResult<Option<Value>> {
        let mut command = GetDocumentCommand::new(id)?;
        self.increment_request_count();
        execute_command(&self.executor, &self.node, &mut command)?;

        let Some(result) = command.take_result() else {
            return Ok(None);
        };
        let Some(document) = result.results.into_iter().next() else {
            return Ok(None);
        };

        let metadata = document.get(METADATA_KEY).cloned().unwrap_or(Value::Null);
        let id = metadata
            .get(METADATA_ID)
            .and_then(Value::as_str)
            .unwrap_or(id)
            .to_string();

        let entity = self
            .tracker
            .track_entity(None, Some(&id), &document, &metadata, false);
        Ok(Some(entity))
    }

    /// Stores one document.
    ///
    /// A present change vector makes the write conditional; `None`
    /// overwrites unconditionally, which is also how a chosen conflict
    /// candidate is written back during resolution.
    pub fn store(
        &self,
        id: &str,
        change_vector: Option<ChangeVector>,
        document: Value,
    ) -> ClientResult<PutResult> {
        let mut command = PutDocumentCommand::new(id, change_vector, document)?;
        self.increment_request_count();
        execute_command(&self.executor, &self.node, &mut command)?;

        command.take_result().ok_or_else(|| {
            ClientError::InvalidResponse("store completed without a put result".to_string())
        })
    }
}
