//! Administrative updates to external replication tasks.

use crate::command::{HttpMethod, ProtocolCommand, RequestDescription, ServerNode};
use crate::error::{ProtocolError, ProtocolResult};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Definition of an external replication watcher: a one-way push of this
/// database's documents to another cluster.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ExternalReplication {
    /// Task name.
    pub name: String,
    /// Destination database.
    pub database: String,
    /// Named connection string describing the destination cluster.
    pub connection_string_name: String,
    /// Existing task id; zero creates a new task.
    pub task_id: u64,
    /// Whether the task is paused.
    pub disabled: bool,
}

impl ExternalReplication {
    /// Creates a watcher definition for a new task.
    pub fn new(
        name: impl Into<String>,
        database: impl Into<String>,
        connection_string_name: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            database: database.into(),
            connection_string_name: connection_string_name.into(),
            task_id: 0,
            disabled: false,
        }
    }
}

/// The server's acknowledgement of an ongoing-task change.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ModifyOngoingTaskResult {
    /// Id of the created or updated task.
    pub task_id: u64,
    /// The node responsible for running the task.
    pub responsible_node: Option<String>,
}

/// Creates or updates an external replication task.
#[derive(Debug)]
pub struct UpdateExternalReplicationCommand {
    watcher: ExternalReplication,
    result: Option<ModifyOngoingTaskResult>,
}

impl UpdateExternalReplicationCommand {
    /// Creates the command for the given watcher definition.
    #[must_use]
    pub fn new(watcher: ExternalReplication) -> Self {
        Self {
            watcher,
            result: None,
        }
    }
}

impl ProtocolCommand for UpdateExternalReplicationCommand {
    type Result = ModifyOngoingTaskResult;

    fn build_request(&self, node: &ServerNode) -> ProtocolResult<RequestDescription> {
        let uri = format!(
            "{}/admin/tasks/external-replication",
            node.database_url()
        );
        let body = serde_json::to_string(&json!({ "Watcher": self.watcher }))?;

        Ok(RequestDescription::new(HttpMethod::Post, uri).with_json_body(body))
    }

    fn parse_response(&mut self, body: Option<&str>, _from_cache: bool) -> ProtocolResult<()> {
        let body = body.ok_or_else(|| {
            ProtocolError::InvalidResponse(
                "external replication update response is missing a body".to_string(),
            )
        })?;
        self.result = Some(serde_json::from_str(body)?);
        Ok(())
    }

    fn is_read_request(&self) -> bool {
        false
    }

    fn take_result(&mut self) -> Option<ModifyOngoingTaskResult> {
        self.result.take()
    }
}
