//! Operations: validated domain intents that produce protocol commands.

use crate::conventions::Conventions;
use crate::error::{ClientError, ClientResult};
use nimbusdb_protocol::commands::{
    CompareExchangeValue, CreateDatabaseCommand, DatabaseDocument, PatchCommand, PatchRequest,
    PutCompareExchangeValueCommand, UpdateExternalReplicationCommand,
};
use nimbusdb_protocol::commands::ExternalReplication;
use nimbusdb_protocol::{ChangeVector, ProtocolCommand};
use serde_json::Value;

/// Declares how the execution layer post-processes an operation's raw
/// result. Static per operation, never computed from the response;
/// patch results get their raw keys camel-cased, command results pass
/// through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationResultType {
    /// Plain command result; no transformation.
    CommandResult,
    /// Patch result; raw keys are camel-cased.
    PatchResult,
}

/// A domain-level intent that translates into one protocol command.
///
/// Validation happens when the operation is constructed, before any
/// network interaction; `get_command` cannot fail on caller input.
pub trait Operation {
    /// The command this operation produces.
    type Command: ProtocolCommand;

    /// The static result-shape declaration for this operation.
    const RESULT_TYPE: OperationResultType;

    /// Produces the protocol command for this intent.
    fn get_command(&self, conventions: &Conventions) -> ClientResult<Self::Command>;
}

/// Patches one document with a server-side script.
#[derive(Debug, Clone)]
pub struct PatchOperation {
    id: String,
    change_vector: Option<ChangeVector>,
    patch: PatchRequest,
    patch_if_missing: Option<PatchRequest>,
    skip_patch_if_change_vector_mismatch: bool,
}

impl PatchOperation {
    /// Creates the operation.
    ///
    /// The identifier must be non-empty and both scripts (main and the
    /// optional fallback) must be non-empty after trimming; each
    /// violation fails with `InvalidArgument` naming the field.
    pub fn new(
        id: impl Into<String>,
        change_vector: Option<ChangeVector>,
        patch: PatchRequest,
        patch_if_missing: Option<PatchRequest>,
    ) -> ClientResult<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(ClientError::invalid_argument("id", "must not be empty"));
        }
        if patch.script.trim().is_empty() {
            return Err(ClientError::invalid_argument(
                "patch.script",
                "must not be empty",
            ));
        }
        if let Some(fallback) = &patch_if_missing {
            if fallback.script.trim().is_empty() {
                return Err(ClientError::invalid_argument(
                    "patch_if_missing.script",
                    "must not be empty",
                ));
            }
        }

        Ok(Self {
            id,
            change_vector,
            patch,
            patch_if_missing,
            skip_patch_if_change_vector_mismatch: false,
        })
    }

    /// Turns a change-vector mismatch into a skip instead of a failure.
    #[must_use]
    pub fn skip_patch_if_change_vector_mismatch(mut self) -> Self {
        self.skip_patch_if_change_vector_mismatch = true;
        self
    }
}

impl Operation for PatchOperation {
    type Command = PatchCommand;
    const RESULT_TYPE: OperationResultType = OperationResultType::PatchResult;

    fn get_command(&self, _conventions: &Conventions) -> ClientResult<PatchCommand> {
        Ok(PatchCommand::new(
            self.id.clone(),
            self.change_vector.clone(),
            self.patch.clone(),
            self.patch_if_missing.clone(),
            self.skip_patch_if_change_vector_mismatch,
            false,
            false,
        )?)
    }
}

/// Stores a cluster-wide compare-exchange value.
#[derive(Debug, Clone)]
pub struct PutCompareExchangeValueOperation {
    key: String,
    value: CompareExchangeValue,
    index: i64,
}

impl PutCompareExchangeValueOperation {
    /// Creates the operation.
    ///
    /// The key must be non-empty and the index non-negative. The value
    /// is classified once, here: primitives take the scalar path,
    /// structured values the entity path. The two are framed
    /// differently in the response envelope, so the distinction is kept
    /// as a closed two-variant union.
    pub fn new(key: impl Into<String>, value: Value, index: i64) -> ClientResult<Self> {
        let key = key.into();
        if key.is_empty() {
            return Err(ClientError::invalid_argument("key", "must not be empty"));
        }
        if index < 0 {
            return Err(ClientError::invalid_argument(
                "index",
                format!("must be non-negative, got {index}"),
            ));
        }

        let value = if Conventions::is_primitive(&value) {
            CompareExchangeValue::Scalar(value)
        } else {
            CompareExchangeValue::Entity(value)
        };

        Ok(Self { key, value, index })
    }
}

impl Operation for PutCompareExchangeValueOperation {
    type Command = PutCompareExchangeValueCommand;
    const RESULT_TYPE: OperationResultType = OperationResultType::CommandResult;

    fn get_command(
        &self,
        _conventions: &Conventions,
    ) -> ClientResult<PutCompareExchangeValueCommand> {
        Ok(PutCompareExchangeValueCommand::new(
            self.key.clone(),
            self.value.clone(),
            self.index,
        )?)
    }
}

/// Creates or updates an external replication task.
#[derive(Debug, Clone)]
pub struct UpdateExternalReplicationOperation {
    watcher: ExternalReplication,
}

impl UpdateExternalReplicationOperation {
    /// Creates the operation for the given watcher definition.
    #[must_use]
    pub fn new(watcher: ExternalReplication) -> Self {
        Self { watcher }
    }
}

impl Operation for UpdateExternalReplicationOperation {
    type Command = UpdateExternalReplicationCommand;
    const RESULT_TYPE: OperationResultType = OperationResultType::CommandResult;

    fn get_command(
        &self,
        _conventions: &Conventions,
    ) -> ClientResult<UpdateExternalReplicationCommand> {
        Ok(UpdateExternalReplicationCommand::new(self.watcher.clone()))
    }
}

/// Creates a database on the cluster.
#[derive(Debug, Clone)]
pub struct CreateDatabaseOperation {
    document: DatabaseDocument,
}

impl CreateDatabaseOperation {
    /// Creates the operation.
    ///
    /// Validates the record eagerly, with the same checks the command
    /// applies.
    pub fn new(document: DatabaseDocument) -> ClientResult<Self> {
        // Constructing the command performs the validation; the instance
        // produced here is discarded.
        CreateDatabaseCommand::new(document.clone())?;
        Ok(Self { document })
    }
}

impl Operation for CreateDatabaseOperation {
    type Command = CreateDatabaseCommand;
    const RESULT_TYPE: OperationResultType = OperationResultType::CommandResult;

    fn get_command(&self, _conventions: &Conventions) -> ClientResult<CreateDatabaseCommand> {
        Ok(CreateDatabaseCommand::new(self.document.clone())?)
    }
}
