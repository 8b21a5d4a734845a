//! Concrete protocol commands.
//!
//! Every command follows one shape: validate inputs in the constructor,
//! build one request in `build_request`, parse one result in
//! `parse_response`.

mod compare_exchange;
mod create_database;
mod get_conflicts;
mod get_document;
mod patch;
mod put_document;
mod query;
mod replication;

pub use compare_exchange::{
    CompareExchangeResult, CompareExchangeValue, PutCompareExchangeValueCommand,
};
pub use create_database::{CreateDatabaseCommand, DatabaseDocument, DATA_DIR_SETTING};
pub use get_conflicts::GetConflictsCommand;
pub use get_document::{GetDocumentCommand, GetDocumentsResult};
pub use patch::{PatchCommand, PatchRequest, PatchResult, PatchStatus};
pub use put_document::{PutDocumentCommand, PutResult};
pub use query::QueryCommand;
pub use replication::{
    ExternalReplication, ModifyOngoingTaskResult, UpdateExternalReplicationCommand,
};
