//! # NimbusDB Client
//!
//! A session-oriented client for a clustered, eventually-consistent
//! JSON document database.
//!
//! The crate layers on top of [`nimbusdb_protocol`]:
//! - [`SessionContext`] holds the per-session collaborators and a
//!   request counter; [`CommandExecutor`] is the transport seam
//! - [`QueryOperation`] runs index queries and enforces the caller's
//!   staleness policy, retrying stale results until a deadline
//! - [`deserialize_document`](projection::deserialize_document) turns
//!   raw query hits into entities or projections, back-filling the
//!   identity property by convention
//! - [`ConflictResolver`] lists divergent document revisions and
//!   resolves them by writing one chosen candidate back unconditionally
//! - Server-side operations ([`PatchOperation`],
//!   [`PutCompareExchangeValueOperation`],
//!   [`UpdateExternalReplicationOperation`], [`CreateDatabaseOperation`])
//!   validate eagerly and compose into protocol commands
//!
//! No I/O happens outside a [`CommandExecutor`] implementation; tests
//! run entire sessions against [`MockExecutor`].

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod conflict;
pub mod conventions;
pub mod error;
pub mod executor;
pub mod operations;
pub mod projection;
pub mod query;
pub mod session;
pub mod tracking;

pub use config::ClientConfig;
pub use conflict::ConflictResolver;
pub use conventions::{Conventions, DocumentType};
pub use error::{ClientError, ClientResult};
pub use executor::{execute_command, CommandExecutor, MockExecutor};
pub use operations::{
    CreateDatabaseOperation, Operation, OperationResultType, PatchOperation,
    PutCompareExchangeValueOperation, UpdateExternalReplicationOperation,
};
pub use projection::ProjectionSpec;
pub use query::{QueryDisposition, QueryOperation, QueryState};
pub use session::SessionContext;
pub use tracking::{EntityTracker, MemoryTracker};
