//! # NimbusDB Protocol
//!
//! Protocol commands and wire types for the NimbusDB client.
//!
//! This crate provides:
//! - The [`ProtocolCommand`] contract: one logical request/response
//!   exchange against one server node
//! - Concrete commands (put document, patch, compare-exchange put,
//!   external replication update, create database, get conflicts,
//!   get document, query)
//! - [`ChangeVector`] for optimistic concurrency
//! - [`QueryResult`] and [`DocumentConflict`] payloads
//!
//! This is a pure protocol crate with no I/O operations. Building a
//! request composes a [`RequestDescription`]; sending it belongs to the
//! executor in the client crate.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod change_vector;
mod command;
pub mod commands;
mod conflict;
mod error;
mod query;

pub use change_vector::ChangeVector;
pub use command::{
    encode_uri_component, HttpMethod, ProtocolCommand, RawResponse, RequestDescription, ServerNode,
    CONTENT_TYPE_HEADER, IF_MATCH_HEADER,
};
pub use conflict::{ConflictCandidate, DocumentConflict, GetConflictsResult};
pub use error::{ProtocolError, ProtocolResult};
pub use query::{IndexQuery, QueryResult};
