//! Loads one document by identifier.

use crate::command::{
    encode_uri_component, HttpMethod, ProtocolCommand, RequestDescription, ServerNode,
};
use crate::error::{ProtocolError, ProtocolResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Wire shape of a document load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct GetDocumentsResult {
    /// The requested documents, in request order.
    pub results: Vec<Value>,
    /// Eagerly fetched related documents, keyed by identifier.
    pub includes: Map<String, Value>,
}

/// Fetches a single document.
///
/// A missing document surfaces as an absent result, not a failure; a
/// conflicted one is rejected by the server with a conflict payload the
/// session layer turns into a typed conflict.
#[derive(Debug)]
pub struct GetDocumentCommand {
    id: String,
    result: Option<GetDocumentsResult>,
}

impl GetDocumentCommand {
    /// Creates the command. The identifier must be non-empty.
    pub fn new(id: impl Into<String>) -> ProtocolResult<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(ProtocolError::invalid_argument("id", "must not be empty"));
        }
        Ok(Self { id, result: None })
    }
}

impl ProtocolCommand for GetDocumentCommand {
    type Result = GetDocumentsResult;

    fn build_request(&self, node: &ServerNode) -> ProtocolResult<RequestDescription> {
        let uri = format!(
            "{}/docs?id={}",
            node.database_url(),
            encode_uri_component(&self.id)
        );
        Ok(RequestDescription::new(HttpMethod::Get, uri))
    }

    fn parse_response(&mut self, body: Option<&str>, _from_cache: bool) -> ProtocolResult<()> {
        // Absent body: the document does not exist. Not a failure.
        let Some(body) = body else {
            return Ok(());
        };
        self.result = Some(serde_json::from_str(body)?);
        Ok(())
    }

    fn is_read_request(&self) -> bool {
        true
    }

    fn take_result(&mut self) -> Option<GetDocumentsResult> {
        self.result.take()
    }
}
