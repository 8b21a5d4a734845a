//! Stores one document under an identifier.

use crate::change_vector::ChangeVector;
use crate::command::{
    encode_uri_component, HttpMethod, ProtocolCommand, RequestDescription, ServerNode,
};
use crate::error::{ProtocolError, ProtocolResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The server's acknowledgement of a stored document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PutResult {
    /// Identifier the document was stored under.
    pub id: String,
    /// The new authoritative change vector for the document.
    pub change_vector: ChangeVector,
}

/// Stores a document, optionally guarded by a change vector.
///
/// With a change vector the write fails if the server's current token
/// differs; without one it overwrites unconditionally. The unconditional
/// form is also how a conflict is resolved: putting a chosen candidate's
/// body with no change vector collapses the conflict server-side.
#[derive(Debug)]
pub struct PutDocumentCommand {
    id: String,
    change_vector: Option<ChangeVector>,
    document: Value,
    result: Option<PutResult>,
}

impl PutDocumentCommand {
    /// Creates the command.
    ///
    /// The identifier must be non-empty and the document must be a JSON
    /// object; both are checked here, before any request is built.
    pub fn new(
        id: impl Into<String>,
        change_vector: Option<ChangeVector>,
        document: Value,
    ) -> ProtocolResult<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(ProtocolError::invalid_argument("id", "must not be empty"));
        }
        if !document.is_object() {
            return Err(ProtocolError::invalid_argument(
                "document",
                "must be a JSON object",
            ));
        }

        Ok(Self {
            id,
            change_vector,
            document,
            result: None,
        })
    }
}

impl ProtocolCommand for PutDocumentCommand {
    type Result = PutResult;

    fn build_request(&self, node: &ServerNode) -> ProtocolResult<RequestDescription> {
        let uri = format!(
            "{}/docs?id={}",
            node.database_url(),
            encode_uri_component(&self.id)
        );

        // The document is sent as-is; key casing was settled by the caller.
        let body = serde_json::to_string(&self.document)?;

        Ok(RequestDescription::new(HttpMethod::Put, uri)
            .with_json_body(body)
            .with_change_vector(self.change_vector.as_ref()))
    }

    fn parse_response(&mut self, body: Option<&str>, _from_cache: bool) -> ProtocolResult<()> {
        let body = body.ok_or_else(|| {
            ProtocolError::InvalidResponse("put response is missing a body".to_string())
        })?;
        self.result = Some(serde_json::from_str(body)?);
        Ok(())
    }

    fn is_read_request(&self) -> bool {
        false
    }

    fn take_result(&mut self) -> Option<PutResult> {
        self.result.take()
    }
}
