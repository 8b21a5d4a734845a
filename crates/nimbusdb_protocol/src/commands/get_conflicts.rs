//! Lists conflicting revisions for one document identifier.

use crate::command::{
    encode_uri_component, HttpMethod, ProtocolCommand, RequestDescription, ServerNode,
};
use crate::conflict::GetConflictsResult;
use crate::error::{ProtocolError, ProtocolResult};

/// Fetches the candidate revisions of a conflicted document.
///
/// A pure read: safe to call repeatedly with no side effects. Once the
/// identifier returns to a clean state the candidate set comes back
/// empty.
#[derive(Debug)]
pub struct GetConflictsCommand {
    id: String,
    result: Option<GetConflictsResult>,
}

impl GetConflictsCommand {
    /// Creates the command. The identifier must be non-empty.
    pub fn new(id: impl Into<String>) -> ProtocolResult<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(ProtocolError::invalid_argument("id", "must not be empty"));
        }
        Ok(Self { id, result: None })
    }
}

impl ProtocolCommand for GetConflictsCommand {
    type Result = GetConflictsResult;

    fn build_request(&self, node: &ServerNode) -> ProtocolResult<RequestDescription> {
        let uri = format!(
            "{}/replication/conflicts?docId={}",
            node.database_url(),
            encode_uri_component(&self.id)
        );
        Ok(RequestDescription::new(HttpMethod::Get, uri))
    }

    fn parse_response(&mut self, body: Option<&str>, _from_cache: bool) -> ProtocolResult<()> {
        let body = body.ok_or_else(|| {
            ProtocolError::InvalidResponse("conflict listing is missing a body".to_string())
        })?;
        self.result = Some(serde_json::from_str(body)?);
        Ok(())
    }

    fn is_read_request(&self) -> bool {
        true
    }

    fn take_result(&mut self) -> Option<GetConflictsResult> {
        self.result.take()
    }
}
