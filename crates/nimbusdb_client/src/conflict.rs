//! Conflict discovery and resolution.
//!
//! Divergent revisions of a document are listed through the conflicts
//! endpoint and resolved by writing one chosen candidate back with no
//! concurrency token, which overwrites whatever state the node holds.

use crate::error::ClientResult;
use crate::executor::{execute_command, CommandExecutor};
use crate::session::SessionContext;
use crate::tracking::EntityTracker;
use nimbusdb_protocol::commands::{GetConflictsCommand, PutDocumentCommand, PutResult};
use nimbusdb_protocol::{ConflictCandidate, DocumentConflict, ProtocolCommand};

/// Lists and resolves divergent revisions of a document.
pub struct ConflictResolver<'a, E: CommandExecutor, T: EntityTracker> {
    session: &'a SessionContext<E, T>,
}

impl<'a, E: CommandExecutor, T: EntityTracker> ConflictResolver<'a, E, T> {
    /// Creates a resolver bound to one session.
    pub fn new(session: &'a SessionContext<E, T>) -> Self {
        Self { session }
    }

    /// Lists the conflicting revisions of a document.
    ///
    /// Returns `None` when the document is not conflicted. Listing a
    /// clean document is a no-op and may be repeated freely.
    pub fn list_conflicts(&self, id: &str) -> ClientResult<Option<DocumentConflict>> {
        let mut command = GetConflictsCommand::new(id)?;
        self.session.increment_request_count();
        execute_command(self.session.executor(), self.session.node(), &mut command)?;

        let Some(listing) = command.take_result() else {
            return Ok(None);
        };
        Ok(DocumentConflict::from_listing(listing))
    }

    /// Builds the write that would resolve a conflict in favor of the
    /// given candidate, without executing it.
    ///
    /// The put carries no concurrency token: resolution must succeed
    /// regardless of which divergent state the receiving node holds.
    pub fn resolution_command(
        &self,
        id: &str,
        candidate: &ConflictCandidate,
    ) -> ClientResult<PutDocumentCommand> {
        Ok(PutDocumentCommand::new(id, None, candidate.doc.clone())?)
    }

    /// Resolves a conflict by writing the chosen candidate back.
    pub fn resolve(&self, id: &str, candidate: &ConflictCandidate) -> ClientResult<PutResult> {
        tracing::debug!(id, "resolving document conflict");
        self.session.store(id, None, candidate.doc.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::conventions::Conventions;
    use crate::executor::MockExecutor;
    use crate::tracking::MemoryTracker;
    use nimbusdb_protocol::{HttpMethod, RawResponse, ServerNode, IF_MATCH_HEADER};
    use serde_json::json;

    fn session() -> SessionContext<MockExecutor, MemoryTracker> {
        SessionContext::new(
            ClientConfig::new("northwind"),
            Conventions::default(),
            ServerNode::new("http://node-a:8080", "northwind"),
            MockExecutor::new(),
            MemoryTracker::new(),
        )
    }

    fn conflicted_listing() -> String {
        json!({
            "Id": "docs/1",
            "Results": [
                { "Doc": { "name": "Value" }, "ChangeVector": "A:1-n1" },
                { "Doc": { "name": "Value2" }, "ChangeVector": "B:1-n2" }
            ]
        })
        .to_string()
    }

    #[test]
    fn lists_conflicting_revisions() {
        let session = session();
        session
            .executor()
            .enqueue(RawResponse::ok(conflicted_listing()));

        let resolver = ConflictResolver::new(&session);
        let conflict = resolver.list_conflicts("docs/1").unwrap().unwrap();
        assert_eq!(conflict.id(), "docs/1");
        assert_eq!(conflict.candidates().len(), 2);
        assert_eq!(conflict.candidate(0).unwrap().doc["name"], "Value");
    }

    #[test]
    fn clean_document_lists_nothing_repeatedly() {
        let session = session();
        let empty = json!({ "Id": "docs/1", "Results": [] }).to_string();
        session.executor().set_default_response(RawResponse::ok(empty));

        let resolver = ConflictResolver::new(&session);
        assert!(resolver.list_conflicts("docs/1").unwrap().is_none());
        assert!(resolver.list_conflicts("docs/1").unwrap().is_none());
        assert_eq!(session.executor().request_count(), 2);
    }

    #[test]
    fn resolution_put_carries_no_concurrency_token() {
        let session = session();
        let resolver = ConflictResolver::new(&session);

        let candidate = ConflictCandidate {
            doc: json!({ "name": "Value" }),
            change_vector: "A:1-n1".into(),
        };
        let command = resolver.resolution_command("docs/1", &candidate).unwrap();
        let request = command.build_request(session.node()).unwrap();

        assert_eq!(request.method, HttpMethod::Put);
        assert_eq!(request.header(IF_MATCH_HEADER), None);
    }

    #[test]
    fn resolve_writes_the_chosen_candidate() {
        let session = session();
        session.executor().enqueue(RawResponse::created(
            r#"{"Id":"docs/1","ChangeVector":"A:2-n1"}"#,
        ));

        let resolver = ConflictResolver::new(&session);
        let candidate = ConflictCandidate {
            doc: json!({ "name": "Value" }),
            change_vector: "A:1-n1".into(),
        };
        let result = resolver.resolve("docs/1", &candidate).unwrap();
        assert_eq!(result.id, "docs/1");

        let requests = session.executor().requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].uri.contains("/docs?id=docs%2F1"));
        assert_eq!(
            requests[0].body.as_deref(),
            Some(r#"{"name":"Value"}"#)
        );
    }
}
