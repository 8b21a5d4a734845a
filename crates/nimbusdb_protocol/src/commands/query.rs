//! Executes one index query exchange.

use crate::command::{HttpMethod, ProtocolCommand, RequestDescription, ServerNode};
use crate::error::{ProtocolError, ProtocolResult};
use crate::query::{IndexQuery, QueryResult};
use serde_json::json;

/// Sends one index query and parses its result.
///
/// The staleness loop lives above this command; each retry builds a
/// fresh command rather than resending a consumed one.
#[derive(Debug)]
pub struct QueryCommand {
    query: IndexQuery,
    metadata_only: bool,
    index_entries_only: bool,
    result: Option<QueryResult>,
}

impl QueryCommand {
    /// Creates the command. The query text must be non-empty.
    pub fn new(
        query: IndexQuery,
        metadata_only: bool,
        index_entries_only: bool,
    ) -> ProtocolResult<Self> {
        if query.query.trim().is_empty() {
            return Err(ProtocolError::invalid_argument(
                "query",
                "must not be empty",
            ));
        }
        Ok(Self {
            query,
            metadata_only,
            index_entries_only,
            result: None,
        })
    }
}

impl ProtocolCommand for QueryCommand {
    type Result = QueryResult;

    fn build_request(&self, node: &ServerNode) -> ProtocolResult<RequestDescription> {
        let mut uri = format!("{}/queries", node.database_url());
        if self.metadata_only {
            uri.push_str("?metadataOnly=true");
        }
        if self.index_entries_only {
            uri.push_str(if self.metadata_only { "&" } else { "?" });
            uri.push_str("indexEntriesOnly=true");
        }

        let body = serde_json::to_string(&json!({
            "Query": self.query.query,
            "QueryParameters": self.query.query_parameters,
            "Start": self.query.start,
            "PageSize": self.query.page_size(),
            "WaitForNonStaleResults": self.query.wait_for_non_stale_results,
        }))?;

        Ok(RequestDescription::new(HttpMethod::Post, uri).with_json_body(body))
    }

    fn parse_response(&mut self, body: Option<&str>, _from_cache: bool) -> ProtocolResult<()> {
        let body = body.ok_or_else(|| {
            ProtocolError::InvalidResponse("query response is missing a body".to_string())
        })?;
        self.result = Some(serde_json::from_str(body)?);
        Ok(())
    }

    fn is_read_request(&self) -> bool {
        true
    }

    fn take_result(&mut self) -> Option<QueryResult> {
        self.result.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node() -> ServerNode {
        ServerNode::new("http://node-a:8080", "northwind")
    }

    #[test]
    fn rejects_blank_query() {
        assert!(matches!(
            QueryCommand::new(IndexQuery::new("  "), false, false),
            Err(ProtocolError::InvalidArgument { argument: "query", .. })
        ));
    }

    #[test]
    fn builds_query_post() {
        let mut query = IndexQuery::new("from Users where name = $name");
        query.set_page_size(10);
        query
            .query_parameters
            .insert("name".to_string(), serde_json::json!("Arek"));

        let cmd = QueryCommand::new(query, false, false).unwrap();
        assert!(cmd.is_read_request());

        let req = cmd.build_request(&node()).unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.uri, "http://node-a:8080/databases/northwind/queries");

        let body: serde_json::Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body["Query"], "from Users where name = $name");
        assert_eq!(body["PageSize"], 10);
        assert_eq!(body["QueryParameters"]["name"], "Arek");
        assert_eq!(body["WaitForNonStaleResults"], false);
    }

    #[test]
    fn flags_attach_query_parameters() {
        let cmd = QueryCommand::new(IndexQuery::new("from Users"), true, true).unwrap();
        let req = cmd.build_request(&node()).unwrap();
        assert!(req.uri.contains("metadataOnly=true"));
        assert!(req.uri.contains("indexEntriesOnly=true"));
    }

    #[test]
    fn parses_query_result() {
        let mut cmd = QueryCommand::new(IndexQuery::new("from Users"), false, false).unwrap();
        cmd.parse_response(
            Some(r#"{"Results":[{"name":"Arek"}],"IsStale":false,"TotalResults":1}"#),
            false,
        )
        .unwrap();

        let result = cmd.take_result().unwrap();
        assert_eq!(result.results.len(), 1);
        assert!(!result.is_stale);
    }

    #[test]
    fn missing_body_is_invalid() {
        let mut cmd = QueryCommand::new(IndexQuery::new("from Users"), false, false).unwrap();
        assert!(matches!(
            cmd.parse_response(None, false),
            Err(ProtocolError::InvalidResponse(_))
        ));
    }
}
