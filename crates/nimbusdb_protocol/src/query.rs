//! Index queries and their results.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

/// A query against a (possibly stale) secondary index.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexQuery {
    /// The query text.
    pub query: String,
    /// Named query parameters.
    pub query_parameters: Map<String, Value>,
    /// Number of results to skip.
    pub start: u32,
    /// Maximum number of results to return; unset means unbounded.
    page_size: Option<u32>,
    /// Whether the caller insists on a non-stale result.
    pub wait_for_non_stale_results: bool,
    /// Caller's staleness budget; falls back to the client default.
    pub wait_for_non_stale_results_timeout: Option<Duration>,
}

impl IndexQuery {
    /// Creates a query with no paging and no staleness requirement.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            query_parameters: Map::new(),
            start: 0,
            page_size: None,
            wait_for_non_stale_results: false,
            wait_for_non_stale_results_timeout: None,
        }
    }

    /// Sets the page size.
    pub fn set_page_size(&mut self, page_size: u32) {
        self.page_size = Some(page_size);
    }

    /// Returns the effective page size; unbounded when unset.
    #[must_use]
    pub fn page_size(&self) -> u32 {
        self.page_size.unwrap_or(u32::MAX)
    }

    /// Whether the caller explicitly set a page size.
    #[must_use]
    pub fn is_page_size_set(&self) -> bool {
        self.page_size.is_some()
    }

    /// Requests a non-stale result within the given budget.
    #[must_use]
    pub fn wait_for_non_stale_results(mut self, timeout: Option<Duration>) -> Self {
        self.wait_for_non_stale_results = true;
        self.wait_for_non_stale_results_timeout = timeout;
        self
    }
}

/// The result of one index query exchange.
///
/// Once accepted by the query engine this is treated as an immutable
/// snapshot for the remainder of that query's processing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct QueryResult {
    /// Raw matching documents, in result order.
    pub results: Vec<Value>,
    /// Eagerly fetched related documents, keyed by identifier.
    pub includes: Map<String, Value>,
    /// Whether the index had not yet caught up with the latest writes.
    pub is_stale: bool,
    /// Total number of index results, ignoring paging.
    pub total_results: u64,
    /// Server-side query duration in milliseconds.
    pub duration_in_ms: u64,
    /// Name of the index that served the query.
    pub index_name: String,
}
