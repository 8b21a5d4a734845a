//! The query consistency engine.
//!
//! One query execution walks an explicit state machine:
//! armed → in flight → result received → stale check → accepted.
//! The staleness deadline is computed once on entry, making the timeout
//! boundary a first-class, independently testable unit.

use crate::conventions::DocumentType;
use crate::error::{ClientError, ClientResult};
use crate::executor::{execute_command, CommandExecutor};
use crate::projection::{deserialize_document, ProjectionSpec};
use crate::session::SessionContext;
use crate::tracking::{EntityTracker, METADATA_ID, METADATA_KEY};
use nimbusdb_protocol::commands::QueryCommand;
use nimbusdb_protocol::{IndexQuery, ProtocolCommand, QueryResult};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Instant;

/// Where a query execution currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryState {
    /// Constructed and validated; nothing sent yet.
    Armed,
    /// One command is on the wire.
    InFlight,
    /// A result arrived and is being checked.
    ResultReceived,
    /// The staleness policy is being applied to the result.
    StaleCheck,
    /// The result was frozen into an immutable snapshot. Terminal.
    Accepted,
}

impl QueryState {
    /// True once the result snapshot is frozen.
    #[must_use]
    pub fn is_accepted(self) -> bool {
        matches!(self, QueryState::Accepted)
    }
}

/// What to do after a result has been checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryDisposition {
    /// The result was accepted; processing may continue.
    Accepted,
    /// The result was stale and the caller wants a fresh one; re-issue
    /// the query with a new command.
    RetryStale,
}

/// Executes one index query and enforces the caller's staleness policy.
pub struct QueryOperation<'a, E: CommandExecutor, T: EntityTracker> {
    session: &'a SessionContext<E, T>,
    index_name: String,
    query: IndexQuery,
    fields_to_fetch: Option<ProjectionSpec>,
    disable_entities_tracking: bool,
    metadata_only: bool,
    index_entries_only: bool,
    state: QueryState,
    started_at: Option<Instant>,
    deadline: Option<Instant>,
    current_results: Option<QueryResult>,
}

impl<'a, E: CommandExecutor, T: EntityTracker> QueryOperation<'a, E, T> {
    /// Creates a query operation.
    ///
    /// Fails fast with `InvalidOperation` when no page size was set and
    /// the conventions demand one; an accidental unbounded fetch never
    /// reaches the network.
    pub fn new(
        session: &'a SessionContext<E, T>,
        index_name: impl Into<String>,
        query: IndexQuery,
        fields_to_fetch: Option<ProjectionSpec>,
        disable_entities_tracking: bool,
    ) -> ClientResult<Self> {
        if session.conventions().throw_if_query_page_size_is_not_set && !query.is_page_size_set() {
            return Err(ClientError::InvalidOperation(
                "attempt to query without explicitly specifying a page size; \
                 set one on the query, or disable the check on the conventions"
                    .to_string(),
            ));
        }

        Ok(Self {
            session,
            index_name: index_name.into(),
            query,
            fields_to_fetch,
            disable_entities_tracking,
            metadata_only: false,
            index_entries_only: false,
            state: QueryState::Armed,
            started_at: None,
            deadline: None,
            current_results: None,
        })
    }

    /// Requests document metadata only.
    #[must_use]
    pub fn metadata_only(mut self) -> Self {
        self.metadata_only = true;
        self
    }

    /// Requests raw index entries instead of documents.
    #[must_use]
    pub fn index_entries_only(mut self) -> Self {
        self.index_entries_only = true;
        self
    }

    /// Current state of the execution.
    #[must_use]
    pub fn state(&self) -> QueryState {
        self.state
    }

    /// The accepted snapshot, once there is one.
    #[must_use]
    pub fn query_result(&self) -> Option<&QueryResult> {
        self.current_results.as_ref()
    }

    /// Builds a fresh command for one exchange.
    ///
    /// The deadline is computed once, on the first request; stale
    /// retries reuse it. Each retry gets a new command object; a
    /// consumed one is never resent.
    pub fn create_request(&mut self) -> ClientResult<QueryCommand> {
        self.session.increment_request_count();

        if self.started_at.is_none() {
            let now = Instant::now();
            self.started_at = Some(now);
            if self.query.wait_for_non_stale_results {
                let budget = self
                    .query
                    .wait_for_non_stale_results_timeout
                    .unwrap_or(self.session.config().default_stale_wait);
                self.deadline = Some(now + budget);
            }
        }

        tracing::debug!(
            query = %self.query.query,
            index = %self.index_name,
            "executing query"
        );

        self.state = QueryState::InFlight;
        Ok(QueryCommand::new(
            self.query.clone(),
            self.metadata_only,
            self.index_entries_only,
        )?)
    }

    /// Applies the staleness policy to a received result.
    ///
    /// An absent result is terminal: the index does not exist. A stale
    /// result with wait-for-non-stale requested is recoverable until the
    /// deadline, then fails with `Timeout` carrying the elapsed time.
    /// A stale result without the wait is accepted; its staleness flag
    /// surfaces to the caller, never hidden.
    pub fn set_result(&mut self, result: Option<QueryResult>) -> ClientResult<QueryDisposition> {
        self.state = QueryState::ResultReceived;
        let Some(result) = result else {
            return Err(ClientError::IndexNotFound {
                index: self.index_name.clone(),
            });
        };

        self.state = QueryState::StaleCheck;
        if self.query.wait_for_non_stale_results && result.is_stale {
            let started_at = self.started_at.unwrap_or_else(Instant::now);
            if self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                return Err(ClientError::Timeout {
                    elapsed: started_at.elapsed(),
                });
            }
            return Ok(QueryDisposition::RetryStale);
        }

        tracing::debug!(
            query = %self.query.query,
            results = result.results.len(),
            total = result.total_results,
            stale = result.is_stale,
            "query returned"
        );

        self.current_results = Some(result);
        self.state = QueryState::Accepted;
        Ok(QueryDisposition::Accepted)
    }

    /// Drives the exchange to acceptance, re-issuing on stale results
    /// until the deadline.
    pub fn execute(&mut self) -> ClientResult<()> {
        loop {
            let mut command = self.create_request()?;
            execute_command(self.session.executor(), self.session.node(), &mut command)?;

            match self.set_result(command.take_result())? {
                QueryDisposition::Accepted => return Ok(()),
                QueryDisposition::RetryStale => {
                    let mut pause = self.session.config().stale_retry_interval;
                    if let Some(deadline) = self.deadline {
                        pause = pause.min(deadline.saturating_duration_since(Instant::now()));
                    }
                    std::thread::sleep(pause);
                }
            }
        }
    }

    /// Converts the accepted snapshot into caller-facing values.
    ///
    /// Include registration is skipped entirely when entity tracking is
    /// disabled for this call. Any parse failure aborts the whole
    /// batch; partial results are not returned.
    pub fn complete(&self, target: Option<&DocumentType>) -> ClientResult<Vec<Value>> {
        let Some(snapshot) = &self.current_results else {
            return Err(ClientError::InvalidOperation(
                "query has no accepted result to complete".to_string(),
            ));
        };

        if !self.disable_entities_tracking {
            self.session.tracker().register_includes(&snapshot.includes);
        }

        let mut list = Vec::with_capacity(snapshot.results.len());
        for document in &snapshot.results {
            let metadata = document.get(METADATA_KEY).cloned().unwrap_or(Value::Null);
            let id = metadata.get(METADATA_ID).and_then(Value::as_str);

            let entity = deserialize_document(
                id,
                document,
                &metadata,
                self.fields_to_fetch.as_ref(),
                self.disable_entities_tracking,
                self.session.conventions(),
                self.session.tracker(),
                target,
            )
            .map_err(|err| {
                tracing::warn!(query = %self.query.query, %err, "unable to read query result");
                err
            })?;
            list.push(entity);
        }

        if !self.disable_entities_tracking {
            self.session
                .tracker()
                .register_missing_includes(&snapshot.results, &snapshot.includes);
        }

        tracing::debug!(
            query = %self.query.query,
            duration_ms = snapshot.duration_in_ms,
            "query completed"
        );

        Ok(list)
    }

    /// Like [`complete`](Self::complete), deserializing each value into `D`.
    pub fn complete_as<D: DeserializeOwned>(
        &self,
        target: Option<&DocumentType>,
    ) -> ClientResult<Vec<D>> {
        self.complete(target)?
            .into_iter()
            .map(|value| serde_json::from_value(value).map_err(ClientError::from))
            .collect()
    }
}
