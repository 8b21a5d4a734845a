//! End-to-end exercises against an in-memory two-replica cluster.
//!
//! The fake replicas store documents, replicate on demand and record a
//! conflict whenever both sides wrote the same identifier divergently,
//! mirroring how a real cluster surfaces eventual-consistency anomalies
//! to the client.

use nimbusdb_client::{
    ClientConfig, ClientError, ClientResult, CommandExecutor, ConflictResolver, Conventions,
    MemoryTracker, SessionContext,
};
use nimbusdb_protocol::{
    ConflictCandidate, HttpMethod, RawResponse, RequestDescription, ServerNode, IF_MATCH_HEADER,
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

struct StoredDoc {
    body: Value,
    change_vector: String,
}

/// One in-memory replica: a document store plus a conflict register.
struct FakeReplica {
    tag: &'static str,
    etag: AtomicU64,
    docs: Mutex<HashMap<String, StoredDoc>>,
    conflicts: Mutex<HashMap<String, Vec<ConflictCandidate>>>,
}

impl FakeReplica {
    fn new(tag: &'static str) -> Arc<Self> {
        Arc::new(Self {
            tag,
            etag: AtomicU64::new(0),
            docs: Mutex::new(HashMap::new()),
            conflicts: Mutex::new(HashMap::new()),
        })
    }

    fn next_change_vector(&self) -> String {
        let n = self.etag.fetch_add(1, Ordering::SeqCst) + 1;
        format!("{}:{}-{}", self.tag, n, self.tag.to_lowercase())
    }

    fn conflict_listing(&self, id: &str) -> Option<String> {
        let conflicts = self.conflicts.lock();
        let candidates = conflicts.get(id)?;
        Some(
            json!({
                "Id": id,
                "Results": candidates,
            })
            .to_string(),
        )
    }

    fn handle_put(&self, id: &str, if_match: Option<&str>, body: &str) -> RawResponse {
        // Writes against a conflicted identifier: a conditional write can
        // never match (the server has no single current version), so it
        // is rejected with the candidate set. An unconditional write
        // resolves the conflict.
        if self.conflicts.lock().contains_key(id) {
            if if_match.is_some() {
                return RawResponse::conflict(
                    self.conflict_listing(id).unwrap_or_default(),
                );
            }
            self.conflicts.lock().remove(id);
        } else if let Some(expected) = if_match {
            let docs = self.docs.lock();
            let current = docs.get(id).map(|doc| doc.change_vector.as_str());
            if current != Some(expected.trim_matches('"')) {
                return RawResponse {
                    status: 409,
                    body: self.conflict_listing(id),
                };
            }
        }

        let parsed: Value = match serde_json::from_str(body) {
            Ok(value) => value,
            Err(_) => return RawResponse { status: 400, body: None },
        };
        let change_vector = self.next_change_vector();
        self.docs.lock().insert(
            id.to_string(),
            StoredDoc {
                body: parsed,
                change_vector: change_vector.clone(),
            },
        );

        RawResponse::created(
            json!({ "Id": id, "ChangeVector": change_vector }).to_string(),
        )
    }

    fn handle_get(&self, id: &str) -> RawResponse {
        if let Some(listing) = self.conflict_listing(id) {
            return RawResponse::conflict(listing);
        }

        let docs = self.docs.lock();
        let Some(stored) = docs.get(id) else {
            return RawResponse::not_found();
        };

        let mut document = stored.body.clone();
        if let Some(map) = document.as_object_mut() {
            map.insert(
                "@metadata".to_string(),
                json!({ "@id": id, "@change-vector": stored.change_vector }),
            );
        }
        RawResponse::ok(
            json!({ "Results": [document], "Includes": {} }).to_string(),
        )
    }

    fn handle_conflicts(&self, id: &str) -> RawResponse {
        match self.conflict_listing(id) {
            Some(listing) => RawResponse::ok(listing),
            None => RawResponse::ok(json!({ "Id": id, "Results": [] }).to_string()),
        }
    }
}

fn query_param(uri: &str, name: &str) -> Option<String> {
    let (_, query) = uri.split_once('?')?;
    query
        .split('&')
        .find_map(|pair| pair.strip_prefix(&format!("{name}=")))
        .map(|value| value.replace("%2F", "/"))
}

/// Local handle around the shared replica so the foreign
/// [`CommandExecutor`] trait can be implemented without tripping the
/// orphan rule on `Arc`.
struct ReplicaHandle(Arc<FakeReplica>);

impl std::ops::Deref for ReplicaHandle {
    type Target = FakeReplica;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl CommandExecutor for ReplicaHandle {
    fn execute(&self, request: &RequestDescription, _is_read: bool) -> ClientResult<RawResponse> {
        if request.uri.contains("/replication/conflicts?") {
            let id = query_param(&request.uri, "docId").unwrap_or_default();
            return Ok(self.handle_conflicts(&id));
        }
        if request.uri.contains("/docs?") {
            let id = query_param(&request.uri, "id").unwrap_or_default();
            return Ok(match request.method {
                HttpMethod::Put => self.handle_put(
                    &id,
                    request.header(IF_MATCH_HEADER),
                    request.body.as_deref().unwrap_or("null"),
                ),
                HttpMethod::Get => self.handle_get(&id),
                _ => RawResponse { status: 400, body: None },
            });
        }
        Err(ClientError::NodeFailure {
            message: format!("unrouted request: {}", request.uri),
            retryable: false,
        })
    }
}

/// Two replicas and an on-demand replication pump.
struct FakeCluster {
    a: Arc<FakeReplica>,
    b: Arc<FakeReplica>,
}

impl FakeCluster {
    fn new() -> Self {
        Self {
            a: FakeReplica::new("A"),
            b: FakeReplica::new("B"),
        }
    }

    /// Replicates both ways. Identifiers written divergently on both
    /// sides become conflicts on both; one-sided writes are copied.
    fn sync(&self) {
        let mut docs_a = self.a.docs.lock();
        let mut docs_b = self.b.docs.lock();

        let ids: Vec<String> = docs_a.keys().chain(docs_b.keys()).cloned().collect();
        for id in ids {
            match (docs_a.get(&id), docs_b.get(&id)) {
                (Some(doc_a), Some(doc_b)) if doc_a.change_vector != doc_b.change_vector => {
                    let candidates = vec![
                        ConflictCandidate {
                            doc: doc_a.body.clone(),
                            change_vector: doc_a.change_vector.as_str().into(),
                        },
                        ConflictCandidate {
                            doc: doc_b.body.clone(),
                            change_vector: doc_b.change_vector.as_str().into(),
                        },
                    ];
                    self.a.conflicts.lock().insert(id.clone(), candidates.clone());
                    self.b.conflicts.lock().insert(id.clone(), candidates);
                }
                (Some(doc_a), None) => {
                    docs_b.insert(
                        id.clone(),
                        StoredDoc {
                            body: doc_a.body.clone(),
                            change_vector: doc_a.change_vector.clone(),
                        },
                    );
                }
                (None, Some(doc_b)) => {
                    docs_a.insert(
                        id.clone(),
                        StoredDoc {
                            body: doc_b.body.clone(),
                            change_vector: doc_b.change_vector.clone(),
                        },
                    );
                }
                _ => {}
            }
        }
    }
}

fn session_for(replica: &Arc<FakeReplica>) -> SessionContext<ReplicaHandle, MemoryTracker> {
    SessionContext::new(
        ClientConfig::new("northwind"),
        Conventions::default(),
        ServerNode::new("http://node:8080", "northwind"),
        ReplicaHandle(Arc::clone(replica)),
        MemoryTracker::new(),
    )
}

#[test]
fn one_sided_writes_replicate_cleanly() {
    let cluster = FakeCluster::new();
    let session_a = session_for(&cluster.a);
    let session_b = session_for(&cluster.b);

    session_a
        .store("docs/1", None, json!({ "name": "Value" }))
        .unwrap();
    assert!(session_b.load("docs/1").unwrap().is_none());

    cluster.sync();

    let entity = session_b.load("docs/1").unwrap().unwrap();
    assert_eq!(entity["name"], "Value");
}

#[test]
fn divergent_writes_conflict_and_resolve() {
    let cluster = FakeCluster::new();
    let session_a = session_for(&cluster.a);
    let session_b = session_for(&cluster.b);

    session_a
        .store("docs/1", None, json!({ "name": "Value" }))
        .unwrap();
    session_b
        .store("docs/1", None, json!({ "name": "Value2" }))
        .unwrap();
    cluster.sync();

    // Loading never picks a winner; it surfaces the candidate set.
    let err = session_b.load("docs/1").unwrap_err();
    let conflict = match err {
        ClientError::DocumentConflict { conflict } => conflict,
        other => panic!("expected DocumentConflict, got {other:?}"),
    };
    assert_eq!(conflict.id(), "docs/1");
    assert_eq!(conflict.candidates().len(), 2);

    let resolver = ConflictResolver::new(&session_b);
    let listed = resolver.list_conflicts("docs/1").unwrap().unwrap();
    assert_eq!(listed, conflict);

    let chosen = listed.candidate(0).unwrap().clone();
    resolver.resolve("docs/1", &chosen).unwrap();

    let entity = session_b.load("docs/1").unwrap().unwrap();
    assert_eq!(entity["name"], chosen.doc["name"]);
}

#[test]
fn conditional_write_cannot_resolve_a_conflict() {
    let cluster = FakeCluster::new();
    let session_a = session_for(&cluster.a);
    let session_b = session_for(&cluster.b);

    session_a
        .store("docs/1", None, json!({ "name": "Value" }))
        .unwrap();
    session_b
        .store("docs/1", None, json!({ "name": "Value2" }))
        .unwrap();
    cluster.sync();

    let resolver = ConflictResolver::new(&session_b);
    let conflict = resolver.list_conflicts("docs/1").unwrap().unwrap();
    let chosen = conflict.candidate(0).unwrap().clone();

    // A write carrying a concurrency token is rejected while the
    // identifier is conflicted, whichever candidate it came from.
    let err = session_b
        .store("docs/1", Some(chosen.change_vector.clone()), chosen.doc.clone())
        .unwrap_err();
    assert!(matches!(err, ClientError::DocumentConflict { .. }));

    // The unconditional write still goes through afterwards.
    resolver.resolve("docs/1", &chosen).unwrap();
    assert!(session_b.load("docs/1").is_ok());
}

#[test]
fn listing_conflicts_on_a_clean_identifier_is_idempotent() {
    let cluster = FakeCluster::new();
    let session_a = session_for(&cluster.a);

    session_a
        .store("docs/1", None, json!({ "name": "Value" }))
        .unwrap();

    let resolver = ConflictResolver::new(&session_a);
    assert!(resolver.list_conflicts("docs/1").unwrap().is_none());
    assert!(resolver.list_conflicts("docs/1").unwrap().is_none());
    assert!(resolver.list_conflicts("docs/missing").unwrap().is_none());
}

#[test]
fn resolution_replicates_to_the_other_side() {
    let cluster = FakeCluster::new();
    let session_a = session_for(&cluster.a);
    let session_b = session_for(&cluster.b);

    session_a
        .store("docs/1", None, json!({ "name": "Value" }))
        .unwrap();
    session_b
        .store("docs/1", None, json!({ "name": "Value2" }))
        .unwrap();
    cluster.sync();

    let resolver = ConflictResolver::new(&session_b);
    let conflict = resolver.list_conflicts("docs/1").unwrap().unwrap();
    let chosen = conflict.candidate(1).unwrap().clone();
    resolver.resolve("docs/1", &chosen).unwrap();

    // The other replica still holds the conflict until it hears about
    // the resolution.
    assert!(session_a.load("docs/1").is_err());

    // After resolution the resolved side wins the next sync: clear the
    // stale conflict marker the way a resolution message would.
    cluster.a.conflicts.lock().remove("docs/1");
    cluster.a.docs.lock().remove("docs/1");
    cluster.sync();

    let entity = session_a.load("docs/1").unwrap().unwrap();
    assert_eq!(entity["name"], "Value2");
}
