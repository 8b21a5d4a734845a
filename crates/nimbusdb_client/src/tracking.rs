//! Identity tracking: the client-side map from document identifier to
//! the in-memory entity representing it.

use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Metadata key carried on every document.
pub const METADATA_KEY: &str = "@metadata";

/// Metadata property holding the document identifier.
pub const METADATA_ID: &str = "@id";

/// The identity-tracking collaborator.
///
/// Concurrent queries share one tracker; implementations synchronize
/// internally, so the query engine itself holds no cross-query state.
pub trait EntityTracker: Send + Sync {
    /// Hands a full (non-projected) entity to the tracker.
    ///
    /// Returns the entity to surface to the caller. When
    /// `disable_tracking` is set the document passes through without
    /// being registered.
    fn track_entity(
        &self,
        type_name: Option<&str>,
        id: Option<&str>,
        document: &Value,
        metadata: &Value,
        disable_tracking: bool,
    ) -> Value;

    /// Registers eagerly fetched related documents.
    fn register_includes(&self, includes: &Map<String, Value>);

    /// Registers identifiers the results referenced but the includes did
    /// not carry.
    fn register_missing_includes(&self, results: &[Value], includes: &Map<String, Value>);
}

/// An in-memory tracker, for tests and simple sessions.
#[derive(Debug, Default)]
pub struct MemoryTracker {
    entities: RwLock<HashMap<String, Value>>,
    includes: RwLock<HashMap<String, Value>>,
    missing_includes: RwLock<Vec<String>>,
}

impl MemoryTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the tracked entity for an identifier, if any.
    pub fn tracked(&self, id: &str) -> Option<Value> {
        self.entities.read().get(id).cloned()
    }

    /// Number of tracked entities.
    pub fn tracked_count(&self) -> usize {
        self.entities.read().len()
    }

    /// Registered include identifiers.
    pub fn include_ids(&self) -> Vec<String> {
        let mut ids: Vec<_> = self.includes.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Identifiers registered as missing includes.
    pub fn missing_include_ids(&self) -> Vec<String> {
        self.missing_includes.read().clone()
    }
}

impl EntityTracker for MemoryTracker {
    fn track_entity(
        &self,
        _type_name: Option<&str>,
        id: Option<&str>,
        document: &Value,
        _metadata: &Value,
        disable_tracking: bool,
    ) -> Value {
        if !disable_tracking {
            if let Some(id) = id {
                self.entities
                    .write()
                    .insert(id.to_string(), document.clone());
            }
        }
        document.clone()
    }

    fn register_includes(&self, includes: &Map<String, Value>) {
        let mut map = self.includes.write();
        for (id, doc) in includes {
            map.insert(id.clone(), doc.clone());
        }
    }

    fn register_missing_includes(&self, results: &[Value], includes: &Map<String, Value>) {
        // Any identifier a result references that neither the includes
        // nor the tracked set can satisfy is recorded as missing.
        let entities = self.entities.read();
        let mut missing = self.missing_includes.write();
        for result in results {
            let Some(refs) = result.get("references").and_then(Value::as_array) else {
                continue;
            };
            for reference in refs {
                let Some(id) = reference.as_str() else {
                    continue;
                };
                if !includes.contains_key(id) && !entities.contains_key(id) {
                    missing.push(id.to_string());
                }
            }
        }
    }
}
