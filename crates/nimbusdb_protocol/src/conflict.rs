//! Document conflicts between divergent replica revisions.

use crate::change_vector::ChangeVector;
use crate::error::{ProtocolError, ProtocolResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// One divergent revision of a conflicted document, as contributed by a
/// replica.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ConflictCandidate {
    /// The candidate's document body.
    pub doc: Value,
    /// The candidate's change vector.
    pub change_vector: ChangeVector,
}

/// Wire shape of the conflict listing for one identifier.
///
/// An empty `results` set means the identifier is clean.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct GetConflictsResult {
    /// The document identifier that was queried.
    pub id: String,
    /// Candidate revisions, one per replica that diverged.
    pub results: Vec<ConflictCandidate>,
}

/// Two or more divergent revisions of the same document identifier held
/// by different replicas, pending explicit resolution.
///
/// A conflict never has fewer than two candidates. Candidates are
/// immutable data transferred by value; resolving collapses them into a
/// single (body, new change vector) pair server-side.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentConflict {
    id: String,
    candidates: Vec<ConflictCandidate>,
}

impl DocumentConflict {
    /// Creates a conflict from its candidate set.
    ///
    /// Fails with `InvalidArgument` when fewer than two candidates are
    /// supplied; a single revision is not a conflict.
    pub fn new(
        id: impl Into<String>,
        candidates: Vec<ConflictCandidate>,
    ) -> ProtocolResult<Self> {
        if candidates.len() < 2 {
            return Err(ProtocolError::invalid_argument(
                "candidates",
                format!("a conflict requires at least 2 candidates, got {}", candidates.len()),
            ));
        }
        Ok(Self {
            id: id.into(),
            candidates,
        })
    }

    /// Converts a conflict listing into a conflict, or `None` when the
    /// identifier is clean (fewer than two candidates).
    #[must_use]
    pub fn from_listing(listing: GetConflictsResult) -> Option<Self> {
        if listing.results.len() < 2 {
            return None;
        }
        Some(Self {
            id: listing.id,
            candidates: listing.results,
        })
    }

    /// The conflicted document identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The candidate revisions, in the order the server reported them.
    #[must_use]
    pub fn candidates(&self) -> &[ConflictCandidate] {
        &self.candidates
    }

    /// Returns the candidate at `index`, if any.
    #[must_use]
    pub fn candidate(&self, index: usize) -> Option<&ConflictCandidate> {
        self.candidates.get(index)
    }
}

impl fmt::Display for DocumentConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "document `{}` is conflicted ({} candidate revisions)",
            self.id,
            self.candidates.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn candidate(name: &str, cv: &str) -> ConflictCandidate {
        ConflictCandidate {
            doc: json!({ "name": name }),
            change_vector: ChangeVector::new(cv),
        }
    }

    #[test]
    fn requires_at_least_two_candidates() {
        let err = DocumentConflict::new("docs/1", vec![candidate("Value", "A:1-n1")]);
        assert!(matches!(
            err,
            Err(ProtocolError::InvalidArgument { argument: "candidates", .. })
        ));

        let ok = DocumentConflict::new(
            "docs/1",
            vec![candidate("Value", "A:1-n1"), candidate("Value2", "B:1-n2")],
        )
        .unwrap();
        assert_eq!(ok.candidates().len(), 2);
    }

    #[test]
    fn clean_listing_is_not_a_conflict() {
        let listing = GetConflictsResult {
            id: "docs/1".to_string(),
            results: vec![],
        };
        assert!(DocumentConflict::from_listing(listing).is_none());
    }

    #[test]
    fn listing_wire_keys() {
        let json = r#"{
            "Id": "docs/1",
            "Results": [
                {"Doc": {"name": "Value"}, "ChangeVector": "A:1-n1"},
                {"Doc": {"name": "Value2"}, "ChangeVector": "B:1-n2"}
            ]
        }"#;

        let listing: GetConflictsResult = serde_json::from_str(json).unwrap();
        let conflict = DocumentConflict::from_listing(listing).unwrap();
        assert_eq!(conflict.id(), "docs/1");
        assert_ne!(
            conflict.candidate(0).unwrap().change_vector,
            conflict.candidate(1).unwrap().change_vector
        );
    }
}
