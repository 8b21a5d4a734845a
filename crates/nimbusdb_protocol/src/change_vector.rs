//! Change vectors for optimistic concurrency.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An opaque causal-version token for a document revision.
///
/// A change vector represents the version of a document as observed by a
/// specific node/replica set. It is comparable only for equality and is
/// never parsed for meaning on the client side.
///
/// On writes, an absent change vector (`Option::None`) means "overwrite
/// unconditionally"; a present one means "fail if the server's current
/// token differs". A new change vector always replaces the old one on a
/// successful write; no component mutates one in place.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeVector(String);

impl ChangeVector {
    /// Creates a change vector from its server-issued string form.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Returns the raw token.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChangeVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ChangeVector {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for ChangeVector {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}
