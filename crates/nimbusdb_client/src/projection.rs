//! Turning raw query hits into entities and projections.

use crate::conventions::{Conventions, DocumentType};
use crate::error::ClientResult;
use crate::tracking::EntityTracker;
use serde_json::{Map, Value};

/// Metadata marker set by the server on projected results.
pub const PROJECTION_MARKER: &str = "@projection";

/// The fields a query asked to fetch, as distinguished from the full
/// set of fields the server returned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectionSpec {
    /// Selected field names, in selection order.
    pub projections: Vec<String>,
    /// Server-side field paths backing each selection.
    pub fields_to_fetch: Vec<String>,
}

impl ProjectionSpec {
    /// Creates a spec where selections and fetched fields coincide.
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let projections: Vec<String> = fields.into_iter().map(Into::into).collect();
        Self {
            fields_to_fetch: projections.clone(),
            projections,
        }
    }

    /// The single selected field, when exactly one was selected.
    #[must_use]
    pub fn single(&self) -> Option<&str> {
        match self.projections.as_slice() {
            [one] => Some(one.as_str()),
            _ => None,
        }
    }
}

/// Converts one raw query hit into the value surfaced to the caller.
///
/// Full (non-projected) entities go through the tracker; projections are
/// unwrapped or rebuilt field by field. Any parse failure here aborts
/// the whole batch in the caller; partial results are never returned.
pub fn deserialize_document(
    id: Option<&str>,
    document: &Value,
    metadata: &Value,
    fields: Option<&ProjectionSpec>,
    disable_tracking: bool,
    conventions: &Conventions,
    tracker: &dyn EntityTracker,
    target: Option<&DocumentType>,
) -> ClientResult<Value> {
    // A missing or false marker means a full entity, not a projection.
    let is_projection = metadata
        .get(PROJECTION_MARKER)
        .and_then(Value::as_bool)
        .unwrap_or(false);
    if !is_projection {
        return Ok(tracker.track_entity(
            target.map(|t| t.name.as_str()),
            id,
            document,
            metadata,
            disable_tracking,
        ));
    }

    let mut document = document.clone();

    // A single selected field with no target type unwraps directly.
    if target.is_none() {
        if let Some(spec) = fields {
            if let Some(field) = spec.single() {
                let mut substituted = None;
                match document.get(field) {
                    None | Some(Value::Null) => return Ok(Value::Null),
                    Some(inner) if Conventions::is_primitive(inner) => return Ok(inner.clone()),
                    Some(inner) => {
                        // "Return a sub-object by name": substitute the
                        // nested object for the outer document.
                        if inner.is_object()
                            && spec.fields_to_fetch.first().map(String::as_str) == Some(field)
                        {
                            substituted = Some(inner.clone());
                        }
                    }
                }
                if let Some(inner) = substituted {
                    document = inner;
                }
            }
        }
    }

    let raw: Map<String, Value> = serde_json::from_value(document.clone())?;

    let mut projected = Map::new();
    match fields {
        Some(fields) if !fields.projections.is_empty() => {
            // Copy only the selected fields; unrequested ones stay absent.
            for key in &fields.projections {
                if let Some(value) = raw.get(key) {
                    projected.insert(key.clone(), value.clone());
                }
            }
        }
        _ => {
            projected = raw;
        }
    }
    let mut result = Value::Object(projected);

    if let Some(id) = id {
        // Back-fill the identity only when the payload did not state one.
        let property = conventions.identity_property_for(target);
        let stated = document.get(property);
        if matches!(stated, None | Some(Value::Null)) {
            conventions.try_set_identity(&mut result, property, id);
        }
    }

    Ok(result)
}
