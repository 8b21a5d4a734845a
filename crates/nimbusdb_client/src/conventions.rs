//! Conventions: how documents map to entities on this client.

use serde_json::Value;

/// An optional target-type descriptor for query results.
///
/// The client never reflects over Rust types; a descriptor names the
/// type for tracking purposes and may override the identity property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentType {
    /// Type name, used as the tracking key space.
    pub name: String,
    /// Identity property override; falls back to the conventions.
    pub identity_property: Option<String>,
}

impl DocumentType {
    /// Creates a descriptor with the conventions' identity property.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            identity_property: None,
        }
    }

    /// Overrides the identity property for this type.
    #[must_use]
    pub fn with_identity_property(mut self, property: impl Into<String>) -> Self {
        self.identity_property = Some(property.into());
        self
    }
}

/// Client-wide conventions shared by all sessions.
#[derive(Debug, Clone)]
pub struct Conventions {
    /// Property that holds a document's identifier on its entity.
    pub identity_property: String,
    /// Whether queries without an explicit page size fail fast.
    pub throw_if_query_page_size_is_not_set: bool,
}

impl Conventions {
    /// Returns the identity property for the given target type, falling
    /// back to the conventions' default.
    #[must_use]
    pub fn identity_property_for<'a>(&'a self, target: Option<&'a DocumentType>) -> &'a str {
        target
            .and_then(|t| t.identity_property.as_deref())
            .unwrap_or(&self.identity_property)
    }

    /// True for values that are not JSON objects or arrays.
    #[must_use]
    pub fn is_primitive(value: &Value) -> bool {
        !value.is_object() && !value.is_array()
    }

    /// Back-fills the identity property on an entity.
    ///
    /// Sets the identifier only when the property is absent or JSON
    /// null. A value that is explicitly present, even a falsy one like
    /// `0`, `""` or `false`, is never overwritten. Returns whether the
    /// identity was written.
    pub fn try_set_identity(&self, entity: &mut Value, property: &str, id: &str) -> bool {
        let Some(map) = entity.as_object_mut() else {
            return false;
        };
        match map.get(property) {
            None | Some(Value::Null) => {
                map.insert(property.to_string(), Value::String(id.to_string()));
                true
            }
            Some(_) => false,
        }
    }
}

impl Default for Conventions {
    fn default() -> Self {
        Self {
            identity_property: "id".to_string(),
            throw_if_query_page_size_is_not_set: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn primitive_classification() {
        assert!(Conventions::is_primitive(&json!("text")));
        assert!(Conventions::is_primitive(&json!(0)));
        assert!(Conventions::is_primitive(&json!(null)));
        assert!(!Conventions::is_primitive(&json!({})));
        assert!(!Conventions::is_primitive(&json!([1, 2])));
    }

    #[test]
    fn identity_set_when_absent_or_null() {
        let conventions = Conventions::default();

        let mut entity = json!({ "name": "Arek" });
        assert!(conventions.try_set_identity(&mut entity, "id", "docs/1"));
        assert_eq!(entity["id"], "docs/1");

        let mut entity = json!({ "id": null, "name": "Arek" });
        assert!(conventions.try_set_identity(&mut entity, "id", "docs/1"));
        assert_eq!(entity["id"], "docs/1");
    }

    #[test]
    fn identity_never_overwrites_present_values() {
        let conventions = Conventions::default();

        // Falsy-but-meaningful values stay untouched.
        for present in [json!(0), json!(""), json!(false), json!("docs/keep")] {
            let mut entity = json!({ "id": present.clone() });
            assert!(!conventions.try_set_identity(&mut entity, "id", "docs/1"));
            assert_eq!(entity["id"], present);
        }
    }

    #[test]
    fn target_type_overrides_identity_property() {
        let conventions = Conventions::default();
        let target = DocumentType::new("User").with_identity_property("userId");

        assert_eq!(conventions.identity_property_for(None), "id");
        assert_eq!(conventions.identity_property_for(Some(&target)), "userId");
    }
}
