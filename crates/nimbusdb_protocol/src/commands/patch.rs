//! Applies a server-side script patch to one document.

use crate::change_vector::ChangeVector;
use crate::command::{
    encode_uri_component, HttpMethod, ProtocolCommand, RequestDescription, ServerNode,
};
use crate::error::{ProtocolError, ProtocolResult};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// A patch script with its named values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PatchRequest {
    /// The script body.
    pub script: String,
    /// Values the script can reference by name.
    pub values: Map<String, Value>,
}

impl PatchRequest {
    /// Creates a patch request for the given script.
    pub fn new(script: impl Into<String>) -> Self {
        Self {
            script: script.into(),
            values: Map::new(),
        }
    }
}

/// Outcome reported by the server for a patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatchStatus {
    /// The target document does not exist and no fallback was supplied.
    DocumentDoesNotExist,
    /// The fallback created the document.
    Created,
    /// The script modified the document.
    Patched,
    /// The patch was skipped due to a change vector mismatch.
    Skipped,
    /// The script ran but changed nothing.
    NotModified,
}

/// The parsed result of a patch exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchResult {
    /// What the server did.
    pub status: PatchStatus,
    /// The document after the patch, when the server returned it.
    #[serde(default)]
    pub modified_document: Option<Value>,
}

/// Patches one document, optionally creating it when missing.
///
/// The `test`, `debug` and `skip_patch_if_change_vector_mismatch` flags
/// only change which query parameters are attached; control flow is
/// identical in all modes.
#[derive(Debug)]
pub struct PatchCommand {
    id: String,
    change_vector: Option<ChangeVector>,
    patch: PatchRequest,
    patch_if_missing: Option<PatchRequest>,
    skip_patch_if_change_vector_mismatch: bool,
    return_debug_information: bool,
    test: bool,
    result: Option<PatchResult>,
}

impl PatchCommand {
    /// Creates the command.
    ///
    /// The identifier must be non-empty and both scripts (main and the
    /// optional fallback) must be non-empty after trimming.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: impl Into<String>,
        change_vector: Option<ChangeVector>,
        patch: PatchRequest,
        patch_if_missing: Option<PatchRequest>,
        skip_patch_if_change_vector_mismatch: bool,
        return_debug_information: bool,
        test: bool,
    ) -> ProtocolResult<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(ProtocolError::invalid_argument("id", "must not be empty"));
        }
        if patch.script.trim().is_empty() {
            return Err(ProtocolError::invalid_argument(
                "patch.script",
                "must not be empty",
            ));
        }
        if let Some(fallback) = &patch_if_missing {
            if fallback.script.trim().is_empty() {
                return Err(ProtocolError::invalid_argument(
                    "patch_if_missing.script",
                    "must not be empty",
                ));
            }
        }

        Ok(Self {
            id,
            change_vector,
            patch,
            patch_if_missing,
            skip_patch_if_change_vector_mismatch,
            return_debug_information,
            test,
            result: None,
        })
    }
}

impl ProtocolCommand for PatchCommand {
    type Result = PatchResult;

    fn build_request(&self, node: &ServerNode) -> ProtocolResult<RequestDescription> {
        let mut uri = format!(
            "{}/docs?id={}",
            node.database_url(),
            encode_uri_component(&self.id)
        );
        if self.skip_patch_if_change_vector_mismatch {
            uri.push_str("&skipPatchIfChangeVectorMismatch=true");
        }
        if self.return_debug_information {
            uri.push_str("&debug=true");
        }
        if self.test {
            uri.push_str("&test=true");
        }

        let body = serde_json::to_string(&json!({
            "Patch": self.patch,
            "PatchIfMissing": self.patch_if_missing,
        }))?;

        Ok(RequestDescription::new(HttpMethod::Patch, uri)
            .with_json_body(body)
            .with_change_vector(self.change_vector.as_ref()))
    }

    fn parse_response(&mut self, body: Option<&str>, _from_cache: bool) -> ProtocolResult<()> {
        // No body means the server had nothing to report; not a failure.
        let Some(body) = body else {
            return Ok(());
        };

        let raw: Value = serde_json::from_str(body)?;
        self.result = Some(serde_json::from_value(camel_case_keys(raw))?);
        Ok(())
    }

    fn is_read_request(&self) -> bool {
        false
    }

    fn take_result(&mut self) -> Option<PatchResult> {
        self.result.take()
    }
}

/// Lowercases the first character of each top-level key.
///
/// The server reports patch results with Pascal-cased keys; the client
/// surface is camel-cased. Document bodies nested inside are left alone.
fn camel_case_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| {
                    let mut chars = key.chars();
                    let camel = match chars.next() {
                        Some(first) => first.to_ascii_lowercase().to_string() + chars.as_str(),
                        None => key,
                    };
                    (camel, value)
                })
                .collect(),
        ),
        other => other,
    }
}
