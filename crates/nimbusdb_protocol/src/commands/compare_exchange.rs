//! Cluster-wide compare-and-swap values.

use crate::command::{
    encode_uri_component, HttpMethod, ProtocolCommand, RequestDescription, ServerNode,
};
use crate::error::{ProtocolError, ProtocolResult};
use serde_json::{json, Value};

/// A compare-exchange payload, classified once at construction.
///
/// Scalar and structured values are framed differently in the response
/// envelope, so the branch is a closed two-variant union rather than
/// open-ended runtime inspection.
#[derive(Debug, Clone, PartialEq)]
pub enum CompareExchangeValue {
    /// A primitive scalar (string, number, boolean or null).
    Scalar(Value),
    /// A structured entity (a JSON object).
    Entity(Value),
}

impl CompareExchangeValue {
    /// Classifies a raw JSON value. Objects and arrays are structured;
    /// everything else takes the scalar path.
    #[must_use]
    pub fn of(value: Value) -> Self {
        if value.is_object() || value.is_array() {
            CompareExchangeValue::Entity(value)
        } else {
            CompareExchangeValue::Scalar(value)
        }
    }

    /// The raw value, whichever the variant.
    #[must_use]
    pub fn raw(&self) -> &Value {
        match self {
            CompareExchangeValue::Scalar(v) | CompareExchangeValue::Entity(v) => v,
        }
    }
}

/// The outcome of a compare-exchange put.
#[derive(Debug, Clone, PartialEq)]
pub struct CompareExchangeResult {
    /// The value now held under the key.
    pub value: Option<Value>,
    /// The raft index of the value after the exchange.
    pub index: u64,
    /// Whether the exchange was applied.
    pub successful: bool,
}

/// Stores a compare-exchange value guarded by its expected index.
#[derive(Debug)]
pub struct PutCompareExchangeValueCommand {
    key: String,
    value: CompareExchangeValue,
    index: u64,
    result: Option<CompareExchangeResult>,
}

impl PutCompareExchangeValueCommand {
    /// Creates the command.
    ///
    /// The key must be non-empty and the index non-negative; both are
    /// checked here, before any request is built.
    pub fn new(
        key: impl Into<String>,
        value: CompareExchangeValue,
        index: i64,
    ) -> ProtocolResult<Self> {
        let key = key.into();
        if key.is_empty() {
            return Err(ProtocolError::invalid_argument("key", "must not be empty"));
        }
        if index < 0 {
            return Err(ProtocolError::invalid_argument(
                "index",
                format!("must be non-negative, got {index}"),
            ));
        }

        Ok(Self {
            key,
            value,
            index: index as u64,
            result: None,
        })
    }
}

impl ProtocolCommand for PutCompareExchangeValueCommand {
    type Result = CompareExchangeResult;

    fn build_request(&self, node: &ServerNode) -> ProtocolResult<RequestDescription> {
        let uri = format!(
            "{}/cmpxchg?key={}&index={}",
            node.database_url(),
            encode_uri_component(&self.key),
            self.index
        );

        let body = serde_json::to_string(&json!({ "Object": self.value.raw() }))?;

        Ok(RequestDescription::new(HttpMethod::Put, uri).with_json_body(body))
    }

    fn parse_response(&mut self, body: Option<&str>, _from_cache: bool) -> ProtocolResult<()> {
        let body = body.ok_or_else(|| {
            ProtocolError::InvalidResponse("compare-exchange response is missing a body".to_string())
        })?;

        let raw: Value = serde_json::from_str(body)?;
        let index = raw
            .get("Index")
            .and_then(Value::as_u64)
            .ok_or_else(|| ProtocolError::InvalidResponse("response has no Index".to_string()))?;
        let successful = raw
            .get("Successful")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let inner = raw
            .pointer("/Value/Object")
            .cloned()
            .unwrap_or(Value::Null);

        // Scalar and structured payloads are framed differently; enforce
        // the frame that matches the value stored at construction time.
        let value = match (&self.value, inner) {
            (_, Value::Null) => None,
            (CompareExchangeValue::Scalar(_), v) if v.is_object() || v.is_array() => {
                return Err(ProtocolError::InvalidResponse(
                    "scalar compare-exchange value came back structured".to_string(),
                ));
            }
            (CompareExchangeValue::Entity(_), v) if !v.is_object() && !v.is_array() => {
                return Err(ProtocolError::InvalidResponse(
                    "structured compare-exchange value came back as a scalar".to_string(),
                ));
            }
            (_, v) => Some(v),
        };

        self.result = Some(CompareExchangeResult {
            value,
            index,
            successful,
        });
        Ok(())
    }

    fn is_read_request(&self) -> bool {
        false
    }

    fn take_result(&mut self) -> Option<CompareExchangeResult> {
        self.result.take()
    }
}
