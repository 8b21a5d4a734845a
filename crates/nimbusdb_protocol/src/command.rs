//! The protocol command contract.

use crate::change_vector::ChangeVector;
use crate::error::ProtocolResult;
use std::fmt;

/// HTTP header carrying the conditional change vector on writes.
pub const IF_MATCH_HEADER: &str = "If-Match";

/// HTTP header naming the request content type.
pub const CONTENT_TYPE_HEADER: &str = "Content-Type";

/// A server node a command can be addressed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerNode {
    /// Base URL of the node, without a trailing slash.
    pub url: String,
    /// Name of the database on that node.
    pub database: String,
}

impl ServerNode {
    /// Creates a node description.
    pub fn new(url: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            database: database.into(),
        }
    }

    /// Returns the base URI for database-scoped resources on this node.
    #[must_use]
    pub fn database_url(&self) -> String {
        format!("{}/databases/{}", self.url, self.database)
    }
}

/// Request method for a protocol command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    /// GET request.
    Get,
    /// PUT request.
    Put,
    /// POST request.
    Post,
    /// PATCH request.
    Patch,
    /// DELETE request.
    Delete,
}

impl HttpMethod {
    /// Returns the wire form of the method.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Put => "PUT",
            HttpMethod::Post => "POST",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully composed request, ready to be handed to an executor.
///
/// Building one has no observable side effects; it is a pure function of
/// the command's fields and the target node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescription {
    /// Request method.
    pub method: HttpMethod,
    /// Full request URI.
    pub uri: String,
    /// Request headers as (name, value) pairs.
    pub headers: Vec<(String, String)>,
    /// Optional request body.
    pub body: Option<String>,
}

impl RequestDescription {
    /// Creates a bodyless request.
    pub fn new(method: HttpMethod, uri: impl Into<String>) -> Self {
        Self {
            method,
            uri: uri.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// Attaches a JSON body and the matching content type header.
    #[must_use]
    pub fn with_json_body(mut self, body: String) -> Self {
        self.headers
            .push((CONTENT_TYPE_HEADER.to_string(), "application/json".to_string()));
        self.body = Some(body);
        self
    }

    /// Attaches the change vector as a conditional header, but only when
    /// it is present. Absence means "no precondition".
    #[must_use]
    pub fn with_change_vector(mut self, change_vector: Option<&ChangeVector>) -> Self {
        if let Some(cv) = change_vector {
            self.headers
                .push((IF_MATCH_HEADER.to_string(), format!("\"{}\"", cv.as_str())));
        }
        self
    }

    /// Looks up a header by name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A raw response as delivered by the executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body, if any.
    pub body: Option<String>,
}

impl RawResponse {
    /// A 200 response with a body.
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: Some(body.into()),
        }
    }

    /// A 201 response with a body.
    pub fn created(body: impl Into<String>) -> Self {
        Self {
            status: 201,
            body: Some(body.into()),
        }
    }

    /// A 204 response without a body.
    #[must_use]
    pub fn no_content() -> Self {
        Self {
            status: 204,
            body: None,
        }
    }

    /// A 404 response.
    #[must_use]
    pub fn not_found() -> Self {
        Self {
            status: 404,
            body: None,
        }
    }

    /// A 409 response with a conflict payload.
    pub fn conflict(body: impl Into<String>) -> Self {
        Self {
            status: 409,
            body: Some(body.into()),
        }
    }

    /// Returns true for 2xx statuses.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// One logical request/response exchange against one server node.
///
/// A command validates its inputs at construction, builds exactly one
/// request in [`build_request`](ProtocolCommand::build_request) and parses
/// exactly one result in [`parse_response`](ProtocolCommand::parse_response).
/// One execution yields one outcome: a populated result, an empty result,
/// or a failure; never both a result and a failure.
pub trait ProtocolCommand {
    /// The parsed result shape.
    type Result;

    /// Composes the request for the given node.
    ///
    /// Pure: no I/O, no mutation beyond composing the description.
    /// Required fields were validated at construction, not here.
    fn build_request(&self, node: &ServerNode) -> ProtocolResult<RequestDescription>;

    /// Parses the raw response body into the command's result.
    ///
    /// For commands with no response body an absent body is a no-op; for
    /// commands that require one it is an `InvalidResponse` failure.
    fn parse_response(&mut self, body: Option<&str>, from_cache: bool) -> ProtocolResult<()>;

    /// True only for pure reads. Drives node selection and response
    /// caching in the executor.
    fn is_read_request(&self) -> bool;

    /// Takes the parsed result, leaving the command consumed.
    fn take_result(&mut self) -> Option<Self::Result>;
}

/// Percent-encodes a URI component, leaving unreserved characters as-is.
#[must_use]
pub fn encode_uri_component(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char);
            }
            _ => {
                out.push('%');
                out.push_str(&format!("{byte:02X}"));
            }
        }
    }
    out
}
