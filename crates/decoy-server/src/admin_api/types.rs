//! Request/response types and helpers for the Admin API.

use crate::predicate::parse_form;
use bytes::Bytes;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Body, Incoming};
use hyper::{Request, Response, StatusCode};
use serde::Serialize;

/// Error response structure
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub errors: Vec<ErrorDetail>,
}

/// Individual error detail
#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

/// Response to a successful registration
#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub ids: Vec<String>,
}

/// Response to clear and purge operations
#[derive(Debug, Serialize)]
pub struct RemovedResponse {
    pub removed: usize,
}

/// What `PUT /retrieve` returns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetrieveType {
    #[default]
    ActiveExpectations,
    Requests,
}

/// What `PUT /clear` removes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClearType {
    #[default]
    Expectations,
    Log,
    All,
}

impl RetrieveType {
    /// Parse from the `type` query parameter; `None` when the value is unknown.
    pub fn parse(query: Option<&str>) -> Option<Self> {
        match query_param(query, "type").as_deref() {
            None | Some("active_expectations") => Some(RetrieveType::ActiveExpectations),
            Some("requests") => Some(RetrieveType::Requests),
            Some(_) => None,
        }
    }
}

impl ClearType {
    /// Parse from the `type` query parameter; `None` when the value is unknown.
    pub fn parse(query: Option<&str>) -> Option<Self> {
        match query_param(query, "type").as_deref() {
            None | Some("expectations") => Some(ClearType::Expectations),
            Some("log") => Some(ClearType::Log),
            Some("all") => Some(ClearType::All),
            Some(_) => None,
        }
    }
}

/// First value of a query parameter, lowercased.
fn query_param(query: Option<&str>, name: &str) -> Option<String> {
    let params = parse_form(query?);
    params.get(name).map(|v| v.value().to_lowercase())
}

// =============================================================================
// Response helper functions
// =============================================================================

/// Create a JSON response
pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    let json = serde_json::to_string_pretty(body).unwrap_or_else(|_| "{}".to_string());
    build_response_with_headers(status, [("Content-Type", "application/json")], json)
}

/// Build an HTTP response with the given status and body.
///
/// Falls back to a bare response if the builder rejects its input.
pub fn build_response(status: StatusCode, body: impl Into<Bytes>) -> Response<Full<Bytes>> {
    let body = body.into();
    Response::builder()
        .status(status)
        .body(Full::new(body.clone()))
        .unwrap_or_else(|_| Response::new(Full::new(body)))
}

/// Build an HTTP response with headers.
///
/// Invalid header names or values produce a 500 response.
pub fn build_response_with_headers(
    status: StatusCode,
    headers: impl IntoIterator<Item = (impl AsRef<str>, impl AsRef<str>)>,
    body: impl Into<Bytes>,
) -> Response<Full<Bytes>> {
    let mut builder = Response::builder().status(status);
    for (key, value) in headers {
        builder = builder.header(key.as_ref(), value.as_ref());
    }
    builder.body(Full::new(body.into())).unwrap_or_else(|_| {
        let mut response = Response::new(Full::new(Bytes::from("Internal Server Error")));
        *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
        response
    })
}

/// Create an error response
pub fn error_response(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    let error = ErrorResponse {
        errors: vec![ErrorDetail {
            code: status.as_str().to_string(),
            message: message.to_string(),
        }],
    };
    json_response(status, &error)
}

/// Create a not found response
pub fn not_found() -> Response<Full<Bytes>> {
    error_response(StatusCode::NOT_FOUND, "Not Found")
}

/// Largest request body accepted by either listener.
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Failure to read a request body
#[derive(Debug, thiserror::Error)]
pub enum BodyError {
    #[error("Request body exceeds {0} bytes")]
    TooLarge(usize),
    #[error("Failed to read request body: {0}")]
    Read(String),
}

impl BodyError {
    pub fn status(&self) -> StatusCode {
        match self {
            BodyError::TooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            BodyError::Read(_) => StatusCode::BAD_REQUEST,
        }
    }
}

/// Collect a body into bytes, failing once it grows past `limit`.
pub async fn read_limited<B>(body: B, limit: usize) -> Result<Bytes, BodyError>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.is::<LengthLimitError>() => Err(BodyError::TooLarge(limit)),
        Err(e) => Err(BodyError::Read(e.to_string())),
    }
}

/// Collect request body into bytes
pub async fn collect_body(req: Request<Incoming>) -> Result<Bytes, BodyError> {
    read_limited(req.into_body(), MAX_BODY_BYTES).await
}
