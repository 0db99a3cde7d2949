//! JSON transcoding for expectations and recorded requests.
//!
//! The wire format is camelCase JSON. Wire types live in `dto`; the pure
//! conversions to and from the domain model live in `conversion`.

mod conversion;
mod dto;

pub use dto::{
    BodyDto, ExpectationDto, HttpCallbackDto, HttpForwardDto, HttpRequestDto, HttpResponseDto,
    MultiValueCollection, OneOrManyExpectations, RecordedRequestDto, SingleValueCollection,
    TimesDto, TokenDto,
};

use crate::expectation::Expectation;
use crate::predicate::HttpRequest;

/// Error types for wire → domain conversion
#[derive(Debug, thiserror::Error)]
pub enum DtoError {
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Expectation has no action (httpResponse, httpForward or httpCallback)")]
    NoAction,
    #[error("Expectation has {0} actions, exactly one is allowed")]
    MultipleActions(usize),
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
    #[error("Invalid status code: {0}")]
    InvalidStatusCode(u16),
    #[error("Invalid JSON body pattern: {0}")]
    InvalidJsonBody(String),
    #[error("Invalid base64 body: {0}")]
    InvalidBase64(String),
}

/// Parse one expectation or an array of expectations.
pub fn parse_expectations(json: &str) -> Result<Vec<Expectation>, DtoError> {
    let dtos: OneOrManyExpectations = serde_json::from_str(json)?;
    dtos.into_vec()
        .into_iter()
        .map(Expectation::try_from)
        .collect()
}

/// Parse a request pattern, as used to filter retrieve and clear.
///
/// An empty or whitespace-only body is the empty pattern.
pub fn parse_request_pattern(json: &str) -> Result<HttpRequest, DtoError> {
    if json.trim().is_empty() {
        return Ok(HttpRequest::default());
    }
    let dto: HttpRequestDto = serde_json::from_str(json)?;
    HttpRequest::try_from(dto)
}
