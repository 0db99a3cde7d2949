//! Type definitions for expectations and the actions they trigger.

use super::times::Times;
use crate::predicate::{HttpRequest, RequestMatcher};
use chrono::{DateTime, Utc};
use std::fmt;
use std::time::Duration;

// ============================================================================
// Identity
// ============================================================================

/// Unique identifier of a registered expectation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExpectationId(String);

impl ExpectationId {
    /// Generate a fresh random id.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExpectationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ExpectationId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ExpectationId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

// ============================================================================
// Actions
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub name: String,
    pub values: Vec<String>,
}

impl Header {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: vec![value.into()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Response body content
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseBody {
    Text(String),
    Binary(Vec<u8>),
}

impl ResponseBody {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            ResponseBody::Text(text) => text.as_bytes(),
            ResponseBody::Binary(bytes) => bytes,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeUnit {
    #[default]
    Milliseconds,
    Seconds,
    Minutes,
}

/// Delay applied before a response is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delay {
    pub time_unit: TimeUnit,
    pub value: u64,
}

impl Delay {
    pub fn millis(value: u64) -> Self {
        Self {
            time_unit: TimeUnit::Milliseconds,
            value,
        }
    }

    pub fn duration(&self) -> Duration {
        match self.time_unit {
            TimeUnit::Milliseconds => Duration::from_millis(self.value),
            TimeUnit::Seconds => Duration::from_secs(self.value),
            TimeUnit::Minutes => Duration::from_secs(self.value.saturating_mul(60)),
        }
    }
}

/// Canned response returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status_code: u16,
    pub headers: Vec<Header>,
    pub cookies: Vec<Cookie>,
    pub body: Option<ResponseBody>,
    pub delay: Option<Delay>,
}

impl Default for HttpResponse {
    fn default() -> Self {
        Self {
            status_code: 200,
            headers: Vec::new(),
            cookies: Vec::new(),
            body: None,
            delay: None,
        }
    }
}

impl HttpResponse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status(mut self, status_code: u16) -> Self {
        self.status_code = status_code;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push(Header::new(name, value));
        self
    }

    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.push(Cookie::new(name, value));
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(ResponseBody::Text(body.into()));
        self
    }

    pub fn with_delay(mut self, delay: Delay) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scheme {
    #[default]
    Http,
    Https,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }
}

/// Forward the matched request to another host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpForward {
    pub host: String,
    pub port: u16,
    pub scheme: Scheme,
}

impl HttpForward {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            scheme: Scheme::Http,
        }
    }

    /// Target URL for the given path and optional raw query string.
    pub fn url(&self, path: &str, query: Option<&str>) -> String {
        let mut url = format!(
            "{}://{}:{}{}",
            self.scheme.as_str(),
            self.host,
            self.port,
            path
        );
        if let Some(q) = query.filter(|q| !q.is_empty()) {
            url.push('?');
            url.push_str(q);
        }
        url
    }
}

/// Delegate response generation to a named handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpCallback {
    pub callback_name: String,
}

impl HttpCallback {
    pub fn new(callback_name: impl Into<String>) -> Self {
        Self {
            callback_name: callback_name.into(),
        }
    }
}

/// What to do with a matched request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Respond(HttpResponse),
    Forward(HttpForward),
    Callback(HttpCallback),
}

impl Action {
    pub fn kind(&self) -> &'static str {
        match self {
            Action::Respond(_) => "respond",
            Action::Forward(_) => "forward",
            Action::Callback(_) => "callback",
        }
    }
}

impl From<HttpResponse> for Action {
    fn from(response: HttpResponse) -> Self {
        Action::Respond(response)
    }
}

impl From<HttpForward> for Action {
    fn from(forward: HttpForward) -> Self {
        Action::Forward(forward)
    }
}

impl From<HttpCallback> for Action {
    fn from(callback: HttpCallback) -> Self {
        Action::Callback(callback)
    }
}

// ============================================================================
// Expectation
// ============================================================================

/// A request pattern bound to an action and a usage limit.
///
/// Everything but the usage counter is fixed at construction.
#[derive(Debug, Clone)]
pub struct Expectation {
    id: ExpectationId,
    sequence: u64,
    request: HttpRequest,
    action: Action,
    times: Times,
    created_at: DateTime<Utc>,
}

impl Expectation {
    pub fn new(request: HttpRequest, action: impl Into<Action>, times: Times) -> Self {
        Self {
            id: ExpectationId::generate(),
            sequence: 0,
            request,
            action: action.into(),
            times,
            created_at: Utc::now(),
        }
    }

    /// Replace the generated id, e.g. with one supplied by a client.
    pub fn with_id(mut self, id: impl Into<ExpectationId>) -> Self {
        self.id = id.into();
        self
    }

    pub(crate) fn with_sequence(mut self, sequence: u64) -> Self {
        self.sequence = sequence;
        self
    }

    pub fn id(&self) -> &ExpectationId {
        &self.id
    }

    /// Registration order within the owning store.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn request(&self) -> &HttpRequest {
        &self.request
    }

    pub fn action(&self) -> &Action {
        &self.action
    }

    pub fn times(&self) -> &Times {
        &self.times
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_active(&self) -> bool {
        !self.times.is_expired()
    }

    /// Whether `request` satisfies this expectation's pattern, ignoring usage.
    pub fn matches(&self, request: &HttpRequest) -> bool {
        self.request.matches(request)
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Error types for expectation management
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Expectation {0} is already registered")]
    DuplicateId(ExpectationId),
}
