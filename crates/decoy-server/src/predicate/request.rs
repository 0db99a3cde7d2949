//! HTTP request representation shared by expectation patterns and live requests.

use super::body::BodyMatcher;
use super::multimap::MatchingMap;
use super::token::Token;
use tracing::trace;

/// An HTTP request decomposed into tokens and matching maps.
///
/// The same type describes both sides of a match: as an expectation pattern
/// every field is optional (empty means "don't care"); as a live request the
/// fields hold literal values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HttpRequest {
    pub method: Token,
    pub path: Token,
    pub query: MatchingMap,
    pub headers: MatchingMap,
    pub cookies: MatchingMap,
    pub body: Option<BodyMatcher>,
}

impl HttpRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_method(mut self, method: impl Into<Token>) -> Self {
        self.method = method.into();
        self
    }

    pub fn with_path(mut self, path: impl Into<Token>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_query(mut self, name: impl Into<Token>, value: impl Into<Token>) -> Self {
        self.query.put(name, value);
        self
    }

    pub fn with_header(mut self, name: impl Into<Token>, value: impl Into<Token>) -> Self {
        self.headers.put(name, value);
        self
    }

    pub fn with_cookie(mut self, name: impl Into<Token>, value: impl Into<Token>) -> Self {
        self.cookies.put(name, value);
        self
    }

    pub fn with_body(mut self, body: BodyMatcher) -> Self {
        self.body = Some(body);
        self
    }

    /// Literal body text of a live request.
    pub fn body_text(&self) -> Option<&str> {
        self.body.as_ref().and_then(BodyMatcher::as_text)
    }
}

/// Evaluates an expectation pattern against incoming requests.
pub trait RequestMatcher {
    /// Whether `request` satisfies every field of this pattern.
    fn matches(&self, request: &HttpRequest) -> bool;
}

impl RequestMatcher for HttpRequest {
    fn matches(&self, request: &HttpRequest) -> bool {
        let matched = token_matches(&self.method, &request.method)
            && token_matches(&self.path, &request.path)
            && request.headers.contains_all(&self.headers)
            && request.cookies.contains_all(&self.cookies)
            && request.query.contains_all(&self.query)
            && self.body_matches(request);
        trace!(
            "Pattern {} {} vs request {} {}: {}",
            self.method,
            self.path,
            request.method,
            request.path,
            matched
        );
        matched
    }
}

impl HttpRequest {
    fn body_matches(&self, request: &HttpRequest) -> bool {
        let Some(pattern) = &self.body else {
            return true;
        };
        match &request.body {
            None => pattern.matches(None),
            Some(BodyMatcher::Exact { value, .. }) => pattern.matches(Some(value)),
            // Pattern against pattern, used when clearing by request pattern
            Some(other) => pattern == other,
        }
    }
}

fn token_matches(pattern: &Token, candidate: &Token) -> bool {
    (pattern.is_empty() && !pattern.is_negated()) || pattern.matches(candidate)
}
