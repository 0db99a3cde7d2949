//! Request body matching.
//!
//! Supports exact string, regex, JSON (lenient or strict) and form-parameter
//! bodies. A live request body is always represented as [`BodyMatcher::Exact`].

use super::multimap::MatchingMap;
use super::token::Token;
use serde_json::Value;

/// How a JSON body pattern is compared with the request body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum JsonMatchType {
    /// Every field of the pattern must be present; extra fields and array
    /// elements in the request are ignored, array order is not significant.
    #[default]
    OnlyMatchingFields,
    /// The request body must equal the pattern.
    Strict,
}

/// Body pattern of an expectation, or the literal body of a request.
#[derive(Debug, Clone, PartialEq)]
pub enum BodyMatcher {
    /// Byte-for-byte string equality
    Exact { value: String, not: bool },
    /// Whole-body, case-insensitive regex
    Regex(Token),
    /// Structural JSON comparison
    Json {
        value: Value,
        match_type: JsonMatchType,
        not: bool,
    },
    /// `application/x-www-form-urlencoded` parameters
    Parameters(MatchingMap),
}

impl BodyMatcher {
    pub fn exact(value: impl Into<String>) -> Self {
        BodyMatcher::Exact {
            value: value.into(),
            not: false,
        }
    }

    pub fn regex(pattern: impl Into<String>) -> Self {
        BodyMatcher::Regex(Token::new(pattern))
    }

    pub fn json(value: Value) -> Self {
        BodyMatcher::Json {
            value,
            match_type: JsonMatchType::OnlyMatchingFields,
            not: false,
        }
    }

    /// Raw text of a request-side body.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            BodyMatcher::Exact { value, .. } => Some(value),
            _ => None,
        }
    }

    /// Check whether the literal `body` of a request satisfies this pattern.
    ///
    /// An absent body is matched as the empty string.
    pub fn matches(&self, body: Option<&str>) -> bool {
        let body = body.unwrap_or("");
        match self {
            BodyMatcher::Exact { value, not } => (value == body) != *not,
            BodyMatcher::Regex(token) => token.matches_value(body) != token.is_negated(),
            BodyMatcher::Json {
                value,
                match_type,
                not,
            } => {
                let result = match serde_json::from_str::<Value>(body) {
                    Ok(actual) => match match_type {
                        JsonMatchType::Strict => &actual == value,
                        JsonMatchType::OnlyMatchingFields => json_contains(value, &actual),
                    },
                    Err(_) => false,
                };
                result != *not
            }
            BodyMatcher::Parameters(expected) => parse_form(body).contains_all(expected),
        }
    }
}

/// Lenient JSON comparison: `expected` must be contained in `actual`.
fn json_contains(expected: &Value, actual: &Value) -> bool {
    match (expected, actual) {
        (Value::Object(expected), Value::Object(actual)) => expected
            .iter()
            .all(|(key, value)| actual.get(key).is_some_and(|a| json_contains(value, a))),
        (Value::Array(expected), Value::Array(actual)) => expected
            .iter()
            .all(|value| actual.iter().any(|a| json_contains(value, a))),
        _ => expected == actual,
    }
}

/// Parse a query string or form body into a [`MatchingMap`], URL-decoding
/// keys and values. Repeated keys keep every value.
pub fn parse_form(input: &str) -> MatchingMap {
    let mut map = MatchingMap::new();
    for pair in input.split('&').filter(|s| !s.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        map.put_literal(&decode(key), &decode(value));
    }
    map
}

fn decode(raw: &str) -> String {
    let raw = raw.replace('+', " ");
    urlencoding::decode(&raw)
        .map(|s| s.into_owned())
        .unwrap_or(raw)
}
