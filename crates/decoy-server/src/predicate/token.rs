//! Negatable string tokens.
//!
//! A `Token` is the atomic comparison unit for methods, paths, header names and
//! values, cookies and query parameters. The expectation side treats the value
//! as a case-insensitive, whole-value regex; the request side is a literal.

use regex::{Regex, RegexBuilder};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use tracing::debug;

/// A string value that can be asserted ("matches") or negated ("does not match").
#[derive(Clone)]
pub struct Token {
    value: String,
    lower: String,
    negated: bool,
    /// Anchored, case-insensitive form of `value`. `None` when the value holds
    /// no regex syntax or does not compile; literal comparison is used then.
    pattern: Option<Arc<Regex>>,
}

impl Token {
    /// Create a token asserting the given value.
    pub fn new(value: impl Into<String>) -> Self {
        Self::negatable(value, false)
    }

    /// Create a token negating the given value.
    pub fn not(value: impl Into<String>) -> Self {
        Self::negatable(value, true)
    }

    /// Create a token with an explicit negation marker.
    pub fn negatable(value: impl Into<String>, negated: bool) -> Self {
        let value = value.into();
        let lower = value.to_lowercase();
        let pattern = compile_pattern(&value);
        Self {
            value,
            lower,
            negated,
            pattern,
        }
    }

    /// Create a token for a value received on the wire.
    ///
    /// Literals are only ever compared against patterns, so no regex is
    /// compiled for them.
    pub fn literal(value: impl Into<String>) -> Self {
        let value = value.into();
        Self {
            lower: value.to_lowercase(),
            value,
            negated: false,
            pattern: None,
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn is_negated(&self) -> bool {
        self.negated
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// Compare this (pattern-side) token against a candidate.
    ///
    /// The raw values are compared with [`Token::matches_value`]; a negation
    /// flag on either side inverts the outcome.
    pub fn matches(&self, candidate: &Token) -> bool {
        let result = self.matches_value(&candidate.value);
        if self.negated ^ candidate.negated {
            !result
        } else {
            result
        }
    }

    /// Compare the raw value of this token against a literal, ignoring negation.
    ///
    /// Case-insensitive equality always matches; otherwise the value is used as
    /// a whole-value, case-insensitive regex. An empty pattern only matches an
    /// empty candidate.
    pub fn matches_value(&self, candidate: &str) -> bool {
        if self.value.is_empty() {
            return candidate.is_empty();
        }
        if self.value == candidate || self.lower == candidate.to_lowercase() {
            return true;
        }
        match &self.pattern {
            Some(regex) => regex.is_match(candidate),
            None => false,
        }
    }

    /// Whether two tokens name the same logical key or value.
    ///
    /// Used for grouping and lookups in a [`MatchingMap`](super::MatchingMap):
    /// either side may be the pattern, negation is ignored.
    pub fn equivalent(&self, other: &Token) -> bool {
        self.matches_value(&other.value) || other.matches_value(&self.value)
    }

    /// Case-insensitive equality of the raw values, ignoring regex syntax.
    pub fn eq_ignore_case(&self, other: &Token) -> bool {
        self.lower == other.lower
    }
}

fn compile_pattern(value: &str) -> Option<Arc<Regex>> {
    // A value without regex syntax behaves exactly like case-insensitive equality.
    if value.is_empty() || regex::escape(value) == value {
        return None;
    }
    match RegexBuilder::new(&format!("^(?:{value})$"))
        .case_insensitive(true)
        .build()
    {
        Ok(regex) => Some(Arc::new(regex)),
        Err(e) => {
            debug!("Token '{}' is not a valid regex, comparing literally: {}", value, e);
            None
        }
    }
}

/// Build a list of non-negated tokens.
pub fn strings<I, S>(values: I) -> Vec<Token>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    values.into_iter().map(Token::new).collect()
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value && self.negated == other.negated
    }
}

impl Eq for Token {}

impl Hash for Token {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
        self.negated.hash(state);
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negated {
            write!(f, "!{:?}", self.value)
        } else {
            write!(f, "{:?}", self.value)
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negated {
            write!(f, "!{}", self.value)
        } else {
            f.write_str(&self.value)
        }
    }
}

impl Default for Token {
    fn default() -> Self {
        Self::new("")
    }
}

impl From<&str> for Token {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Token {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&String> for Token {
    fn from(value: &String) -> Self {
        Self::new(value.as_str())
    }
}
