//! Decomposition of live hyper requests into [`HttpRequest`].

use crate::predicate::{parse_form, BodyMatcher, HttpRequest, MatchingMap, Token};
use hyper::header::COOKIE;
use hyper::http::request::Parts;

/// Build the matcher representation of an incoming request.
///
/// Header names keep hyper's (lowercase) spelling; matching is case-insensitive.
/// Non-UTF-8 header values and bodies are converted lossily.
pub fn decompose(parts: &Parts, body: &[u8]) -> HttpRequest {
    let mut headers = MatchingMap::new();
    let mut cookies = MatchingMap::new();
    for (name, value) in &parts.headers {
        let value = String::from_utf8_lossy(value.as_bytes());
        if *name == COOKIE {
            parse_cookie_header(&value, &mut cookies);
        }
        headers.put_literal(name.as_str(), &value);
    }

    HttpRequest {
        method: Token::literal(parts.method.as_str()),
        path: Token::literal(parts.uri.path()),
        query: parts.uri.query().map(parse_form).unwrap_or_default(),
        headers,
        cookies,
        body: (!body.is_empty())
            .then(|| BodyMatcher::exact(String::from_utf8_lossy(body).into_owned())),
    }
}

/// Split a `Cookie` header (`a=1; b=2`) into name/value pairs.
fn parse_cookie_header(header: &str, cookies: &mut MatchingMap) {
    for pair in header.split(';') {
        let pair = pair.trim();
        if pair.is_empty() {
            continue;
        }
        let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
        cookies.put_literal(name.trim(), value.trim().trim_matches('"'));
    }
}
