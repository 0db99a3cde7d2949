//! Tests for the expectation store.
//!
//! Covers registration order, usage limits, removal and the request log.

use super::*;
use crate::predicate::{BodyMatcher, HttpRequest, Token};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn get(path: &str) -> HttpRequest {
    HttpRequest::new().with_method("GET").with_path(path)
}

fn ok(body: &str) -> HttpResponse {
    HttpResponse::new().with_body(body)
}

fn body_of(expectation: &Expectation) -> Option<&ResponseBody> {
    match expectation.action() {
        Action::Respond(response) => response.body.as_ref(),
        _ => None,
    }
}

#[test]
fn test_limit_of_two_then_no_match() {
    let store = ExpectationStore::new();
    store.add(get("/users"), ok("users"), Times::exactly(2));

    let request = get("/users");
    assert!(store.find_match(&request).is_some());
    assert!(store.find_match(&request).is_some());
    assert!(store.find_match(&request).is_none());

    // Pattern still matches, the record is retained but inert
    assert_eq!(store.len(), 1);
    assert!(store.active().is_empty());
    assert!(store.all()[0].matches(&request));
}

#[test]
fn test_first_registered_wins() {
    let store = ExpectationStore::new();
    store.add(get("/a.*"), ok("first"), Times::unlimited());
    store.add(get("/abc"), ok("second"), Times::unlimited());

    let matched = store.find_match(&get("/abc")).unwrap();
    assert_eq!(
        body_of(&matched),
        Some(&ResponseBody::Text("first".to_string()))
    );
    assert_eq!(matched.sequence(), 0);
}

#[test]
fn test_exhausted_expectation_falls_through() {
    let store = ExpectationStore::new();
    store.add(get("/x"), ok("once"), Times::once());
    store.add(get("/x"), ok("fallback"), Times::unlimited());

    let first = store.find_match(&get("/x")).unwrap();
    assert_eq!(body_of(&first), Some(&ResponseBody::Text("once".into())));
    let second = store.find_match(&get("/x")).unwrap();
    assert_eq!(
        body_of(&second),
        Some(&ResponseBody::Text("fallback".into()))
    );
}

#[test]
fn test_no_match() {
    let store = ExpectationStore::new();
    assert!(store.find_match(&get("/")).is_none());

    store.add(get("/a"), ok(""), Times::unlimited());
    assert!(store.find_match(&get("/b")).is_none());
    assert!(store
        .find_match(&HttpRequest::new().with_method("POST").with_path("/a"))
        .is_none());
}

#[test]
fn test_preview_does_not_consume() {
    let store = ExpectationStore::new();
    store.add(get("/p"), ok(""), Times::once());

    for _ in 0..3 {
        assert!(store.preview_match(&get("/p")).is_some());
    }
    assert!(store.find_match(&get("/p")).is_some());
    assert!(store.preview_match(&get("/p")).is_none());
}

#[test]
fn test_match_on_headers_and_body() {
    let store = ExpectationStore::new();
    let pattern = HttpRequest::new()
        .with_method("POST")
        .with_path("/login")
        .with_header("content-type", "application/json")
        .with_body(BodyMatcher::json(serde_json::json!({"user": "alice"})));
    store.add(pattern, ok("welcome"), Times::unlimited());

    let request = HttpRequest::new()
        .with_method("POST")
        .with_path("/login")
        .with_header("Content-Type", "application/json")
        .with_body(BodyMatcher::exact(r#"{"user": "alice", "password": "x"}"#));
    assert!(store.find_match(&request).is_some());

    let wrong_user = HttpRequest::new()
        .with_method("POST")
        .with_path("/login")
        .with_header("Content-Type", "application/json")
        .with_body(BodyMatcher::exact(r#"{"user": "bob"}"#));
    assert!(store.find_match(&wrong_user).is_none());
}

#[test]
fn test_remove_by_id() {
    let store = ExpectationStore::new();
    let id = store.add(get("/a"), ok(""), Times::unlimited());
    store.add(get("/b"), ok(""), Times::unlimited());

    assert!(store.get(&id).is_some());
    assert!(store.remove(&id));
    assert!(!store.remove(&id));
    assert!(store.get(&id).is_none());
    assert_eq!(store.len(), 1);
    assert!(store.find_match(&get("/a")).is_none());
}

#[test]
fn test_add_expectation_rejects_duplicate_id() {
    let store = ExpectationStore::new();
    let expectation = Expectation::new(get("/a"), ok(""), Times::once()).with_id("fixed");
    let id = store.add_expectation(expectation.clone()).unwrap();
    assert_eq!(id.as_str(), "fixed");

    let err = store.add_expectation(expectation).unwrap_err();
    assert!(matches!(err, StoreError::DuplicateId(ref dup) if dup.as_str() == "fixed"));
    assert_eq!(store.len(), 1);
}

#[test]
fn test_add_all_registers_in_order() {
    let store = ExpectationStore::new();
    let ids = store
        .add_all(vec![
            Expectation::new(get("/a"), ok("a"), Times::once()).with_id("a"),
            Expectation::new(get("/b"), ok("b"), Times::once()),
        ])
        .unwrap();

    assert_eq!(ids.len(), 2);
    assert_eq!(ids[0].as_str(), "a");
    let registered: Vec<ExpectationId> = store.all().iter().map(|e| e.id().clone()).collect();
    assert_eq!(registered, ids);
}

#[test]
fn test_add_all_rejects_duplicate_within_batch() {
    let store = ExpectationStore::new();
    let err = store
        .add_all(vec![
            Expectation::new(get("/first"), ok("first"), Times::unlimited()).with_id("dup"),
            Expectation::new(get("/second"), ok("second"), Times::unlimited()).with_id("dup"),
        ])
        .unwrap_err();

    assert!(matches!(err, StoreError::DuplicateId(ref dup) if dup.as_str() == "dup"));
    assert!(store.is_empty());
    assert!(store.find_match(&get("/first")).is_none());
}

#[test]
fn test_add_all_rejects_batch_clashing_with_store() {
    let store = ExpectationStore::new();
    store
        .add_expectation(Expectation::new(get("/x"), ok(""), Times::unlimited()).with_id("taken"))
        .unwrap();

    let result = store.add_all(vec![
        Expectation::new(get("/fresh"), ok(""), Times::unlimited()).with_id("fresh"),
        Expectation::new(get("/y"), ok(""), Times::unlimited()).with_id("taken"),
    ]);

    assert!(result.is_err());
    assert_eq!(store.len(), 1);
    assert!(store.get(&ExpectationId::from("fresh")).is_none());
}

#[test]
fn test_match_on_query_and_header_names_with_regex_syntax() {
    let store = ExpectationStore::new();
    store.add(
        HttpRequest::new().with_query("abc", "2"),
        ok("query"),
        Times::unlimited(),
    );
    store.add(
        HttpRequest::new().with_header("x-a_b", "two"),
        ok("header"),
        Times::unlimited(),
    );

    let mut request = HttpRequest::new().with_path("/p");
    request.query.put_literal("a.c", "1");
    request.query.put_literal("abc", "2");
    let matched = store.find_match(&request).unwrap();
    assert_eq!(body_of(&matched), Some(&ResponseBody::Text("query".to_string())));

    let mut request = HttpRequest::new().with_path("/p");
    request.headers.put_literal("x-a.b", "one");
    request.headers.put_literal("x-a_b", "two");
    let matched = store.find_match(&request).unwrap();
    assert_eq!(body_of(&matched), Some(&ResponseBody::Text("header".to_string())));
}

#[test]
fn test_sequences_increase() {
    let store = ExpectationStore::new();
    store.add(get("/a"), ok(""), Times::unlimited());
    store.add(get("/b"), ok(""), Times::unlimited());
    store.add(get("/c"), ok(""), Times::unlimited());

    let sequences: Vec<u64> = store.all().iter().map(|e| e.sequence()).collect();
    assert_eq!(sequences, vec![0, 1, 2]);
}

#[test]
fn test_clear_matching() {
    let store = ExpectationStore::new();
    store.add(get("/users"), ok(""), Times::unlimited());
    store.add(
        HttpRequest::new().with_method("POST").with_path("/users"),
        ok(""),
        Times::unlimited(),
    );
    store.add(get("/orders"), ok(""), Times::unlimited());

    let removed = store.clear_matching(&HttpRequest::new().with_path("/users"));
    assert_eq!(removed, 2);
    assert_eq!(store.len(), 1);

    let removed = store.clear_matching(&HttpRequest::new().with_path(Token::not("/orders")));
    assert_eq!(removed, 0);
}

#[test]
fn test_purge_expired() {
    let store = ExpectationStore::new();
    store.add(get("/a"), ok(""), Times::once());
    store.add(get("/b"), ok(""), Times::unlimited());
    store.find_match(&get("/a"));

    assert_eq!(store.len(), 2);
    assert_eq!(store.purge_expired(), 1);
    assert_eq!(store.len(), 1);
    assert_eq!(store.purge_expired(), 0);
}

#[test]
fn test_reset() {
    let store = ExpectationStore::new();
    store.add(get("/a"), ok(""), Times::unlimited());
    store.record(&get("/a"));
    store.reset();
    assert!(store.is_empty());
    assert!(store.recorded(None).is_empty());
}

#[test]
fn test_request_log_is_bounded() {
    let store = ExpectationStore::with_log_capacity(2);
    store.record(&get("/1"));
    store.record(&get("/2"));
    store.record(&get("/3"));

    let paths: Vec<String> = store
        .recorded(None)
        .iter()
        .map(|r| r.request.path.value().to_string())
        .collect();
    assert_eq!(paths, vec!["/2", "/3"]);

    let filtered = store.recorded(Some(&HttpRequest::new().with_path("/3")));
    assert_eq!(filtered.len(), 1);

    store.clear_log();
    assert!(store.recorded(None).is_empty());
}

#[test]
fn test_request_log_disabled() {
    let store = ExpectationStore::with_log_capacity(0);
    store.record(&get("/1"));
    assert!(store.recorded(None).is_empty());
}

#[test]
fn test_concurrent_once_has_single_winner() {
    let store = Arc::new(ExpectationStore::new());
    store.add(get("/race"), ok(""), Times::once());
    let hits = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let store = Arc::clone(&store);
            let hits = Arc::clone(&hits);
            std::thread::spawn(move || {
                if store.find_match(&get("/race")).is_some() {
                    hits.fetch_add(1, Ordering::SeqCst);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[test]
fn test_concurrent_registration_and_matching() {
    let store = Arc::new(ExpectationStore::new());
    let writers: Vec<_> = (0..4)
        .map(|i| {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                for j in 0..25 {
                    store.add(get(&format!("/w{i}/{j}")), ok(""), Times::once());
                }
            })
        })
        .collect();
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                for _ in 0..50 {
                    let _ = store.find_match(&get("/none"));
                }
            })
        })
        .collect();
    for handle in writers.into_iter().chain(readers) {
        handle.join().unwrap();
    }

    assert_eq!(store.len(), 100);
    let mut sequences: Vec<u64> = store.all().iter().map(|e| e.sequence()).collect();
    sequences.dedup();
    assert_eq!(sequences.len(), 100);
}
