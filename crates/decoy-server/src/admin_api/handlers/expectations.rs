//! Expectation management handlers.

use crate::admin_api::types::*;
use crate::expectation::{ExpectationId, ExpectationStore};
use crate::metrics;
use crate::serialization::{
    parse_expectations, parse_request_pattern, ExpectationDto, RecordedRequestDto,
};
use crate::predicate::RequestMatcher;
use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

/// PUT /expectation - Register one expectation or an array of them
pub async fn handle_create(
    req: Request<Incoming>,
    store: Arc<ExpectationStore>,
) -> Response<Full<Bytes>> {
    let body = match collect_body(req).await {
        Ok(b) => b,
        Err(e) => return error_response(e.status(), &e.to_string()),
    };
    let text = String::from_utf8_lossy(&body);

    let expectations = match parse_expectations(&text) {
        Ok(e) => e,
        Err(e) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                &format!("Invalid expectation JSON: {e}"),
            )
        }
    };

    let ids: Vec<String> = match store.add_all(expectations) {
        Ok(ids) => ids.iter().map(ToString::to_string).collect(),
        Err(e) => {
            warn!("Registration rejected: {}", e);
            return error_response(StatusCode::CONFLICT, &e.to_string());
        }
    };

    info!("Registered {} expectation(s)", ids.len());
    metrics::record_registered(ids.len());
    metrics::set_active_expectations(store.active().len());
    json_response(StatusCode::CREATED, &CreatedResponse { ids })
}

/// PUT /retrieve - List active expectations or recorded requests
///
/// An optional request pattern in the body filters the result.
pub async fn handle_retrieve(
    req: Request<Incoming>,
    query: Option<&str>,
    store: Arc<ExpectationStore>,
) -> Response<Full<Bytes>> {
    let Some(retrieve_type) = RetrieveType::parse(query) else {
        return error_response(StatusCode::BAD_REQUEST, "Unknown retrieve type");
    };

    let body = match collect_body(req).await {
        Ok(b) => b,
        Err(e) => return error_response(e.status(), &e.to_string()),
    };
    let filter = match parse_request_pattern(&String::from_utf8_lossy(&body)) {
        Ok(pattern) => pattern,
        Err(e) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                &format!("Invalid request pattern: {e}"),
            )
        }
    };

    match retrieve_type {
        RetrieveType::ActiveExpectations => {
            let expectations: Vec<ExpectationDto> = store
                .active()
                .iter()
                .filter(|e| filter.matches(e.request()))
                .map(|e| ExpectationDto::from(e.as_ref()))
                .collect();
            json_response(StatusCode::OK, &expectations)
        }
        RetrieveType::Requests => {
            let requests: Vec<RecordedRequestDto> = store
                .recorded(Some(&filter))
                .iter()
                .map(RecordedRequestDto::from)
                .collect();
            json_response(StatusCode::OK, &requests)
        }
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ClearById {
    id: String,
}

/// PUT /clear - Remove expectations by pattern or id, and/or clear the request log
pub async fn handle_clear(
    req: Request<Incoming>,
    query: Option<&str>,
    store: Arc<ExpectationStore>,
) -> Response<Full<Bytes>> {
    let Some(clear_type) = ClearType::parse(query) else {
        return error_response(StatusCode::BAD_REQUEST, "Unknown clear type");
    };

    let body = match collect_body(req).await {
        Ok(b) => b,
        Err(e) => return error_response(e.status(), &e.to_string()),
    };

    if matches!(clear_type, ClearType::Log | ClearType::All) {
        store.clear_log();
    }
    if clear_type == ClearType::Log {
        return json_response(StatusCode::OK, &RemovedResponse { removed: 0 });
    }

    let removed = if let Ok(by_id) = serde_json::from_slice::<ClearById>(&body) {
        usize::from(store.remove(&ExpectationId::from(by_id.id)))
    } else {
        match parse_request_pattern(&String::from_utf8_lossy(&body)) {
            Ok(pattern) => store.clear_matching(&pattern),
            Err(e) => {
                return error_response(
                    StatusCode::BAD_REQUEST,
                    &format!("Invalid request pattern: {e}"),
                )
            }
        }
    };

    info!("Cleared {} expectation(s)", removed);
    metrics::set_active_expectations(store.active().len());
    json_response(StatusCode::OK, &RemovedResponse { removed })
}

/// PUT /reset - Remove every expectation and recorded request
pub fn handle_reset(store: Arc<ExpectationStore>) -> Response<Full<Bytes>> {
    store.reset();
    metrics::set_active_expectations(0);
    build_response(StatusCode::OK, "")
}

/// PUT /purge - Remove exhausted expectations
pub fn handle_purge(store: Arc<ExpectationStore>) -> Response<Full<Bytes>> {
    let removed = store.purge_expired();
    metrics::set_active_expectations(store.active().len());
    json_response(StatusCode::OK, &RemovedResponse { removed })
}

/// DELETE /expectation/:id - Remove one expectation
pub fn handle_delete(id: &str, store: Arc<ExpectationStore>) -> Response<Full<Bytes>> {
    let id = ExpectationId::from(id);
    if store.remove(&id) {
        metrics::set_active_expectations(store.active().len());
        build_response(StatusCode::NO_CONTENT, "")
    } else {
        error_response(
            StatusCode::NOT_FOUND,
            &format!("Expectation {id} does not exist"),
        )
    }
}
