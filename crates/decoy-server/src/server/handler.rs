//! Request handling for the mock listener.

use super::actions::ActionExecutor;
use super::convert::decompose;
use crate::admin_api::types::{build_response, read_limited, MAX_BODY_BYTES};
use crate::expectation::ExpectationStore;
use crate::metrics;
use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Shared state of the mock listener.
pub struct MockState {
    pub store: Arc<ExpectationStore>,
    pub executor: ActionExecutor,
}

/// Match an incoming request against the store and execute the selected action.
pub async fn handle_mock_request(
    req: Request<Incoming>,
    state: Arc<MockState>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let (parts, body) = req.into_parts();
    let body = match read_limited(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("{} {}: {}", parts.method, parts.uri, e);
            metrics::record_request(parts.method.as_str(), "rejected");
            return Ok(build_response(e.status(), ""));
        }
    };

    let request = decompose(&parts, &body);
    state.store.record(&request);

    let start = Instant::now();
    let matched = state.store.find_match(&request);
    metrics::observe_match_duration(start.elapsed().as_secs_f64() * 1000.0);

    let Some(expectation) = matched else {
        debug!("No expectation matched {} {}", parts.method, parts.uri);
        metrics::record_request(parts.method.as_str(), "unmatched");
        return Ok(build_response(StatusCode::NOT_FOUND, ""));
    };

    debug!(
        "{} {} matched expectation {} ({})",
        parts.method,
        parts.uri,
        expectation.id(),
        expectation.action().kind()
    );
    metrics::record_request(parts.method.as_str(), expectation.action().kind());

    let response = state
        .executor
        .execute(expectation.action(), &parts, body, &request)
        .await;
    Ok(response)
}
