//! Route dispatch logic for the Admin API.

use crate::admin_api::handlers::{expectations, system};
use crate::admin_api::types::not_found;
use crate::expectation::ExpectationStore;
use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::{Method, Request, Response};
use std::sync::Arc;
use tracing::debug;

/// Parsed admin route
#[derive(Debug, PartialEq, Eq)]
enum AdminRoute<'a> {
    /// PUT /expectation
    Expectation,
    /// DELETE /expectation/:id
    ExpectationById(&'a str),
    /// PUT /retrieve
    Retrieve,
    /// PUT /clear
    Clear,
    /// PUT /reset
    Reset,
    /// PUT /purge
    Purge,
    /// GET /health
    Health,
    /// GET /metrics
    Metrics,
}

impl<'a> AdminRoute<'a> {
    /// Parse route from the request path
    fn parse(path: &'a str) -> Option<Self> {
        let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
        match segments.as_slice() {
            ["expectation"] => Some(AdminRoute::Expectation),
            ["expectation", id] if !id.is_empty() => Some(AdminRoute::ExpectationById(id)),
            ["retrieve"] => Some(AdminRoute::Retrieve),
            ["clear"] => Some(AdminRoute::Clear),
            ["reset"] => Some(AdminRoute::Reset),
            ["purge"] => Some(AdminRoute::Purge),
            ["health"] => Some(AdminRoute::Health),
            ["metrics"] => Some(AdminRoute::Metrics),
            _ => None,
        }
    }
}

/// Main request router
pub async fn route_request(
    req: Request<Incoming>,
    store: Arc<ExpectationStore>,
) -> Result<Response<Full<Bytes>>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let query = req.uri().query().map(|s| s.to_string());

    debug!("Admin API: {} {}", method, path);

    let Some(route) = AdminRoute::parse(&path) else {
        return Ok(not_found());
    };

    let response = match (&method, route) {
        (&Method::PUT, AdminRoute::Expectation) => expectations::handle_create(req, store).await,
        (&Method::DELETE, AdminRoute::ExpectationById(id)) => {
            expectations::handle_delete(id, store)
        }
        (&Method::PUT, AdminRoute::Retrieve) => {
            expectations::handle_retrieve(req, query.as_deref(), store).await
        }
        (&Method::PUT, AdminRoute::Clear) => {
            expectations::handle_clear(req, query.as_deref(), store).await
        }
        (&Method::PUT, AdminRoute::Reset) => expectations::handle_reset(store),
        (&Method::PUT, AdminRoute::Purge) => expectations::handle_purge(store),
        (&Method::GET, AdminRoute::Health) => system::handle_health(),
        (&Method::GET, AdminRoute::Metrics) => system::handle_metrics(store),
        _ => not_found(),
    };
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_route_parse() {
        assert_eq!(
            AdminRoute::parse("/expectation"),
            Some(AdminRoute::Expectation)
        );
        assert_eq!(
            AdminRoute::parse("/expectation/abc-123"),
            Some(AdminRoute::ExpectationById("abc-123"))
        );
        assert_eq!(AdminRoute::parse("/retrieve"), Some(AdminRoute::Retrieve));
        assert_eq!(AdminRoute::parse("/clear/"), Some(AdminRoute::Clear));
        assert_eq!(AdminRoute::parse("/reset"), Some(AdminRoute::Reset));
        assert_eq!(AdminRoute::parse("/purge"), Some(AdminRoute::Purge));
        assert_eq!(AdminRoute::parse("/health"), Some(AdminRoute::Health));
        assert_eq!(AdminRoute::parse("/metrics"), Some(AdminRoute::Metrics));

        // Invalid routes
        assert_eq!(AdminRoute::parse("/"), None);
        assert_eq!(AdminRoute::parse("/unknown"), None);
        assert_eq!(AdminRoute::parse("/expectation/a/b"), None);
    }
}
