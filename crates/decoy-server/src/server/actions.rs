//! Execution of expectation actions: respond, forward and callback.

use crate::admin_api::types::{build_response, build_response_with_headers};
use crate::expectation::{Action, HttpCallback, HttpForward, HttpResponse};
use crate::predicate::HttpRequest;
use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{HeaderName, HeaderValue, SET_COOKIE};
use hyper::http::request::Parts;
use hyper::{Response, StatusCode};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Headers that describe a single connection and are never forwarded.
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
    "host",
    "content-length",
];

fn is_hop_by_hop(name: &str) -> bool {
    HOP_BY_HOP.iter().any(|h| name.eq_ignore_ascii_case(h))
}

/// Produces a response for requests matched by a callback expectation.
#[async_trait]
pub trait CallbackHandler: Send + Sync {
    async fn handle(&self, request: &HttpRequest) -> HttpResponse;
}

/// Named callback handlers available to expectations.
#[derive(Default)]
pub struct CallbackRegistry {
    handlers: RwLock<HashMap<String, Arc<dyn CallbackHandler>>>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler, replacing any previous one with the same name.
    pub fn register(&self, name: impl Into<String>, handler: Arc<dyn CallbackHandler>) {
        self.handlers.write().insert(name.into(), handler);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn CallbackHandler>> {
        self.handlers.read().get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.read().keys().cloned().collect();
        names.sort();
        names
    }
}

/// Echoes the request body back with status 200.
pub struct EchoCallback;

#[async_trait]
impl CallbackHandler for EchoCallback {
    async fn handle(&self, request: &HttpRequest) -> HttpResponse {
        let mut response = HttpResponse::new();
        if let Some(body) = request.body_text() {
            response = response.with_body(body);
        }
        response
    }
}

/// Error types for the mock listener and action execution
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Failed to bind {0}: {1}")]
    Bind(std::net::SocketAddr, std::io::Error),
    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Runs the action of a matched expectation.
pub struct ActionExecutor {
    client: reqwest::Client,
    callbacks: Arc<CallbackRegistry>,
}

impl ActionExecutor {
    pub fn new(callbacks: Arc<CallbackRegistry>) -> Result<Self, ServerError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self { client, callbacks })
    }

    pub fn callbacks(&self) -> &Arc<CallbackRegistry> {
        &self.callbacks
    }

    /// Execute `action` for the request described by `parts`, `body` and `request`.
    pub async fn execute(
        &self,
        action: &Action,
        parts: &Parts,
        body: Bytes,
        request: &HttpRequest,
    ) -> Response<Full<Bytes>> {
        match action {
            Action::Respond(response) => respond(response).await,
            Action::Forward(forward) => self.forward(forward, parts, body).await,
            Action::Callback(callback) => self.callback(callback, request).await,
        }
    }

    async fn forward(
        &self,
        forward: &HttpForward,
        parts: &Parts,
        body: Bytes,
    ) -> Response<Full<Bytes>> {
        let url = forward.url(parts.uri.path(), parts.uri.query());
        debug!("Forwarding {} {} to {}", parts.method, parts.uri, url);

        let method = match reqwest::Method::from_bytes(parts.method.as_str().as_bytes()) {
            Ok(m) => m,
            Err(_) => return build_response(StatusCode::METHOD_NOT_ALLOWED, ""),
        };
        let mut request = self.client.request(method, &url);
        for (name, value) in &parts.headers {
            if !is_hop_by_hop(name.as_str()) {
                request = request.header(name.as_str(), value.as_bytes());
            }
        }
        if !body.is_empty() {
            request = request.body(body);
        }

        let upstream = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("Forward to {} failed: {}", url, e);
                return build_response(StatusCode::BAD_GATEWAY, format!("Forward failed: {e}"));
            }
        };

        let status = upstream.status().as_u16();
        let headers: Vec<(String, Vec<u8>)> = upstream
            .headers()
            .iter()
            .filter(|(name, _)| !is_hop_by_hop(name.as_str()))
            .map(|(name, value)| (name.as_str().to_string(), value.as_bytes().to_vec()))
            .collect();
        let bytes = match upstream.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Reading forwarded response from {} failed: {}", url, e);
                return build_response(StatusCode::BAD_GATEWAY, format!("Forward failed: {e}"));
            }
        };

        let mut response = build_response(
            StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY),
            bytes,
        );
        for (name, value) in headers {
            if let (Ok(name), Ok(value)) = (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_bytes(&value),
            ) {
                response.headers_mut().append(name, value);
            }
        }
        response
    }

    async fn callback(&self, callback: &HttpCallback, request: &HttpRequest) -> Response<Full<Bytes>> {
        match self.callbacks.get(&callback.callback_name) {
            Some(handler) => {
                let response = handler.handle(request).await;
                respond(&response).await
            }
            None => {
                warn!("No callback registered under '{}'", callback.callback_name);
                build_response(StatusCode::NOT_FOUND, "")
            }
        }
    }
}

/// Render a canned response, sleeping for its delay first.
pub async fn respond(response: &HttpResponse) -> Response<Full<Bytes>> {
    if let Some(delay) = response.delay {
        tokio::time::sleep(delay.duration()).await;
    }

    let status = StatusCode::from_u16(response.status_code).unwrap_or(StatusCode::OK);
    let body = response
        .body
        .as_ref()
        .map(|b| Bytes::copy_from_slice(b.as_bytes()))
        .unwrap_or_default();

    let headers = response.headers.iter().flat_map(|header| {
        header
            .values
            .iter()
            .map(move |value| (header.name.as_str(), value.as_str()))
    });
    let mut rendered = build_response_with_headers(status, headers, body);

    for cookie in &response.cookies {
        match HeaderValue::from_str(&format!("{}={}", cookie.name, cookie.value)) {
            Ok(value) => {
                rendered.headers_mut().append(SET_COOKIE, value);
            }
            Err(_) => warn!("Skipping invalid cookie '{}'", cookie.name),
        }
    }
    rendered
}
