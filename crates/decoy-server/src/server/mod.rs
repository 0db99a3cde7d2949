//! Mock HTTP listener.
//!
//! Live requests are decomposed into [`HttpRequest`](crate::predicate::HttpRequest)s,
//! matched against the shared [`ExpectationStore`] and answered by the
//! matched expectation's action. Unmatched requests get an empty 404.

mod actions;
mod convert;
mod handler;

pub use actions::{
    respond, ActionExecutor, CallbackHandler, CallbackRegistry, EchoCallback, ServerError,
};
pub use convert::decompose;
pub use handler::{handle_mock_request, MockState};

use crate::expectation::ExpectationStore;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

/// The mock listener
pub struct MockServer {
    listener: TcpListener,
    state: Arc<MockState>,
}

impl MockServer {
    /// Bind the listener. Port 0 picks an ephemeral port.
    pub async fn bind(
        addr: SocketAddr,
        store: Arc<ExpectationStore>,
        callbacks: Arc<CallbackRegistry>,
    ) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Bind(addr, e))?;
        let executor = ActionExecutor::new(callbacks)?;
        Ok(Self {
            listener,
            state: Arc::new(MockState { store, executor }),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serve connections until the task is dropped.
    pub async fn run(self) -> Result<(), anyhow::Error> {
        let addr = self.local_addr()?;
        info!("Decoy mock listener on http://{}", addr);

        loop {
            let (stream, _) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    error!("Accept error on {}: {}", addr, e);
                    continue;
                }
            };
            let io = TokioIo::new(stream);
            let state = Arc::clone(&self.state);

            tokio::spawn(async move {
                let service = service_fn(move |req| {
                    let state = Arc::clone(&state);
                    async move { handle_mock_request(req, state).await }
                });

                if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                    debug!("Mock connection error: {}", e);
                }
            });
        }
    }
}
