//! Admin API server.

use crate::admin_api::router::route_request;
use crate::expectation::ExpectationStore;
use anyhow::Context;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

/// Admin API server for decoy
pub struct AdminApiServer {
    listener: TcpListener,
    store: Arc<ExpectationStore>,
}

impl AdminApiServer {
    /// Bind the admin API server. Port 0 picks an ephemeral port.
    pub async fn bind(addr: SocketAddr, store: Arc<ExpectationStore>) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind admin API on {addr}"))?;
        Ok(Self { listener, store })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Run the admin API server
    pub async fn run(self) -> Result<(), anyhow::Error> {
        let addr = self.local_addr()?;
        info!("Decoy Admin API listening on http://{}", addr);

        loop {
            let (stream, _) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    error!("Admin API accept error: {}", e);
                    continue;
                }
            };
            let io = TokioIo::new(stream);
            let store = Arc::clone(&self.store);

            tokio::spawn(async move {
                let service = service_fn(move |req| {
                    let store = Arc::clone(&store);
                    async move { route_request(req, store).await }
                });

                if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                    debug!("Admin API connection error: {}", e);
                }
            });
        }
    }
}
