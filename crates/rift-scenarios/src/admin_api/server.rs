//! Admin API server.

use crate::admin_api::router::route_request;
use crate::mock::MockEngine;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

/// Admin API server sharing the engine (and its scenario store) with the mock listener
pub struct AdminApiServer {
    listener: TcpListener,
    engine: Arc<MockEngine>,
}

impl AdminApiServer {
    /// Bind the admin listener. Port 0 picks a free port.
    pub async fn bind(addr: SocketAddr, engine: Arc<MockEngine>) -> Result<Self, anyhow::Error> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind admin listener on {addr}: {e}"))?;
        Ok(Self { listener, engine })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, anyhow::Error> {
        Ok(self.listener.local_addr()?)
    }

    /// Run the admin API server
    pub async fn run(self) -> Result<(), anyhow::Error> {
        info!("Rift Admin API listening on http://{}", self.local_addr()?);

        loop {
            let (stream, addr) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    error!("Admin listener accept error: {}", e);
                    continue;
                }
            };
            let io = TokioIo::new(stream);
            let engine = Arc::clone(&self.engine);

            tokio::spawn(async move {
                let service = service_fn(move |req| {
                    let engine = Arc::clone(&engine);
                    async move { route_request(req, engine).await }
                });

                if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                    debug!("Admin API connection error from {}: {}", addr, e);
                }
            });
        }
    }
}
