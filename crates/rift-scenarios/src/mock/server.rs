//! Mock listener.

use super::engine::MockEngine;
use super::handler::handle_mock_request;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

/// HTTP listener serving mappings from a [`MockEngine`]
pub struct MockServer {
    listener: TcpListener,
    engine: Arc<MockEngine>,
}

impl MockServer {
    /// Bind the listener. Port 0 picks a free port; see [`MockServer::local_addr`].
    pub async fn bind(addr: SocketAddr, engine: Arc<MockEngine>) -> Result<Self, anyhow::Error> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind mock listener on {addr}: {e}"))?;
        Ok(Self { listener, engine })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, anyhow::Error> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve until the task is dropped
    pub async fn run(self) -> Result<(), anyhow::Error> {
        info!("Mock server listening on http://{}", self.local_addr()?);

        loop {
            let (stream, addr) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    error!("Mock listener accept error: {}", e);
                    continue;
                }
            };
            let io = TokioIo::new(stream);
            let engine = Arc::clone(&self.engine);

            tokio::spawn(async move {
                let service = service_fn(move |req| {
                    let engine = Arc::clone(&engine);
                    async move { handle_mock_request(req, engine).await }
                });

                if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                    debug!("Mock connection error from {}: {}", addr, e);
                }
            });
        }
    }
}
