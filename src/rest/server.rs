//! REST API HTTP server.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use super::{router::create_router, state::ApiState};

/// Running API server handle.
pub struct TineServer {
    /// Sender for graceful shutdown.
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
    /// Server task.
    task: Option<tokio::task::JoinHandle<()>>,
    /// Bound address.
    addr: SocketAddr,
}

impl TineServer {
    /// Binds `addr` and starts serving in a background task.
    ///
    /// Port 0 picks a free port; see [`TineServer::addr`].
    ///
    /// # Errors
    /// Returns error if the server fails to bind.
    pub async fn start(
        state: ApiState,
        addr: SocketAddr,
        assets: Option<PathBuf>,
    ) -> std::io::Result<Self> {
        let router = create_router(Arc::new(state), assets.as_deref());

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        let listener = tokio::net::TcpListener::bind(addr).await?;
        let actual_addr = listener.local_addr()?;

        let task = tokio::spawn(async move {
            let server = axum::serve(listener, router).with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            });

            if let Err(e) = server.await {
                tracing::error!("API server error: {}", e);
            }
        });

        tracing::info!("API server listening on http://{}", actual_addr);
        if let Some(dir) = &assets {
            tracing::info!("Serving assets from {}", dir.display());
        }

        Ok(Self {
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
            addr: actual_addr,
        })
    }

    /// Returns the server address.
    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Returns the base URL.
    #[must_use]
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Requests shutdown without waiting.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
            tracing::info!("API server shutdown requested");
        }
    }

    /// Requests shutdown and waits for in-flight requests to finish.
    pub async fn stop(mut self) {
        self.shutdown();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::error!("API server task failed: {}", e);
            }
        }
    }
}

impl Drop for TineServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::probe::{Dispatcher, ProbeConfig};

    #[tokio::test]
    async fn test_server_start_and_health() {
        let dispatcher = Dispatcher::from_config(&ProbeConfig::default()).unwrap();
        let server = TineServer::start(
            ApiState::new(dispatcher),
            SocketAddr::from(([127, 0, 0, 1], 0)),
            None,
        )
        .await
        .unwrap();
        assert_ne!(server.addr().port(), 0);

        let body: serde_json::Value = reqwest::get(format!("{}/api/health", server.url()))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["status"], "ok");

        server.stop().await;
    }
}
