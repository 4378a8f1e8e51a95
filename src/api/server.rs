//! Inference server lifecycle.
//!
//! bind → spawn background task → return handle with shutdown channel.

use std::net::SocketAddr;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::api::router::inference_router;
use crate::api::types::ApiContext;

/// Handle to a running inference server.
pub struct InferenceServer {
    /// Address actually bound; differs from the requested one for port 0.
    pub addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl InferenceServer {
    /// Ask the server to stop accepting connections.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
            tracing::info!("Inference server shutdown signal sent");
        }
    }

    /// Wait until the server task has finished serving in-flight requests.
    pub async fn stopped(&mut self) {
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::error!("Inference server task failed: {e}");
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Server lifecycle
// ═══════════════════════════════════════════════════════════

/// Bind `addr`, mount the inference router and serve in a background task.
///
/// Port 0 binds an ephemeral port; the chosen one is in `addr`.
pub async fn start_server_on(ctx: ApiContext, addr: SocketAddr) -> Result<InferenceServer, String> {
    // 1. Bind
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| format!("Failed to bind inference server on {addr}: {e}"))?;

    let addr = listener
        .local_addr()
        .map_err(|e| format!("Failed to get server address: {e}"))?;

    // 2. Router
    let app = inference_router(ctx);

    // 3. Shutdown signal
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    // 4. Serve
    let task = tokio::spawn(async move {
        let shutdown_signal = async move {
            let _ = shutdown_rx.await;
            tracing::info!("Inference server received shutdown signal");
        };

        tracing::info!(%addr, "Inference server started");

        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
        {
            tracing::error!("Inference server error: {e}");
        }

        tracing::info!("Inference server stopped");
    });

    Ok(InferenceServer {
        addr,
        shutdown_tx: Some(shutdown_tx),
        task: Some(task),
    })
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};
    use std::sync::Arc;

    use super::*;
    use crate::classifier::ModelRegistry;
    use crate::gateway::testing::{FakeGateway, FakeTransfer};
    use crate::models::StorageProtocol;
    use crate::pipeline::Orchestrator;

    fn test_ctx(staging_root: &std::path::Path) -> ApiContext {
        let orchestrator = Orchestrator::new(
            Arc::new(ModelRegistry::new()),
            Arc::new(FakeGateway::default()),
            Arc::new(FakeTransfer::default()),
            staging_root.to_path_buf(),
            StorageProtocol::S3,
        );
        ApiContext::new(Arc::new(orchestrator), None)
    }

    fn localhost() -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0)
    }

    #[tokio::test]
    async fn start_and_stop_server() {
        let dir = tempfile::tempdir().unwrap();
        let mut server = start_server_on(test_ctx(dir.path()), localhost())
            .await
            .expect("server should start");

        assert!(server.addr.port() > 0);
        assert!(server.addr.ip().is_loopback());

        let url = format!("http://{}/", server.addr);
        let resp = reqwest::get(&url).await.unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::OK);

        server.shutdown();
        server.stopped().await;
    }

    #[tokio::test]
    async fn health_reports_no_gateway() {
        let dir = tempfile::tempdir().unwrap();
        let mut server = start_server_on(test_ctx(dir.path()), localhost())
            .await
            .expect("server should start");

        let url = format!("http://{}/health", server.addr);
        let json: serde_json::Value = reqwest::get(&url).await.unwrap().json().await.unwrap();
        assert_eq!(json["gateway_configured"], false);
        assert_eq!(json["models"], serde_json::json!([]));

        server.shutdown();
        server.stopped().await;
    }

    #[tokio::test]
    async fn bind_conflict_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut first = start_server_on(test_ctx(dir.path()), localhost())
            .await
            .expect("server should start");
        let second = start_server_on(test_ctx(dir.path()), first.addr).await;
        assert!(second.is_err());

        first.shutdown();
    }

    #[tokio::test]
    async fn shutdown_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mut server = start_server_on(test_ctx(dir.path()), localhost())
            .await
            .expect("server should start");

        server.shutdown();
        server.shutdown();
        server.stopped().await;
    }
}
