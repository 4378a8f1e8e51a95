pub mod api;
pub mod classifier;
pub mod config;
pub mod gateway;
pub mod models;
pub mod pipeline;

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use crate::api::ApiContext;
use crate::classifier::ModelRegistry;
use crate::config::ServiceConfig;
use crate::gateway::{HttpFileTransfer, HttpGateway, StorageGateway};
use crate::pipeline::Orchestrator;

/// Timeout for gateway metadata calls.
const GATEWAY_TIMEOUT_SECS: u64 = 30;
/// Timeout for whole-object transfers.
const TRANSFER_TIMEOUT_SECS: u64 = 300;

/// Start the service and block until Ctrl-C.
///
/// Errors are startup failures; the caller exits non-zero.
pub fn run() -> Result<(), String> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let config = ServiceConfig::from_env().map_err(|e| format!("Configuration error: {e}"))?;

    // Clean staging directories left by a previous crash
    pipeline::staging::cleanup_orphaned_staging(
        &config.staging_dir,
        pipeline::staging::ORPHAN_MIN_AGE,
    );

    let models = ModelRegistry::load(&config.model_dir)
        .map_err(|e| format!("Failed to load models: {e}"))?;
    tracing::info!(models = ?models.loaded(), dir = %config.model_dir.display(), "Models loaded");

    // Blocking clients own an internal runtime; build them outside the async one.
    let gateway = HttpGateway::new(&config.gateway, GATEWAY_TIMEOUT_SECS)
        .map_err(|e| format!("Failed to set up storage gateway client: {e}"))?;
    match gateway.ping() {
        Ok(true) => tracing::info!(url = %gateway.base_url(), "Storage gateway reachable"),
        Ok(false) => {
            tracing::warn!(url = %gateway.base_url(), "Storage gateway did not answer ping")
        }
        Err(e) => return Err(format!("Unable to set up the storage gateway: {e}")),
    }
    let transfer = HttpFileTransfer::new(TRANSFER_TIMEOUT_SECS)
        .map_err(|e| format!("Failed to set up file transfer client: {e}"))?;

    let gateway_url = gateway.base_url().to_string();
    // Held here so the blocking clients are dropped after the runtime, not on it.
    let orchestrator = Arc::new(Orchestrator::new(
        Arc::new(models),
        Arc::new(gateway),
        Arc::new(transfer),
        config.staging_dir.clone(),
        config.storage_protocol,
    ));
    let ctx = ApiContext::new(orchestrator.clone(), Some(gateway_url));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("Failed to start async runtime: {e}"))?;

    runtime.block_on(serve(ctx, config))?;

    // Let blocking workers finish before the runtime is torn down.
    runtime.shutdown_timeout(Duration::from_secs(TRANSFER_TIMEOUT_SECS));
    drop(orchestrator);
    tracing::info!("{} stopped", config::APP_NAME);
    Ok(())
}

async fn serve(ctx: ApiContext, config: ServiceConfig) -> Result<(), String> {
    let mut server = api::start_server_on(ctx, config.bind_addr).await?;
    tracing::info!(addr = %server.addr, "Listening");

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
    }
    server.shutdown();
    server.stopped().await;
    Ok(())
}
