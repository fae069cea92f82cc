//! Long-running server command

use super::helpers::open_storage;
use registry_core::{
    api::{ApiServer, ApiServerConfig},
    config::RegistryConfig,
    error::Result,
    BroadcastNotifier, RegistryServer,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Run the HTTP API (and the gRPC service when built with `rpc`) until Ctrl-C
pub async fn handle(config: &RegistryConfig) -> Result<()> {
    let storage = open_storage(config).await?;
    let notifier = BroadcastNotifier::new(config.api.event_capacity);
    let registry = RegistryServer::new(storage, Arc::new(notifier.clone()));
    let shutdown = CancellationToken::new();

    let signal = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Cannot listen for Ctrl-C: {}", e);
            return;
        }
        info!("Shutting down");
        signal.cancel();
    });

    let api = ApiServer::new(ApiServerConfig { addr: config.api.addr }, notifier);

    #[cfg(feature = "rpc")]
    {
        let rpc = registry_core::rpc::RpcServer::new(registry);
        let (api_result, rpc_result) = tokio::join!(
            api.serve(shutdown.clone()),
            rpc.serve(config.rpc.addr, shutdown.clone())
        );
        api_result?;
        rpc_result?;
    }

    #[cfg(not(feature = "rpc"))]
    {
        drop(registry);
        info!("Built without the rpc feature; serving notifications only");
        api.serve(shutdown).await?;
    }

    Ok(())
}
