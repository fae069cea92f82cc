//! gRPC server setup

use crate::error::{RegistryError, Result};
use crate::rpc::generated::registry_server::RegistryServer as RegistryGrpcServer;
use crate::rpc::services::RegistryServiceImpl;
use crate::server::RegistryServer;
use std::net::SocketAddr;
use tokio_util::sync::CancellationToken;
use tonic::transport::Server;
use tracing::info;

pub struct RpcServer {
    registry_service: RegistryServiceImpl,
}

impl RpcServer {
    pub fn new(registry: RegistryServer) -> Self {
        Self {
            registry_service: RegistryServiceImpl::new(registry),
        }
    }

    /// Serve until `shutdown` is cancelled
    pub async fn serve(self, addr: SocketAddr, shutdown: CancellationToken) -> Result<()> {
        info!("Starting registry RPC server on {}", addr);

        Server::builder()
            .add_service(RegistryGrpcServer::new(self.registry_service))
            .serve_with_shutdown(addr, async move { shutdown.cancelled().await })
            .await
            .map_err(|e| RegistryError::Unavailable(format!("RPC server on {}: {}", addr, e)))?;

        info!("Registry RPC server stopped");
        Ok(())
    }
}
