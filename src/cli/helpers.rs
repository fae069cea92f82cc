//! Shared setup for command handlers

use registry_core::{
    config::RegistryConfig, error::Result, LibsqlStorage, MemoryStorage, StorageBackend,
};
use std::sync::Arc;
use tracing::{debug, warn};

/// Open the storage backend named by the configuration
pub async fn open_storage(config: &RegistryConfig) -> Result<Arc<dyn StorageBackend>> {
    if config.in_memory() {
        warn!("Using in-memory storage; nothing will outlive this process");
        return Ok(Arc::new(MemoryStorage::new()));
    }
    debug!("Opening libsql database at {}", config.storage.path);
    Ok(Arc::new(LibsqlStorage::open(&config.storage.path).await?))
}
