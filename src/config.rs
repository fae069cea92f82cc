//! Layered configuration for the registry
//!
//! Sources, lowest precedence first: built-in defaults, an optional TOML
//! file, then `REGISTRY__*` environment variables (`__` separates nesting,
//! e.g. `REGISTRY__PIPELINE__WORKERS=8`).
//!
//! ```toml
//! [storage]
//! path = "registry.db"      # ":memory:" keeps everything in process
//!
//! [pipeline]
//! workers = 64
//! queue_capacity = 1024
//! task_timeout_secs = 0     # 0 disables the per-task deadline
//!
//! [api]
//! addr = "127.0.0.1:8080"
//! event_capacity = 1000
//!
//! [rpc]
//! addr = "127.0.0.1:8081"
//! ```

use crate::error::{RegistryError, Result};
use crate::pipeline::{PipelineConfig, DEFAULT_QUEUE_CAPACITY, DEFAULT_WORKERS};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Storage path selecting the in-memory backend
pub const IN_MEMORY: &str = ":memory:";

/// Environment variable prefix
pub const ENV_PREFIX: &str = "REGISTRY";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageSettings {
    /// libsql database file, or `:memory:`
    pub path: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            path: "registry.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineSettings {
    pub workers: usize,
    pub queue_capacity: usize,
    pub task_timeout_secs: u64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            task_timeout_secs: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiSettings {
    pub addr: SocketAddr,
    /// Notification channel capacity
    pub event_capacity: usize,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            addr: ([127, 0, 0, 1], 8080).into(),
            event_capacity: 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcSettings {
    pub addr: SocketAddr,
}

impl Default for RpcSettings {
    fn default() -> Self {
        Self {
            addr: ([127, 0, 0, 1], 8081).into(),
        }
    }
}

/// Complete registry configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistryConfig {
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub pipeline: PipelineSettings,
    #[serde(default)]
    pub api: ApiSettings,
    #[serde(default)]
    pub rpc: RpcSettings,
}

fn invalid(msg: impl Into<String>) -> RegistryError {
    RegistryError::Config(config::ConfigError::Message(msg.into()))
}

impl RegistryConfig {
    /// Load defaults, then `path` (required only when `required`), then the environment
    pub fn load(path: &Path, required: bool) -> Result<Self> {
        Self::load_from(
            path,
            required,
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        )
    }

    fn load_from(path: &Path, required: bool, env: Environment) -> Result<Self> {
        debug!("Loading configuration from {}", path.display());
        let config = Config::builder()
            .add_source(Config::try_from(&RegistryConfig::default())?)
            .add_source(File::from(path).format(FileFormat::Toml).required(required))
            .add_source(env)
            .build()?
            .try_deserialize::<RegistryConfig>()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML document layered over the defaults
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config = Config::builder()
            .add_source(Config::try_from(&RegistryConfig::default())?)
            .add_source(File::from_str(toml_str, FileFormat::Toml))
            .build()?
            .try_deserialize::<RegistryConfig>()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.pipeline.workers == 0 {
            return Err(invalid("pipeline.workers must be at least 1"));
        }
        if self.pipeline.queue_capacity == 0 {
            return Err(invalid("pipeline.queue_capacity must be at least 1"));
        }
        if self.api.event_capacity == 0 {
            return Err(invalid("api.event_capacity must be at least 1"));
        }
        if self.storage.path.is_empty() {
            return Err(invalid("storage.path must not be empty"));
        }
        Ok(())
    }

    /// True when the in-memory backend is selected
    pub fn in_memory(&self) -> bool {
        self.storage.path == IN_MEMORY
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            workers: self.pipeline.workers,
            queue_capacity: self.pipeline.queue_capacity,
            task_timeout: (self.pipeline.task_timeout_secs > 0)
                .then(|| Duration::from_secs(self.pipeline.task_timeout_secs)),
        }
    }

    /// Render the effective configuration
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| invalid(format!("cannot render config: {}", e)))
    }
}
