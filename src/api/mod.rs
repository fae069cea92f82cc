//! HTTP API for change notifications
//!
//! Provides:
//! - Server-Sent Events stream of registry notifications
//! - Health check

pub mod server;

pub use server::{ApiServer, ApiServerConfig, HealthResponse, NotificationQuery};
