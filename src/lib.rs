//! Registry - API metadata registry with bulk artifact computation
//!
//! Stores a hierarchy of projects, APIs, versions and specs, with typed
//! artifacts attachable at every level, and computes derived artifacts for
//! large sets of specs on a bounded worker pool.
//!
//! # Architecture
//!
//! - **Names**: hierarchical resource names and wildcard patterns
//! - **Storage**: DAO trait with in-memory and libsql backends
//! - **Server**: request handlers (create/get/list/replace/delete) with change notifications
//! - **Analyzers**: style-keyed registry of spec analyzers producing vocabularies
//! - **Pipeline**: bounded task queue, worker pool and spec enumeration
//! - **API / RPC**: HTTP notification stream and optional gRPC surface
//!
//! # Example
//!
//! ```ignore
//! use registry_core::{
//!     pipeline::{compute_vocabularies, PipelineConfig},
//!     AnalyzerRegistry, MemoryStorage, RecordingNotifier, RegistryServer,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> registry_core::Result<()> {
//!     let server = RegistryServer::new(
//!         Arc::new(MemoryStorage::new()),
//!         Arc::new(RecordingNotifier::new()),
//!     );
//!     let report = compute_vocabularies(
//!         &server,
//!         Arc::new(AnalyzerRegistry::with_builtins()),
//!         "projects/-/apis/-/versions/-/specs/-",
//!         "",
//!         PipelineConfig::default(),
//!     )
//!     .await?;
//!     println!("{} vocabularies computed", report.succeeded);
//!     Ok(())
//! }
//! ```

pub mod analyzers;
pub mod api;
pub mod config;
pub mod error;
pub mod filter;
pub mod names;
pub mod notify;
pub mod pagination;
pub mod pipeline;
#[cfg(feature = "rpc")]
pub mod rpc;
pub mod server;
pub mod storage;
pub mod types;

// Re-export commonly used types
pub use analyzers::{Analyzer, AnalyzerRegistry, Vocabulary};
pub use error::{ErrorCode, RegistryError, Result};
pub use names::{
    ApiName, ArtifactName, ArtifactParent, ProjectName, ResourceName, SpecName, VersionName,
};
pub use notify::{BroadcastNotifier, Notification, NotificationKind, Notifier, RecordingNotifier};
pub use pagination::{Page, PageOptions};
pub use pipeline::{Pipeline, PipelineConfig, PipelineReport, Task};
pub use server::{ContainerBody, ListRequest, RegistryServer, SpecBody};
pub use storage::{LibsqlStorage, MemoryStorage, StorageBackend};
pub use types::{Api, Artifact, ArtifactValue, Project, Spec, Version, View};
