//! Storage access layer
//!
//! [`StorageBackend`] is the only path to persistent state. It is keyed by
//! resource name and scoped to one resource per call; the layer above is
//! responsible for referential checks (parent exists, children removed).
//!
//! Spec and artifact contents are addressed separately from their metadata so
//! that listings and BASIC reads never touch content bytes.

pub mod libsql;
pub mod memory;

use crate::error::Result;
use crate::names::{
    ApiName, ArtifactName, ArtifactParent, ProjectName, SpecName, VersionName,
};
use crate::pagination::{Page, PageOptions};
use crate::types::{Api, Artifact, Project, Spec, Version};
use async_trait::async_trait;

pub use self::libsql::LibsqlStorage;
pub use self::memory::MemoryStorage;

/// Storage backend trait defining all required operations
///
/// `get_*` and `delete_*` return `NotFound` for absent names. `save_*` is an
/// upsert of the metadata record. `list_*` accept parent patterns containing
/// the `-` wildcard and return records ordered by name.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StorageBackend: Send + Sync {
    async fn get_project(&self, name: &ProjectName) -> Result<Project>;
    async fn save_project(&self, project: &Project) -> Result<()>;
    async fn delete_project(&self, name: &ProjectName) -> Result<()>;
    async fn list_projects(&self, options: &PageOptions) -> Result<Page<Project>>;

    async fn get_api(&self, name: &ApiName) -> Result<Api>;
    async fn save_api(&self, api: &Api) -> Result<()>;
    async fn delete_api(&self, name: &ApiName) -> Result<()>;
    async fn list_apis(&self, parent: &ProjectName, options: &PageOptions) -> Result<Page<Api>>;

    async fn get_version(&self, name: &VersionName) -> Result<Version>;
    async fn save_version(&self, version: &Version) -> Result<()>;
    async fn delete_version(&self, name: &VersionName) -> Result<()>;
    async fn list_versions(
        &self,
        parent: &ApiName,
        options: &PageOptions,
    ) -> Result<Page<Version>>;

    /// Spec metadata only; `contents` is always `None`
    async fn get_spec(&self, name: &SpecName) -> Result<Spec>;
    async fn save_spec(&self, spec: &Spec) -> Result<()>;
    /// Removes the spec record and its contents
    async fn delete_spec(&self, name: &SpecName) -> Result<()>;
    async fn list_specs(&self, parent: &VersionName, options: &PageOptions) -> Result<Page<Spec>>;
    async fn get_spec_contents(&self, name: &SpecName) -> Result<Vec<u8>>;
    async fn save_spec_contents(&self, name: &SpecName, contents: &[u8]) -> Result<()>;

    /// Artifact metadata only; `contents` is always `None`
    async fn get_artifact(&self, name: &ArtifactName) -> Result<Artifact>;
    async fn save_artifact(&self, artifact: &Artifact) -> Result<()>;
    /// Removes the artifact record and its contents
    async fn delete_artifact(&self, name: &ArtifactName) -> Result<()>;
    async fn list_artifacts(
        &self,
        parent: &ArtifactParent,
        options: &PageOptions,
    ) -> Result<Page<Artifact>>;
    async fn get_artifact_contents(&self, name: &ArtifactName) -> Result<Vec<u8>>;
    async fn save_artifact_contents(&self, name: &ArtifactName, contents: &[u8]) -> Result<()>;
}
