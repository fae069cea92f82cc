//! In-process storage backend
//!
//! Backs tests and the `:memory:` configuration. Records live in ordered maps
//! keyed by full resource name, so iteration order is listing order.

use crate::error::{RegistryError, Result};
use crate::names::{
    ApiName, ArtifactName, ArtifactParent, ProjectName, SpecName, VersionName,
};
use crate::pagination::{paginate, Page, PageOptions};
use crate::storage::StorageBackend;
use crate::types::{Api, Artifact, Project, Spec, Version};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Default)]
struct Tables {
    projects: BTreeMap<String, Project>,
    apis: BTreeMap<String, Api>,
    versions: BTreeMap<String, Version>,
    specs: BTreeMap<String, Spec>,
    artifacts: BTreeMap<String, Artifact>,
    blobs: BTreeMap<String, Vec<u8>>,
}

/// Memory storage backend
#[derive(Default)]
pub struct MemoryStorage {
    tables: RwLock<Tables>,
    content_reads: AtomicUsize,
    content_writes: AtomicUsize,
}

fn missing(kind: &str, name: &impl ToString) -> RegistryError {
    RegistryError::not_found(format!("{} {} not found", kind, name.to_string()))
}

impl MemoryStorage {
    /// Create new empty storage
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of content fetches served so far
    pub fn content_reads(&self) -> usize {
        self.content_reads.load(Ordering::SeqCst)
    }

    /// Number of content writes accepted so far
    pub fn content_writes(&self) -> usize {
        self.content_writes.load(Ordering::SeqCst)
    }

    fn read_blob(&self, tables: &Tables, kind: &str, key: String) -> Result<Vec<u8>> {
        self.content_reads.fetch_add(1, Ordering::SeqCst);
        tables
            .blobs
            .get(&key)
            .cloned()
            .ok_or_else(|| missing(kind, &key))
    }
}

#[async_trait]
impl StorageBackend for MemoryStorage {
    async fn get_project(&self, name: &ProjectName) -> Result<Project> {
        let tables = self.tables.read().await;
        tables
            .projects
            .get(&name.to_string())
            .cloned()
            .ok_or_else(|| missing("project", name))
    }

    async fn save_project(&self, project: &Project) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables
            .projects
            .insert(project.name.to_string(), project.clone());
        Ok(())
    }

    async fn delete_project(&self, name: &ProjectName) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables
            .projects
            .remove(&name.to_string())
            .map(|_| ())
            .ok_or_else(|| missing("project", name))
    }

    async fn list_projects(&self, options: &PageOptions) -> Result<Page<Project>> {
        let tables = self.tables.read().await;
        paginate(tables.projects.values().cloned(), options)
    }

    async fn get_api(&self, name: &ApiName) -> Result<Api> {
        let tables = self.tables.read().await;
        tables
            .apis
            .get(&name.to_string())
            .cloned()
            .ok_or_else(|| missing("api", name))
    }

    async fn save_api(&self, api: &Api) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.apis.insert(api.name.to_string(), api.clone());
        Ok(())
    }

    async fn delete_api(&self, name: &ApiName) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables
            .apis
            .remove(&name.to_string())
            .map(|_| ())
            .ok_or_else(|| missing("api", name))
    }

    async fn list_apis(&self, parent: &ProjectName, options: &PageOptions) -> Result<Page<Api>> {
        let tables = self.tables.read().await;
        let records = tables
            .apis
            .values()
            .filter(|a| parent.matches(&a.name.project()))
            .cloned();
        paginate(records, options)
    }

    async fn get_version(&self, name: &VersionName) -> Result<Version> {
        let tables = self.tables.read().await;
        tables
            .versions
            .get(&name.to_string())
            .cloned()
            .ok_or_else(|| missing("version", name))
    }

    async fn save_version(&self, version: &Version) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables
            .versions
            .insert(version.name.to_string(), version.clone());
        Ok(())
    }

    async fn delete_version(&self, name: &VersionName) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables
            .versions
            .remove(&name.to_string())
            .map(|_| ())
            .ok_or_else(|| missing("version", name))
    }

    async fn list_versions(
        &self,
        parent: &ApiName,
        options: &PageOptions,
    ) -> Result<Page<Version>> {
        let tables = self.tables.read().await;
        let records = tables
            .versions
            .values()
            .filter(|v| parent.matches(&v.name.api()))
            .cloned();
        paginate(records, options)
    }

    async fn get_spec(&self, name: &SpecName) -> Result<Spec> {
        let tables = self.tables.read().await;
        tables
            .specs
            .get(&name.to_string())
            .cloned()
            .ok_or_else(|| missing("spec", name))
    }

    async fn save_spec(&self, spec: &Spec) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.specs.insert(spec.name.to_string(), spec.basic());
        Ok(())
    }

    async fn delete_spec(&self, name: &SpecName) -> Result<()> {
        let key = name.to_string();
        let mut tables = self.tables.write().await;
        tables.specs.remove(&key).ok_or_else(|| missing("spec", name))?;
        tables.blobs.remove(&key);
        Ok(())
    }

    async fn list_specs(&self, parent: &VersionName, options: &PageOptions) -> Result<Page<Spec>> {
        let tables = self.tables.read().await;
        let records = tables
            .specs
            .values()
            .filter(|s| parent.matches(&s.name.version()))
            .cloned();
        paginate(records, options)
    }

    async fn get_spec_contents(&self, name: &SpecName) -> Result<Vec<u8>> {
        let tables = self.tables.read().await;
        self.read_blob(&tables, "spec contents for", name.to_string())
    }

    async fn save_spec_contents(&self, name: &SpecName, contents: &[u8]) -> Result<()> {
        debug!("Saving {} bytes of contents for {}", contents.len(), name);
        self.content_writes.fetch_add(1, Ordering::SeqCst);
        let mut tables = self.tables.write().await;
        tables.blobs.insert(name.to_string(), contents.to_vec());
        Ok(())
    }

    async fn get_artifact(&self, name: &ArtifactName) -> Result<Artifact> {
        let tables = self.tables.read().await;
        tables
            .artifacts
            .get(&name.to_string())
            .cloned()
            .ok_or_else(|| missing("artifact", name))
    }

    async fn save_artifact(&self, artifact: &Artifact) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables
            .artifacts
            .insert(artifact.name.to_string(), artifact.basic());
        Ok(())
    }

    async fn delete_artifact(&self, name: &ArtifactName) -> Result<()> {
        let key = name.to_string();
        let mut tables = self.tables.write().await;
        tables
            .artifacts
            .remove(&key)
            .ok_or_else(|| missing("artifact", name))?;
        tables.blobs.remove(&key);
        Ok(())
    }

    async fn list_artifacts(
        &self,
        parent: &ArtifactParent,
        options: &PageOptions,
    ) -> Result<Page<Artifact>> {
        let tables = self.tables.read().await;
        let records = tables
            .artifacts
            .values()
            .filter(|a| parent.matches(a.name.parent()))
            .cloned();
        paginate(records, options)
    }

    async fn get_artifact_contents(&self, name: &ArtifactName) -> Result<Vec<u8>> {
        let tables = self.tables.read().await;
        self.read_blob(&tables, "artifact contents for", name.to_string())
    }

    async fn save_artifact_contents(&self, name: &ArtifactName, contents: &[u8]) -> Result<()> {
        self.content_writes.fetch_add(1, Ordering::SeqCst);
        let mut tables = self.tables.write().await;
        tables.blobs.insert(name.to_string(), contents.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ArtifactValue;

    fn spec_name(id: &str) -> SpecName {
        ProjectName::new("demo").api("a").version("v1").spec(id)
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let storage = MemoryStorage::new();
        let err = storage.get_spec(&spec_name("s")).await.unwrap_err();
        assert!(err.is_not_found());
        assert!(storage.delete_spec(&spec_name("s")).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_save_spec_strips_contents() {
        let storage = MemoryStorage::new();
        let spec = Spec::new(spec_name("s"), "discovery").with_contents(b"{}".to_vec());
        storage.save_spec(&spec).await.unwrap();
        storage
            .save_spec_contents(&spec.name, b"{}")
            .await
            .unwrap();

        let fetched = storage.get_spec(&spec.name).await.unwrap();
        assert!(fetched.contents.is_none());
        assert_eq!(fetched.size_bytes, 2);
        assert_eq!(storage.content_reads(), 0);

        assert_eq!(storage.get_spec_contents(&spec.name).await.unwrap(), b"{}");
        assert_eq!(storage.content_reads(), 1);
    }

    #[tokio::test]
    async fn test_delete_removes_blob() {
        let storage = MemoryStorage::new();
        let name = spec_name("s").artifact("note");
        let artifact = Artifact::from_value(name.clone(), &ArtifactValue::Bool { value: true });
        storage.save_artifact(&artifact).await.unwrap();
        storage.save_artifact_contents(&name, b"true").await.unwrap();

        storage.delete_artifact(&name).await.unwrap();
        assert!(storage.get_artifact_contents(&name).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_list_specs_with_wildcard_parent() {
        let storage = MemoryStorage::new();
        for (api, id) in [("a", "s1"), ("b", "s2"), ("a", "s3")] {
            let name = ProjectName::new("demo").api(api).version("v1").spec(id);
            storage.save_spec(&Spec::new(name, "discovery")).await.unwrap();
        }
        let other = ProjectName::new("other").api("a").version("v1").spec("s4");
        storage.save_spec(&Spec::new(other, "discovery")).await.unwrap();

        let pattern = VersionName::parse_pattern("projects/demo/apis/-/versions/-").unwrap();
        let page = storage
            .list_specs(&pattern, &PageOptions::default())
            .await
            .unwrap();
        let names: Vec<String> = page.items.iter().map(|s| s.name.spec_id.clone()).collect();
        assert_eq!(names, vec!["s1", "s3", "s2"]);
        assert!(page.next_page_token.is_empty());
    }
}
