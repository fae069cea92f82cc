//! Projects, APIs and versions
//!
//! Containers exist so that specs and artifacts have parents. Deleting a
//! container that still has children is refused unless `force` is set, in
//! which case children are removed bottom-up before the container itself.

use super::{collect_pages, ListRequest, RegistryServer};
use crate::error::{RegistryError, Result};
use crate::names::{generate_id, ApiName, ArtifactParent, ProjectName, VersionName};
use crate::notify::NotificationKind;
use crate::pagination::{Page, PageOptions};
use crate::types::{Api, Project, Version};
use chrono::Utc;
use tracing::info;

/// Caller-supplied fields of a container
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerBody {
    pub display_name: String,
    pub description: String,
}

fn pick_id(id: Option<&str>) -> String {
    match id {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => generate_id(),
    }
}

fn already_exists(name: impl std::fmt::Display) -> RegistryError {
    RegistryError::AlreadyExists(format!("{} already exists", name))
}

fn has_children(name: impl std::fmt::Display) -> RegistryError {
    RegistryError::invalid(format!(
        "{} has children; delete them first or set force",
        name
    ))
}

/// Ok(()) when absent, AlreadyExists when present
fn absent<T>(lookup: Result<T>, name: impl std::fmt::Display) -> Result<()> {
    match lookup {
        Ok(_) => Err(already_exists(name)),
        Err(e) if e.is_not_found() => Ok(()),
        Err(e) => Err(e),
    }
}

impl RegistryServer {
    pub async fn create_project(&self, project_id: Option<&str>, body: &ContainerBody) -> Result<Project> {
        let name = ProjectName::new(pick_id(project_id));
        name.validate()?;
        absent(self.storage.get_project(&name).await, &name)?;

        let mut project = Project::new(name);
        project.display_name = body.display_name.clone();
        project.description = body.description.clone();
        self.storage.save_project(&project).await?;
        self.notify(NotificationKind::Created, &project.name);
        Ok(project)
    }

    pub async fn get_project(&self, name: &str) -> Result<Project> {
        self.storage.get_project(&ProjectName::parse(name)?).await
    }

    pub async fn list_projects(&self, request: &ListRequest) -> Result<Page<Project>> {
        self.storage.list_projects(&request.options()?).await
    }

    pub async fn update_project(&self, name: &str, body: &ContainerBody) -> Result<Project> {
        let name = ProjectName::parse(name)?;
        let mut project = self.storage.get_project(&name).await?;
        project.display_name = body.display_name.clone();
        project.description = body.description.clone();
        project.update_time = Utc::now();
        self.storage.save_project(&project).await?;
        self.notify(NotificationKind::Updated, &project.name);
        Ok(project)
    }

    pub async fn delete_project(&self, name: &str, force: bool) -> Result<()> {
        let name = ProjectName::parse(name)?;
        self.storage.get_project(&name).await?;
        let artifacts = ArtifactParent::Project(name.clone());

        if force {
            let storage = &self.storage;
            let apis = collect_pages(|options| {
                let name = &name;
                async move { storage.list_apis(name, &options).await }
            })
            .await?;
            for api in apis {
                self.delete_api_tree(&api.name).await?;
            }
            self.delete_artifacts_of(&artifacts).await?;
            info!("Deleted {} and its children", name);
        } else {
            let apis = self.storage.list_apis(&name, &PageOptions::first(1)).await?;
            if !apis.items.is_empty() || self.has_artifacts(&artifacts).await? {
                return Err(has_children(&name));
            }
        }

        self.storage.delete_project(&name).await?;
        self.notify(NotificationKind::Deleted, &name);
        Ok(())
    }

    pub async fn create_api(
        &self,
        parent: &str,
        api_id: Option<&str>,
        body: &ContainerBody,
    ) -> Result<Api> {
        let parent = ProjectName::parse(parent)?;
        let name = parent.api(pick_id(api_id));
        name.validate()?;
        absent(self.storage.get_api(&name).await, &name)?;
        self.storage.get_project(&parent).await?;

        let mut api = Api::new(name);
        api.display_name = body.display_name.clone();
        api.description = body.description.clone();
        self.storage.save_api(&api).await?;
        self.notify(NotificationKind::Created, &api.name);
        Ok(api)
    }

    pub async fn get_api(&self, name: &str) -> Result<Api> {
        self.storage.get_api(&ApiName::parse(name)?).await
    }

    /// List APIs of a project; the parent may contain wildcards
    pub async fn list_apis(&self, parent: &str, request: &ListRequest) -> Result<Page<Api>> {
        let parent = ProjectName::parse_pattern(parent)?;
        self.storage.list_apis(&parent, &request.options()?).await
    }

    pub async fn delete_api(&self, name: &str, force: bool) -> Result<()> {
        let name = ApiName::parse(name)?;
        self.storage.get_api(&name).await?;
        if !force {
            let versions = self
                .storage
                .list_versions(&name, &PageOptions::first(1))
                .await?;
            if !versions.items.is_empty()
                || self.has_artifacts(&ArtifactParent::Api(name.clone())).await?
            {
                return Err(has_children(&name));
            }
        }
        self.delete_api_tree(&name).await
    }

    async fn delete_api_tree(&self, name: &ApiName) -> Result<()> {
        let storage = &self.storage;
        let versions = collect_pages(|options| async move {
            storage.list_versions(name, &options).await
        })
        .await?;
        for version in versions {
            self.delete_version_tree(&version.name).await?;
        }
        self.delete_artifacts_of(&ArtifactParent::Api(name.clone()))
            .await?;
        self.storage.delete_api(name).await?;
        self.notify(NotificationKind::Deleted, name);
        Ok(())
    }

    pub async fn create_version(
        &self,
        parent: &str,
        version_id: Option<&str>,
        body: &ContainerBody,
    ) -> Result<Version> {
        let parent = ApiName::parse(parent)?;
        let name = parent.version(pick_id(version_id));
        name.validate()?;
        absent(self.storage.get_version(&name).await, &name)?;
        self.storage.get_api(&parent).await?;

        let mut version = Version::new(name);
        version.display_name = body.display_name.clone();
        version.description = body.description.clone();
        self.storage.save_version(&version).await?;
        self.notify(NotificationKind::Created, &version.name);
        Ok(version)
    }

    pub async fn get_version(&self, name: &str) -> Result<Version> {
        self.storage.get_version(&VersionName::parse(name)?).await
    }

    pub async fn list_versions(&self, parent: &str, request: &ListRequest) -> Result<Page<Version>> {
        let parent = ApiName::parse_pattern(parent)?;
        self.storage.list_versions(&parent, &request.options()?).await
    }

    pub async fn delete_version(&self, name: &str, force: bool) -> Result<()> {
        let name = VersionName::parse(name)?;
        self.storage.get_version(&name).await?;
        if !force {
            let specs = self
                .storage
                .list_specs(&name, &PageOptions::first(1))
                .await?;
            if !specs.items.is_empty()
                || self
                    .has_artifacts(&ArtifactParent::Version(name.clone()))
                    .await?
            {
                return Err(has_children(&name));
            }
        }
        self.delete_version_tree(&name).await
    }

    async fn delete_version_tree(&self, name: &VersionName) -> Result<()> {
        let storage = &self.storage;
        let specs = collect_pages(|options| async move {
            storage.list_specs(name, &options).await
        })
        .await?;
        for spec in specs {
            self.delete_spec_tree(&spec.name).await?;
        }
        self.delete_artifacts_of(&ArtifactParent::Version(name.clone()))
            .await?;
        self.storage.delete_version(name).await?;
        self.notify(NotificationKind::Deleted, name);
        Ok(())
    }
}
