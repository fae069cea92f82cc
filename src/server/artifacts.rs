use super::{collect_pages, ListRequest, RegistryServer};
use crate::error::{RegistryError, Result};
use crate::names::{generate_id, ArtifactName, ArtifactParent};
use crate::notify::NotificationKind;
use crate::pagination::Page;
use crate::types::{Artifact, ArtifactValue, View};
use tracing::debug;

impl RegistryServer {
    /// Create an artifact under an existing parent
    ///
    /// The id is generated when `artifact_id` is absent or empty. Returns the
    /// stored record in the BASIC view.
    pub async fn create_artifact(
        &self,
        parent: &str,
        artifact_id: Option<&str>,
        value: &ArtifactValue,
    ) -> Result<Artifact> {
        let parent = ArtifactParent::parse(parent)?;
        let id = match artifact_id {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => generate_id(),
        };
        self.create_named_artifact(parent.artifact(id), value).await
    }

    async fn create_named_artifact(
        &self,
        name: ArtifactName,
        value: &ArtifactValue,
    ) -> Result<Artifact> {
        name.validate()?;
        match self.storage.get_artifact(&name).await {
            Ok(_) => {
                return Err(RegistryError::AlreadyExists(format!(
                    "artifact {} already exists",
                    name
                )))
            }
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }
        self.require_artifact_parent(name.parent()).await?;

        let artifact = Artifact::from_value(name, value);
        self.persist_artifact(&artifact).await?;
        self.notify(NotificationKind::Created, &artifact.name);
        Ok(artifact.basic())
    }

    pub async fn get_artifact(&self, name: &str, view: View) -> Result<Artifact> {
        let name = ArtifactName::parse(name)?;
        let artifact = self.storage.get_artifact(&name).await?;
        self.artifact_view(artifact, view).await
    }

    /// List artifacts of a parent; the parent may contain wildcards
    pub async fn list_artifacts(&self, parent: &str, request: &ListRequest) -> Result<Page<Artifact>> {
        let parent = ArtifactParent::parse_pattern(parent)?;
        let page = self
            .storage
            .list_artifacts(&parent, &request.options()?)
            .await?;

        let mut items = Vec::with_capacity(page.items.len());
        for artifact in page.items {
            items.push(self.artifact_view(artifact, request.view).await?);
        }
        Ok(Page {
            items,
            next_page_token: page.next_page_token,
        })
    }

    /// Overwrite the value of an existing artifact
    pub async fn replace_artifact(&self, name: &str, value: &ArtifactValue) -> Result<Artifact> {
        let name = ArtifactName::parse(name)?;
        self.replace_named_artifact(name, value).await
    }

    async fn replace_named_artifact(
        &self,
        name: ArtifactName,
        value: &ArtifactValue,
    ) -> Result<Artifact> {
        let existing = self.storage.get_artifact(&name).await?;

        let mut artifact = Artifact::from_value(name, value);
        artifact.create_time = existing.create_time;
        // Same payload: the record stays observably identical
        if artifact.hash == existing.hash && artifact.value_type == existing.value_type {
            artifact.update_time = existing.update_time;
        }
        self.persist_artifact(&artifact).await?;
        self.notify(NotificationKind::Updated, &artifact.name);
        Ok(artifact.basic())
    }

    pub async fn delete_artifact(&self, name: &str) -> Result<()> {
        let name = ArtifactName::parse(name)?;
        self.delete_named_artifact(&name).await
    }

    async fn delete_named_artifact(&self, name: &ArtifactName) -> Result<()> {
        self.storage.get_artifact(name).await?;
        self.storage.delete_artifact(name).await?;
        self.notify(NotificationKind::Deleted, name);
        Ok(())
    }

    /// Replace the artifact when it exists, otherwise create it
    pub async fn set_artifact(&self, name: &ArtifactName, value: &ArtifactValue) -> Result<Artifact> {
        match self.storage.get_artifact(name).await {
            Ok(_) => self.replace_named_artifact(name.clone(), value).await,
            Err(e) if e.is_not_found() => self.create_named_artifact(name.clone(), value).await,
            Err(e) => Err(e),
        }
    }

    /// Delete every artifact directly owned by `parent`
    pub(super) async fn delete_artifacts_of(&self, parent: &ArtifactParent) -> Result<()> {
        let storage = &self.storage;
        let children = collect_pages(|options| async move {
            storage.list_artifacts(parent, &options).await
        })
        .await?;
        for artifact in children {
            debug!("Deleting child artifact {}", artifact.name);
            self.delete_named_artifact(&artifact.name).await?;
        }
        Ok(())
    }

    pub(super) async fn has_artifacts(&self, parent: &ArtifactParent) -> Result<bool> {
        let page = self
            .storage
            .list_artifacts(parent, &crate::pagination::PageOptions::first(1))
            .await?;
        Ok(!page.items.is_empty())
    }

    async fn require_artifact_parent(&self, parent: &ArtifactParent) -> Result<()> {
        match parent {
            ArtifactParent::Project(p) => self.storage.get_project(p).await.map(|_| ()),
            ArtifactParent::Api(a) => self.storage.get_api(a).await.map(|_| ()),
            ArtifactParent::Version(v) => self.storage.get_version(v).await.map(|_| ()),
            ArtifactParent::Spec(s) => self.storage.get_spec(s).await.map(|_| ()),
        }
    }

    async fn persist_artifact(&self, artifact: &Artifact) -> Result<()> {
        self.storage.save_artifact(artifact).await?;
        let contents = artifact.contents.as_deref().unwrap_or_default();
        self.storage
            .save_artifact_contents(&artifact.name, contents)
            .await
    }

    async fn artifact_view(&self, mut artifact: Artifact, view: View) -> Result<Artifact> {
        match view {
            View::Basic => Ok(artifact.basic()),
            View::Full => {
                let contents = self.storage.get_artifact_contents(&artifact.name).await?;
                artifact.contents = Some(contents);
                Ok(artifact)
            }
        }
    }
}
