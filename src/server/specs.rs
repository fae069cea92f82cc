use super::{ListRequest, RegistryServer};
use crate::error::{RegistryError, Result};
use crate::names::{generate_id, ArtifactParent, SpecName, VersionName};
use crate::notify::NotificationKind;
use crate::pagination::Page;
use crate::types::{sha256_hex, Spec, View};
use chrono::Utc;

/// Caller-supplied fields of a spec
///
/// On update, `contents: None` keeps the stored bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpecBody {
    pub filename: String,
    pub description: String,
    pub style: String,
    pub contents: Option<Vec<u8>>,
}

impl RegistryServer {
    /// Create a spec under an existing version
    pub async fn create_spec(
        &self,
        parent: &str,
        spec_id: Option<&str>,
        body: &SpecBody,
    ) -> Result<Spec> {
        let parent = VersionName::parse(parent)?;
        let id = match spec_id {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => generate_id(),
        };
        let name = parent.spec(id);
        name.validate()?;

        match self.storage.get_spec(&name).await {
            Ok(_) => {
                return Err(RegistryError::AlreadyExists(format!(
                    "spec {} already exists",
                    name
                )))
            }
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }
        self.storage.get_version(&parent).await?;

        let mut spec = Spec::new(name, body.style.clone())
            .with_contents(body.contents.clone().unwrap_or_default());
        spec.filename = body.filename.clone();
        spec.description = body.description.clone();

        self.storage.save_spec(&spec).await?;
        let contents = spec.contents.take().unwrap_or_default();
        self.storage.save_spec_contents(&spec.name, &contents).await?;
        self.notify(NotificationKind::Created, &spec.name);
        Ok(spec)
    }

    pub async fn get_spec(&self, name: &str, view: View) -> Result<Spec> {
        let name = SpecName::parse(name)?;
        let spec = self.storage.get_spec(&name).await?;
        self.spec_view(spec, view).await
    }

    /// List specs of a version; the parent may contain wildcards
    pub async fn list_specs(&self, parent: &str, request: &ListRequest) -> Result<Page<Spec>> {
        let parent = VersionName::parse_pattern(parent)?;
        let page = self.storage.list_specs(&parent, &request.options()?).await?;

        let mut items = Vec::with_capacity(page.items.len());
        for spec in page.items {
            items.push(self.spec_view(spec, request.view).await?);
        }
        Ok(Page {
            items,
            next_page_token: page.next_page_token,
        })
    }

    /// Update an existing spec in place
    pub async fn update_spec(&self, name: &str, body: &SpecBody) -> Result<Spec> {
        let name = SpecName::parse(name)?;
        let mut spec = self.storage.get_spec(&name).await?;

        spec.filename = body.filename.clone();
        spec.description = body.description.clone();
        if !body.style.is_empty() {
            spec.style = body.style.clone();
        }
        if let Some(contents) = &body.contents {
            spec.size_bytes = contents.len() as i64;
            spec.hash = sha256_hex(contents);
        }
        spec.update_time = Utc::now();

        self.storage.save_spec(&spec).await?;
        if let Some(contents) = &body.contents {
            self.storage.save_spec_contents(&name, contents).await?;
        }
        self.notify(NotificationKind::Updated, &name);
        Ok(spec)
    }

    /// Delete a spec after removing its artifacts
    pub async fn delete_spec(&self, name: &str) -> Result<()> {
        let name = SpecName::parse(name)?;
        self.storage.get_spec(&name).await?;
        self.delete_spec_tree(&name).await
    }

    pub(super) async fn delete_spec_tree(&self, name: &SpecName) -> Result<()> {
        self.delete_artifacts_of(&ArtifactParent::Spec(name.clone()))
            .await?;
        self.storage.delete_spec(name).await?;
        self.notify(NotificationKind::Deleted, name);
        Ok(())
    }

    async fn spec_view(&self, mut spec: Spec, view: View) -> Result<Spec> {
        match view {
            View::Basic => Ok(spec.basic()),
            View::Full => {
                spec.contents = Some(self.storage.get_spec_contents(&spec.name).await?);
                Ok(spec)
            }
        }
    }
}
