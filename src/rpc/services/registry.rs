//! Registry service implementation

use crate::rpc::conversions::*;
use crate::rpc::generated::registry_server::Registry;
use crate::rpc::generated::*;
use crate::server::{ContainerBody, RegistryServer};
use crate::types::View as InternalView;
use tonic::{Request, Response, Status};
use tracing::debug;

fn optional_id(id: &str) -> Option<&str> {
    (!id.is_empty()).then_some(id)
}

fn container_body(display_name: String, description: String) -> ContainerBody {
    ContainerBody {
        display_name,
        description,
    }
}

pub struct RegistryServiceImpl {
    registry: RegistryServer,
}

impl RegistryServiceImpl {
    pub fn new(registry: RegistryServer) -> Self {
        Self { registry }
    }
}

#[tonic::async_trait]
impl Registry for RegistryServiceImpl {
    async fn create_project(
        &self,
        request: Request<CreateProjectRequest>,
    ) -> Result<Response<Project>, Status> {
        let req = request.into_inner();
        let project = self
            .registry
            .create_project(
                optional_id(&req.project_id),
                &container_body(req.display_name, req.description),
            )
            .await?;
        Ok(Response::new(project_to_proto(project)))
    }

    async fn get_project(
        &self,
        request: Request<GetProjectRequest>,
    ) -> Result<Response<Project>, Status> {
        let project = self.registry.get_project(&request.into_inner().name).await?;
        Ok(Response::new(project_to_proto(project)))
    }

    async fn list_projects(
        &self,
        request: Request<ListProjectsRequest>,
    ) -> Result<Response<ListProjectsResponse>, Status> {
        let list = list_request_from_proto(request.into_inner().options)?;
        let page = self.registry.list_projects(&list).await?;
        Ok(Response::new(ListProjectsResponse {
            projects: page.items.into_iter().map(project_to_proto).collect(),
            next_page_token: page.next_page_token,
        }))
    }

    async fn delete_project(
        &self,
        request: Request<DeleteProjectRequest>,
    ) -> Result<Response<()>, Status> {
        let req = request.into_inner();
        self.registry.delete_project(&req.name, req.force).await?;
        Ok(Response::new(()))
    }

    async fn create_api(&self, request: Request<CreateApiRequest>) -> Result<Response<Api>, Status> {
        let req = request.into_inner();
        let api = self
            .registry
            .create_api(
                &req.parent,
                optional_id(&req.api_id),
                &container_body(req.display_name, req.description),
            )
            .await?;
        Ok(Response::new(api_to_proto(api)))
    }

    async fn get_api(&self, request: Request<GetApiRequest>) -> Result<Response<Api>, Status> {
        let api = self.registry.get_api(&request.into_inner().name).await?;
        Ok(Response::new(api_to_proto(api)))
    }

    async fn list_apis(
        &self,
        request: Request<ListApisRequest>,
    ) -> Result<Response<ListApisResponse>, Status> {
        let req = request.into_inner();
        let list = list_request_from_proto(req.options)?;
        let page = self.registry.list_apis(&req.parent, &list).await?;
        Ok(Response::new(ListApisResponse {
            apis: page.items.into_iter().map(api_to_proto).collect(),
            next_page_token: page.next_page_token,
        }))
    }

    async fn delete_api(&self, request: Request<DeleteApiRequest>) -> Result<Response<()>, Status> {
        let req = request.into_inner();
        self.registry.delete_api(&req.name, req.force).await?;
        Ok(Response::new(()))
    }

    async fn create_version(
        &self,
        request: Request<CreateVersionRequest>,
    ) -> Result<Response<Version>, Status> {
        let req = request.into_inner();
        let version = self
            .registry
            .create_version(
                &req.parent,
                optional_id(&req.version_id),
                &container_body(req.display_name, req.description),
            )
            .await?;
        Ok(Response::new(version_to_proto(version)))
    }

    async fn get_version(
        &self,
        request: Request<GetVersionRequest>,
    ) -> Result<Response<Version>, Status> {
        let version = self.registry.get_version(&request.into_inner().name).await?;
        Ok(Response::new(version_to_proto(version)))
    }

    async fn list_versions(
        &self,
        request: Request<ListVersionsRequest>,
    ) -> Result<Response<ListVersionsResponse>, Status> {
        let req = request.into_inner();
        let list = list_request_from_proto(req.options)?;
        let page = self.registry.list_versions(&req.parent, &list).await?;
        Ok(Response::new(ListVersionsResponse {
            versions: page.items.into_iter().map(version_to_proto).collect(),
            next_page_token: page.next_page_token,
        }))
    }

    async fn delete_version(
        &self,
        request: Request<DeleteVersionRequest>,
    ) -> Result<Response<()>, Status> {
        let req = request.into_inner();
        self.registry.delete_version(&req.name, req.force).await?;
        Ok(Response::new(()))
    }

    async fn create_spec(&self, request: Request<CreateSpecRequest>) -> Result<Response<Spec>, Status> {
        let req = request.into_inner();
        let spec = req
            .spec
            .ok_or_else(|| Status::invalid_argument("spec is required"))?;
        let created = self
            .registry
            .create_spec(
                &req.parent,
                optional_id(&req.spec_id),
                &spec_body_from_proto(spec, false),
            )
            .await?;
        Ok(Response::new(spec_to_proto(created)))
    }

    async fn get_spec(&self, request: Request<GetSpecRequest>) -> Result<Response<Spec>, Status> {
        let req = request.into_inner();
        let view = InternalView::from_i32(req.view)?;
        let spec = self.registry.get_spec(&req.name, view).await?;
        Ok(Response::new(spec_to_proto(spec)))
    }

    async fn list_specs(
        &self,
        request: Request<ListSpecsRequest>,
    ) -> Result<Response<ListSpecsResponse>, Status> {
        let req = request.into_inner();
        let list = list_request_from_proto(req.options)?;
        let page = self.registry.list_specs(&req.parent, &list).await?;
        Ok(Response::new(ListSpecsResponse {
            specs: page.items.into_iter().map(spec_to_proto).collect(),
            next_page_token: page.next_page_token,
        }))
    }

    async fn update_spec(&self, request: Request<UpdateSpecRequest>) -> Result<Response<Spec>, Status> {
        let req = request.into_inner();
        let spec = req
            .spec
            .ok_or_else(|| Status::invalid_argument("spec is required"))?;
        let name = spec.name.clone();
        let updated = self
            .registry
            .update_spec(&name, &spec_body_from_proto(spec, !req.replace_contents))
            .await?;
        Ok(Response::new(spec_to_proto(updated.basic())))
    }

    async fn delete_spec(&self, request: Request<DeleteSpecRequest>) -> Result<Response<()>, Status> {
        self.registry.delete_spec(&request.into_inner().name).await?;
        Ok(Response::new(()))
    }

    async fn create_artifact(
        &self,
        request: Request<CreateArtifactRequest>,
    ) -> Result<Response<Artifact>, Status> {
        let req = request.into_inner();
        let artifact = req
            .artifact
            .ok_or_else(|| Status::invalid_argument("artifact is required"))?;
        let value = artifact_value_from_proto(&artifact)?;
        let created = self
            .registry
            .create_artifact(&req.parent, optional_id(&req.artifact_id), &value)
            .await?;
        debug!("Created {} over gRPC", created.name);
        Ok(Response::new(artifact_to_proto(created)))
    }

    async fn get_artifact(
        &self,
        request: Request<GetArtifactRequest>,
    ) -> Result<Response<Artifact>, Status> {
        let req = request.into_inner();
        let view = InternalView::from_i32(req.view)?;
        let artifact = self.registry.get_artifact(&req.name, view).await?;
        Ok(Response::new(artifact_to_proto(artifact)))
    }

    async fn list_artifacts(
        &self,
        request: Request<ListArtifactsRequest>,
    ) -> Result<Response<ListArtifactsResponse>, Status> {
        let req = request.into_inner();
        let list = list_request_from_proto(req.options)?;
        let page = self.registry.list_artifacts(&req.parent, &list).await?;
        Ok(Response::new(ListArtifactsResponse {
            artifacts: page.items.into_iter().map(artifact_to_proto).collect(),
            next_page_token: page.next_page_token,
        }))
    }

    async fn replace_artifact(
        &self,
        request: Request<ReplaceArtifactRequest>,
    ) -> Result<Response<Artifact>, Status> {
        let artifact = request
            .into_inner()
            .artifact
            .ok_or_else(|| Status::invalid_argument("artifact is required"))?;
        let value = artifact_value_from_proto(&artifact)?;
        let replaced = self.registry.replace_artifact(&artifact.name, &value).await?;
        Ok(Response::new(artifact_to_proto(replaced)))
    }

    async fn delete_artifact(
        &self,
        request: Request<DeleteArtifactRequest>,
    ) -> Result<Response<()>, Status> {
        self.registry
            .delete_artifact(&request.into_inner().name)
            .await?;
        Ok(Response::new(()))
    }
}
