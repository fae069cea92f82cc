//! Common test utilities and helpers

#![allow(dead_code)]

use registry_core::{
    ContainerBody, MemoryStorage, RecordingNotifier, RegistryServer, Spec, SpecBody,
};
use std::sync::Arc;

/// Registry over fresh in-memory storage, with handles to both collaborators
pub struct TestRegistry {
    pub server: RegistryServer,
    pub storage: Arc<MemoryStorage>,
    pub notifier: Arc<RecordingNotifier>,
}

pub fn create_test_registry() -> TestRegistry {
    let storage = Arc::new(MemoryStorage::new());
    let notifier = Arc::new(RecordingNotifier::new());
    let server = RegistryServer::new(storage.clone(), notifier.clone());
    TestRegistry {
        server,
        storage,
        notifier,
    }
}

/// Create `projects/{p}/apis/{a}/versions/{v}` and any missing ancestors
pub async fn seed_version(server: &RegistryServer, project: &str, api: &str, version: &str) {
    let body = ContainerBody::default();
    let project_name = format!("projects/{}", project);
    if server.get_project(&project_name).await.is_err() {
        server
            .create_project(Some(project), &body)
            .await
            .expect("create project");
    }
    let api_name = format!("{}/apis/{}", project_name, api);
    if server.get_api(&api_name).await.is_err() {
        server
            .create_api(&project_name, Some(api), &body)
            .await
            .expect("create api");
    }
    server
        .create_version(&api_name, Some(version), &body)
        .await
        .expect("create version");
}

/// Create a spec with the given style and contents under an existing version
pub async fn seed_spec(
    server: &RegistryServer,
    version: &str,
    spec_id: &str,
    style: &str,
    contents: &[u8],
) -> Spec {
    server
        .create_spec(
            version,
            Some(spec_id),
            &SpecBody {
                filename: format!("{}.json", spec_id),
                style: style.to_string(),
                contents: Some(contents.to_vec()),
                ..SpecBody::default()
            },
        )
        .await
        .expect("create spec")
}

pub const DISCOVERY_DOC: &str = r#"{
  "discoveryVersion": "v1",
  "name": "library",
  "schemas": {"Book": {"properties": {"name": {}, "author": {}}}},
  "resources": {"books": {"methods": {"get": {"id": "library.books.get", "parameters": {"name": {}}}}}}
}"#;

pub const OPENAPI_V3_DOC: &str = r#"
openapi: 3.0.0
info:
  title: Library
  version: 1.0.0
paths:
  /shelves:
    get:
      operationId: listShelves
      parameters:
        - name: pageSize
          in: query
components:
  schemas:
    Shelf:
      properties:
        name:
          type: string
"#;
