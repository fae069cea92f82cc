//! Type conversions between Protobuf and internal types

use crate::rpc::generated;
use crate::server::{ListRequest, SpecBody};
use crate::types::{
    Api as InternalApi, Artifact as InternalArtifact, ArtifactValue, Project as InternalProject,
    Spec as InternalSpec, Version as InternalVersion, View,
};
use chrono::{DateTime, Utc};
use tonic::Status;

fn timestamp(time: DateTime<Utc>) -> prost_types::Timestamp {
    prost_types::Timestamp {
        seconds: time.timestamp(),
        nanos: time.timestamp_subsec_nanos() as i32,
    }
}

/// Convert Protobuf list options to a list request
pub fn list_request_from_proto(options: Option<generated::ListOptions>) -> Result<ListRequest, Status> {
    let options = options.unwrap_or_default();
    Ok(ListRequest {
        page_size: options.page_size,
        page_token: options.page_token,
        filter: options.filter,
        view: View::from_i32(options.view)?,
    })
}

fn container_to_proto(
    name: String,
    display_name: String,
    description: String,
    create_time: DateTime<Utc>,
    update_time: DateTime<Utc>,
) -> Option<generated::Container> {
    Some(generated::Container {
        name,
        display_name,
        description,
        create_time: Some(timestamp(create_time)),
        update_time: Some(timestamp(update_time)),
    })
}

pub fn project_to_proto(project: InternalProject) -> generated::Project {
    generated::Project {
        container: container_to_proto(
            project.name.to_string(),
            project.display_name,
            project.description,
            project.create_time,
            project.update_time,
        ),
    }
}

pub fn api_to_proto(api: InternalApi) -> generated::Api {
    generated::Api {
        container: container_to_proto(
            api.name.to_string(),
            api.display_name,
            api.description,
            api.create_time,
            api.update_time,
        ),
    }
}

pub fn version_to_proto(version: InternalVersion) -> generated::Version {
    generated::Version {
        container: container_to_proto(
            version.name.to_string(),
            version.display_name,
            version.description,
            version.create_time,
            version.update_time,
        ),
    }
}

pub fn spec_to_proto(spec: InternalSpec) -> generated::Spec {
    generated::Spec {
        name: spec.name.to_string(),
        filename: spec.filename,
        description: spec.description,
        style: spec.style,
        size_bytes: spec.size_bytes,
        hash: spec.hash,
        create_time: Some(timestamp(spec.create_time)),
        update_time: Some(timestamp(spec.update_time)),
        contents: spec.contents.unwrap_or_default(),
    }
}

/// Caller-settable spec fields; `keep_contents` leaves stored bytes alone
pub fn spec_body_from_proto(spec: generated::Spec, keep_contents: bool) -> SpecBody {
    SpecBody {
        filename: spec.filename,
        description: spec.description,
        style: spec.style,
        contents: if keep_contents {
            None
        } else {
            Some(spec.contents)
        },
    }
}

pub fn artifact_to_proto(artifact: InternalArtifact) -> generated::Artifact {
    generated::Artifact {
        name: artifact.name.to_string(),
        value_type: artifact.value_type,
        size_bytes: artifact.size_bytes,
        hash: artifact.hash,
        create_time: Some(timestamp(artifact.create_time)),
        update_time: Some(timestamp(artifact.update_time)),
        contents: artifact.contents.unwrap_or_default(),
    }
}

/// Typed value carried by a Protobuf artifact
pub fn artifact_value_from_proto(artifact: &generated::Artifact) -> Result<ArtifactValue, Status> {
    let value_type = if artifact.value_type.is_empty() {
        "string"
    } else {
        artifact.value_type.as_str()
    };
    ArtifactValue::decode(value_type, &artifact.contents)
        .map_err(|e| Status::invalid_argument(e.to_string()))
}
