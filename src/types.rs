//! Core records stored in the registry
//!
//! Metadata records never carry content bytes at rest. Spec and artifact
//! contents live in a separate blob space and are attached to a record only
//! when a caller asks for the FULL view.

use crate::error::{RegistryError, Result};
use crate::names::{ApiName, ArtifactName, ProjectName, SpecName, VersionName};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::str::FromStr;

/// Hex-encoded SHA-256 of `bytes`
pub fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// How much of a record to return
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum View {
    /// Metadata only
    #[default]
    Basic,
    /// Metadata plus content bytes
    Full,
}

impl View {
    /// Decode a wire enum value (0 = unspecified, 1 = BASIC, 2 = FULL)
    pub fn from_i32(value: i32) -> Result<Self> {
        match value {
            0 | 1 => Ok(View::Basic),
            2 => Ok(View::Full),
            other => Err(RegistryError::invalid(format!(
                "unknown view type {}",
                other
            ))),
        }
    }
}

impl FromStr for View {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "" | "basic" | "view_unspecified" => Ok(View::Basic),
            "full" => Ok(View::Full),
            other => Err(RegistryError::invalid(format!(
                "unknown view type {:?}",
                other
            ))),
        }
    }
}

/// Top-level container
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub name: ProjectName,
    pub display_name: String,
    pub description: String,
    pub create_time: DateTime<Utc>,
    pub update_time: DateTime<Utc>,
}

impl Project {
    pub fn new(name: ProjectName) -> Self {
        let now = Utc::now();
        Self {
            name,
            display_name: String::new(),
            description: String::new(),
            create_time: now,
            update_time: now,
        }
    }
}

/// An API within a project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Api {
    pub name: ApiName,
    pub display_name: String,
    pub description: String,
    pub create_time: DateTime<Utc>,
    pub update_time: DateTime<Utc>,
}

impl Api {
    pub fn new(name: ApiName) -> Self {
        let now = Utc::now();
        Self {
            name,
            display_name: String::new(),
            description: String::new(),
            create_time: now,
            update_time: now,
        }
    }
}

/// A version of an API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Version {
    pub name: VersionName,
    pub display_name: String,
    pub description: String,
    pub create_time: DateTime<Utc>,
    pub update_time: DateTime<Utc>,
}

impl Version {
    pub fn new(name: VersionName) -> Self {
        let now = Utc::now();
        Self {
            name,
            display_name: String::new(),
            description: String::new(),
            create_time: now,
            update_time: now,
        }
    }
}

/// An API description document and its format tag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spec {
    pub name: SpecName,
    pub filename: String,
    pub description: String,
    /// Format tag, e.g. `openapi/v3+gzip`, `discovery`, `proto+zip`
    pub style: String,
    pub size_bytes: i64,
    /// Hex SHA-256 of the contents
    pub hash: String,
    pub create_time: DateTime<Utc>,
    pub update_time: DateTime<Utc>,
    /// Present only in the FULL view
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contents: Option<Vec<u8>>,
}

impl Spec {
    pub fn new(name: SpecName, style: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            name,
            filename: String::new(),
            description: String::new(),
            style: style.into(),
            size_bytes: 0,
            hash: sha256_hex(&[]),
            create_time: now,
            update_time: now,
            contents: None,
        }
    }

    pub fn with_contents(mut self, contents: Vec<u8>) -> Self {
        self.size_bytes = contents.len() as i64;
        self.hash = sha256_hex(&contents);
        self.contents = Some(contents);
        self
    }

    /// Copy of the record without content bytes
    pub fn basic(&self) -> Self {
        Self {
            contents: None,
            ..self.clone()
        }
    }
}

/// Typed value carried by an artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum ArtifactValue {
    String { value: String },
    Int64 { value: i64 },
    Double { value: f64 },
    Bool { value: bool },
    /// Serialized message tagged with its type identifier
    Message { type_url: String, value: Vec<u8> },
}

impl ArtifactValue {
    pub fn message(type_url: impl Into<String>, value: Vec<u8>) -> Self {
        ArtifactValue::Message {
            type_url: type_url.into(),
            value,
        }
    }

    /// Type tag recorded in artifact metadata
    pub fn type_tag(&self) -> &str {
        match self {
            ArtifactValue::String { .. } => "string",
            ArtifactValue::Int64 { .. } => "int64",
            ArtifactValue::Double { .. } => "double",
            ArtifactValue::Bool { .. } => "bool",
            ArtifactValue::Message { type_url, .. } => type_url,
        }
    }

    /// Content bytes stored for this value
    pub fn encode(&self) -> Vec<u8> {
        match self {
            ArtifactValue::String { value } => value.as_bytes().to_vec(),
            ArtifactValue::Int64 { value } => value.to_string().into_bytes(),
            ArtifactValue::Double { value } => value.to_string().into_bytes(),
            ArtifactValue::Bool { value } => value.to_string().into_bytes(),
            ArtifactValue::Message { value, .. } => value.clone(),
        }
    }

    /// Rebuild a value from its type tag and content bytes
    pub fn decode(type_tag: &str, bytes: &[u8]) -> Result<Self> {
        let text = || {
            std::str::from_utf8(bytes)
                .map_err(|e| RegistryError::internal(format!("{} value is not utf-8: {}", type_tag, e)))
        };
        let bad = |e: &dyn std::fmt::Display| {
            RegistryError::internal(format!("malformed {} value: {}", type_tag, e))
        };
        Ok(match type_tag {
            "string" => ArtifactValue::String {
                value: text()?.to_string(),
            },
            "int64" => ArtifactValue::Int64 {
                value: text()?.parse().map_err(|e| bad(&e))?,
            },
            "double" => ArtifactValue::Double {
                value: text()?.parse().map_err(|e| bad(&e))?,
            },
            "bool" => ArtifactValue::Bool {
                value: text()?.parse().map_err(|e| bad(&e))?,
            },
            type_url => ArtifactValue::message(type_url, bytes.to_vec()),
        })
    }
}

/// A key/value annotation attached to one parent resource
///
/// The parent is the artifact's subject and the artifact id is its relation,
/// so `(subject, relation)` is unique by construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    pub name: ArtifactName,
    /// Type tag of the value held in the contents
    pub value_type: String,
    pub size_bytes: i64,
    pub hash: String,
    pub create_time: DateTime<Utc>,
    pub update_time: DateTime<Utc>,
    /// Present only in the FULL view
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contents: Option<Vec<u8>>,
}

impl Artifact {
    /// Build a record and its contents from a typed value
    pub fn from_value(name: ArtifactName, value: &ArtifactValue) -> Self {
        let contents = value.encode();
        let now = Utc::now();
        Self {
            name,
            value_type: value.type_tag().to_string(),
            size_bytes: contents.len() as i64,
            hash: sha256_hex(&contents),
            create_time: now,
            update_time: now,
            contents: Some(contents),
        }
    }

    /// Resource this artifact annotates
    pub fn subject(&self) -> String {
        self.name.parent().to_string()
    }

    /// Named aspect of the subject
    pub fn relation(&self) -> &str {
        self.name.artifact_id()
    }

    /// `subject/properties/relation` rendering used in logs
    pub fn property_name(&self) -> String {
        format!("{}/properties/{}", self.subject(), self.relation())
    }

    /// Decode the typed value; requires the FULL view
    pub fn value(&self) -> Result<ArtifactValue> {
        let contents = self.contents.as_ref().ok_or_else(|| {
            RegistryError::invalid(format!("{} was fetched without contents", self.name))
        })?;
        ArtifactValue::decode(&self.value_type, contents)
    }

    /// Copy of the record without content bytes
    pub fn basic(&self) -> Self {
        Self {
            contents: None,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec_name() -> SpecName {
        ProjectName::new("demo").api("a").version("v1").spec("s")
    }

    #[test]
    fn test_view_decoding() {
        assert_eq!(View::from_i32(0).unwrap(), View::Basic);
        assert_eq!(View::from_i32(2).unwrap(), View::Full);
        assert!(View::from_i32(7).is_err());
        assert_eq!("FULL".parse::<View>().unwrap(), View::Full);
        assert!("everything".parse::<View>().is_err());
    }

    #[test]
    fn test_spec_contents_metadata() {
        let spec = Spec::new(spec_name(), "openapi/v3").with_contents(b"openapi: 3.0.0".to_vec());
        assert_eq!(spec.size_bytes, 14);
        assert_eq!(spec.hash.len(), 64);
        assert!(spec.basic().contents.is_none());
        assert_eq!(spec.basic().hash, spec.hash);
    }

    #[test]
    fn test_artifact_subject_and_relation() {
        let name = spec_name().artifact("vocabulary");
        let artifact = Artifact::from_value(name, &ArtifactValue::Int64 { value: 42 });
        assert_eq!(artifact.subject(), "projects/demo/apis/a/versions/v1/specs/s");
        assert_eq!(artifact.relation(), "vocabulary");
        assert_eq!(
            artifact.property_name(),
            "projects/demo/apis/a/versions/v1/specs/s/properties/vocabulary"
        );
        assert_eq!(artifact.value().unwrap(), ArtifactValue::Int64 { value: 42 });
    }

    #[test]
    fn test_message_value_keeps_type_tag() {
        let value = ArtifactValue::message("gnostic.metrics.Vocabulary", vec![1, 2, 3]);
        let artifact = Artifact::from_value(spec_name().artifact("vocabulary"), &value);
        assert_eq!(artifact.value_type, "gnostic.metrics.Vocabulary");
        assert_eq!(artifact.value().unwrap(), value);
        assert!(artifact.basic().value().is_err());
    }

    #[test]
    fn test_decode_rejects_malformed_scalars() {
        assert!(ArtifactValue::decode("int64", b"forty-two").is_err());
        assert!(ArtifactValue::decode("bool", &[0xff]).is_err());
    }
}
