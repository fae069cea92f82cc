//! Hierarchical resource names
//!
//! Every registry resource is addressed by a slash-separated name built from
//! `collection/id` pairs:
//!
//! ```text
//! projects/{project}
//! projects/{project}/apis/{api}
//! projects/{project}/apis/{api}/versions/{version}
//! projects/{project}/apis/{api}/versions/{version}/specs/{spec}
//! {project|api|version|spec}/artifacts/{artifact}
//! ```
//!
//! Parsing is pure: a raw string either yields an immutable name or an
//! `InvalidArgument` error. Parsing only checks syntax. Whether the named
//! resource (or its parent) exists is a separate question answered by storage.
//!
//! Patterns are names whose ids may be the wildcard `-`, meaning "every id in
//! this collection". Only the `parse_pattern` constructors accept them.

use crate::error::{RegistryError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Collection wildcard accepted in patterns
pub const WILDCARD: &str = "-";

/// Identifier syntax shared by every level of the hierarchy
pub const IDENTIFIER_PATTERN: &str = r"^[A-Za-z0-9][A-Za-z0-9._@-]{0,62}$";

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(IDENTIFIER_PATTERN).expect("identifier pattern compiles"));

/// Generate a fresh resource id (128 random bits as 32 hex chars)
pub fn generate_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Check a single id segment
pub fn validate_id(kind: &str, id: &str) -> Result<()> {
    if IDENTIFIER.is_match(id) {
        Ok(())
    } else {
        Err(RegistryError::invalid(format!(
            "invalid {} id {:?}: must match {}",
            kind, id, IDENTIFIER_PATTERN
        )))
    }
}

fn check_segment(kind: &str, id: &str, allow_wildcard: bool) -> Result<()> {
    if allow_wildcard && id == WILDCARD {
        return Ok(());
    }
    validate_id(kind, id)
}

fn segment_matches(pattern: &str, id: &str) -> bool {
    pattern == WILDCARD || pattern == id
}

/// Split `raw` into ids, checking the collection keywords in order
fn parse_segments(
    raw: &str,
    kind: &str,
    collections: &[&str],
    allow_wildcard: bool,
) -> Result<Vec<String>> {
    let parts: Vec<&str> = raw.split('/').collect();
    if parts.len() != collections.len() * 2 {
        let template = collections
            .iter()
            .map(|c| format!("{}/{{id}}", c))
            .collect::<Vec<_>>()
            .join("/");
        return Err(RegistryError::invalid(format!(
            "invalid {} name {:?}: expected {}",
            kind, raw, template
        )));
    }

    let mut ids = Vec::with_capacity(collections.len());
    for (pair, collection) in parts.chunks(2).zip(collections) {
        if pair[0] != *collection {
            return Err(RegistryError::invalid(format!(
                "invalid {} name {:?}: expected collection {:?}, found {:?}",
                kind, raw, collection, pair[0]
            )));
        }
        check_segment(kind, pair[1], allow_wildcard)?;
        ids.push(pair[1].to_string());
    }
    Ok(ids)
}

const PROJECT_COLLECTIONS: &[&str] = &["projects"];
const API_COLLECTIONS: &[&str] = &["projects", "apis"];
const VERSION_COLLECTIONS: &[&str] = &["projects", "apis", "versions"];
const SPEC_COLLECTIONS: &[&str] = &["projects", "apis", "versions", "specs"];

/// Name of a project
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProjectName {
    pub project_id: String,
}

impl ProjectName {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
        }
    }

    pub fn parse(raw: &str) -> Result<Self> {
        Self::parse_with(raw, false)
    }

    pub fn parse_pattern(raw: &str) -> Result<Self> {
        Self::parse_with(raw, true)
    }

    fn parse_with(raw: &str, allow_wildcard: bool) -> Result<Self> {
        let mut ids = parse_segments(raw, "project", PROJECT_COLLECTIONS, allow_wildcard)?;
        Ok(Self {
            project_id: ids.remove(0),
        })
    }

    pub fn validate(&self) -> Result<()> {
        validate_id("project", &self.project_id)
    }

    pub fn api(&self, api_id: impl Into<String>) -> ApiName {
        ApiName {
            project_id: self.project_id.clone(),
            api_id: api_id.into(),
        }
    }

    pub fn artifact(&self, artifact_id: impl Into<String>) -> ArtifactName {
        ArtifactName::new(ArtifactParent::Project(self.clone()), artifact_id)
    }

    pub fn matches(&self, other: &ProjectName) -> bool {
        segment_matches(&self.project_id, &other.project_id)
    }
}

impl fmt::Display for ProjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "projects/{}", self.project_id)
    }
}

/// Name of an API within a project
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ApiName {
    pub project_id: String,
    pub api_id: String,
}

impl ApiName {
    pub fn parse(raw: &str) -> Result<Self> {
        Self::parse_with(raw, false)
    }

    pub fn parse_pattern(raw: &str) -> Result<Self> {
        Self::parse_with(raw, true)
    }

    fn parse_with(raw: &str, allow_wildcard: bool) -> Result<Self> {
        let ids = parse_segments(raw, "api", API_COLLECTIONS, allow_wildcard)?;
        let [project_id, api_id]: [String; 2] = ids
            .try_into()
            .map_err(|_| RegistryError::internal("api name segment count"))?;
        Ok(Self { project_id, api_id })
    }

    pub fn validate(&self) -> Result<()> {
        self.project().validate()?;
        validate_id("api", &self.api_id)
    }

    pub fn project(&self) -> ProjectName {
        ProjectName::new(self.project_id.clone())
    }

    pub fn version(&self, version_id: impl Into<String>) -> VersionName {
        VersionName {
            project_id: self.project_id.clone(),
            api_id: self.api_id.clone(),
            version_id: version_id.into(),
        }
    }

    pub fn artifact(&self, artifact_id: impl Into<String>) -> ArtifactName {
        ArtifactName::new(ArtifactParent::Api(self.clone()), artifact_id)
    }

    pub fn matches(&self, other: &ApiName) -> bool {
        self.project().matches(&other.project()) && segment_matches(&self.api_id, &other.api_id)
    }
}

impl fmt::Display for ApiName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "projects/{}/apis/{}", self.project_id, self.api_id)
    }
}

/// Name of a version within an API
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VersionName {
    pub project_id: String,
    pub api_id: String,
    pub version_id: String,
}

impl VersionName {
    pub fn parse(raw: &str) -> Result<Self> {
        Self::parse_with(raw, false)
    }

    pub fn parse_pattern(raw: &str) -> Result<Self> {
        Self::parse_with(raw, true)
    }

    fn parse_with(raw: &str, allow_wildcard: bool) -> Result<Self> {
        let ids = parse_segments(raw, "version", VERSION_COLLECTIONS, allow_wildcard)?;
        let [project_id, api_id, version_id]: [String; 3] = ids
            .try_into()
            .map_err(|_| RegistryError::internal("version name segment count"))?;
        Ok(Self {
            project_id,
            api_id,
            version_id,
        })
    }

    pub fn validate(&self) -> Result<()> {
        self.api().validate()?;
        validate_id("version", &self.version_id)
    }

    pub fn api(&self) -> ApiName {
        ApiName {
            project_id: self.project_id.clone(),
            api_id: self.api_id.clone(),
        }
    }

    pub fn spec(&self, spec_id: impl Into<String>) -> SpecName {
        SpecName {
            project_id: self.project_id.clone(),
            api_id: self.api_id.clone(),
            version_id: self.version_id.clone(),
            spec_id: spec_id.into(),
        }
    }

    pub fn artifact(&self, artifact_id: impl Into<String>) -> ArtifactName {
        ArtifactName::new(ArtifactParent::Version(self.clone()), artifact_id)
    }

    pub fn matches(&self, other: &VersionName) -> bool {
        self.api().matches(&other.api()) && segment_matches(&self.version_id, &other.version_id)
    }
}

impl fmt::Display for VersionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "projects/{}/apis/{}/versions/{}",
            self.project_id, self.api_id, self.version_id
        )
    }
}

/// Name of a spec within a version
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SpecName {
    pub project_id: String,
    pub api_id: String,
    pub version_id: String,
    pub spec_id: String,
}

impl SpecName {
    pub fn parse(raw: &str) -> Result<Self> {
        Self::parse_with(raw, false)
    }

    pub fn parse_pattern(raw: &str) -> Result<Self> {
        Self::parse_with(raw, true)
    }

    fn parse_with(raw: &str, allow_wildcard: bool) -> Result<Self> {
        let ids = parse_segments(raw, "spec", SPEC_COLLECTIONS, allow_wildcard)?;
        let [project_id, api_id, version_id, spec_id]: [String; 4] = ids
            .try_into()
            .map_err(|_| RegistryError::internal("spec name segment count"))?;
        Ok(Self {
            project_id,
            api_id,
            version_id,
            spec_id,
        })
    }

    pub fn validate(&self) -> Result<()> {
        self.version().validate()?;
        validate_id("spec", &self.spec_id)
    }

    pub fn version(&self) -> VersionName {
        VersionName {
            project_id: self.project_id.clone(),
            api_id: self.api_id.clone(),
            version_id: self.version_id.clone(),
        }
    }

    pub fn artifact(&self, artifact_id: impl Into<String>) -> ArtifactName {
        ArtifactName::new(ArtifactParent::Spec(self.clone()), artifact_id)
    }

    pub fn matches(&self, other: &SpecName) -> bool {
        self.version().matches(&other.version()) && segment_matches(&self.spec_id, &other.spec_id)
    }

    /// True if any segment is the wildcard
    pub fn is_pattern(&self) -> bool {
        [
            &self.project_id,
            &self.api_id,
            &self.version_id,
            &self.spec_id,
        ]
        .iter()
        .any(|id| id.as_str() == WILDCARD)
    }
}

impl fmt::Display for SpecName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "projects/{}/apis/{}/versions/{}/specs/{}",
            self.project_id, self.api_id, self.version_id, self.spec_id
        )
    }
}

/// Any resource that can own artifacts
///
/// Resolved once at parse time so callers dispatch on the variant instead of
/// re-parsing the parent string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ArtifactParent {
    Project(ProjectName),
    Api(ApiName),
    Version(VersionName),
    Spec(SpecName),
}

impl ArtifactParent {
    /// Parse an artifact parent, picking the kind from the segment count
    pub fn parse(raw: &str) -> Result<Self> {
        Self::parse_with(raw, false)
    }

    pub fn parse_pattern(raw: &str) -> Result<Self> {
        Self::parse_with(raw, true)
    }

    fn parse_with(raw: &str, allow_wildcard: bool) -> Result<Self> {
        match raw.split('/').count() {
            2 => Ok(Self::Project(ProjectName::parse_with(raw, allow_wildcard)?)),
            4 => Ok(Self::Api(ApiName::parse_with(raw, allow_wildcard)?)),
            6 => Ok(Self::Version(VersionName::parse_with(raw, allow_wildcard)?)),
            8 => Ok(Self::Spec(SpecName::parse_with(raw, allow_wildcard)?)),
            _ => Err(RegistryError::invalid(format!(
                "invalid artifact parent {:?}",
                raw
            ))),
        }
    }

    /// True when `other` is at the same level and every id matches
    pub fn matches(&self, other: &ArtifactParent) -> bool {
        match (self, other) {
            (Self::Project(p), Self::Project(o)) => p.matches(o),
            (Self::Api(p), Self::Api(o)) => p.matches(o),
            (Self::Version(p), Self::Version(o)) => p.matches(o),
            (Self::Spec(p), Self::Spec(o)) => p.matches(o),
            _ => false,
        }
    }

    /// Build the name of an artifact owned by this parent
    pub fn artifact(&self, artifact_id: impl Into<String>) -> ArtifactName {
        ArtifactName::new(self.clone(), artifact_id)
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Project(p) => p.validate(),
            Self::Api(a) => a.validate(),
            Self::Version(v) => v.validate(),
            Self::Spec(s) => s.validate(),
        }
    }

    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::Project(_) => ResourceKind::Project,
            Self::Api(_) => ResourceKind::Api,
            Self::Version(_) => ResourceKind::Version,
            Self::Spec(_) => ResourceKind::Spec,
        }
    }
}

impl fmt::Display for ArtifactParent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Project(p) => p.fmt(f),
            Self::Api(a) => a.fmt(f),
            Self::Version(v) => v.fmt(f),
            Self::Spec(s) => s.fmt(f),
        }
    }
}

/// Name of an artifact attached to a parent resource
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ArtifactName {
    parent: ArtifactParent,
    artifact_id: String,
}

impl ArtifactName {
    pub fn new(parent: ArtifactParent, artifact_id: impl Into<String>) -> Self {
        Self {
            parent,
            artifact_id: artifact_id.into(),
        }
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let invalid = || {
            RegistryError::invalid(format!(
                "invalid artifact name {:?}: expected {{parent}}/artifacts/{{id}}",
                raw
            ))
        };
        let (parent, id) = raw.rsplit_once("/artifacts/").ok_or_else(invalid)?;
        if id.contains('/') {
            return Err(invalid());
        }
        validate_id("artifact", id)?;
        Ok(Self::new(ArtifactParent::parse(parent)?, id))
    }

    pub fn validate(&self) -> Result<()> {
        self.parent.validate()?;
        validate_id("artifact", &self.artifact_id)
    }

    pub fn parent(&self) -> &ArtifactParent {
        &self.parent
    }

    pub fn artifact_id(&self) -> &str {
        &self.artifact_id
    }
}

impl fmt::Display for ArtifactName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/artifacts/{}", self.parent, self.artifact_id)
    }
}

// Names travel as their string form
macro_rules! string_serde {
    ($($ty:ident),*) => {$(
        impl TryFrom<String> for $ty {
            type Error = RegistryError;

            fn try_from(raw: String) -> Result<Self> {
                $ty::parse(&raw)
            }
        }

        impl From<$ty> for String {
            fn from(name: $ty) -> String {
                name.to_string()
            }
        }
    )*};
}

string_serde!(ProjectName, ApiName, VersionName, SpecName, ArtifactName);

/// Level of the resource hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Project,
    Api,
    Version,
    Spec,
    Artifact,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResourceKind::Project => "project",
            ResourceKind::Api => "api",
            ResourceKind::Version => "version",
            ResourceKind::Spec => "spec",
            ResourceKind::Artifact => "artifact",
        };
        f.write_str(s)
    }
}

/// A parsed name of any kind
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResourceName {
    Project(ProjectName),
    Api(ApiName),
    Version(VersionName),
    Spec(SpecName),
    Artifact(ArtifactName),
}

impl ResourceName {
    /// Parse `raw` as a name of the expected kind
    pub fn parse(raw: &str, expected: ResourceKind) -> Result<Self> {
        Ok(match expected {
            ResourceKind::Project => Self::Project(ProjectName::parse(raw)?),
            ResourceKind::Api => Self::Api(ApiName::parse(raw)?),
            ResourceKind::Version => Self::Version(VersionName::parse(raw)?),
            ResourceKind::Spec => Self::Spec(SpecName::parse(raw)?),
            ResourceKind::Artifact => Self::Artifact(ArtifactName::parse(raw)?),
        })
    }

    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::Project(_) => ResourceKind::Project,
            Self::Api(_) => ResourceKind::Api,
            Self::Version(_) => ResourceKind::Version,
            Self::Spec(_) => ResourceKind::Spec,
            Self::Artifact(_) => ResourceKind::Artifact,
        }
    }

    /// Immediate ancestor; projects are roots and have none
    pub fn parent(&self) -> Result<ResourceName> {
        match self {
            Self::Project(p) => Err(RegistryError::invalid(format!(
                "{} is a root resource and has no parent",
                p
            ))),
            Self::Api(a) => Ok(Self::Project(a.project())),
            Self::Version(v) => Ok(Self::Api(v.api())),
            Self::Spec(s) => Ok(Self::Version(s.version())),
            Self::Artifact(a) => Ok(match a.parent().clone() {
                ArtifactParent::Project(p) => Self::Project(p),
                ArtifactParent::Api(a) => Self::Api(a),
                ArtifactParent::Version(v) => Self::Version(v),
                ArtifactParent::Spec(s) => Self::Spec(s),
            }),
        }
    }

    /// Child of the next level down, with a generated id when none is given
    ///
    /// Specs have artifacts as children; artifacts have no children.
    pub fn child(&self, id: Option<&str>) -> Result<ResourceName> {
        let id = match id {
            Some(id) => {
                validate_id("child", id)?;
                id.to_string()
            }
            None => generate_id(),
        };
        match self {
            Self::Project(p) => Ok(Self::Api(p.api(id))),
            Self::Api(a) => Ok(Self::Version(a.version(id))),
            Self::Version(v) => Ok(Self::Spec(v.spec(id))),
            Self::Spec(s) => Ok(Self::Artifact(s.artifact(id))),
            Self::Artifact(a) => Err(RegistryError::invalid(format!(
                "{} is a leaf resource and has no children",
                a
            ))),
        }
    }
}

impl fmt::Display for ResourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Project(n) => n.fmt(f),
            Self::Api(n) => n.fmt(f),
            Self::Version(n) => n.fmt(f),
            Self::Spec(n) => n.fmt(f),
            Self::Artifact(n) => n.fmt(f),
        }
    }
}
