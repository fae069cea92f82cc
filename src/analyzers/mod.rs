//! Analyzer registry
//!
//! Maps a spec's style tag to the analyzer that understands its bytes.
//! Analyzers are stateless and shared between pipeline workers, so each one
//! must be safe to call concurrently on different inputs.
//!
//! Styles come in a short form (`openapi/v3`, `discovery+gzip`, `proto+zip`)
//! or as media types (`application/x.openapi+gzip;version=3.0.0`); both are
//! matched through [`canonical_style`].

pub mod discovery;
pub mod openapi;
pub mod protos;
pub mod vocabulary;

pub use vocabulary::{
    Vocabulary, VocabularyBuilder, WordCount, VOCABULARY_RELATION, VOCABULARY_TYPE,
};

use crate::error::{RegistryError, Result};
use flate2::read::GzDecoder;
use serde_json::Value;
use std::io::Read;
use std::sync::Arc;
use tracing::debug;

/// Largest document an analyzer reads once decompressed
pub const MAX_DOCUMENT_BYTES: u64 = 64 * 1024 * 1024;

const MEDIA_TYPE_PREFIX: &str = "application/x.";

/// Short form of a style tag
///
/// `application/x.openapi+gzip;version=3.0.0` becomes `openapi/v3+gzip` and
/// `application/x.protobuf+zip` becomes `proto+zip`. Short forms pass through.
pub fn canonical_style(style: &str) -> String {
    let Some(rest) = style.strip_prefix(MEDIA_TYPE_PREFIX) else {
        return style.to_string();
    };
    let (base, version) = match rest.split_once(';') {
        Some((base, params)) => (base, params.trim().strip_prefix("version=")),
        None => (rest, None),
    };
    let (format, suffix) = base.split_once('+').unwrap_or((base, ""));
    let format = match (format, version) {
        ("openapi", Some(version)) => {
            let major = version.split('.').next().unwrap_or(version);
            format!("openapi/v{}", major)
        }
        ("protobuf", _) => "proto".to_string(),
        (other, _) => other.to_string(),
    };
    if suffix.is_empty() {
        format
    } else {
        format!("{}+{}", format, suffix)
    }
}

/// Spec bytes as analyzers expect them; `+gzip` styles are inflated
pub fn decode_contents(style: &str, contents: Vec<u8>) -> Result<Vec<u8>> {
    if !canonical_style(style).ends_with("+gzip") {
        return Ok(contents);
    }
    read_bounded(GzDecoder::new(contents.as_slice()), MAX_DOCUMENT_BYTES, "gzip document")
}

/// Read at most `limit` bytes; anything longer is rejected
pub(crate) fn read_bounded(reader: impl Read, limit: u64, what: &str) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    reader
        .take(limit + 1)
        .read_to_end(&mut bytes)
        .map_err(|e| RegistryError::invalid(format!("cannot read {}: {}", what, e)))?;
    if bytes.len() as u64 > limit {
        return Err(RegistryError::invalid(format!(
            "{} expands beyond {} bytes",
            what, limit
        )));
    }
    Ok(bytes)
}

/// Derives a vocabulary from raw spec bytes
pub trait Analyzer: Send + Sync {
    /// Analyzer name (for logging)
    fn name(&self) -> &str;

    fn analyze(&self, contents: &[u8]) -> Result<Vocabulary>;
}

/// How a registered tag is compared with a spec's style
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StyleMatch {
    Prefix(String),
    Exact(String),
}

impl StyleMatch {
    fn matches(&self, style: &str) -> bool {
        match self {
            StyleMatch::Prefix(prefix) => style.starts_with(prefix.as_str()),
            StyleMatch::Exact(tag) => style == tag,
        }
    }
}

/// Analyzers in registration order; the first match wins
#[derive(Clone, Default)]
pub struct AnalyzerRegistry {
    entries: Vec<(StyleMatch, Arc<dyn Analyzer>)>,
}

impl AnalyzerRegistry {
    /// Create new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in vocabulary analyzers
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(
            StyleMatch::Prefix("openapi/v2".into()),
            Arc::new(openapi::OpenApiV2Analyzer),
        );
        registry.register(
            StyleMatch::Prefix("openapi/v3".into()),
            Arc::new(openapi::OpenApiV3Analyzer),
        );
        registry.register(
            StyleMatch::Prefix("discovery".into()),
            Arc::new(discovery::DiscoveryAnalyzer),
        );
        registry.register(
            StyleMatch::Exact("proto+zip".into()),
            Arc::new(protos::ZippedProtosAnalyzer::default()),
        );
        registry
    }

    pub fn register(&mut self, style: StyleMatch, analyzer: Arc<dyn Analyzer>) {
        self.entries.push((style, analyzer));
    }

    /// Find the analyzer for a style tag
    pub fn resolve(&self, style: &str) -> Result<Arc<dyn Analyzer>> {
        let canonical = canonical_style(style);
        let analyzer = self
            .entries
            .iter()
            .find(|(tag, _)| tag.matches(&canonical))
            .map(|(_, analyzer)| Arc::clone(analyzer))
            .ok_or_else(|| {
                RegistryError::Unsupported(format!("no analyzer for style {:?}", style))
            })?;
        debug!("Style {:?} handled by {}", style, analyzer.name());
        Ok(analyzer)
    }
}

/// Parse a JSON or YAML document into a JSON value
pub(crate) fn parse_document(kind: &str, contents: &[u8]) -> Result<Value> {
    if contents.starts_with(&[0x1f, 0x8b]) {
        return Err(RegistryError::invalid(format!(
            "{} document is gzip-compressed but its style has no +gzip suffix",
            kind
        )));
    }
    if let Ok(value) = serde_json::from_slice::<Value>(contents) {
        return Ok(value);
    }
    serde_yaml::from_slice::<Value>(contents)
        .map_err(|e| RegistryError::invalid(format!("invalid {} document: {}", kind, e)))
}

/// Keys of a JSON object, or nothing
pub(crate) fn object_keys(value: Option<&Value>) -> impl Iterator<Item = &String> {
    value
        .and_then(Value::as_object)
        .into_iter()
        .flat_map(|map| map.keys())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    #[test]
    fn test_resolve_builtin_styles() {
        let registry = AnalyzerRegistry::with_builtins();
        assert_eq!(registry.resolve("openapi/v2").unwrap().name(), "openapi/v2");
        assert_eq!(registry.resolve("openapi/v3+gzip").unwrap().name(), "openapi/v3");
        assert_eq!(registry.resolve("discovery").unwrap().name(), "discovery");
        assert_eq!(registry.resolve("proto+zip").unwrap().name(), "proto+zip");
    }

    #[test]
    fn test_exact_tag_does_not_prefix_match() {
        let registry = AnalyzerRegistry::with_builtins();
        let err = registry.resolve("proto+zip+extra").err().unwrap();
        assert!(matches!(err, RegistryError::Unsupported(_)));
        assert!(registry.resolve("unknown/format").is_err());
        assert!(registry.resolve("").is_err());
    }

    #[test]
    fn test_media_type_styles() {
        assert_eq!(canonical_style("application/x.openapi;version=2"), "openapi/v2");
        assert_eq!(
            canonical_style("application/x.openapi+gzip;version=3.0.0"),
            "openapi/v3+gzip"
        );
        assert_eq!(canonical_style("application/x.discovery+gzip"), "discovery+gzip");
        assert_eq!(canonical_style("application/x.protobuf+zip"), "proto+zip");
        assert_eq!(canonical_style("openapi/v3"), "openapi/v3");

        let registry = AnalyzerRegistry::with_builtins();
        assert_eq!(
            registry.resolve("application/x.discovery+gzip").unwrap().name(),
            "discovery"
        );
        assert_eq!(
            registry.resolve("application/x.protobuf+zip").unwrap().name(),
            "proto+zip"
        );
        assert!(registry.resolve("application/x.wsdl").is_err());
    }

    #[test]
    fn test_gzip_styles_are_inflated() {
        let doc = br#"{"discoveryVersion": "v1", "schemas": {"Shelf": {}}}"#;
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(doc).unwrap();
        let gzipped = encoder.finish().unwrap();

        let plain = decode_contents("application/x.discovery+gzip", gzipped.clone()).unwrap();
        assert_eq!(plain, doc.to_vec());

        let analyzer = AnalyzerRegistry::with_builtins().resolve("discovery+gzip").unwrap();
        let vocabulary = analyzer.analyze(&plain).unwrap();
        assert_eq!(vocabulary.schemas[0].word, "Shelf");

        // Without the suffix the bytes are handed over untouched
        assert_eq!(decode_contents("discovery", gzipped.clone()).unwrap(), gzipped);
        assert!(analyzer.analyze(&gzipped).is_err());

        let err = decode_contents("discovery+gzip", b"not gzip".to_vec()).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidArgument(_)));
    }

    #[test]
    fn test_read_bounded_rejects_oversized_input() {
        assert_eq!(read_bounded(&b"abcd"[..], 4, "input").unwrap(), b"abcd");
        let err = read_bounded(&b"abcde"[..], 4, "input").unwrap_err();
        assert!(matches!(err, RegistryError::InvalidArgument(_)));
    }

    #[test]
    fn test_parse_document_accepts_json_and_yaml() {
        let json = parse_document("test", br#"{"a": 1}"#).unwrap();
        let yaml = parse_document("test", b"a: 1\n").unwrap();
        assert_eq!(json, yaml);
        assert!(parse_document("test", b"\x1f\x8b\x08").is_err());
        assert!(parse_document("test", b"a: [unclosed").is_err());
    }
}
