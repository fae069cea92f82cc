//! Google API Discovery document vocabularies

use super::{object_keys, parse_document, Analyzer, Vocabulary, VocabularyBuilder};
use crate::error::{RegistryError, Result};
use serde_json::Value;

fn add_methods(builder: &mut VocabularyBuilder, methods: Option<&Value>) {
    let Some(methods) = methods.and_then(Value::as_object) else {
        return;
    };
    for (name, method) in methods {
        let id = method.get("id").and_then(Value::as_str).unwrap_or(name.as_str());
        builder.operation(id);
        for parameter in object_keys(method.get("parameters")) {
            builder.parameter(parameter);
        }
    }
}

fn add_resources(builder: &mut VocabularyBuilder, resources: Option<&Value>) {
    let Some(resources) = resources.and_then(Value::as_object) else {
        return;
    };
    for resource in resources.values() {
        add_methods(builder, resource.get("methods"));
        add_resources(builder, resource.get("resources"));
    }
}

pub struct DiscoveryAnalyzer;

impl Analyzer for DiscoveryAnalyzer {
    fn name(&self) -> &str {
        "discovery"
    }

    fn analyze(&self, contents: &[u8]) -> Result<Vocabulary> {
        let doc = parse_document("Discovery", contents)?;
        if doc.get("discoveryVersion").and_then(Value::as_str).is_none() {
            return Err(RegistryError::invalid(
                "invalid Discovery: missing \"discoveryVersion\" field",
            ));
        }

        let mut builder = VocabularyBuilder::new();
        if let Some(schemas) = doc.get("schemas").and_then(Value::as_object) {
            for (name, schema) in schemas {
                builder.schema(name);
                for property in object_keys(schema.get("properties")) {
                    builder.property(property);
                }
            }
        }
        for parameter in object_keys(doc.get("parameters")) {
            builder.parameter(parameter);
        }
        add_methods(&mut builder, doc.get("methods"));
        add_resources(&mut builder, doc.get("resources"));
        Ok(builder.build())
    }
}
