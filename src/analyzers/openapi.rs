//! OpenAPI v2 and v3 vocabularies

use super::{object_keys, parse_document, Analyzer, Vocabulary, VocabularyBuilder};
use crate::error::{RegistryError, Result};
use serde_json::Value;

const METHODS: &[&str] = &["get", "put", "post", "delete", "options", "head", "patch", "trace"];

fn require_version(doc: &Value, field: &str, major: &str, kind: &str) -> Result<()> {
    match doc.get(field).and_then(Value::as_str) {
        Some(version) if version.starts_with(major) => Ok(()),
        Some(version) => Err(RegistryError::invalid(format!(
            "invalid {}: unexpected {} version {:?}",
            kind, field, version
        ))),
        None => Err(RegistryError::invalid(format!(
            "invalid {}: missing {:?} field",
            kind, field
        ))),
    }
}

fn add_schemas(builder: &mut VocabularyBuilder, schemas: Option<&Value>) {
    let Some(schemas) = schemas.and_then(Value::as_object) else {
        return;
    };
    for (name, schema) in schemas {
        builder.schema(name);
        for property in object_keys(schema.get("properties")) {
            builder.property(property);
        }
    }
}

fn add_parameters(builder: &mut VocabularyBuilder, parameters: Option<&Value>) {
    let list = parameters.and_then(Value::as_array).into_iter().flatten();
    for parameter in list {
        if let Some(name) = parameter.get("name").and_then(Value::as_str) {
            builder.parameter(name);
        }
    }
}

fn add_paths(builder: &mut VocabularyBuilder, paths: Option<&Value>) {
    let Some(paths) = paths.and_then(Value::as_object) else {
        return;
    };
    for item in paths.values() {
        add_parameters(builder, item.get("parameters"));
        for method in METHODS {
            let Some(operation) = item.get(*method) else {
                continue;
            };
            if let Some(id) = operation.get("operationId").and_then(Value::as_str) {
                builder.operation(id);
            }
            add_parameters(builder, operation.get("parameters"));
        }
    }
}

fn add_named_parameters(builder: &mut VocabularyBuilder, parameters: Option<&Value>) {
    let Some(parameters) = parameters.and_then(Value::as_object) else {
        return;
    };
    for parameter in parameters.values() {
        if let Some(name) = parameter.get("name").and_then(Value::as_str) {
            builder.parameter(name);
        }
    }
}

/// Swagger 2.0 documents
pub struct OpenApiV2Analyzer;

impl Analyzer for OpenApiV2Analyzer {
    fn name(&self) -> &str {
        "openapi/v2"
    }

    fn analyze(&self, contents: &[u8]) -> Result<Vocabulary> {
        let doc = parse_document("OpenAPI", contents)?;
        require_version(&doc, "swagger", "2", "OpenAPI v2")?;

        let mut builder = VocabularyBuilder::new();
        add_schemas(&mut builder, doc.get("definitions"));
        add_paths(&mut builder, doc.get("paths"));
        add_named_parameters(&mut builder, doc.get("parameters"));
        Ok(builder.build())
    }
}

/// OpenAPI 3.x documents
pub struct OpenApiV3Analyzer;

impl Analyzer for OpenApiV3Analyzer {
    fn name(&self) -> &str {
        "openapi/v3"
    }

    fn analyze(&self, contents: &[u8]) -> Result<Vocabulary> {
        let doc = parse_document("OpenAPI", contents)?;
        require_version(&doc, "openapi", "3", "OpenAPI v3")?;

        let components = doc.get("components");
        let mut builder = VocabularyBuilder::new();
        add_schemas(&mut builder, components.and_then(|c| c.get("schemas")));
        add_paths(&mut builder, doc.get("paths"));
        add_named_parameters(&mut builder, components.and_then(|c| c.get("parameters")));
        Ok(builder.build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PETSTORE_V2: &str = r#"
swagger: "2.0"
info: { title: Petstore, version: "1.0" }
paths:
  /pets:
    get:
      operationId: listPets
      parameters:
        - { name: limit, in: query, type: integer }
    post:
      operationId: createPet
  /pets/{petId}:
    parameters:
      - { name: petId, in: path, required: true, type: string }
    get:
      operationId: showPetById
definitions:
  Pet:
    properties:
      id: { type: integer }
      name: { type: string }
  Error:
    properties:
      code: { type: integer }
      message: { type: string }
"#;

    const PETSTORE_V3: &str = r#"{
  "openapi": "3.0.0",
  "info": {"title": "Petstore", "version": "1.0"},
  "paths": {
    "/pets": {"get": {"operationId": "listPets",
      "parameters": [{"name": "limit", "in": "query"}]}}
  },
  "components": {
    "schemas": {"Pet": {"properties": {"id": {}, "name": {}}}},
    "parameters": {"Limit": {"name": "limit", "in": "query"}}
  }
}"#;

    fn words(counts: &[crate::analyzers::WordCount]) -> Vec<(&str, i32)> {
        counts.iter().map(|w| (w.word.as_str(), w.count)).collect()
    }

    #[test]
    fn test_openapi_v2_vocabulary() {
        let vocabulary = OpenApiV2Analyzer.analyze(PETSTORE_V2.as_bytes()).unwrap();
        assert_eq!(words(&vocabulary.schemas), vec![("Error", 1), ("Pet", 1)]);
        assert_eq!(
            words(&vocabulary.properties),
            vec![("code", 1), ("id", 1), ("message", 1), ("name", 1)]
        );
        assert_eq!(
            words(&vocabulary.operations),
            vec![("createPet", 1), ("listPets", 1), ("showPetById", 1)]
        );
        assert_eq!(words(&vocabulary.parameters), vec![("limit", 1), ("petId", 1)]);
    }

    #[test]
    fn test_openapi_v3_vocabulary() {
        let vocabulary = OpenApiV3Analyzer.analyze(PETSTORE_V3.as_bytes()).unwrap();
        assert_eq!(words(&vocabulary.schemas), vec![("Pet", 1)]);
        assert_eq!(words(&vocabulary.operations), vec![("listPets", 1)]);
        assert_eq!(words(&vocabulary.parameters), vec![("limit", 2)]);
    }

    #[test]
    fn test_version_mismatch_is_rejected() {
        assert!(OpenApiV3Analyzer.analyze(PETSTORE_V2.as_bytes()).is_err());
        assert!(OpenApiV2Analyzer.analyze(PETSTORE_V3.as_bytes()).is_err());
        assert!(OpenApiV2Analyzer.analyze(b"just text").is_err());
    }
}
