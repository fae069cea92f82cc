//! Vocabulary summaries
//!
//! A vocabulary counts the names an API description uses for its schemas,
//! schema properties, operations and parameters.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Type tag stored on vocabulary artifacts
pub const VOCABULARY_TYPE: &str = "gnostic.metrics.Vocabulary";

/// Artifact relation under which a spec's vocabulary is stored
pub const VOCABULARY_RELATION: &str = "vocabulary";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordCount {
    pub word: String,
    pub count: i32,
}

/// Word counts by category, each sorted by word
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vocabulary {
    pub schemas: Vec<WordCount>,
    pub properties: Vec<WordCount>,
    pub operations: Vec<WordCount>,
    pub parameters: Vec<WordCount>,
}

impl Vocabulary {
    /// Serialized payload for an artifact value
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
            && self.properties.is_empty()
            && self.operations.is_empty()
            && self.parameters.is_empty()
    }
}

/// Accumulates word counts while walking a document
#[derive(Debug, Default)]
pub struct VocabularyBuilder {
    schemas: BTreeMap<String, i32>,
    properties: BTreeMap<String, i32>,
    operations: BTreeMap<String, i32>,
    parameters: BTreeMap<String, i32>,
}

fn bump(counts: &mut BTreeMap<String, i32>, word: &str) {
    if !word.is_empty() {
        *counts.entry(word.to_string()).or_insert(0) += 1;
    }
}

fn drain(counts: BTreeMap<String, i32>) -> Vec<WordCount> {
    counts
        .into_iter()
        .map(|(word, count)| WordCount { word, count })
        .collect()
}

impl VocabularyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schema(&mut self, word: &str) {
        bump(&mut self.schemas, word);
    }

    pub fn property(&mut self, word: &str) {
        bump(&mut self.properties, word);
    }

    pub fn operation(&mut self, word: &str) {
        bump(&mut self.operations, word);
    }

    pub fn parameter(&mut self, word: &str) {
        bump(&mut self.parameters, word);
    }

    pub fn build(self) -> Vocabulary {
        Vocabulary {
            schemas: drain(self.schemas),
            properties: drain(self.properties),
            operations: drain(self.operations),
            parameters: drain(self.parameters),
        }
    }
}
