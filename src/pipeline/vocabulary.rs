//! Vocabulary computation over a set of specs

use super::{for_each_spec, Pipeline, PipelineConfig, PipelineReport, Task};
use crate::analyzers::{decode_contents, AnalyzerRegistry, VOCABULARY_RELATION, VOCABULARY_TYPE};
use crate::error::{RegistryError, Result};
use crate::names::SpecName;
use crate::server::RegistryServer;
use crate::types::{ArtifactValue, View};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

/// Fetch one spec, analyze it and store its `vocabulary` artifact
pub struct ComputeVocabularyTask {
    server: RegistryServer,
    analyzers: Arc<AnalyzerRegistry>,
    spec: SpecName,
}

impl ComputeVocabularyTask {
    pub fn new(server: RegistryServer, analyzers: Arc<AnalyzerRegistry>, spec: SpecName) -> Self {
        Self {
            server,
            analyzers,
            spec,
        }
    }
}

#[async_trait]
impl Task for ComputeVocabularyTask {
    fn name(&self) -> String {
        format!("compute vocabulary {}", self.spec)
    }

    async fn run(&self) -> Result<()> {
        let spec = self
            .server
            .get_spec(&self.spec.to_string(), View::Full)
            .await?;
        let analyzer = self.analyzers.resolve(&spec.style)?;
        let artifact = spec.name.artifact(VOCABULARY_RELATION);
        debug!("Computing {}/properties/{}", spec.name, VOCABULARY_RELATION);

        let style = spec.style;
        let contents = spec.contents.unwrap_or_default();
        let vocabulary = tokio::task::spawn_blocking(move || {
            analyzer.analyze(&decode_contents(&style, contents)?)
        })
            .await
            .map_err(|e| RegistryError::internal(format!("analyzer task failed: {}", e)))?
            .map_err(|e| {
                RegistryError::invalid(format!("cannot summarize {}: {}", self.spec, e))
            })?;

        let value = ArtifactValue::message(VOCABULARY_TYPE, vocabulary.to_bytes()?);
        self.server.set_artifact(&artifact, &value).await?;
        Ok(())
    }
}

/// Compute vocabularies for every spec matching `pattern` and `filter`
///
/// Only setup problems (bad pattern or filter, unreachable store) are
/// returned as errors; per-spec failures are logged and counted.
pub async fn compute_vocabularies(
    server: &RegistryServer,
    analyzers: Arc<AnalyzerRegistry>,
    pattern: &str,
    filter: &str,
    config: PipelineConfig,
) -> Result<PipelineReport> {
    let pipeline = Pipeline::start(config)?;

    let queue = &pipeline;
    let enumerated = for_each_spec(server.storage().as_ref(), pattern, filter, move |spec| {
        let task = ComputeVocabularyTask::new(server.clone(), analyzers.clone(), spec.name);
        async move { queue.submit(task).await }
    })
    .await;

    let report = pipeline.close_and_join().await;
    let matched = enumerated?;
    info!(
        "Computed vocabularies for {} of {} specs matching {}",
        report.succeeded, matched, pattern
    );
    Ok(report)
}
