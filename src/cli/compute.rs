//! Batch computation commands

use super::helpers::open_storage;
use clap::Subcommand;
use registry_core::{
    config::RegistryConfig, error::Result, pipeline::compute_vocabularies, AnalyzerRegistry,
    BroadcastNotifier, RegistryServer,
};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Subcommand)]
pub enum ComputeAction {
    /// Compute the vocabulary of every spec matching PATTERN
    Vocabulary {
        /// Spec name or pattern, e.g. projects/p/apis/-/versions/-/specs/-
        pattern: String,

        /// Only specs matching this filter expression
        #[arg(long, default_value = "")]
        filter: String,

        /// Number of concurrent workers (overrides pipeline.workers)
        #[arg(long)]
        workers: Option<usize>,
    },
}

/// Handle compute command
///
/// Individual spec failures are reported in the summary and do not change the
/// exit status.
pub async fn handle(action: ComputeAction, config: &RegistryConfig) -> Result<()> {
    match action {
        ComputeAction::Vocabulary {
            pattern,
            filter,
            workers,
        } => {
            let storage = open_storage(config).await?;
            let server = RegistryServer::new(storage, Arc::new(BroadcastNotifier::default()));

            let mut pipeline = config.pipeline_config();
            if let Some(workers) = workers {
                pipeline.workers = workers;
            }

            let report = compute_vocabularies(
                &server,
                Arc::new(AnalyzerRegistry::with_builtins()),
                &pattern,
                &filter,
                pipeline,
            )
            .await?;

            info!(
                "Vocabulary run: {} submitted, {} succeeded, {} failed, {} timed out",
                report.submitted, report.succeeded, report.failed, report.timed_out
            );
            if report.failed + report.timed_out > 0 {
                warn!(
                    "{} specs were not summarized; see warnings above",
                    report.failed + report.timed_out
                );
            }
        }
    }
    Ok(())
}
