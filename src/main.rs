//! Registry command line
//!
//! Runs the batch vocabulary pipeline, serves the notification API, and
//! inspects configuration.

mod cli;

use clap::{Parser, Subcommand};
use cli::{compute::ComputeAction, config::ConfigAction};
use registry_core::config::RegistryConfig;
use std::path::PathBuf;
use tracing::{debug, Level};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "registry")]
#[command(about = "API metadata registry with bulk artifact computation", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML); optional unless given explicitly
    #[arg(short, long, env = "REGISTRY_CONFIG")]
    config: Option<PathBuf>,

    /// Set log level
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute derived artifacts for specs
    Compute {
        #[command(subcommand)]
        action: ComputeAction,
    },

    /// Serve the notification API (and gRPC with the `rpc` feature)
    Serve,

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // Broadcast lag on slow SSE clients is expected; keep it out of the log
    let filter = EnvFilter::new(format!(
        "registry={0},registry_core={0},libsql=warn,tower_http=warn,tokio::sync::broadcast=error",
        level.as_str().to_lowercase()
    ));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    debug!("Registry v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = match &cli.config {
        Some(path) => RegistryConfig::load(path, true)?,
        None => RegistryConfig::load(&PathBuf::from("registry.toml"), false)?,
    };

    match cli.command {
        Commands::Compute { action } => cli::compute::handle(action, &config).await?,
        Commands::Serve => cli::serve::handle(&config).await?,
        Commands::Config { action } => cli::config::handle(action, &config)?,
    }

    Ok(())
}
