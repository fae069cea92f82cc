//! Configuration inspection command

use clap::Subcommand;
use registry_core::{config::RegistryConfig, error::Result};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration as TOML
    Show,
}

/// Handle configuration command
pub fn handle(action: ConfigAction, config: &RegistryConfig) -> Result<()> {
    match action {
        ConfigAction::Show => {
            print!("{}", config.to_toml()?);
        }
    }
    Ok(())
}
