//! CLI command handlers
//!
//! Each subcommand is implemented in its own module.

pub mod compute;
pub mod config;
pub mod helpers;
pub mod serve;
