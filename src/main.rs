//! Main entry point for the lockplane application.
//!
//! Handles initialization of the tracing system and command-line argument
//! parsing, then delegates to the CLI handler for command execution.

use anyhow::Result;
use lockplane::commands::Cli;
use std::env;

/// Main function that initializes the application.
///
/// Sets up logging when debug mode is requested and delegates to the CLI
/// handler. A non-zero exit code is produced for every error class except
/// an empty diff, which the commands report as success.
#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing only if debug mode is enabled
    // This prevents log output from cluttering normal CLI usage
    if env::var("LOCKPLANE_DEBUG").is_ok() || env::var("RUST_LOG").is_ok() {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "lockplane=debug".into()))
            .init();
    }

    // Parse and execute CLI commands
    Cli::menu().await
}
