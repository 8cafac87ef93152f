//! Command-line interface commands for the lockplane application.
//!
//! Contains all CLI command implementations for planning, diffing,
//! applying, rolling back and multi-phase schema management.
//!
//! ## Features
//!
//! - **Pipeline Commands**: `plan`, `diff`, `apply`, `rollback`
//! - **Schema Commands**: `validate`, `introspect`
//! - **Multi-Phase Commands**: `phase plan/status/next/rollback`
//!
//! ## Usage
//!
//! ```bash
//! lockplane plan --schema schema/ --database postgres://localhost/app
//! lockplane apply --plan plan.json --shadow-database postgres://localhost/shadow
//! lockplane phase next --plan phases.json
//! ```

pub mod apply;
pub mod diff;
pub mod introspect;
pub mod phase;
pub mod plan;
pub mod rollback;
pub mod validate;

use crate::db::introspect::introspect_target;
use crate::db::target::{Deadline, Target};
use crate::libs::config::Config;
use crate::libs::messages::Message;
use crate::libs::parser::{parse_schema_path, ParseOutcome};
use crate::libs::schema::Schema;
use crate::libs::types::Dialect;
use crate::{msg_bail_anyhow, msg_warning};
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Defines the main subcommands that the application can execute.
#[derive(Debug, Subcommand)]
enum Commands {
    /// Compute the DDL plan that brings a database to the declared schema
    #[command(about = "Compute a migration plan from schema files and a live database")]
    Plan(plan::PlanArgs),

    /// Show the structural diff without emitting SQL
    #[command(about = "Show the schema diff between declared and live state")]
    Diff(diff::DiffArgs),

    /// Rehearse and apply a plan transactionally
    #[command(about = "Apply a plan after shadow rehearsal and hash verification")]
    Apply(apply::ApplyArgs),

    /// Generate (and optionally apply) the inverse of a plan
    #[command(about = "Generate the rollback plan for a forward plan")]
    Rollback(rollback::RollbackArgs),

    /// Parse and validate schema files without touching a database
    #[command(about = "Validate .lp.sql schema files")]
    Validate(validate::ValidateArgs),

    /// Dump a live database's schema as JSON or a canonical hash
    #[command(about = "Introspect a live database")]
    Introspect(introspect::IntrospectArgs),

    /// Multi-phase migration management
    #[command(about = "Plan and drive multi-phase migrations")]
    Phase(phase::PhaseArgs),
}

/// The main CLI structure that parses command-line arguments.
///
/// # Examples
///
/// ```bash
/// # Display help
/// lockplane --help
///
/// # Compute a plan
/// lockplane plan --schema schema/ --database sqlite://app.db
/// ```
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
#[command(arg_required_else_help(true))]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    /// Parses command-line arguments and executes the corresponding command.
    pub async fn menu() -> Result<()> {
        let cli = Self::parse();

        match cli.command {
            Commands::Plan(args) => plan::cmd(args).await,
            Commands::Diff(args) => diff::cmd(args).await,
            Commands::Apply(args) => apply::cmd(args).await,
            Commands::Rollback(args) => rollback::cmd(args).await,
            Commands::Validate(args) => validate::cmd(args),
            Commands::Introspect(args) => introspect::cmd(args).await,
            Commands::Phase(args) => phase::cmd(args).await,
        }
    }
}

/// Resolves the target database URL from a flag or configuration.
pub(crate) fn resolve_database_url(flag: Option<String>, config: &Config) -> Result<String> {
    match flag.or_else(|| config.database_url.clone()) {
        Some(url) => Ok(url),
        None => msg_bail_anyhow!(Message::DatabaseUrlMissing),
    }
}

/// Resolves the schema path from a flag or configuration.
pub(crate) fn resolve_schema_path(flag: Option<PathBuf>, config: &Config) -> Result<PathBuf> {
    match flag.or_else(|| config.schema_dir.clone()) {
        Some(path) => Ok(path),
        None => msg_bail_anyhow!("No schema path; pass --schema or set schema_dir in lockplane.json"),
    }
}

/// Parses the desired schema and prints any warnings.
pub(crate) fn load_desired(path: &PathBuf, dialect: Dialect) -> Result<Schema> {
    let ParseOutcome { schema, warnings } = parse_schema_path(path, dialect)?;
    for warning in &warnings {
        msg_warning!(Message::ParseWarning(warning.to_string()));
    }
    Ok(schema)
}

/// Connects to the target and reads its current schema in one step.
pub(crate) async fn connect_and_introspect(
    url: &str,
    config: &Config,
    deadline: Deadline,
) -> Result<(Target, Schema)> {
    let mut target = Target::connect(url, deadline).await?;
    let schema = introspect_target(&mut target, &config.postgres_schemas, deadline).await?;
    Ok((target, schema))
}
