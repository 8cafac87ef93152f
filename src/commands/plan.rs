//! Plan computation command.
//!
//! Parses the declared schema, introspects the live database (or reads a
//! schema JSON export), diffs the two, and emits the ordered DDL plan with
//! its safety classification and source-state hash.

use crate::commands::{connect_and_introspect, load_desired, resolve_database_url, resolve_schema_path};
use crate::db::target::Deadline;
use crate::libs::config::Config;
use crate::libs::differ;
use crate::libs::messages::Message;
use crate::libs::plan::SafetyLevel;
use crate::libs::planner::build_plan;
use crate::libs::schema::Schema;
use crate::libs::view::View;
use crate::{msg_info, msg_print, msg_success, msg_warning};
use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

/// Command-line arguments for the plan command.
#[derive(Debug, Args)]
pub struct PlanArgs {
    /// Schema file or directory of .lp.sql files
    #[arg(long, short, help = "Schema file or directory of .lp.sql files")]
    schema: Option<PathBuf>,

    /// Target database URL (postgres://, sqlite://, libsql:, :memory:)
    #[arg(long, short, help = "Target database URL")]
    database: Option<String>,

    /// Read the current state from a schema JSON export instead of a live database
    #[arg(long, help = "Schema JSON export to diff against instead of a live database")]
    from_json: Option<PathBuf>,

    /// Write the plan to a JSON file
    #[arg(long, short, help = "Write the plan JSON to this path")]
    out: Option<PathBuf>,

    /// Write the pre-state schema snapshot (needed later for rollback)
    #[arg(long, help = "Write the pre-state schema JSON to this path")]
    snapshot: Option<PathBuf>,

    /// Overall deadline in seconds
    #[arg(long, help = "Abort if the command runs longer than this many seconds")]
    timeout: Option<u64>,
}

/// Executes the plan command.
///
/// The current state comes from the live database by default; `--from-json`
/// substitutes a schema export, which also decides the dialect when no
/// database is involved.
pub async fn cmd(args: PlanArgs) -> Result<()> {
    let config = Config::read()?;
    let deadline = Deadline::from_secs(args.timeout);

    // Current state first; it decides the dialect the schema files are
    // parsed with.
    let current: Schema = match &args.from_json {
        Some(path) => Schema::from_export_file(path)?,
        None => {
            let url = resolve_database_url(args.database.clone(), &config)?;
            let (_target, schema) = connect_and_introspect(&url, &config, deadline).await?;
            schema
        }
    };

    let schema_path = resolve_schema_path(args.schema.clone(), &config)?;
    let desired = load_desired(&schema_path, current.dialect)?;

    let diff = differ::diff(&current, &desired);
    if diff.is_empty() {
        msg_info!(Message::DiffEmpty);
        return Ok(());
    }

    let plan = build_plan(&diff, &current, &desired, current.dialect)?;

    msg_success!(Message::PlanCreated(plan.steps.len()));
    View::plan(&plan)?;
    msg_info!(Message::PlanSourceHash(plan.source_hash.clone()));

    let dangerous = plan
        .steps
        .iter()
        .filter(|s| s.safety_level == SafetyLevel::Dangerous)
        .count();
    if dangerous > 0 {
        msg_warning!(Message::PlanContainsDangerous(dangerous));
        msg_print!(Message::SaferAlternativesHeader);
        for step in &plan.steps {
            for alternative in &step.safer_alternatives {
                msg_print!(format!("  - {alternative}"));
            }
        }
    }

    if let Some(path) = &args.out {
        std::fs::write(path, plan.to_json()?)?;
        msg_success!(Message::PlanWritten(path.display().to_string()));
    }
    if let Some(path) = &args.snapshot {
        std::fs::write(path, current.to_export_json()?)?;
        msg_success!(Message::SnapshotWritten(path.display().to_string()));
    }

    Ok(())
}
