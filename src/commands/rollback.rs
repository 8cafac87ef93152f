//! Rollback generation and application command.
//!
//! Builds the inverse of a forward plan from the plan file and the
//! pre-state schema snapshot written at plan time, displays it, and can
//! apply it through the same executor pipeline as a forward plan.

use crate::commands::{connect_and_introspect, resolve_database_url};
use crate::commands::apply::confirm_dangerous;
use crate::db::executor::{execute_plan, ExecOptions};
use crate::db::target::{Deadline, Target};
use crate::libs::config::Config;
use crate::libs::messages::Message;
use crate::libs::plan::PlanDocument;
use crate::libs::rollback::build_rollback;
use crate::libs::schema::Schema;
use crate::libs::view::View;
use crate::{msg_bail_anyhow, msg_error, msg_info, msg_success, msg_warning};
use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

/// Command-line arguments for the rollback command.
#[derive(Debug, Args)]
pub struct RollbackArgs {
    /// Forward plan file to invert
    #[arg(long, short, help = "Forward plan JSON file")]
    plan: PathBuf,

    /// Pre-state schema snapshot written by `lockplane plan --snapshot`
    #[arg(long, help = "Pre-state schema JSON the forward plan was generated against")]
    pre_state: PathBuf,

    /// Write the rollback plan to a JSON file
    #[arg(long, short, help = "Write the rollback plan JSON to this path")]
    out: Option<PathBuf>,

    /// Apply the rollback plan immediately
    #[arg(long, help = "Apply the rollback plan to the database")]
    apply: bool,

    #[arg(long, short, help = "Target database URL")]
    database: Option<String>,

    #[arg(long, help = "Shadow database URL for the dry run")]
    shadow_database: Option<String>,

    #[arg(long, help = "Skip the shadow rehearsal (strongly discouraged)")]
    skip_shadow: bool,

    #[arg(long, short = 'y', help = "Do not ask for confirmation")]
    yes: bool,

    #[arg(long, help = "Abort if the command runs longer than this many seconds")]
    timeout: Option<u64>,
}

pub async fn cmd(args: RollbackArgs) -> Result<()> {
    let config = Config::read()?;
    let deadline = Deadline::from_secs(args.timeout);

    let forward = match PlanDocument::read(&args.plan)? {
        PlanDocument::Single(plan) => plan,
        PlanDocument::Multi(_) => {
            msg_bail_anyhow!("multi-phase plans roll back per phase; use 'lockplane phase rollback'")
        }
    };
    let pre_state = Schema::from_export_file(&args.pre_state)?;

    let rollback = build_rollback(&forward, &pre_state)?;
    msg_success!(Message::RollbackGenerated(rollback.steps.len()));
    View::plan(&rollback)?;

    if let Some(path) = &args.out {
        std::fs::write(path, rollback.to_json()?)?;
        msg_success!(Message::RollbackWritten(path.display().to_string()));
    }

    if !args.apply {
        return Ok(());
    }

    let url = resolve_database_url(args.database.clone(), &config)?;
    let (mut target, current) = connect_and_introspect(&url, &config, deadline).await?;

    confirm_dangerous(&rollback, args.yes)?;
    if args.skip_shadow {
        msg_warning!(Message::ShadowSkipDiscouraged);
    }

    let shadow_url = args.shadow_database.clone().or_else(|| config.shadow_database_url.clone());
    let mut shadow_target: Option<Target> = match &shadow_url {
        Some(url) if !args.skip_shadow => Some(Target::connect(url, deadline).await?),
        _ => None,
    };

    let options = ExecOptions {
        skip_shadow: args.skip_shadow,
        deadline,
        shadow_schema: config.shadow_schema().to_string(),
    };

    msg_info!(Message::ApplyStarting(rollback.executable_steps().count()));
    let result = execute_plan(&rollback, &mut target, shadow_target.as_mut(), &current, &options).await?;

    if result.success {
        msg_success!(Message::ApplySucceeded(result.steps_applied));
        Ok(())
    } else {
        for error in &result.errors {
            msg_error!(Message::ApplyFailed(format!(
                "step {} ('{}'): {}",
                error.step_index, error.description, error.detail
            )));
        }
        msg_bail_anyhow!(Message::ApplyAborted)
    }
}
