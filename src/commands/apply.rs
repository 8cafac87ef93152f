//! Plan application command.
//!
//! Loads a persisted plan (or recomputes one from schema files), verifies
//! the source-state hash against the live database, rehearses on the shadow
//! database, asks for confirmation when the plan contains dangerous steps,
//! and finally applies in a single transaction.

use crate::commands::{connect_and_introspect, load_desired, resolve_database_url, resolve_schema_path};
use crate::db::executor::{execute_plan, ExecOptions};
use crate::db::target::{Deadline, Target};
use crate::libs::config::Config;
use crate::libs::differ;
use crate::libs::messages::Message;
use crate::libs::plan::{Plan, PlanDocument, SafetyLevel};
use crate::libs::planner::build_plan;
use crate::libs::view::View;
use crate::{msg_bail_anyhow, msg_error, msg_info, msg_print, msg_success, msg_warning};
use anyhow::Result;
use clap::Args;
use dialoguer::{theme::ColorfulTheme, Confirm};
use std::io::IsTerminal;
use std::path::PathBuf;

/// Command-line arguments for the apply command.
#[derive(Debug, Args)]
pub struct ApplyArgs {
    /// Plan file produced by `lockplane plan --out`
    #[arg(long, short, help = "Plan JSON file to apply")]
    plan: Option<PathBuf>,

    /// Recompute the plan from schema files when no plan file is given
    #[arg(long, short, help = "Schema file or directory of .lp.sql files")]
    schema: Option<PathBuf>,

    #[arg(long, short, help = "Target database URL")]
    database: Option<String>,

    /// Shadow database URL used for rehearsal
    #[arg(long, help = "Shadow database URL for the dry run")]
    shadow_database: Option<String>,

    /// Skip the shadow rehearsal (strongly discouraged)
    #[arg(long, help = "Skip the shadow rehearsal (strongly discouraged)")]
    skip_shadow: bool,

    /// Apply without interactive confirmation
    #[arg(long, short = 'y', help = "Do not ask for confirmation")]
    yes: bool,

    #[arg(long, help = "Abort if the command runs longer than this many seconds")]
    timeout: Option<u64>,
}

pub async fn cmd(args: ApplyArgs) -> Result<()> {
    let config = Config::read()?;
    let deadline = Deadline::from_secs(args.timeout);

    let url = resolve_database_url(args.database.clone(), &config)?;
    let (mut target, current) = connect_and_introspect(&url, &config, deadline).await?;

    let plan: Plan = match &args.plan {
        Some(path) => {
            let document = PlanDocument::read(path)?;
            msg_info!(Message::PlanLoaded(path.display().to_string()));
            match document {
                PlanDocument::Single(plan) => plan,
                PlanDocument::Multi(_) => {
                    msg_bail_anyhow!("this is a multi-phase plan; drive it with 'lockplane phase next'")
                }
            }
        }
        None => {
            let schema_path = resolve_schema_path(args.schema.clone(), &config)?;
            let desired = load_desired(&schema_path, current.dialect)?;
            let diff = differ::diff(&current, &desired);
            if diff.is_empty() {
                msg_info!(Message::DiffEmpty);
                return Ok(());
            }
            build_plan(&diff, &current, &desired, current.dialect)?
        }
    };

    if plan.is_empty() {
        msg_info!(Message::PlanEmpty);
        return Ok(());
    }

    View::plan(&plan)?;
    confirm_dangerous(&plan, args.yes)?;

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

    msg_info!(Message::ApplyStarting(plan.executable_steps().count()));
    let result = execute_plan(&plan, &mut target, shadow_target.as_mut(), &current, &options).await?;

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

/// Interactive gate for dangerous plans. `--yes` bypasses; a non-TTY
/// session without `--yes` refuses rather than guessing.
pub(crate) fn confirm_dangerous(plan: &Plan, assume_yes: bool) -> Result<()> {
    let dangerous = plan
        .steps
        .iter()
        .filter(|s| s.safety_level == SafetyLevel::Dangerous)
        .count();
    if dangerous == 0 || assume_yes {
        return Ok(());
    }

    msg_warning!(Message::PlanContainsDangerous(dangerous));
    msg_print!(Message::SaferAlternativesHeader);
    for step in &plan.steps {
        for alternative in &step.safer_alternatives {
            msg_print!(format!("  - {alternative}"));
        }
    }

    if !std::io::stdin().is_terminal() {
        msg_bail_anyhow!("refusing to apply dangerous steps without --yes in a non-interactive session");
    }

    let confirmed = Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(Message::ConfirmDangerousApply(dangerous).to_string())
        .default(false)
        .interact()?;
    if !confirmed {
        msg_bail_anyhow!(Message::ApplyAborted);
    }
    Ok(())
}
