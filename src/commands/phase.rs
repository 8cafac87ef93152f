//! Multi-phase migration management command.
//!
//! `phase plan` composes a multi-phase plan from the live schema and seeds
//! the durable state record; `phase next` applies exactly one phase and
//! advances the record; `phase rollback` runs the previous phase's rollback
//! plan and retreats; `phase status` reports progress. The state record is
//! tied to the plan file by fingerprint, so driving a different plan file
//! against stale state is refused instead of guessed at.

use crate::commands::{connect_and_introspect, resolve_database_url};
use crate::db::executor::{execute_plan, ExecOptions};
use crate::db::target::{Deadline, Target};
use crate::libs::config::Config;
use crate::libs::hash::fingerprint;
use crate::libs::messages::Message;
use crate::libs::multiphase;
use crate::libs::plan::{MultiPhasePlan, PlanDocument};
use crate::libs::state::{PhaseState, STATE_FILE_NAME};
use crate::libs::types::LogicalType;
use crate::libs::view::View;
use crate::{msg_bail_anyhow, msg_error, msg_info, msg_print, msg_success};
use anyhow::Result;
use clap::{Args, Subcommand};
use std::path::{Path, PathBuf};

/// Command-line arguments for the phase command group.
#[derive(Debug, Args)]
pub struct PhaseArgs {
    #[command(subcommand)]
    action: PhaseAction,
}

#[derive(Debug, Subcommand)]
enum PhaseAction {
    /// Compose a multi-phase plan and seed the state record
    Plan(PhasePlanArgs),
    /// Show progress of the in-flight migration
    Status(PhaseStatusArgs),
    /// Apply exactly the next phase
    Next(PhaseNextArgs),
    /// Roll back the most recently completed phase
    Rollback(PhaseRollbackArgs),
}

#[derive(Debug, Subcommand)]
enum Pattern {
    /// Rename a column via expand/contract
    Rename {
        #[arg(long)]
        table: String,
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
    },
    /// Change a column's type via a parallel column
    TypeChange {
        #[arg(long)]
        table: String,
        #[arg(long)]
        column: String,
        #[arg(long)]
        new_type: String,
    },
    /// Tighten a nullable column to NOT NULL with a backfill
    NotNull {
        #[arg(long)]
        table: String,
        #[arg(long)]
        column: String,
    },
    /// Deprecate a column before dropping it
    Deprecate {
        #[arg(long)]
        table: String,
        #[arg(long)]
        column: String,
    },
    /// Drop a table with deploy gates and optional archival
    DropTable {
        #[arg(long)]
        table: String,
        #[arg(long, help = "Archive rows to <table>__archive first")]
        archive: bool,
    },
}

#[derive(Debug, Args)]
struct PhasePlanArgs {
    #[command(subcommand)]
    pattern: Pattern,

    #[arg(long, short, global = true, help = "Target database URL")]
    database: Option<String>,

    #[arg(long, short, global = true, default_value = "lockplane-phases.json", help = "Plan file to write")]
    out: PathBuf,

    #[arg(long, global = true, help = "Abort if the command runs longer than this many seconds")]
    timeout: Option<u64>,
}

#[derive(Debug, Args)]
struct PhaseStatusArgs {
    #[arg(long, short, default_value = "lockplane-phases.json", help = "Plan file to inspect")]
    plan: PathBuf,
}

#[derive(Debug, Args)]
struct PhaseNextArgs {
    #[arg(long, short, default_value = "lockplane-phases.json", help = "Plan file to drive")]
    plan: PathBuf,

    #[arg(long, short, help = "Target database URL")]
    database: Option<String>,

    #[arg(long, help = "Shadow database URL for the dry run")]
    shadow_database: Option<String>,

    #[arg(long, help = "Skip the shadow rehearsal (strongly discouraged)")]
    skip_shadow: bool,

    #[arg(long, help = "Abort if the command runs longer than this many seconds")]
    timeout: Option<u64>,
}

#[derive(Debug, Args)]
struct PhaseRollbackArgs {
    #[arg(long, short, default_value = "lockplane-phases.json", help = "Plan file to drive")]
    plan: PathBuf,

    #[arg(long, short, help = "Target database URL")]
    database: Option<String>,

    #[arg(long, help = "Abort if the command runs longer than this many seconds")]
    timeout: Option<u64>,
}

pub async fn cmd(args: PhaseArgs) -> Result<()> {
    match args.action {
        PhaseAction::Plan(args) => plan(args).await,
        PhaseAction::Status(args) => status(args),
        PhaseAction::Next(args) => next(args).await,
        PhaseAction::Rollback(args) => rollback(args).await,
    }
}

async fn plan(args: PhasePlanArgs) -> Result<()> {
    let config = Config::read()?;
    let deadline = Deadline::from_secs(args.timeout);

    let url = resolve_database_url(args.database.clone(), &config)?;
    let (_target, current) = connect_and_introspect(&url, &config, deadline).await?;

    let plan: MultiPhasePlan = match &args.pattern {
        Pattern::Rename { table, from, to } => multiphase::expand_contract_rename(&current, table, from, to)?,
        Pattern::TypeChange { table, column, new_type } => {
            let logical = parse_logical_type(new_type)?;
            multiphase::type_change(&current, table, column, logical)?
        }
        Pattern::NotNull { table, column } => multiphase::validation(&current, table, column)?,
        Pattern::Deprecate { table, column } => multiphase::deprecation(&current, table, column)?,
        Pattern::DropTable { table, archive } => multiphase::drop_table(&current, table, *archive)?,
    };

    let json = plan.to_json()?;
    std::fs::write(&args.out, &json)?;

    let state = PhaseState::begin(fingerprint(&json), plan.operation.clone(), plan.pattern);
    state.save(&state_path())?;

    msg_success!(Message::PhasePlanCreated {
        operation: plan.operation.clone(),
        total_phases: plan.total_phases,
    });
    View::phases(&plan)?;
    msg_success!(Message::PlanWritten(args.out.display().to_string()));

    Ok(())
}

fn status(args: PhaseStatusArgs) -> Result<()> {
    let Some(state) = PhaseState::load(&state_path())? else {
        msg_info!(Message::PhaseNoState);
        return Ok(());
    };
    let plan = load_multi_phase(&args.plan, &state)?;

    if state.is_complete(plan.total_phases) {
        msg_success!(Message::PhaseAllComplete);
    } else {
        msg_info!(Message::PhaseStatus {
            operation: state.operation.clone(),
            current: state.current_phase,
            total: plan.total_phases,
        });
    }
    View::phases(&plan)?;
    Ok(())
}

async fn next(args: PhaseNextArgs) -> Result<()> {
    let config = Config::read()?;
    let deadline = Deadline::from_secs(args.timeout);

    let Some(mut state) = PhaseState::load(&state_path())? else {
        msg_error!(Message::PhaseNoState);
        msg_bail_anyhow!("run 'lockplane phase plan' first");
    };
    let plan = load_multi_phase(&args.plan, &state)?;

    if state.is_complete(plan.total_phases) {
        msg_success!(Message::PhaseAllComplete);
        return Ok(());
    }

    let number = state.current_phase;
    let Some(phase) = plan.phase(number) else {
        msg_bail_anyhow!(format!("plan has no phase {number}"));
    };

    msg_print!(
        Message::PhaseStarting {
            number,
            name: phase.name.clone(),
        },
        true
    );
    if phase.requires_code_deploy {
        msg_info!(Message::PhaseRequiresCodeDeploy(phase.code_changes_required.clone()));
    }

    if !phase.plan.is_empty() {
        let url = resolve_database_url(args.database.clone(), &config)?;
        let (mut target, current) = connect_and_introspect(&url, &config, deadline).await?;

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
        let result = execute_plan(&phase.plan, &mut target, shadow_target.as_mut(), &current, &options).await?;
        if !result.success {
            for error in &result.errors {
                msg_error!(Message::ApplyFailed(format!(
                    "step {} ('{}'): {}",
                    error.step_index, error.description, error.detail
                )));
            }
            msg_bail_anyhow!(Message::ApplyAborted);
        }
    }

    state.complete_phase(number);
    state.save(&state_path())?;
    msg_success!(Message::PhaseCompleted(number));

    if !phase.verification.is_empty() {
        msg_info!(Message::PhaseVerification(phase.verification.clone()));
    }
    if state.is_complete(plan.total_phases) {
        msg_success!(Message::PhaseAllComplete);
    }

    Ok(())
}

async fn rollback(args: PhaseRollbackArgs) -> Result<()> {
    let config = Config::read()?;
    let deadline = Deadline::from_secs(args.timeout);

    let Some(mut state) = PhaseState::load(&state_path())? else {
        msg_error!(Message::PhaseNoState);
        msg_bail_anyhow!("nothing to roll back");
    };
    let plan = load_multi_phase(&args.plan, &state)?;

    if state.current_phase <= 1 && state.completed_phases.is_empty() {
        msg_bail_anyhow!("no completed phase to roll back");
    }

    let number = state.current_phase - 1;
    let Some(phase) = plan.phase(number) else {
        msg_bail_anyhow!(format!("plan has no phase {number}"));
    };

    if !phase.rollback.is_empty() {
        let url = resolve_database_url(args.database.clone(), &config)?;
        let (mut target, current) = connect_and_introspect(&url, &config, deadline).await?;

        let options = ExecOptions {
            skip_shadow: true,
            deadline,
            shadow_schema: config.shadow_schema().to_string(),
        };
        let result = execute_plan(&phase.rollback, &mut target, None, &current, &options).await?;
        if !result.success {
            for error in &result.errors {
                msg_error!(Message::ApplyFailed(format!(
                    "step {} ('{}'): {}",
                    error.step_index, error.description, error.detail
                )));
            }
            msg_bail_anyhow!(Message::ApplyAborted);
        }
    }

    state.retreat_phase();
    state.save(&state_path())?;
    msg_success!(Message::PhaseRolledBack(number));

    Ok(())
}

fn state_path() -> PathBuf {
    Path::new(STATE_FILE_NAME).to_path_buf()
}

/// Loads the plan file and checks it against the state record fingerprint.
fn load_multi_phase(path: &Path, state: &PhaseState) -> Result<MultiPhasePlan> {
    let json = std::fs::read_to_string(path)?;
    if fingerprint(&json) != state.plan_fingerprint {
        msg_error!(Message::PhaseStateMismatch);
        msg_bail_anyhow!(format!(
            "{} does not match the plan tracked by {STATE_FILE_NAME}",
            path.display()
        ));
    }
    match PlanDocument::read(path)? {
        PlanDocument::Multi(plan) => Ok(plan),
        PlanDocument::Single(_) => msg_bail_anyhow!("this is a single-phase plan; use 'lockplane apply'"),
    }
}

fn parse_logical_type(raw: &str) -> Result<LogicalType> {
    match crate::libs::types::normalize_type(raw, crate::libs::types::Dialect::Postgres) {
        Ok(logical) => Ok(logical),
        Err(unknown) => msg_bail_anyhow!(format!("{unknown}")),
    }
}
