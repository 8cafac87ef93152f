//! Plan execution: hash guard, shadow rehearsal, transactional apply.
//!
//! The executor is the only component that mutates a real database, and it
//! refuses to do so until two gates pass:
//!
//! 1. **Source-hash guard**: a plan carrying a non-empty `source_hash`
//!    applies only when the live schema still hashes to it.
//! 2. **Shadow rehearsal**: when a shadow target is supplied (and not
//!    explicitly skipped), every executable step must succeed on the shadow
//!    under a rolled-back transaction first.
//!
//! The apply itself runs in a single transaction under a mutual-exclusion
//! token. The first failing step aborts the transaction; there are no
//! retries, and the target is left in its pre-plan state.

use crate::db::shadow;
use crate::db::target::{Deadline, Target};
use crate::libs::error::LockplaneError;
use crate::libs::hash::compute_schema_hash;
use crate::libs::messages::Message;
use crate::libs::plan::{ExecutionResult, Plan, StepError};
use crate::libs::schema::Schema;
use crate::{msg_debug, msg_info};

/// Execution knobs supplied by the caller.
#[derive(Debug, Clone)]
pub struct ExecOptions {
    /// Bypass the shadow rehearsal entirely. Strongly discouraged; there is
    /// deliberately no way to continue past a failed rehearsal.
    pub skip_shadow: bool,
    pub deadline: Deadline,
    /// PostgreSQL schema used for the rehearsal.
    pub shadow_schema: String,
}

impl Default for ExecOptions {
    fn default() -> Self {
        Self {
            skip_shadow: false,
            deadline: Deadline::none(),
            shadow_schema: crate::libs::config::DEFAULT_SHADOW_SCHEMA.to_string(),
        }
    }
}

/// Verifies the source-hash precondition without touching the database.
pub fn verify_source_hash(plan: &Plan, current: &Schema) -> Result<(), LockplaneError> {
    if plan.source_hash.is_empty() {
        return Ok(());
    }
    let actual = compute_schema_hash(Some(current));
    if actual != plan.source_hash {
        return Err(LockplaneError::SourceHashMismatch {
            expected: plan.source_hash.clone(),
            actual,
        });
    }
    Ok(())
}

/// Runs the full execution pipeline for `plan` against `target`.
///
/// Returns `Ok` with `success = false` when a step failed during apply (the
/// transaction was rolled back and the error is recorded in the result);
/// guard and rehearsal failures surface as errors because nothing was
/// attempted against the target.
pub async fn execute_plan(
    plan: &Plan,
    target: &mut Target,
    shadow_target: Option<&mut Target>,
    current: &Schema,
    options: &ExecOptions,
) -> Result<ExecutionResult, LockplaneError> {
    verify_source_hash(plan, current)?;
    if !plan.source_hash.is_empty() {
        msg_debug!(Message::SourceHashVerified);
    }

    match shadow_target {
        Some(shadow_db) if !options.skip_shadow => {
            msg_info!(Message::ShadowRehearsalStarting);
            shadow::rehearse(shadow_db, current, plan, &options.shadow_schema, options.deadline).await?;
            msg_info!(Message::ShadowRehearsalPassed);
        }
        _ => {
            msg_debug!(Message::ShadowSkipped);
        }
    }

    apply(plan, target, options).await
}

async fn apply(plan: &Plan, target: &mut Target, options: &ExecOptions) -> Result<ExecutionResult, LockplaneError> {
    let deadline = options.deadline;
    let total = plan.executable_steps().count();

    target.acquire_apply_lock(deadline).await?;

    let result = apply_in_transaction(plan, target, total, deadline).await;

    target.release_apply_lock().await;
    result
}

async fn apply_in_transaction(
    plan: &Plan,
    target: &mut Target,
    total: usize,
    deadline: Deadline,
) -> Result<ExecutionResult, LockplaneError> {
    deadline.check()?;

    if let Err(detail) = target.begin(deadline).await {
        return Err(LockplaneError::ApplyFailed {
            step_index: 0,
            description: "open apply transaction".to_string(),
            detail,
        });
    }

    let mut applied = 0usize;
    for (position, (step_index, step)) in plan.executable_steps().enumerate() {
        if let Err(cancelled) = deadline.check() {
            target.rollback_tx().await;
            return Err(cancelled);
        }

        msg_info!(Message::ApplyStep {
            index: position + 1,
            total,
            description: step.description.clone(),
        });

        if let Err(detail) = target.batch_execute(&step.sql, deadline).await {
            target.rollback_tx().await;
            return Ok(ExecutionResult::failed(
                applied,
                StepError {
                    step_index,
                    description: step.description.clone(),
                    detail,
                },
            ));
        }
        applied += 1;
    }

    if let Err(detail) = target.commit(deadline).await {
        target.rollback_tx().await;
        return Err(LockplaneError::ApplyFailed {
            step_index: applied,
            description: "commit apply transaction".to_string(),
            detail,
        });
    }

    Ok(ExecutionResult::succeeded(applied))
}
