//! Display implementation for lockplane application messages.
//!
//! Converts structured message data into human-readable text for terminal
//! output. All user-facing strings live here, so tone and formatting stay
//! consistent across commands and the message enum stays a pure data type.

use super::types::Message;
use std::fmt;

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            // === PLAN MESSAGES ===
            Message::PlanCreated(steps) => format!("Plan created with {steps} step(s)"),
            Message::PlanEmpty => "Schemas already match; nothing to plan".to_string(),
            Message::PlanWritten(path) => format!("Plan written to {path}"),
            Message::PlanLoaded(path) => format!("Plan loaded from {path}"),
            Message::PlanSourceHash(hash) => format!("Source state hash: {hash}"),
            Message::PlanContainsDangerous(count) => {
                format!("Plan contains {count} dangerous step(s); review the safer alternatives below")
            }
            Message::SaferAlternativesHeader => "Safer alternatives:".to_string(),
            Message::SnapshotWritten(path) => format!("Pre-state snapshot written to {path}"),

            // === DIFF MESSAGES ===
            Message::DiffEmpty => "No schema differences found".to_string(),
            Message::DiffSummary { added, removed, modified } => {
                format!("Diff: {added} table(s) added, {removed} removed, {modified} modified")
            }

            // === PARSE / VALIDATE MESSAGES ===
            Message::SchemaParsed { tables, files } => {
                format!("Parsed {tables} table(s) from {files} schema file(s)")
            }
            Message::SchemaValid(path) => format!("Schema files in {path} are valid"),
            Message::ParseWarning(warning) => format!("warning: {warning}"),

            // === INTROSPECTION MESSAGES ===
            Message::IntrospectedSchema { dialect, tables } => {
                format!("Introspected {tables} table(s) from {dialect} database")
            }
            Message::SchemaHash(hash) => hash.clone(),
            Message::SchemaExported(path) => format!("Schema exported to {path}"),

            // === APPLY MESSAGES ===
            Message::ApplyStarting(steps) => format!("Applying {steps} step(s)"),
            Message::ApplyStep { index, total, description } => {
                format!("[{index}/{total}] {description}")
            }
            Message::ApplySucceeded(steps) => format!("Applied {steps} step(s) successfully"),
            Message::ApplyFailed(detail) => format!("Apply failed: {detail}"),
            Message::ApplySkippedCommentStep(description) => {
                format!("Skipping comment-only step: {description}")
            }
            Message::ShadowRehearsalStarting => "Rehearsing plan on shadow database".to_string(),
            Message::ShadowRehearsalPassed => "Shadow rehearsal passed".to_string(),
            Message::ShadowSkipped => "Shadow rehearsal skipped".to_string(),
            Message::ShadowSkipDiscouraged => {
                "Skipping the shadow rehearsal is strongly discouraged; the plan will run unverified".to_string()
            }
            Message::SourceHashVerified => "Source state hash verified".to_string(),
            Message::ConfirmDangerousApply(count) => {
                format!("The plan contains {count} dangerous step(s). Apply anyway?")
            }
            Message::ApplyAborted => "Apply aborted".to_string(),

            // === ROLLBACK MESSAGES ===
            Message::RollbackGenerated(steps) => format!("Rollback plan generated with {steps} step(s)"),
            Message::RollbackWritten(path) => format!("Rollback plan written to {path}"),

            // === PHASE MESSAGES ===
            Message::PhasePlanCreated { operation, total_phases } => {
                format!("Multi-phase plan for '{operation}' with {total_phases} phase(s)")
            }
            Message::PhaseStatus { operation, current, total } => {
                format!("'{operation}': phase {current} of {total}")
            }
            Message::PhaseStarting { number, name } => format!("Phase {number}: {name}"),
            Message::PhaseCompleted(number) => format!("Phase {number} completed"),
            Message::PhaseRequiresCodeDeploy(changes) => {
                let mut text = "This phase requires a code deploy:".to_string();
                for change in changes {
                    text.push_str(&format!("\n  - {change}"));
                }
                text
            }
            Message::PhaseVerification(probes) => {
                let mut text = "Verify before continuing:".to_string();
                for probe in probes {
                    text.push_str(&format!("\n  {probe}"));
                }
                text
            }
            Message::PhaseAllComplete => "All phases complete".to_string(),
            Message::PhaseRolledBack(number) => format!("Phase {number} rolled back"),
            Message::PhaseStateMismatch => {
                "The state file tracks a different plan; refusing to continue".to_string()
            }
            Message::PhaseNoState => "No multi-phase migration in progress".to_string(),

            // === CONFIGURATION MESSAGES ===
            Message::ConfigLoaded => "Configuration loaded".to_string(),
            Message::DatabaseUrlMissing => {
                "No database URL; pass --database or set LOCKPLANE_DATABASE_URL".to_string()
            }

            // === GENERIC MESSAGES ===
            Message::Cancelled => "Operation cancelled".to_string(),
            Message::OperationTimedOut(seconds) => format!("Operation exceeded the {seconds}s deadline"),
        };
        write!(f, "{text}")
    }
}
