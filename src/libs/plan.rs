//! Plan, step and multi-phase plan types, with their persisted JSON shapes.
//!
//! A plan is an immutable ordered sequence of steps. Each step carries the
//! SQL to execute, a typed [`Operation`] tag describing what the SQL does
//! (the rollback generator inverts the tag, never the SQL text), and the
//! safety classification attached by the classifier.
//!
//! ## Features
//!
//! - **Typed Operations**: Structural identity for every step, no SQL sniffing
//! - **Comment-Only Steps**: Dialect limitations surface as skippable documentation
//! - **JSON Persistence**: Plan files round-trip; unknown fields are ignored
//! - **Multi-Phase Plans**: Same file shape with `multi_phase: true`

use crate::libs::schema::Table;
use crate::libs::types::LogicalType;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Safety classification of a single step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SafetyLevel {
    Safe,
    Review,
    Lossy,
    Dangerous,
    MultiPhase,
}

impl fmt::Display for SafetyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SafetyLevel::Safe => "safe",
            SafetyLevel::Review => "review",
            SafetyLevel::Lossy => "lossy",
            SafetyLevel::Dangerous => "dangerous",
            SafetyLevel::MultiPhase => "multi-phase",
        };
        f.write_str(label)
    }
}

/// Structural identity of a plan step.
///
/// The SQL string on a step is for execution and display; this tag is what
/// the rollback generator matches on. Steps that exist only to document a
/// dialect limitation carry [`Operation::Note`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Operation {
    CreateTable { table: String },
    DropTable { table: String },
    AddColumn { table: String, column: String },
    DropColumn { table: String, column: String },
    AlterColumnType {
        table: String,
        column: String,
        from: LogicalType,
        to: LogicalType,
    },
    SetNotNull { table: String, column: String },
    DropNotNull { table: String, column: String },
    SetDefault {
        table: String,
        column: String,
        default: String,
    },
    DropDefault { table: String, column: String },
    AddPrimaryKey { table: String, columns: Vec<String> },
    DropPrimaryKey { table: String, columns: Vec<String> },
    CreateIndex { table: String, index: String },
    DropIndex { table: String, index: String },
    AddForeignKey { table: String, constraint: String },
    DropForeignKey { table: String, constraint: String },
    /// SQLite-family table recreation; carries both shapes so the inverse
    /// recreation can be built without consulting the forward SQL.
    RecreateTable {
        table: String,
        before: Table,
        after: Table,
    },
    /// Data backfill emitted by the multi-phase composer.
    Backfill { table: String, column: String },
    /// Row archival emitted by the drop-table pattern.
    ArchiveTable { table: String },
    Note,
}

/// One ordered step of a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanStep {
    pub description: String,
    pub sql: String,
    #[serde(default = "Operation::note")]
    pub operation: Operation,
    pub safety_level: SafetyLevel,
    pub breaking_change: bool,
    pub data_loss: bool,
    #[serde(default)]
    pub rollback_description: String,
    #[serde(default)]
    pub safer_alternatives: Vec<String>,
}

impl Operation {
    fn note() -> Operation {
        Operation::Note
    }
}

impl PlanStep {
    /// Comment-only steps document a dialect limitation and are skipped at
    /// both rehearsal and apply.
    pub fn is_comment_only(&self) -> bool {
        let trimmed = self.sql.trim();
        trimmed.is_empty() || trimmed.starts_with("--")
    }
}

/// An immutable ordered DDL plan with its source-state hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    /// SHA-256 of the canonicalized pre-state schema; empty when the plan
    /// was generated without one.
    #[serde(default)]
    pub source_hash: String,
    pub steps: Vec<PlanStep>,
}

impl Plan {
    pub fn new(source_hash: impl Into<String>) -> Self {
        Self {
            source_hash: source_hash.into(),
            steps: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Steps the executor will actually run.
    pub fn executable_steps(&self) -> impl Iterator<Item = (usize, &PlanStep)> + '_ {
        self.steps.iter().enumerate().filter(|(_, s)| !s.is_comment_only())
    }

    /// Highest safety level across all steps, `Safe` when empty.
    pub fn max_safety(&self) -> SafetyLevel {
        let mut max = SafetyLevel::Safe;
        for step in &self.steps {
            max = match (max, step.safety_level) {
                (_, SafetyLevel::MultiPhase) | (SafetyLevel::MultiPhase, _) => SafetyLevel::MultiPhase,
                (_, SafetyLevel::Dangerous) | (SafetyLevel::Dangerous, _) => SafetyLevel::Dangerous,
                (_, SafetyLevel::Lossy) | (SafetyLevel::Lossy, _) => SafetyLevel::Lossy,
                (_, SafetyLevel::Review) | (SafetyLevel::Review, _) => SafetyLevel::Review,
                _ => SafetyLevel::Safe,
            };
        }
        max
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Plan> {
        serde_json::from_str(json).context("invalid plan JSON")
    }
}

/// Multi-phase pattern discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhasePattern {
    ExpandContract,
    Deprecation,
    DropTable,
    Validation,
    TypeChange,
}

impl PhasePattern {
    pub fn as_str(self) -> &'static str {
        match self {
            PhasePattern::ExpandContract => "expand_contract",
            PhasePattern::Deprecation => "deprecation",
            PhasePattern::DropTable => "drop_table",
            PhasePattern::Validation => "validation",
            PhasePattern::TypeChange => "type_change",
        }
    }
}

impl fmt::Display for PhasePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One phase of a multi-phase plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phase {
    pub phase_number: u32,
    pub name: String,
    pub requires_code_deploy: bool,
    #[serde(default)]
    pub code_changes_required: Vec<String>,
    pub plan: Plan,
    /// SQL probes the caller can run between phases.
    #[serde(default)]
    pub verification: Vec<String>,
    /// Restores the database to its state before this phase.
    pub rollback: Plan,
}

/// A coordinated multi-phase migration with explicit code-deploy gates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiPhasePlan {
    /// Always `true` in the persisted form; distinguishes the file shape
    /// from a single plan.
    #[serde(default = "default_true")]
    pub multi_phase: bool,
    pub operation: String,
    pub pattern: PhasePattern,
    pub total_phases: u32,
    pub phases: Vec<Phase>,
}

fn default_true() -> bool {
    true
}

impl MultiPhasePlan {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<MultiPhasePlan> {
        serde_json::from_str(json).context("invalid multi-phase plan JSON")
    }

    pub fn phase(&self, number: u32) -> Option<&Phase> {
        self.phases.iter().find(|p| p.phase_number == number)
    }
}

/// Either file shape, distinguished by the `multi_phase` marker.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanDocument {
    Single(Plan),
    Multi(MultiPhasePlan),
}

impl PlanDocument {
    pub fn read(path: &Path) -> Result<PlanDocument> {
        let json = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let value: serde_json::Value = serde_json::from_str(&json).context("invalid plan JSON")?;
        if value.get("multi_phase").and_then(serde_json::Value::as_bool) == Some(true) {
            Ok(PlanDocument::Multi(MultiPhasePlan::from_json(&json)?))
        } else {
            Ok(PlanDocument::Single(Plan::from_json(&json)?))
        }
    }
}

/// Outcome of executing a plan against a target database.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionResult {
    pub success: bool,
    pub steps_applied: usize,
    pub errors: Vec<StepError>,
}

/// Structured failure record for a single step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepError {
    pub step_index: usize,
    pub description: String,
    pub detail: String,
}

impl ExecutionResult {
    pub fn succeeded(steps_applied: usize) -> Self {
        Self {
            success: true,
            steps_applied,
            errors: Vec::new(),
        }
    }

    pub fn failed(steps_applied: usize, error: StepError) -> Self {
        Self {
            success: false,
            steps_applied,
            errors: vec![error],
        }
    }
}
