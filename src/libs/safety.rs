//! Safety classification of diff operations and diff-level validation.
//!
//! Every conceptual operation implied by a diff gets a [`Classification`]:
//! a safety level, breaking/data-loss flags, a description of what rolling
//! the operation back would mean, and concrete safer alternatives for
//! dangerous operations phrased as multi-phase recipes.
//!
//! The validators reject diffs the planner must never emit: a `NOT NULL`
//! column added without a default, and foreign keys whose target does not
//! exist in the desired schema.

use crate::libs::differ::{ColumnChange, SchemaDiff};
use crate::libs::error::LockplaneError;
use crate::libs::plan::SafetyLevel;
use crate::libs::schema::{Column, ForeignKey, Index, Schema, Table};
use crate::libs::types::LogicalType;

/// Safety verdict for one operation.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub safety_level: SafetyLevel,
    pub breaking_change: bool,
    pub data_loss: bool,
    pub rollback_description: String,
    pub safer_alternatives: Vec<String>,
}

impl Classification {
    pub fn safe(rollback: impl Into<String>) -> Self {
        Self {
            safety_level: SafetyLevel::Safe,
            breaking_change: false,
            data_loss: false,
            rollback_description: rollback.into(),
            safer_alternatives: Vec::new(),
        }
    }

    pub fn review(rollback: impl Into<String>) -> Self {
        Self {
            safety_level: SafetyLevel::Review,
            breaking_change: false,
            data_loss: false,
            rollback_description: rollback.into(),
            safer_alternatives: Vec::new(),
        }
    }

    /// The more severe of two classifications; alternatives accumulate.
    pub fn merge(mut self, other: Classification) -> Classification {
        if severity(other.safety_level) > severity(self.safety_level) {
            self.safety_level = other.safety_level;
        }
        self.breaking_change |= other.breaking_change;
        self.data_loss |= other.data_loss;
        for alternative in other.safer_alternatives {
            if !self.safer_alternatives.contains(&alternative) {
                self.safer_alternatives.push(alternative);
            }
        }
        self
    }
}

fn severity(level: SafetyLevel) -> u8 {
    match level {
        SafetyLevel::Safe => 0,
        SafetyLevel::Review => 1,
        SafetyLevel::Lossy => 2,
        SafetyLevel::Dangerous => 3,
        SafetyLevel::MultiPhase => 4,
    }
}

pub fn classify_create_table(table: &Table) -> Classification {
    Classification::safe(format!("drop table '{}' (created empty, no data loss)", table.name))
}

pub fn classify_drop_table(table: &Table) -> Classification {
    Classification {
        safety_level: SafetyLevel::Dangerous,
        breaking_change: true,
        data_loss: true,
        rollback_description: format!(
            "re-create table '{}' from the pre-state definition; row data is not recoverable",
            table.name
        ),
        safer_alternatives: vec![format!(
            "expand/contract: stop writes to '{0}' → archive rows to '{0}__archive' → stop reads → drop",
            table.name
        )],
    }
}

pub fn classify_add_column(table: &str, column: &Column) -> Classification {
    if !column.nullable && column.default_trimmed().is_none() {
        return Classification {
            safety_level: SafetyLevel::Dangerous,
            breaking_change: true,
            data_loss: false,
            rollback_description: format!("drop column '{}' (no data loss)", column.name),
            safer_alternatives: vec![format!(
                "validation pattern: add '{0}' nullable → backfill → add NOT NULL",
                column.name
            )],
        };
    }
    Classification::safe(format!("drop column '{}' from '{}' (no data loss)", column.name, table))
}

pub fn classify_drop_column(table: &str, column: &Column) -> Classification {
    Classification {
        safety_level: SafetyLevel::Dangerous,
        breaking_change: true,
        data_loss: true,
        rollback_description: format!(
            "re-create column '{}' on '{}' from the pre-state definition; column data is not recoverable",
            column.name, table
        ),
        safer_alternatives: vec![format!(
            "expand/contract: stop writes to '{0}' → migrate reads → deploy → drop '{0}'",
            column.name
        )],
    }
}

pub fn classify_type_change(table: &str, column: &str, from: &LogicalType, to: &LogicalType) -> Classification {
    if from.widens_to(to) {
        return Classification {
            safety_level: SafetyLevel::Lossy,
            breaking_change: false,
            data_loss: false,
            rollback_description: format!(
                "narrow '{column}' on '{table}' back to {from}; values outside the old range would be truncated (rollback loses data)"
            ),
            safer_alternatives: Vec::new(),
        };
    }
    if to.widens_to(from) || from.castable_to(to) {
        return Classification {
            safety_level: SafetyLevel::Dangerous,
            breaking_change: true,
            data_loss: true,
            rollback_description: format!("widen '{column}' on '{table}' back to {from}"),
            safer_alternatives: vec![format!(
                "expand/contract: add a new {to} column → dual-write with explicit cast → migrate reads → drop '{column}'"
            )],
        };
    }
    Classification {
        safety_level: SafetyLevel::MultiPhase,
        breaking_change: true,
        data_loss: true,
        rollback_description: format!(
            "no single-step inverse from {to} to {from}; requires the type-change multi-phase pattern"
        ),
        safer_alternatives: vec![format!(
            "type change pattern: add a new {to} column → deploy dual-writing code → drop '{column}'"
        )],
    }
}

pub fn classify_set_not_null(table: &str, column: &Column) -> Classification {
    if column.default_trimmed().is_some() {
        return Classification::review(format!("drop NOT NULL on '{}' of '{}'", column.name, table));
    }
    Classification {
        safety_level: SafetyLevel::Dangerous,
        breaking_change: true,
        data_loss: false,
        rollback_description: format!("drop NOT NULL on '{}' of '{}'", column.name, table),
        safer_alternatives: vec![format!(
            "validation pattern: backfill '{}' → verify no NULLs remain → add NOT NULL",
            column.name
        )],
    }
}

pub fn classify_drop_not_null(table: &str, column: &str) -> Classification {
    Classification::safe(format!("re-add NOT NULL on '{column}' of '{table}'"))
}

pub fn classify_default_change(table: &str, column: &str, old: Option<&str>) -> Classification {
    let rollback = match old {
        Some(previous) => format!("restore default {previous} on '{column}' of '{table}'"),
        None => format!("drop the default on '{column}' of '{table}'"),
    };
    Classification::safe(rollback)
}

pub fn classify_add_index(index: &Index, table_is_new: bool) -> Classification {
    if index.unique && !table_is_new {
        let mut classification = Classification::review(format!("drop index '{}'", index.name));
        classification.breaking_change = true;
        classification
            .safer_alternatives
            .push(format!("verify no duplicate values exist before creating unique index '{}'", index.name));
        return classification;
    }
    Classification::safe(format!("drop index '{}'", index.name))
}

pub fn classify_drop_index(index: &Index) -> Classification {
    Classification::safe(format!("re-create index '{}' from the pre-state definition", index.name))
}

pub fn classify_add_foreign_key(fk: &ForeignKey) -> Classification {
    Classification::review(format!("drop constraint '{}'", fk.name))
}

pub fn classify_drop_foreign_key(fk: &ForeignKey) -> Classification {
    Classification::review(format!("re-add constraint '{}' from the pre-state definition", fk.name))
}

/// Rejects diff content the planner must never emit.
///
/// Collects every violation before returning, mirroring the parser's
/// collect-then-fail behavior.
pub fn validate_diff(diff: &SchemaDiff, target: &Schema) -> Result<(), LockplaneError> {
    let mut issues = Vec::new();

    for table_diff in &diff.modified_tables {
        for column in &table_diff.added_columns {
            if !column.nullable && column.default_trimmed().is_none() {
                issues.push(format!(
                    "column '{}.{}' is NOT NULL without a DEFAULT; existing rows cannot satisfy it (use the validation pattern: add nullable, backfill, then constrain)",
                    table_diff.table_name, column.name
                ));
            }
        }
        for fk in &table_diff.added_foreign_keys {
            validate_foreign_key(&table_diff.table_name, fk, target, &mut issues);
        }
    }

    for table in &diff.added_tables {
        for fk in &table.foreign_keys {
            validate_foreign_key(&table.name, fk, target, &mut issues);
        }
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(LockplaneError::ValidationFailed { issues })
    }
}

fn validate_foreign_key(table: &str, fk: &ForeignKey, target: &Schema, issues: &mut Vec<String>) {
    if fk.columns.len() != fk.referenced_columns.len() {
        issues.push(format!(
            "foreign key '{}' on '{}' has {} local column(s) but {} referenced column(s)",
            fk.name,
            table,
            fk.columns.len(),
            fk.referenced_columns.len()
        ));
        return;
    }

    let Some(local_table) = target.table(table) else {
        issues.push(format!("foreign key '{}' belongs to unknown table '{}'", fk.name, table));
        return;
    };
    for column in &fk.columns {
        if local_table.column(column).is_none() {
            issues.push(format!(
                "foreign key '{}' on '{}' references missing local column '{}'",
                fk.name, table, column
            ));
        }
    }

    let Some(referenced) = target.table(&fk.referenced_table) else {
        issues.push(format!(
            "foreign key '{}' on '{}' references missing table '{}'",
            fk.name, table, fk.referenced_table
        ));
        return;
    };
    for column in &fk.referenced_columns {
        if referenced.column(column).is_none() {
            issues.push(format!(
                "foreign key '{}' on '{}' references missing column '{}.{}'",
                fk.name, table, fk.referenced_table, column
            ));
        }
    }
}

/// Column-change dimensions that force a table recreation on dialects
/// without a direct `ALTER` form.
pub fn needs_recreation_changes(changes: &[ColumnChange]) -> bool {
    changes
        .iter()
        .any(|c| matches!(c, ColumnChange::Type | ColumnChange::Nullable | ColumnChange::Default | ColumnChange::PrimaryKey))
}
