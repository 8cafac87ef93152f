//! Inverse plan generation from a forward plan and the pre-state schema.
//!
//! Forward steps are visited in reverse; each is inverted by matching its
//! typed [`Operation`] tag, never by inspecting the SQL text. Objects a
//! forward step destroyed are reconstructed from the pre-state schema; when
//! the pre-state does not contain them the generation aborts with
//! [`LockplaneError::NotReversible`].
//!
//! The produced plan carries no source hash: it is meant to be applied to
//! whatever state the forward plan left behind, including a partially
//! deployed one the caller vouches for.

use crate::libs::dialect::{driver, SqlDialect};
use crate::libs::error::LockplaneError;
use crate::libs::plan::{Operation, Plan, PlanStep, SafetyLevel};
use crate::libs::planner::recreation_step_between;
use crate::libs::safety::{self, Classification};
use crate::libs::schema::{Column, ForeignKey, Index, Schema};

/// Builds the inverse of `plan` against `pre_state`.
pub fn build_rollback(plan: &Plan, pre_state: &Schema) -> Result<Plan, LockplaneError> {
    let sql = driver(pre_state.dialect);
    let mut rollback = Plan::new("");

    for (step_index, forward) in plan.steps.iter().enumerate().rev() {
        if let Some(inverse) = invert_step(step_index, forward, pre_state, sql)? {
            rollback.steps.extend(inverse);
        }
    }

    Ok(rollback)
}

fn not_reversible(step_index: usize, forward: &PlanStep, reason: impl Into<String>) -> LockplaneError {
    LockplaneError::NotReversible {
        step_index,
        description: forward.description.clone(),
        reason: reason.into(),
    }
}

fn step(description: String, sql: String, operation: Operation, classification: Classification) -> PlanStep {
    PlanStep {
        description,
        sql,
        operation,
        safety_level: classification.safety_level,
        breaking_change: classification.breaking_change,
        data_loss: classification.data_loss,
        rollback_description: classification.rollback_description,
        safer_alternatives: classification.safer_alternatives,
    }
}

fn pre_state_column<'a>(
    pre_state: &'a Schema,
    table: &str,
    column: &str,
    step_index: usize,
    forward: &PlanStep,
) -> Result<&'a Column, LockplaneError> {
    pre_state
        .table(table)
        .and_then(|t| t.column(column))
        .ok_or_else(|| not_reversible(step_index, forward, format!("pre-state has no column '{table}.{column}'")))
}

fn invert_step(
    step_index: usize,
    forward: &PlanStep,
    pre_state: &Schema,
    sql: &dyn SqlDialect,
) -> Result<Option<Vec<PlanStep>>, LockplaneError> {
    let dialect = pre_state.dialect;

    let inverted = match &forward.operation {
        Operation::Note | Operation::Backfill { .. } => None,

        Operation::CreateTable { table } => Some(vec![step(
            format!("Drop table '{table}' (undo create)"),
            sql.drop_table(table),
            Operation::DropTable { table: table.clone() },
            Classification {
                safety_level: SafetyLevel::Dangerous,
                breaking_change: true,
                data_loss: true,
                rollback_description: format!("re-create table '{table}'"),
                safer_alternatives: Vec::new(),
            },
        )]),

        Operation::DropTable { table } => {
            let definition = pre_state
                .table(table)
                .ok_or_else(|| not_reversible(step_index, forward, format!("pre-state has no table '{table}'")))?;
            let mut steps = vec![step(
                format!("Re-create table '{table}' from pre-state"),
                sql.create_table(definition),
                Operation::CreateTable { table: table.clone() },
                safety::classify_create_table(definition),
            )];
            for index in &definition.indexes {
                steps.push(step(
                    format!("Re-create index '{}' on '{table}'", index.name),
                    sql.add_index(table, index),
                    Operation::CreateIndex {
                        table: table.clone(),
                        index: index.name.clone(),
                    },
                    safety::classify_add_index(index, true),
                ));
            }
            if !dialect.is_sqlite_family() {
                for fk in &definition.foreign_keys {
                    steps.push(step(
                        format!("Re-add foreign key '{}' on '{table}'", fk.name),
                        sql.add_foreign_key(table, fk).sql_text().to_string(),
                        Operation::AddForeignKey {
                            table: table.clone(),
                            constraint: fk.name.clone(),
                        },
                        safety::classify_add_foreign_key(fk),
                    ));
                }
            }
            Some(steps)
        }

        Operation::AddColumn { table, column } => Some(vec![step(
            format!("Drop column '{column}' from '{table}' (undo add)"),
            sql.drop_column(table, column).sql_text().to_string(),
            Operation::DropColumn {
                table: table.clone(),
                column: column.clone(),
            },
            Classification {
                safety_level: SafetyLevel::Dangerous,
                breaking_change: true,
                data_loss: true,
                rollback_description: format!("re-add column '{column}'"),
                safer_alternatives: Vec::new(),
            },
        )]),

        Operation::DropColumn { table, column } => {
            let definition = pre_state_column(pre_state, table, column, step_index, forward)?;
            let emitted = sql.add_column(table, definition);
            if emitted.is_comment_only() {
                return Err(not_reversible(
                    step_index,
                    forward,
                    format!("{dialect} cannot re-add column '{table}.{column}' in its pre-state shape"),
                ));
            }
            Some(vec![step(
                format!("Re-create column '{column}' on '{table}' from pre-state"),
                emitted.sql_text().to_string(),
                Operation::AddColumn {
                    table: table.clone(),
                    column: column.clone(),
                },
                safety::classify_add_column(table, definition),
            )])
        }

        Operation::AlterColumnType { table, column, from, to } => {
            let definition = pre_state_column(pre_state, table, column, step_index, forward)?;
            let emitted = sql.alter_column_type(table, definition);
            if emitted.is_comment_only() {
                return Err(not_reversible(
                    step_index,
                    forward,
                    format!("{dialect} cannot alter '{table}.{column}' back to {from}"),
                ));
            }
            Some(vec![step(
                format!("Change type of '{table}.{column}' back to {from}"),
                emitted.sql_text().to_string(),
                Operation::AlterColumnType {
                    table: table.clone(),
                    column: column.clone(),
                    from: to.clone(),
                    to: from.clone(),
                },
                safety::classify_type_change(table, column, to, from),
            )])
        }

        Operation::SetNotNull { table, column } => Some(vec![step(
            format!("Drop NOT NULL on '{table}.{column}' (undo)"),
            sql.alter_column_nullable(table, column, true).sql_text().to_string(),
            Operation::DropNotNull {
                table: table.clone(),
                column: column.clone(),
            },
            safety::classify_drop_not_null(table, column),
        )]),

        Operation::DropNotNull { table, column } => {
            let definition = pre_state_column(pre_state, table, column, step_index, forward)?;
            Some(vec![step(
                format!("Re-add NOT NULL on '{table}.{column}'"),
                sql.alter_column_nullable(table, column, false).sql_text().to_string(),
                Operation::SetNotNull {
                    table: table.clone(),
                    column: column.clone(),
                },
                safety::classify_set_not_null(table, definition),
            )])
        }

        Operation::SetDefault { table, column, .. } | Operation::DropDefault { table, column } => {
            let definition = pre_state_column(pre_state, table, column, step_index, forward)?;
            let previous = definition.default_trimmed();
            let (description, operation) = match previous {
                Some(default) => (
                    format!("Restore default on '{table}.{column}'"),
                    Operation::SetDefault {
                        table: table.clone(),
                        column: column.clone(),
                        default: default.to_string(),
                    },
                ),
                None => (
                    format!("Drop default on '{table}.{column}' (undo)"),
                    Operation::DropDefault {
                        table: table.clone(),
                        column: column.clone(),
                    },
                ),
            };
            Some(vec![step(
                description,
                sql.alter_column_default(table, column, previous).sql_text().to_string(),
                operation,
                safety::classify_default_change(table, column, previous),
            )])
        }

        Operation::AddPrimaryKey { table, columns } => Some(vec![step(
            format!("Drop the primary key on '{table}' (undo)"),
            format!(
                "ALTER TABLE {} DROP CONSTRAINT {}",
                sql.quote_identifier(table),
                sql.quote_identifier(&format!("{table}_pkey"))
            ),
            Operation::DropPrimaryKey {
                table: table.clone(),
                columns: columns.clone(),
            },
            Classification::review(format!("re-add the primary key on '{table}'")),
        )]),

        Operation::DropPrimaryKey { table, columns } => {
            let quoted: Vec<String> = columns.iter().map(|c| sql.quote_identifier(c)).collect();
            Some(vec![step(
                format!("Re-add the primary key on '{table}'"),
                format!(
                    "ALTER TABLE {} ADD PRIMARY KEY ({})",
                    sql.quote_identifier(table),
                    quoted.join(", ")
                ),
                Operation::AddPrimaryKey {
                    table: table.clone(),
                    columns: columns.clone(),
                },
                Classification::review(format!("drop the primary key on '{table}'")),
            )])
        }

        Operation::CreateIndex { table, index } => {
            let named = Index {
                name: index.clone(),
                columns: Vec::new(),
                unique: false,
            };
            Some(vec![step(
                format!("Drop index '{index}' (undo create)"),
                sql.drop_index(table, &named),
                Operation::DropIndex {
                    table: table.clone(),
                    index: index.clone(),
                },
                safety::classify_drop_index(&named),
            )])
        }

        Operation::DropIndex { table, index } => {
            let definition = pre_state
                .table(table)
                .and_then(|t| t.index(index))
                .ok_or_else(|| not_reversible(step_index, forward, format!("pre-state has no index '{index}'")))?;
            Some(vec![step(
                format!("Re-create index '{index}' on '{table}' from pre-state"),
                sql.add_index(table, definition),
                Operation::CreateIndex {
                    table: table.clone(),
                    index: index.clone(),
                },
                safety::classify_add_index(definition, false),
            )])
        }

        Operation::AddForeignKey { table, constraint } => {
            let named = ForeignKey {
                name: constraint.clone(),
                columns: Vec::new(),
                referenced_table: String::new(),
                referenced_columns: Vec::new(),
                on_delete: None,
                on_update: None,
            };
            let emitted = sql.drop_foreign_key(table, &named);
            if emitted.is_comment_only() {
                return Err(not_reversible(
                    step_index,
                    forward,
                    format!("{dialect} cannot drop constraint '{constraint}' directly"),
                ));
            }
            Some(vec![step(
                format!("Drop foreign key '{constraint}' on '{table}' (undo add)"),
                emitted.sql_text().to_string(),
                Operation::DropForeignKey {
                    table: table.clone(),
                    constraint: constraint.clone(),
                },
                safety::classify_drop_foreign_key(&named),
            )])
        }

        Operation::DropForeignKey { table, constraint } => {
            let definition = pre_state
                .table(table)
                .and_then(|t| t.foreign_key(constraint))
                .ok_or_else(|| {
                    not_reversible(step_index, forward, format!("pre-state has no foreign key '{constraint}'"))
                })?;
            let emitted = sql.add_foreign_key(table, definition);
            if emitted.is_comment_only() {
                return Err(not_reversible(
                    step_index,
                    forward,
                    format!("{dialect} cannot re-add constraint '{constraint}' directly"),
                ));
            }
            Some(vec![step(
                format!("Re-add foreign key '{constraint}' on '{table}' from pre-state"),
                emitted.sql_text().to_string(),
                Operation::AddForeignKey {
                    table: table.clone(),
                    constraint: constraint.clone(),
                },
                safety::classify_add_foreign_key(definition),
            )])
        }

        Operation::RecreateTable { table, before, after } => Some(vec![recreation_step_between(
            after,
            before,
            dialect,
            format!("Recreate table '{table}' back to its pre-state shape"),
        )]),

        Operation::ArchiveTable { table } => Some(vec![step(
            format!("Drop archive table '{table}__archive'"),
            sql.drop_table(&format!("{table}__archive")),
            Operation::DropTable {
                table: format!("{table}__archive"),
            },
            Classification {
                safety_level: SafetyLevel::Dangerous,
                breaking_change: false,
                data_loss: true,
                rollback_description: format!("re-archive rows from '{table}'"),
                safer_alternatives: Vec::new(),
            },
        )]),
    };

    Ok(inverted)
}
