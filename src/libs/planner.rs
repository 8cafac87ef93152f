//! Step ordering and SQL emission: turns a diff into an executable plan.
//!
//! The ordering contract:
//!
//! 1. Added tables first: `CREATE TABLE` and the table's indexes, then a
//!    second pass adds foreign keys once every new table exists, so no
//!    statement ever references a table that has not been created yet.
//! 2. Modified tables, per table: add columns, modify columns, add foreign
//!    keys, add indexes, drop indexes, drop foreign keys, drop columns.
//! 3. Removed tables last, with cascade semantics where the dialect has them.
//!
//! Within any list the planner iterates in differ order (which is source
//! schema order) and never reorders. When a SQLite-family emitter returns a
//! comment-only stub for a change, the whole table's modification collapses
//! into one atomic table-recreation step.

use crate::libs::dialect::{driver, Emitted, SqlDialect};
use crate::libs::differ::{ColumnChange, ColumnDiff, SchemaDiff, TableDiff};
use crate::libs::error::LockplaneError;
use crate::libs::hash::compute_schema_hash;
use crate::libs::plan::{Operation, Plan, PlanStep, SafetyLevel};
use crate::libs::safety::{self, Classification};
use crate::libs::schema::{ForeignKey, Index, Schema, Table};
use crate::libs::types::{render_type, Dialect};

/// Builds the forward plan for `diff`, stamping it with the pre-state hash.
///
/// `target` is the desired schema; it supplies the post-change table shapes
/// for recreation steps and the referential context for validation.
///
/// # Errors
///
/// Returns [`LockplaneError::ValidationFailed`] when the diff contains
/// operations the planner refuses to emit.
pub fn build_plan(
    diff: &SchemaDiff,
    pre_state: &Schema,
    target: &Schema,
    dialect: Dialect,
) -> Result<Plan, LockplaneError> {
    if diff.is_empty() {
        return Err(LockplaneError::DiffEmpty);
    }
    safety::validate_diff(diff, target)?;

    let sql = driver(dialect);
    let mut plan = Plan::new(compute_schema_hash(Some(pre_state)));

    // Pass 1: added tables with their indexes.
    for table in &diff.added_tables {
        plan.steps.push(create_table_step(table, sql));
        for index in &table.indexes {
            let classification = safety::classify_add_index(index, true);
            plan.steps.push(step(
                format!("Create index '{}' on '{}'", index.name, table.name),
                sql.add_index(&table.name, index),
                Operation::CreateIndex {
                    table: table.name.clone(),
                    index: index.name.clone(),
                },
                classification,
            ));
        }
    }

    // Pass 2: foreign keys of added tables, after every new table exists.
    // SQLite-family tables carry their foreign keys inline in CREATE TABLE.
    if !dialect.is_sqlite_family() {
        for table in &diff.added_tables {
            for fk in &table.foreign_keys {
                let classification = safety::classify_add_foreign_key(fk);
                plan.steps.push(step(
                    format!("Add foreign key '{}' on '{}'", fk.name, table.name),
                    emitted_sql(sql.add_foreign_key(&table.name, fk)),
                    Operation::AddForeignKey {
                        table: table.name.clone(),
                        constraint: fk.name.clone(),
                    },
                    classification,
                ));
            }
        }
    }

    // Pass 3: modified tables.
    for table_diff in &diff.modified_tables {
        let before = pre_state
            .table(&table_diff.table_name)
            .ok_or_else(|| LockplaneError::ValidationFailed {
                issues: vec![format!("modified table '{}' missing from pre-state", table_diff.table_name)],
            })?;
        let after = target
            .table(&table_diff.table_name)
            .ok_or_else(|| LockplaneError::ValidationFailed {
                issues: vec![format!("modified table '{}' missing from target", table_diff.table_name)],
            })?;

        if dialect.is_sqlite_family() && requires_recreation(table_diff, sql) {
            plan.steps.push(recreation_step(before, after, table_diff, sql));
            continue;
        }

        emit_table_modifications(&mut plan, table_diff, sql);
    }

    // Pass 4: removed tables last.
    for table in &diff.removed_tables {
        let classification = safety::classify_drop_table(table);
        plan.steps.push(step(
            format!("Drop table '{}'", table.name),
            sql.drop_table(&table.name),
            Operation::DropTable { table: table.name.clone() },
            classification,
        ));
    }

    Ok(plan)
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

fn create_table_step(table: &Table, sql: &dyn SqlDialect) -> PlanStep {
    let classification = safety::classify_create_table(table);
    step(
        format!("Create table '{}'", table.name),
        sql.create_table(table),
        Operation::CreateTable { table: table.name.clone() },
        classification,
    )
}

fn emitted_sql(emitted: Emitted) -> String {
    emitted.sql_text().to_string()
}

/// Whether any change on this table forces the recreation protocol.
fn requires_recreation(table_diff: &TableDiff, sql: &dyn SqlDialect) -> bool {
    if !table_diff.added_foreign_keys.is_empty() || !table_diff.removed_foreign_keys.is_empty() {
        return true;
    }
    if table_diff
        .modified_columns
        .iter()
        .any(|c| safety::needs_recreation_changes(&c.changes))
    {
        return true;
    }
    table_diff
        .added_columns
        .iter()
        .any(|c| sql.add_column(&table_diff.table_name, c).is_comment_only())
}

/// Direct (non-recreation) emission for a modified table.
fn emit_table_modifications(plan: &mut Plan, table_diff: &TableDiff, sql: &dyn SqlDialect) {
    let table = &table_diff.table_name;

    for column in &table_diff.added_columns {
        let classification = safety::classify_add_column(table, column);
        plan.steps.push(step(
            format!("Add column '{}' to '{}'", column.name, table),
            emitted_sql(sql.add_column(table, column)),
            Operation::AddColumn {
                table: table.clone(),
                column: column.name.clone(),
            },
            classification,
        ));
    }

    for column_diff in &table_diff.modified_columns {
        emit_column_modifications(plan, table, column_diff, sql);
    }

    // An index or constraint replaced in place keeps its name; its drop must
    // run before the re-create even though drops otherwise come last.
    let replaced_index = |name: &str| table_diff.added_indexes.iter().any(|idx| idx.name == name);
    let replaced_fk = |name: &str| table_diff.added_foreign_keys.iter().any(|fk| fk.name == name);

    for fk in &table_diff.added_foreign_keys {
        if let Some(old) = table_diff.removed_foreign_keys.iter().find(|old| old.name == fk.name) {
            plan.steps.push(drop_foreign_key_step(table, old, sql));
        }
        let classification = safety::classify_add_foreign_key(fk);
        plan.steps.push(step(
            format!("Add foreign key '{}' on '{}'", fk.name, table),
            emitted_sql(sql.add_foreign_key(table, fk)),
            Operation::AddForeignKey {
                table: table.clone(),
                constraint: fk.name.clone(),
            },
            classification,
        ));
    }

    for index in &table_diff.added_indexes {
        if let Some(old) = table_diff.removed_indexes.iter().find(|old| old.name == index.name) {
            plan.steps.push(drop_index_step(table, old, sql));
        }
        let classification = safety::classify_add_index(index, false);
        plan.steps.push(step(
            format!("Create index '{}' on '{}'", index.name, table),
            sql.add_index(table, index),
            Operation::CreateIndex {
                table: table.clone(),
                index: index.name.clone(),
            },
            classification,
        ));
    }

    for index in &table_diff.removed_indexes {
        if replaced_index(&index.name) {
            continue;
        }
        plan.steps.push(drop_index_step(table, index, sql));
    }

    for fk in &table_diff.removed_foreign_keys {
        if replaced_fk(&fk.name) {
            continue;
        }
        plan.steps.push(drop_foreign_key_step(table, fk, sql));
    }

    for column in &table_diff.removed_columns {
        let classification = safety::classify_drop_column(table, column);
        plan.steps.push(step(
            format!("Drop column '{}' from '{}'", column.name, table),
            emitted_sql(sql.drop_column(table, &column.name)),
            Operation::DropColumn {
                table: table.clone(),
                column: column.name.clone(),
            },
            classification,
        ));
    }
}

fn drop_index_step(table: &str, index: &Index, sql: &dyn SqlDialect) -> PlanStep {
    step(
        format!("Drop index '{}' on '{}'", index.name, table),
        sql.drop_index(table, index),
        Operation::DropIndex {
            table: table.to_string(),
            index: index.name.clone(),
        },
        safety::classify_drop_index(index),
    )
}

fn drop_foreign_key_step(table: &str, fk: &ForeignKey, sql: &dyn SqlDialect) -> PlanStep {
    step(
        format!("Drop foreign key '{}' on '{}'", fk.name, table),
        emitted_sql(sql.drop_foreign_key(table, fk)),
        Operation::DropForeignKey {
            table: table.to_string(),
            constraint: fk.name.clone(),
        },
        safety::classify_drop_foreign_key(fk),
    )
}

fn emit_column_modifications(plan: &mut Plan, table: &str, column_diff: &ColumnDiff, sql: &dyn SqlDialect) {
    let column = &column_diff.column_name;

    for change in &column_diff.changes {
        match change {
            ColumnChange::Type => {
                let classification = safety::classify_type_change(
                    table,
                    column,
                    &column_diff.old.logical_type,
                    &column_diff.new.logical_type,
                );
                plan.steps.push(step(
                    format!(
                        "Change type of '{}.{}' from {} to {}",
                        table, column, column_diff.old.logical_type, column_diff.new.logical_type
                    ),
                    emitted_sql(sql.alter_column_type(table, &column_diff.new)),
                    Operation::AlterColumnType {
                        table: table.to_string(),
                        column: column.clone(),
                        from: column_diff.old.logical_type.clone(),
                        to: column_diff.new.logical_type.clone(),
                    },
                    classification,
                ));
            }
            ColumnChange::Nullable => {
                if column_diff.new.nullable {
                    let classification = safety::classify_drop_not_null(table, column);
                    plan.steps.push(step(
                        format!("Drop NOT NULL on '{table}.{column}'"),
                        emitted_sql(sql.alter_column_nullable(table, column, true)),
                        Operation::DropNotNull {
                            table: table.to_string(),
                            column: column.clone(),
                        },
                        classification,
                    ));
                } else {
                    let classification = safety::classify_set_not_null(table, &column_diff.new);
                    plan.steps.push(step(
                        format!("Set NOT NULL on '{table}.{column}'"),
                        emitted_sql(sql.alter_column_nullable(table, column, false)),
                        Operation::SetNotNull {
                            table: table.to_string(),
                            column: column.clone(),
                        },
                        classification,
                    ));
                }
            }
            ColumnChange::Default => {
                let classification =
                    safety::classify_default_change(table, column, column_diff.old.default_trimmed());
                match column_diff.new.default_trimmed() {
                    Some(default) => {
                        plan.steps.push(step(
                            format!("Set default on '{table}.{column}'"),
                            emitted_sql(sql.alter_column_default(table, column, Some(default))),
                            Operation::SetDefault {
                                table: table.to_string(),
                                column: column.clone(),
                                default: default.to_string(),
                            },
                            classification,
                        ));
                    }
                    None => {
                        plan.steps.push(step(
                            format!("Drop default on '{table}.{column}'"),
                            emitted_sql(sql.alter_column_default(table, column, None)),
                            Operation::DropDefault {
                                table: table.to_string(),
                                column: column.clone(),
                            },
                            classification,
                        ));
                    }
                }
            }
            ColumnChange::PrimaryKey => {
                if column_diff.new.is_primary_key {
                    let mut classification =
                        Classification::review(format!("drop the primary key on '{table}'"));
                    classification.breaking_change = true;
                    plan.steps.push(step(
                        format!("Add '{column}' to the primary key of '{table}'"),
                        format!(
                            "ALTER TABLE {} ADD PRIMARY KEY ({})",
                            sql.quote_identifier(table),
                            sql.quote_identifier(column)
                        ),
                        Operation::AddPrimaryKey {
                            table: table.to_string(),
                            columns: vec![column.clone()],
                        },
                        classification,
                    ));
                } else {
                    let classification = Classification::review(format!(
                        "re-add the primary key ({column}) on '{table}'"
                    ));
                    plan.steps.push(step(
                        format!("Drop '{column}' from the primary key of '{table}'"),
                        format!(
                            "ALTER TABLE {} DROP CONSTRAINT {}",
                            sql.quote_identifier(table),
                            sql.quote_identifier(&format!("{table}_pkey"))
                        ),
                        Operation::DropPrimaryKey {
                            table: table.to_string(),
                            columns: vec![column.clone()],
                        },
                        classification,
                    ));
                }
            }
        }
    }
}

/// Builds the single atomic recreation step for a SQLite-family table whose
/// modifications exceed the dialect's `ALTER` surface.
fn recreation_step(before: &Table, after: &Table, table_diff: &TableDiff, sql: &dyn SqlDialect) -> PlanStep {
    let classification = recreation_classification(table_diff);
    let mut summary: Vec<String> = Vec::new();
    for column in &table_diff.added_columns {
        summary.push(format!("add '{}'", column.name));
    }
    for column_diff in &table_diff.modified_columns {
        summary.push(format!("modify '{}'", column_diff.column_name));
    }
    for fk in &table_diff.added_foreign_keys {
        summary.push(format!("add fk '{}'", fk.name));
    }
    for fk in &table_diff.removed_foreign_keys {
        summary.push(format!("drop fk '{}'", fk.name));
    }
    for column in &table_diff.removed_columns {
        summary.push(format!("drop '{}'", column.name));
    }

    PlanStep {
        description: format!("Recreate table '{}' to {}", before.name, summary.join(", ")),
        sql: recreation_sql(before, after, sql),
        operation: Operation::RecreateTable {
            table: before.name.clone(),
            before: before.clone(),
            after: after.clone(),
        },
        safety_level: classification.safety_level,
        breaking_change: classification.breaking_change,
        data_loss: classification.data_loss,
        rollback_description: format!("recreate table '{}' back to its pre-state shape", before.name),
        safer_alternatives: classification.safer_alternatives,
    }
}

fn recreation_classification(table_diff: &TableDiff) -> Classification {
    let table = &table_diff.table_name;
    let mut classification = Classification::review(format!("recreate '{table}' in its pre-state shape"));
    for column in &table_diff.added_columns {
        classification = classification.merge(safety::classify_add_column(table, column));
    }
    for column_diff in &table_diff.modified_columns {
        for change in &column_diff.changes {
            let merged = match change {
                ColumnChange::Type => safety::classify_type_change(
                    table,
                    &column_diff.column_name,
                    &column_diff.old.logical_type,
                    &column_diff.new.logical_type,
                ),
                ColumnChange::Nullable if !column_diff.new.nullable => {
                    safety::classify_set_not_null(table, &column_diff.new)
                }
                ColumnChange::Nullable => safety::classify_drop_not_null(table, &column_diff.column_name),
                ColumnChange::Default => safety::classify_default_change(
                    table,
                    &column_diff.column_name,
                    column_diff.old.default_trimmed(),
                ),
                ColumnChange::PrimaryKey => Classification::review("primary key membership changes"),
            };
            classification = classification.merge(merged);
        }
    }
    for column in &table_diff.removed_columns {
        classification = classification.merge(safety::classify_drop_column(table, column));
    }
    for fk in &table_diff.added_foreign_keys {
        classification = classification.merge(safety::classify_add_foreign_key(fk));
    }
    for fk in &table_diff.removed_foreign_keys {
        classification = classification.merge(safety::classify_drop_foreign_key(fk));
    }
    classification
}

/// Renders the five-part recreation protocol as one multi-statement batch.
/// The executor runs the batch inside the enclosing transaction.
pub fn recreation_sql(before: &Table, after: &Table, sql: &dyn SqlDialect) -> String {
    let staging = format!("{}__new", after.name);
    let mut staged = after.clone();
    staged.name = staging.clone();

    let mut statements = vec![sql.create_table(&staged)];

    let target_columns: Vec<String> = after.columns.iter().map(|c| sql.quote_identifier(&c.name)).collect();
    let projection: Vec<String> = after
        .columns
        .iter()
        .map(|column| match before.column(&column.name) {
            Some(old) => {
                let mut expr = sql.quote_identifier(&column.name);
                if old.logical_type != column.logical_type {
                    expr = format!("CAST({} AS {})", expr, render_type(&column.logical_type, sql.dialect()));
                }
                if old.nullable && !column.nullable {
                    if let Some(default) = column.default_trimmed() {
                        expr = format!("COALESCE({expr}, {default})");
                    }
                }
                expr
            }
            None => column.default_trimmed().unwrap_or("NULL").to_string(),
        })
        .collect();

    statements.push(format!(
        "INSERT INTO {} ({}) SELECT {} FROM {}",
        sql.quote_identifier(&staging),
        target_columns.join(", "),
        projection.join(", "),
        sql.quote_identifier(&before.name)
    ));
    statements.push(sql.drop_table(&before.name));
    statements.push(format!(
        "ALTER TABLE {} RENAME TO {}",
        sql.quote_identifier(&staging),
        sql.quote_identifier(&after.name)
    ));
    for index in &after.indexes {
        statements.push(sql.add_index(&after.name, index));
    }

    let mut batch = statements.join(";\n");
    batch.push(';');
    batch
}

/// A recreation step used outside the planner (rollback of a recreation).
pub fn recreation_step_between(before: &Table, after: &Table, dialect: Dialect, description: String) -> PlanStep {
    let sql = driver(dialect);
    PlanStep {
        description,
        sql: recreation_sql(before, after, sql),
        operation: Operation::RecreateTable {
            table: after.name.clone(),
            before: before.clone(),
            after: after.clone(),
        },
        safety_level: SafetyLevel::Review,
        breaking_change: false,
        data_loss: false,
        rollback_description: format!("recreate table '{}' in its other shape", after.name),
        safer_alternatives: Vec::new(),
    }
}
