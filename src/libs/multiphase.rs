//! Multi-phase plan composition for changes that are unsafe in one step.
//!
//! Each pattern expands a single conceptual operation into coordinated
//! phases with explicit code-deploy gates. Every phase carries its own
//! forward plan, a rollback plan sufficient to restore the state before
//! that phase, and verification SQL the caller can run between phases.
//!
//! ## Patterns
//!
//! - **expand_contract**: rename or compatible type change (add + backfill,
//!   dual-write deploy, drop old)
//! - **deprecation**: document intent, remove writes, drop
//! - **drop_table**: archive, stop writes, stop reads, drop
//! - **validation**: add nullable, backfill, add the constraint
//! - **type_change**: incompatible retype via a parallel column

use crate::libs::dialect::{driver, SqlDialect};
use crate::libs::error::LockplaneError;
use crate::libs::plan::{MultiPhasePlan, Operation, Phase, PhasePattern, Plan, PlanStep, SafetyLevel};
use crate::libs::planner::recreation_step_between;
use crate::libs::safety::{self, Classification};
use crate::libs::schema::{Column, Schema, Table};
use crate::libs::types::{render_type, LogicalType};

fn missing(issue: String) -> LockplaneError {
    LockplaneError::ValidationFailed { issues: vec![issue] }
}

fn lookup_column<'a>(schema: &'a Schema, table: &str, column: &str) -> Result<(&'a Table, &'a Column), LockplaneError> {
    let table_def = schema
        .table(table)
        .ok_or_else(|| missing(format!("table '{table}' does not exist in the current schema")))?;
    let column_def = table_def
        .column(column)
        .ok_or_else(|| missing(format!("column '{table}.{column}' does not exist in the current schema")))?;
    Ok((table_def, column_def))
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

fn note_step(text: &str) -> PlanStep {
    PlanStep {
        description: text.to_string(),
        sql: format!("-- {text}"),
        operation: Operation::Note,
        safety_level: SafetyLevel::Safe,
        breaking_change: false,
        data_loss: false,
        rollback_description: String::new(),
        safer_alternatives: Vec::new(),
    }
}

fn backfill_step(sql: &dyn SqlDialect, table: &str, target: &str, source_expr: &str) -> PlanStep {
    let statement = format!(
        "UPDATE {} SET {} = {} WHERE {} IS NULL",
        sql.quote_identifier(table),
        sql.quote_identifier(target),
        source_expr,
        sql.quote_identifier(target)
    );
    PlanStep {
        description: format!("Backfill '{table}.{target}'"),
        sql: statement,
        operation: Operation::Backfill {
            table: table.to_string(),
            column: target.to_string(),
        },
        safety_level: SafetyLevel::Safe,
        breaking_change: false,
        data_loss: false,
        rollback_description: format!("backfilled values remain in '{target}' until the column is dropped"),
        safer_alternatives: Vec::new(),
    }
}

fn add_column_step(sql: &dyn SqlDialect, table: &str, column: &Column) -> PlanStep {
    step(
        format!("Add column '{}' to '{}'", column.name, table),
        sql.add_column(table, column).sql_text().to_string(),
        Operation::AddColumn {
            table: table.to_string(),
            column: column.name.clone(),
        },
        safety::classify_add_column(table, column),
    )
}

fn drop_column_step(sql: &dyn SqlDialect, table: &str, column: &Column) -> PlanStep {
    step(
        format!("Drop column '{}' from '{}'", column.name, table),
        sql.drop_column(table, &column.name).sql_text().to_string(),
        Operation::DropColumn {
            table: table.to_string(),
            column: column.name.clone(),
        },
        safety::classify_drop_column(table, column),
    )
}

fn null_count_probe(sql: &dyn SqlDialect, table: &str, column: &str) -> String {
    format!(
        "SELECT COUNT(*) FROM {} WHERE {} IS NULL",
        sql.quote_identifier(table),
        sql.quote_identifier(column)
    )
}

fn plan_of(steps: Vec<PlanStep>) -> Plan {
    Plan {
        source_hash: String::new(),
        steps,
    }
}

/// Rename a column via expand/contract.
///
/// Phase 1 adds the new column and backfills it from the old one; phase 2
/// is a code deploy that reads from the new column and writes to both;
/// phase 3 drops the old column.
pub fn expand_contract_rename(
    schema: &Schema,
    table: &str,
    old_name: &str,
    new_name: &str,
) -> Result<MultiPhasePlan, LockplaneError> {
    let (table_def, old_column) = lookup_column(schema, table, old_name)?;
    if table_def.column(new_name).is_some() {
        return Err(missing(format!("column '{table}.{new_name}' already exists")));
    }
    let sql = driver(schema.dialect);

    // The replacement starts nullable so existing rows are representable
    // before the backfill runs.
    let mut new_column = old_column.clone();
    new_column.name = new_name.to_string();
    new_column.nullable = true;
    new_column.is_primary_key = false;

    let expand = plan_of(vec![
        add_column_step(sql, table, &new_column),
        backfill_step(sql, table, new_name, &sql.quote_identifier(old_name)),
    ]);
    let expand_rollback = plan_of(vec![drop_column_step(sql, table, &new_column)]);

    let contract = plan_of(vec![drop_column_step(sql, table, old_column)]);
    let mut restored = old_column.clone();
    restored.nullable = true;
    let contract_rollback = plan_of(vec![
        add_column_step(sql, table, &restored),
        backfill_step(sql, table, old_name, &sql.quote_identifier(new_name)),
    ]);

    Ok(MultiPhasePlan {
        multi_phase: true,
        operation: format!("rename {table}.{old_name} -> {table}.{new_name}"),
        pattern: PhasePattern::ExpandContract,
        total_phases: 3,
        phases: vec![
            Phase {
                phase_number: 1,
                name: "expand".into(),
                requires_code_deploy: false,
                code_changes_required: Vec::new(),
                plan: expand,
                verification: vec![format!(
                    "SELECT COUNT(*) FROM {} WHERE {} IS NULL AND {} IS NOT NULL",
                    sql.quote_identifier(table),
                    sql.quote_identifier(new_name),
                    sql.quote_identifier(old_name)
                )],
                rollback: expand_rollback,
            },
            Phase {
                phase_number: 2,
                name: "migrate".into(),
                requires_code_deploy: true,
                code_changes_required: vec![
                    format!("read from '{new_name}' instead of '{old_name}'"),
                    format!("write to both '{old_name}' and '{new_name}'"),
                ],
                plan: plan_of(Vec::new()),
                verification: vec![null_count_probe(sql, table, new_name)],
                rollback: plan_of(Vec::new()),
            },
            Phase {
                phase_number: 3,
                name: "contract".into(),
                requires_code_deploy: false,
                code_changes_required: vec![format!("stop writing to '{old_name}'")],
                plan: contract,
                verification: vec![null_count_probe(sql, table, new_name)],
                rollback: contract_rollback,
            },
        ],
    })
}

/// Deprecate and eventually drop a column.
pub fn deprecation(schema: &Schema, table: &str, column: &str) -> Result<MultiPhasePlan, LockplaneError> {
    let (_, column_def) = lookup_column(schema, table, column)?;
    let sql = driver(schema.dialect);

    Ok(MultiPhasePlan {
        multi_phase: true,
        operation: format!("deprecate {table}.{column}"),
        pattern: PhasePattern::Deprecation,
        total_phases: 3,
        phases: vec![
            Phase {
                phase_number: 1,
                name: "announce".into(),
                requires_code_deploy: false,
                code_changes_required: Vec::new(),
                plan: plan_of(vec![note_step(&format!(
                    "column '{table}.{column}' is deprecated and will be dropped"
                ))]),
                verification: Vec::new(),
                rollback: plan_of(Vec::new()),
            },
            Phase {
                phase_number: 2,
                name: "remove writes".into(),
                requires_code_deploy: true,
                code_changes_required: vec![format!("remove every write to '{table}.{column}'")],
                plan: plan_of(Vec::new()),
                verification: Vec::new(),
                rollback: plan_of(Vec::new()),
            },
            Phase {
                phase_number: 3,
                name: "drop".into(),
                requires_code_deploy: false,
                code_changes_required: vec![format!("remove every read of '{table}.{column}'")],
                plan: plan_of(vec![drop_column_step(sql, table, column_def)]),
                verification: Vec::new(),
                rollback: plan_of(vec![{
                    let mut restored = column_def.clone();
                    restored.nullable = true;
                    add_column_step(sql, table, &restored)
                }]),
            },
        ],
    })
}

/// Drop a table with an optional archival phase.
pub fn drop_table(schema: &Schema, table: &str, archive: bool) -> Result<MultiPhasePlan, LockplaneError> {
    let table_def = schema
        .table(table)
        .ok_or_else(|| missing(format!("table '{table}' does not exist in the current schema")))?;
    let sql = driver(schema.dialect);
    let archive_name = format!("{table}__archive");

    let mut phases = Vec::new();
    let mut number = 0u32;

    if archive {
        number += 1;
        phases.push(Phase {
            phase_number: number,
            name: "archive".into(),
            requires_code_deploy: false,
            code_changes_required: Vec::new(),
            plan: plan_of(vec![step(
                format!("Archive rows of '{table}' to '{archive_name}'"),
                format!(
                    "CREATE TABLE {} AS SELECT * FROM {}",
                    sql.quote_identifier(&archive_name),
                    sql.quote_identifier(table)
                ),
                Operation::ArchiveTable { table: table.to_string() },
                Classification::safe(format!("drop '{archive_name}'")),
            )]),
            verification: vec![format!("SELECT COUNT(*) FROM {}", sql.quote_identifier(&archive_name))],
            rollback: plan_of(vec![step(
                format!("Drop archive table '{archive_name}'"),
                sql.drop_table(&archive_name),
                Operation::DropTable { table: archive_name.clone() },
                Classification::safe(format!("re-archive rows from '{table}'")),
            )]),
        });
    }

    number += 1;
    phases.push(Phase {
        phase_number: number,
        name: "stop writes".into(),
        requires_code_deploy: true,
        code_changes_required: vec![format!("remove every write to '{table}'")],
        plan: plan_of(Vec::new()),
        verification: Vec::new(),
        rollback: plan_of(Vec::new()),
    });

    number += 1;
    phases.push(Phase {
        phase_number: number,
        name: "stop reads".into(),
        requires_code_deploy: true,
        code_changes_required: vec![format!("remove every read of '{table}'")],
        plan: plan_of(Vec::new()),
        verification: Vec::new(),
        rollback: plan_of(Vec::new()),
    });

    number += 1;
    let mut drop_rollback = vec![step(
        format!("Re-create table '{table}' from pre-state"),
        sql.create_table(table_def),
        Operation::CreateTable { table: table.to_string() },
        safety::classify_create_table(table_def),
    )];
    if archive {
        drop_rollback.push(step(
            format!("Restore rows of '{table}' from '{archive_name}'"),
            format!(
                "INSERT INTO {} SELECT * FROM {}",
                sql.quote_identifier(table),
                sql.quote_identifier(&archive_name)
            ),
            Operation::Backfill {
                table: table.to_string(),
                column: String::new(),
            },
            Classification::safe("archived rows remain available".to_string()),
        ));
    }
    phases.push(Phase {
        phase_number: number,
        name: "drop".into(),
        requires_code_deploy: false,
        code_changes_required: Vec::new(),
        plan: plan_of(vec![step(
            format!("Drop table '{table}'"),
            sql.drop_table(table),
            Operation::DropTable { table: table.to_string() },
            safety::classify_drop_table(table_def),
        )]),
        verification: Vec::new(),
        rollback: plan_of(drop_rollback),
    });

    Ok(MultiPhasePlan {
        multi_phase: true,
        operation: format!("drop table {table}"),
        pattern: PhasePattern::DropTable,
        total_phases: number,
        phases,
    })
}

/// Tighten a column to `NOT NULL` (adding it first when absent).
pub fn validation(schema: &Schema, table: &str, column: &str) -> Result<MultiPhasePlan, LockplaneError> {
    let table_def = schema
        .table(table)
        .ok_or_else(|| missing(format!("table '{table}' does not exist in the current schema")))?;
    let column_def = table_def
        .column(column)
        .ok_or_else(|| missing(format!("column '{table}.{column}' does not exist in the current schema")))?;
    if !column_def.nullable {
        return Err(missing(format!("column '{table}.{column}' is already NOT NULL")));
    }
    let sql = driver(schema.dialect);

    let backfill_value = column_def
        .default_trimmed()
        .map(ToString::to_string)
        .ok_or_else(|| missing(format!("column '{table}.{column}' needs a DEFAULT to backfill from")))?;

    // Phase 3 tightens the constraint; SQLite-family targets take the
    // recreation path because SET NOT NULL has no direct form there.
    let constrain_step = if schema.dialect.is_sqlite_family() {
        let mut after = table_def.clone();
        if let Some(target) = after.columns.iter_mut().find(|c| c.name == column) {
            target.nullable = false;
        }
        recreation_step_between(
            table_def,
            &after,
            schema.dialect,
            format!("Recreate '{table}' with '{column}' NOT NULL"),
        )
    } else {
        step(
            format!("Set NOT NULL on '{table}.{column}'"),
            sql.alter_column_nullable(table, column, false).sql_text().to_string(),
            Operation::SetNotNull {
                table: table.to_string(),
                column: column.to_string(),
            },
            safety::classify_set_not_null(table, column_def),
        )
    };

    let relax_step = if schema.dialect.is_sqlite_family() {
        let mut before = table_def.clone();
        if let Some(target) = before.columns.iter_mut().find(|c| c.name == column) {
            target.nullable = false;
        }
        recreation_step_between(
            &before,
            table_def,
            schema.dialect,
            format!("Recreate '{table}' with '{column}' nullable again"),
        )
    } else {
        step(
            format!("Drop NOT NULL on '{table}.{column}'"),
            sql.alter_column_nullable(table, column, true).sql_text().to_string(),
            Operation::DropNotNull {
                table: table.to_string(),
                column: column.to_string(),
            },
            safety::classify_drop_not_null(table, column),
        )
    };

    Ok(MultiPhasePlan {
        multi_phase: true,
        operation: format!("constrain {table}.{column} NOT NULL"),
        pattern: PhasePattern::Validation,
        total_phases: 3,
        phases: vec![
            Phase {
                phase_number: 1,
                name: "prepare".into(),
                requires_code_deploy: true,
                code_changes_required: vec![format!("write a value for '{column}' on every insert")],
                plan: plan_of(vec![note_step(&format!(
                    "'{table}.{column}' will become NOT NULL; new writes must provide it"
                ))]),
                verification: Vec::new(),
                rollback: plan_of(Vec::new()),
            },
            Phase {
                phase_number: 2,
                name: "backfill".into(),
                requires_code_deploy: false,
                code_changes_required: Vec::new(),
                plan: plan_of(vec![backfill_step(sql, table, column, &backfill_value)]),
                verification: vec![null_count_probe(sql, table, column)],
                rollback: plan_of(Vec::new()),
            },
            Phase {
                phase_number: 3,
                name: "constrain".into(),
                requires_code_deploy: false,
                code_changes_required: Vec::new(),
                plan: plan_of(vec![constrain_step]),
                verification: vec![null_count_probe(sql, table, column)],
                rollback: plan_of(vec![relax_step]),
            },
        ],
    })
}

/// Incompatible type change via a parallel column and dual writes.
pub fn type_change(
    schema: &Schema,
    table: &str,
    column: &str,
    new_type: LogicalType,
) -> Result<MultiPhasePlan, LockplaneError> {
    let (_, old_column) = lookup_column(schema, table, column)?;
    if old_column.logical_type == new_type {
        return Err(missing(format!("column '{table}.{column}' already has type {new_type}")));
    }
    let sql = driver(schema.dialect);
    let new_name = format!("{column}_new");

    let rendered = render_type(&new_type, schema.dialect);
    let new_column = Column {
        name: new_name.clone(),
        raw_type: rendered.clone(),
        logical_type: new_type.clone(),
        nullable: true,
        default: None,
        is_primary_key: false,
    };

    let cast_expr = format!("CAST({} AS {})", sql.quote_identifier(column), rendered);

    Ok(MultiPhasePlan {
        multi_phase: true,
        operation: format!("change type of {table}.{column} from {} to {new_type}", old_column.logical_type),
        pattern: PhasePattern::TypeChange,
        total_phases: 3,
        phases: vec![
            Phase {
                phase_number: 1,
                name: "expand".into(),
                requires_code_deploy: false,
                code_changes_required: Vec::new(),
                plan: plan_of(vec![
                    add_column_step(sql, table, &new_column),
                    backfill_step(sql, table, &new_name, &cast_expr),
                ]),
                verification: vec![format!(
                    "SELECT COUNT(*) FROM {} WHERE {} IS NULL AND {} IS NOT NULL",
                    sql.quote_identifier(table),
                    sql.quote_identifier(&new_name),
                    sql.quote_identifier(column)
                )],
                rollback: plan_of(vec![drop_column_step(sql, table, &new_column)]),
            },
            Phase {
                phase_number: 2,
                name: "dual-write".into(),
                requires_code_deploy: true,
                code_changes_required: vec![
                    format!("write to both '{column}' and '{new_name}', casting explicitly"),
                    format!("read from '{new_name}'"),
                ],
                plan: plan_of(Vec::new()),
                verification: vec![null_count_probe(sql, table, &new_name)],
                rollback: plan_of(Vec::new()),
            },
            Phase {
                phase_number: 3,
                name: "contract".into(),
                requires_code_deploy: false,
                code_changes_required: vec![format!("stop referencing '{column}'")],
                plan: plan_of(vec![drop_column_step(sql, table, old_column)]),
                verification: Vec::new(),
                rollback: plan_of(vec![{
                    let mut restored = old_column.clone();
                    restored.nullable = true;
                    add_column_step(sql, table, &restored)
                }]),
            },
        ],
    })
}
