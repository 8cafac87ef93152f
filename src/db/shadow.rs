//! Shadow database rehearsal.
//!
//! The shadow database is ephemeral and its contents are untrusted between
//! runs, so every rehearsal starts by re-materializing the current schema:
//! tables with their indexes first, foreign keys in a second pass so no
//! statement references a table that does not exist yet. The whole
//! rehearsal (materialization plus every executable plan step) runs in one
//! transaction that is always rolled back.
//!
//! On PostgreSQL the rehearsal lives in a dedicated schema
//! (`SHADOW_SCHEMA`, default `lockplane_shadow`) with `search_path` pinned
//! to it; rolling back removes the schema again. On SQLite the shadow is a
//! separate file or `:memory:` handle whose leftover tables are dropped
//! inside the transaction, with foreign-key enforcement switched off for
//! the duration because the pragma cannot change mid-transaction.

use crate::db::target::{Deadline, Target};
use crate::libs::dialect::driver;
use crate::libs::error::LockplaneError;
use crate::libs::plan::Plan;
use crate::libs::schema::Schema;
use crate::msg_debug;

fn rehearsal_failure(step_index: usize, description: &str, detail: String) -> LockplaneError {
    LockplaneError::ShadowDryRunFailed {
        step_index,
        description: description.to_string(),
        detail,
    }
}

/// Rehearses `plan` against `shadow`, leaving the shadow untouched.
pub async fn rehearse(
    shadow: &mut Target,
    current: &Schema,
    plan: &Plan,
    shadow_schema: &str,
    deadline: Deadline,
) -> Result<(), LockplaneError> {
    let is_sqlite = shadow.dialect().is_sqlite_family();

    if is_sqlite {
        // Must happen outside the transaction; the pragma is inert inside.
        shadow
            .batch_execute("PRAGMA foreign_keys = OFF", deadline)
            .await
            .map_err(|e| rehearsal_failure(0, "disable foreign key enforcement", e))?;
    }

    shadow
        .begin(deadline)
        .await
        .map_err(|e| rehearsal_failure(0, "open rehearsal transaction", e))?;

    let result = rehearse_in_transaction(shadow, current, plan, shadow_schema, deadline).await;

    // The dry-run transaction is always rolled back, success or not.
    shadow.rollback_tx().await;

    if is_sqlite {
        let _ = shadow.batch_execute("PRAGMA foreign_keys = ON", Deadline::none()).await;
    }

    result
}

async fn rehearse_in_transaction(
    shadow: &mut Target,
    current: &Schema,
    plan: &Plan,
    shadow_schema: &str,
    deadline: Deadline,
) -> Result<(), LockplaneError> {
    materialize(shadow, current, shadow_schema, deadline)
        .await
        .map_err(|e| rehearsal_failure(0, "materialize current schema on shadow", e))?;

    for (step_index, step) in plan.executable_steps() {
        msg_debug!(format!("shadow rehearsal step {step_index}: {}", step.description));
        shadow
            .batch_execute(&step.sql, deadline)
            .await
            .map_err(|e| rehearsal_failure(step_index, &step.description, e))?;
    }

    Ok(())
}

/// Re-creates `current` inside the open rehearsal transaction.
async fn materialize(
    shadow: &mut Target,
    current: &Schema,
    shadow_schema: &str,
    deadline: Deadline,
) -> Result<(), String> {
    let dialect = shadow.dialect();
    let sql = driver(dialect);

    if dialect.is_sqlite_family() {
        // Leftover state from an earlier run is untrusted; clear it.
        let existing = existing_sqlite_tables(shadow)?;
        for table in existing {
            shadow
                .batch_execute(&format!("DROP TABLE \"{}\"", table.replace('"', "\"\"")), deadline)
                .await?;
        }
    } else {
        let quoted = format!("\"{}\"", shadow_schema.replace('"', "\"\""));
        shadow
            .batch_execute(
                &format!("DROP SCHEMA IF EXISTS {quoted} CASCADE;\nCREATE SCHEMA {quoted};\nSET LOCAL search_path TO {quoted}"),
                deadline,
            )
            .await?;
    }

    // Pass 1: tables and their indexes.
    for table in &current.tables {
        shadow.batch_execute(&sql.create_table(table), deadline).await?;
        for index in &table.indexes {
            shadow.batch_execute(&sql.add_index(&table.name, index), deadline).await?;
        }
    }

    // Pass 2: foreign keys, once every table exists. SQLite carries them
    // inline in CREATE TABLE.
    if !dialect.is_sqlite_family() {
        for table in &current.tables {
            for fk in &table.foreign_keys {
                let emitted = sql.add_foreign_key(&table.name, fk);
                shadow.batch_execute(emitted.sql_text(), deadline).await?;
            }
        }
    }

    Ok(())
}

fn existing_sqlite_tables(shadow: &mut Target) -> Result<Vec<String>, String> {
    match shadow {
        Target::Sqlite { conn, .. } => {
            let mut statement = conn
                .prepare("SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'")
                .map_err(|e| e.to_string())?;
            let rows = statement
                .query_map([], |row| row.get::<_, String>(0))
                .map_err(|e| e.to_string())?;
            let mut names = Vec::new();
            for row in rows {
                names.push(row.map_err(|e| e.to_string())?);
            }
            Ok(names)
        }
        Target::Postgres { .. } => Ok(Vec::new()),
    }
}
