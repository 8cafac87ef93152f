//! SQLite/libSQL catalog introspection via the PRAGMA surface.
//!
//! Reads `PRAGMA table_list`, `table_info`, `index_list`, `index_info` and
//! `foreign_key_list` into the canonical schema model. Foreign-key
//! enforcement is switched on before reading. SQLite does not name foreign
//! keys, so a deterministic `<table>_<columns>_fkey` name is synthesized;
//! it matches the shape PostgreSQL generates by default, which keeps hashes
//! equal across dialects.

use crate::libs::error::LockplaneError;
use crate::libs::schema::{Column, ForeignKey, Index, RefAction, Schema, Table};
use crate::libs::types::{normalize_type, Dialect};
use rusqlite::Connection;

fn catalog_error(dialect: Dialect, detail: impl ToString) -> LockplaneError {
    LockplaneError::IntrospectionError {
        dialect,
        detail: detail.to_string(),
    }
}

/// Reads the complete schema of `conn`.
pub fn introspect(conn: &Connection, dialect: Dialect) -> Result<Schema, LockplaneError> {
    conn.execute_batch("PRAGMA foreign_keys = ON")
        .map_err(|e| catalog_error(dialect, e))?;

    let mut schema = Schema::new(dialect);
    // (table index, fk name, referenced table) for foreign keys whose
    // referenced columns were implicit and need the target's primary key.
    let mut unresolved: Vec<(usize, String)> = Vec::new();

    for table_name in table_names(conn, dialect)? {
        let table = read_table(conn, dialect, &table_name, &mut unresolved, schema.tables.len())?;
        schema.tables.push(table);
    }

    // Second pass: `foreign_key_list` reports NULL "to" columns when the
    // reference is to the target's primary key.
    for (table_index, fk_name) in unresolved {
        let referenced_table = schema.tables[table_index]
            .foreign_keys
            .iter()
            .find(|fk| fk.name == fk_name)
            .map(|fk| fk.referenced_table.clone())
            .unwrap_or_default();
        let pk_columns: Vec<String> = schema
            .table(&referenced_table)
            .map(|t| t.primary_key_columns().iter().map(|c| c.name.clone()).collect())
            .unwrap_or_default();
        if let Some(fk) = schema.tables[table_index]
            .foreign_keys
            .iter_mut()
            .find(|fk| fk.name == fk_name)
        {
            fk.referenced_columns = pk_columns;
        }
    }

    Ok(schema)
}

fn table_names(conn: &Connection, dialect: Dialect) -> Result<Vec<String>, LockplaneError> {
    let mut statement = conn
        .prepare("PRAGMA table_list")
        .map_err(|e| catalog_error(dialect, e))?;
    let rows = statement
        .query_map([], |row| {
            Ok((
                row.get::<_, String>("schema")?,
                row.get::<_, String>("name")?,
                row.get::<_, String>("type")?,
            ))
        })
        .map_err(|e| catalog_error(dialect, e))?;

    let mut names = Vec::new();
    for row in rows {
        let (schema_name, name, kind) = row.map_err(|e| catalog_error(dialect, e))?;
        if schema_name == "main" && kind == "table" && !name.starts_with("sqlite_") {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}

fn read_table(
    conn: &Connection,
    dialect: Dialect,
    name: &str,
    unresolved: &mut Vec<(usize, String)>,
    table_index: usize,
) -> Result<Table, LockplaneError> {
    let mut table = Table::new(name);
    let quoted = format!("\"{}\"", name.replace('"', "\"\""));

    // Columns, in ordinal order, with primary-key membership.
    let mut statement = conn
        .prepare(&format!("PRAGMA table_info({quoted})"))
        .map_err(|e| catalog_error(dialect, e))?;
    let rows = statement
        .query_map([], |row| {
            Ok((
                row.get::<_, String>("name")?,
                row.get::<_, String>("type")?,
                row.get::<_, i64>("notnull")?,
                row.get::<_, Option<String>>("dflt_value")?,
                row.get::<_, i64>("pk")?,
            ))
        })
        .map_err(|e| catalog_error(dialect, e))?;

    for row in rows {
        let (column_name, raw_type, not_null, default, pk) = row.map_err(|e| catalog_error(dialect, e))?;
        let logical_type = normalize_type(&raw_type, dialect).map_err(|e| catalog_error(dialect, e))?;
        let is_primary_key = pk > 0;
        table.columns.push(Column {
            name: column_name,
            raw_type,
            logical_type,
            nullable: not_null == 0 && !is_primary_key,
            default,
            is_primary_key,
        });
    }

    read_indexes(conn, dialect, &quoted, &mut table)?;
    read_foreign_keys(conn, dialect, &quoted, name, &mut table)?;

    for fk in &table.foreign_keys {
        if fk.referenced_columns.is_empty() {
            unresolved.push((table_index, fk.name.clone()));
        }
    }

    Ok(table)
}

fn read_indexes(conn: &Connection, dialect: Dialect, quoted: &str, table: &mut Table) -> Result<(), LockplaneError> {
    let mut statement = conn
        .prepare(&format!("PRAGMA index_list({quoted})"))
        .map_err(|e| catalog_error(dialect, e))?;
    let rows = statement
        .query_map([], |row| {
            Ok((
                row.get::<_, String>("name")?,
                row.get::<_, i64>("unique")?,
                row.get::<_, String>("origin")?,
            ))
        })
        .map_err(|e| catalog_error(dialect, e))?;

    let pk_columns: Vec<String> = table.primary_key_columns().iter().map(|c| c.name.clone()).collect();

    for row in rows {
        let (index_name, unique, origin) = row.map_err(|e| catalog_error(dialect, e))?;
        // Only indexes from explicit CREATE INDEX; the ones backing primary
        // keys and inline UNIQUE constraints are not modeled separately.
        if origin != "c" {
            continue;
        }

        let quoted_index = format!("\"{}\"", index_name.replace('"', "\"\""));
        let mut info = conn
            .prepare(&format!("PRAGMA index_info({quoted_index})"))
            .map_err(|e| catalog_error(dialect, e))?;
        let mut columns: Vec<(i64, String)> = Vec::new();
        let info_rows = info
            .query_map([], |row| {
                Ok((row.get::<_, i64>("seqno")?, row.get::<_, Option<String>>("name")?))
            })
            .map_err(|e| catalog_error(dialect, e))?;
        for info_row in info_rows {
            let (seqno, column) = info_row.map_err(|e| catalog_error(dialect, e))?;
            if let Some(column) = column {
                columns.push((seqno, column));
            }
        }
        columns.sort_by_key(|(seqno, _)| *seqno);
        let columns: Vec<String> = columns.into_iter().map(|(_, c)| c).collect();

        if unique == 1 && columns == pk_columns {
            continue;
        }

        table.indexes.push(Index {
            name: index_name,
            columns,
            unique: unique == 1,
        });
    }
    Ok(())
}

fn read_foreign_keys(
    conn: &Connection,
    dialect: Dialect,
    quoted: &str,
    table_name: &str,
    table: &mut Table,
) -> Result<(), LockplaneError> {
    let mut statement = conn
        .prepare(&format!("PRAGMA foreign_key_list({quoted})"))
        .map_err(|e| catalog_error(dialect, e))?;
    let rows = statement
        .query_map([], |row| {
            Ok((
                row.get::<_, i64>("id")?,
                row.get::<_, i64>("seq")?,
                row.get::<_, String>("table")?,
                row.get::<_, String>("from")?,
                row.get::<_, Option<String>>("to")?,
                row.get::<_, String>("on_update")?,
                row.get::<_, String>("on_delete")?,
            ))
        })
        .map_err(|e| catalog_error(dialect, e))?;

    // Rows arrive one per column; group them by constraint id.
    let mut grouped: Vec<(i64, ForeignKey, Vec<(i64, String, Option<String>)>)> = Vec::new();
    for row in rows {
        let (id, seq, referenced_table, from, to, on_update, on_delete) =
            row.map_err(|e| catalog_error(dialect, e))?;
        let entry = match grouped.iter_mut().find(|(group_id, _, _)| *group_id == id) {
            Some(entry) => entry,
            None => {
                grouped.push((
                    id,
                    ForeignKey {
                        name: String::new(),
                        columns: Vec::new(),
                        referenced_table,
                        referenced_columns: Vec::new(),
                        on_delete: RefAction::from_catalog(&on_delete),
                        on_update: RefAction::from_catalog(&on_update),
                    },
                    Vec::new(),
                ));
                grouped.last_mut().unwrap()
            }
        };
        entry.2.push((seq, from, to));
    }

    for (_, mut fk, mut columns) in grouped {
        columns.sort_by_key(|(seq, _, _)| *seq);
        let mut referenced_complete = true;
        for (_, from, to) in columns {
            fk.columns.push(from);
            match to {
                Some(to) => fk.referenced_columns.push(to),
                None => referenced_complete = false,
            }
        }
        if !referenced_complete {
            // Signal the fix-up pass: referenced columns are the target's
            // primary key.
            fk.referenced_columns.clear();
        }
        fk.name = format!("{table_name}_{}_fkey", fk.columns.join("_"));
        table.foreign_keys.push(fk);
    }
    Ok(())
}
