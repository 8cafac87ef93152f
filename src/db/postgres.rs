//! PostgreSQL catalog introspection.
//!
//! Reads `information_schema` for tables and columns and `pg_catalog` for
//! indexes and foreign keys, covering the configured schema list (default
//! `public`; a single entry pins all work to that schema). Raw types come
//! back as `udt_name` plus modifiers and flow through the normalizer, so a
//! logically equivalent SQLite database produces the same canonical form.

use crate::db::target::Deadline;
use crate::libs::error::LockplaneError;
use crate::libs::schema::{Column, ForeignKey, Index, RefAction, Schema, Table};
use crate::libs::types::{normalize_type, Dialect};
use tokio_postgres::Client;

fn catalog_error(detail: impl ToString) -> LockplaneError {
    LockplaneError::IntrospectionError {
        dialect: Dialect::Postgres,
        detail: detail.to_string(),
    }
}

const TABLES: &str = "SELECT table_name FROM information_schema.tables \
     WHERE table_schema = $1 AND table_type = 'BASE TABLE' ORDER BY table_name";

const COLUMNS: &str = "SELECT column_name, udt_name, is_nullable, column_default, \
            character_maximum_length, numeric_precision, numeric_scale \
     FROM information_schema.columns \
     WHERE table_schema = $1 AND table_name = $2 ORDER BY ordinal_position";

const PRIMARY_KEY: &str = "SELECT kcu.column_name \
     FROM information_schema.table_constraints tc \
     JOIN information_schema.key_column_usage kcu \
       ON tc.constraint_name = kcu.constraint_name AND tc.table_schema = kcu.table_schema \
     WHERE tc.constraint_type = 'PRIMARY KEY' AND tc.table_schema = $1 AND tc.table_name = $2 \
     ORDER BY kcu.ordinal_position";

const INDEXES: &str = "SELECT i.relname AS index_name, ix.indisunique, a.attname, \
            array_position(ix.indkey, a.attnum) AS key_position \
     FROM pg_class t \
     JOIN pg_index ix ON t.oid = ix.indrelid \
     JOIN pg_class i ON i.oid = ix.indexrelid \
     JOIN pg_namespace n ON n.oid = t.relnamespace \
     JOIN pg_attribute a ON a.attrelid = t.oid AND a.attnum = ANY(ix.indkey) \
     WHERE n.nspname = $1 AND t.relname = $2 AND NOT ix.indisprimary \
     ORDER BY i.relname, key_position";

const FOREIGN_KEYS: &str = "SELECT con.conname, src.attname AS column_name, \
            tgt.attname AS referenced_column, ft.relname AS referenced_table, \
            con.confdeltype::text AS on_delete, con.confupdtype::text AS on_update, k.ord \
     FROM pg_constraint con \
     JOIN pg_class t ON t.oid = con.conrelid \
     JOIN pg_class ft ON ft.oid = con.confrelid \
     JOIN pg_namespace n ON n.oid = t.relnamespace \
     JOIN LATERAL unnest(con.conkey) WITH ORDINALITY AS k(attnum, ord) ON TRUE \
     JOIN LATERAL unnest(con.confkey) WITH ORDINALITY AS fk(attnum, ord) ON fk.ord = k.ord \
     JOIN pg_attribute src ON src.attrelid = t.oid AND src.attnum = k.attnum \
     JOIN pg_attribute tgt ON tgt.attrelid = ft.oid AND tgt.attnum = fk.attnum \
     WHERE con.contype = 'f' AND n.nspname = $1 AND t.relname = $2 \
     ORDER BY con.conname, k.ord";

/// Reads the complete schema visible in `schemas`.
pub async fn introspect(client: &Client, schemas: &[String], deadline: Deadline) -> Result<Schema, LockplaneError> {
    let mut schema = Schema::new(Dialect::Postgres);

    for pg_schema in schemas {
        let rows = deadline
            .guard(client.query(TABLES, &[pg_schema]))
            .await?
            .map_err(catalog_error)?;
        for row in rows {
            let table_name: String = row.get(0);
            let table = read_table(client, pg_schema, &table_name, deadline).await?;
            schema.tables.push(table);
        }
    }

    Ok(schema)
}

async fn read_table(
    client: &Client,
    pg_schema: &str,
    name: &str,
    deadline: Deadline,
) -> Result<Table, LockplaneError> {
    let mut table = Table::new(name);

    let pk_rows = deadline
        .guard(client.query(PRIMARY_KEY, &[&pg_schema, &name]))
        .await?
        .map_err(catalog_error)?;
    let pk_columns: Vec<String> = pk_rows.iter().map(|row| row.get(0)).collect();

    let column_rows = deadline
        .guard(client.query(COLUMNS, &[&pg_schema, &name]))
        .await?
        .map_err(catalog_error)?;
    for row in column_rows {
        let column_name: String = row.get("column_name");
        let udt_name: String = row.get("udt_name");
        let is_nullable: String = row.get("is_nullable");
        let default: Option<String> = row.get("column_default");
        let char_length: Option<i32> = row.get("character_maximum_length");
        let precision: Option<i32> = row.get("numeric_precision");
        let scale: Option<i32> = row.get("numeric_scale");

        let raw_type = raw_type_of(&udt_name, char_length, precision, scale);
        let logical_type = normalize_type(&raw_type, Dialect::Postgres).map_err(catalog_error)?;
        let is_primary_key = pk_columns.contains(&column_name);

        table.columns.push(Column {
            name: column_name,
            raw_type,
            logical_type,
            nullable: is_nullable == "YES" && !is_primary_key,
            default,
            is_primary_key,
        });
    }

    read_indexes(client, pg_schema, name, deadline, &mut table).await?;
    read_foreign_keys(client, pg_schema, name, deadline, &mut table).await?;

    Ok(table)
}

/// Reassembles the declared type from `udt_name` plus length/precision
/// modifiers, the way `format_type` would print it.
fn raw_type_of(udt_name: &str, char_length: Option<i32>, precision: Option<i32>, scale: Option<i32>) -> String {
    match udt_name {
        "varchar" | "bpchar" => match char_length {
            Some(length) => format!("{udt_name}({length})"),
            None => udt_name.to_string(),
        },
        "numeric" => match (precision, scale) {
            (Some(precision), Some(scale)) => format!("numeric({precision},{scale})"),
            (Some(precision), None) => format!("numeric({precision})"),
            _ => "numeric".to_string(),
        },
        other => other.to_string(),
    }
}

async fn read_indexes(
    client: &Client,
    pg_schema: &str,
    name: &str,
    deadline: Deadline,
    table: &mut Table,
) -> Result<(), LockplaneError> {
    let rows = deadline
        .guard(client.query(INDEXES, &[&pg_schema, &name]))
        .await?
        .map_err(catalog_error)?;

    for row in rows {
        let index_name: String = row.get("index_name");
        let unique: bool = row.get("indisunique");
        let column: String = row.get("attname");

        match table.indexes.iter_mut().find(|idx| idx.name == index_name) {
            Some(index) => index.columns.push(column),
            None => table.indexes.push(Index {
                name: index_name,
                columns: vec![column],
                unique,
            }),
        }
    }
    Ok(())
}

fn referential_action(code: &str) -> Option<RefAction> {
    match code {
        "c" => Some(RefAction::Cascade),
        "r" => Some(RefAction::Restrict),
        "n" => Some(RefAction::SetNull),
        "d" => Some(RefAction::SetDefault),
        // 'a' is NO ACTION, the default.
        _ => None,
    }
}

async fn read_foreign_keys(
    client: &Client,
    pg_schema: &str,
    name: &str,
    deadline: Deadline,
    table: &mut Table,
) -> Result<(), LockplaneError> {
    let rows = deadline
        .guard(client.query(FOREIGN_KEYS, &[&pg_schema, &name]))
        .await?
        .map_err(catalog_error)?;

    for row in rows {
        let constraint: String = row.get("conname");
        let column: String = row.get("column_name");
        let referenced_column: String = row.get("referenced_column");
        let referenced_table: String = row.get("referenced_table");
        let on_delete: String = row.get("on_delete");
        let on_update: String = row.get("on_update");

        match table.foreign_keys.iter_mut().find(|fk| fk.name == constraint) {
            Some(fk) => {
                fk.columns.push(column);
                fk.referenced_columns.push(referenced_column);
            }
            None => table.foreign_keys.push(ForeignKey {
                name: constraint,
                columns: vec![column],
                referenced_columns: vec![referenced_column],
                referenced_table,
                on_delete: referential_action(&on_delete),
                on_update: referential_action(&on_update),
            }),
        }
    }
    Ok(())
}
