//! Source-state hashing over the canonical schema form.
//!
//! The hash is the precondition guard for plan application: a plan records
//! the hash of the schema it was generated against, and the executor
//! refuses to apply when the live database no longer matches.
//!
//! Two invariants hold by construction:
//!
//! - an absent schema and an explicitly empty schema hash identically;
//! - schemas that differ only in raw type spellings hash identically,
//!   because the canonical form substitutes the logical type.
//!
//! The canonical serialization is JSON with tables sorted by name, columns
//! in declaration order, indexes and foreign keys sorted by name, and
//! `null`-ish fields elided. `serde_json`'s map type keeps keys sorted, so
//! the byte stream is stable across runs and platforms.

use crate::libs::schema::{Schema, Table};
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};

/// Computes the stable hex digest of a schema's canonical form.
///
/// `None` and an empty schema produce the same digest, and the dialect tag
/// never participates: logically equivalent PostgreSQL and SQLite schemas
/// hash identically.
pub fn compute_schema_hash(schema: Option<&Schema>) -> String {
    let canonical = match schema {
        Some(schema) => canonical_value(schema),
        None => json!({ "tables": [] }),
    };
    let serialized = canonical.to_string();
    let digest = Sha256::digest(serialized.as_bytes());
    digest.iter().map(|byte| format!("{byte:02x}")).collect()
}

fn canonical_value(schema: &Schema) -> Value {
    let canonical = schema.canonicalize();
    let tables: Vec<Value> = canonical.tables.iter().map(table_value).collect();
    json!({ "tables": tables })
}

fn table_value(table: &Table) -> Value {
    let columns: Vec<Value> = table
        .columns
        .iter()
        .map(|column| {
            let mut map = Map::new();
            map.insert("name".into(), Value::String(column.name.clone()));
            // Logical type only; the raw spelling must not influence the hash.
            map.insert("type".into(), Value::String(column.logical_type.to_string()));
            map.insert("nullable".into(), Value::Bool(column.nullable));
            if let Some(default) = column.default_trimmed() {
                map.insert("default".into(), Value::String(default.to_string()));
            }
            if column.is_primary_key {
                map.insert("is_primary_key".into(), Value::Bool(true));
            }
            Value::Object(map)
        })
        .collect();

    let indexes: Vec<Value> = table
        .indexes
        .iter()
        .map(|index| {
            json!({
                "name": index.name,
                "columns": index.columns,
                "unique": index.unique,
            })
        })
        .collect();

    let foreign_keys: Vec<Value> = table
        .foreign_keys
        .iter()
        .map(|fk| {
            let mut map = Map::new();
            map.insert("name".into(), Value::String(fk.name.clone()));
            map.insert(
                "columns".into(),
                Value::Array(fk.columns.iter().cloned().map(Value::String).collect()),
            );
            map.insert("referenced_table".into(), Value::String(fk.referenced_table.clone()));
            map.insert(
                "referenced_columns".into(),
                Value::Array(fk.referenced_columns.iter().cloned().map(Value::String).collect()),
            );
            if let Some(action) = fk.on_delete {
                map.insert("on_delete".into(), Value::String(action.as_sql().to_string()));
            }
            if let Some(action) = fk.on_update {
                map.insert("on_update".into(), Value::String(action.as_sql().to_string()));
            }
            Value::Object(map)
        })
        .collect();

    json!({
        "name": table.name,
        "columns": columns,
        "indexes": indexes,
        "foreign_keys": foreign_keys,
    })
}

/// Fingerprint of an arbitrary serialized document (used to tie the phase
/// state record to the plan file it tracks).
pub fn fingerprint(content: &str) -> String {
    let digest = Sha256::digest(content.as_bytes());
    digest.iter().map(|byte| format!("{byte:02x}")).collect()
}
