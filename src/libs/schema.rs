//! Canonical schema model shared by the parser, introspectors and differ.
//!
//! Every pipeline stage speaks this representation: the DDL parser and the
//! live-database introspectors both produce a [`Schema`], the differ compares
//! two of them, and the source-state hash canonicalizes one.
//!
//! ## Features
//!
//! - **Dialect Tagging**: A schema knows which dialect produced it
//! - **Logical + Raw Types**: Columns carry both forms; comparison uses logical only
//! - **JSON Export**: The persisted schema file shape, tolerant of unknown fields
//! - **Canonical Ordering**: Stable lexicographic form for hashing and comparison
//!
//! ## Usage
//!
//! ```rust
//! use lockplane::libs::schema::{Column, Schema, Table};
//! use lockplane::libs::types::{Dialect, LogicalType};
//!
//! let table = Table::new("users").with_column(Column::new("id", LogicalType::BigInt).primary_key());
//! let schema = Schema::new(Dialect::Postgres).with_table(table);
//! assert!(schema.table("users").is_some());
//! ```

use crate::libs::types::{normalize_type, render_type, Dialect, LogicalType};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Referential action attached to a foreign key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefAction {
    Cascade,
    Restrict,
    SetNull,
    SetDefault,
    NoAction,
}

impl RefAction {
    pub fn as_sql(self) -> &'static str {
        match self {
            RefAction::Cascade => "CASCADE",
            RefAction::Restrict => "RESTRICT",
            RefAction::SetNull => "SET NULL",
            RefAction::SetDefault => "SET DEFAULT",
            RefAction::NoAction => "NO ACTION",
        }
    }

    /// Parses catalog spellings. `NO ACTION` maps to `None` so that the
    /// dialect default and an explicit no-op compare equal.
    pub fn from_catalog(value: &str) -> Option<RefAction> {
        match value.trim().to_ascii_uppercase().as_str() {
            "CASCADE" => Some(RefAction::Cascade),
            "RESTRICT" => Some(RefAction::Restrict),
            "SET NULL" => Some(RefAction::SetNull),
            "SET DEFAULT" => Some(RefAction::SetDefault),
            _ => None,
        }
    }
}

impl fmt::Display for RefAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// Diagnostic bundle describing how a column's type was classified.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeMetadata {
    pub logical: LogicalType,
    pub raw: String,
    pub dialect: Dialect,
}

/// A single column.
///
/// Invariant: `is_primary_key` implies `!nullable`; constructors and the
/// parser enforce this.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    /// The type exactly as written in DDL or reported by the catalog.
    pub raw_type: String,
    /// The normalized classification the differ and hash compare.
    pub logical_type: LogicalType,
    pub nullable: bool,
    pub default: Option<String>,
    pub is_primary_key: bool,
}

impl Column {
    pub fn new(name: impl Into<String>, logical: LogicalType) -> Self {
        Self {
            name: name.into(),
            raw_type: logical.to_string(),
            logical_type: logical,
            nullable: true,
            default: None,
            is_primary_key: false,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.is_primary_key = true;
        self.nullable = false;
        self
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn with_raw_type(mut self, raw: impl Into<String>) -> Self {
        self.raw_type = raw.into();
        self
    }

    pub fn type_metadata(&self, dialect: Dialect) -> TypeMetadata {
        TypeMetadata {
            logical: self.logical_type.clone(),
            raw: self.raw_type.clone(),
            dialect,
        }
    }

    /// The type string used when emitting SQL for this column: the raw form
    /// when it still normalizes to the logical type, the rendered logical
    /// form otherwise.
    pub fn sql_type(&self, dialect: Dialect) -> String {
        match normalize_type(&self.raw_type, dialect) {
            Ok(ref logical) if *logical == self.logical_type => self.raw_type.clone(),
            _ => render_type(&self.logical_type, dialect),
        }
    }

    /// Trimmed default expression, used for diff equality.
    pub fn default_trimmed(&self) -> Option<&str> {
        self.default.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

/// A secondary index. An index whose columns coincide with the primary key
/// is not modeled separately.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Index {
    pub name: String,
    pub columns: Vec<String>,
    pub unique: bool,
}

/// A named foreign key.
///
/// Invariant: `columns.len() == referenced_columns.len()`; the structural
/// validator additionally checks that every referenced column exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignKey {
    pub name: String,
    pub columns: Vec<String>,
    pub referenced_table: String,
    pub referenced_columns: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_delete: Option<RefAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_update: Option<RefAction>,
}

/// A table: ordered columns plus name-keyed indexes and foreign keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
    #[serde(default)]
    pub indexes: Vec<Index>,
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKey>,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            indexes: Vec::new(),
            foreign_keys: Vec::new(),
        }
    }

    pub fn with_column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    pub fn with_index(mut self, index: Index) -> Self {
        self.indexes.push(index);
        self
    }

    pub fn with_foreign_key(mut self, fk: ForeignKey) -> Self {
        self.foreign_keys.push(fk);
        self
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn index(&self, name: &str) -> Option<&Index> {
        self.indexes.iter().find(|i| i.name == name)
    }

    pub fn foreign_key(&self, name: &str) -> Option<&ForeignKey> {
        self.foreign_keys.iter().find(|f| f.name == name)
    }

    /// Columns flagged as primary key, in declaration order.
    pub fn primary_key_columns(&self) -> Vec<&Column> {
        self.columns.iter().filter(|c| c.is_primary_key).collect()
    }
}

/// An ordered set of tables tagged with the dialect that produced them.
///
/// Insertion order is irrelevant to equality and hashing; both go through
/// [`Schema::canonicalize`], which sorts tables lexicographically and
/// indexes/foreign keys by name within each table. Column order is kept
/// as-is because it is significant for DDL emission.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    pub dialect: Dialect,
    pub tables: Vec<Table>,
}

impl Schema {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            tables: Vec::new(),
        }
    }

    pub fn with_table(mut self, table: Table) -> Self {
        self.tables.push(table);
        self
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Stable lexicographic form used by the hash and by equality checks.
    pub fn canonicalize(&self) -> Schema {
        let mut tables = self.tables.clone();
        tables.sort_by(|a, b| a.name.cmp(&b.name));
        for table in &mut tables {
            table.indexes.sort_by(|a, b| a.name.cmp(&b.name));
            table.foreign_keys.sort_by(|a, b| a.name.cmp(&b.name));
        }
        Schema {
            dialect: self.dialect,
            tables,
        }
    }
}

// --- persisted schema files (§ external interfaces) ---

#[derive(Debug, Serialize, Deserialize)]
struct ColumnFile {
    name: String,
    #[serde(rename = "type")]
    raw_type: String,
    nullable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    default: Option<String>,
    #[serde(default)]
    is_primary_key: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct TableFile {
    name: String,
    columns: Vec<ColumnFile>,
    #[serde(default)]
    indexes: Vec<Index>,
    #[serde(default)]
    foreign_keys: Vec<ForeignKey>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SchemaFile {
    dialect: Dialect,
    tables: Vec<TableFile>,
}

impl Schema {
    /// Serializes the schema into the persisted JSON export shape.
    ///
    /// The exported dialect is the family tag (`postgres` or `sqlite`);
    /// libSQL exports as `sqlite`.
    pub fn to_export_json(&self) -> Result<String> {
        let file = SchemaFile {
            dialect: self.dialect.family(),
            tables: self
                .tables
                .iter()
                .map(|t| TableFile {
                    name: t.name.clone(),
                    columns: t
                        .columns
                        .iter()
                        .map(|c| ColumnFile {
                            name: c.name.clone(),
                            raw_type: c.raw_type.clone(),
                            nullable: c.nullable,
                            default: c.default.clone(),
                            is_primary_key: c.is_primary_key,
                        })
                        .collect(),
                    indexes: t.indexes.clone(),
                    foreign_keys: t.foreign_keys.clone(),
                })
                .collect(),
        };
        Ok(serde_json::to_string_pretty(&file)?)
    }

    /// Reads a schema from the persisted JSON export shape. Unknown fields
    /// are ignored; raw types are re-normalized for the declared dialect.
    pub fn from_export_json(json: &str) -> Result<Schema> {
        let file: SchemaFile = serde_json::from_str(json).context("invalid schema JSON")?;
        let dialect = file.dialect;
        let mut schema = Schema::new(dialect);
        for table in file.tables {
            let mut model = Table::new(table.name);
            for column in table.columns {
                let logical = normalize_type(&column.raw_type, dialect)
                    .with_context(|| format!("column '{}'", column.name))?;
                model.columns.push(Column {
                    name: column.name,
                    raw_type: column.raw_type,
                    logical_type: logical,
                    // A primary-key column is never nullable.
                    nullable: column.nullable && !column.is_primary_key,
                    default: column.default,
                    is_primary_key: column.is_primary_key,
                });
            }
            model.indexes = table.indexes;
            model.foreign_keys = table.foreign_keys;
            schema.tables.push(model);
        }
        Ok(schema)
    }

    pub fn from_export_file(path: &Path) -> Result<Schema> {
        let json = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        Schema::from_export_json(&json)
    }
}
