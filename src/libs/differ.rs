//! Structural delta computation between two schemas.
//!
//! The differ partitions tables, columns, indexes and foreign keys by name
//! and compares the survivors field by field. Column comparison uses the
//! logical type only; raw spellings never produce a diff. Ordering inside
//! every list is the natural order of the input schemas, which downstream
//! consumers (planner, safety classifier) preserve.

use crate::libs::schema::{Column, ForeignKey, Index, Schema, Table};
use serde::Serialize;

/// The dimension of a column that changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnChange {
    Type,
    Nullable,
    Default,
    PrimaryKey,
}

/// A column present in both schemas whose definition differs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnDiff {
    pub column_name: String,
    pub old: Column,
    pub new: Column,
    pub changes: Vec<ColumnChange>,
}

/// Per-table delta. A table with every sublist empty is omitted from the
/// schema diff entirely.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableDiff {
    pub table_name: String,
    pub added_columns: Vec<Column>,
    pub removed_columns: Vec<Column>,
    pub modified_columns: Vec<ColumnDiff>,
    pub added_indexes: Vec<Index>,
    pub removed_indexes: Vec<Index>,
    pub added_foreign_keys: Vec<ForeignKey>,
    pub removed_foreign_keys: Vec<ForeignKey>,
}

impl TableDiff {
    fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            added_columns: Vec::new(),
            removed_columns: Vec::new(),
            modified_columns: Vec::new(),
            added_indexes: Vec::new(),
            removed_indexes: Vec::new(),
            added_foreign_keys: Vec::new(),
            removed_foreign_keys: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.added_columns.is_empty()
            && self.removed_columns.is_empty()
            && self.modified_columns.is_empty()
            && self.added_indexes.is_empty()
            && self.removed_indexes.is_empty()
            && self.added_foreign_keys.is_empty()
            && self.removed_foreign_keys.is_empty()
    }
}

/// Full delta between two schemas.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaDiff {
    pub added_tables: Vec<Table>,
    pub removed_tables: Vec<Table>,
    pub modified_tables: Vec<TableDiff>,
}

impl SchemaDiff {
    pub fn is_empty(&self) -> bool {
        self.added_tables.is_empty() && self.removed_tables.is_empty() && self.modified_tables.is_empty()
    }
}

/// Computes the delta that transforms `before` into `after`.
pub fn diff(before: &Schema, after: &Schema) -> SchemaDiff {
    let mut result = SchemaDiff {
        added_tables: Vec::new(),
        removed_tables: Vec::new(),
        modified_tables: Vec::new(),
    };

    for table in &after.tables {
        if before.table(&table.name).is_none() {
            result.added_tables.push(table.clone());
        }
    }

    for table in &before.tables {
        match after.table(&table.name) {
            None => result.removed_tables.push(table.clone()),
            Some(target) => {
                let table_diff = diff_table(table, target);
                if !table_diff.is_empty() {
                    result.modified_tables.push(table_diff);
                }
            }
        }
    }

    result
}

fn diff_table(before: &Table, after: &Table) -> TableDiff {
    let mut diff = TableDiff::new(&before.name);

    for column in &after.columns {
        if before.column(&column.name).is_none() {
            diff.added_columns.push(column.clone());
        }
    }
    for column in &before.columns {
        match after.column(&column.name) {
            None => diff.removed_columns.push(column.clone()),
            Some(target) => {
                let changes = column_changes(column, target);
                if !changes.is_empty() {
                    diff.modified_columns.push(ColumnDiff {
                        column_name: column.name.clone(),
                        old: column.clone(),
                        new: target.clone(),
                        changes,
                    });
                }
            }
        }
    }

    for index in &after.indexes {
        match before.index(&index.name) {
            Some(existing) if indexes_equal(existing, index) => {}
            Some(existing) => {
                // Changed in place: drop the old shape, create the new one.
                diff.removed_indexes.push(existing.clone());
                diff.added_indexes.push(index.clone());
            }
            None => diff.added_indexes.push(index.clone()),
        }
    }
    for index in &before.indexes {
        if after.index(&index.name).is_none() {
            diff.removed_indexes.push(index.clone());
        }
    }

    for fk in &after.foreign_keys {
        match before.foreign_key(&fk.name) {
            Some(existing) if existing == fk => {}
            Some(existing) => {
                diff.removed_foreign_keys.push(existing.clone());
                diff.added_foreign_keys.push(fk.clone());
            }
            None => diff.added_foreign_keys.push(fk.clone()),
        }
    }
    for fk in &before.foreign_keys {
        if after.foreign_key(&fk.name).is_none() {
            diff.removed_foreign_keys.push(fk.clone());
        }
    }

    diff
}

fn indexes_equal(a: &Index, b: &Index) -> bool {
    // Column ordering is significant, matching the hash.
    a.columns == b.columns && a.unique == b.unique
}

fn column_changes(old: &Column, new: &Column) -> Vec<ColumnChange> {
    let mut changes = Vec::new();
    if old.logical_type != new.logical_type {
        changes.push(ColumnChange::Type);
    }
    if old.nullable != new.nullable {
        changes.push(ColumnChange::Nullable);
    }
    if old.default_trimmed() != new.default_trimmed() {
        changes.push(ColumnChange::Default);
    }
    if old.is_primary_key != new.is_primary_key {
        changes.push(ColumnChange::PrimaryKey);
    }
    changes
}
