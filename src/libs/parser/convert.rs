//! Conversion from parsed SQL statements into the schema model.
//!
//! Only the declarative subset is accepted: `CREATE TABLE`,
//! `CREATE [UNIQUE] INDEX`, and the narrow `ALTER TABLE` surface used to
//! keep constraints separate from table bodies. Everything else (dropped
//! objects, transaction control, `IF NOT EXISTS`, `CREATE OR REPLACE`) is
//! rejected with a located issue rather than silently ignored.
//!
//! Conversion runs in two passes over all statements of all files: tables
//! first, then indexes and alterations, so a `CREATE INDEX` may precede its
//! table across file boundaries.

use crate::libs::error::ParseIssue;
use crate::libs::schema::{Column, ForeignKey, Index, RefAction, Schema, Table};
use crate::libs::types::{normalize_type, Dialect};
use sqlparser::ast::{
    AlterColumnOperation, AlterTable, AlterTableOperation, ColumnDef, ColumnOption, Expr, IndexColumn, ObjectName,
    ObjectNamePart, ReferentialAction, Statement, TableConstraint,
};

/// A statement accepted into the declarative subset, with its location.
pub enum DeclStatement {
    CreateTable {
        statement: Box<sqlparser::ast::CreateTable>,
        file: String,
        line: usize,
        column: usize,
    },
    CreateIndex {
        statement: Box<sqlparser::ast::CreateIndex>,
        file: String,
        line: usize,
        column: usize,
    },
    AlterTable {
        name: ObjectName,
        operations: Vec<AlterTableOperation>,
        file: String,
        line: usize,
        column: usize,
    },
}

pub struct Located<'a> {
    pub file: &'a str,
    pub line: usize,
    pub column: usize,
    pub context: &'a str,
}

impl Located<'_> {
    fn issue(&self, code: &str, message: impl Into<String>) -> ParseIssue {
        ParseIssue {
            file: self.file.to_string(),
            line: self.line,
            column: self.column,
            code: code.to_string(),
            message: message.into(),
            context: self.context.to_string(),
            hint: None,
        }
    }

    fn issue_with_hint(&self, code: &str, message: impl Into<String>, hint: impl Into<String>) -> ParseIssue {
        let mut issue = self.issue(code, message);
        issue.hint = Some(hint.into());
        issue
    }
}

pub fn object_name(name: &ObjectName) -> String {
    name.0
        .last()
        .map(|part| match part {
            ObjectNamePart::Identifier(ident) => ident.value.clone(),
            other => other.to_string(),
        })
        .unwrap_or_default()
}

fn index_column_name(column: &IndexColumn) -> Option<String> {
    match &column.column.expr {
        Expr::Identifier(ident) => Some(ident.value.clone()),
        _ => None,
    }
}

fn referential_action(action: &Option<ReferentialAction>) -> Option<RefAction> {
    match action.as_ref()? {
        ReferentialAction::Cascade => Some(RefAction::Cascade),
        ReferentialAction::Restrict => Some(RefAction::Restrict),
        ReferentialAction::SetNull => Some(RefAction::SetNull),
        ReferentialAction::SetDefault => Some(RefAction::SetDefault),
        // NO ACTION and the dialect default compare equal.
        _ => None,
    }
}

/// Screens one parsed statement into the declarative subset, or reports why
/// it is rejected.
pub fn screen_statement(
    statement: Statement,
    location: &Located<'_>,
) -> Result<Option<DeclStatement>, ParseIssue> {
    match statement {
        Statement::CreateTable(create) => {
            if create.or_replace {
                return Err(location.issue_with_hint(
                    "non-declarative",
                    "CREATE OR REPLACE is not declarative",
                    "state the desired table once; lockplane computes the transition",
                ));
            }
            if create.if_not_exists {
                return Err(location.issue_with_hint(
                    "non-declarative",
                    "IF NOT EXISTS is not declarative",
                    "remove IF NOT EXISTS; schema files describe the desired state unconditionally",
                ));
            }
            Ok(Some(DeclStatement::CreateTable {
                statement: Box::new(create),
                file: location.file.to_string(),
                line: location.line,
                column: location.column,
            }))
        }
        Statement::CreateIndex(create) => {
            if create.if_not_exists {
                return Err(location.issue_with_hint(
                    "non-declarative",
                    "IF NOT EXISTS is not declarative",
                    "remove IF NOT EXISTS; schema files describe the desired state unconditionally",
                ));
            }
            Ok(Some(DeclStatement::CreateIndex {
                statement: Box::new(create),
                file: location.file.to_string(),
                line: location.line,
                column: location.column,
            }))
        }
        Statement::AlterTable(AlterTable { name, operations, .. }) => Ok(Some(DeclStatement::AlterTable {
            name,
            operations,
            file: location.file.to_string(),
            line: location.line,
            column: location.column,
        })),
        Statement::Drop { .. } => Err(location.issue_with_hint(
            "destructive",
            "DROP is destructive and not allowed in schema files",
            "remove the object from the schema files instead; lockplane plans the drop",
        )),
        Statement::Truncate { .. } => Err(location.issue("destructive", "TRUNCATE is destructive and not allowed in schema files")),
        Statement::Delete(_) => Err(location.issue("destructive", "DELETE is destructive and not allowed in schema files")),
        Statement::StartTransaction { .. } | Statement::Commit { .. } | Statement::Rollback { .. } => {
            Err(location.issue_with_hint(
                "transaction-control",
                "transaction control does not belong in schema files",
                "lockplane wraps every apply in its own transaction",
            ))
        }
        other => Err(location.issue(
            "non-declarative",
            format!("only CREATE TABLE, CREATE INDEX and a limited ALTER TABLE surface are allowed; found: {}", summarize(&other)),
        )),
    }
}

fn summarize(statement: &Statement) -> String {
    let rendered = statement.to_string();
    let mut words = rendered.split_whitespace();
    let head: Vec<&str> = words.by_ref().take(3).collect();
    head.join(" ")
}

/// Builds a table from a `CREATE TABLE` statement. Issues are collected,
/// not short-circuited, so one statement can report several problems.
pub fn build_table(
    create: &sqlparser::ast::CreateTable,
    dialect: Dialect,
    location: &Located<'_>,
    issues: &mut Vec<ParseIssue>,
) -> Table {
    let name = object_name(&create.name);
    let mut table = Table::new(name.clone());

    if create.columns.is_empty() {
        issues.push(location.issue("structure", format!("table '{name}' has no columns")));
    }

    for column_def in &create.columns {
        if table.column(&column_def.name.value).is_some() {
            issues.push(location.issue(
                "structure",
                format!("duplicate column '{}' in table '{name}'", column_def.name.value),
            ));
            continue;
        }
        if let Some(column) = build_column(column_def, &name, dialect, location, issues, &mut table) {
            table.columns.push(column);
        }
    }

    for constraint in &create.constraints {
        apply_table_constraint(constraint, &mut table, location, issues);
    }

    table
}

fn build_column(
    column_def: &ColumnDef,
    table_name: &str,
    dialect: Dialect,
    location: &Located<'_>,
    issues: &mut Vec<ParseIssue>,
    table: &mut Table,
) -> Option<Column> {
    let raw_type = column_def.data_type.to_string();
    if raw_type.trim().is_empty() {
        issues.push(location.issue(
            "structure",
            format!("column '{}' in table '{table_name}' has no data type", column_def.name.value),
        ));
        return None;
    }

    let logical_type = match normalize_type(&raw_type, dialect) {
        Ok(logical) => logical,
        Err(unknown) => {
            issues.push(location.issue("unknown-type", unknown.to_string()));
            return None;
        }
    };

    let mut column = Column {
        name: column_def.name.value.clone(),
        raw_type,
        logical_type,
        nullable: true,
        default: None,
        is_primary_key: false,
    };

    for option_def in &column_def.options {
        match &option_def.option {
            ColumnOption::NotNull => column.nullable = false,
            ColumnOption::Null => column.nullable = true,
            ColumnOption::Default(expr) => column.default = Some(expr.to_string()),
            ColumnOption::PrimaryKey(_) => {
                column.is_primary_key = true;
                column.nullable = false;
            }
            ColumnOption::Unique(_) => {
                table.indexes.push(Index {
                    name: format!("{table_name}_{}_key", column.name),
                    columns: vec![column.name.clone()],
                    unique: true,
                });
            }
            ColumnOption::ForeignKey(fk) => {
                table.foreign_keys.push(ForeignKey {
                    name: format!("{table_name}_{}_fkey", column.name),
                    columns: vec![column.name.clone()],
                    referenced_table: object_name(&fk.foreign_table),
                    referenced_columns: fk.referred_columns.iter().map(|c| c.value.clone()).collect(),
                    on_delete: referential_action(&fk.on_delete),
                    on_update: referential_action(&fk.on_update),
                });
            }
            // Check constraints and engine-specific options are outside the
            // schema model.
            _ => {}
        }
    }

    Some(column)
}

fn apply_table_constraint(
    constraint: &TableConstraint,
    table: &mut Table,
    location: &Located<'_>,
    issues: &mut Vec<ParseIssue>,
) {
    match constraint {
        TableConstraint::PrimaryKey(pk) => {
            for index_column in &pk.columns {
                let Some(column_name) = index_column_name(index_column) else {
                    issues.push(location.issue("structure", "expression primary keys are not supported"));
                    continue;
                };
                match table.columns.iter_mut().find(|c| c.name == column_name) {
                    Some(column) => {
                        column.is_primary_key = true;
                        column.nullable = false;
                    }
                    None => issues.push(location.issue(
                        "structure",
                        format!("primary key references missing column '{column_name}' in table '{}'", table.name),
                    )),
                }
            }
        }
        TableConstraint::Unique(unique) => {
            let mut column_names = Vec::new();
            for index_column in &unique.columns {
                match index_column_name(index_column) {
                    Some(column_name) => column_names.push(column_name),
                    None => issues.push(location.issue("structure", "expression unique constraints are not supported")),
                }
            }
            let index_name = unique
                .name
                .as_ref()
                .map(|n| n.value.clone())
                .unwrap_or_else(|| format!("{}_{}_key", table.name, column_names.join("_")));
            table.indexes.push(Index {
                name: index_name,
                columns: column_names,
                unique: true,
            });
        }
        TableConstraint::ForeignKey(fk) => {
            let local: Vec<String> = fk.columns.iter().map(|c| c.value.clone()).collect();
            let fk_name = fk
                .name
                .as_ref()
                .map(|n| n.value.clone())
                .unwrap_or_else(|| format!("{}_{}_fkey", table.name, local.join("_")));
            table.foreign_keys.push(ForeignKey {
                name: fk_name,
                columns: local,
                referenced_table: object_name(&fk.foreign_table),
                referenced_columns: fk.referred_columns.iter().map(|c| c.value.clone()).collect(),
                on_delete: referential_action(&fk.on_delete),
                on_update: referential_action(&fk.on_update),
            });
        }
        // Check constraints are not modeled.
        TableConstraint::Check { .. } => {}
        _ => {}
    }
}

/// Applies one `CREATE INDEX` statement to the schema being built.
pub fn apply_create_index(
    create: &sqlparser::ast::CreateIndex,
    schema: &mut Schema,
    location: &Located<'_>,
    issues: &mut Vec<ParseIssue>,
) {
    let table_name = object_name(&create.table_name);
    let Some(table) = schema.tables.iter_mut().find(|t| t.name == table_name) else {
        issues.push(location.issue("structure", format!("index on missing table '{table_name}'")));
        return;
    };

    let mut column_names = Vec::new();
    for index_column in &create.columns {
        match index_column_name(index_column) {
            Some(column_name) => column_names.push(column_name),
            None => issues.push(location.issue("structure", "expression indexes are not supported")),
        }
    }

    let index_name = create
        .name
        .as_ref()
        .map(object_name)
        .unwrap_or_else(|| format!("{table_name}_{}_idx", column_names.join("_")));

    if table.index(&index_name).is_some() {
        issues.push(location.issue(
            "structure",
            format!("duplicate index '{index_name}' on table '{table_name}'"),
        ));
        return;
    }

    table.indexes.push(Index {
        name: index_name,
        columns: column_names,
        unique: create.unique,
    });
}

/// Applies the allowed `ALTER TABLE` surface to the schema being built.
pub fn apply_alter_table(
    name: &ObjectName,
    operations: &[AlterTableOperation],
    dialect: Dialect,
    schema: &mut Schema,
    location: &Located<'_>,
    issues: &mut Vec<ParseIssue>,
) {
    let table_name = object_name(name);
    let Some(position) = schema.tables.iter().position(|t| t.name == table_name) else {
        issues.push(location.issue("structure", format!("ALTER TABLE on missing table '{table_name}'")));
        return;
    };

    for operation in operations {
        match operation {
            AlterTableOperation::AddColumn { column_def, .. } => {
                let table = &mut schema.tables[position];
                if table.column(&column_def.name.value).is_some() {
                    issues.push(location.issue(
                        "structure",
                        format!("duplicate column '{}' in table '{table_name}'", column_def.name.value),
                    ));
                    continue;
                }
                if let Some(column) = build_column(column_def, &table_name, dialect, location, issues, table) {
                    table.columns.push(column);
                }
            }
            AlterTableOperation::DropColumn { .. } => {
                issues.push(location.issue_with_hint(
                    "destructive",
                    "ALTER TABLE ... DROP COLUMN is destructive and not allowed in schema files",
                    "remove the column from the CREATE TABLE statement instead; lockplane plans the drop",
                ));
            }
            AlterTableOperation::AlterColumn { column_name, op } => {
                apply_alter_column(&mut schema.tables[position], &column_name.value, op, dialect, location, issues);
            }
            AlterTableOperation::AddConstraint { constraint, .. } => {
                apply_table_constraint(constraint, &mut schema.tables[position], location, issues);
            }
            AlterTableOperation::DropConstraint { name, .. } => {
                let table = &mut schema.tables[position];
                let constraint_name = name.value.clone();
                let fk_count = table.foreign_keys.len();
                table.foreign_keys.retain(|fk| fk.name != constraint_name);
                let index_count = table.indexes.len();
                table.indexes.retain(|idx| idx.name != constraint_name);
                if table.foreign_keys.len() == fk_count && table.indexes.len() == index_count {
                    issues.push(location.issue(
                        "structure",
                        format!("DROP CONSTRAINT '{constraint_name}' does not match any constraint on '{table_name}'"),
                    ));
                }
            }
            AlterTableOperation::RenameColumn { .. } => {
                issues.push(location.issue_with_hint(
                    "non-declarative",
                    "RENAME COLUMN is not expressible declaratively",
                    "use the expand/contract multi-phase pattern: lockplane phase plan rename",
                ));
            }
            other => {
                issues.push(location.issue(
                    "non-declarative",
                    format!("unsupported ALTER TABLE operation: {other}"),
                ));
            }
        }
    }
}

fn apply_alter_column(
    table: &mut Table,
    column_name: &str,
    op: &AlterColumnOperation,
    dialect: Dialect,
    location: &Located<'_>,
    issues: &mut Vec<ParseIssue>,
) {
    let table_name = table.name.clone();
    let Some(column) = table.columns.iter_mut().find(|c| c.name == column_name) else {
        issues.push(location.issue(
            "structure",
            format!("ALTER COLUMN references missing column '{column_name}' on '{table_name}'"),
        ));
        return;
    };

    match op {
        AlterColumnOperation::SetNotNull => column.nullable = false,
        AlterColumnOperation::DropNotNull => {
            if column.is_primary_key {
                issues.push(location.issue(
                    "structure",
                    format!("primary-key column '{column_name}' cannot be nullable"),
                ));
            } else {
                column.nullable = true;
            }
        }
        AlterColumnOperation::SetDefault { value } => column.default = Some(value.to_string()),
        AlterColumnOperation::DropDefault => column.default = None,
        AlterColumnOperation::SetDataType { data_type, .. } => {
            let raw = data_type.to_string();
            match normalize_type(&raw, dialect) {
                Ok(logical) => {
                    column.raw_type = raw;
                    column.logical_type = logical;
                }
                Err(unknown) => issues.push(location.issue("unknown-type", unknown.to_string())),
            }
        }
        other => {
            issues.push(location.issue(
                "non-declarative",
                format!("unsupported ALTER COLUMN operation: {other}"),
            ));
        }
    }
}
