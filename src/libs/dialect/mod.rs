//! Dialect registry: per-dialect identifier quoting and DDL emission.
//!
//! Each supported engine implements [`SqlDialect`]. Emitters return
//! [`Emitted`], which is either executable SQL or a comment-only stub
//! recording why the dialect cannot express the operation; the planner
//! reacts to comment-only stubs by falling back to the table-recreation
//! protocol where one applies.
//!
//! Type normalization and rendering live in [`crate::libs::types`]; this
//! module is purely about SQL shape.

mod postgres;
mod sqlite;

use crate::libs::schema::{Column, ForeignKey, Index, Table};
use crate::libs::types::Dialect;

pub use postgres::PostgresDialect;
pub use sqlite::SqliteDialect;

/// Output of a DDL emitter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Emitted {
    Sql(String),
    /// The dialect cannot express the operation directly. The comment is a
    /// valid SQL comment line; the reason feeds the planner's fallback
    /// decision and the step description.
    CommentOnly { comment: String, reason: String },
}

impl Emitted {
    pub fn comment(reason: impl Into<String>) -> Emitted {
        let reason = reason.into();
        Emitted::CommentOnly {
            comment: format!("-- {reason}"),
            reason,
        }
    }

    pub fn is_comment_only(&self) -> bool {
        matches!(self, Emitted::CommentOnly { .. })
    }

    /// The text placed into the plan step, comment or not.
    pub fn sql_text(&self) -> &str {
        match self {
            Emitted::Sql(sql) => sql,
            Emitted::CommentOnly { comment, .. } => comment,
        }
    }
}

/// SQL code generation surface of one dialect.
///
/// Implementations render from the canonical schema model; they never
/// consult a live database.
pub trait SqlDialect: Sync {
    /// The dialect this driver emits for.
    fn dialect(&self) -> Dialect;

    /// Quote an identifier (table, column, index name).
    fn quote_identifier(&self, ident: &str) -> String;

    /// `CREATE TABLE` for the full table shape. Foreign keys are included
    /// inline only where the dialect cannot add them afterwards.
    fn create_table(&self, table: &Table) -> String;

    fn drop_table(&self, name: &str) -> String;

    fn add_column(&self, table: &str, column: &Column) -> Emitted;

    fn drop_column(&self, table: &str, column: &str) -> Emitted;

    fn alter_column_type(&self, table: &str, column: &Column) -> Emitted;

    fn alter_column_nullable(&self, table: &str, column: &str, nullable: bool) -> Emitted;

    fn alter_column_default(&self, table: &str, column: &str, default: Option<&str>) -> Emitted;

    fn add_index(&self, table: &str, index: &Index) -> String;

    fn drop_index(&self, table: &str, index: &Index) -> String;

    fn add_foreign_key(&self, table: &str, fk: &ForeignKey) -> Emitted;

    fn drop_foreign_key(&self, table: &str, fk: &ForeignKey) -> Emitted;

    /// Renders the column-definition fragment used inside `CREATE TABLE`
    /// and `ADD COLUMN`.
    fn column_definition(&self, column: &Column, inline_primary_key: bool) -> String {
        let mut fragment = format!("{} {}", self.quote_identifier(&column.name), column.sql_type(self.dialect()));
        if !column.nullable {
            fragment.push_str(" NOT NULL");
        }
        if let Some(default) = column.default_trimmed() {
            fragment.push_str(" DEFAULT ");
            fragment.push_str(default);
        }
        if inline_primary_key && column.is_primary_key {
            fragment.push_str(" PRIMARY KEY");
        }
        fragment
    }

    /// Renders the `FOREIGN KEY (…) REFERENCES …` clause body shared by
    /// inline and `ADD CONSTRAINT` forms.
    fn foreign_key_clause(&self, fk: &ForeignKey) -> String {
        let locals: Vec<String> = fk.columns.iter().map(|c| self.quote_identifier(c)).collect();
        let referenced: Vec<String> = fk.referenced_columns.iter().map(|c| self.quote_identifier(c)).collect();
        let mut clause = format!(
            "FOREIGN KEY ({}) REFERENCES {} ({})",
            locals.join(", "),
            self.quote_identifier(&fk.referenced_table),
            referenced.join(", ")
        );
        if let Some(action) = fk.on_delete {
            clause.push_str(" ON DELETE ");
            clause.push_str(action.as_sql());
        }
        if let Some(action) = fk.on_update {
            clause.push_str(" ON UPDATE ");
            clause.push_str(action.as_sql());
        }
        clause
    }
}

static POSTGRES: PostgresDialect = PostgresDialect;
static SQLITE: SqliteDialect = SqliteDialect { dialect: Dialect::Sqlite };
static LIBSQL: SqliteDialect = SqliteDialect { dialect: Dialect::Libsql };

/// Looks up the driver for a dialect. libSQL shares the SQLite driver
/// behavior but keeps its own tag for diagnostics.
pub fn driver(dialect: Dialect) -> &'static dyn SqlDialect {
    match dialect {
        Dialect::Postgres => &POSTGRES,
        Dialect::Sqlite => &SQLITE,
        Dialect::Libsql => &LIBSQL,
    }
}
