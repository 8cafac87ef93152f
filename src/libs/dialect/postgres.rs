//! PostgreSQL DDL emission.
//!
//! PostgreSQL can express the entire operation surface directly, so no
//! emitter here ever returns a comment-only stub. Foreign keys are emitted
//! as separate `ALTER TABLE … ADD CONSTRAINT` statements rather than inline,
//! which lets the planner order them after every referenced table exists.

use super::{Emitted, SqlDialect};
use crate::libs::schema::{Column, ForeignKey, Index, Table};
use crate::libs::types::{render_type, Dialect};

pub struct PostgresDialect;

impl SqlDialect for PostgresDialect {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    fn quote_identifier(&self, ident: &str) -> String {
        format!("\"{}\"", ident.replace('"', "\"\""))
    }

    fn create_table(&self, table: &Table) -> String {
        let pk_columns = table.primary_key_columns();
        let inline_pk = pk_columns.len() == 1;

        let mut parts: Vec<String> = table
            .columns
            .iter()
            .map(|column| format!("    {}", self.column_definition(column, inline_pk)))
            .collect();

        if pk_columns.len() > 1 {
            let names: Vec<String> = pk_columns.iter().map(|c| self.quote_identifier(&c.name)).collect();
            parts.push(format!("    PRIMARY KEY ({})", names.join(", ")));
        }

        format!(
            "CREATE TABLE {} (\n{}\n)",
            self.quote_identifier(&table.name),
            parts.join(",\n")
        )
    }

    fn drop_table(&self, name: &str) -> String {
        format!("DROP TABLE {} CASCADE", self.quote_identifier(name))
    }

    fn add_column(&self, table: &str, column: &Column) -> Emitted {
        Emitted::Sql(format!(
            "ALTER TABLE {} ADD COLUMN {}",
            self.quote_identifier(table),
            self.column_definition(column, false)
        ))
    }

    fn drop_column(&self, table: &str, column: &str) -> Emitted {
        Emitted::Sql(format!(
            "ALTER TABLE {} DROP COLUMN {}",
            self.quote_identifier(table),
            self.quote_identifier(column)
        ))
    }

    fn alter_column_type(&self, table: &str, column: &Column) -> Emitted {
        let rendered = render_type(&column.logical_type, Dialect::Postgres);
        Emitted::Sql(format!(
            "ALTER TABLE {} ALTER COLUMN {} TYPE {} USING {}::{}",
            self.quote_identifier(table),
            self.quote_identifier(&column.name),
            rendered,
            self.quote_identifier(&column.name),
            rendered
        ))
    }

    fn alter_column_nullable(&self, table: &str, column: &str, nullable: bool) -> Emitted {
        let clause = if nullable { "DROP NOT NULL" } else { "SET NOT NULL" };
        Emitted::Sql(format!(
            "ALTER TABLE {} ALTER COLUMN {} {}",
            self.quote_identifier(table),
            self.quote_identifier(column),
            clause
        ))
    }

    fn alter_column_default(&self, table: &str, column: &str, default: Option<&str>) -> Emitted {
        let sql = match default {
            Some(expr) => format!(
                "ALTER TABLE {} ALTER COLUMN {} SET DEFAULT {}",
                self.quote_identifier(table),
                self.quote_identifier(column),
                expr
            ),
            None => format!(
                "ALTER TABLE {} ALTER COLUMN {} DROP DEFAULT",
                self.quote_identifier(table),
                self.quote_identifier(column)
            ),
        };
        Emitted::Sql(sql)
    }

    fn add_index(&self, table: &str, index: &Index) -> String {
        let columns: Vec<String> = index.columns.iter().map(|c| self.quote_identifier(c)).collect();
        let unique = if index.unique { "UNIQUE " } else { "" };
        format!(
            "CREATE {}INDEX {} ON {} ({})",
            unique,
            self.quote_identifier(&index.name),
            self.quote_identifier(table),
            columns.join(", ")
        )
    }

    fn drop_index(&self, _table: &str, index: &Index) -> String {
        format!("DROP INDEX {}", self.quote_identifier(&index.name))
    }

    fn add_foreign_key(&self, table: &str, fk: &ForeignKey) -> Emitted {
        Emitted::Sql(format!(
            "ALTER TABLE {} ADD CONSTRAINT {} {}",
            self.quote_identifier(table),
            self.quote_identifier(&fk.name),
            self.foreign_key_clause(fk)
        ))
    }

    fn drop_foreign_key(&self, table: &str, fk: &ForeignKey) -> Emitted {
        Emitted::Sql(format!(
            "ALTER TABLE {} DROP CONSTRAINT {}",
            self.quote_identifier(table),
            self.quote_identifier(&fk.name)
        ))
    }
}
