//! SQLite-family DDL emission.
//!
//! SQLite's `ALTER TABLE` surface is narrow: columns can be added and
//! dropped, but not retyped, re-nulled or re-defaulted, and foreign keys
//! cannot be touched on an existing table. Where the surface ends the
//! emitters return comment-only stubs and the planner substitutes the
//! atomic table-recreation protocol.
//!
//! Foreign keys are inlined into `CREATE TABLE` because that is the only
//! place the dialect accepts them.

use super::{Emitted, SqlDialect};
use crate::libs::schema::{Column, ForeignKey, Index, Table};
use crate::libs::types::Dialect;

pub struct SqliteDialect {
    pub dialect: Dialect,
}

impl SqlDialect for SqliteDialect {
    fn dialect(&self) -> Dialect {
        self.dialect
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

        for fk in &table.foreign_keys {
            parts.push(format!("    {}", self.foreign_key_clause(fk)));
        }

        format!(
            "CREATE TABLE {} (\n{}\n)",
            self.quote_identifier(&table.name),
            parts.join(",\n")
        )
    }

    fn drop_table(&self, name: &str) -> String {
        // No CASCADE in SQLite; dependent objects go with the table.
        format!("DROP TABLE {}", self.quote_identifier(name))
    }

    fn add_column(&self, table: &str, column: &Column) -> Emitted {
        // ADD COLUMN cannot introduce a primary key, and a NOT NULL column
        // needs a non-null default for existing rows.
        if column.is_primary_key {
            return Emitted::comment(format!(
                "sqlite cannot add primary-key column '{}' to existing table '{}'",
                column.name, table
            ));
        }
        if !column.nullable && column.default_trimmed().is_none() {
            return Emitted::comment(format!(
                "sqlite cannot add NOT NULL column '{}' without a default to existing table '{}'",
                column.name, table
            ));
        }
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
        Emitted::comment(format!(
            "sqlite cannot alter the type of column '{}' on '{}'; table recreation required",
            column.name, table
        ))
    }

    fn alter_column_nullable(&self, table: &str, column: &str, nullable: bool) -> Emitted {
        let direction = if nullable { "drop" } else { "add" };
        Emitted::comment(format!(
            "sqlite cannot {direction} NOT NULL on column '{column}' of '{table}'; table recreation required"
        ))
    }

    fn alter_column_default(&self, table: &str, column: &str, _default: Option<&str>) -> Emitted {
        Emitted::comment(format!(
            "sqlite cannot change the default of column '{column}' on '{table}'; table recreation required"
        ))
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
        Emitted::comment(format!(
            "sqlite cannot add foreign key '{}' to existing table '{}'; table recreation required",
            fk.name, table
        ))
    }

    fn drop_foreign_key(&self, table: &str, fk: &ForeignKey) -> Emitted {
        Emitted::comment(format!(
            "sqlite cannot drop foreign key '{}' from table '{}'; table recreation required",
            fk.name, table
        ))
    }
}
