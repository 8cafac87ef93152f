//! Structural validation of a freshly parsed schema.
//!
//! Runs after conversion and collects every referential integrity problem
//! in one pass: foreign keys pointing at missing tables or columns, indexes
//! over missing columns, arity mismatches. Non-fatal findings (a table
//! without a primary key, index names reused across tables) become
//! warnings.

use crate::libs::error::{ParseIssue, Warning};
use crate::libs::schema::Schema;
use std::collections::HashMap;

/// Validates cross-object references inside `schema`, appending issues and
/// warnings. The `origin` map carries each table's declaration site for
/// error locations.
pub fn validate_schema(
    schema: &Schema,
    origin: &HashMap<String, (String, usize)>,
    issues: &mut Vec<ParseIssue>,
    warnings: &mut Vec<Warning>,
) {
    let mut index_owners: HashMap<&str, Vec<&str>> = HashMap::new();

    for table in &schema.tables {
        let (file, line) = origin
            .get(&table.name)
            .map(|(f, l)| (f.as_str(), *l))
            .unwrap_or(("<schema>", 0));

        let issue = |code: &str, message: String| ParseIssue {
            file: file.to_string(),
            line,
            column: 1,
            code: code.to_string(),
            message,
            context: String::new(),
            hint: None,
        };

        if table.primary_key_columns().is_empty() {
            warnings.push(Warning {
                file: file.to_string(),
                line,
                message: format!("table '{}' has no primary key", table.name),
            });
        }

        for index in &table.indexes {
            index_owners.entry(index.name.as_str()).or_default().push(table.name.as_str());
            for column in &index.columns {
                if table.column(column).is_none() {
                    issues.push(issue(
                        "structure",
                        format!("index '{}' references missing column '{}.{}'", index.name, table.name, column),
                    ));
                }
            }
        }

        for fk in &table.foreign_keys {
            if fk.columns.len() != fk.referenced_columns.len() {
                issues.push(issue(
                    "structure",
                    format!(
                        "foreign key '{}' has {} local column(s) but {} referenced column(s)",
                        fk.name,
                        fk.columns.len(),
                        fk.referenced_columns.len()
                    ),
                ));
            }
            for column in &fk.columns {
                if table.column(column).is_none() {
                    issues.push(issue(
                        "structure",
                        format!("foreign key '{}' references missing column '{}.{}'", fk.name, table.name, column),
                    ));
                }
            }
            match schema.table(&fk.referenced_table) {
                None => issues.push(issue(
                    "structure",
                    format!("foreign key '{}' references missing table '{}'", fk.name, fk.referenced_table),
                )),
                Some(referenced) => {
                    for column in &fk.referenced_columns {
                        if referenced.column(column).is_none() {
                            issues.push(issue(
                                "structure",
                                format!(
                                    "foreign key '{}' references missing column '{}.{}'",
                                    fk.name, fk.referenced_table, column
                                ),
                            ));
                        }
                    }
                }
            }
        }
    }

    for (index_name, owners) in index_owners {
        if owners.len() > 1 {
            warnings.push(Warning {
                file: "<schema>".to_string(),
                line: 0,
                message: format!("index name '{}' is used by multiple tables: {}", index_name, owners.join(", ")),
            });
        }
    }
}
