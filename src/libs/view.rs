//! Console display and table formatting for lockplane output.
//!
//! Renders plans, diffs and multi-phase plans as console tables. All
//! methods are static; the presentation layer stays out of the pipeline
//! types themselves.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use lockplane::libs::view::View;
//! # let plan = lockplane::libs::plan::Plan::new("");
//! View::plan(&plan)?;
//! # Ok::<(), anyhow::Error>(())
//! ```

use crate::libs::differ::SchemaDiff;
use crate::libs::plan::{MultiPhasePlan, Plan};
use anyhow::Result;
use prettytable::{format, row, Table};

pub struct View;

impl View {
    /// Displays a plan as a step table: index, safety, flags, description
    /// and the SQL to run.
    pub fn plan(plan: &Plan) -> Result<()> {
        let mut table = Table::new();
        table.set_format(*format::consts::FORMAT_NO_LINESEP_WITH_TITLE);
        table.set_titles(row!["#", "SAFETY", "BREAKING", "DATA LOSS", "DESCRIPTION", "SQL"]);

        for (index, step) in plan.steps.iter().enumerate() {
            table.add_row(row![
                index + 1,
                step.safety_level,
                if step.breaking_change { "yes" } else { "" },
                if step.data_loss { "yes" } else { "" },
                step.description,
                condense(&step.sql),
            ]);
        }

        table.printstd();
        Ok(())
    }

    /// Displays a schema diff grouped by change kind.
    pub fn diff(diff: &SchemaDiff) -> Result<()> {
        let mut table = Table::new();
        table.set_format(*format::consts::FORMAT_NO_LINESEP_WITH_TITLE);
        table.set_titles(row!["CHANGE", "TABLE", "DETAIL"]);

        for added in &diff.added_tables {
            table.add_row(row!["add table", added.name, format!("{} column(s)", added.columns.len())]);
        }
        for removed in &diff.removed_tables {
            table.add_row(row!["drop table", removed.name, format!("{} column(s)", removed.columns.len())]);
        }
        for modified in &diff.modified_tables {
            for column in &modified.added_columns {
                table.add_row(row!["add column", modified.table_name, column.name]);
            }
            for column in &modified.removed_columns {
                table.add_row(row!["drop column", modified.table_name, column.name]);
            }
            for column in &modified.modified_columns {
                let changes: Vec<String> = column.changes.iter().map(|c| format!("{c:?}").to_lowercase()).collect();
                table.add_row(row![
                    "modify column",
                    modified.table_name,
                    format!("{} ({})", column.column_name, changes.join(", "))
                ]);
            }
            for index in &modified.added_indexes {
                table.add_row(row!["add index", modified.table_name, index.name]);
            }
            for index in &modified.removed_indexes {
                table.add_row(row!["drop index", modified.table_name, index.name]);
            }
            for fk in &modified.added_foreign_keys {
                table.add_row(row!["add foreign key", modified.table_name, fk.name]);
            }
            for fk in &modified.removed_foreign_keys {
                table.add_row(row!["drop foreign key", modified.table_name, fk.name]);
            }
        }

        table.printstd();
        Ok(())
    }

    /// Displays a multi-phase plan: one row per phase with its gate.
    pub fn phases(plan: &MultiPhasePlan) -> Result<()> {
        let mut table = Table::new();
        table.set_format(*format::consts::FORMAT_NO_LINESEP_WITH_TITLE);
        table.set_titles(row!["PHASE", "NAME", "CODE DEPLOY", "DDL STEPS", "VERIFICATION"]);

        for phase in &plan.phases {
            table.add_row(row![
                phase.phase_number,
                phase.name,
                if phase.requires_code_deploy { "required" } else { "" },
                phase.plan.steps.len(),
                phase.verification.len(),
            ]);
        }

        table.printstd();
        Ok(())
    }
}

/// Flattens multi-line SQL for table display.
fn condense(sql: &str) -> String {
    let flattened: Vec<&str> = sql.split_whitespace().collect();
    let mut text = flattened.join(" ");
    if text.len() > 80 {
        text.truncate(77);
        text.push_str("...");
    }
    text
}
