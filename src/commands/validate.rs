//! Schema file validation command.
//!
//! Parses a schema file or directory without touching any database,
//! reporting every parse error and structural issue in one pass.

use crate::commands::resolve_schema_path;
use crate::libs::config::Config;
use crate::libs::messages::Message;
use crate::libs::parser::{parse_schema_path, ParseOutcome};
use crate::libs::types::Dialect;
use crate::{msg_success, msg_warning};
use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

/// Command-line arguments for the validate command.
#[derive(Debug, Args)]
pub struct ValidateArgs {
    #[arg(long, short, help = "Schema file or directory of .lp.sql files")]
    schema: Option<PathBuf>,

    /// Dialect to validate against when no database is involved
    #[arg(long, default_value = "postgres", help = "Dialect to parse with (postgres, sqlite, libsql)")]
    dialect: Dialect,
}

pub fn cmd(args: ValidateArgs) -> Result<()> {
    let config = Config::read()?;
    let schema_path = resolve_schema_path(args.schema.clone(), &config)?;

    let ParseOutcome { schema, warnings } = parse_schema_path(&schema_path, args.dialect)?;

    for warning in &warnings {
        msg_warning!(Message::ParseWarning(warning.to_string()));
    }

    msg_success!(Message::SchemaParsed {
        tables: schema.tables.len(),
        files: count_schema_files(&schema_path),
    });
    msg_success!(Message::SchemaValid(schema_path.display().to_string()));
    Ok(())
}

fn count_schema_files(path: &PathBuf) -> usize {
    match std::fs::read_dir(path) {
        Ok(entries) => entries
            .flatten()
            .filter(|e| e.file_name().to_string_lossy().ends_with(crate::libs::parser::SCHEMA_FILE_EXTENSION))
            .count(),
        Err(_) => 1,
    }
}
