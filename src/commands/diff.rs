//! Schema diff display command.
//!
//! Shows the structural delta between the declared schema files and the
//! live database (or a schema JSON export) without emitting any SQL.

use crate::commands::{connect_and_introspect, load_desired, resolve_database_url, resolve_schema_path};
use crate::db::target::Deadline;
use crate::libs::config::Config;
use crate::libs::differ;
use crate::libs::messages::Message;
use crate::libs::schema::Schema;
use crate::libs::view::View;
use crate::{msg_info, msg_print};
use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

/// Command-line arguments for the diff command.
#[derive(Debug, Args)]
pub struct DiffArgs {
    #[arg(long, short, help = "Schema file or directory of .lp.sql files")]
    schema: Option<PathBuf>,

    #[arg(long, short, help = "Target database URL")]
    database: Option<String>,

    #[arg(long, help = "Schema JSON export to diff against instead of a live database")]
    from_json: Option<PathBuf>,

    #[arg(long, help = "Abort if the command runs longer than this many seconds")]
    timeout: Option<u64>,
}

pub async fn cmd(args: DiffArgs) -> Result<()> {
    let config = Config::read()?;
    let deadline = Deadline::from_secs(args.timeout);

    let current: Schema = match &args.from_json {
        Some(path) => Schema::from_export_file(path)?,
        None => {
            let url = resolve_database_url(args.database.clone(), &config)?;
            let (_target, schema) = connect_and_introspect(&url, &config, deadline).await?;
            schema
        }
    };

    let schema_path = resolve_schema_path(args.schema.clone(), &config)?;
    let desired = load_desired(&schema_path, current.dialect)?;

    let diff = differ::diff(&current, &desired);
    if diff.is_empty() {
        msg_info!(Message::DiffEmpty);
        return Ok(());
    }

    msg_print!(
        Message::DiffSummary {
            added: diff.added_tables.len(),
            removed: diff.removed_tables.len(),
            modified: diff.modified_tables.len(),
        },
        true
    );
    View::diff(&diff)?;

    Ok(())
}
