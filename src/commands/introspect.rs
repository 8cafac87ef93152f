//! Live database introspection command.
//!
//! Dumps the live schema as the JSON export shape, or prints only its
//! canonical SHA-256 hash with `--hash`.

use crate::commands::{connect_and_introspect, resolve_database_url};
use crate::db::target::Deadline;
use crate::libs::config::Config;
use crate::libs::hash::compute_schema_hash;
use crate::libs::messages::Message;
use crate::{msg_info, msg_print, msg_success};
use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

/// Command-line arguments for the introspect command.
#[derive(Debug, Args)]
pub struct IntrospectArgs {
    #[arg(long, short, help = "Target database URL")]
    database: Option<String>,

    /// Print only the canonical schema hash
    #[arg(long, help = "Print only the canonical SHA-256 schema hash")]
    hash: bool,

    /// Write the schema JSON to a file instead of stdout
    #[arg(long, short, help = "Write the schema JSON to this path")]
    out: Option<PathBuf>,

    #[arg(long, help = "Abort if the command runs longer than this many seconds")]
    timeout: Option<u64>,
}

pub async fn cmd(args: IntrospectArgs) -> Result<()> {
    let config = Config::read()?;
    let deadline = Deadline::from_secs(args.timeout);

    let url = resolve_database_url(args.database.clone(), &config)?;
    let (_target, schema) = connect_and_introspect(&url, &config, deadline).await?;

    if args.hash {
        msg_print!(Message::SchemaHash(compute_schema_hash(Some(&schema))));
        return Ok(());
    }

    msg_info!(Message::IntrospectedSchema {
        dialect: schema.dialect.to_string(),
        tables: schema.tables.len(),
    });

    let json = schema.to_export_json()?;
    match &args.out {
        Some(path) => {
            std::fs::write(path, json)?;
            msg_success!(Message::SchemaExported(path.display().to_string()));
        }
        None => println!("{json}"),
    }

    Ok(())
}
