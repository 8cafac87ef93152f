//! Project configuration loading.
//!
//! Reads `lockplane.json` from the project root and overlays environment
//! variables on top. Nothing here goes looking for configuration beyond the
//! current directory: credential resolution and discovery belong to outer
//! tooling, and the core only consumes fully resolved values.
//!
//! ## Precedence
//!
//! 1. Command-line flags (handled by each command)
//! 2. `LOCKPLANE_DATABASE_URL`, `LOCKPLANE_SHADOW_DATABASE_URL`, `SHADOW_SCHEMA`
//! 3. `lockplane.json` fields

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

/// Configuration file name in the project root.
pub const CONFIG_FILE_NAME: &str = "lockplane.json";

/// Default shadow schema name for PostgreSQL targets.
pub const DEFAULT_SHADOW_SCHEMA: &str = "lockplane_shadow";

/// Resolved project configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Connection string of the target database.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_url: Option<String>,

    /// Connection string of the shadow database used for rehearsal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shadow_database_url: Option<String>,

    /// Directory holding the `.lp.sql` schema files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_dir: Option<PathBuf>,

    /// PostgreSQL schemas to introspect; defaults to `public`. A single
    /// entry pins all work to that one schema.
    #[serde(default = "default_schemas")]
    pub postgres_schemas: Vec<String>,

    /// PostgreSQL schema used for shadow rehearsal inside the target
    /// database.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shadow_schema: Option<String>,
}

fn default_schemas() -> Vec<String> {
    vec!["public".to_string()]
}

impl Config {
    /// Loads configuration from the current directory, tolerating a missing
    /// file, then applies environment overrides.
    pub fn read() -> Result<Config> {
        Self::read_from(Path::new(CONFIG_FILE_NAME))
    }

    pub fn read_from(path: &Path) -> Result<Config> {
        let mut config = match std::fs::read_to_string(path) {
            Ok(content) => {
                serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Config {
                postgres_schemas: default_schemas(),
                ..Config::default()
            },
            Err(e) => return Err(e).with_context(|| format!("reading {}", path.display())),
        };

        if let Ok(url) = env::var("LOCKPLANE_DATABASE_URL") {
            config.database_url = Some(url);
        }
        if let Ok(url) = env::var("LOCKPLANE_SHADOW_DATABASE_URL") {
            config.shadow_database_url = Some(url);
        }
        if let Ok(schema) = env::var("SHADOW_SCHEMA") {
            config.shadow_schema = Some(schema);
        }
        if config.postgres_schemas.is_empty() {
            config.postgres_schemas = default_schemas();
        }

        Ok(config)
    }

    /// The shadow schema to rehearse in, honoring `SHADOW_SCHEMA` verbatim
    /// whatever the target schema is.
    pub fn shadow_schema(&self) -> &str {
        self.shadow_schema.as_deref().unwrap_or(DEFAULT_SHADOW_SCHEMA)
    }
}
