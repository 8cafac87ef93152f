//! Connection management for target and shadow databases.
//!
//! A [`Target`] wraps one live connection, either a SQLite/libSQL file (or
//! `:memory:`) through `rusqlite` or a PostgreSQL database through
//! `tokio-postgres`, behind one surface the executor and introspectors
//! share. SQLite work runs synchronously inside the async commands; the
//! PostgreSQL driver is genuinely async and every call goes through the
//! caller's [`Deadline`].
//!
//! ## Features
//!
//! - **URL Dispatch**: `postgres://`, `sqlite://`, `libsql:`, plain paths, `:memory:`
//! - **Deadline Propagation**: every operation honors the caller's deadline
//! - **Transactions**: explicit `BEGIN`/`COMMIT`/`ROLLBACK` shared across engines
//! - **Apply Lock**: advisory lock on PostgreSQL, a lock file for SQLite

use crate::libs::error::LockplaneError;
use crate::libs::types::Dialect;
use crate::msg_debug;
use rusqlite::Connection;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio_postgres::NoTls;

/// Caller-supplied deadline propagated into every database call and file
/// read. The default carries no deadline and never expires.
#[derive(Debug, Clone, Copy, Default)]
pub struct Deadline(Option<Instant>);

impl Deadline {
    pub fn none() -> Self {
        Deadline(None)
    }

    pub fn after(duration: Duration) -> Self {
        Deadline(Some(Instant::now() + duration))
    }

    pub fn from_secs(secs: Option<u64>) -> Self {
        match secs {
            Some(secs) => Deadline::after(Duration::from_secs(secs)),
            None => Deadline::none(),
        }
    }

    /// Fails with [`LockplaneError::Cancelled`] once the deadline passed.
    /// Synchronous database work checks this between operations.
    pub fn check(&self) -> Result<(), LockplaneError> {
        match self.0 {
            Some(instant) if Instant::now() >= instant => Err(LockplaneError::Cancelled),
            _ => Ok(()),
        }
    }

    /// Runs a future under the deadline, mapping expiry to `Cancelled`.
    pub async fn guard<F, T>(&self, future: F) -> Result<T, LockplaneError>
    where
        F: std::future::Future<Output = T>,
    {
        match self.0 {
            None => Ok(future.await),
            Some(instant) => {
                let at = tokio::time::Instant::from_std(instant);
                tokio::time::timeout_at(at, future)
                    .await
                    .map_err(|_| LockplaneError::Cancelled)
            }
        }
    }
}

/// One live database connection, dialect-tagged.
pub enum Target {
    Sqlite {
        conn: Connection,
        dialect: Dialect,
        /// `None` for `:memory:`; otherwise the database file, which also
        /// anchors the apply lock file.
        path: Option<PathBuf>,
    },
    Postgres {
        client: tokio_postgres::Client,
    },
}

impl Target {
    /// Connects to `url`.
    ///
    /// Accepted forms: `postgres://…` / `postgresql://…`, `sqlite://<path>`,
    /// `libsql:<path>` (a local replica file), `:memory:`, or a bare file
    /// path ending in a SQLite-ish extension.
    pub async fn connect(url: &str, deadline: Deadline) -> Result<Target, LockplaneError> {
        deadline.check()?;

        if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            let connected = deadline.guard(tokio_postgres::connect(url, NoTls)).await?;
            let (client, connection) = connected.map_err(|e| LockplaneError::IntrospectionError {
                dialect: Dialect::Postgres,
                detail: e.to_string(),
            })?;
            // The connection object drives the socket; it lives as long as
            // the client and ends with the process.
            tokio::spawn(async move {
                if let Err(e) = connection.await {
                    msg_debug!(format!("postgres connection closed: {e}"));
                }
            });
            return Ok(Target::Postgres { client });
        }

        if url.starts_with("http://") || url.starts_with("https://") || url.starts_with("wss://") {
            // Remote libSQL endpoints need credential plumbing that lives
            // outside the core; only local replica files are accepted here.
            return Err(LockplaneError::UnsupportedByDialect {
                dialect: Dialect::Libsql,
                operation: "remote connections (use a local replica file)".to_string(),
            });
        }

        let (dialect, path_str) = if let Some(rest) = url.strip_prefix("libsql:") {
            (Dialect::Libsql, rest.trim_start_matches("//"))
        } else if let Some(rest) = url.strip_prefix("sqlite://") {
            (Dialect::Sqlite, rest)
        } else if let Some(rest) = url.strip_prefix("sqlite:") {
            (Dialect::Sqlite, rest)
        } else {
            (Dialect::Sqlite, url)
        };

        let (conn, path) = if path_str == ":memory:" {
            (
                Connection::open_in_memory().map_err(|e| sqlite_error(dialect, &e))?,
                None,
            )
        } else {
            let path = PathBuf::from(path_str);
            (
                Connection::open(&path).map_err(|e| sqlite_error(dialect, &e))?,
                Some(path),
            )
        };

        // Referential integrity on before anything reads or writes.
        conn.execute_batch("PRAGMA foreign_keys = ON")
            .map_err(|e| sqlite_error(dialect, &e))?;

        Ok(Target::Sqlite { conn, dialect, path })
    }

    pub fn dialect(&self) -> Dialect {
        match self {
            Target::Sqlite { dialect, .. } => *dialect,
            Target::Postgres { .. } => Dialect::Postgres,
        }
    }

    /// Executes a batch of semicolon-separated statements, returning the
    /// engine's error text on failure.
    pub async fn batch_execute(&mut self, sql: &str, deadline: Deadline) -> Result<(), String> {
        match self {
            Target::Sqlite { conn, .. } => {
                deadline.check().map_err(|e| e.to_string())?;
                conn.execute_batch(sql).map_err(|e| e.to_string())
            }
            Target::Postgres { client } => match deadline.guard(client.batch_execute(sql)).await {
                Ok(result) => result.map_err(|e| e.to_string()),
                Err(cancelled) => Err(cancelled.to_string()),
            },
        }
    }

    pub async fn begin(&mut self, deadline: Deadline) -> Result<(), String> {
        self.batch_execute("BEGIN", deadline).await
    }

    pub async fn commit(&mut self, deadline: Deadline) -> Result<(), String> {
        self.batch_execute("COMMIT", deadline).await
    }

    /// Rolls back the open transaction; a failure here is swallowed because
    /// it only happens after a step already failed and the connection is
    /// about to be dropped.
    pub async fn rollback_tx(&mut self) {
        let _ = self.batch_execute("ROLLBACK", Deadline::none()).await;
    }

    /// Acquires the mutual-exclusion token for `Apply`: a named advisory
    /// lock on PostgreSQL, a lock file next to the database for SQLite.
    pub async fn acquire_apply_lock(&mut self, deadline: Deadline) -> Result<(), LockplaneError> {
        match self {
            Target::Postgres { client } => {
                let locked = deadline
                    .guard(client.batch_execute("SELECT pg_advisory_lock(hashtext('lockplane_apply'))"))
                    .await?;
                locked.map_err(|e| LockplaneError::ApplyFailed {
                    step_index: 0,
                    description: "acquire advisory lock".to_string(),
                    detail: e.to_string(),
                })
            }
            Target::Sqlite { path, dialect, .. } => {
                let Some(path) = path else {
                    return Ok(()); // in-memory databases have a single owner
                };
                let lock_path = lock_file_path(path);
                match std::fs::OpenOptions::new().write(true).create_new(true).open(&lock_path) {
                    Ok(_) => Ok(()),
                    Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                        Err(LockplaneError::ApplyFailed {
                            step_index: 0,
                            description: "acquire apply lock".to_string(),
                            detail: format!(
                                "another apply holds {} ({} target)",
                                lock_path.display(),
                                dialect
                            ),
                        })
                    }
                    Err(e) => Err(LockplaneError::io(lock_path.display().to_string(), &e)),
                }
            }
        }
    }

    pub async fn release_apply_lock(&mut self) {
        match self {
            Target::Postgres { client } => {
                let _ = client
                    .batch_execute("SELECT pg_advisory_unlock(hashtext('lockplane_apply'))")
                    .await;
            }
            Target::Sqlite { path, .. } => {
                if let Some(path) = path {
                    let _ = std::fs::remove_file(lock_file_path(path));
                }
            }
        }
    }
}

fn lock_file_path(db_path: &std::path::Path) -> PathBuf {
    let mut name = db_path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".lockplane-lock");
    db_path.with_file_name(name)
}

fn sqlite_error(dialect: Dialect, e: &rusqlite::Error) -> LockplaneError {
    LockplaneError::IntrospectionError {
        dialect,
        detail: e.to_string(),
    }
}
