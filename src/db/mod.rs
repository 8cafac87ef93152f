//! Database layer for the lockplane application.
//!
//! Everything that talks to a live database: connection targets, catalog
//! introspection for both engine families, shadow rehearsal and the plan
//! executor. The modules above this layer only ever see the canonical
//! schema model and structured results.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use lockplane::db::target::{Deadline, Target};
//! use lockplane::db::introspect::introspect_target;
//!
//! # async fn demo() -> Result<(), lockplane::libs::error::LockplaneError> {
//! let mut target = Target::connect("sqlite://app.db", Deadline::none()).await?;
//! let schema = introspect_target(&mut target, &["public".to_string()], Deadline::none()).await?;
//! println!("{} table(s)", schema.tables.len());
//! # Ok(())
//! # }
//! ```

/// Connection handles, deadlines and the apply lock.
pub mod target;

/// PostgreSQL catalog introspection.
pub mod postgres;

/// SQLite/libSQL PRAGMA introspection.
pub mod sqlite;

/// Shadow database materialization and rehearsal.
pub mod shadow;

/// Plan execution with hash guard and transactional apply.
pub mod executor;

/// Dialect-dispatched introspection entry point.
pub mod introspect {
    use super::target::{Deadline, Target};
    use crate::libs::error::LockplaneError;
    use crate::libs::schema::Schema;

    /// Reads the current schema of `target`, whatever its dialect.
    pub async fn introspect_target(
        target: &mut Target,
        postgres_schemas: &[String],
        deadline: Deadline,
    ) -> Result<Schema, LockplaneError> {
        match target {
            Target::Sqlite { conn, dialect, .. } => {
                deadline.check()?;
                super::sqlite::introspect(conn, *dialect)
            }
            Target::Postgres { client } => super::postgres::introspect(client, postgres_schemas, deadline).await,
        }
    }
}
