//! # Lockplane - Declarative Schema Control Plane
//!
//! A command-line utility for managing relational database schemas
//! declaratively across PostgreSQL, SQLite and libSQL.
//!
//! ## Features
//!
//! - **Declarative Schema Files**: desired state as constrained `.lp.sql` DDL
//! - **Diff-Based Planning**: minimal ordered DDL plans with safety classification
//! - **Shadow Rehearsal**: plans dry-run on an isolated shadow database first
//! - **Source-State Hashes**: plans apply only to the state they were computed against
//! - **Rollback Generation**: every plan gets a structural inverse
//! - **Multi-Phase Patterns**: expand/contract, deprecation, validation, type change
//!
//! ## Usage
//!
//! ```rust,no_run
//! use lockplane::commands::Cli;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     Cli::menu().await
//! }
//! ```

pub mod commands;
pub mod db;
pub mod libs;
