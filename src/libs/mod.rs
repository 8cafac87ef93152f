//! Core library modules for the lockplane application.
//!
//! Everything between "text on disk / rows in a catalog" and "SQL ready to
//! execute" lives here: the schema model, the declarative DDL parser, the
//! differ, the safety classifier, the planner with its rollback and
//! multi-phase companions, and the supporting infrastructure (errors,
//! hashing, configuration, messaging, phase state).
//!
//! ## Pipeline
//!
//! ```text
//! .lp.sql files ──parser──┐
//!                         ├─ differ ─ safety ─ planner ─ plan ─ executor
//! live database ─introspect┘                     │
//!                                    rollback ───┘
//! ```

pub mod config;
pub mod dialect;
pub mod differ;
pub mod error;
pub mod hash;
pub mod messages;
pub mod multiphase;
pub mod parser;
pub mod plan;
pub mod planner;
pub mod rollback;
pub mod safety;
pub mod schema;
pub mod state;
pub mod types;
pub mod view;
