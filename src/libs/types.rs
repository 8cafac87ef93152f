//! Dialect tags and the logical type system shared by every subsystem.
//!
//! Provides the dialect discriminator and the dialect-independent logical
//! type lattice that the differ and the schema hash compare.
//!
//! ## Features
//!
//! - **Dialect Tagging**: Every schema, table and type carries its dialect
//! - **Type Normalization**: Folds raw catalog and DDL spellings into one logical form
//! - **Type Rendering**: Produces faithful dialect-specific SQL type names
//! - **Cross-Dialect Equality**: Two logically equivalent schemas normalize identically
//!
//! ## Usage
//!
//! ```rust
//! use lockplane::libs::types::{Dialect, LogicalType, normalize_type};
//!
//! let logical = normalize_type("pg_catalog.int4", Dialect::Postgres)?;
//! assert_eq!(logical, LogicalType::Integer);
//! assert_eq!(normalize_type("INTEGER", Dialect::Sqlite)?, logical);
//! # Ok::<(), lockplane::libs::types::UnknownType>(())
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Supported database dialects.
///
/// `Libsql` shares SQLite's entire DDL surface; every consumer that cares
/// about SQL shape should branch on [`Dialect::family`] instead of matching
/// the variant directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    Postgres,
    Sqlite,
    Libsql,
}

impl Dialect {
    /// Collapses libSQL onto SQLite for all DDL purposes.
    pub fn family(self) -> Dialect {
        match self {
            Dialect::Libsql => Dialect::Sqlite,
            other => other,
        }
    }

    /// True when the dialect speaks the SQLite grammar and PRAGMA surface.
    pub fn is_sqlite_family(self) -> bool {
        self.family() == Dialect::Sqlite
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Dialect::Postgres => "postgres",
            Dialect::Sqlite => "sqlite",
            Dialect::Libsql => "libsql",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(Dialect::Postgres),
            "sqlite" | "sqlite3" => Ok(Dialect::Sqlite),
            "libsql" | "turso" => Ok(Dialect::Libsql),
            other => Err(format!("unknown dialect '{other}'")),
        }
    }
}

/// Dialect-independent classification of a column type.
///
/// This is what the differ and the source-state hash compare. The raw type
/// string on a column is preserved only for diagnostics and faithful SQL
/// emission; equality decisions always go through this enum.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicalType {
    Integer,
    BigInt,
    SmallInt,
    Text,
    /// `VARCHAR(n)`; `None` when declared without a length.
    Varchar(Option<u32>),
    Boolean,
    /// `NUMERIC(p, s)`; `None` when declared without precision.
    Numeric(Option<(u32, u32)>),
    Real,
    Double,
    Timestamp,
    TimestampTz,
    Date,
    Bytea,
    Json,
    Uuid,
}

impl LogicalType {
    /// Whether a value of `self` can be widened into `other` without loss.
    ///
    /// Used by the safety classifier to separate lossy widenings from
    /// dangerous narrowings.
    pub fn widens_to(&self, other: &LogicalType) -> bool {
        use LogicalType::*;
        match (self, other) {
            (a, b) if a == b => true,
            (SmallInt, Integer) | (SmallInt, BigInt) | (Integer, BigInt) => true,
            (Varchar(Some(a)), Varchar(Some(b))) => a <= b,
            (Varchar(_), Text) | (Varchar(Some(_)), Varchar(None)) => true,
            (Real, Double) => true,
            (Timestamp, TimestampTz) => true,
            (Integer, Numeric(_)) | (SmallInt, Numeric(_)) | (BigInt, Numeric(_)) => true,
            _ => false,
        }
    }

    /// Whether converting `self` into `other` is expressible with a plain
    /// SQL cast at all, losslessly or not.
    pub fn castable_to(&self, other: &LogicalType) -> bool {
        use LogicalType::*;
        if self.widens_to(other) || other.widens_to(self) {
            return true;
        }
        matches!(
            (self, other),
            (Integer | BigInt | SmallInt | Real | Double | Numeric(_) | Boolean | Uuid | Date | Timestamp | TimestampTz, Text | Varchar(_))
                | (Text | Varchar(_), Integer | BigInt | SmallInt | Real | Double | Numeric(_) | Boolean | Uuid)
                | (Real | Double, Integer | BigInt | SmallInt | Numeric(_))
                | (Numeric(_), Integer | BigInt | SmallInt | Real | Double)
        )
    }
}

impl fmt::Display for LogicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicalType::Integer => f.write_str("integer"),
            LogicalType::BigInt => f.write_str("bigint"),
            LogicalType::SmallInt => f.write_str("smallint"),
            LogicalType::Text => f.write_str("text"),
            LogicalType::Varchar(Some(n)) => write!(f, "varchar({n})"),
            LogicalType::Varchar(None) => f.write_str("varchar"),
            LogicalType::Boolean => f.write_str("boolean"),
            LogicalType::Numeric(Some((p, s))) => write!(f, "numeric({p},{s})"),
            LogicalType::Numeric(None) => f.write_str("numeric"),
            LogicalType::Real => f.write_str("real"),
            LogicalType::Double => f.write_str("double"),
            LogicalType::Timestamp => f.write_str("timestamp"),
            LogicalType::TimestampTz => f.write_str("timestamptz"),
            LogicalType::Date => f.write_str("date"),
            LogicalType::Bytea => f.write_str("bytea"),
            LogicalType::Json => f.write_str("json"),
            LogicalType::Uuid => f.write_str("uuid"),
        }
    }
}

/// A raw type string that could not be classified into a [`LogicalType`].
///
/// The parser surfaces this as a validation error on the offending column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownType {
    pub raw: String,
    pub dialect: Dialect,
}

impl fmt::Display for UnknownType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {} type '{}'", self.dialect, self.raw)
    }
}

impl std::error::Error for UnknownType {}

/// Splits a raw type like `varchar(255)` or `numeric(10, 2)` into its base
/// name and numeric modifiers. Unparseable modifiers are dropped.
fn split_modifiers(raw: &str) -> (String, Vec<u32>) {
    let trimmed = raw.trim();
    match trimmed.find('(') {
        Some(open) => {
            let base = trimmed[..open].trim().to_ascii_lowercase();
            let inner = trimmed[open + 1..].trim_end_matches(')');
            let mods = inner
                .split(',')
                .filter_map(|part| part.trim().parse::<u32>().ok())
                .collect();
            (base, mods)
        }
        None => (trimmed.to_ascii_lowercase(), Vec::new()),
    }
}

/// Normalizes a raw dialect type into its logical classification.
///
/// Folds catalog spellings (`pg_catalog.int4`), DDL spellings (`INT`,
/// `INTEGER`) and SQLite affinities (`INTEGER`) onto one logical type so
/// that two logically equivalent schemas from different dialects compare
/// and hash identically.
///
/// # Errors
///
/// Returns [`UnknownType`] when the raw string cannot be classified; the
/// parser reports this as a per-column validation error.
pub fn normalize_type(raw: &str, dialect: Dialect) -> Result<LogicalType, UnknownType> {
    let stripped = raw.trim().trim_start_matches("pg_catalog.");
    let (base, mods) = split_modifiers(stripped);

    let unknown = || UnknownType {
        raw: raw.to_string(),
        dialect,
    };

    let logical = match base.as_str() {
        "int" | "integer" | "int4" | "serial" | "serial4" | "mediumint" => LogicalType::Integer,
        "bigint" | "int8" | "bigserial" | "serial8" => LogicalType::BigInt,
        "smallint" | "int2" | "smallserial" | "serial2" | "tinyint" => LogicalType::SmallInt,
        "text" | "clob" | "citext" => LogicalType::Text,
        "varchar" | "character varying" | "char varying" | "nvarchar" => {
            LogicalType::Varchar(mods.first().copied())
        }
        "char" | "character" | "bpchar" | "nchar" => LogicalType::Varchar(mods.first().copied()),
        "bool" | "boolean" => LogicalType::Boolean,
        "numeric" | "decimal" | "dec" => match mods.as_slice() {
            [] => LogicalType::Numeric(None),
            [p] => LogicalType::Numeric(Some((*p, 0))),
            [p, s, ..] => LogicalType::Numeric(Some((*p, *s))),
        },
        "real" | "float4" => LogicalType::Real,
        "double" | "double precision" | "float8" | "float" => LogicalType::Double,
        "timestamp" | "timestamp without time zone" | "datetime" => LogicalType::Timestamp,
        "timestamptz" | "timestamp with time zone" => LogicalType::TimestampTz,
        "date" => LogicalType::Date,
        "bytea" | "blob" | "binary" | "varbinary" => LogicalType::Bytea,
        "json" | "jsonb" => LogicalType::Json,
        "uuid" => LogicalType::Uuid,
        _ => return Err(unknown()),
    };

    Ok(logical)
}

/// Renders a logical type as a concrete SQL type for the given dialect.
///
/// The rendering round-trips through [`normalize_type`]: applying a plan and
/// re-introspecting must yield the same logical type that produced the SQL.
pub fn render_type(logical: &LogicalType, dialect: Dialect) -> String {
    match dialect.family() {
        Dialect::Postgres => match logical {
            LogicalType::Integer => "INTEGER".into(),
            LogicalType::BigInt => "BIGINT".into(),
            LogicalType::SmallInt => "SMALLINT".into(),
            LogicalType::Text => "TEXT".into(),
            LogicalType::Varchar(Some(n)) => format!("VARCHAR({n})"),
            LogicalType::Varchar(None) => "VARCHAR".into(),
            LogicalType::Boolean => "BOOLEAN".into(),
            LogicalType::Numeric(Some((p, s))) => format!("NUMERIC({p}, {s})"),
            LogicalType::Numeric(None) => "NUMERIC".into(),
            LogicalType::Real => "REAL".into(),
            LogicalType::Double => "DOUBLE PRECISION".into(),
            LogicalType::Timestamp => "TIMESTAMP".into(),
            LogicalType::TimestampTz => "TIMESTAMPTZ".into(),
            LogicalType::Date => "DATE".into(),
            LogicalType::Bytea => "BYTEA".into(),
            LogicalType::Json => "JSONB".into(),
            LogicalType::Uuid => "UUID".into(),
        },
        _ => match logical {
            LogicalType::Integer => "INTEGER".into(),
            LogicalType::BigInt => "BIGINT".into(),
            LogicalType::SmallInt => "SMALLINT".into(),
            LogicalType::Text => "TEXT".into(),
            LogicalType::Varchar(Some(n)) => format!("VARCHAR({n})"),
            LogicalType::Varchar(None) => "VARCHAR".into(),
            LogicalType::Boolean => "BOOLEAN".into(),
            LogicalType::Numeric(Some((p, s))) => format!("NUMERIC({p}, {s})"),
            LogicalType::Numeric(None) => "NUMERIC".into(),
            LogicalType::Real => "REAL".into(),
            LogicalType::Double => "DOUBLE".into(),
            LogicalType::Timestamp => "TIMESTAMP".into(),
            LogicalType::TimestampTz => "TIMESTAMPTZ".into(),
            LogicalType::Date => "DATE".into(),
            LogicalType::Bytea => "BLOB".into(),
            LogicalType::Json => "JSON".into(),
            LogicalType::Uuid => "UUID".into(),
        },
    }
}
