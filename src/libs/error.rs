//! Structured error classes surfaced by the pipeline.
//!
//! Errors are values: every stage returns the first failure it cannot
//! recover from, and collecting stages (parser, structural validator)
//! bundle every issue they found into a single error value. The variant set
//! here is the complete caller-facing surface; commands translate these
//! into exit codes (0 for success and [`LockplaneError::DiffEmpty`], 1 for
//! everything else).

use crate::libs::types::Dialect;
use std::fmt;
use thiserror::Error;

/// One parse or validation finding, mapped back to its source location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIssue {
    pub file: String,
    pub line: usize,
    pub column: usize,
    /// Stable machine-readable class, e.g. `syntax`, `destructive`,
    /// `non-declarative`, `unknown-type`, `structure`.
    pub code: String,
    pub message: String,
    /// Short excerpt of the offending source (±1 line).
    pub context: String,
    /// Targeted "did you mean" suggestion when the mistake is recognized.
    pub hint: Option<String>,
}

impl fmt::Display for ParseIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}: [{}] {}", self.file, self.line, self.column, self.code, self.message)?;
        if !self.context.is_empty() {
            write!(f, "\n{}", self.context)?;
        }
        if let Some(hint) = &self.hint {
            write!(f, "\n  hint: {hint}")?;
        }
        Ok(())
    }
}

/// Non-fatal parser finding (e.g. a table without a primary key).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub file: String,
    pub line: usize,
    pub message: String,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.file, self.line, self.message)
    }
}

fn join_lines<T: fmt::Display>(items: &[T]) -> String {
    items.iter().map(ToString::to_string).collect::<Vec<_>>().join("\n")
}

/// The complete error surface of the core pipeline.
#[derive(Debug, Error)]
pub enum LockplaneError {
    /// One or more statements failed to parse or violated the declarative
    /// subset. Carries every issue found in the pass.
    #[error("schema parse failed with {} issue(s):\n{}", .issues.len(), join_lines(.issues))]
    ParseError { issues: Vec<ParseIssue> },

    /// The live database catalog could not be read.
    #[error("introspection of {dialect} database failed: {detail}")]
    IntrospectionError { dialect: Dialect, detail: String },

    /// The desired and current schemas already match. Informational; maps
    /// to exit code 0.
    #[error("schemas already match; nothing to plan")]
    DiffEmpty,

    /// The diff implies an operation the validators reject outright.
    #[error("plan validation failed:\n{}", join_lines(.issues))]
    ValidationFailed { issues: Vec<String> },

    /// A forward step has no reconstructible inverse.
    #[error("step {step_index} ('{description}') is not reversible: {reason}")]
    NotReversible {
        step_index: usize,
        description: String,
        reason: String,
    },

    /// The dialect cannot express the requested operation and no fallback
    /// protocol applies.
    #[error("{dialect} cannot express {operation}")]
    UnsupportedByDialect { dialect: Dialect, operation: String },

    /// The plan was generated against a different database state.
    #[error("source hash mismatch: plan was generated against {expected}, database is at {actual}")]
    SourceHashMismatch { expected: String, actual: String },

    /// The rehearsal on the shadow database failed; apply is refused.
    #[error("shadow dry-run failed at step {step_index} ('{description}'): {detail}")]
    ShadowDryRunFailed {
        step_index: usize,
        description: String,
        detail: String,
    },

    /// A step failed against the real database; the transaction was
    /// rolled back.
    #[error("apply failed at step {step_index} ('{description}'): {detail}")]
    ApplyFailed {
        step_index: usize,
        description: String,
        detail: String,
    },

    /// The caller's deadline expired; any open transaction was aborted.
    #[error("operation cancelled by deadline")]
    Cancelled,

    /// Filesystem failure while reading schema files or writing state.
    #[error("I/O error on {path}: {detail}")]
    IOError { path: String, detail: String },
}

impl LockplaneError {
    pub fn io(path: impl Into<String>, err: &std::io::Error) -> Self {
        LockplaneError::IOError {
            path: path.into(),
            detail: err.to_string(),
        }
    }

    /// Exit code for CLI callers: `DiffEmpty` is success.
    pub fn exit_code(&self) -> i32 {
        match self {
            LockplaneError::DiffEmpty => 0,
            _ => 1,
        }
    }
}
