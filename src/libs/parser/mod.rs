//! Declarative DDL parsing into the schema model.
//!
//! Accepts one `.lp.sql` file or a directory of them. Directory inputs are
//! read in lexicographic filename order and concatenated with separator
//! comments before parsing; subdirectories, symlinks and foreign extensions
//! are skipped. Statement byte offsets are tracked so that every error maps
//! back to its originating file and line, and the parser collects them all
//! rather than stopping at the first.
//!
//! ## Features
//!
//! - **Declarative Subset**: `CREATE TABLE`, `CREATE [UNIQUE] INDEX`, narrow `ALTER TABLE`
//! - **Error Collection**: every statement reports independently in one pass
//! - **Targeted Hints**: recognized common mistakes get "did you mean" suggestions
//! - **Structural Validation**: referential integrity checked across all files
//! - **Warnings**: non-fatal findings such as a missing primary key
//!
//! ## Usage
//!
//! ```rust,no_run
//! use lockplane::libs::parser::parse_schema_path;
//! use lockplane::libs::types::Dialect;
//! use std::path::Path;
//!
//! let outcome = parse_schema_path(Path::new("schema"), Dialect::Postgres)?;
//! println!("{} table(s)", outcome.schema.tables.len());
//! # Ok::<(), lockplane::libs::error::LockplaneError>(())
//! ```

mod convert;
mod hints;
mod statements;
mod validate;

use crate::libs::error::{LockplaneError, ParseIssue, Warning};
use crate::libs::schema::Schema;
use crate::libs::types::Dialect;
use sqlparser::dialect::{Dialect as GrammarDialect, PostgreSqlDialect, SQLiteDialect};
use sqlparser::parser::Parser;
use std::collections::HashMap;
use std::path::Path;

pub use statements::{split_statements, RawStatement};

/// Extension required of schema files.
pub const SCHEMA_FILE_EXTENSION: &str = ".lp.sql";

/// A successfully parsed schema plus its non-fatal findings.
#[derive(Debug)]
pub struct ParseOutcome {
    pub schema: Schema,
    pub warnings: Vec<Warning>,
}

struct SourceFile {
    name: String,
    content: String,
}

/// Parses a schema file or a directory of `.lp.sql` files.
pub fn parse_schema_path(path: &Path, dialect: Dialect) -> Result<ParseOutcome, LockplaneError> {
    let files = collect_files(path)?;
    if files.is_empty() {
        return Err(LockplaneError::IOError {
            path: path.display().to_string(),
            detail: format!("no {SCHEMA_FILE_EXTENSION} files found"),
        });
    }
    parse_files(&files, dialect)
}

/// Parses a single in-memory source, attributing issues to `file`.
pub fn parse_schema_source(source: &str, file: &str, dialect: Dialect) -> Result<ParseOutcome, LockplaneError> {
    let files = vec![SourceFile {
        name: file.to_string(),
        content: source.to_string(),
    }];
    parse_files(&files, dialect)
}

fn collect_files(path: &Path) -> Result<Vec<SourceFile>, LockplaneError> {
    let metadata = std::fs::symlink_metadata(path).map_err(|e| LockplaneError::io(path.display().to_string(), &e))?;

    if metadata.is_file() {
        let content = std::fs::read_to_string(path).map_err(|e| LockplaneError::io(path.display().to_string(), &e))?;
        return Ok(vec![SourceFile {
            name: path.display().to_string(),
            content,
        }]);
    }

    let mut names: Vec<(String, std::path::PathBuf)> = Vec::new();
    let entries = std::fs::read_dir(path).map_err(|e| LockplaneError::io(path.display().to_string(), &e))?;
    for entry in entries {
        let entry = entry.map_err(|e| LockplaneError::io(path.display().to_string(), &e))?;
        let entry_path = entry.path();
        // Top level only; symlinks are skipped along with subdirectories.
        let entry_meta = std::fs::symlink_metadata(&entry_path)
            .map_err(|e| LockplaneError::io(entry_path.display().to_string(), &e))?;
        if !entry_meta.is_file() {
            continue;
        }
        let file_name = entry.file_name().to_string_lossy().to_string();
        if file_name.ends_with(SCHEMA_FILE_EXTENSION) {
            names.push((file_name, entry_path));
        }
    }
    names.sort_by(|a, b| a.0.cmp(&b.0));

    let mut files = Vec::new();
    for (name, file_path) in names {
        let content =
            std::fs::read_to_string(&file_path).map_err(|e| LockplaneError::io(file_path.display().to_string(), &e))?;
        files.push(SourceFile { name, content });
    }
    Ok(files)
}

/// Maps a line in the concatenated source back to (file, local line).
struct FileMap {
    /// (file name, first concat line, line count) per segment.
    segments: Vec<(String, usize, usize)>,
}

impl FileMap {
    fn resolve(&self, concat_line: usize) -> (String, usize) {
        for (name, start, count) in &self.segments {
            if concat_line >= *start && concat_line < start + count {
                return (name.clone(), concat_line - start + 1);
            }
        }
        self.segments
            .last()
            .map(|(name, start, _)| (name.clone(), concat_line.saturating_sub(*start) + 1))
            .unwrap_or_else(|| ("<schema>".to_string(), concat_line))
    }
}

fn concatenate(files: &[SourceFile]) -> (String, FileMap) {
    let mut combined = String::new();
    let mut segments = Vec::new();
    let mut line = 1usize;

    for file in files {
        // Separator comment occupies one concat line outside every segment.
        combined.push_str(&format!("-- {}\n", file.name));
        line += 1;

        let count = file.content.lines().count().max(1);
        segments.push((file.name.clone(), line, count));

        combined.push_str(&file.content);
        if !file.content.ends_with('\n') {
            combined.push('\n');
        }
        line += count;
    }

    (combined, FileMap { segments })
}

/// Extracts the ±1 line excerpt around `line` (1-based) in `source`.
fn context_excerpt(source: &str, line: usize) -> String {
    let lines: Vec<&str> = source.lines().collect();
    if lines.is_empty() || line == 0 {
        return String::new();
    }
    let index = line - 1;
    let from = index.saturating_sub(1);
    let to = (index + 1).min(lines.len().saturating_sub(1));
    lines[from..=to]
        .iter()
        .enumerate()
        .map(|(offset, text)| format!("  {:>4} | {}", from + offset + 1, text))
        .collect::<Vec<_>>()
        .join("\n")
}

fn grammar_for(dialect: Dialect) -> Box<dyn GrammarDialect> {
    match dialect.family() {
        Dialect::Postgres => Box::new(PostgreSqlDialect {}),
        _ => Box::new(SQLiteDialect {}),
    }
}

fn parse_files(files: &[SourceFile], dialect: Dialect) -> Result<ParseOutcome, LockplaneError> {
    let (combined, map) = concatenate(files);
    let grammar = grammar_for(dialect);

    let mut issues: Vec<ParseIssue> = Vec::new();
    let mut warnings: Vec<Warning> = Vec::new();
    let mut accepted = Vec::new();

    for raw in split_statements(&combined) {
        let (file, local_line) = map.resolve(raw.line);
        let context = context_excerpt(&combined, raw.line);
        let location = convert::Located {
            file: &file,
            line: local_line,
            column: raw.column,
            context: &context,
        };

        warnings.extend(hints::lint_warnings(&raw.sql, &file, local_line));

        match Parser::parse_sql(grammar.as_ref(), &raw.sql) {
            Err(error) => {
                let message = error.to_string();
                issues.push(ParseIssue {
                    file: file.clone(),
                    line: local_line,
                    column: raw.column,
                    code: "syntax".to_string(),
                    message: message.clone(),
                    context: context.clone(),
                    hint: hints::hint_for_error(&raw.sql, &message),
                });
            }
            Ok(parsed) => {
                for statement in parsed {
                    match convert::screen_statement(statement, &location) {
                        Ok(Some(declarative)) => accepted.push(declarative),
                        Ok(None) => {}
                        Err(issue) => issues.push(issue),
                    }
                }
            }
        }
    }

    // Pass 1: tables.
    let mut schema = Schema::new(dialect);
    let mut origin: HashMap<String, (String, usize)> = HashMap::new();
    for declarative in &accepted {
        if let convert::DeclStatement::CreateTable { statement, file, line, column } = declarative {
            let context = String::new();
            let location = convert::Located {
                file,
                line: *line,
                column: *column,
                context: &context,
            };
            let table = convert::build_table(statement, dialect, &location, &mut issues);
            if schema.table(&table.name).is_some() {
                issues.push(ParseIssue {
                    file: file.clone(),
                    line: *line,
                    column: *column,
                    code: "structure".to_string(),
                    message: format!("duplicate table '{}'", table.name),
                    context,
                    hint: None,
                });
                continue;
            }
            origin.insert(table.name.clone(), (file.clone(), *line));
            schema.tables.push(table);
        }
    }

    // Pass 2: indexes and alterations, in declaration order.
    for declarative in &accepted {
        match declarative {
            convert::DeclStatement::CreateTable { .. } => {}
            convert::DeclStatement::CreateIndex { statement, file, line, column } => {
                let context = String::new();
                let location = convert::Located {
                    file,
                    line: *line,
                    column: *column,
                    context: &context,
                };
                convert::apply_create_index(statement, &mut schema, &location, &mut issues);
            }
            convert::DeclStatement::AlterTable { name, operations, file, line, column } => {
                let context = String::new();
                let location = convert::Located {
                    file,
                    line: *line,
                    column: *column,
                    context: &context,
                };
                convert::apply_alter_table(name, operations, dialect, &mut schema, &location, &mut issues);
            }
        }
    }

    validate::validate_schema(&schema, &origin, &mut issues, &mut warnings);

    if issues.is_empty() {
        Ok(ParseOutcome { schema, warnings })
    } else {
        Err(LockplaneError::ParseError { issues })
    }
}
