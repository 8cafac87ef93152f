//! Targeted hints for recognized classes of common DDL mistakes.
//!
//! When a statement fails to parse, the raw text and the grammar's error
//! message are scanned for the handful of mistakes people actually make
//! (MySQL-isms, transposed keywords, stray commas) and the error gets a
//! concrete "did you mean" suggestion. Constructs that parse fine but port
//! badly surface as non-fatal warnings instead.

use crate::libs::error::Warning;

fn contains_word(haystack: &str, needle: &str) -> bool {
    let upper = haystack.to_ascii_uppercase();
    let needle = needle.to_ascii_uppercase();
    let mut search = upper.as_str();
    while let Some(pos) = search.find(&needle) {
        let before_ok = pos == 0
            || !search[..pos]
                .chars()
                .next_back()
                .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_');
        let after = &search[pos + needle.len()..];
        let after_ok = !after.chars().next().is_some_and(|c| c.is_ascii_alphanumeric() || c == '_');
        if before_ok && after_ok {
            return true;
        }
        search = &search[pos + needle.len()..];
    }
    false
}

fn has_trailing_comma_before_paren(sql: &str) -> bool {
    let mut previous_meaningful = ' ';
    for ch in sql.chars() {
        if ch == ')' && previous_meaningful == ',' {
            return true;
        }
        if !ch.is_whitespace() {
            previous_meaningful = ch;
        }
    }
    false
}

/// Produces a targeted suggestion for a failed statement, if the mistake is
/// one we recognize.
pub fn hint_for_error(sql: &str, error: &str) -> Option<String> {
    if contains_word(sql, "AUTO_INCREMENT") {
        return Some(
            "AUTO_INCREMENT is MySQL syntax; use BIGSERIAL or GENERATED ALWAYS AS IDENTITY on PostgreSQL, or INTEGER PRIMARY KEY on SQLite".into(),
        );
    }
    if sql.contains('`') {
        return Some("backquoted identifiers are MySQL syntax; quote identifiers with double quotes instead".into());
    }
    if contains_word(sql, "NOTNULL") {
        return Some("did you mean NOT NULL (two words)?".into());
    }
    if contains_word(sql, "UNQUE") {
        return Some("did you mean UNIQUE?".into());
    }
    if contains_word(sql, "TABEL") {
        return Some("did you mean TABLE?".into());
    }
    if has_trailing_comma_before_paren(sql) {
        return Some("remove the trailing comma before ')'".into());
    }

    // Two CREATE statements fused together usually means a lost semicolon.
    let creates = sql.to_ascii_uppercase().matches("CREATE ").count();
    if creates > 1 {
        return Some("statements must be separated by ';'; a semicolon seems to be missing".into());
    }

    if error.contains("Expected: ',' or ')'") || error.contains("Expected: ','") {
        return Some("check for a missing comma between column definitions".into());
    }

    None
}

/// Non-fatal findings for constructs that parse but port badly.
pub fn lint_warnings(sql: &str, file: &str, line: usize) -> Vec<Warning> {
    let mut warnings = Vec::new();
    let upper = sql.to_ascii_uppercase();

    // VARCHAR with no length parses everywhere but means different things
    // across engines.
    let mut search = upper.as_str();
    while let Some(pos) = search.find("VARCHAR") {
        let after = search[pos + "VARCHAR".len()..].trim_start();
        if !after.starts_with('(') {
            warnings.push(Warning {
                file: file.to_string(),
                line,
                message: "VARCHAR without a length; prefer VARCHAR(n) or TEXT".into(),
            });
            break;
        }
        search = &search[pos + "VARCHAR".len()..];
    }

    if upper.contains("DATETIME('NOW')") {
        warnings.push(Warning {
            file: file.to_string(),
            line,
            message: "datetime('now') is SQLite-only; use CURRENT_TIMESTAMP for a portable default".into(),
        });
    }

    warnings
}
