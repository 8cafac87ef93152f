//! Statement splitting with byte-offset tracking.
//!
//! The parser reports every broken statement in a file, not just the first,
//! so the input is split into individual statements before anything is
//! handed to the SQL grammar. The splitter respects string literals,
//! quoted identifiers and both comment forms, and records the line and
//! column of each statement's first meaningful character so errors map back
//! to the source.

/// One `;`-terminated statement with the location of its first
/// non-whitespace, non-comment character (1-based).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawStatement {
    pub sql: String,
    pub line: usize,
    pub column: usize,
}

#[derive(Clone, Copy, PartialEq)]
enum State {
    Normal,
    SingleQuote,
    DoubleQuote,
    LineComment,
    BlockComment,
}

/// Splits `source` into statements. Segments containing only whitespace
/// and comments are dropped.
pub fn split_statements(source: &str) -> Vec<RawStatement> {
    let mut statements = Vec::new();
    let mut state = State::Normal;

    let mut current = String::new();
    let mut start: Option<(usize, usize)> = None;

    let mut line = 1usize;
    let mut column = 1usize;

    let mut chars = source.chars().peekable();
    while let Some(ch) = chars.next() {
        let next = chars.peek().copied();

        match state {
            State::Normal => match ch {
                ';' => {
                    if let Some((l, c)) = start.take() {
                        let sql = current.trim_end().to_string();
                        if !sql.is_empty() {
                            statements.push(RawStatement { sql, line: l, column: c });
                        }
                    }
                    current.clear();
                }
                '-' if next == Some('-') => {
                    state = State::LineComment;
                    current.push(ch);
                }
                '/' if next == Some('*') => {
                    state = State::BlockComment;
                    current.push(ch);
                }
                '\'' => {
                    mark_start(&mut start, line, column);
                    state = State::SingleQuote;
                    current.push(ch);
                }
                '"' => {
                    mark_start(&mut start, line, column);
                    state = State::DoubleQuote;
                    current.push(ch);
                }
                c if c.is_whitespace() => {
                    if start.is_some() {
                        current.push(c);
                    }
                }
                c => {
                    mark_start(&mut start, line, column);
                    current.push(c);
                }
            },
            State::SingleQuote => {
                current.push(ch);
                if ch == '\'' {
                    // '' is an escaped quote, not a terminator.
                    if next == Some('\'') {
                        current.push(chars.next().unwrap());
                        column += 1;
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::DoubleQuote => {
                current.push(ch);
                if ch == '"' {
                    state = State::Normal;
                }
            }
            State::LineComment => {
                current.push(ch);
                if ch == '\n' {
                    state = State::Normal;
                }
            }
            State::BlockComment => {
                current.push(ch);
                if ch == '*' && next == Some('/') {
                    current.push(chars.next().unwrap());
                    column += 1;
                    state = State::Normal;
                }
            }
        }

        if ch == '\n' {
            line += 1;
            column = 1;
        } else {
            column += 1;
        }
    }

    if let Some((l, c)) = start {
        let sql = current.trim_end().to_string();
        if !sql.is_empty() && !is_only_comments(&sql) {
            statements.push(RawStatement { sql, line: l, column: c });
        }
    }

    statements
        .into_iter()
        .filter(|s| !is_only_comments(&s.sql))
        .collect()
}

fn mark_start(start: &mut Option<(usize, usize)>, line: usize, column: usize) {
    if start.is_none() {
        *start = Some((line, column));
    }
}

/// A segment that survived splitting but holds no parseable content.
fn is_only_comments(sql: &str) -> bool {
    let mut rest = sql.trim_start();
    loop {
        if rest.is_empty() {
            return true;
        }
        if let Some(stripped) = rest.strip_prefix("--") {
            rest = match stripped.find('\n') {
                Some(pos) => stripped[pos + 1..].trim_start(),
                None => "",
            };
        } else if let Some(stripped) = rest.strip_prefix("/*") {
            rest = match stripped.find("*/") {
                Some(pos) => stripped[pos + 2..].trim_start(),
                None => "",
            };
        } else {
            return false;
        }
    }
}
