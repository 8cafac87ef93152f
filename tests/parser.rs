#[cfg(test)]
mod tests {
    use lockplane::libs::error::LockplaneError;
    use lockplane::libs::parser::{parse_schema_path, parse_schema_source, split_statements};
    use lockplane::libs::types::{Dialect, LogicalType};
    use std::fs;
    use tempfile::TempDir;
    use test_context::{test_context, TestContext};

    struct SchemaDirContext {
        temp_dir: TempDir,
    }

    impl TestContext for SchemaDirContext {
        fn setup() -> Self {
            SchemaDirContext {
                temp_dir: tempfile::tempdir().unwrap(),
            }
        }
    }

    fn issues_of(error: LockplaneError) -> Vec<lockplane::libs::error::ParseIssue> {
        match error {
            LockplaneError::ParseError { issues } => issues,
            other => panic!("expected ParseError, got {other:?}"),
        }
    }

    #[test]
    fn parses_a_basic_table() {
        let outcome = parse_schema_source(
            "CREATE TABLE users (id BIGINT PRIMARY KEY, email TEXT NOT NULL, age INTEGER);",
            "schema.lp.sql",
            Dialect::Postgres,
        )
        .unwrap();

        let table = outcome.schema.table("users").expect("users table");
        assert_eq!(table.columns.len(), 3);

        let id = table.column("id").unwrap();
        assert!(id.is_primary_key);
        assert!(!id.nullable);
        assert_eq!(id.logical_type, LogicalType::BigInt);

        let age = table.column("age").unwrap();
        assert!(age.nullable);
        assert_eq!(age.logical_type, LogicalType::Integer);
    }

    #[test]
    fn parses_indexes_and_foreign_keys() {
        let source = "
            CREATE TABLE users (id BIGINT PRIMARY KEY, email TEXT NOT NULL);
            CREATE TABLE posts (
                id BIGINT PRIMARY KEY,
                author_id BIGINT NOT NULL,
                CONSTRAINT posts_author_fkey FOREIGN KEY (author_id) REFERENCES users (id) ON DELETE CASCADE
            );
            CREATE UNIQUE INDEX users_email_idx ON users (email);
        ";
        let outcome = parse_schema_source(source, "schema.lp.sql", Dialect::Postgres).unwrap();

        let users = outcome.schema.table("users").unwrap();
        let index = users.index("users_email_idx").expect("email index");
        assert!(index.unique);
        assert_eq!(index.columns, vec!["email".to_string()]);

        let posts = outcome.schema.table("posts").unwrap();
        let fk = posts.foreign_key("posts_author_fkey").expect("author fk");
        assert_eq!(fk.referenced_table, "users");
        assert_eq!(fk.columns, vec!["author_id".to_string()]);
        assert_eq!(fk.referenced_columns, vec!["id".to_string()]);
        assert_eq!(fk.on_delete, Some(lockplane::libs::schema::RefAction::Cascade));
    }

    #[test]
    fn applies_the_allowed_alter_surface() {
        let source = "
            CREATE TABLE users (id BIGINT PRIMARY KEY, email TEXT);
            ALTER TABLE users ADD COLUMN age INTEGER;
            ALTER TABLE users ALTER COLUMN email SET NOT NULL;
            ALTER TABLE users ALTER COLUMN age SET DEFAULT 0;
        ";
        let outcome = parse_schema_source(source, "schema.lp.sql", Dialect::Postgres).unwrap();
        let users = outcome.schema.table("users").unwrap();

        assert!(users.column("age").is_some());
        assert!(!users.column("email").unwrap().nullable);
        assert_eq!(users.column("age").unwrap().default.as_deref(), Some("0"));
    }

    #[test]
    fn rejects_if_not_exists() {
        let error = parse_schema_source(
            "CREATE TABLE IF NOT EXISTS users (id BIGINT PRIMARY KEY);",
            "schema.lp.sql",
            Dialect::Postgres,
        )
        .unwrap_err();
        let issues = issues_of(error);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code, "non-declarative");
    }

    #[test]
    fn rejects_destructive_statements() {
        let source = "
            CREATE TABLE users (id BIGINT PRIMARY KEY);
            DROP TABLE users;
            DELETE FROM users;
        ";
        let issues = issues_of(parse_schema_source(source, "schema.lp.sql", Dialect::Postgres).unwrap_err());
        let codes: Vec<&str> = issues.iter().map(|i| i.code.as_str()).collect();
        assert_eq!(codes, vec!["destructive", "destructive"]);
    }

    #[test]
    fn rejects_transaction_control() {
        let source = "BEGIN;\nCREATE TABLE users (id BIGINT PRIMARY KEY);\nCOMMIT;";
        let issues = issues_of(parse_schema_source(source, "schema.lp.sql", Dialect::Postgres).unwrap_err());
        assert!(issues.iter().all(|i| i.code == "transaction-control"));
        assert_eq!(issues.len(), 2);
    }

    #[test]
    fn rejects_drop_column_in_schema_files() {
        let source = "
            CREATE TABLE users (id BIGINT PRIMARY KEY, legacy TEXT);
            ALTER TABLE users DROP COLUMN legacy;
        ";
        let issues = issues_of(parse_schema_source(source, "schema.lp.sql", Dialect::Postgres).unwrap_err());
        assert_eq!(issues[0].code, "destructive");
        assert!(issues[0].hint.as_deref().unwrap().contains("CREATE TABLE"));
    }

    #[test]
    fn collects_every_error_in_one_pass() {
        let source = "
            CREATE TABLE IF NOT EXISTS a (id BIGINT PRIMARY KEY);
            CREATE TABLE b (id BIGINT PRIMARY KEY);
            DROP TABLE b;
        ";
        let issues = issues_of(parse_schema_source(source, "schema.lp.sql", Dialect::Postgres).unwrap_err());
        assert_eq!(issues.len(), 2);
    }

    #[test]
    fn reports_error_lines() {
        let source = "CREATE TABLE a (id BIGINT PRIMARY KEY);\n\nDROP TABLE a;";
        let issues = issues_of(parse_schema_source(source, "schema.lp.sql", Dialect::Postgres).unwrap_err());
        assert_eq!(issues[0].line, 3);
        assert_eq!(issues[0].file, "schema.lp.sql");
    }

    #[test]
    fn hints_on_mysql_auto_increment() {
        let error = parse_schema_source(
            "CREATE TABLE users (id INTEGER AUTO_INCREMENT PRIMARY KEY);",
            "schema.lp.sql",
            Dialect::Postgres,
        )
        .unwrap_err();
        let issues = issues_of(error);
        let hint = issues[0].hint.as_deref().unwrap_or_default();
        assert!(hint.contains("AUTO_INCREMENT"), "hint was: {hint}");
    }

    #[test]
    fn hints_on_notnull_typo() {
        let error = parse_schema_source(
            "CREATE TABLE users (id BIGINT PRIMARY KEY, email TEXT NOTNULL);",
            "schema.lp.sql",
            Dialect::Postgres,
        )
        .unwrap_err();
        let issues = issues_of(error);
        assert!(issues[0].hint.as_deref().unwrap_or_default().contains("NOT NULL"));
    }

    #[test]
    fn hints_on_trailing_comma() {
        let error = parse_schema_source(
            "CREATE TABLE users (id BIGINT PRIMARY KEY,);",
            "schema.lp.sql",
            Dialect::Postgres,
        )
        .unwrap_err();
        let issues = issues_of(error);
        assert!(issues[0].hint.as_deref().unwrap_or_default().contains("trailing comma"));
    }

    #[test]
    fn rejects_foreign_key_to_missing_table() {
        let source = "
            CREATE TABLE posts (
                id BIGINT PRIMARY KEY,
                author_id BIGINT,
                FOREIGN KEY (author_id) REFERENCES users (id)
            );
        ";
        let issues = issues_of(parse_schema_source(source, "schema.lp.sql", Dialect::Postgres).unwrap_err());
        assert!(issues.iter().any(|i| i.message.contains("missing table 'users'")));
    }

    #[test]
    fn rejects_index_on_missing_column() {
        let source = "
            CREATE TABLE users (id BIGINT PRIMARY KEY);
            CREATE INDEX users_name_idx ON users (name);
        ";
        let issues = issues_of(parse_schema_source(source, "schema.lp.sql", Dialect::Postgres).unwrap_err());
        assert!(issues.iter().any(|i| i.message.contains("missing column 'users.name'")));
    }

    #[test]
    fn rejects_duplicate_columns_and_tables() {
        let source = "
            CREATE TABLE users (id BIGINT PRIMARY KEY, id BIGINT);
            CREATE TABLE users (id BIGINT PRIMARY KEY);
        ";
        let issues = issues_of(parse_schema_source(source, "schema.lp.sql", Dialect::Postgres).unwrap_err());
        assert!(issues.iter().any(|i| i.message.contains("duplicate column 'id'")));
        assert!(issues.iter().any(|i| i.message.contains("duplicate table 'users'")));
    }

    #[test]
    fn warns_about_missing_primary_key() {
        let outcome = parse_schema_source("CREATE TABLE logs (line TEXT);", "schema.lp.sql", Dialect::Postgres).unwrap();
        assert!(outcome
            .warnings
            .iter()
            .any(|w| w.message.contains("no primary key")));
    }

    #[test]
    fn warns_about_varchar_without_length() {
        let outcome = parse_schema_source(
            "CREATE TABLE users (id BIGINT PRIMARY KEY, name VARCHAR);",
            "schema.lp.sql",
            Dialect::Postgres,
        )
        .unwrap();
        assert!(outcome.warnings.iter().any(|w| w.message.contains("VARCHAR")));
    }

    #[test]
    fn splitter_respects_literals_and_comments() {
        let statements = split_statements(
            "CREATE TABLE a (x TEXT DEFAULT 'semi;colon');\n-- comment; still comment\nCREATE TABLE b (y TEXT);",
        );
        assert_eq!(statements.len(), 2);
        assert!(statements[0].sql.contains("semi;colon"));
        assert_eq!(statements[0].line, 1);
        assert_eq!(statements[1].line, 3);
    }

    #[test_context(SchemaDirContext)]
    #[test]
    fn reads_directory_in_lexicographic_order(ctx: &mut SchemaDirContext) {
        let dir = ctx.temp_dir.path();
        // Named so that the FK in 20_posts resolves against 10_users even
        // though conversion is two-pass anyway.
        fs::write(
            dir.join("20_posts.lp.sql"),
            "CREATE TABLE posts (id BIGINT PRIMARY KEY, author_id BIGINT, FOREIGN KEY (author_id) REFERENCES users (id));",
        )
        .unwrap();
        fs::write(dir.join("10_users.lp.sql"), "CREATE TABLE users (id BIGINT PRIMARY KEY);").unwrap();
        fs::write(dir.join("ignored.sql"), "CREATE TABLE nope (id BIGINT PRIMARY KEY);").unwrap();
        fs::create_dir(dir.join("subdir")).unwrap();
        fs::write(dir.join("subdir").join("30_skip.lp.sql"), "CREATE TABLE skip (id BIGINT PRIMARY KEY);").unwrap();

        let outcome = parse_schema_path(dir, Dialect::Postgres).unwrap();
        let names: Vec<&str> = outcome.schema.tables.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["users", "posts"]);
    }

    #[test_context(SchemaDirContext)]
    #[test]
    fn errors_carry_the_originating_file(ctx: &mut SchemaDirContext) {
        let dir = ctx.temp_dir.path();
        fs::write(dir.join("a.lp.sql"), "CREATE TABLE a (id BIGINT PRIMARY KEY);").unwrap();
        fs::write(dir.join("b.lp.sql"), "CREATE TABLE a (id BIGINT PRIMARY KEY);\nTRUNCATE a;").unwrap();

        let issues = issues_of(parse_schema_path(dir, Dialect::Postgres).unwrap_err());
        assert!(issues.iter().any(|i| i.file == "b.lp.sql" && i.line == 2));
    }

    #[test]
    fn sqlite_dialect_accepts_sqlite_types() {
        let outcome = parse_schema_source(
            "CREATE TABLE todos (id INTEGER PRIMARY KEY, body TEXT, done BOOLEAN DEFAULT FALSE);",
            "schema.lp.sql",
            Dialect::Sqlite,
        )
        .unwrap();
        let todos = outcome.schema.table("todos").unwrap();
        assert_eq!(todos.column("id").unwrap().logical_type, LogicalType::Integer);
        assert_eq!(todos.column("done").unwrap().logical_type, LogicalType::Boolean);
    }
}
