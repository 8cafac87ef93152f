#[cfg(test)]
mod tests {
    use lockplane::libs::differ::diff;
    use lockplane::libs::error::LockplaneError;
    use lockplane::libs::plan::{Operation, Plan, PlanStep, SafetyLevel};
    use lockplane::libs::planner::build_plan;
    use lockplane::libs::rollback::build_rollback;
    use lockplane::libs::schema::{Column, ForeignKey, Index, Schema, Table};
    use lockplane::libs::types::{Dialect, LogicalType};

    fn users(dialect: Dialect) -> Schema {
        Schema::new(dialect).with_table(
            Table::new("users")
                .with_column(Column::new("id", LogicalType::BigInt).primary_key())
                .with_column(Column::new("email", LogicalType::Text).not_null()),
        )
    }

    fn forward_plan(before: &Schema, after: &Schema) -> Plan {
        build_plan(&diff(before, after), before, after, before.dialect).unwrap()
    }

    #[test]
    fn rollback_of_add_column_drops_it() {
        let before = users(Dialect::Postgres);
        let mut after = users(Dialect::Postgres);
        after.tables[0].columns.push(Column::new("age", LogicalType::Integer));

        let rollback = build_rollback(&forward_plan(&before, &after), &before).unwrap();
        assert_eq!(rollback.steps.len(), 1);
        assert_eq!(
            rollback.steps[0].operation,
            Operation::DropColumn {
                table: "users".into(),
                column: "age".into()
            }
        );
        assert_eq!(rollback.steps[0].sql, "ALTER TABLE \"users\" DROP COLUMN \"age\"");
    }

    #[test]
    fn rollback_of_create_table_drops_it() {
        let before = Schema::new(Dialect::Postgres);
        let after = users(Dialect::Postgres);

        let rollback = build_rollback(&forward_plan(&before, &after), &before).unwrap();
        assert_eq!(rollback.steps.len(), 1);
        assert_eq!(rollback.steps[0].sql, "DROP TABLE \"users\" CASCADE");
    }

    #[test]
    fn rollback_of_drop_table_recreates_from_pre_state() {
        let before = users(Dialect::Postgres);
        let after = Schema::new(Dialect::Postgres);

        let rollback = build_rollback(&forward_plan(&before, &after), &before).unwrap();
        assert!(rollback.steps[0].sql.starts_with("CREATE TABLE \"users\""));
        assert!(rollback.steps[0].sql.contains("\"email\" TEXT NOT NULL"));
    }

    #[test]
    fn rollback_of_drop_table_restores_indexes_and_foreign_keys() {
        let mut before = users(Dialect::Postgres);
        before.tables.push(
            Table::new("posts")
                .with_column(Column::new("id", LogicalType::BigInt).primary_key())
                .with_column(Column::new("author_id", LogicalType::BigInt))
                .with_index(Index {
                    name: "posts_author_idx".into(),
                    columns: vec!["author_id".into()],
                    unique: false,
                })
                .with_foreign_key(ForeignKey {
                    name: "posts_author_fkey".into(),
                    columns: vec!["author_id".into()],
                    referenced_table: "users".into(),
                    referenced_columns: vec!["id".into()],
                    on_delete: None,
                    on_update: None,
                }),
        );
        let after = users(Dialect::Postgres);

        let rollback = build_rollback(&forward_plan(&before, &after), &before).unwrap();
        let sqls: Vec<&str> = rollback.steps.iter().map(|s| s.sql.as_str()).collect();
        assert!(sqls[0].starts_with("CREATE TABLE \"posts\""));
        assert!(sqls.iter().any(|s| s.contains("CREATE INDEX \"posts_author_idx\"")));
        assert!(sqls.iter().any(|s| s.contains("ADD CONSTRAINT \"posts_author_fkey\"")));
    }

    #[test]
    fn rollback_inverts_in_reverse_order() {
        let mut before = users(Dialect::Postgres);
        before.tables[0].columns.push(Column::new("legacy", LogicalType::Text));
        let mut after = users(Dialect::Postgres);
        after.tables[0].columns.push(Column::new("age", LogicalType::Integer));

        // Forward: add "age", drop "legacy". Rollback must re-add "legacy"
        // first, then drop "age".
        let rollback = build_rollback(&forward_plan(&before, &after), &before).unwrap();
        let kinds: Vec<&str> = rollback
            .steps
            .iter()
            .map(|s| match &s.operation {
                Operation::AddColumn { .. } => "add",
                Operation::DropColumn { .. } => "drop",
                _ => "other",
            })
            .collect();
        assert_eq!(kinds, vec!["add", "drop"]);
        assert!(rollback.steps[0].sql.contains("\"legacy\""));
        assert!(rollback.steps[1].sql.contains("\"age\""));
    }

    #[test]
    fn rollback_of_not_null_change_is_the_opposite() {
        let mut before = users(Dialect::Postgres);
        before.tables[0].columns[1].nullable = true;
        let after = users(Dialect::Postgres);

        let rollback = build_rollback(&forward_plan(&before, &after), &before).unwrap();
        assert_eq!(
            rollback.steps[0].operation,
            Operation::DropNotNull {
                table: "users".into(),
                column: "email".into()
            }
        );
    }

    #[test]
    fn rollback_of_type_change_restores_old_type() {
        let mut before = users(Dialect::Postgres);
        before.tables[0].columns[0].logical_type = LogicalType::Integer;
        before.tables[0].columns[0].raw_type = "integer".into();
        let after = users(Dialect::Postgres);

        let rollback = build_rollback(&forward_plan(&before, &after), &before).unwrap();
        match &rollback.steps[0].operation {
            Operation::AlterColumnType { from, to, .. } => {
                assert_eq!(*from, LogicalType::BigInt);
                assert_eq!(*to, LogicalType::Integer);
            }
            other => panic!("expected AlterColumnType, got {other:?}"),
        }
        assert!(rollback.steps[0].sql.contains("TYPE INTEGER"));
    }

    #[test]
    fn rollback_of_default_change_restores_pre_state_default() {
        let mut before = users(Dialect::Postgres);
        before.tables[0].columns[1].default = Some("'nobody'".to_string());
        let mut after = users(Dialect::Postgres);
        after.tables[0].columns[1].default = Some("'unknown'".to_string());

        let rollback = build_rollback(&forward_plan(&before, &after), &before).unwrap();
        assert!(rollback.steps[0].sql.contains("SET DEFAULT 'nobody'"));
    }

    #[test]
    fn rollback_of_index_changes() {
        let mut before = users(Dialect::Postgres);
        before.tables[0].indexes.push(Index {
            name: "users_old_idx".into(),
            columns: vec!["email".into()],
            unique: false,
        });
        let mut after = users(Dialect::Postgres);
        after.tables[0].indexes.push(Index {
            name: "users_new_idx".into(),
            columns: vec!["email".into()],
            unique: true,
        });

        let rollback = build_rollback(&forward_plan(&before, &after), &before).unwrap();
        let sqls: Vec<&str> = rollback.steps.iter().map(|s| s.sql.as_str()).collect();
        assert!(sqls.iter().any(|s| s.contains("DROP INDEX \"users_new_idx\"")));
        assert!(sqls.iter().any(|s| *s == "CREATE INDEX \"users_old_idx\" ON \"users\" (\"email\")"));
    }

    #[test]
    fn rollback_of_sqlite_recreation_swaps_shapes() {
        let before = Schema::new(Dialect::Sqlite).with_table(
            Table::new("todos")
                .with_column(Column::new("id", LogicalType::Integer).primary_key())
                .with_column(Column::new("body", LogicalType::Text)),
        );
        let mut after = before.clone();
        after.tables[0].columns[1].nullable = false;

        let rollback = build_rollback(&forward_plan(&before, &after), &before).unwrap();
        assert_eq!(rollback.steps.len(), 1);
        match &rollback.steps[0].operation {
            Operation::RecreateTable { before: b, after: a, .. } => {
                assert!(!b.column("body").unwrap().nullable);
                assert!(a.column("body").unwrap().nullable);
            }
            other => panic!("expected RecreateTable, got {other:?}"),
        }
    }

    #[test]
    fn unreconstructible_step_is_not_reversible() {
        // A hand-built plan that drops a column the pre-state never had.
        let plan = Plan {
            source_hash: String::new(),
            steps: vec![PlanStep {
                description: "Drop column 'ghost' from 'users'".into(),
                sql: "ALTER TABLE \"users\" DROP COLUMN \"ghost\"".into(),
                operation: Operation::DropColumn {
                    table: "users".into(),
                    column: "ghost".into(),
                },
                safety_level: SafetyLevel::Dangerous,
                breaking_change: true,
                data_loss: true,
                rollback_description: String::new(),
                safer_alternatives: Vec::new(),
            }],
        };
        let pre_state = users(Dialect::Postgres);

        let error = build_rollback(&plan, &pre_state).unwrap_err();
        match error {
            LockplaneError::NotReversible { step_index, reason, .. } => {
                assert_eq!(step_index, 0);
                assert!(reason.contains("users.ghost"));
            }
            other => panic!("expected NotReversible, got {other:?}"),
        }
    }

    #[test]
    fn comment_only_steps_produce_no_inverse() {
        let plan = Plan {
            source_hash: String::new(),
            steps: vec![PlanStep {
                description: "note".into(),
                sql: "-- nothing to do".into(),
                operation: Operation::Note,
                safety_level: SafetyLevel::Safe,
                breaking_change: false,
                data_loss: false,
                rollback_description: String::new(),
                safer_alternatives: Vec::new(),
            }],
        };
        let rollback = build_rollback(&plan, &users(Dialect::Postgres)).unwrap();
        assert!(rollback.is_empty());
        assert!(rollback.source_hash.is_empty());
    }
}
