#[cfg(test)]
mod tests {
    use lockplane::db::executor::{execute_plan, verify_source_hash, ExecOptions};
    use lockplane::db::introspect::introspect_target;
    use lockplane::db::target::{Deadline, Target};
    use lockplane::libs::differ::diff;
    use lockplane::libs::error::LockplaneError;
    use lockplane::libs::hash::compute_schema_hash;
    use lockplane::libs::parser::parse_schema_source;
    use lockplane::libs::plan::{Operation, Plan, PlanStep, SafetyLevel};
    use lockplane::libs::planner::build_plan;
    use lockplane::libs::schema::Schema;
    use lockplane::libs::types::Dialect;

    const SCHEMAS: &[String] = &[];

    async fn memory_target() -> Target {
        Target::connect(":memory:", Deadline::none()).await.unwrap()
    }

    async fn current_schema(target: &mut Target) -> Schema {
        introspect_target(target, SCHEMAS, Deadline::none()).await.unwrap()
    }

    fn parse(ddl: &str) -> Schema {
        parse_schema_source(ddl, "schema.lp.sql", Dialect::Sqlite).unwrap().schema
    }

    fn options_without_shadow() -> ExecOptions {
        ExecOptions {
            skip_shadow: true,
            ..ExecOptions::default()
        }
    }

    #[tokio::test]
    async fn applies_create_table_and_converges() {
        let mut target = memory_target().await;
        let current = current_schema(&mut target).await;
        assert!(current.is_empty());

        let desired = parse("CREATE TABLE users (id BIGINT PRIMARY KEY, email TEXT);");
        let plan = build_plan(&diff(&current, &desired), &current, &desired, Dialect::Sqlite).unwrap();

        let result = execute_plan(&plan, &mut target, None, &current, &options_without_shadow())
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.steps_applied, 1);

        // Re-introspection converges on the declared state.
        let after = current_schema(&mut target).await;
        assert!(diff(&after, &desired).is_empty());
        assert_eq!(compute_schema_hash(Some(&after)), compute_schema_hash(Some(&desired)));
    }

    #[tokio::test]
    async fn source_hash_mismatch_refuses_to_apply() {
        let mut target = memory_target().await;
        target
            .batch_execute("CREATE TABLE users (id BIGINT PRIMARY KEY, email TEXT)", Deadline::none())
            .await
            .unwrap();
        let current = current_schema(&mut target).await;

        let desired = parse("CREATE TABLE users (id BIGINT PRIMARY KEY, email TEXT, age INTEGER);");
        let plan = build_plan(&diff(&current, &desired), &current, &desired, Dialect::Sqlite).unwrap();

        // Out-of-band change after the plan was generated.
        target
            .batch_execute("ALTER TABLE users ADD COLUMN sneaky TEXT", Deadline::none())
            .await
            .unwrap();
        let drifted = current_schema(&mut target).await;

        let error = execute_plan(&plan, &mut target, None, &drifted, &options_without_shadow())
            .await
            .unwrap_err();
        match error {
            LockplaneError::SourceHashMismatch { expected, actual } => {
                assert_eq!(expected, plan.source_hash);
                assert_ne!(expected, actual);
            }
            other => panic!("expected SourceHashMismatch, got {other:?}"),
        }

        // Nothing was applied: the plan's new column is absent.
        let unchanged = current_schema(&mut target).await;
        assert!(unchanged.table("users").unwrap().column("age").is_none());
    }

    #[tokio::test]
    async fn verify_source_hash_passes_on_match() {
        let mut target = memory_target().await;
        let current = current_schema(&mut target).await;
        let plan = Plan::new(compute_schema_hash(Some(&current)));
        assert!(verify_source_hash(&plan, &current).is_ok());
    }

    #[tokio::test]
    async fn failed_step_rolls_back_the_whole_plan() {
        let mut target = memory_target().await;
        let current = current_schema(&mut target).await;

        let step = |sql: &str| PlanStep {
            description: format!("run {sql}"),
            sql: sql.to_string(),
            operation: Operation::Note,
            safety_level: SafetyLevel::Safe,
            breaking_change: false,
            data_loss: false,
            rollback_description: String::new(),
            safer_alternatives: Vec::new(),
        };
        let plan = Plan {
            source_hash: String::new(),
            steps: vec![
                step("CREATE TABLE a (id INTEGER PRIMARY KEY)"),
                step("CREATE TABLE nope (id INTEGER PRIMARY KEY, id INTEGER)"),
            ],
        };

        let result = execute_plan(&plan, &mut target, None, &current, &options_without_shadow())
            .await
            .unwrap();
        assert!(!result.success);
        assert_eq!(result.steps_applied, 1);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].step_index, 1);

        // The first step was rolled back with the failed one.
        let after = current_schema(&mut target).await;
        assert!(after.table("a").is_none());
    }

    #[tokio::test]
    async fn comment_only_steps_are_skipped() {
        let mut target = memory_target().await;
        let current = current_schema(&mut target).await;

        let plan = Plan {
            source_hash: String::new(),
            steps: vec![PlanStep {
                description: "documentation only".into(),
                sql: "-- sqlite cannot do this directly".into(),
                operation: Operation::Note,
                safety_level: SafetyLevel::Safe,
                breaking_change: false,
                data_loss: false,
                rollback_description: String::new(),
                safer_alternatives: Vec::new(),
            }],
        };

        let result = execute_plan(&plan, &mut target, None, &current, &options_without_shadow())
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.steps_applied, 0);
    }

    #[tokio::test]
    async fn shadow_rehearsal_catches_a_bad_plan_before_apply() {
        let mut target = memory_target().await;
        target
            .batch_execute("CREATE TABLE users (id BIGINT PRIMARY KEY)", Deadline::none())
            .await
            .unwrap();
        let current = current_schema(&mut target).await;

        let plan = Plan {
            source_hash: String::new(),
            steps: vec![PlanStep {
                description: "add a column that already exists".into(),
                sql: "ALTER TABLE users ADD COLUMN id INTEGER".into(),
                operation: Operation::AddColumn {
                    table: "users".into(),
                    column: "id".into(),
                },
                safety_level: SafetyLevel::Safe,
                breaking_change: false,
                data_loss: false,
                rollback_description: String::new(),
                safer_alternatives: Vec::new(),
            }],
        };

        let mut shadow = memory_target().await;
        let options = ExecOptions::default();
        let error = execute_plan(&plan, &mut target, Some(&mut shadow), &current, &options)
            .await
            .unwrap_err();
        match error {
            LockplaneError::ShadowDryRunFailed { step_index, .. } => assert_eq!(step_index, 0),
            other => panic!("expected ShadowDryRunFailed, got {other:?}"),
        }

        // The real database was never touched.
        let after = current_schema(&mut target).await;
        assert_eq!(after.table("users").unwrap().columns.len(), 1);
    }

    #[tokio::test]
    async fn shadow_rehearsal_passes_and_apply_proceeds() {
        let mut target = memory_target().await;
        target
            .batch_execute("CREATE TABLE users (id BIGINT PRIMARY KEY)", Deadline::none())
            .await
            .unwrap();
        let current = current_schema(&mut target).await;

        let desired = parse("CREATE TABLE users (id BIGINT PRIMARY KEY, email TEXT);");
        let plan = build_plan(&diff(&current, &desired), &current, &desired, Dialect::Sqlite).unwrap();

        let mut shadow = memory_target().await;
        // Leftover junk on the shadow must not break the rehearsal.
        shadow
            .batch_execute("CREATE TABLE leftover (id INTEGER PRIMARY KEY)", Deadline::none())
            .await
            .unwrap();

        let result = execute_plan(&plan, &mut target, Some(&mut shadow), &current, &ExecOptions::default())
            .await
            .unwrap();
        assert!(result.success);

        let after = current_schema(&mut target).await;
        assert!(after.table("users").unwrap().column("email").is_some());
    }

    #[tokio::test]
    async fn sqlite_table_recreation_round_trips() {
        let mut target = memory_target().await;
        target
            .batch_execute(
                "CREATE TABLE todos (id INTEGER PRIMARY KEY, body TEXT);\n\
                 INSERT INTO todos (id, body) VALUES (1, 'write tests');",
                Deadline::none(),
            )
            .await
            .unwrap();
        let current = current_schema(&mut target).await;

        let desired = parse("CREATE TABLE todos (id INTEGER PRIMARY KEY, body TEXT NOT NULL);");
        let plan = build_plan(&diff(&current, &desired), &current, &desired, Dialect::Sqlite).unwrap();
        assert!(matches!(plan.steps[0].operation, Operation::RecreateTable { .. }));

        let result = execute_plan(&plan, &mut target, None, &current, &options_without_shadow())
            .await
            .unwrap();
        assert!(result.success);

        let after = current_schema(&mut target).await;
        assert!(!after.table("todos").unwrap().column("body").unwrap().nullable);
        assert_eq!(compute_schema_hash(Some(&after)), compute_schema_hash(Some(&desired)));

        // Row data survived the recreation.
        match &mut target {
            Target::Sqlite { conn, .. } => {
                let body: String = conn
                    .query_row("SELECT body FROM todos WHERE id = 1", [], |row| row.get(0))
                    .unwrap();
                assert_eq!(body, "write tests");
            }
            _ => unreachable!(),
        }
    }

    #[tokio::test]
    async fn expired_deadline_cancels_before_any_step() {
        let mut target = memory_target().await;
        let current = current_schema(&mut target).await;

        let desired = parse("CREATE TABLE users (id BIGINT PRIMARY KEY);");
        let plan = build_plan(&diff(&current, &desired), &current, &desired, Dialect::Sqlite).unwrap();

        let options = ExecOptions {
            skip_shadow: true,
            deadline: Deadline::after(std::time::Duration::ZERO),
            ..ExecOptions::default()
        };
        let error = execute_plan(&plan, &mut target, None, &current, &options).await.unwrap_err();
        assert!(matches!(error, LockplaneError::Cancelled));

        let after = current_schema(&mut target).await;
        assert!(after.is_empty());
    }
}
