#[cfg(test)]
mod tests {
    use lockplane::libs::multiphase;
    use lockplane::libs::plan::{MultiPhasePlan, PhasePattern, PlanDocument};
    use lockplane::libs::schema::{Column, Schema, Table};
    use lockplane::libs::types::{Dialect, LogicalType};

    fn users(dialect: Dialect) -> Schema {
        Schema::new(dialect).with_table(
            Table::new("users")
                .with_column(Column::new("id", LogicalType::BigInt).primary_key())
                .with_column(Column::new("email", LogicalType::Text).not_null()),
        )
    }

    #[test]
    fn rename_expands_into_three_phases() {
        let plan = multiphase::expand_contract_rename(&users(Dialect::Postgres), "users", "email", "email_address").unwrap();

        assert_eq!(plan.pattern, PhasePattern::ExpandContract);
        assert_eq!(plan.total_phases, 3);
        assert_eq!(plan.phases.len(), 3);

        // Phase 1: add the new column and backfill it from the old one.
        let expand = &plan.phases[0];
        assert!(!expand.requires_code_deploy);
        assert_eq!(expand.plan.steps.len(), 2);
        assert!(expand.plan.steps[0].sql.contains("ADD COLUMN \"email_address\" TEXT"));
        assert!(!expand.plan.steps[0].sql.contains("NOT NULL"));
        assert_eq!(
            expand.plan.steps[1].sql,
            "UPDATE \"users\" SET \"email_address\" = \"email\" WHERE \"email_address\" IS NULL"
        );
        assert!(expand.rollback.steps[0].sql.contains("DROP COLUMN \"email_address\""));

        // Phase 2: empty DDL behind a code deploy gate.
        let migrate = &plan.phases[1];
        assert!(migrate.requires_code_deploy);
        assert!(migrate.plan.is_empty());
        assert!(!migrate.code_changes_required.is_empty());

        // Phase 3: drop the old column; rollback re-adds and backfills it.
        let contract = &plan.phases[2];
        assert!(contract.plan.steps[0].sql.contains("DROP COLUMN \"email\""));
        assert!(contract.rollback.steps[0].sql.contains("ADD COLUMN \"email\""));
        assert!(contract.rollback.steps[1].sql.contains("SET \"email\" = \"email_address\""));
    }

    #[test]
    fn rename_rejects_missing_and_existing_columns() {
        let schema = users(Dialect::Postgres);
        assert!(multiphase::expand_contract_rename(&schema, "users", "ghost", "x").is_err());
        assert!(multiphase::expand_contract_rename(&schema, "users", "email", "id").is_err());
        assert!(multiphase::expand_contract_rename(&schema, "ghosts", "email", "x").is_err());
    }

    #[test]
    fn every_phase_carries_verification_or_rollback() {
        let plan = multiphase::expand_contract_rename(&users(Dialect::Postgres), "users", "email", "email_address").unwrap();
        for phase in &plan.phases {
            assert!(phase.phase_number >= 1);
            // A phase with DDL must be able to undo itself.
            if !phase.plan.is_empty() {
                assert!(!phase.rollback.is_empty() || phase.plan.steps.iter().all(|s| s.is_comment_only()));
            }
        }
    }

    #[test]
    fn deprecation_gates_the_drop_behind_deploys() {
        let plan = multiphase::deprecation(&users(Dialect::Postgres), "users", "email").unwrap();
        assert_eq!(plan.pattern, PhasePattern::Deprecation);
        assert_eq!(plan.total_phases, 3);

        assert!(plan.phases[0].plan.steps[0].is_comment_only());
        assert!(plan.phases[1].requires_code_deploy);
        assert!(plan.phases[2].plan.steps[0].sql.contains("DROP COLUMN \"email\""));
    }

    #[test]
    fn drop_table_with_archive_has_four_phases() {
        let plan = multiphase::drop_table(&users(Dialect::Postgres), "users", true).unwrap();
        assert_eq!(plan.pattern, PhasePattern::DropTable);
        assert_eq!(plan.total_phases, 4);

        let archive = &plan.phases[0];
        assert!(archive.plan.steps[0].sql.contains("CREATE TABLE \"users__archive\" AS SELECT * FROM \"users\""));
        assert!(archive.verification[0].contains("COUNT(*)"));

        assert!(plan.phases[1].requires_code_deploy);
        assert!(plan.phases[2].requires_code_deploy);

        let drop = &plan.phases[3];
        assert!(drop.plan.steps[0].sql.contains("DROP TABLE \"users\""));
        // Rollback restores structure and rows.
        assert!(drop.rollback.steps[0].sql.starts_with("CREATE TABLE \"users\""));
        assert!(drop.rollback.steps[1].sql.contains("INSERT INTO \"users\" SELECT * FROM \"users__archive\""));
    }

    #[test]
    fn drop_table_without_archive_has_three_phases() {
        let plan = multiphase::drop_table(&users(Dialect::Postgres), "users", false).unwrap();
        assert_eq!(plan.total_phases, 3);
        assert_eq!(plan.phases.last().unwrap().rollback.steps.len(), 1);
    }

    #[test]
    fn validation_pattern_backfills_then_constrains() {
        let mut schema = users(Dialect::Postgres);
        schema.tables[0]
            .columns
            .push(Column::new("age", LogicalType::Integer).with_default("0"));

        let plan = multiphase::validation(&schema, "users", "age").unwrap();
        assert_eq!(plan.pattern, PhasePattern::Validation);
        assert_eq!(plan.total_phases, 3);

        let backfill = &plan.phases[1];
        assert_eq!(backfill.plan.steps[0].sql, "UPDATE \"users\" SET \"age\" = 0 WHERE \"age\" IS NULL");
        assert!(backfill.verification[0].contains("IS NULL"));

        let constrain = &plan.phases[2];
        assert!(constrain.plan.steps[0].sql.contains("SET NOT NULL"));
        assert!(constrain.rollback.steps[0].sql.contains("DROP NOT NULL"));
    }

    #[test]
    fn validation_requires_a_default_to_backfill_from() {
        let mut schema = users(Dialect::Postgres);
        schema.tables[0].columns.push(Column::new("age", LogicalType::Integer));
        assert!(multiphase::validation(&schema, "users", "age").is_err());
    }

    #[test]
    fn validation_on_sqlite_uses_recreation_for_the_constraint() {
        let mut schema = Schema::new(Dialect::Sqlite).with_table(
            Table::new("todos").with_column(Column::new("id", LogicalType::Integer).primary_key()),
        );
        schema.tables[0]
            .columns
            .push(Column::new("body", LogicalType::Text).with_default("''"));

        let plan = multiphase::validation(&schema, "todos", "body").unwrap();
        let constrain = &plan.phases[2];
        assert!(constrain.plan.steps[0].sql.contains("CREATE TABLE \"todos__new\""));
        assert!(constrain.plan.steps[0].sql.contains("RENAME TO \"todos\""));
    }

    #[test]
    fn type_change_dual_writes_with_cast() {
        let plan = multiphase::type_change(&users(Dialect::Postgres), "users", "email", LogicalType::Varchar(Some(255))).unwrap();
        assert_eq!(plan.pattern, PhasePattern::TypeChange);
        assert_eq!(plan.total_phases, 3);

        let expand = &plan.phases[0];
        assert!(expand.plan.steps[0].sql.contains("ADD COLUMN \"email_new\" VARCHAR(255)"));
        assert!(expand.plan.steps[1].sql.contains("CAST(\"email\" AS VARCHAR(255))"));

        assert!(plan.phases[1].requires_code_deploy);
        assert!(plan.phases[2].plan.steps[0].sql.contains("DROP COLUMN \"email\""));
    }

    #[test]
    fn type_change_rejects_identity() {
        let error = multiphase::type_change(&users(Dialect::Postgres), "users", "email", LogicalType::Text);
        assert!(error.is_err());
    }

    #[test]
    fn multi_phase_plans_round_trip_through_json() {
        let plan = multiphase::expand_contract_rename(&users(Dialect::Postgres), "users", "email", "email_address").unwrap();
        let json = plan.to_json().unwrap();
        assert!(json.contains("\"multi_phase\": true"));

        let restored = MultiPhasePlan::from_json(&json).unwrap();
        assert_eq!(plan, restored);
    }

    #[test]
    fn plan_document_distinguishes_the_shapes() {
        let dir = tempfile::tempdir().unwrap();
        let multi_path = dir.path().join("phases.json");
        let plan = multiphase::deprecation(&users(Dialect::Postgres), "users", "email").unwrap();
        std::fs::write(&multi_path, plan.to_json().unwrap()).unwrap();

        match PlanDocument::read(&multi_path).unwrap() {
            PlanDocument::Multi(loaded) => assert_eq!(loaded.pattern, PhasePattern::Deprecation),
            PlanDocument::Single(_) => panic!("expected multi-phase document"),
        }

        let single_path = dir.path().join("plan.json");
        std::fs::write(&single_path, "{\"source_hash\": \"\", \"steps\": []}").unwrap();
        match PlanDocument::read(&single_path).unwrap() {
            PlanDocument::Single(loaded) => assert!(loaded.is_empty()),
            PlanDocument::Multi(_) => panic!("expected single-phase document"),
        }
    }
}
