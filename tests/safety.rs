#[cfg(test)]
mod tests {
    use lockplane::libs::plan::SafetyLevel;
    use lockplane::libs::safety::*;
    use lockplane::libs::schema::{Column, ForeignKey, Index, Table};
    use lockplane::libs::types::LogicalType;

    fn fk() -> ForeignKey {
        ForeignKey {
            name: "posts_author_fkey".into(),
            columns: vec!["author_id".into()],
            referenced_table: "users".into(),
            referenced_columns: vec!["id".into()],
            on_delete: None,
            on_update: None,
        }
    }

    #[test]
    fn new_table_is_safe() {
        let table = Table::new("users").with_column(Column::new("id", LogicalType::BigInt).primary_key());
        let classification = classify_create_table(&table);
        assert_eq!(classification.safety_level, SafetyLevel::Safe);
        assert!(!classification.breaking_change);
        assert!(!classification.data_loss);
    }

    #[test]
    fn nullable_column_is_safe() {
        let classification = classify_add_column("users", &Column::new("age", LogicalType::Integer));
        assert_eq!(classification.safety_level, SafetyLevel::Safe);
    }

    #[test]
    fn column_with_default_is_safe() {
        let column = Column::new("age", LogicalType::Integer).not_null().with_default("0");
        assert_eq!(classify_add_column("users", &column).safety_level, SafetyLevel::Safe);
    }

    #[test]
    fn not_null_column_without_default_is_dangerous() {
        let column = Column::new("age", LogicalType::Integer).not_null();
        let classification = classify_add_column("users", &column);
        assert_eq!(classification.safety_level, SafetyLevel::Dangerous);
        assert!(classification.safer_alternatives[0].contains("validation pattern"));
    }

    #[test]
    fn drop_table_is_dangerous_with_archive_alternative() {
        let table = Table::new("users").with_column(Column::new("id", LogicalType::BigInt).primary_key());
        let classification = classify_drop_table(&table);
        assert_eq!(classification.safety_level, SafetyLevel::Dangerous);
        assert!(classification.data_loss);
        assert!(classification
            .safer_alternatives
            .iter()
            .any(|a| a.contains("archive") && a.contains("drop")));
    }

    #[test]
    fn drop_column_is_dangerous_with_expand_contract_alternative() {
        let column = Column::new("deprecated", LogicalType::Text);
        let classification = classify_drop_column("users", &column);
        assert_eq!(classification.safety_level, SafetyLevel::Dangerous);
        assert!(classification.data_loss);
        assert!(classification.safer_alternatives[0].contains("expand/contract"));
        assert!(classification.rollback_description.contains("not recoverable"));
    }

    #[test]
    fn widening_is_lossy_on_rollback_only() {
        let classification = classify_type_change("users", "id", &LogicalType::Integer, &LogicalType::BigInt);
        assert_eq!(classification.safety_level, SafetyLevel::Lossy);
        assert!(!classification.data_loss);
        assert!(classification.rollback_description.contains("rollback loses data"));
    }

    #[test]
    fn varchar_widening_is_lossy() {
        let classification = classify_type_change(
            "users",
            "name",
            &LogicalType::Varchar(Some(50)),
            &LogicalType::Varchar(Some(255)),
        );
        assert_eq!(classification.safety_level, SafetyLevel::Lossy);
    }

    #[test]
    fn narrowing_is_dangerous() {
        let classification = classify_type_change("users", "id", &LogicalType::BigInt, &LogicalType::Integer);
        assert_eq!(classification.safety_level, SafetyLevel::Dangerous);
        assert!(classification.data_loss);
    }

    #[test]
    fn incompatible_change_is_multi_phase() {
        let classification = classify_type_change("users", "meta", &LogicalType::Boolean, &LogicalType::Json);
        assert_eq!(classification.safety_level, SafetyLevel::MultiPhase);
    }

    #[test]
    fn set_not_null_with_default_is_review() {
        let column = Column::new("age", LogicalType::Integer).with_default("0");
        assert_eq!(classify_set_not_null("users", &column).safety_level, SafetyLevel::Review);
    }

    #[test]
    fn set_not_null_without_default_is_dangerous() {
        let column = Column::new("age", LogicalType::Integer);
        let classification = classify_set_not_null("users", &column);
        assert_eq!(classification.safety_level, SafetyLevel::Dangerous);
        assert!(classification.safer_alternatives[0].contains("backfill"));
    }

    #[test]
    fn unique_index_on_existing_table_is_review() {
        let index = Index {
            name: "users_email_key".into(),
            columns: vec!["email".into()],
            unique: true,
        };
        assert_eq!(classify_add_index(&index, false).safety_level, SafetyLevel::Review);
        // The same index on a freshly created table covers no existing data.
        assert_eq!(classify_add_index(&index, true).safety_level, SafetyLevel::Safe);
    }

    #[test]
    fn non_unique_index_is_safe() {
        let index = Index {
            name: "users_email_idx".into(),
            columns: vec!["email".into()],
            unique: false,
        };
        assert_eq!(classify_add_index(&index, false).safety_level, SafetyLevel::Safe);
    }

    #[test]
    fn foreign_key_changes_are_review() {
        assert_eq!(classify_add_foreign_key(&fk()).safety_level, SafetyLevel::Review);
        assert_eq!(classify_drop_foreign_key(&fk()).safety_level, SafetyLevel::Review);
    }

    #[test]
    fn merge_keeps_the_most_severe_level() {
        let safe = classify_drop_not_null("users", "age");
        let dangerous = classify_drop_column("users", &Column::new("x", LogicalType::Text));
        let merged = safe.merge(dangerous.clone());
        assert_eq!(merged.safety_level, SafetyLevel::Dangerous);
        assert!(merged.data_loss);
        assert_eq!(merged.safer_alternatives, dangerous.safer_alternatives);
    }
}
