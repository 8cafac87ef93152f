#[cfg(test)]
mod tests {
    use lockplane::libs::differ::{diff, ColumnChange};
    use lockplane::libs::schema::{Column, ForeignKey, Index, Schema, Table};
    use lockplane::libs::types::{Dialect, LogicalType};

    fn users_schema() -> Schema {
        Schema::new(Dialect::Postgres).with_table(
            Table::new("users")
                .with_column(Column::new("id", LogicalType::BigInt).primary_key())
                .with_column(Column::new("email", LogicalType::Text).not_null()),
        )
    }

    #[test]
    fn identical_schemas_diff_empty() {
        let schema = users_schema();
        assert!(diff(&schema, &schema).is_empty());
    }

    #[test]
    fn table_order_is_irrelevant() {
        let a = Schema::new(Dialect::Postgres)
            .with_table(Table::new("a").with_column(Column::new("id", LogicalType::BigInt).primary_key()))
            .with_table(Table::new("b").with_column(Column::new("id", LogicalType::BigInt).primary_key()));
        let b = Schema::new(Dialect::Postgres)
            .with_table(Table::new("b").with_column(Column::new("id", LogicalType::BigInt).primary_key()))
            .with_table(Table::new("a").with_column(Column::new("id", LogicalType::BigInt).primary_key()));
        assert!(diff(&a, &b).is_empty());
    }

    #[test]
    fn detects_added_and_removed_tables() {
        let before = users_schema();
        let after = users_schema().with_table(Table::new("posts").with_column(Column::new("id", LogicalType::BigInt).primary_key()));

        let result = diff(&before, &after);
        assert_eq!(result.added_tables.len(), 1);
        assert_eq!(result.added_tables[0].name, "posts");

        let reverse = diff(&after, &before);
        assert_eq!(reverse.removed_tables.len(), 1);
        assert_eq!(reverse.removed_tables[0].name, "posts");
    }

    #[test]
    fn detects_added_column() {
        let before = users_schema();
        let mut after = users_schema();
        after.tables[0].columns.push(Column::new("age", LogicalType::Integer));

        let result = diff(&before, &after);
        assert_eq!(result.modified_tables.len(), 1);
        let table_diff = &result.modified_tables[0];
        assert_eq!(table_diff.added_columns.len(), 1);
        assert_eq!(table_diff.added_columns[0].name, "age");
        assert!(table_diff.removed_columns.is_empty());
    }

    #[test]
    fn detects_column_change_dimensions() {
        let before = users_schema();
        let mut after = users_schema();
        {
            let email = after.tables[0].columns.iter_mut().find(|c| c.name == "email").unwrap();
            email.nullable = true;
            email.logical_type = LogicalType::Varchar(Some(255));
            email.default = Some("''".to_string());
        }

        let result = diff(&before, &after);
        let column_diff = &result.modified_tables[0].modified_columns[0];
        assert_eq!(column_diff.column_name, "email");
        assert_eq!(
            column_diff.changes,
            vec![ColumnChange::Type, ColumnChange::Nullable, ColumnChange::Default]
        );
    }

    #[test]
    fn raw_type_spelling_does_not_diff() {
        let mut before = users_schema();
        let mut after = users_schema();
        before.tables[0].columns[0].raw_type = "pg_catalog.int8".to_string();
        after.tables[0].columns[0].raw_type = "BIGINT".to_string();
        assert!(diff(&before, &after).is_empty());
    }

    #[test]
    fn default_comparison_trims_whitespace() {
        let mut before = users_schema();
        let mut after = users_schema();
        before.tables[0].columns[1].default = Some(" 'x' ".to_string());
        after.tables[0].columns[1].default = Some("'x'".to_string());
        assert!(diff(&before, &after).is_empty());
    }

    #[test]
    fn changed_index_is_removed_and_added() {
        let mut before = users_schema();
        let mut after = users_schema();
        before.tables[0].indexes.push(Index {
            name: "users_email_idx".into(),
            columns: vec!["email".into()],
            unique: false,
        });
        after.tables[0].indexes.push(Index {
            name: "users_email_idx".into(),
            columns: vec!["email".into()],
            unique: true,
        });

        let result = diff(&before, &after);
        let table_diff = &result.modified_tables[0];
        assert_eq!(table_diff.removed_indexes.len(), 1);
        assert_eq!(table_diff.added_indexes.len(), 1);
        assert!(table_diff.added_indexes[0].unique);
    }

    #[test]
    fn foreign_key_field_change_is_removed_and_added() {
        let fk = |on_delete| ForeignKey {
            name: "posts_author_fkey".into(),
            columns: vec!["author_id".into()],
            referenced_table: "users".into(),
            referenced_columns: vec!["id".into()],
            on_delete,
            on_update: None,
        };
        let mut before = users_schema();
        let mut after = users_schema();
        before.tables[0].foreign_keys.push(fk(None));
        after.tables[0].foreign_keys.push(fk(Some(lockplane::libs::schema::RefAction::Cascade)));

        let result = diff(&before, &after);
        let table_diff = &result.modified_tables[0];
        assert_eq!(table_diff.removed_foreign_keys.len(), 1);
        assert_eq!(table_diff.added_foreign_keys.len(), 1);
    }

    #[test]
    fn unchanged_tables_are_omitted() {
        let before = users_schema().with_table(Table::new("posts").with_column(Column::new("id", LogicalType::BigInt).primary_key()));
        let mut after = before.clone();
        after.tables[1].columns.push(Column::new("title", LogicalType::Text));

        let result = diff(&before, &after);
        assert_eq!(result.modified_tables.len(), 1);
        assert_eq!(result.modified_tables[0].table_name, "posts");
    }
}
