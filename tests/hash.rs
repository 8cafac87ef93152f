#[cfg(test)]
mod tests {
    use lockplane::libs::differ::diff;
    use lockplane::libs::hash::{compute_schema_hash, fingerprint};
    use lockplane::libs::schema::{Column, Index, Schema, Table};
    use lockplane::libs::types::{Dialect, LogicalType};

    fn users(dialect: Dialect) -> Schema {
        Schema::new(dialect).with_table(
            Table::new("users")
                .with_column(Column::new("id", LogicalType::BigInt).primary_key())
                .with_column(Column::new("email", LogicalType::Text).not_null()),
        )
    }

    #[test]
    fn hash_is_stable() {
        let schema = users(Dialect::Postgres);
        assert_eq!(compute_schema_hash(Some(&schema)), compute_schema_hash(Some(&schema)));
    }

    #[test]
    fn hash_is_lowercase_hex_sha256() {
        let hash = compute_schema_hash(Some(&users(Dialect::Postgres)));
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn nil_and_empty_schema_hash_identically() {
        let empty_pg = Schema::new(Dialect::Postgres);
        let empty_sqlite = Schema::new(Dialect::Sqlite);
        assert_eq!(compute_schema_hash(None), compute_schema_hash(Some(&empty_pg)));
        assert_eq!(compute_schema_hash(Some(&empty_pg)), compute_schema_hash(Some(&empty_sqlite)));
    }

    #[test]
    fn dialect_tag_does_not_participate() {
        assert_eq!(
            compute_schema_hash(Some(&users(Dialect::Postgres))),
            compute_schema_hash(Some(&users(Dialect::Sqlite)))
        );
    }

    #[test]
    fn raw_type_spelling_does_not_participate() {
        let mut a = users(Dialect::Postgres);
        let mut b = users(Dialect::Postgres);
        a.tables[0].columns[0].raw_type = "pg_catalog.int8".to_string();
        b.tables[0].columns[0].raw_type = "BIGINT".to_string();
        assert_eq!(compute_schema_hash(Some(&a)), compute_schema_hash(Some(&b)));
    }

    #[test]
    fn table_insertion_order_does_not_participate() {
        let t1 = Table::new("a").with_column(Column::new("id", LogicalType::BigInt).primary_key());
        let t2 = Table::new("b").with_column(Column::new("id", LogicalType::BigInt).primary_key());
        let forward = Schema::new(Dialect::Postgres).with_table(t1.clone()).with_table(t2.clone());
        let reverse = Schema::new(Dialect::Postgres).with_table(t2).with_table(t1);
        assert_eq!(compute_schema_hash(Some(&forward)), compute_schema_hash(Some(&reverse)));
    }

    #[test]
    fn column_order_is_significant() {
        let forward = Schema::new(Dialect::Postgres).with_table(
            Table::new("t")
                .with_column(Column::new("a", LogicalType::Text))
                .with_column(Column::new("b", LogicalType::Text)),
        );
        let reverse = Schema::new(Dialect::Postgres).with_table(
            Table::new("t")
                .with_column(Column::new("b", LogicalType::Text))
                .with_column(Column::new("a", LogicalType::Text)),
        );
        assert_ne!(compute_schema_hash(Some(&forward)), compute_schema_hash(Some(&reverse)));
    }

    #[test]
    fn index_column_order_is_significant() {
        let index = |columns: Vec<&str>| Index {
            name: "t_idx".into(),
            columns: columns.into_iter().map(String::from).collect(),
            unique: false,
        };
        let base = Table::new("t")
            .with_column(Column::new("a", LogicalType::Text))
            .with_column(Column::new("b", LogicalType::Text));
        let forward = Schema::new(Dialect::Postgres).with_table(base.clone().with_index(index(vec!["a", "b"])));
        let reverse = Schema::new(Dialect::Postgres).with_table(base.with_index(index(vec!["b", "a"])));
        assert_ne!(compute_schema_hash(Some(&forward)), compute_schema_hash(Some(&reverse)));
    }

    #[test]
    fn empty_diff_implies_equal_hash() {
        let mut a = users(Dialect::Postgres);
        let b = users(Dialect::Sqlite);
        a.tables[0].columns[0].raw_type = "int8".to_string();
        assert!(diff(&a, &b).is_empty());
        assert_eq!(compute_schema_hash(Some(&a)), compute_schema_hash(Some(&b)));
    }

    #[test]
    fn nullable_and_default_participate() {
        let mut a = users(Dialect::Postgres);
        let mut b = users(Dialect::Postgres);
        a.tables[0].columns[1].default = Some("'x'".to_string());
        assert_ne!(compute_schema_hash(Some(&a)), compute_schema_hash(Some(&b)));

        b.tables[0].columns[1].default = Some("'x'".to_string());
        assert_eq!(compute_schema_hash(Some(&a)), compute_schema_hash(Some(&b)));
    }

    #[test]
    fn fingerprint_tracks_content() {
        assert_eq!(fingerprint("abc"), fingerprint("abc"));
        assert_ne!(fingerprint("abc"), fingerprint("abd"));
    }
}
