//! Catalog queries against DM's Oracle-style `ALL_*` views, and parsing of
//! their text results.

use std::collections::HashSet;

use tracing::warn;

use crate::core::ColumnDefinition;
use crate::error::{MigrateError, Result};

/// Escape a SQL string literal value.
/// Doubles single quotes: `O'Brien` -> `O''Brien`
pub fn escape_literal(s: &str) -> String {
    s.replace('\'', "''")
}

/// Quote a DM identifier.
/// Doubles embedded quotes: `a"b` -> `"a""b"`
pub fn quote_ident(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Every table owned by `schema` outside the SYSTEM tablespace.
pub fn list_tables_sql(schema: &str) -> String {
    format!(
        "SELECT TABLE_NAME FROM ALL_TABLES \
         WHERE OWNER = '{}' AND TABLESPACE_NAME <> 'SYSTEM' \
         ORDER BY TABLE_NAME",
        escape_literal(schema)
    )
}

/// Base column metadata in ordinal order.
pub fn columns_sql(schema: &str, table: &str) -> String {
    format!(
        "SELECT COLUMN_NAME, DATA_TYPE, DATA_LENGTH, \
         NVL(DATA_PRECISION, 0), NVL(DATA_SCALE, 0), NULLABLE, COLUMN_ID \
         FROM ALL_TAB_COLUMNS \
         WHERE OWNER = '{}' AND TABLE_NAME = '{}' \
         ORDER BY COLUMN_ID",
        escape_literal(schema),
        escape_literal(table)
    )
}

/// Columns of the table's primary key constraint.
pub fn primary_key_sql(schema: &str, table: &str) -> String {
    format!(
        "SELECT cc.COLUMN_NAME FROM ALL_CONS_COLUMNS cc \
         JOIN ALL_CONSTRAINTS c ON cc.OWNER = c.OWNER AND cc.CONSTRAINT_NAME = c.CONSTRAINT_NAME \
         WHERE c.CONSTRAINT_TYPE = 'P' AND c.OWNER = '{}' AND c.TABLE_NAME = '{}' \
         ORDER BY cc.POSITION",
        escape_literal(schema),
        escape_literal(table)
    )
}

/// Identity columns. The view is missing on older DM releases.
pub fn identity_sql(schema: &str, table: &str) -> String {
    format!(
        "SELECT COLUMN_NAME FROM ALL_TAB_IDENTITY_COLS \
         WHERE OWNER = '{}' AND TABLE_NAME = '{}'",
        escape_literal(schema),
        escape_literal(table)
    )
}

/// Data query selecting `columns` explicitly so value order matches the
/// column list.
pub fn select_rows_sql(schema: &str, table: &str, columns: &[ColumnDefinition]) -> String {
    let cols: Vec<String> = columns.iter().map(|c| quote_ident(&c.name)).collect();
    format!(
        "SELECT {} FROM {}.{}",
        cols.join(", "),
        quote_ident(schema),
        quote_ident(table)
    )
}

/// Parse one row of [`columns_sql`].
pub fn parse_column_row(row: &[Option<String>]) -> Option<ColumnDefinition> {
    let text = |i: usize| row.get(i).and_then(|v| v.as_deref()).map(str::trim);
    let int = |i: usize| text(i).and_then(|s| s.parse::<i64>().ok()).unwrap_or(0);

    let name = text(0).filter(|s| !s.is_empty())?;
    Some(ColumnDefinition {
        name: name.to_string(),
        data_type: text(1).unwrap_or_default().to_string(),
        max_length: int(2),
        precision: int(3) as i32,
        scale: int(4) as i32,
        is_nullable: text(5).map(|s| s.eq_ignore_ascii_case("Y")).unwrap_or(true),
        ordinal_pos: int(6) as i32,
        is_primary_key: false,
        is_identity: false,
    })
}

/// Set primary-key and identity flags by column name.
pub fn merge_key_flags(columns: &mut [ColumnDefinition], primary_key: &[String], identity: &[String]) {
    let pk: HashSet<&str> = primary_key.iter().map(String::as_str).collect();
    let ident: HashSet<&str> = identity.iter().map(String::as_str).collect();
    for col in columns.iter_mut() {
        col.is_primary_key = pk.contains(col.name.as_str());
        col.is_identity = ident.contains(col.name.as_str());
    }
}

/// Assemble a table's columns from the catalog results.
///
/// No columns is a discovery error. A failed identity lookup is logged and
/// treated as no identity columns.
pub fn build_columns(
    table: &str,
    rows: &[Vec<Option<String>>],
    primary_key: &[String],
    identity: Result<Vec<String>>,
) -> Result<Vec<ColumnDefinition>> {
    let mut columns: Vec<ColumnDefinition> = rows.iter().filter_map(|r| parse_column_row(r)).collect();
    if columns.is_empty() {
        return Err(MigrateError::discovery(table, format!("no columns found for {}", table)));
    }

    let identity = identity.unwrap_or_else(|e| {
        warn!("Identity lookup failed for {}, assuming none: {}", table, e);
        Vec::new()
    });
    merge_key_flags(&mut columns, primary_key, &identity);
    Ok(columns)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(values: &[Option<&str>]) -> Vec<Option<String>> {
        values.iter().map(|v| v.map(str::to_string)).collect()
    }

    #[test]
    fn test_literals_and_identifiers_escaped() {
        assert_eq!(escape_literal("O'Brien"), "O''Brien");
        assert_eq!(quote_ident("ORDERS"), "\"ORDERS\"");
        assert_eq!(quote_ident("a\"b"), "\"a\"\"b\"");
    }

    #[test]
    fn test_catalog_queries_filter_owner_and_table() {
        let sql = columns_sql("SALES", "ORDERS");
        assert!(sql.contains("OWNER = 'SALES'"));
        assert!(sql.contains("TABLE_NAME = 'ORDERS'"));
        assert!(sql.ends_with("ORDER BY COLUMN_ID"));
        assert!(primary_key_sql("SALES", "ORDERS").contains("CONSTRAINT_TYPE = 'P'"));
        assert!(list_tables_sql("SALES").contains("TABLESPACE_NAME <> 'SYSTEM'"));
        assert!(identity_sql("SALES", "O'X").contains("'O''X'"));
    }

    #[test]
    fn test_select_rows_lists_columns_in_order() {
        let cols = vec![
            ColumnDefinition::new("ID", "INT", 1),
            ColumnDefinition::new("NAME", "VARCHAR", 2),
        ];
        assert_eq!(
            select_rows_sql("SALES", "ORDERS", &cols),
            "SELECT \"ID\", \"NAME\" FROM \"SALES\".\"ORDERS\""
        );
    }

    #[test]
    fn test_parse_column_row() {
        let col = parse_column_row(&row(&[
            Some("AMOUNT"),
            Some("NUMBER"),
            Some("22"),
            Some("10"),
            Some("2"),
            Some("N"),
            Some("3"),
        ]))
        .unwrap();
        assert_eq!(col.name, "AMOUNT");
        assert_eq!(col.data_type, "NUMBER");
        assert_eq!(col.max_length, 22);
        assert_eq!((col.precision, col.scale), (10, 2));
        assert!(!col.is_nullable);
        assert_eq!(col.ordinal_pos, 3);
    }

    #[test]
    fn test_parse_column_row_null_precision() {
        let col = parse_column_row(&row(&[
            Some("NOTE"),
            Some("CLOB"),
            Some("0"),
            None,
            None,
            Some("Y"),
            Some("1"),
        ]))
        .unwrap();
        assert_eq!((col.precision, col.scale), (0, 0));
        assert!(col.is_nullable);
    }

    #[test]
    fn test_parse_column_row_without_name() {
        assert!(parse_column_row(&row(&[None, Some("INT")])).is_none());
    }

    #[test]
    fn test_merge_key_flags() {
        let mut cols = vec![
            ColumnDefinition::new("ID", "INT", 1),
            ColumnDefinition::new("CODE", "VARCHAR", 2),
            ColumnDefinition::new("NAME", "VARCHAR", 3),
        ];
        merge_key_flags(&mut cols, &["ID".into(), "CODE".into()], &["ID".into()]);
        assert!(cols[0].is_primary_key && cols[0].is_identity);
        assert!(cols[1].is_primary_key && !cols[1].is_identity);
        assert!(!cols[2].is_primary_key && !cols[2].is_identity);
    }

    fn id_and_name() -> Vec<Vec<Option<String>>> {
        vec![
            row(&[Some("ID"), Some("INT"), Some("4"), Some("10"), Some("0"), Some("N"), Some("1")]),
            row(&[Some("NAME"), Some("VARCHAR"), Some("50"), None, None, Some("Y"), Some("2")]),
        ]
    }

    #[test]
    fn test_build_columns_merges_keys() {
        let cols = build_columns("ORDERS", &id_and_name(), &["ID".into()], Ok(vec!["ID".into()])).unwrap();
        assert_eq!(cols.len(), 2);
        assert!(cols[0].is_primary_key && cols[0].is_identity);
        assert!(!cols[1].is_primary_key && !cols[1].is_identity);
    }

    #[test]
    fn test_build_columns_without_columns_fails() {
        let err = build_columns("GHOST", &[], &[], Ok(Vec::new())).unwrap_err();
        assert!(matches!(err, MigrateError::SchemaDiscovery { .. }));
        assert!(err.to_string().contains("GHOST"));

        // Rows without a column name do not count.
        let unnamed = vec![row(&[None, Some("INT")])];
        assert!(build_columns("GHOST", &unnamed, &[], Ok(Vec::new())).is_err());
    }

    #[test]
    fn test_build_columns_tolerates_missing_identity_view() {
        let identity = Err(MigrateError::Source("invalid table or view name".into()));
        let cols = build_columns("ORDERS", &id_and_name(), &["ID".into()], identity).unwrap();
        assert_eq!(cols.len(), 2);
        assert!(cols[0].is_primary_key);
        assert!(cols.iter().all(|c| !c.is_identity));
    }
}
