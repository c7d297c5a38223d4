//! MySQL statement text.

use crate::config::MysqlVersion;
use crate::typemap::MappedColumn;

/// Quote a MySQL identifier.
pub fn quote_ident(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

pub fn drop_table_sql(table: &str) -> String {
    format!("DROP TABLE IF EXISTS {}", quote_ident(table))
}

/// CREATE TABLE for mapped columns, with a single primary key over every
/// flagged column in column order.
pub fn create_table_sql(table: &str, columns: &[MappedColumn], version: MysqlVersion) -> String {
    let mut defs: Vec<String> = columns
        .iter()
        .map(|c| {
            let mut def = format!(
                "{} {} {}",
                quote_ident(&c.name),
                c.target_type,
                if c.is_nullable { "NULL" } else { "NOT NULL" }
            );
            if c.is_auto_increment {
                def.push_str(" AUTO_INCREMENT");
            }
            def
        })
        .collect();

    let pk: Vec<String> = columns
        .iter()
        .filter(|c| c.is_primary_key)
        .map(|c| quote_ident(&c.name))
        .collect();
    if !pk.is_empty() {
        defs.push(format!("PRIMARY KEY ({})", pk.join(", ")));
    }

    format!(
        "CREATE TABLE {} (\n    {}\n) {}",
        quote_ident(table),
        defs.join(",\n    "),
        version.table_options()
    )
}

/// `INSERT INTO `t` (`a`, `b`) VALUES ` without any row groups.
pub fn insert_prefix(table: &str, columns: &[&str]) -> String {
    let cols: Vec<String> = columns.iter().map(|c| quote_ident(c)).collect();
    format!("INSERT INTO {} ({}) VALUES ", quote_ident(table), cols.join(", "))
}

/// One `(?, ?, ?)` group.
pub fn row_placeholders(column_count: usize) -> String {
    format!("({})", vec!["?"; column_count].join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn col(name: &str, ty: &str, nullable: bool, pk: bool, ai: bool) -> MappedColumn {
        MappedColumn {
            name: name.to_string(),
            target_type: ty.to_string(),
            is_nullable: nullable,
            is_primary_key: pk,
            is_auto_increment: ai,
            warning: None,
        }
    }

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("name"), "`name`");
        assert_eq!(quote_ident("table`name"), "`table``name`");
    }

    #[test]
    fn test_drop_table() {
        assert_eq!(drop_table_sql("Orders"), "DROP TABLE IF EXISTS `Orders`");
    }

    #[test]
    fn test_create_table_v8() {
        let cols = vec![
            col("ID", "BIGINT", false, true, true),
            col("NAME", "VARCHAR(100)", true, false, false),
        ];
        let ddl = create_table_sql("orders", &cols, MysqlVersion::V8);
        assert_eq!(
            ddl,
            "CREATE TABLE `orders` (\n    `ID` BIGINT NOT NULL AUTO_INCREMENT,\n    `NAME` VARCHAR(100) NULL,\n    PRIMARY KEY (`ID`)\n) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 ROW_FORMAT=DYNAMIC"
        );
    }

    #[test]
    fn test_create_table_v5_without_pk() {
        let cols = vec![col("NOTE", "LONGTEXT", true, false, false)];
        let ddl = create_table_sql("log", &cols, MysqlVersion::V5);
        assert!(!ddl.contains("PRIMARY KEY"));
        assert!(ddl.ends_with(") ENGINE=InnoDB DEFAULT CHARSET=utf8"));
    }

    #[test]
    fn test_composite_primary_key_keeps_column_order() {
        let cols = vec![
            col("REGION", "VARCHAR(10)", false, true, false),
            col("AMOUNT", "DECIMAL(10,2)", true, false, false),
            col("ID", "INT", false, true, false),
        ];
        let ddl = create_table_sql("sales", &cols, MysqlVersion::V8);
        assert_eq!(ddl.matches("PRIMARY KEY").count(), 1);
        assert!(ddl.contains("PRIMARY KEY (`REGION`, `ID`)"));
    }

    #[test]
    fn test_insert_text() {
        assert_eq!(
            insert_prefix("orders", &["ID", "NAME"]),
            "INSERT INTO `orders` (`ID`, `NAME`) VALUES "
        );
        assert_eq!(row_placeholders(3), "(?, ?, ?)");
    }
}
