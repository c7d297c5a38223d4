//! Column metadata types.

use serde::{Deserialize, Serialize};

/// One source column as read from the catalog.
///
/// Immutable once read. `ordinal_pos` order is the order of the destination
/// columns and of the values in every row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    /// Column name as stored in the source.
    pub name: String,

    /// Raw source type keyword (e.g. `NUMBER`, `VARCHAR2`, `TIMESTAMP(6)`).
    pub data_type: String,

    /// Declared byte length.
    pub max_length: i64,

    /// Numeric precision, 0 when unspecified.
    pub precision: i32,

    /// Numeric scale, 0 when unspecified.
    pub scale: i32,

    /// Whether the column accepts NULL.
    pub is_nullable: bool,

    /// 1-based ordinal position.
    pub ordinal_pos: i32,

    /// Member of the primary key.
    pub is_primary_key: bool,

    /// Value assigned by the engine on insert.
    pub is_identity: bool,
}

impl ColumnDefinition {
    /// A nullable, non-key column. Mostly for building fixtures.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>, ordinal_pos: i32) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            max_length: 0,
            precision: 0,
            scale: 0,
            is_nullable: true,
            ordinal_pos,
            is_primary_key: false,
            is_identity: false,
        }
    }
}

/// Names of the primary-key columns in column order.
pub fn primary_key_columns(columns: &[ColumnDefinition]) -> Vec<&str> {
    columns
        .iter()
        .filter(|c| c.is_primary_key)
        .map(|c| c.name.as_str())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_key_columns_keep_column_order() {
        let mut region = ColumnDefinition::new("REGION", "VARCHAR", 1);
        region.is_primary_key = true;
        let name = ColumnDefinition::new("NAME", "VARCHAR", 2);
        let mut id = ColumnDefinition::new("ID", "INT", 3);
        id.is_primary_key = true;

        assert_eq!(primary_key_columns(&[region, name, id]), vec!["REGION", "ID"]);
    }

    #[test]
    fn test_no_primary_key_is_empty() {
        let cols = vec![ColumnDefinition::new("A", "INT", 1)];
        assert!(primary_key_columns(&cols).is_empty());
    }
}
