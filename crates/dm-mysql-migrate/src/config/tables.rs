//! JSON table list.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{MigrateError, Result};

/// Ordered list of tables to migrate, as typed by the operator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TablesConfig {
    pub tables: Vec<String>,
}

impl TablesConfig {
    /// Load a `{"tables": [...]}` document.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| MigrateError::TableList {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_json(&content).map_err(|e| MigrateError::TableList {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Parse the JSON form. Blank names and exact duplicates are dropped.
    pub fn from_json(json: &str) -> std::result::Result<Self, serde_json::Error> {
        let raw: TablesConfig = serde_json::from_str(json)?;
        Ok(raw.deduplicated())
    }

    fn deduplicated(self) -> Self {
        let mut seen = HashSet::new();
        let mut tables = Vec::with_capacity(self.tables.len());
        for name in self.tables {
            let name = name.trim().to_string();
            if name.is_empty() {
                warn!("Ignoring blank table name in table list");
                continue;
            }
            if !seen.insert(name.clone()) {
                warn!("Table {} listed more than once, migrating it once", name);
                continue;
            }
            tables.push(name);
        }
        Self { tables }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_preserves_order() {
        let cfg = TablesConfig::from_json(r#"{"tables": ["Orders", "CUSTOMERS", "items"]}"#).unwrap();
        assert_eq!(cfg.tables, vec!["Orders", "CUSTOMERS", "items"]);
    }

    #[test]
    fn test_duplicates_and_blanks_dropped() {
        let cfg = TablesConfig::from_json(r#"{"tables": ["a", "b", "a", " ", "b "]}"#).unwrap();
        assert_eq!(cfg.tables, vec!["a", "b"]);
    }

    #[test]
    fn test_empty_list_is_valid() {
        let cfg = TablesConfig::from_json(r#"{"tables": []}"#).unwrap();
        assert!(cfg.tables.is_empty());
    }

    #[test]
    fn test_missing_file_is_table_list_error() {
        let err = TablesConfig::load("/nonexistent/tables.json").unwrap_err();
        assert!(matches!(err, MigrateError::TableList { .. }));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_malformed_file_is_table_list_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"{\"tables\": \"orders\"}").unwrap();
        let err = TablesConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, MigrateError::TableList { .. }));
    }
}
