//! Configuration loading and validation.

mod tables;
mod types;
mod validation;

pub use tables::TablesConfig;
pub use types::*;

use crate::error::Result;
use std::path::Path;

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    ///
    /// Not validated here: the CLI layers flag overrides on top first.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }
}

impl SourceConfig {
    /// Build an ODBC connection string for the DM driver.
    pub fn connection_string(&self) -> String {
        let mut conn = format!(
            "Driver={{{}}};Server={};TCP_Port={};UID={};PWD={};",
            self.driver, self.host, self.port, self.user, self.password
        );
        if let Some(extra) = self.extra.as_deref().map(str::trim).filter(|e| !e.is_empty()) {
            conn.push_str(extra.trim_start_matches(';'));
            if !conn.ends_with(';') {
                conn.push(';');
            }
        }
        conn
    }

    /// Connection target for log lines, without credentials.
    pub fn describe(&self) -> String {
        format!("dm://{}@{}:{}/{}", self.user, self.host, self.port, self.schema)
    }
}

impl TargetConfig {
    /// Connection target for log lines, without credentials.
    pub fn describe(&self) -> String {
        format!(
            "mysql://{}@{}:{}/{} (v{})",
            self.user, self.host, self.port, self.database, self.version
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_yaml_applies_defaults() {
        let yaml = r#"
source:
  user: SYSDBA
  password: secret
  schema: SALES
target:
  password: secret
  database: sales
  version: 8
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.source.host, "127.0.0.1");
        assert_eq!(config.source.port, 5236);
        assert_eq!(config.target.port, 3306);
        assert_eq!(config.target.user, "root");
        assert_eq!(config.target.version, MysqlVersion::V8);
        assert_eq!(config.migration.workers, 4);
        assert_eq!(config.migration.batch_size, 2000);
        assert_eq!(config.migration.max_placeholders, 60_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_mysql_version_parsing() {
        assert_eq!(MysqlVersion::try_from(5).unwrap(), MysqlVersion::V5);
        assert_eq!(MysqlVersion::try_from(7).unwrap(), MysqlVersion::V5);
        assert_eq!(MysqlVersion::try_from(8).unwrap(), MysqlVersion::V8);
        assert_eq!(MysqlVersion::try_from(9).unwrap(), MysqlVersion::V8);
        assert!(MysqlVersion::try_from(4).is_err());
    }

    #[test]
    fn test_bad_version_in_yaml() {
        let yaml = "source: {}\ntarget:\n  version: 3\n";
        assert!(Config::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            "source:\n  user: u\n  password: p\n  schema: S\ntarget:\n  password: p\n  database: d\nmigration:\n  workers: 8\n",
        )
        .unwrap();
        let config = Config::load(&path).unwrap();
        assert_eq!(config.migration.workers, 8);
    }

    #[test]
    fn test_dm_connection_string() {
        let source = SourceConfig {
            host: "10.0.0.7".into(),
            user: "SYSDBA".into(),
            password: "pw".into(),
            schema: "SALES".into(),
            extra: Some("LOGIN_ENCRYPT=0".into()),
            ..SourceConfig::default()
        };
        assert_eq!(
            source.connection_string(),
            "Driver={DM8 ODBC DRIVER};Server=10.0.0.7;TCP_Port=5236;UID=SYSDBA;PWD=pw;LOGIN_ENCRYPT=0;"
        );
        assert!(!source.describe().contains("pw"));
    }

    #[test]
    fn test_dm_connection_string_without_extra() {
        let source = SourceConfig {
            user: "u".into(),
            password: "p".into(),
            extra: Some("   ".into()),
            ..SourceConfig::default()
        };
        assert!(source.connection_string().ends_with("PWD=p;"));
    }
}
