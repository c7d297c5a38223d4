//! Configuration type definitions.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Source database configuration (DM).
    pub source: SourceConfig,

    /// Target database configuration (MySQL).
    pub target: TargetConfig,

    /// Migration behavior configuration.
    #[serde(default)]
    pub migration: MigrationConfig,
}

/// Source database (DM) configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Database host.
    #[serde(default = "default_localhost")]
    pub host: String,

    /// Database port (default: 5236).
    #[serde(default = "default_dm_port")]
    pub port: u16,

    /// Username.
    #[serde(default)]
    pub user: String,

    /// Password.
    #[serde(default)]
    pub password: String,

    /// Schema holding the tables to migrate.
    #[serde(default)]
    pub schema: String,

    /// Extra ODBC attributes appended to the connection string, `;` separated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<String>,

    /// Installed ODBC driver name.
    #[serde(default = "default_dm_driver")]
    pub driver: String,

    /// Maximum concurrent source connections (default: 10).
    #[serde(default = "default_source_connections")]
    pub max_connections: usize,
}

impl fmt::Debug for SourceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("schema", &self.schema)
            .field("extra", &self.extra)
            .field("driver", &self.driver)
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            host: default_localhost(),
            port: default_dm_port(),
            user: String::new(),
            password: String::new(),
            schema: String::new(),
            extra: None,
            driver: default_dm_driver(),
            max_connections: default_source_connections(),
        }
    }
}

/// Target MySQL server generation. Drives charset, row format and
/// fractional-second support in generated DDL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum MysqlVersion {
    /// MySQL 5.0 - 5.7.
    #[default]
    V5,
    /// MySQL 8.0 and later.
    V8,
}

impl MysqlVersion {
    /// Connection character set.
    pub fn charset(self) -> &'static str {
        match self {
            MysqlVersion::V5 => "utf8",
            MysqlVersion::V8 => "utf8mb4",
        }
    }

    /// Whether DATETIME columns may carry fractional seconds.
    pub fn supports_fractional_seconds(self) -> bool {
        matches!(self, MysqlVersion::V8)
    }

    /// Table options appended after the column list.
    pub fn table_options(self) -> &'static str {
        match self {
            MysqlVersion::V5 => "ENGINE=InnoDB DEFAULT CHARSET=utf8",
            MysqlVersion::V8 => "ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 ROW_FORMAT=DYNAMIC",
        }
    }
}

impl TryFrom<u32> for MysqlVersion {
    type Error = String;

    fn try_from(major: u32) -> std::result::Result<Self, Self::Error> {
        match major {
            5..=7 => Ok(MysqlVersion::V5),
            n if n >= 8 => Ok(MysqlVersion::V8),
            n => Err(format!("unsupported MySQL major version {n}, expected 5 or 8")),
        }
    }
}

impl From<MysqlVersion> for u32 {
    fn from(version: MysqlVersion) -> u32 {
        match version {
            MysqlVersion::V5 => 5,
            MysqlVersion::V8 => 8,
        }
    }
}

impl fmt::Display for MysqlVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", u32::from(*self))
    }
}

/// Target database (MySQL) configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Database host.
    #[serde(default = "default_localhost")]
    pub host: String,

    /// Database port (default: 3306).
    #[serde(default = "default_mysql_port")]
    pub port: u16,

    /// Username (default: root).
    #[serde(default = "default_mysql_user")]
    pub user: String,

    /// Password.
    #[serde(default)]
    pub password: String,

    /// Database name.
    #[serde(default)]
    pub database: String,

    /// Server generation (5 or 8).
    #[serde(default)]
    pub version: MysqlVersion,

    /// Extra connection options in URL query form (`a=1&b=2`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<String>,

    /// Maximum open connections (default: 20).
    #[serde(default = "default_max_open")]
    pub max_open: usize,

    /// Connections kept idle in the pool (default: 10).
    #[serde(default = "default_max_idle")]
    pub max_idle: usize,

    /// Absolute connection lifetime in seconds (default: 600).
    #[serde(default = "default_max_lifetime")]
    pub max_lifetime_secs: u64,

    /// Timeout for DDL and session statements in seconds (default: 30).
    #[serde(default = "default_statement_timeout")]
    pub statement_timeout_secs: u64,
}

impl fmt::Debug for TargetConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("database", &self.database)
            .field("version", &self.version)
            .field("extra", &self.extra)
            .field("max_open", &self.max_open)
            .field("max_idle", &self.max_idle)
            .field("max_lifetime_secs", &self.max_lifetime_secs)
            .field("statement_timeout_secs", &self.statement_timeout_secs)
            .finish()
    }
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            host: default_localhost(),
            port: default_mysql_port(),
            user: default_mysql_user(),
            password: String::new(),
            database: String::new(),
            version: MysqlVersion::default(),
            extra: None,
            max_open: default_max_open(),
            max_idle: default_max_idle(),
            max_lifetime_secs: default_max_lifetime(),
            statement_timeout_secs: default_statement_timeout(),
        }
    }
}

impl TargetConfig {
    pub fn max_lifetime(&self) -> Duration {
        Duration::from_secs(self.max_lifetime_secs)
    }

    pub fn statement_timeout(&self) -> Duration {
        Duration::from_secs(self.statement_timeout_secs)
    }
}

/// Migration behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationConfig {
    /// Number of parallel table workers (default: 4).
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Requested rows per insert batch (default: 2000). May be lowered to
    /// stay inside the placeholder budget.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Path of the JSON table list.
    #[serde(default = "default_tables_config")]
    pub tables_config: PathBuf,

    /// Wall-clock deadline for one table job in seconds (default: 1800).
    #[serde(default = "default_table_timeout")]
    pub table_timeout_secs: u64,

    /// Deadline for one batch flush, retries included, in seconds (default: 60).
    #[serde(default = "default_batch_timeout")]
    pub batch_timeout_secs: u64,

    /// Interval between progress reports in seconds (default: 30).
    #[serde(default = "default_progress_interval")]
    pub progress_interval_secs: u64,

    /// Bound parameters allowed in one insert statement (default: 60000).
    #[serde(default = "default_max_placeholders")]
    pub max_placeholders: usize,

    /// Attempts per batch for transient failures (default: 3).
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Backoff unit in milliseconds; attempt `n` waits `n` units (default: 1000).
    #[serde(default = "default_retry_backoff")]
    pub retry_backoff_ms: u64,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            batch_size: default_batch_size(),
            tables_config: default_tables_config(),
            table_timeout_secs: default_table_timeout(),
            batch_timeout_secs: default_batch_timeout(),
            progress_interval_secs: default_progress_interval(),
            max_placeholders: default_max_placeholders(),
            retry_attempts: default_retry_attempts(),
            retry_backoff_ms: default_retry_backoff(),
        }
    }
}

impl MigrationConfig {
    pub fn table_timeout(&self) -> Duration {
        Duration::from_secs(self.table_timeout_secs)
    }

    pub fn batch_timeout(&self) -> Duration {
        Duration::from_secs(self.batch_timeout_secs)
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_secs(self.progress_interval_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

// Default value functions for serde
fn default_localhost() -> String {
    "127.0.0.1".to_string()
}

fn default_dm_port() -> u16 {
    5236
}

fn default_dm_driver() -> String {
    "DM8 ODBC DRIVER".to_string()
}

fn default_source_connections() -> usize {
    10
}

fn default_mysql_port() -> u16 {
    3306
}

fn default_mysql_user() -> String {
    "root".to_string()
}

fn default_max_open() -> usize {
    20
}

fn default_max_idle() -> usize {
    10
}

fn default_max_lifetime() -> u64 {
    600
}

fn default_statement_timeout() -> u64 {
    30
}

fn default_workers() -> usize {
    4
}

fn default_batch_size() -> usize {
    2000
}

fn default_tables_config() -> PathBuf {
    PathBuf::from("./config/tables.json")
}

fn default_table_timeout() -> u64 {
    30 * 60
}

fn default_batch_timeout() -> u64 {
    60
}

fn default_progress_interval() -> u64 {
    30
}

fn default_max_placeholders() -> usize {
    60_000
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_backoff() -> u64 {
    1000
}
