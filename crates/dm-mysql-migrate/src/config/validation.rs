//! Configuration validation.

use super::Config;
use crate::error::{MigrateError, Result};

/// MySQL rejects statements with more bound parameters than this.
const MYSQL_PLACEHOLDER_CEILING: usize = 65_535;

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    // Source validation
    let mut missing = Vec::new();
    if config.source.user.is_empty() {
        missing.push("source.user");
    }
    if config.source.password.is_empty() {
        missing.push("source.password");
    }
    if config.source.schema.is_empty() {
        missing.push("source.schema");
    }
    if !missing.is_empty() {
        return Err(MigrateError::Config(format!(
            "DM parameters missing: {}",
            missing.join(", ")
        )));
    }
    if config.source.host.is_empty() {
        return Err(MigrateError::Config("source.host is required".into()));
    }
    if config.source.max_connections == 0 {
        return Err(MigrateError::Config(
            "source.max_connections must be at least 1".into(),
        ));
    }

    // Target validation
    if config.target.user.is_empty() {
        missing.push("target.user");
    }
    if config.target.password.is_empty() {
        missing.push("target.password");
    }
    if config.target.database.is_empty() {
        missing.push("target.database");
    }
    if !missing.is_empty() {
        return Err(MigrateError::Config(format!(
            "MySQL parameters missing: {}",
            missing.join(", ")
        )));
    }
    if config.target.host.is_empty() {
        return Err(MigrateError::Config("target.host is required".into()));
    }
    if config.target.max_open == 0 {
        return Err(MigrateError::Config(
            "target.max_open must be at least 1".into(),
        ));
    }
    if config.target.max_idle > config.target.max_open {
        return Err(MigrateError::Config(format!(
            "target.max_idle ({}) cannot exceed target.max_open ({})",
            config.target.max_idle, config.target.max_open
        )));
    }
    if config.target.statement_timeout_secs == 0 {
        return Err(MigrateError::Config(
            "target.statement_timeout_secs must be at least 1".into(),
        ));
    }

    // Migration config validation
    let migration = &config.migration;
    if migration.workers == 0 {
        return Err(MigrateError::Config(
            "migration.workers must be at least 1".into(),
        ));
    }
    if migration.batch_size == 0 {
        return Err(MigrateError::Config(
            "migration.batch_size must be at least 1".into(),
        ));
    }
    if migration.table_timeout_secs == 0 || migration.batch_timeout_secs == 0 {
        return Err(MigrateError::Config(
            "migration timeouts must be at least 1 second".into(),
        ));
    }
    if migration.progress_interval_secs == 0 {
        return Err(MigrateError::Config(
            "migration.progress_interval_secs must be at least 1".into(),
        ));
    }
    if migration.retry_attempts == 0 {
        return Err(MigrateError::Config(
            "migration.retry_attempts must be at least 1".into(),
        ));
    }
    if migration.max_placeholders == 0 || migration.max_placeholders >= MYSQL_PLACEHOLDER_CEILING {
        return Err(MigrateError::Config(format!(
            "migration.max_placeholders must be between 1 and {}",
            MYSQL_PLACEHOLDER_CEILING - 1
        )));
    }

    Ok(())
}
