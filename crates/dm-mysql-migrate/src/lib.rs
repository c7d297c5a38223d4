//! # dm-mysql-migrate
//!
//! Table migration from DM (Dameng) to MySQL.
//!
//! This library copies the schema and contents of a fixed list of tables:
//!
//! - **Schema introspection** through DM's catalog views, with
//!   case-insensitive table name resolution
//! - **Type mapping** from DM column types to MySQL 5 or 8 types
//! - **Batched inserts** sized to MySQL's placeholder limit, with retry of
//!   transient connection failures
//! - **Parallel workers** with a per-table deadline and isolated failures
//!
//! The DM reader needs unixODBC and is behind the `dm` feature.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use dm_mysql_migrate::{Config, DmReader, MysqlWriter, Orchestrator, TablesConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> dm_mysql_migrate::Result<()> {
//!     let config = Config::load("config.yaml")?;
//!     config.validate()?;
//!     let tables = TablesConfig::load(&config.migration.tables_config)?;
//!     let source = Arc::new(DmReader::new(&config.source).await?);
//!     let target = Arc::new(MysqlWriter::new(&config.target).await?);
//!     let orchestrator = Orchestrator::new(config, source, target);
//!     let result = orchestrator.run(tables.tables, CancellationToken::new()).await?;
//!     println!("Migrated {} rows", result.rows_transferred);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod core;
pub mod drivers;
pub mod error;
pub mod orchestrator;
pub mod state;
pub mod transfer;
pub mod typemap;

// Re-exports for convenient access
pub use config::{Config, MigrationConfig, MysqlVersion, SourceConfig, TablesConfig, TargetConfig};
pub use crate::core::{ColumnDefinition, SchemaIntrospector, SqlValue, TargetWriter};
#[cfg(feature = "dm")]
pub use drivers::dm::DmReader;
pub use drivers::mysql::MysqlWriter;
pub use error::{MigrateError, Result};
pub use orchestrator::{health_check, HealthCheckResult, MigrationResult, Orchestrator, TableOutcome};
pub use state::{StatusBoard, TaskStatus};
pub use transfer::{TransferConfig, TransferEngine};
pub use typemap::{DmToMysqlMapper, MappedColumn};
