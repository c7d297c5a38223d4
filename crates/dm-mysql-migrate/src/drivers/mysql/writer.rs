//! MySQL target writer implementation.
//!
//! Implements the `TargetWriter` trait with a mysql_async pool and
//! multi-row parameterized INSERT statements.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use mysql_async::prelude::*;
use mysql_async::{Conn, Opts, OptsBuilder, Pool, PoolConstraints, PoolOpts};
use tracing::{debug, info, warn};

use super::ddl::{create_table_sql, drop_table_sql};
use crate::config::{MysqlVersion, TargetConfig};
use crate::core::traits::TargetWriter;
use crate::core::value::{to_mysql_value, SqlValue};
use crate::error::{MigrateError, Result};
use crate::typemap::MappedColumn;

const DISABLE_CHECKS_SQL: &str = "SET FOREIGN_KEY_CHECKS = 0, UNIQUE_CHECKS = 0";
const ENABLE_CHECKS_SQL: &str = "SET FOREIGN_KEY_CHECKS = 1, UNIQUE_CHECKS = 1";

/// MySQL target writer using mysql_async.
pub struct MysqlWriter {
    pool: Pool,
    version: MysqlVersion,
    statement_timeout: Duration,
    /// FK and unique checks are session variables and the pool resets
    /// sessions on return, so every checkout re-applies them while set.
    checks_disabled: AtomicBool,
}

impl MysqlWriter {
    /// Create the pool and verify it with a round-trip.
    pub async fn new(config: &TargetConfig) -> Result<Self> {
        let opts = build_opts(config)?;
        let pool = Pool::new(opts);

        let mut conn = pool
            .get_conn()
            .await
            .map_err(|e| MigrateError::connection(e, "creating MySQL target pool"))?;
        conn.query_drop("SELECT 1")
            .await
            .map_err(|e| MigrateError::connection(e, "testing MySQL target connection"))?;
        drop(conn);

        info!("Connected to MySQL target: {}", config.describe());

        Ok(Self {
            pool,
            version: config.version,
            statement_timeout: config.statement_timeout(),
            checks_disabled: AtomicBool::new(false),
        })
    }

    /// Close all pooled connections.
    pub async fn disconnect(&self) -> Result<()> {
        self.pool.clone().disconnect().await?;
        Ok(())
    }

    async fn conn(&self) -> Result<Conn> {
        let mut conn = self.pool.get_conn().await?;
        if self.checks_disabled.load(Ordering::Acquire) {
            self.bounded(conn.query_drop(DISABLE_CHECKS_SQL)).await?;
        }
        Ok(conn)
    }

    /// Run a driver future under the statement timeout.
    async fn bounded<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, mysql_async::Error>>,
    {
        match tokio::time::timeout(self.statement_timeout, fut).await {
            Ok(result) => result.map_err(MigrateError::from),
            Err(_) => Err(MigrateError::target(format!(
                "statement timed out after {}s",
                self.statement_timeout.as_secs()
            ))),
        }
    }
}

/// Translate target settings into mysql_async options.
fn build_opts(config: &TargetConfig) -> Result<Opts> {
    let builder = match config.extra.as_deref().map(str::trim).filter(|e| !e.is_empty()) {
        Some(extra) => {
            let url = format!("mysql://localhost/?{}", extra.trim_start_matches('?'));
            let parsed = Opts::from_url(&url)
                .map_err(|e| MigrateError::Config(format!("invalid target.extra '{}': {}", extra, e)))?;
            OptsBuilder::from_opts(parsed)
        }
        None => OptsBuilder::default(),
    };

    let idle = config.max_idle.min(config.max_open);
    let constraints = PoolConstraints::new(idle, config.max_open).ok_or_else(|| {
        MigrateError::Config(format!(
            "invalid pool size: max_idle={} max_open={}",
            config.max_idle, config.max_open
        ))
    })?;
    let pool_opts = PoolOpts::new()
        .with_constraints(constraints)
        .with_abs_conn_ttl(Some(config.max_lifetime()));

    let builder = builder
        .ip_or_hostname(config.host.as_str())
        .tcp_port(config.port)
        .db_name(Some(config.database.as_str()))
        .user(Some(config.user.as_str()))
        .pass(Some(config.password.as_str()))
        .init(vec![format!("SET NAMES {}", config.version.charset())])
        .pool_opts(pool_opts);

    Ok(builder.into())
}

#[async_trait]
impl TargetWriter for MysqlWriter {
    async fn disable_constraints(&self) -> Result<()> {
        self.checks_disabled.store(true, Ordering::Release);
        // Checkout applies the SET; this also surfaces missing privileges early.
        let _conn = self.conn().await?;
        info!("Disabled foreign key and unique checks on target");
        Ok(())
    }

    async fn enable_constraints(&self) -> Result<()> {
        self.checks_disabled.store(false, Ordering::Release);
        let mut conn = self.conn().await?;
        self.bounded(conn.query_drop(ENABLE_CHECKS_SQL)).await?;
        info!("Re-enabled foreign key and unique checks on target");
        Ok(())
    }

    async fn create_table(&self, table: &str, columns: &[MappedColumn]) -> Result<()> {
        let drop_sql = drop_table_sql(table);
        let ddl = create_table_sql(table, columns, self.version);

        if columns.is_empty() {
            return Err(MigrateError::SchemaWrite {
                table: table.to_string(),
                ddl,
                message: "no columns to create".into(),
            });
        }

        for col in columns {
            if let Some(warning) = &col.warning {
                warn!("{}.{}: {}", table, col.name, warning);
            }
        }

        let schema_write = |sql: &str, e: MigrateError| MigrateError::SchemaWrite {
            table: table.to_string(),
            ddl: sql.to_string(),
            message: e.to_string(),
        };

        let mut conn = self.conn().await.map_err(|e| schema_write(&drop_sql, e))?;
        self.bounded(conn.query_drop(&drop_sql))
            .await
            .map_err(|e| schema_write(&drop_sql, e))?;
        self.bounded(conn.query_drop(&ddl))
            .await
            .map_err(|e| schema_write(&ddl, e))?;

        debug!("Created table {}: {}", table, ddl);
        Ok(())
    }

    async fn execute_insert(&self, sql: &str, values: &[SqlValue<'static>]) -> Result<u64> {
        let params: Vec<mysql_async::Value> = values.iter().map(to_mysql_value).collect();
        let mut conn = self.conn().await?;
        self.bounded(conn.exec_drop(sql, params)).await?;
        Ok(conn.affected_rows())
    }

    async fn test_connection(&self) -> Result<()> {
        let mut conn = self.conn().await?;
        self.bounded(conn.query_drop("SELECT 1")).await
    }
}
