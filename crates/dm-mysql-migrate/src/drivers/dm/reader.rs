//! DM source reader over ODBC.
//!
//! odbc-api is blocking, so every catalog query and every data fetch runs
//! on the blocking pool. Data is streamed into a bounded channel one row at
//! a time; a semaphore caps how many fetches hold a source connection.

use std::sync::Arc;

use async_trait::async_trait;
use odbc_api::{buffers::TextRowSet, ConnectionOptions, Cursor, Environment, ResultSetMetadata};
use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, info};

use super::catalog::{
    build_columns, columns_sql, identity_sql, list_tables_sql, primary_key_sql, select_rows_sql,
};
use super::decode::{decode_text, fetch_buffer_size, ValueKind};
use super::names::TableNameMap;
use crate::config::SourceConfig;
use crate::core::traits::{produce_rows_blocking, Row, RowStream, SchemaIntrospector};
use crate::core::ColumnDefinition;
use crate::error::{MigrateError, Result};

/// Rows buffered between the fetch thread and the consumer.
const CHANNEL_CAPACITY: usize = 10_000;

struct Shared {
    env: Environment,
    connection_string: String,
}

impl Shared {
    fn connect(&self) -> Result<odbc_api::Connection<'_>> {
        self.env
            .connect_with_connection_string(&self.connection_string, ConnectionOptions::default())
            .map_err(|e| MigrateError::connection(e, "opening DM ODBC connection"))
    }

    /// Run `sql` and collect every row as text.
    fn execute_query(&self, sql: &str) -> Result<Vec<Vec<Option<String>>>> {
        let conn = self.connect()?;
        let mut rows = Vec::new();

        if let Some(mut cursor) = conn
            .execute(sql, ())
            .map_err(|e| MigrateError::Source(format!("query failed: {} - SQL: {}", e, sql)))?
        {
            let num_cols = cursor
                .num_result_cols()
                .map_err(|e| MigrateError::Source(format!("failed to get column count: {}", e)))?
                as usize;
            let mut buffers = TextRowSet::for_cursor(1000, &mut cursor, Some(4096))
                .map_err(|e| MigrateError::Source(format!("failed to create row buffer: {}", e)))?;
            let mut row_cursor = cursor
                .bind_buffer(&mut buffers)
                .map_err(|e| MigrateError::Source(format!("failed to bind buffer: {}", e)))?;

            while let Some(batch) = row_cursor
                .fetch_with_truncation_check(true)
                .map_err(|e| MigrateError::Source(format!("failed to fetch rows: {}", e)))?
            {
                for row_idx in 0..batch.num_rows() {
                    let row = (0..num_cols)
                        .map(|col_idx| {
                            batch
                                .at(col_idx, row_idx)
                                .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
                        })
                        .collect();
                    rows.push(row);
                }
            }
        }

        Ok(rows)
    }

    /// Fetch `sql` and push decoded rows into `tx` until the result set or
    /// the receiver runs out. A value longer than `max_str_len` fails the
    /// fetch.
    fn stream_rows(
        &self,
        sql: &str,
        kinds: &[ValueKind],
        (fetch_rows, max_str_len): (usize, usize),
        tx: &mpsc::Sender<Result<Row>>,
    ) -> Result<u64> {
        let conn = self.connect()?;
        let mut sent = 0u64;

        let Some(mut cursor) = conn
            .execute(sql, ())
            .map_err(|e| MigrateError::Source(format!("data query failed: {} - SQL: {}", e, sql)))?
        else {
            return Ok(0);
        };

        let mut buffers = TextRowSet::for_cursor(fetch_rows, &mut cursor, Some(max_str_len))
            .map_err(|e| MigrateError::Source(format!("failed to create row buffer: {}", e)))?;
        let mut row_cursor = cursor
            .bind_buffer(&mut buffers)
            .map_err(|e| MigrateError::Source(format!("failed to bind buffer: {}", e)))?;

        while let Some(batch) = row_cursor.fetch_with_truncation_check(true).map_err(|e| {
            MigrateError::Source(format!(
                "failed to fetch rows after {} (values are limited to {} characters): {}",
                sent, max_str_len, e
            ))
        })? {
            for row_idx in 0..batch.num_rows() {
                let row: Row = kinds
                    .iter()
                    .enumerate()
                    .map(|(col_idx, kind)| {
                        let text = batch.at(col_idx, row_idx).map(String::from_utf8_lossy);
                        decode_text(text.as_deref(), *kind)
                    })
                    .collect();
                if tx.blocking_send(Ok(row)).is_err() {
                    debug!("Row consumer went away after {} rows", sent);
                    return Ok(sent);
                }
                sent += 1;
            }
        }

        Ok(sent)
    }
}

/// DM source reached through its ODBC driver.
pub struct DmReader {
    shared: Arc<Shared>,
    schema: String,
    permits: Arc<Semaphore>,
    names: TableNameMap,
}

impl DmReader {
    /// Connect, verify the connection and load the table name map.
    pub async fn new(config: &SourceConfig) -> Result<Self> {
        let env = Environment::new().map_err(|e| {
            MigrateError::connection(
                format!(
                    "failed to create ODBC environment: {}. \
                     Make sure unixODBC and the DM ODBC driver are installed.",
                    e
                ),
                "DM ODBC connection",
            )
        })?;

        let shared = Arc::new(Shared {
            env,
            connection_string: config.connection_string(),
        });
        debug!("DM ODBC connection: {}", config.describe());

        let schema = config.schema.clone();
        let stored = {
            let shared = shared.clone();
            let sql = list_tables_sql(&schema);
            tokio::task::spawn_blocking(move || -> Result<Vec<String>> {
                shared
                    .execute_query("SELECT 1 FROM DUAL")
                    .map_err(|e| MigrateError::connection(e, "testing DM source connection"))?;
                let rows = shared.execute_query(&sql)?;
                Ok(first_column(rows))
            })
            .await
            .map_err(|e| MigrateError::Source(format!("catalog task failed: {}", e)))??
        };

        let names = TableNameMap::new(stored);
        info!(
            "Connected to DM source: {} ({} tables in schema {})",
            config.describe(),
            names.len(),
            schema
        );

        Ok(Self {
            shared,
            schema,
            permits: Arc::new(Semaphore::new(config.max_connections.max(1))),
            names,
        })
    }

    async fn query(&self, sql: String) -> Result<Vec<Vec<Option<String>>>> {
        let shared = self.shared.clone();
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| MigrateError::Source("source connection limiter closed".into()))?;
        tokio::task::spawn_blocking(move || shared.execute_query(&sql))
            .await
            .map_err(|e| MigrateError::Source(format!("query task failed: {}", e)))?
    }
}

fn first_column(rows: Vec<Vec<Option<String>>>) -> Vec<String> {
    rows.into_iter()
        .filter_map(|r| r.into_iter().next().flatten())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[async_trait]
impl SchemaIntrospector for DmReader {
    async fn list_tables(&self) -> Result<Vec<String>> {
        let rows = self.query(list_tables_sql(&self.schema)).await?;
        Ok(first_column(rows))
    }

    fn resolve_table_name(&self, table: &str) -> String {
        self.names.resolve(table).to_string()
    }

    async fn get_columns(&self, table: &str) -> Result<Vec<ColumnDefinition>> {
        let stored = self.resolve_table_name(table);
        if stored != table {
            debug!("Resolved table {} to stored name {}", table, stored);
        }

        let rows = self
            .query(columns_sql(&self.schema, &stored))
            .await
            .map_err(|e| MigrateError::discovery(table, e))?;
        let primary_key = self
            .query(primary_key_sql(&self.schema, &stored))
            .await
            .map(first_column)
            .map_err(|e| MigrateError::discovery(table, e))?;
        let identity = self
            .query(identity_sql(&self.schema, &stored))
            .await
            .map(first_column);

        let columns = build_columns(table, &rows, &primary_key, identity)?;
        debug!(
            "Table {}: {} columns, primary key {:?}",
            stored,
            columns.len(),
            primary_key
        );
        Ok(columns)
    }

    fn read_rows(&self, table: &str, columns: &[ColumnDefinition]) -> RowStream {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let stored = self.resolve_table_name(table);
        let sql = select_rows_sql(&self.schema, &stored, columns);
        let kinds: Vec<ValueKind> = columns
            .iter()
            .map(|c| ValueKind::from_source_type(&c.data_type))
            .collect();
        let buffer_size = fetch_buffer_size(columns);
        let shared = self.shared.clone();
        let permits = self.permits.clone();

        tokio::spawn(async move {
            let permit = match permits.acquire_owned().await {
                Ok(p) => p,
                Err(_) => {
                    let _ = tx
                        .send(Err(MigrateError::Source("source connection limiter closed".into())))
                        .await;
                    return;
                }
            };
            produce_rows_blocking(tx, &stored, move |tx| {
                let _permit = permit;
                debug!("Reading {}", sql);
                if let Err(e) = shared.stream_rows(&sql, &kinds, buffer_size, &tx) {
                    let _ = tx.blocking_send(Err(e));
                }
            })
            .await;
        });

        rx
    }

    async fn test_connection(&self) -> Result<()> {
        self.query("SELECT 1 FROM DUAL".to_string()).await?;
        Ok(())
    }
}
