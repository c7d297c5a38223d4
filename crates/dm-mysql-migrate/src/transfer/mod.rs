//! Batched data transfer for one table.
//!
//! Rows are pulled from the source cursor one at a time, buffered into a
//! batch no larger than the placeholder budget allows, and written with a
//! single multi-row parameterized INSERT per batch. Each flush runs under a
//! per-batch deadline with a bounded retry for transient target failures.

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::config::MigrationConfig;
use crate::core::traits::{Row, RowStream, TargetWriter};
use crate::core::{ColumnDefinition, SqlValue};
use crate::drivers::mysql::ddl::{insert_prefix, row_placeholders};
use crate::error::{MigrateError, Result};
use crate::state::StatusBoard;

/// Transfer engine configuration.
#[derive(Debug, Clone)]
pub struct TransferConfig {
    /// Most bound parameters a single INSERT may carry.
    pub max_placeholders: usize,
    /// Deadline for one flush, retries included.
    pub batch_timeout: Duration,
    /// Total attempts per flush for transient failures.
    pub retry_attempts: u32,
    /// Backoff unit; attempt `n` waits `n * retry_backoff`.
    pub retry_backoff: Duration,
    /// How often a long transfer logs its row count.
    pub progress_interval: Duration,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            max_placeholders: 60_000,
            batch_timeout: Duration::from_secs(60),
            retry_attempts: 3,
            retry_backoff: Duration::from_secs(1),
            progress_interval: Duration::from_secs(30),
        }
    }
}

impl From<&MigrationConfig> for TransferConfig {
    fn from(config: &MigrationConfig) -> Self {
        Self {
            max_placeholders: config.max_placeholders,
            batch_timeout: config.batch_timeout(),
            retry_attempts: config.retry_attempts,
            retry_backoff: config.retry_backoff(),
            progress_interval: config.progress_interval(),
        }
    }
}

/// Rows per batch: the requested size capped by the placeholder budget,
/// never less than one row.
pub fn safe_batch_size(column_count: usize, requested: usize, max_placeholders: usize) -> usize {
    let safe = max_placeholders / column_count.max(1);
    requested.min(safe).max(1)
}

/// Rows waiting for the next INSERT.
#[derive(Debug)]
pub struct BatchBuffer {
    prefix: String,
    placeholders: String,
    column_count: usize,
    capacity: usize,
    values: Vec<SqlValue<'static>>,
    rows: usize,
}

impl BatchBuffer {
    pub fn new(table: &str, columns: &[ColumnDefinition], capacity: usize) -> Self {
        let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
        Self {
            prefix: insert_prefix(table, &names),
            placeholders: row_placeholders(columns.len()),
            column_count: columns.len(),
            capacity,
            values: Vec::with_capacity(capacity * columns.len()),
            rows: 0,
        }
    }

    /// Append one row. Binary values are stored as text.
    pub fn push_row(&mut self, row: Row) -> std::result::Result<(), String> {
        if row.len() != self.column_count {
            return Err(format!(
                "row has {} values, expected {}",
                row.len(),
                self.column_count
            ));
        }
        self.values.extend(row.into_iter().map(SqlValue::bytes_to_text));
        self.rows += 1;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn is_full(&self) -> bool {
        self.rows >= self.capacity
    }

    pub fn values(&self) -> &[SqlValue<'static>] {
        &self.values
    }

    /// INSERT text with one placeholder group per buffered row.
    pub fn render_sql(&self) -> String {
        let groups = vec![self.placeholders.as_str(); self.rows];
        format!("{}{}", self.prefix, groups.join(","))
    }

    pub fn clear(&mut self) {
        self.values.clear();
        self.rows = 0;
    }
}

/// Moves one table's rows from a source cursor into the target.
#[derive(Debug, Clone, Default)]
pub struct TransferEngine {
    config: TransferConfig,
}

impl TransferEngine {
    pub fn new(config: TransferConfig) -> Self {
        Self { config }
    }

    /// Stream `rows` into `table` and return the number of rows inserted.
    ///
    /// On failure the error is a `MigrateError::Transfer` carrying the rows
    /// flushed before it. Nothing is rolled back.
    pub async fn transfer(
        &self,
        writer: &dyn TargetWriter,
        table: &str,
        columns: &[ColumnDefinition],
        rows: &mut RowStream,
        requested_batch: usize,
        board: Option<&StatusBoard>,
    ) -> Result<u64> {
        let batch_size = safe_batch_size(columns.len(), requested_batch, self.config.max_placeholders);
        if batch_size < requested_batch {
            debug!(
                "{}: batch size reduced from {} to {} for {} columns",
                table,
                requested_batch,
                batch_size,
                columns.len()
            );
        }

        let mut buffer = BatchBuffer::new(table, columns, batch_size);
        let mut inserted: u64 = 0;
        let started = Instant::now();
        let mut last_progress = Instant::now();

        while let Some(item) = rows.recv().await {
            let row = item.map_err(|e| MigrateError::transfer(table, inserted, e))?;
            buffer
                .push_row(row)
                .map_err(|e| MigrateError::transfer(table, inserted, e))?;

            if buffer.is_full() {
                let n = self.flush(writer, table, &mut buffer).await.map_err(|e| {
                    MigrateError::transfer(table, inserted, e)
                })?;
                inserted += n;
                if let Some(board) = board {
                    board.add_rows(table, n);
                }
                if last_progress.elapsed() >= self.config.progress_interval {
                    info!(
                        "{}: {} rows inserted ({:.0} rows/s)",
                        table,
                        inserted,
                        inserted as f64 / started.elapsed().as_secs_f64().max(0.001)
                    );
                    last_progress = Instant::now();
                }
            }
        }

        if !buffer.is_empty() {
            let n = self
                .flush(writer, table, &mut buffer)
                .await
                .map_err(|e| MigrateError::transfer(table, inserted, e))?;
            inserted += n;
            if let Some(board) = board {
                board.add_rows(table, n);
            }
        }

        Ok(inserted)
    }

    /// Write the buffered rows and clear the buffer on success.
    async fn flush(&self, writer: &dyn TargetWriter, table: &str, buffer: &mut BatchBuffer) -> Result<u64> {
        let sql = buffer.render_sql();
        let rows = buffer.len() as u64;
        let attempts = self.config.retry_attempts.max(1);

        let insert = async {
            let mut attempt = 1;
            loop {
                match writer.execute_insert(&sql, buffer.values()).await {
                    Ok(affected) => return Ok(affected),
                    Err(e) if e.is_transient() && attempt < attempts => {
                        let wait = self.config.retry_backoff * attempt;
                        warn!(
                            "{}: insert attempt {}/{} failed, retrying in {:?}: {}",
                            table, attempt, attempts, wait, e
                        );
                        tokio::time::sleep(wait).await;
                        attempt += 1;
                    }
                    Err(e) => return Err(e),
                }
            }
        };

        let affected = match tokio::time::timeout(self.config.batch_timeout, insert).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(MigrateError::target(format!(
                    "batch of {} rows timed out after {}s",
                    rows,
                    self.config.batch_timeout.as_secs()
                )))
            }
        };

        if affected != rows {
            debug!("{}: batch of {} rows reported {} affected", table, rows, affected);
        }
        buffer.clear();
        Ok(rows)
    }
}
