//! The two seams of the pipeline.
//!
//! - [`SchemaIntrospector`]: reads metadata and rows from the source
//! - [`TargetWriter`]: creates tables and executes batches on the destination
//!
//! The orchestrator and the transfer engine depend only on these traits.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::warn;

use crate::error::{MigrateError, Result};
use crate::typemap::MappedColumn;

use super::schema::ColumnDefinition;
use super::value::SqlValue;

/// One source row, values in column ordinal order.
pub type Row = Vec<SqlValue<'static>>;

/// Incremental row cursor. Ends when the sender is dropped; a source failure
/// mid-stream arrives as an `Err` item.
pub type RowStream = mpsc::Receiver<Result<Row>>;

/// Run a blocking row producer on the blocking pool.
///
/// If `produce` panics its sender is dropped mid-stream; the consumer then
/// receives a source error instead of a clean end of rows.
pub async fn produce_rows_blocking<F>(tx: mpsc::Sender<Result<Row>>, table: &str, produce: F)
where
    F: FnOnce(mpsc::Sender<Result<Row>>) + Send + 'static,
{
    let err_tx = tx.clone();
    if let Err(e) = tokio::task::spawn_blocking(move || produce(tx)).await {
        warn!("Source fetch task for {} aborted: {}", table, e);
        let _ = err_tx
            .send(Err(MigrateError::Source(format!(
                "source fetch for {} aborted: {}",
                table, e
            ))))
            .await;
    }
}

/// Read metadata and data from the source database.
///
/// Table names passed in are as the operator typed them; implementations
/// resolve them against the stored names.
#[async_trait]
pub trait SchemaIntrospector: Send + Sync {
    /// Stored names of all migratable tables in the source schema.
    async fn list_tables(&self) -> Result<Vec<String>>;

    /// Stored name for `table`, or `table` itself when no match is known.
    fn resolve_table_name(&self, table: &str) -> String;

    /// Columns in ordinal order with primary-key and identity flags merged in.
    ///
    /// Zero columns is an error. Identity detection is best-effort.
    async fn get_columns(&self, table: &str) -> Result<Vec<ColumnDefinition>>;

    /// Start streaming `columns` of `table`. Rows are produced in the
    /// background and buffered up to the channel capacity.
    fn read_rows(&self, table: &str, columns: &[ColumnDefinition]) -> RowStream;

    /// Round-trip check used by health checks.
    async fn test_connection(&self) -> Result<()>;
}

/// Write schema and data to the destination database.
#[async_trait]
pub trait TargetWriter: Send + Sync {
    /// Turn off foreign-key and uniqueness checks for subsequent work.
    async fn disable_constraints(&self) -> Result<()>;

    /// Turn the checks back on.
    async fn enable_constraints(&self) -> Result<()>;

    /// Drop `table` if present and create it from `columns`.
    ///
    /// Fails with `MigrateError::SchemaWrite` carrying the DDL.
    async fn create_table(&self, table: &str, columns: &[MappedColumn]) -> Result<()>;

    /// Execute one parameterized insert and return the affected row count.
    ///
    /// Failures are classified (`MigrateError::Target`) so callers can decide
    /// whether to retry.
    async fn execute_insert(&self, sql: &str, values: &[SqlValue<'static>]) -> Result<u64>;

    /// Round-trip check used by health checks.
    async fn test_connection(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_producer_panic_reaches_consumer_as_error() {
        let (tx, mut rx) = mpsc::channel(8);
        produce_rows_blocking(tx, "ORDERS", |tx| {
            tx.blocking_send(Ok(vec![SqlValue::I64(1)])).unwrap();
            panic!("fetch thread died");
        })
        .await;

        assert!(matches!(rx.recv().await, Some(Ok(_))));
        match rx.recv().await {
            Some(Err(MigrateError::Source(msg))) => assert!(msg.contains("ORDERS")),
            other => panic!("expected a source error, got {:?}", other.map(|r| r.is_ok())),
        }
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_clean_producer_ends_stream() {
        let (tx, mut rx) = mpsc::channel(8);
        produce_rows_blocking(tx, "ORDERS", |tx| {
            tx.blocking_send(Ok(vec![SqlValue::I64(1)])).unwrap();
        })
        .await;

        assert!(matches!(rx.recv().await, Some(Ok(_))));
        assert!(rx.recv().await.is_none());
    }
}
