//! Migration orchestrator - main workflow coordinator.
//!
//! A fixed pool of workers drains a pre-filled, closed queue of table names.
//! Each table runs introspect, map, create and transfer in order as its own
//! task, raced against the per-table deadline. A timed-out task is detached,
//! not aborted: it may keep its connections busy until it finishes on its own.

mod health;

pub use health::{health_check, HealthCheckResult};

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::core::traits::{SchemaIntrospector, TargetWriter};
use crate::error::{MigrateError, Result};
use crate::state::{StatusBoard, TaskStatus};
use crate::transfer::{TransferConfig, TransferEngine};
use crate::typemap::DmToMysqlMapper;

/// Per-table result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableOutcome {
    pub name: String,
    pub status: TaskStatus,
    /// Rows inserted, including those written before a failure.
    pub rows: u64,
    pub duration_seconds: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TableOutcome {
    fn pending(name: &str) -> Self {
        Self {
            name: name.to_string(),
            status: TaskStatus::Pending,
            rows: 0,
            duration_seconds: 0.0,
            error: None,
        }
    }
}

/// Result of a migration run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationResult {
    /// Unique run identifier.
    pub run_id: String,

    /// `completed`, `completed_with_errors` or `cancelled`.
    pub status: String,

    /// Total duration in seconds.
    pub duration_seconds: f64,

    /// When the migration started.
    pub started_at: DateTime<Utc>,

    /// When the migration completed.
    pub completed_at: DateTime<Utc>,

    /// Total tables configured.
    pub tables_total: usize,

    /// Tables successfully migrated.
    pub tables_success: usize,

    /// Tables that failed.
    pub tables_failed: usize,

    /// Total rows transferred.
    pub rows_transferred: u64,

    /// Average throughput (rows/second).
    pub rows_per_second: u64,

    /// List of failed table names.
    pub failed_tables: Vec<String>,

    /// One entry per configured table, in configured order.
    pub tables: Vec<TableOutcome>,
}

impl MigrationResult {
    /// Convert to JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == "cancelled"
    }
}

/// Everything a table job needs, shared by all workers.
struct JobContext {
    source: Arc<dyn SchemaIntrospector>,
    target: Arc<dyn TargetWriter>,
    mapper: DmToMysqlMapper,
    engine: TransferEngine,
    batch_size: usize,
    table_timeout: Duration,
}

impl JobContext {
    /// Introspect, map, create and fill one table.
    async fn migrate_table(&self, table: &str, board: &StatusBoard) -> Result<u64> {
        let columns = self.source.get_columns(table).await?;
        let mapped = self.mapper.map_columns(&columns);
        self.target.create_table(table, &mapped).await?;

        let mut rows = self.source.read_rows(table, &columns);
        self.engine
            .transfer(
                self.target.as_ref(),
                table,
                &columns,
                &mut rows,
                self.batch_size,
                Some(board),
            )
            .await
    }
}

/// Migration orchestrator.
pub struct Orchestrator {
    workers: usize,
    progress_interval: Duration,
    ctx: Arc<JobContext>,
}

impl Orchestrator {
    /// Create an orchestrator over already-connected endpoints.
    pub fn new(config: Config, source: Arc<dyn SchemaIntrospector>, target: Arc<dyn TargetWriter>) -> Self {
        let migration = &config.migration;
        let ctx = JobContext {
            source,
            target,
            mapper: DmToMysqlMapper::new(config.target.version),
            engine: TransferEngine::new(TransferConfig::from(migration)),
            batch_size: migration.batch_size,
            table_timeout: migration.table_timeout(),
        };
        Self {
            workers: migration.workers.max(1),
            progress_interval: migration.progress_interval().max(Duration::from_secs(1)),
            ctx: Arc::new(ctx),
        }
    }

    /// Migrate `tables`. Individual table failures are reported in the
    /// result, not returned as errors.
    pub async fn run(&self, tables: Vec<String>, cancel: CancellationToken) -> Result<MigrationResult> {
        let started_at = Utc::now();
        let start = Instant::now();
        let run_id = uuid::Uuid::new_v4().to_string();
        let workers = self.workers.min(tables.len()).max(1);

        info!(
            "Starting migration run {}: {} tables, {} workers",
            run_id,
            tables.len(),
            workers
        );

        let board = Arc::new(StatusBoard::new(tables.iter().cloned()));

        if let Err(e) = self.ctx.target.disable_constraints().await {
            warn!("Could not disable target constraint checks: {}", e);
        }

        let stop_reporter = CancellationToken::new();
        let reporter = tokio::spawn(report_progress(
            board.clone(),
            self.progress_interval,
            stop_reporter.clone(),
        ));

        let (queue_tx, queue_rx) = async_channel::bounded::<String>(tables.len().max(1));
        for table in &tables {
            // Capacity covers every table, so this cannot fail.
            let _ = queue_tx.try_send(table.clone());
        }
        queue_tx.close();

        let mut handles = Vec::with_capacity(workers);
        for worker_id in 0..workers {
            let queue_rx = queue_rx.clone();
            let ctx = self.ctx.clone();
            let board = board.clone();
            let cancel = cancel.clone();

            handles.push(tokio::spawn(async move {
                let mut outcomes = Vec::new();
                loop {
                    let table = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => {
                            debug!("Worker {}: cancelled, not taking new tables", worker_id);
                            break;
                        }
                        next = queue_rx.recv() => match next {
                            Ok(table) => table,
                            Err(_) => break,
                        },
                    };
                    outcomes.push(run_job(&ctx, &board, table).await);
                }
                outcomes
            }));
        }
        drop(queue_rx);

        let mut finished: HashMap<String, TableOutcome> = HashMap::new();
        for handle in handles {
            match handle.await {
                Ok(outcomes) => {
                    finished.extend(outcomes.into_iter().map(|o| (o.name.clone(), o)));
                }
                Err(e) => error!("Worker task failed: {}", e),
            }
        }

        stop_reporter.cancel();
        let _ = reporter.await;

        if let Err(e) = self.ctx.target.enable_constraints().await {
            error!("Failed to re-enable target constraint checks: {}", e);
        }

        let outcomes: Vec<TableOutcome> = tables
            .iter()
            .map(|t| {
                finished.remove(t).unwrap_or_else(|| {
                    // A worker may have died mid-job; trust the board over a missing outcome.
                    let mut o = TableOutcome::pending(t);
                    if let Some(status) = board.status(t) {
                        o.status = status;
                    }
                    o
                })
            })
            .collect();

        let result = build_result(run_id, started_at, start.elapsed(), outcomes, cancel.is_cancelled());
        info!(
            "Migration {}: {}/{} tables succeeded, {} failed, {} rows in {:.1}s",
            result.status,
            result.tables_success,
            result.tables_total,
            result.tables_failed,
            result.rows_transferred,
            result.duration_seconds
        );
        if !result.failed_tables.is_empty() {
            warn!("Failed tables: {}", result.failed_tables.join(", "));
        }
        Ok(result)
    }
}

/// Run one table as its own task under the table deadline.
async fn run_job(ctx: &Arc<JobContext>, board: &Arc<StatusBoard>, table: String) -> TableOutcome {
    let start = Instant::now();
    board.transition(&table, TaskStatus::InProgress);
    info!("{}: starting", table);

    let handle = {
        let ctx = ctx.clone();
        let board = board.clone();
        let table = table.clone();
        tokio::spawn(async move { ctx.migrate_table(&table, &board).await })
    };

    let (status, rows, err) = match tokio::time::timeout(ctx.table_timeout, handle).await {
        Ok(Ok(Ok(rows))) => (TaskStatus::Completed, rows, None),
        Ok(Ok(Err(e))) => {
            let rows = match &e {
                MigrateError::Transfer { rows_inserted, .. } => *rows_inserted,
                _ => 0,
            };
            (TaskStatus::Failed, rows, Some(e))
        }
        // The task may have flushed batches before it died or ran out of time.
        Ok(Err(join)) => (
            TaskStatus::Failed,
            board.rows(&table),
            Some(MigrateError::Source(format!("table task aborted: {}", join))),
        ),
        Err(_) => (
            TaskStatus::Failed,
            board.rows(&table),
            Some(MigrateError::Timeout {
                table: table.clone(),
                seconds: ctx.table_timeout.as_secs(),
            }),
        ),
    };

    board.transition(&table, status);
    let elapsed = start.elapsed();
    match &err {
        None => info!("{}: completed ({} rows in {:.1}s)", table, rows, elapsed.as_secs_f64()),
        Some(e) => error!("{}: failed after {:.1}s: {}", table, elapsed.as_secs_f64(), e),
    }

    TableOutcome {
        name: table,
        status,
        rows,
        duration_seconds: elapsed.as_secs_f64(),
        error: err.map(|e| e.to_string()),
    }
}

/// Log a status snapshot every `every` until `stop` fires.
async fn report_progress(board: Arc<StatusBoard>, every: Duration, stop: CancellationToken) {
    let mut ticker = tokio::time::interval(every);
    // The first tick completes immediately.
    ticker.tick().await;
    loop {
        tokio::select! {
            _ = stop.cancelled() => break,
            _ = ticker.tick() => {
                let s = board.snapshot();
                info!(
                    "Progress: {} completed, {} failed, {} in progress, {} pending of {} tables; {} rows",
                    s.completed, s.failed, s.in_progress, s.pending, s.total, s.rows_transferred
                );
            }
        }
    }
}

fn build_result(
    run_id: String,
    started_at: DateTime<Utc>,
    elapsed: Duration,
    tables: Vec<TableOutcome>,
    cancelled: bool,
) -> MigrationResult {
    let tables_success = tables.iter().filter(|t| t.status == TaskStatus::Completed).count();
    let failed_tables: Vec<String> = tables
        .iter()
        .filter(|t| t.status == TaskStatus::Failed)
        .map(|t| t.name.clone())
        .collect();
    let rows_transferred: u64 = tables.iter().map(|t| t.rows).sum();
    let duration_seconds = elapsed.as_secs_f64();

    let status = if cancelled {
        "cancelled"
    } else if failed_tables.is_empty() {
        "completed"
    } else {
        "completed_with_errors"
    };

    MigrationResult {
        run_id,
        status: status.to_string(),
        duration_seconds,
        started_at,
        completed_at: Utc::now(),
        tables_total: tables.len(),
        tables_success,
        tables_failed: failed_tables.len(),
        rows_transferred,
        rows_per_second: if duration_seconds > 0.0 {
            (rows_transferred as f64 / duration_seconds) as u64
        } else {
            0
        },
        failed_tables,
        tables,
    }
}
