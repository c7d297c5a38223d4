//! Shared per-table status for a migration run.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

/// Lifecycle of one table job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl TaskStatus {
    /// Completed and Failed never change again.
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }

    fn can_become(self, next: TaskStatus) -> bool {
        matches!(
            (self, next),
            (TaskStatus::Pending, TaskStatus::InProgress)
                | (TaskStatus::Pending, TaskStatus::Failed)
                | (TaskStatus::InProgress, TaskStatus::Completed)
                | (TaskStatus::InProgress, TaskStatus::Failed)
        )
    }
}

/// Aggregate counts taken under one lock acquisition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub pending: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub failed: usize,
    pub total: usize,
    pub rows_transferred: u64,
}

#[derive(Debug, Clone, Copy)]
struct TableEntry {
    status: TaskStatus,
    rows: u64,
}

/// Table name to status and inserted rows, shared by all workers and the
/// reporter.
///
/// A single mutex guards the map; it is never held across an await or while
/// taking another lock.
#[derive(Debug, Default)]
pub struct StatusBoard {
    tables: Mutex<HashMap<String, TableEntry>>,
}

impl StatusBoard {
    /// Board with every table pending.
    pub fn new<I, S>(tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tables = tables
            .into_iter()
            .map(|t| {
                let entry = TableEntry {
                    status: TaskStatus::Pending,
                    rows: 0,
                };
                (t.into(), entry)
            })
            .collect();
        Self {
            tables: Mutex::new(tables),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, TableEntry>> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Move `table` to `next`. Returns false, leaving the entry untouched, for
    /// unknown tables and for transitions the lifecycle does not allow.
    pub fn transition(&self, table: &str, next: TaskStatus) -> bool {
        let mut tables = self.lock();
        match tables.get_mut(table) {
            Some(entry) if entry.status.can_become(next) => {
                entry.status = next;
                true
            }
            _ => false,
        }
    }

    pub fn status(&self, table: &str) -> Option<TaskStatus> {
        self.lock().get(table).map(|e| e.status)
    }

    /// Count `rows` as inserted into `table`. Unknown tables are ignored.
    pub fn add_rows(&self, table: &str, rows: u64) {
        if let Some(entry) = self.lock().get_mut(table) {
            entry.rows += rows;
        }
    }

    /// Rows inserted into `table` so far.
    pub fn rows(&self, table: &str) -> u64 {
        self.lock().get(table).map_or(0, |e| e.rows)
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        let mut snap = StatusSnapshot::default();
        let tables = self.lock();
        snap.total = tables.len();
        for entry in tables.values() {
            snap.rows_transferred += entry.rows;
            match entry.status {
                TaskStatus::Pending => snap.pending += 1,
                TaskStatus::InProgress => snap.in_progress += 1,
                TaskStatus::Completed => snap.completed += 1,
                TaskStatus::Failed => snap.failed += 1,
            }
        }
        snap
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_new_board_is_all_pending() {
        let board = StatusBoard::new(["a", "b", "c"]);
        let snap = board.snapshot();
        assert_eq!(snap.pending, 3);
        assert_eq!(snap.total, 3);
    }

    #[test]
    fn test_happy_path_transitions() {
        let board = StatusBoard::new(["orders"]);
        assert!(board.transition("orders", TaskStatus::InProgress));
        assert!(board.transition("orders", TaskStatus::Completed));
        assert_eq!(board.status("orders"), Some(TaskStatus::Completed));
    }

    #[test]
    fn test_terminal_states_are_final() {
        let board = StatusBoard::new(["orders"]);
        board.transition("orders", TaskStatus::InProgress);
        assert!(board.transition("orders", TaskStatus::Failed));
        assert!(!board.transition("orders", TaskStatus::Completed));
        assert!(!board.transition("orders", TaskStatus::InProgress));
        assert_eq!(board.status("orders"), Some(TaskStatus::Failed));
    }

    #[test]
    fn test_cannot_skip_in_progress_to_complete() {
        let board = StatusBoard::new(["orders"]);
        assert!(!board.transition("orders", TaskStatus::Completed));
        assert_eq!(board.status("orders"), Some(TaskStatus::Pending));
    }

    #[test]
    fn test_unknown_table_ignored() {
        let board = StatusBoard::new(["orders"]);
        assert!(!board.transition("missing", TaskStatus::InProgress));
        assert_eq!(board.snapshot().total, 1);
    }

    #[test]
    fn test_snapshot_counts_and_rows() {
        let board = StatusBoard::new(["a", "b", "c", "d"]);
        board.transition("a", TaskStatus::InProgress);
        board.transition("b", TaskStatus::InProgress);
        board.transition("b", TaskStatus::Completed);
        board.transition("c", TaskStatus::Failed);
        board.add_rows("a", 1500);
        board.add_rows("b", 500);
        board.add_rows("missing", 99);

        let snap = board.snapshot();
        assert_eq!(
            snap,
            StatusSnapshot {
                pending: 1,
                in_progress: 1,
                completed: 1,
                failed: 1,
                total: 4,
                rows_transferred: 2000,
            }
        );
        assert_eq!(board.rows("a"), 1500);
        assert_eq!(board.rows("missing"), 0);
    }

    #[test]
    fn test_concurrent_transitions() {
        let names: Vec<String> = (0..64).map(|i| format!("t{i}")).collect();
        let board = Arc::new(StatusBoard::new(names.clone()));
        let handles: Vec<_> = names
            .into_iter()
            .map(|name| {
                let board = board.clone();
                std::thread::spawn(move || {
                    board.transition(&name, TaskStatus::InProgress);
                    board.transition(&name, TaskStatus::Completed);
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(board.snapshot().completed, 64);
    }

    #[test]
    fn test_status_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&TaskStatus::InProgress).unwrap(),
            "\"in_progress\""
        );
    }
}
