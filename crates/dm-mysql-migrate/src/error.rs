//! Error types for the migration library.

use std::path::PathBuf;

use thiserror::Error;

/// Whether a failed operation is worth repeating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Connectivity hiccup; the same statement may succeed on a fresh attempt.
    Transient,
    /// Anything else. Repeating the statement will fail the same way.
    Permanent,
}

/// Error text fragments that identify a dropped or refused connection when
/// the driver gives us nothing more structured to go on.
const TRANSIENT_SIGNATURES: &[&str] = &[
    "connection refused",
    "broken pipe",
    "invalid connection",
    "connection lost",
];

impl ErrorClass {
    /// Classify from error text alone.
    pub fn from_message(message: &str) -> Self {
        let lower = message.to_lowercase();
        if TRANSIENT_SIGNATURES.iter().any(|sig| lower.contains(sig)) {
            ErrorClass::Transient
        } else {
            ErrorClass::Permanent
        }
    }
}

/// Main error type for migration operations.
#[derive(Error, Debug)]
pub enum MigrateError {
    /// Configuration error (missing parameters, invalid values)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Table list could not be read or parsed
    #[error("Failed to load table list {path:?}: {message}")]
    TableList { path: PathBuf, message: String },

    /// Connection or pool setup failure
    #[error("Connection error: {message}\n  Context: {context}")]
    Connection { message: String, context: String },

    /// Source driver failure outside schema discovery
    #[error("Source database error: {0}")]
    Source(String),

    /// Source metadata could not be read for a table
    #[error("Schema discovery failed for table {table}: {message}")]
    SchemaDiscovery { table: String, message: String },

    /// Destination DDL failed
    #[error("Schema write failed for table {table}: {message}\n  SQL: {ddl}")]
    SchemaWrite {
        table: String,
        ddl: String,
        message: String,
    },

    /// Data transfer failed for a specific table
    #[error("Transfer failed for table {table} after {rows_inserted} rows: {message}")]
    Transfer {
        table: String,
        rows_inserted: u64,
        message: String,
    },

    /// Table job exceeded its deadline
    #[error("Table {table} timed out after {seconds}s")]
    Timeout { table: String, seconds: u64 },

    /// Classified destination failure
    #[error("Target database error: {message}")]
    Target { message: String, class: ErrorClass },

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Migration was cancelled (SIGINT, etc.)
    #[error("Migration cancelled")]
    Cancelled,
}

impl From<mysql_async::Error> for MigrateError {
    fn from(err: mysql_async::Error) -> Self {
        let class = classify_mysql_error(&err);
        MigrateError::Target {
            message: err.to_string(),
            class,
        }
    }
}

/// Structured classification of a mysql_async error, falling back to text
/// signatures for wrapped driver messages.
pub fn classify_mysql_error(err: &mysql_async::Error) -> ErrorClass {
    use mysql_async::{DriverError, Error};

    match err {
        Error::Io(_) => ErrorClass::Transient,
        Error::Driver(DriverError::ConnectionClosed) | Error::Driver(DriverError::PoolDisconnected) => {
            ErrorClass::Transient
        }
        // ER_CON_COUNT_ERROR, ER_SERVER_SHUTDOWN, CR_SERVER_GONE_ERROR, CR_SERVER_LOST
        Error::Server(server) if matches!(server.code, 1040 | 1053 | 2006 | 2013) => {
            ErrorClass::Transient
        }
        other => ErrorClass::from_message(&other.to_string()),
    }
}

impl MigrateError {
    /// Create a Connection error with context about where it occurred
    pub fn connection(message: impl ToString, context: impl Into<String>) -> Self {
        MigrateError::Connection {
            message: message.to_string(),
            context: context.into(),
        }
    }

    /// Create a SchemaDiscovery error
    pub fn discovery(table: impl Into<String>, message: impl ToString) -> Self {
        MigrateError::SchemaDiscovery {
            table: table.into(),
            message: message.to_string(),
        }
    }

    /// Create a Transfer error
    pub fn transfer(table: impl Into<String>, rows_inserted: u64, message: impl ToString) -> Self {
        MigrateError::Transfer {
            table: table.into(),
            rows_inserted,
            message: message.to_string(),
        }
    }

    /// Create an unclassified Target error from driver text.
    pub fn target(message: impl Into<String>) -> Self {
        let message = message.into();
        let class = ErrorClass::from_message(&message);
        MigrateError::Target { message, class }
    }

    /// True when a batch insert that failed this way may be retried.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            MigrateError::Target {
                class: ErrorClass::Transient,
                ..
            }
        )
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            MigrateError::Config(_)
            | MigrateError::TableList { .. }
            | MigrateError::Yaml(_)
            | MigrateError::Json(_) => 1,
            MigrateError::Connection { .. } | MigrateError::Source(_) => 2,
            MigrateError::Io(_) => 7,
            MigrateError::Cancelled => 130,
            _ => 4,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_signatures_are_transient() {
        for msg in [
            "dial tcp 10.0.0.5:3306: connect: connection refused",
            "write: Broken pipe",
            "driver: invalid connection",
            "Connection lost: server closed the connection",
        ] {
            assert_eq!(ErrorClass::from_message(msg), ErrorClass::Transient, "{msg}");
        }
    }

    #[test]
    fn test_other_messages_are_permanent() {
        for msg in [
            "Duplicate entry '1' for key 'PRIMARY'",
            "Data too long for column 'name' at row 3",
            "Table 'db.orders' doesn't exist",
        ] {
            assert_eq!(ErrorClass::from_message(msg), ErrorClass::Permanent, "{msg}");
        }
    }

    #[test]
    fn test_is_transient_only_for_transient_target_errors() {
        assert!(MigrateError::target("broken pipe").is_transient());
        assert!(!MigrateError::target("syntax error").is_transient());
        assert!(!MigrateError::Source("connection refused".into()).is_transient());
        assert!(!MigrateError::Timeout {
            table: "t".into(),
            seconds: 60
        }
        .is_transient());
    }

    #[test]
    fn test_mysql_io_error_is_transient() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset by peer");
        let err = mysql_async::Error::Io(mysql_async::IoError::Io(io));
        assert_eq!(classify_mysql_error(&err), ErrorClass::Transient);
    }

    #[test]
    fn test_mysql_driver_closed_is_transient() {
        let err = mysql_async::Error::Driver(mysql_async::DriverError::ConnectionClosed);
        assert_eq!(classify_mysql_error(&err), ErrorClass::Transient);
        let converted: MigrateError = err.into();
        assert!(converted.is_transient());
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(MigrateError::Config("x".into()).exit_code(), 1);
        assert_eq!(
            MigrateError::TableList {
                path: "tables.json".into(),
                message: "missing".into()
            }
            .exit_code(),
            1
        );
        assert_eq!(MigrateError::connection("refused", "DM").exit_code(), 2);
        assert_eq!(MigrateError::Cancelled.exit_code(), 130);
        assert_eq!(MigrateError::transfer("t", 10, "boom").exit_code(), 4);
    }

    #[test]
    fn test_schema_write_display_includes_ddl() {
        let err = MigrateError::SchemaWrite {
            table: "orders".into(),
            ddl: "CREATE TABLE `orders` (...)".into(),
            message: "syntax error".into(),
        };
        let text = err.to_string();
        assert!(text.contains("orders"));
        assert!(text.contains("CREATE TABLE `orders`"));
    }

    #[test]
    fn test_transfer_display_includes_rows() {
        let err = MigrateError::transfer("orders", 4000, "duplicate key");
        assert!(err.to_string().contains("after 4000 rows"));
    }
}
