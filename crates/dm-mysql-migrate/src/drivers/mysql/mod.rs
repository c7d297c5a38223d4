//! MySQL target driver.
//!
//! - [`MysqlWriter`]: connection pool, constraint toggles, DDL and batch execution
//! - [`ddl`]: statement text builders shared with the transfer engine
//!
//! # Supported Versions
//!
//! MySQL 5.x and 8.x, selected with [`MysqlVersion`](crate::config::MysqlVersion).

pub mod ddl;
mod writer;

pub use writer::MysqlWriter;
