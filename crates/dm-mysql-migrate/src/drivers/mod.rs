//! Database driver implementations.
//!
//! - [`dm`]: DM (Dameng) source, read over ODBC
//! - [`mysql`]: MySQL destination, written with mysql_async
//!
//! Each driver implements one side of [`crate::core::traits`]; nothing
//! outside this module touches a driver crate directly.

pub mod dm;
pub mod mysql;
