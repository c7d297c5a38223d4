//! Core abstractions shared by the source reader, target writer and the
//! migration pipeline.
//!
//! - [`schema`]: column metadata read from the source
//! - [`value`]: SQL value representation for rows in flight
//! - [`traits`]: the seams between the pipeline and the two databases
//!
//! The orchestrator and transfer engine only see the traits, which keeps them
//! testable with in-memory implementations.

pub mod schema;
pub mod traits;
pub mod value;

pub use schema::{primary_key_columns, ColumnDefinition};
pub use traits::{produce_rows_blocking, Row, RowStream, SchemaIntrospector, TargetWriter};
pub use value::{SqlNullType, SqlValue};
