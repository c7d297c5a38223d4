//! DM (Dameng) source driver.
//!
//! DM speaks an Oracle-compatible dialect and is reached through its ODBC
//! driver. The ODBC reader itself is behind the `dm` feature because it
//! links against unixODBC; name resolution, catalog queries and value
//! decoding are plain Rust and always available.
//!
//! ```toml
//! [dependencies]
//! dm-mysql-migrate = { version = "0.1", features = ["dm"] }
//! ```

pub mod catalog;
mod decode;
mod names;
#[cfg(feature = "dm")]
mod reader;

pub use decode::{decode_text, ValueKind};
pub use names::TableNameMap;
#[cfg(feature = "dm")]
pub use reader::DmReader;
