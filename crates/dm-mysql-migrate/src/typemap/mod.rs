//! Type mapping from DM (Oracle-style) column types to MySQL.
//!
//! Rules are checked in priority order; the first match wins:
//!
//! 1. exact integer, boolean and floating point keywords
//! 2. generic numerics (`NUMBER`, `DECIMAL`, `NUMERIC`, `DEC`)
//! 3. character types, sized by byte length at 3 bytes per character
//! 4. `DATE`, then anything containing `TIME`
//! 5. large objects
//! 6. `LONGTEXT` for everything else

use crate::config::MysqlVersion;
use crate::core::ColumnDefinition;

/// Largest DECIMAL precision MySQL accepts.
const MYSQL_MAX_PRECISION: i32 = 65;
/// Largest DECIMAL scale MySQL accepts.
const MYSQL_MAX_SCALE: i32 = 30;
/// Byte length above which even TEXT (64 KiB) may overflow with 3-byte characters.
const LONGTEXT_THRESHOLD: i64 = 21_845;
/// Byte length above which a VARCHAR risks the 64 KiB row size limit.
const TEXT_THRESHOLD: i64 = 5_461;

/// Result of mapping one source type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeMapping {
    /// MySQL column type (e.g. `VARCHAR(100)`, `DECIMAL(10,2)`).
    pub target_type: String,
    /// Whether this mapping loses data or precision.
    pub is_lossy: bool,
    /// Warning message for lossy mappings.
    pub warning: Option<String>,
}

impl TypeMapping {
    /// Create a lossless type mapping.
    pub fn lossless(target_type: impl Into<String>) -> Self {
        Self {
            target_type: target_type.into(),
            is_lossy: false,
            warning: None,
        }
    }

    /// Create a lossy type mapping with a warning.
    pub fn lossy(target_type: impl Into<String>, warning: impl Into<String>) -> Self {
        Self {
            target_type: target_type.into(),
            is_lossy: true,
            warning: Some(warning.into()),
        }
    }
}

/// Destination column derived from a source [`ColumnDefinition`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedColumn {
    pub name: String,
    pub target_type: String,
    pub is_nullable: bool,
    pub is_primary_key: bool,
    pub is_auto_increment: bool,
    pub warning: Option<String>,
}

/// Maps DM column definitions for one MySQL generation.
#[derive(Debug, Clone, Copy)]
pub struct DmToMysqlMapper {
    version: MysqlVersion,
}

impl DmToMysqlMapper {
    pub fn new(version: MysqlVersion) -> Self {
        Self { version }
    }

    /// Map a raw type with its length, precision and scale.
    pub fn map_type(&self, source_type: &str, length: i64, precision: i32, scale: i32) -> TypeMapping {
        let t = source_type.trim().to_uppercase();

        match t.as_str() {
            "BIGINT" => return TypeMapping::lossless("BIGINT"),
            "INT" | "INTEGER" => return TypeMapping::lossless("INT"),
            "SMALLINT" => return TypeMapping::lossless("SMALLINT"),
            "TINYINT" | "BYTE" => return TypeMapping::lossless("TINYINT"),
            "BIT" | "BOOL" | "BOOLEAN" => return TypeMapping::lossless("TINYINT(1)"),
            "REAL" | "DOUBLE" | "DOUBLE PRECISION" | "FLOAT" => return TypeMapping::lossless("DOUBLE"),
            _ => {}
        }

        if ["NUMBER", "DECIMAL", "NUMERIC", "DEC"].iter().any(|k| t.contains(k)) {
            return map_numeric(precision, scale);
        }

        if t.contains("CHAR") || t.contains("STR") {
            return TypeMapping::lossless(if length > LONGTEXT_THRESHOLD {
                "LONGTEXT".to_string()
            } else if length > TEXT_THRESHOLD {
                "TEXT".to_string()
            } else {
                format!("VARCHAR({})", length)
            });
        }

        if t == "DATE" {
            return TypeMapping::lossless("DATETIME");
        }

        if t.contains("TIME") {
            if t.contains("TIMESTAMP") {
                if self.version.supports_fractional_seconds() {
                    return TypeMapping::lossless("DATETIME(6)");
                }
                return TypeMapping::lossy(
                    "DATETIME",
                    format!("{} loses fractional seconds on MySQL {}", t, self.version),
                );
            }
            return TypeMapping::lossless("DATETIME");
        }

        if t.contains("CLOB") || t.contains("TEXT") || t.contains("LONGVARCHAR") {
            return TypeMapping::lossless("LONGTEXT");
        }

        if t.contains("BLOB") || t.contains("IMAGE") || t.contains("BINARY") {
            return TypeMapping::lossless("LONGBLOB");
        }

        TypeMapping::lossy(
            "LONGTEXT",
            format!("unknown source type '{}', stored as LONGTEXT", source_type),
        )
    }

    /// Map one column, carrying its flags across unchanged.
    pub fn map_column(&self, col: &ColumnDefinition) -> MappedColumn {
        let mapping = self.map_type(&col.data_type, col.max_length, col.precision, col.scale);
        MappedColumn {
            name: col.name.clone(),
            target_type: mapping.target_type,
            is_nullable: col.is_nullable,
            is_primary_key: col.is_primary_key,
            is_auto_increment: col.is_identity,
            warning: mapping.warning,
        }
    }

    /// Map all columns of a table, preserving order.
    pub fn map_columns(&self, columns: &[ColumnDefinition]) -> Vec<MappedColumn> {
        columns.iter().map(|c| self.map_column(c)).collect()
    }
}

/// Map an Oracle-style generic numeric.
fn map_numeric(precision: i32, scale: i32) -> TypeMapping {
    let mut notes = Vec::new();

    let scale = if scale < 0 {
        notes.push(format!("negative scale {} rounded to integer", scale));
        0
    } else {
        scale
    };

    if precision <= 0 && scale == 0 {
        return TypeMapping::lossless("DECIMAL(38,4)");
    }

    if scale == 0 {
        let target = match precision {
            p if p <= 3 => "TINYINT".to_string(),
            p if p <= 5 => "SMALLINT".to_string(),
            p if p <= 9 => "INT".to_string(),
            p if p <= 19 => "BIGINT".to_string(),
            p if p > MYSQL_MAX_PRECISION => {
                notes.push(format!("precision {} clamped to {}", p, MYSQL_MAX_PRECISION));
                format!("DECIMAL({},0)", MYSQL_MAX_PRECISION)
            }
            p => format!("DECIMAL({},0)", p),
        };
        return with_notes(target, notes);
    }

    let mut p = precision;
    let mut s = scale;
    if p > MYSQL_MAX_PRECISION {
        notes.push(format!("precision {} clamped to {}", p, MYSQL_MAX_PRECISION));
        p = MYSQL_MAX_PRECISION;
    }
    if s > MYSQL_MAX_SCALE {
        notes.push(format!("scale {} clamped to {}", s, MYSQL_MAX_SCALE));
        s = MYSQL_MAX_SCALE;
    }
    if p < s {
        p = s;
    }
    with_notes(format!("DECIMAL({},{})", p, s), notes)
}

fn with_notes(target: String, notes: Vec<String>) -> TypeMapping {
    if notes.is_empty() {
        TypeMapping::lossless(target)
    } else {
        TypeMapping::lossy(target, notes.join("; "))
    }
}

/// Map a DM type to a MySQL type string.
pub fn dm_to_mysql(source_type: &str, length: i64, precision: i32, scale: i32, version: MysqlVersion) -> String {
    DmToMysqlMapper::new(version)
        .map_type(source_type, length, precision, scale)
        .target_type
}
