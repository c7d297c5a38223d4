//! Decoding of ODBC text buffers into typed values.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;

use crate::core::{ColumnDefinition, SqlNullType, SqlValue};

/// Rows per ODBC fetch for tables without large-object columns.
pub const FETCH_ROWS: usize = 5000;
/// Longest text value per cell for tables without large-object columns.
pub const MAX_STR_LEN: usize = 65536;
/// Rows per fetch once a large-object column is present.
pub const LOB_FETCH_ROWS: usize = 16;
/// Longest text value per cell once a large-object column is present.
/// Binary arrives hex encoded, so binary values get half of this.
pub const LOB_MAX_STR_LEN: usize = 16 * 1024 * 1024;

/// Whether `data_type` holds values that can outgrow a fixed text buffer.
pub fn is_large_object(data_type: &str) -> bool {
    let t = data_type.to_uppercase();
    ["LOB", "TEXT", "IMAGE", "LONG"].iter().any(|k| t.contains(k))
}

/// Rows per fetch and longest text per cell for a data query over `columns`.
///
/// Values longer than the cell size fail the fetch rather than being cut.
pub fn fetch_buffer_size(columns: &[ColumnDefinition]) -> (usize, usize) {
    if columns.iter().any(|c| is_large_object(&c.data_type)) {
        (LOB_FETCH_ROWS, LOB_MAX_STR_LEN)
    } else {
        (FETCH_ROWS, MAX_STR_LEN)
    }
}

/// How text fetched for a column should be interpreted. Derived once per
/// column from its source type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Bool,
    Integer,
    Decimal,
    Float,
    Date,
    DateTime,
    Time,
    Binary,
    Text,
}

impl ValueKind {
    pub fn from_source_type(data_type: &str) -> Self {
        let t = data_type.trim().to_uppercase();
        match t.as_str() {
            "BIT" | "BOOL" | "BOOLEAN" => return ValueKind::Bool,
            "BIGINT" | "INT" | "INTEGER" | "SMALLINT" | "TINYINT" | "BYTE" => {
                return ValueKind::Integer
            }
            "REAL" | "DOUBLE" | "DOUBLE PRECISION" | "FLOAT" => return ValueKind::Float,
            "DATE" => return ValueKind::Date,
            _ => {}
        }
        if ["NUMBER", "DECIMAL", "NUMERIC", "DEC"].iter().any(|k| t.contains(k)) {
            ValueKind::Decimal
        } else if t.contains("CHAR") || t.contains("STR") || t.contains("CLOB") || t.contains("TEXT") {
            ValueKind::Text
        } else if t.contains("TIMESTAMP") || t.contains("DATETIME") {
            ValueKind::DateTime
        } else if t.contains("TIME") {
            ValueKind::Time
        } else if t.contains("BLOB") || t.contains("IMAGE") || t.contains("BINARY") {
            ValueKind::Binary
        } else {
            ValueKind::Text
        }
    }

    fn null_type(self) -> SqlNullType {
        match self {
            ValueKind::Bool => SqlNullType::Bool,
            ValueKind::Integer => SqlNullType::I64,
            ValueKind::Decimal => SqlNullType::Decimal,
            ValueKind::Float => SqlNullType::F64,
            ValueKind::Date => SqlNullType::Date,
            ValueKind::DateTime => SqlNullType::DateTime,
            ValueKind::Time => SqlNullType::Time,
            ValueKind::Binary => SqlNullType::Bytes,
            ValueKind::Text => SqlNullType::String,
        }
    }
}

/// Decode one fetched cell. Text that does not parse as the expected kind is
/// passed through as text and left to MySQL to coerce.
pub fn decode_text(text: Option<&str>, kind: ValueKind) -> SqlValue<'static> {
    let Some(s) = text else {
        return SqlValue::Null(kind.null_type());
    };
    let fallback = || SqlValue::text_owned(s.to_string());
    let trimmed = s.trim();

    match kind {
        ValueKind::Text => fallback(),
        ValueKind::Bool => match trimmed {
            "1" => SqlValue::Bool(true),
            "0" => SqlValue::Bool(false),
            other if other.eq_ignore_ascii_case("true") => SqlValue::Bool(true),
            other if other.eq_ignore_ascii_case("false") => SqlValue::Bool(false),
            _ => fallback(),
        },
        ValueKind::Integer => trimmed.parse::<i64>().map(SqlValue::I64).unwrap_or_else(|_| fallback()),
        ValueKind::Float => trimmed.parse::<f64>().map(SqlValue::F64).unwrap_or_else(|_| fallback()),
        // Beyond 28 significant digits rust_decimal gives up; MySQL parses the text.
        ValueKind::Decimal => trimmed
            .parse::<Decimal>()
            .map(SqlValue::Decimal)
            .unwrap_or_else(|_| fallback()),
        ValueKind::Date => parse_datetime(trimmed)
            .map(SqlValue::DateTime)
            .unwrap_or_else(fallback),
        ValueKind::DateTime => parse_datetime(trimmed)
            .map(SqlValue::DateTime)
            .unwrap_or_else(fallback),
        ValueKind::Time => NaiveTime::parse_from_str(trimmed, "%H:%M:%S%.f")
            .map(SqlValue::Time)
            .unwrap_or_else(|_| fallback()),
        ValueKind::Binary => hex::decode(trimmed)
            .map(SqlValue::bytes_owned)
            .unwrap_or_else(|_| SqlValue::bytes_owned(s.as_bytes().to_vec())),
    }
}

/// Accepts `YYYY-MM-DD`, with optional `HH:MM:SS[.ffffff]` after a space or `T`.
/// Trailing time zone text is ignored.
fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    // Localised formats put multi-byte text inside the first ten bytes.
    let (date_part, rest) = (s.get(..10)?, s.get(10..)?);
    let d = NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()?;
    let rest = rest.trim();
    if rest.is_empty() {
        return d.and_hms_opt(0, 0, 0);
    }
    // "2024-01-02 03:04:05.000000 +08:00"
    let time_part = rest.split_whitespace().next().unwrap_or_default();
    NaiveTime::parse_from_str(time_part.trim_start_matches('T'), "%H:%M:%S%.f")
        .ok()
        .map(|t| d.and_time(t))
}
