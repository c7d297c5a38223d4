//! SQL value types for rows moving from the source cursor to insert batches.

use std::borrow::Cow;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;

/// Type hint carried by NULL values so logs and tests can tell which column
/// kind produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlNullType {
    Bool,
    I64,
    F64,
    String,
    Bytes,
    Decimal,
    DateTime,
    Date,
    Time,
}

/// SQL value enum for type-safe row handling.
///
/// Uses `Cow` for string and byte data so decoders can borrow from fetch
/// buffers and only allocate when a row has to outlive them.
///
/// # Example
///
/// ```rust
/// use std::borrow::Cow;
/// use dm_mysql_migrate::core::SqlValue;
///
/// let borrowed: SqlValue<'_> = SqlValue::Text(Cow::Borrowed("hello"));
/// let owned: SqlValue<'static> = borrowed.into_owned();
/// assert_eq!(owned, SqlValue::text_owned("hello".to_string()));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue<'a> {
    /// NULL with type hint.
    Null(SqlNullType),

    /// Boolean value.
    Bool(bool),

    /// Any integer width up to 64 bits.
    I64(i64),

    /// Floating point.
    F64(f64),

    /// Text data.
    Text(Cow<'a, str>),

    /// Binary data.
    Bytes(Cow<'a, [u8]>),

    /// Fixed-point decimal.
    Decimal(Decimal),

    /// Timestamp without timezone.
    DateTime(NaiveDateTime),

    /// Date without time component.
    Date(NaiveDate),

    /// Time without date component.
    Time(NaiveTime),
}

impl<'a> SqlValue<'a> {
    /// Convert to a fully owned value with `'static` lifetime.
    #[must_use]
    pub fn into_owned(self) -> SqlValue<'static> {
        match self {
            SqlValue::Null(t) => SqlValue::Null(t),
            SqlValue::Bool(v) => SqlValue::Bool(v),
            SqlValue::I64(v) => SqlValue::I64(v),
            SqlValue::F64(v) => SqlValue::F64(v),
            SqlValue::Text(v) => SqlValue::Text(Cow::Owned(v.into_owned())),
            SqlValue::Bytes(v) => SqlValue::Bytes(Cow::Owned(v.into_owned())),
            SqlValue::Decimal(v) => SqlValue::Decimal(v),
            SqlValue::DateTime(v) => SqlValue::DateTime(v),
            SqlValue::Date(v) => SqlValue::Date(v),
            SqlValue::Time(v) => SqlValue::Time(v),
        }
    }

    /// Replace binary payloads with their UTF-8 text reading.
    ///
    /// Invalid sequences become U+FFFD. Every other variant is returned as is.
    #[must_use]
    pub fn bytes_to_text(self) -> Self {
        match self {
            SqlValue::Bytes(b) => SqlValue::Text(Cow::Owned(String::from_utf8_lossy(&b).into_owned())),
            SqlValue::Null(SqlNullType::Bytes) => SqlValue::Null(SqlNullType::String),
            other => other,
        }
    }

    /// Check if this value is NULL.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null(_))
    }

    /// Create a text value from an owned String.
    #[must_use]
    pub fn text_owned(s: String) -> SqlValue<'static> {
        SqlValue::Text(Cow::Owned(s))
    }

    /// Create a bytes value from an owned Vec<u8>.
    #[must_use]
    pub fn bytes_owned(b: Vec<u8>) -> SqlValue<'static> {
        SqlValue::Bytes(Cow::Owned(b))
    }
}

impl From<i64> for SqlValue<'static> {
    fn from(v: i64) -> Self {
        SqlValue::I64(v)
    }
}

impl From<String> for SqlValue<'static> {
    fn from(v: String) -> Self {
        SqlValue::Text(Cow::Owned(v))
    }
}

impl<'a> From<&'a str> for SqlValue<'a> {
    fn from(v: &'a str) -> Self {
        SqlValue::Text(Cow::Borrowed(v))
    }
}

impl From<Vec<u8>> for SqlValue<'static> {
    fn from(v: Vec<u8>) -> Self {
        SqlValue::Bytes(Cow::Owned(v))
    }
}

/// Years a MySQL binary date can carry.
const MYSQL_YEARS: std::ops::RangeInclusive<i32> = 0..=9999;

/// Convert a value into a mysql_async parameter. Dates outside the years
/// MySQL can represent are bound as text.
pub fn to_mysql_value(value: &SqlValue<'_>) -> mysql_async::Value {
    use chrono::{Datelike, Timelike};
    use mysql_async::Value;

    match value {
        SqlValue::Null(_) => Value::NULL,
        SqlValue::Bool(b) => Value::from(*b),
        SqlValue::I64(i) => Value::from(*i),
        SqlValue::F64(f) => Value::from(*f),
        SqlValue::Text(s) => Value::from(s.as_ref()),
        SqlValue::Bytes(b) => Value::from(b.as_ref()),
        SqlValue::Decimal(d) => Value::from(d.to_string()),
        SqlValue::DateTime(dt) if !MYSQL_YEARS.contains(&dt.year()) => Value::from(dt.to_string()),
        SqlValue::Date(d) if !MYSQL_YEARS.contains(&d.year()) => Value::from(d.to_string()),
        SqlValue::DateTime(dt) => Value::Date(
            dt.year() as u16,
            dt.month() as u8,
            dt.day() as u8,
            dt.hour() as u8,
            dt.minute() as u8,
            dt.second() as u8,
            dt.nanosecond() / 1_000,
        ),
        SqlValue::Date(d) => Value::Date(d.year() as u16, d.month() as u8, d.day() as u8, 0, 0, 0, 0),
        SqlValue::Time(t) => Value::Time(
            false,
            0,
            t.hour() as u8,
            t.minute() as u8,
            t.second() as u8,
            t.nanosecond() / 1_000,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sql_value_into_owned() {
        let borrowed: SqlValue<'_> = SqlValue::Text(Cow::Borrowed("hello"));
        let owned: SqlValue<'static> = borrowed.into_owned();
        assert_eq!(owned, SqlValue::Text(Cow::Owned("hello".to_string())));
    }

    #[test]
    fn test_bytes_become_text() {
        let v = SqlValue::bytes_owned(b"caf\xc3\xa9".to_vec()).bytes_to_text();
        assert_eq!(v, SqlValue::text_owned("café".to_string()));
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let v = SqlValue::bytes_owned(vec![0x61, 0xff, 0x62]).bytes_to_text();
        assert_eq!(v, SqlValue::text_owned("a\u{fffd}b".to_string()));
    }

    #[test]
    fn test_non_bytes_untouched() {
        assert_eq!(SqlValue::I64(7).bytes_to_text(), SqlValue::I64(7));
        assert_eq!(
            SqlValue::Null(SqlNullType::Bytes).bytes_to_text(),
            SqlValue::Null(SqlNullType::String)
        );
    }

    #[test]
    fn test_datetime_to_mysql_value() {
        let dt = NaiveDate::from_ymd_opt(2024, 2, 29)
            .unwrap()
            .and_hms_micro_opt(13, 45, 10, 123_456)
            .unwrap();
        assert_eq!(
            to_mysql_value(&SqlValue::DateTime(dt)),
            mysql_async::Value::Date(2024, 2, 29, 13, 45, 10, 123_456)
        );
    }

    #[test]
    fn test_out_of_range_years_bind_as_text() {
        let ancient = NaiveDate::from_ymd_opt(-4712, 1, 1).unwrap();
        assert_eq!(
            to_mysql_value(&SqlValue::DateTime(ancient.and_hms_opt(0, 0, 0).unwrap())),
            mysql_async::Value::from(ancient.and_hms_opt(0, 0, 0).unwrap().to_string())
        );
        assert_eq!(
            to_mysql_value(&SqlValue::Date(ancient)),
            mysql_async::Value::from(ancient.to_string())
        );

        let far = NaiveDate::from_ymd_opt(70_000, 6, 1).unwrap();
        assert_eq!(
            to_mysql_value(&SqlValue::Date(far)),
            mysql_async::Value::from(far.to_string())
        );
    }

    #[test]
    fn test_decimal_binds_as_string() {
        let d: Decimal = "12345.6789".parse().unwrap();
        assert_eq!(
            to_mysql_value(&SqlValue::Decimal(d)),
            mysql_async::Value::from("12345.6789")
        );
        assert_eq!(to_mysql_value(&SqlValue::Null(SqlNullType::I64)), mysql_async::Value::NULL);
    }
}
