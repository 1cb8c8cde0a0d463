//! Decoding of driver rows into [`SqlValue`]s.
//!
//! # Architecture
//!
//! 1. `TypeCategory` classifies the declared column type.
//! 2. A backend-specific `decode_column` extracts the typed value.
//! 3. Values with no typed decoding, or whose typed decoding fails, are
//!    read as [`RawValue`] and kept as text. Only SQL NULL becomes
//!    [`SqlValue::Null`].
//!
//! SQLite declares types loosely, so its decoder looks at the storage class
//! of each value first and only uses the declared type to refine text.

use crate::db::DatabaseType;
use crate::models::{ResultSet, SqlValue};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use sqlx::error::BoxDynError;
use sqlx::mysql::{MySql, MySqlRow, MySqlTypeInfo, MySqlValueRef};
use sqlx::postgres::{PgRow, PgTypeInfo, PgValueFormat, PgValueRef, Postgres};
use sqlx::sqlite::{Sqlite, SqliteRow, SqliteTypeInfo, SqliteValueRef};
use sqlx::{Column, ColumnIndex, Decode, Row, Type, TypeInfo, ValueRef};
use std::str::FromStr;
use tracing::{debug, warn};

/// Logical category for database column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    Integer,
    Float,
    Decimal,
    Boolean,
    Text,
    Binary,
    Json,
    Date,
    Time,
    Timestamp,
    TimestampTz,
    Unknown,
}

/// Classify a database type name into a logical category.
pub fn categorize_type(type_name: &str, db: DatabaseType) -> TypeCategory {
    let lower = type_name.to_lowercase();
    let head = lower.split_whitespace().next().unwrap_or_default();

    if lower.contains("interval") {
        return TypeCategory::Unknown;
    }

    if lower.contains("decimal") || lower.contains("numeric") {
        // SQLite's NUMERIC affinity stores floats
        if db == DatabaseType::SQLite && lower == "numeric" {
            return TypeCategory::Float;
        }
        return TypeCategory::Decimal;
    }

    // MySQL TIMESTAMP is stored in UTC, DATETIME is zone-less
    if lower == "timestamptz" || (db == DatabaseType::MySql && lower == "timestamp") {
        return TypeCategory::TimestampTz;
    }
    if lower.contains("timestamp") || lower.contains("datetime") {
        return TypeCategory::Timestamp;
    }
    if lower == "date" {
        return TypeCategory::Date;
    }
    if lower == "time" {
        return TypeCategory::Time;
    }

    if lower == "bool" || lower == "boolean" {
        return TypeCategory::Boolean;
    }

    if matches!(
        head,
        "tinyint"
            | "smallint"
            | "mediumint"
            | "int"
            | "integer"
            | "bigint"
            | "int2"
            | "int4"
            | "int8"
            | "serial"
            | "bigserial"
            | "smallserial"
    ) {
        return TypeCategory::Integer;
    }

    if head.starts_with("float") || head.starts_with("double") || head == "real" {
        return TypeCategory::Float;
    }

    if lower == "json" || lower == "jsonb" {
        return TypeCategory::Json;
    }

    if lower.contains("blob") || lower.contains("binary") || lower == "bytea" {
        return TypeCategory::Binary;
    }

    if lower.contains("char")
        || lower.contains("text")
        || matches!(head, "name" | "string" | "enum" | "set" | "clob")
    {
        return TypeCategory::Text;
    }

    TypeCategory::Unknown
}

// =============================================================================
// Raw Values
// =============================================================================

/// A column value exactly as the driver delivered it.
///
/// Compatible with every column type, so it can always be read when a typed
/// decode is rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    /// Text-format value (PostgreSQL simple queries).
    Text(String),
    Binary(Vec<u8>),
}

impl RawValue {
    /// Keep the value as text: printable UTF-8 as is, anything else base64.
    pub fn into_value(self) -> SqlValue {
        match self {
            RawValue::Text(s) => SqlValue::Other(s),
            RawValue::Binary(bytes) => match String::from_utf8(bytes) {
                Ok(s) if !s.chars().any(|c| c.is_control() && !c.is_whitespace()) => {
                    SqlValue::Other(s)
                }
                Ok(s) => SqlValue::Other(STANDARD.encode(s.as_bytes())),
                Err(e) => SqlValue::Other(STANDARD.encode(e.as_bytes())),
            },
        }
    }
}

impl Type<MySql> for RawValue {
    fn type_info() -> MySqlTypeInfo {
        <Vec<u8> as Type<MySql>>::type_info()
    }

    fn compatible(_ty: &MySqlTypeInfo) -> bool {
        true
    }
}

impl<'r> Decode<'r, MySql> for RawValue {
    fn decode(value: MySqlValueRef<'r>) -> Result<Self, BoxDynError> {
        let bytes = <&[u8] as Decode<MySql>>::decode(value)?;
        Ok(RawValue::Binary(bytes.to_vec()))
    }
}

impl Type<Postgres> for RawValue {
    fn type_info() -> PgTypeInfo {
        <Vec<u8> as Type<Postgres>>::type_info()
    }

    fn compatible(_ty: &PgTypeInfo) -> bool {
        true
    }
}

impl<'r> Decode<'r, Postgres> for RawValue {
    fn decode(value: PgValueRef<'r>) -> Result<Self, BoxDynError> {
        Ok(match value.format() {
            PgValueFormat::Text => RawValue::Text(value.as_str()?.to_owned()),
            PgValueFormat::Binary => RawValue::Binary(value.as_bytes()?.to_vec()),
        })
    }
}

impl Type<Sqlite> for RawValue {
    fn type_info() -> SqliteTypeInfo {
        <Vec<u8> as Type<Sqlite>>::type_info()
    }

    fn compatible(_ty: &SqliteTypeInfo) -> bool {
        true
    }
}

impl<'r> Decode<'r, Sqlite> for RawValue {
    fn decode(value: SqliteValueRef<'r>) -> Result<Self, BoxDynError> {
        let bytes = <&[u8] as Decode<Sqlite>>::decode(value)?;
        Ok(RawValue::Binary(bytes.to_vec()))
    }
}

// =============================================================================
// Column Decoding
// =============================================================================

/// Read a nullable column as `T` and wrap it, keeping the raw text when the
/// driver rejects `T`.
fn decode_as<'r, R, T>(row: &'r R, idx: usize, wrap: impl FnOnce(T) -> SqlValue) -> SqlValue
where
    R: Row,
    usize: ColumnIndex<R>,
    T: Decode<'r, R::Database> + Type<R::Database>,
    RawValue: Decode<'r, R::Database> + Type<R::Database>,
{
    decode_or_raw(row, idx, wrap, RawValue::into_value)
}

/// Like [`decode_as`], with a custom interpretation of the raw value.
fn decode_or_raw<'r, R, T>(
    row: &'r R,
    idx: usize,
    wrap: impl FnOnce(T) -> SqlValue,
    fallback: fn(RawValue) -> SqlValue,
) -> SqlValue
where
    R: Row,
    usize: ColumnIndex<R>,
    T: Decode<'r, R::Database> + Type<R::Database>,
    RawValue: Decode<'r, R::Database> + Type<R::Database>,
{
    match row.try_get::<Option<T>, _>(idx) {
        Ok(Some(v)) => wrap(v),
        Ok(None) => SqlValue::Null,
        Err(e) => {
            debug!(column = idx, error = %e, "Typed decode failed, keeping raw value");
            raw_value(row, idx, fallback)
        }
    }
}

/// Read a column without any typed decoding.
fn raw_value<'r, R>(row: &'r R, idx: usize, fallback: fn(RawValue) -> SqlValue) -> SqlValue
where
    R: Row,
    usize: ColumnIndex<R>,
    RawValue: Decode<'r, R::Database> + Type<R::Database>,
{
    match row.try_get::<Option<RawValue>, _>(idx) {
        Ok(Some(raw)) => fallback(raw),
        Ok(None) => SqlValue::Null,
        Err(e) => {
            warn!(column = idx, error = %e, "Failed to read column value");
            SqlValue::Null
        }
    }
}

/// Conversion of a driver row into positional values.
pub trait RowToValues {
    fn column_names(&self) -> Vec<String>;
    fn to_values(&self) -> Vec<SqlValue>;
}

macro_rules! impl_row_to_values {
    ($row:ty, $decoder:path) => {
        impl RowToValues for $row {
            fn column_names(&self) -> Vec<String> {
                self.columns()
                    .iter()
                    .map(|col| col.name().to_string())
                    .collect()
            }

            fn to_values(&self) -> Vec<SqlValue> {
                self.columns()
                    .iter()
                    .enumerate()
                    .map(|(idx, col)| $decoder(self, idx, col.type_info().name()))
                    .collect()
            }
        }
    };
}

impl_row_to_values!(MySqlRow, mysql::decode_column);
impl_row_to_values!(PgRow, postgres::decode_column);
impl_row_to_values!(SqliteRow, sqlite::decode_column);

/// Build a result set from fetched rows.
///
/// Column names come from the first row; an empty fetch has no columns.
pub fn result_set_from_rows<R: RowToValues>(rows: &[R]) -> ResultSet {
    let columns = rows.first().map(R::column_names).unwrap_or_default();
    let rows = rows.iter().map(R::to_values).collect();
    ResultSet::new(columns, rows)
}

mod mysql {
    use super::*;
    use sqlx::mysql::types::MySqlTime;

    pub fn decode_column(row: &MySqlRow, idx: usize, type_name: &str) -> SqlValue {
        match categorize_type(type_name, DatabaseType::MySql) {
            TypeCategory::Decimal => decode_as(row, idx, SqlValue::Decimal),
            TypeCategory::Integer if type_name.to_uppercase().contains("UNSIGNED") => {
                decode_as(row, idx, SqlValue::UInt)
            }
            TypeCategory::Integer => decode_as(row, idx, SqlValue::Int),
            TypeCategory::Boolean => decode_as(row, idx, SqlValue::Bool),
            TypeCategory::Float if type_name.eq_ignore_ascii_case("FLOAT") => {
                decode_as(row, idx, |v: f32| SqlValue::Float(v as f64))
            }
            TypeCategory::Float => decode_as(row, idx, SqlValue::Float),
            TypeCategory::Date => decode_as(row, idx, SqlValue::Date),
            // TIME is a duration in MySQL and may fall outside a time of day
            TypeCategory::Time => match row.try_get::<Option<NaiveTime>, _>(idx) {
                Ok(v) => v.map_or(SqlValue::Null, SqlValue::Time),
                Err(_) => decode_as(row, idx, |v: MySqlTime| SqlValue::Other(v.to_string())),
            },
            TypeCategory::Timestamp => decode_as(row, idx, SqlValue::Timestamp),
            TypeCategory::TimestampTz => {
                decode_as(row, idx, |v: DateTime<Utc>| SqlValue::TimestampTz(v.into()))
            }
            TypeCategory::Binary => decode_as(row, idx, SqlValue::Bytes),
            TypeCategory::Json => decode_as(row, idx, SqlValue::Json),
            TypeCategory::Text => decode_as(row, idx, SqlValue::Text),
            TypeCategory::Unknown => match type_name {
                "YEAR" => decode_or_raw(row, idx, SqlValue::UInt, little_endian_uint),
                "BIT" => decode_or_raw(row, idx, SqlValue::UInt, big_endian_uint),
                _ => raw_value(row, idx, RawValue::into_value),
            },
        }
    }

    /// Binary-protocol YEAR: a little-endian integer.
    pub(super) fn little_endian_uint(raw: RawValue) -> SqlValue {
        match raw {
            RawValue::Binary(bytes) if (1..=8).contains(&bytes.len()) => SqlValue::UInt(
                bytes.iter().rev().fold(0, |acc, b| (acc << 8) | u64::from(*b)),
            ),
            raw => raw.into_value(),
        }
    }

    /// BIT(n): big-endian bytes.
    pub(super) fn big_endian_uint(raw: RawValue) -> SqlValue {
        match raw {
            RawValue::Binary(bytes) if (1..=8).contains(&bytes.len()) => {
                SqlValue::UInt(bytes.iter().fold(0, |acc, b| (acc << 8) | u64::from(*b)))
            }
            raw => raw.into_value(),
        }
    }
}

mod postgres {
    use super::*;
    use serde_json::Value as JsonValue;
    use sqlx::postgres::PgHasArrayType;
    use sqlx::postgres::types::{Oid, PgInterval, PgMoney, PgTimeTz};
    use sqlx::types::Uuid;

    pub fn decode_column(row: &PgRow, idx: usize, type_name: &str) -> SqlValue {
        if type_name.ends_with("[]") {
            return decode_array(row, idx);
        }

        match categorize_type(type_name, DatabaseType::Postgres) {
            TypeCategory::Decimal => decode_or_raw(row, idx, SqlValue::Decimal, numeric_fallback),
            TypeCategory::Integer => match type_name {
                "INT2" | "SMALLSERIAL" => decode_as(row, idx, |v: i16| SqlValue::Int(v.into())),
                "INT4" | "SERIAL" => decode_as(row, idx, |v: i32| SqlValue::Int(v.into())),
                _ => decode_as(row, idx, SqlValue::Int),
            },
            TypeCategory::Boolean => decode_as(row, idx, SqlValue::Bool),
            TypeCategory::Float if type_name == "FLOAT4" => {
                decode_as(row, idx, |v: f32| SqlValue::Float(v as f64))
            }
            TypeCategory::Float => decode_as(row, idx, SqlValue::Float),
            TypeCategory::Date => decode_as(row, idx, SqlValue::Date),
            TypeCategory::Time => decode_as(row, idx, SqlValue::Time),
            TypeCategory::Timestamp => decode_as(row, idx, SqlValue::Timestamp),
            TypeCategory::TimestampTz => {
                decode_as(row, idx, |v: DateTime<Utc>| SqlValue::TimestampTz(v.into()))
            }
            TypeCategory::Binary => decode_as(row, idx, SqlValue::Bytes),
            TypeCategory::Json => decode_as(row, idx, SqlValue::Json),
            TypeCategory::Text => decode_as(row, idx, SqlValue::Text),
            TypeCategory::Unknown => decode_other(row, idx, type_name),
        }
    }

    fn decode_other(row: &PgRow, idx: usize, type_name: &str) -> SqlValue {
        match type_name {
            "UUID" => decode_as(row, idx, |v: Uuid| SqlValue::Text(v.to_string())),
            "INTERVAL" => decode_as(row, idx, |v: PgInterval| {
                SqlValue::Other(format_interval(&v))
            }),
            "TIMETZ" => decode_as(row, idx, |v: PgTimeTz<NaiveTime, FixedOffset>| {
                SqlValue::Other(format!("{}{}", v.time.format("%H:%M:%S%.f"), v.offset))
            }),
            "MONEY" => decode_as(row, idx, |v: PgMoney| SqlValue::Decimal(v.to_decimal(2))),
            "OID" => decode_as(row, idx, |v: Oid| SqlValue::UInt(v.0.into())),
            _ => raw_value(row, idx, RawValue::into_value),
        }
    }

    /// Arrays of common element types become JSON arrays.
    fn decode_array(row: &PgRow, idx: usize) -> SqlValue {
        try_array::<String>(row, idx)
            .or_else(|| try_array::<i64>(row, idx))
            .or_else(|| try_array::<i32>(row, idx))
            .or_else(|| try_array::<i16>(row, idx))
            .or_else(|| try_array::<f64>(row, idx))
            .or_else(|| try_array::<bool>(row, idx))
            .unwrap_or_else(|| raw_value(row, idx, RawValue::into_value))
    }

    fn try_array<T>(row: &PgRow, idx: usize) -> Option<SqlValue>
    where
        T: for<'r> Decode<'r, Postgres> + Type<Postgres> + PgHasArrayType + Into<JsonValue>,
    {
        let items = row.try_get::<Option<Vec<Option<T>>>, _>(idx).ok()?;
        Some(items.map_or(SqlValue::Null, |items| {
            SqlValue::Json(
                items
                    .into_iter()
                    .map(|v| v.map_or(JsonValue::Null, Into::into))
                    .collect(),
            )
        }))
    }

    /// NUMERIC values `Decimal` cannot hold: NaN, infinities, more than 28
    /// significant digits.
    fn numeric_fallback(raw: RawValue) -> SqlValue {
        match raw {
            RawValue::Binary(bytes) => match numeric_text(&bytes) {
                Some(text) => SqlValue::Other(text),
                None => RawValue::Binary(bytes).into_value(),
            },
            raw => raw.into_value(),
        }
    }

    /// Render a binary NUMERIC: a header of digit count, weight, sign and
    /// display scale, then base-10000 digits, all big-endian `i16`.
    pub(super) fn numeric_text(bytes: &[u8]) -> Option<String> {
        let field = |at: usize| bytes.get(at..at + 2).map(|b| u16::from_be_bytes([b[0], b[1]]));

        let ndigits = field(0)? as usize;
        let weight = field(2)? as i16 as i64;
        let negative = match field(4)? {
            0x0000 => false,
            0x4000 => true,
            0xC000 => return Some("NaN".into()),
            0xD000 => return Some("Infinity".into()),
            0xF000 => return Some("-Infinity".into()),
            _ => return None,
        };
        let dscale = field(6)? as usize;
        let digits = (0..ndigits)
            .map(|i| field(8 + 2 * i))
            .collect::<Option<Vec<u16>>>()?;
        // digit at index i carries weight `weight - i`
        let digit = |at: i64| {
            usize::try_from(at)
                .ok()
                .and_then(|at| digits.get(at).copied())
                .unwrap_or(0)
        };

        let mut text = String::new();
        if negative {
            text.push('-');
        }
        if weight < 0 {
            text.push('0');
        } else {
            text.push_str(&digit(0).to_string());
            for at in 1..=weight {
                text.push_str(&format!("{:04}", digit(at)));
            }
        }
        if dscale > 0 {
            let mut fraction = String::with_capacity(dscale + 4);
            let mut at = weight + 1;
            while fraction.len() < dscale {
                fraction.push_str(&format!("{:04}", digit(at)));
                at += 1;
            }
            fraction.truncate(dscale);
            text.push('.');
            text.push_str(&fraction);
        }
        Some(text)
    }

    /// PostgreSQL's default interval output, e.g. `1 year 2 mons 3 days 04:05:06`.
    pub(super) fn format_interval(interval: &PgInterval) -> String {
        fn unit(n: i64, name: &str) -> String {
            if n == 1 { format!("{n} {name}") } else { format!("{n} {name}s") }
        }

        let mut parts = Vec::new();
        let (years, months) = (interval.months / 12, interval.months % 12);
        if years != 0 {
            parts.push(unit(years.into(), "year"));
        }
        if months != 0 {
            parts.push(unit(months.into(), "mon"));
        }
        if interval.days != 0 {
            parts.push(unit(interval.days.into(), "day"));
        }
        if interval.microseconds != 0 || parts.is_empty() {
            let sign = if interval.microseconds < 0 { "-" } else { "" };
            let micros = interval.microseconds.unsigned_abs();
            let secs = micros / 1_000_000;
            let mut clock = format!(
                "{sign}{:02}:{:02}:{:02}",
                secs / 3600,
                secs % 3600 / 60,
                secs % 60
            );
            let frac = micros % 1_000_000;
            if frac != 0 {
                clock.push_str(format!(".{frac:06}").trim_end_matches('0'));
            }
            parts.push(clock);
        }
        parts.join(" ")
    }
}

mod sqlite {
    use super::*;

    pub fn decode_column(row: &SqliteRow, idx: usize, declared: &str) -> SqlValue {
        let storage = match row.try_get_raw(idx) {
            Ok(raw) if raw.is_null() => return SqlValue::Null,
            Ok(raw) => raw.type_info().name().to_string(),
            Err(e) => {
                warn!(column = idx, error = %e, "Failed to read column value");
                return SqlValue::Null;
            }
        };
        let category = categorize_type(declared, DatabaseType::SQLite);

        match storage.as_str() {
            "INTEGER" if category == TypeCategory::Boolean => decode_as(row, idx, SqlValue::Bool),
            "INTEGER" => decode_as(row, idx, SqlValue::Int),
            "REAL" => decode_as(row, idx, SqlValue::Float),
            "BLOB" => decode_as(row, idx, SqlValue::Bytes),
            _ => decode_as(row, idx, |s: String| refine_text(s, category)),
        }
    }

    /// Interpret text stored under a richer declared type, keeping the text
    /// when it does not parse.
    pub(super) fn refine_text(s: String, category: TypeCategory) -> SqlValue {
        let refined = match category {
            TypeCategory::Date => NaiveDate::parse_from_str(&s, "%Y-%m-%d")
                .ok()
                .map(SqlValue::Date),
            TypeCategory::Time => NaiveTime::parse_from_str(&s, "%H:%M:%S%.f")
                .ok()
                .map(SqlValue::Time),
            TypeCategory::Timestamp | TypeCategory::TimestampTz => {
                NaiveDateTime::parse_from_str(&s, "%Y-%m-%d %H:%M:%S%.f")
                    .or_else(|_| NaiveDateTime::parse_from_str(&s, "%Y-%m-%dT%H:%M:%S%.f"))
                    .ok()
                    .map(SqlValue::Timestamp)
            }
            TypeCategory::Decimal => Decimal::from_str(&s).ok().map(SqlValue::Decimal),
            TypeCategory::Json => serde_json::from_str(&s).ok().map(SqlValue::Json),
            _ => None,
        };
        refined.unwrap_or(SqlValue::Text(s))
    }
}
