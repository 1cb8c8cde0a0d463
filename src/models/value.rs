//! Typed cell values and their JSON serialization policy.
//!
//! Every value read from a catalog view is held as a [`SqlValue`]. Values
//! that JSON can carry as-is pass through; the rest are converted:
//!
//! | Value | JSON |
//! |---|---|
//! | date, timestamp | ISO-8601 string |
//! | decimal | number (`f64`, precision loss accepted) |
//! | anything else | its text |

use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Serialize, Serializer};
use serde_json::Value as JsonValue;
use std::fmt;

/// A single value of a result row.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Decimal(Decimal),
    Text(String),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<FixedOffset>),
    Bytes(Vec<u8>),
    Json(JsonValue),
    /// Driver-specific value without a native mapping, kept as its text.
    Other(String),
}

impl SqlValue {
    /// Convert to JSON following the fallback policy.
    pub fn to_json(&self) -> JsonValue {
        match self {
            Self::Null => JsonValue::Null,
            Self::Bool(v) => JsonValue::Bool(*v),
            Self::Int(v) => JsonValue::Number((*v).into()),
            Self::UInt(v) => JsonValue::Number((*v).into()),
            Self::Text(v) => JsonValue::String(v.clone()),
            Self::Json(v) => v.clone(),
            Self::Float(v) => float_or_text(*v),
            Self::Decimal(v) => match v.to_f64() {
                Some(f) => float_or_text(f),
                None => JsonValue::String(v.to_string()),
            },
            Self::Date(_) | Self::Timestamp(_) | Self::TimestampTz(_) => {
                JsonValue::String(self.to_string())
            }
            // catch-all
            Self::Time(_) | Self::Bytes(_) | Self::Other(_) => JsonValue::String(self.to_string()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

fn float_or_text(v: f64) -> JsonValue {
    serde_json::Number::from_f64(v)
        .map(JsonValue::Number)
        .unwrap_or_else(|| JsonValue::String(v.to_string()))
}

/// Seconds with microseconds only when there is a sub-second part.
fn iso_time_format(nanos: u32) -> &'static str {
    if nanos == 0 {
        "%H:%M:%S"
    } else {
        "%H:%M:%S%.6f"
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Bool(v) => write!(f, "{}", v),
            Self::Int(v) => write!(f, "{}", v),
            Self::UInt(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
            Self::Decimal(v) => write!(f, "{}", v),
            Self::Text(v) | Self::Other(v) => f.write_str(v),
            Self::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Self::Time(t) => write!(f, "{}", t.format(iso_time_format(t.nanosecond()))),
            Self::Timestamp(ts) => write!(
                f,
                "{}T{}",
                ts.format("%Y-%m-%d"),
                ts.format(iso_time_format(ts.nanosecond()))
            ),
            Self::TimestampTz(ts) => write!(
                f,
                "{}T{}{}",
                ts.format("%Y-%m-%d"),
                ts.format(iso_time_format(ts.nanosecond())),
                ts.format("%:z")
            ),
            Self::Bytes(bytes) => match std::str::from_utf8(bytes) {
                Ok(s) => f.write_str(s),
                Err(_) => f.write_str(&STANDARD.encode(bytes)),
            },
            Self::Json(v) => write!(f, "{}", v),
        }
    }
}

impl Serialize for SqlValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl From<SqlValue> for JsonValue {
    fn from(value: SqlValue) -> Self {
        value.to_json()
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<Decimal> for SqlValue {
    fn from(v: Decimal) -> Self {
        Self::Decimal(v)
    }
}

impl From<NaiveDate> for SqlValue {
    fn from(v: NaiveDate) -> Self {
        Self::Date(v)
    }
}

impl From<NaiveDateTime> for SqlValue {
    fn from(v: NaiveDateTime) -> Self {
        Self::Timestamp(v)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Self::Null)
    }
}
