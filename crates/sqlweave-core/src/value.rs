//! Database scalar values and their conversion to and from Rust types.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// The provider-level type of a bound parameter or mapped column.
///
/// Drivers use this to pick the native parameter type; it is inferred from the
/// [`Value`] when a caller does not state it explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DbType {
    /// Boolean / bit.
    Boolean,
    /// 8-bit signed integer.
    SByte,
    /// 16-bit signed integer.
    Int16,
    /// 32-bit signed integer.
    Int32,
    /// 64-bit signed integer.
    Int64,
    /// Single precision floating point.
    Single,
    /// Double precision floating point.
    Double,
    /// Exact numeric carried as text.
    Decimal,
    /// Unicode string.
    String,
    /// Non-unicode string.
    AnsiString,
    /// Binary blob.
    Binary,
    /// Calendar date.
    Date,
    /// Time of day.
    Time,
    /// Date and time without offset.
    DateTime,
    /// Date and time with offset.
    DateTimeOffset,
    /// 128-bit identifier.
    Guid,
    /// JSON document.
    Json,
    /// Unknown or provider-chosen.
    #[default]
    Object,
}

/// A dynamically typed database value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub enum Value {
    /// SQL NULL.
    #[default]
    Null,
    /// Boolean.
    Bool(bool),
    /// 8-bit integer.
    TinyInt(i8),
    /// 16-bit integer.
    SmallInt(i16),
    /// 32-bit integer.
    Int(i32),
    /// 64-bit integer.
    BigInt(i64),
    /// 32-bit float.
    Float(f32),
    /// 64-bit float.
    Double(f64),
    /// Exact numeric as text, e.g. `"12.50"`.
    Decimal(String),
    /// Text.
    Text(String),
    /// Bytes.
    Bytes(Vec<u8>),
    /// Days since the Unix epoch.
    Date(i32),
    /// Microseconds since midnight.
    Time(i64),
    /// Microseconds since the Unix epoch.
    Timestamp(i64),
    /// Microseconds since the Unix epoch, UTC.
    TimestampTz(i64),
    /// UUID bytes.
    Uuid([u8; 16]),
    /// JSON document.
    Json(serde_json::Value),
}

impl Value {
    /// True for [`Value::Null`].
    pub const fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Infer the [`DbType`] of this value.
    pub const fn db_type(&self) -> DbType {
        match self {
            Value::Null => DbType::Object,
            Value::Bool(_) => DbType::Boolean,
            Value::TinyInt(_) => DbType::SByte,
            Value::SmallInt(_) => DbType::Int16,
            Value::Int(_) => DbType::Int32,
            Value::BigInt(_) => DbType::Int64,
            Value::Float(_) => DbType::Single,
            Value::Double(_) => DbType::Double,
            Value::Decimal(_) => DbType::Decimal,
            Value::Text(_) => DbType::String,
            Value::Bytes(_) => DbType::Binary,
            Value::Date(_) => DbType::Date,
            Value::Time(_) => DbType::Time,
            Value::Timestamp(_) => DbType::DateTime,
            Value::TimestampTz(_) => DbType::DateTimeOffset,
            Value::Uuid(_) => DbType::Guid,
            Value::Json(_) => DbType::Json,
        }
    }

    /// Whether this value is the "unset" default for an identifier.
    ///
    /// Null, zero, the empty string and the nil UUID all count as unset.
    pub fn is_default_identifier(&self) -> bool {
        match self {
            Value::Null => true,
            Value::TinyInt(v) => *v == 0,
            Value::SmallInt(v) => *v == 0,
            Value::Int(v) => *v == 0,
            Value::BigInt(v) => *v == 0,
            Value::Decimal(s) | Value::Text(s) => s.is_empty(),
            Value::Uuid(u) => u.iter().all(|b| *b == 0),
            _ => false,
        }
    }

    /// Widen any integral value to `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Bool(b) => Some(i64::from(*b)),
            Value::TinyInt(v) => Some(i64::from(*v)),
            Value::SmallInt(v) => Some(i64::from(*v)),
            Value::Int(v) => Some(i64::from(*v)),
            Value::BigInt(v) => Some(*v),
            Value::Decimal(s) | Value::Text(s) => s.trim().parse().ok(),
            #[allow(clippy::cast_possible_truncation)]
            Value::Double(f) if f.fract() == 0.0 => Some(*f as i64),
            _ => None,
        }
    }

    /// Short name of the variant, used in conversion errors.
    pub const fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Bool(_) => "BOOL",
            Value::TinyInt(_) => "TINYINT",
            Value::SmallInt(_) => "SMALLINT",
            Value::Int(_) => "INT",
            Value::BigInt(_) => "BIGINT",
            Value::Float(_) => "FLOAT",
            Value::Double(_) => "DOUBLE",
            Value::Decimal(_) => "DECIMAL",
            Value::Text(_) => "TEXT",
            Value::Bytes(_) => "BYTES",
            Value::Date(_) => "DATE",
            Value::Time(_) => "TIME",
            Value::Timestamp(_) => "TIMESTAMP",
            Value::TimestampTz(_) => "TIMESTAMPTZ",
            Value::Uuid(_) => "UUID",
            Value::Json(_) => "JSON",
        }
    }
}

/// Convert a Rust value into a [`Value`] for binding.
pub trait ToValue {
    /// Produce the database value.
    fn to_value(&self) -> Value;
}

/// Convert a [`Value`] read from the database into a Rust value.
pub trait FromValue: Sized {
    /// The provider type a column of this Rust type maps to.
    const DB_TYPE: DbType;

    /// Convert, failing with [`Error::Mapping`] on a type mismatch.
    fn from_value(value: Value) -> Result<Self>;
}

fn mismatch(expected: &str, value: &Value) -> Error {
    Error::Mapping(format!(
        "cannot convert {} to {expected}",
        value.type_name()
    ))
}

macro_rules! integral_value {
    ($ty:ty, $variant:ident, $db:ident) => {
        impl From<$ty> for Value {
            fn from(v: $ty) -> Self {
                Value::$variant(v)
            }
        }

        impl ToValue for $ty {
            fn to_value(&self) -> Value {
                Value::$variant(*self)
            }
        }

        impl FromValue for $ty {
            const DB_TYPE: DbType = DbType::$db;

            fn from_value(value: Value) -> Result<Self> {
                let wide = value
                    .as_i64()
                    .ok_or_else(|| mismatch(stringify!($ty), &value))?;
                <$ty>::try_from(wide).map_err(|_| {
                    Error::Mapping(format!("{wide} is out of range for {}", stringify!($ty)))
                })
            }
        }
    };
}

integral_value!(i8, TinyInt, SByte);
integral_value!(i16, SmallInt, Int16);
integral_value!(i32, Int, Int32);
integral_value!(i64, BigInt, Int64);

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl ToValue for bool {
    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }
}

impl FromValue for bool {
    const DB_TYPE: DbType = DbType::Boolean;

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Bool(b) => Ok(b),
            Value::Text(ref s) => match s.to_ascii_lowercase().as_str() {
                "true" | "t" | "y" | "1" => Ok(true),
                "false" | "f" | "n" | "0" => Ok(false),
                _ => Err(mismatch("bool", &value)),
            },
            other => other
                .as_i64()
                .map(|v| v != 0)
                .ok_or_else(|| mismatch("bool", &other)),
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl ToValue for f64 {
    fn to_value(&self) -> Value {
        Value::Double(*self)
    }
}

impl FromValue for f64 {
    const DB_TYPE: DbType = DbType::Double;

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Double(f) => Ok(f),
            Value::Float(f) => Ok(f64::from(f)),
            Value::Decimal(ref s) | Value::Text(ref s) => {
                s.trim().parse().map_err(|_| mismatch("f64", &value))
            }
            other => other
                .as_i64()
                .map(|v| v as f64)
                .ok_or_else(|| mismatch("f64", &other)),
        }
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl ToValue for f32 {
    fn to_value(&self) -> Value {
        Value::Float(*self)
    }
}

impl FromValue for f32 {
    const DB_TYPE: DbType = DbType::Single;

    #[allow(clippy::cast_possible_truncation)]
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Float(f) => Ok(f),
            other => f64::from_value(other).map(|f| f as f32),
        }
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl ToValue for String {
    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }
}

impl FromValue for String {
    const DB_TYPE: DbType = DbType::String;

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Text(s) | Value::Decimal(s) => Ok(s),
            Value::Json(j) => Ok(j.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            Value::Double(f) => Ok(f.to_string()),
            other => other
                .as_i64()
                .map(|v| v.to_string())
                .ok_or_else(|| mismatch("String", &other)),
        }
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl ToValue for Vec<u8> {
    fn to_value(&self) -> Value {
        Value::Bytes(self.clone())
    }
}

impl FromValue for Vec<u8> {
    const DB_TYPE: DbType = DbType::Binary;

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Bytes(b) => Ok(b),
            Value::Text(s) => Ok(s.into_bytes()),
            Value::Uuid(u) => Ok(u.to_vec()),
            other => Err(mismatch("Vec<u8>", &other)),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::Json(v)
    }
}

impl ToValue for serde_json::Value {
    fn to_value(&self) -> Value {
        Value::Json(self.clone())
    }
}

impl FromValue for serde_json::Value {
    const DB_TYPE: DbType = DbType::Json;

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Json(j) => Ok(j),
            Value::Text(ref s) => serde_json::from_str(s)
                .map_err(|e| Error::Mapping(format!("invalid JSON text: {e}"))),
            other => Err(mismatch("JSON", &other)),
        }
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl<T: ToValue> ToValue for Option<T> {
    fn to_value(&self) -> Value {
        self.as_ref().map_or(Value::Null, ToValue::to_value)
    }
}

impl<T: FromValue> FromValue for Option<T> {
    const DB_TYPE: DbType = T::DB_TYPE;

    fn from_value(value: Value) -> Result<Self> {
        if value.is_null() {
            Ok(None)
        } else {
            T::from_value(value).map(Some)
        }
    }
}

impl ToValue for Value {
    fn to_value(&self) -> Value {
        self.clone()
    }
}

impl FromValue for Value {
    const DB_TYPE: DbType = DbType::Object;

    fn from_value(value: Value) -> Result<Self> {
        Ok(value)
    }
}
