//! Conversion between provider values and the shapes mapped types expect.
//!
//! Drivers do not agree on how they return some types: Oracle hands back
//! integers as `NUMBER` text, SQLite stores booleans as integers and GUIDs as
//! text. A [`TypeConverter`] normalizes such values for a target [`DbType`]
//! before hydration or scalar conversion.

use crate::error::{Error, Result};
use crate::value::{DbType, FromValue, Value};
use std::fmt;
use std::sync::Arc;

/// Converts values for a set of target types.
pub trait TypeConverter: Send + Sync + fmt::Debug {
    /// Whether this converter handles `db_type`.
    fn can_convert(&self, db_type: DbType) -> bool;

    /// Normalize a value read from the database. Never called with NULL.
    fn convert_from_db(&self, value: Value, db_type: DbType) -> Result<Value>;

    /// Prepare a value for binding. Passes the value through by default.
    fn convert_to_db(&self, value: Value, _db_type: DbType) -> Result<Value> {
        Ok(value)
    }
}

/// Booleans stored as integers or text.
#[derive(Debug, Clone, Copy, Default)]
pub struct BooleanConverter;

impl TypeConverter for BooleanConverter {
    fn can_convert(&self, db_type: DbType) -> bool {
        db_type == DbType::Boolean
    }

    fn convert_from_db(&self, value: Value, _db_type: DbType) -> Result<Value> {
        bool::from_value(value).map(Value::Bool)
    }
}

/// GUIDs stored as text or 16-byte blobs.
#[derive(Debug, Clone, Copy, Default)]
pub struct GuidConverter;

impl GuidConverter {
    fn parse(text: &str) -> Option<[u8; 16]> {
        let hex: String = text
            .trim()
            .trim_start_matches('{')
            .trim_end_matches('}')
            .chars()
            .filter(|c| *c != '-')
            .collect();
        if hex.len() != 32 {
            return None;
        }
        let mut bytes = [0_u8; 16];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(hex.get(i * 2..i * 2 + 2)?, 16).ok()?;
        }
        Some(bytes)
    }
}

impl TypeConverter for GuidConverter {
    fn can_convert(&self, db_type: DbType) -> bool {
        db_type == DbType::Guid
    }

    fn convert_from_db(&self, value: Value, _db_type: DbType) -> Result<Value> {
        match value {
            Value::Uuid(_) => Ok(value),
            Value::Text(ref s) => Self::parse(s)
                .map(Value::Uuid)
                .ok_or_else(|| Error::Mapping(format!("`{s}` is not a GUID"))),
            Value::Bytes(ref b) => <[u8; 16]>::try_from(b.as_slice())
                .map(Value::Uuid)
                .map_err(|_| Error::Mapping(format!("{} bytes is not a GUID", b.len()))),
            other => Err(Error::Mapping(format!(
                "cannot convert {} to GUID",
                other.type_name()
            ))),
        }
    }
}

/// Integers returned as decimals, doubles or text.
#[derive(Debug, Clone, Copy, Default)]
pub struct NumericConverter;

impl TypeConverter for NumericConverter {
    fn can_convert(&self, db_type: DbType) -> bool {
        matches!(
            db_type,
            DbType::SByte | DbType::Int16 | DbType::Int32 | DbType::Int64
        )
    }

    fn convert_from_db(&self, value: Value, db_type: DbType) -> Result<Value> {
        let wide = value.as_i64().ok_or_else(|| {
            Error::Mapping(format!(
                "cannot convert {} to {db_type:?}",
                value.type_name()
            ))
        })?;
        let out_of_range = || Error::Mapping(format!("{wide} is out of range for {db_type:?}"));
        Ok(match db_type {
            DbType::SByte => Value::TinyInt(i8::try_from(wide).map_err(|_| out_of_range())?),
            DbType::Int16 => Value::SmallInt(i16::try_from(wide).map_err(|_| out_of_range())?),
            DbType::Int32 => Value::Int(i32::try_from(wide).map_err(|_| out_of_range())?),
            _ => Value::BigInt(wide),
        })
    }
}

/// Ordered converter registry. Later registrations take priority.
#[derive(Debug, Clone)]
pub struct TypeConverters {
    converters: Vec<Arc<dyn TypeConverter>>,
}

impl Default for TypeConverters {
    /// Boolean, GUID and integer converters.
    fn default() -> Self {
        Self {
            converters: vec![
                Arc::new(NumericConverter),
                Arc::new(GuidConverter),
                Arc::new(BooleanConverter),
            ],
        }
    }
}

impl TypeConverters {
    /// A registry without any converter; values pass through unchanged.
    pub fn empty() -> Self {
        Self {
            converters: Vec::new(),
        }
    }

    /// Register a converter ahead of the existing ones.
    pub fn register(&mut self, converter: impl TypeConverter + 'static) {
        self.converters.insert(0, Arc::new(converter));
    }

    /// Builder-style [`TypeConverters::register`].
    pub fn with(mut self, converter: impl TypeConverter + 'static) -> Self {
        self.register(converter);
        self
    }

    fn find(&self, db_type: DbType) -> Option<&dyn TypeConverter> {
        self.converters
            .iter()
            .find(|c| c.can_convert(db_type))
            .map(|c| &**c)
    }

    /// Normalize a value read from the database for `db_type`.
    pub fn convert_from_db(&self, value: Value, db_type: DbType) -> Result<Value> {
        if value.is_null() {
            return Ok(value);
        }
        match self.find(db_type) {
            Some(converter) => converter.convert_from_db(value, db_type),
            None => Ok(value),
        }
    }

    /// Prepare a value for binding as `db_type`.
    pub fn convert_to_db(&self, value: Value, db_type: DbType) -> Result<Value> {
        if value.is_null() {
            return Ok(value);
        }
        match self.find(db_type) {
            Some(converter) => converter.convert_to_db(value, db_type),
            None => Ok(value),
        }
    }
}
