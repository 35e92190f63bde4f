//! Untyped result rows, used by projections.

use crate::error::{Error, Result};
use crate::reader::DataReader;
use crate::value::{FromValue, Value};
use std::sync::Arc;

/// One row with named columns.
///
/// Rows from the same result set share their column list.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    /// Create a row. `values` must line up with `columns`.
    pub fn new(columns: Arc<[String]>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    /// Capture the reader's field names for the current result set.
    pub fn columns_of(reader: &dyn DataReader) -> Arc<[String]> {
        (0..reader.field_count())
            .map(|i| reader.field_name(i).to_string())
            .collect()
    }

    /// Copy the reader's current row.
    pub fn from_reader(reader: &dyn DataReader, columns: Arc<[String]>) -> Self {
        let values = (0..columns.len()).map(|i| reader.value(i)).collect();
        Self { columns, values }
    }

    /// Column names.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Values in column order.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True for a row without columns.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value by column name, ignoring ASCII case.
    pub fn get(&self, column: &str) -> Option<&Value> {
        let index = self
            .columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(column))?;
        self.values.get(index)
    }

    /// Value by index.
    pub fn get_index(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Typed value by column name.
    pub fn get_as<T: FromValue>(&self, column: &str) -> Result<T> {
        let value = self
            .get(column)
            .ok_or_else(|| Error::Mapping(format!("no column named `{column}` in row")))?;
        T::from_value(value.clone())
    }
}
