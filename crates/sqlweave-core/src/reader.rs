//! Forward-only result reading.

use crate::error::BoxError;
use crate::value::Value;
use std::sync::Arc;

/// Forward-only cursor over one or more result sets.
///
/// A freshly returned reader is positioned before the first row of the first
/// result set. [`DataReader::read`] advances to the next row and
/// [`DataReader::next_result`] moves to the next result set.
pub trait DataReader: Send {
    /// Advance to the next row. Returns `false` when the set is exhausted.
    fn read(&mut self) -> Result<bool, BoxError>;

    /// Advance to the next result set. Returns `false` when none remain.
    fn next_result(&mut self) -> Result<bool, BoxError>;

    /// Number of fields in the current result set.
    fn field_count(&self) -> usize;

    /// Name of field `index` in the current result set.
    fn field_name(&self, index: usize) -> &str;

    /// Value of field `index` in the current row.
    fn value(&self, index: usize) -> Value;

    /// Whether field `index` in the current row is NULL.
    fn is_null(&self, index: usize) -> bool {
        self.value(index).is_null()
    }
}

/// One materialized result set.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResultSet {
    columns: Arc<[String]>,
    rows: Vec<Vec<Value>>,
}

impl ResultSet {
    /// Build a result set from column names and rows.
    pub fn new<I, S>(columns: I, rows: Vec<Vec<Value>>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows,
        }
    }

    /// A single-column, single-row set, as returned for scalars.
    pub fn scalar(column: impl Into<String>, value: Value) -> Self {
        Self::new([column.into()], vec![vec![value]])
    }

    /// Column names.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Rows.
    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }
}

/// A [`DataReader`] over result sets already held in memory.
///
/// Hosts whose native driver materializes results can return this directly.
#[derive(Debug, Clone, Default)]
pub struct BufferedReader {
    sets: Vec<ResultSet>,
    set: usize,
    row: Option<usize>,
}

impl BufferedReader {
    /// Create a reader positioned before the first row of the first set.
    pub fn new(sets: Vec<ResultSet>) -> Self {
        Self {
            sets,
            set: 0,
            row: None,
        }
    }

    fn current_set(&self) -> Option<&ResultSet> {
        self.sets.get(self.set)
    }

    fn current_row(&self) -> Option<&[Value]> {
        let row = self.row?;
        self.current_set()?.rows.get(row).map(Vec::as_slice)
    }
}

impl DataReader for BufferedReader {
    fn read(&mut self) -> Result<bool, BoxError> {
        let Some(set) = self.current_set() else {
            return Ok(false);
        };
        let next = self.row.map_or(0, |r| r + 1);
        if next < set.rows.len() {
            self.row = Some(next);
            Ok(true)
        } else {
            self.row = Some(set.rows.len());
            Ok(false)
        }
    }

    fn next_result(&mut self) -> Result<bool, BoxError> {
        if self.set + 1 < self.sets.len() {
            self.set += 1;
            self.row = None;
            Ok(true)
        } else {
            self.set = self.sets.len();
            Ok(false)
        }
    }

    fn field_count(&self) -> usize {
        self.current_set().map_or(0, |s| s.columns.len())
    }

    fn field_name(&self, index: usize) -> &str {
        self.current_set()
            .and_then(|s| s.columns.get(index))
            .map_or("", String::as_str)
    }

    fn value(&self, index: usize) -> Value {
        self.current_row()
            .and_then(|r| r.get(index))
            .cloned()
            .unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_rows_then_sets() {
        let mut reader = BufferedReader::new(vec![
            ResultSet::new(["a"], vec![vec![Value::Int(1)], vec![Value::Int(2)]]),
            ResultSet::scalar("count", Value::BigInt(10)),
        ]);
        assert_eq!(reader.field_name(0), "a");
        assert!(reader.read().unwrap());
        assert_eq!(reader.value(0), Value::Int(1));
        assert!(reader.read().unwrap());
        assert_eq!(reader.value(0), Value::Int(2));
        assert!(!reader.read().unwrap());

        assert!(reader.next_result().unwrap());
        assert_eq!(reader.field_name(0), "count");
        assert!(reader.read().unwrap());
        assert_eq!(reader.value(0), Value::BigInt(10));
        assert!(!reader.next_result().unwrap());
        assert!(!reader.read().unwrap());
    }

    #[test]
    fn test_null_detection_and_out_of_range() {
        let mut reader =
            BufferedReader::new(vec![ResultSet::new(["x"], vec![vec![Value::Null]])]);
        assert!(reader.read().unwrap());
        assert!(reader.is_null(0));
        assert_eq!(reader.value(5), Value::Null);
        assert_eq!(reader.field_name(5), "");
    }
}
