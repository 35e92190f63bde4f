//! Deferred reads and the handles that receive their results.
//!
//! Queuing a read returns a handle immediately. The handle is filled when the
//! session runs `execute_pending_queries`; until then [`IncludeSingle::take`]
//! and friends fail with [`UsageError::IncludeNotResolved`].

use crate::execution::execution_error;
use sqlweave_core::{
    DataReader, Entity, FromValue, Operation, Result, Row, SqlQuery, TypeConverters, UsageError,
    Value,
};
use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Reads one result set into a handle's slot.
pub(crate) type Resolver =
    Box<dyn FnOnce(&mut dyn DataReader, &TypeConverters, &str) -> Result<()> + Send>;

/// A queued read.
pub(crate) struct PendingQuery {
    pub(crate) query: SqlQuery,
    pub(crate) resolve: Resolver,
}

impl fmt::Debug for PendingQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingQuery")
            .field("query", &self.query)
            .finish_non_exhaustive()
    }
}

enum Slot<V> {
    Pending,
    Ready(V),
    Taken,
}

type SharedSlot<V> = Arc<Mutex<Slot<V>>>;

fn lock<V>(slot: &Mutex<Slot<V>>) -> MutexGuard<'_, Slot<V>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

fn fill<V>(slot: &Mutex<Slot<V>>, value: V) {
    *lock(slot) = Slot::Ready(value);
}

fn take<V>(slot: &Mutex<Slot<V>>) -> Result<V> {
    let mut guard = lock(slot);
    match std::mem::replace(&mut *guard, Slot::Taken) {
        Slot::Ready(value) => Ok(value),
        Slot::Pending => {
            *guard = Slot::Pending;
            Err(UsageError::IncludeNotResolved.into())
        }
        Slot::Taken => Err(UsageError::IncludeAlreadyTaken.into()),
    }
}

fn state_name<V>(slot: &Mutex<Slot<V>>) -> &'static str {
    match *lock(slot) {
        Slot::Pending => "pending",
        Slot::Ready(_) => "ready",
        Slot::Taken => "taken",
    }
}

fn read_row(reader: &mut dyn DataReader, command_text: &str) -> Result<bool> {
    reader
        .read()
        .map_err(|e| execution_error(Operation::Read, command_text, e))
}

fn read_entities<T: Entity>(
    reader: &mut dyn DataReader,
    converters: &TypeConverters,
    command_text: &str,
    limit: Option<usize>,
) -> Result<Vec<T>> {
    let info = T::object_info();
    let field_map = info.map_reader_fields(&*reader);
    let mut results = Vec::new();
    while limit.is_none_or(|n| results.len() < n) && read_row(reader, command_text)? {
        results.push(info.hydrate::<T>(&*reader, &field_map, converters)?);
    }
    Ok(results)
}

macro_rules! handle {
    ($(#[$doc:meta])* $name:ident, $value:ty) => {
        $(#[$doc])*
        pub struct $name<T> {
            slot: SharedSlot<$value>,
            _marker: PhantomData<fn() -> T>,
        }

        impl<T> $name<T> {
            fn unresolved() -> Self {
                Self {
                    slot: Arc::new(Mutex::new(Slot::Pending)),
                    _marker: PhantomData,
                }
            }

            /// True once the batch holding this read has run.
            pub fn is_resolved(&self) -> bool {
                !matches!(*lock(&self.slot), Slot::Pending)
            }

            /// Move the value out. Each handle yields its value once.
            pub fn take(&self) -> Result<$value> {
                take(&self.slot)
            }
        }

        impl<T> fmt::Debug for $name<T> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_struct(stringify!($name))
                    .field("state", &state_name(&self.slot))
                    .finish()
            }
        }
    };
}

handle!(
    /// Handle to at most one instance of `T`.
    IncludeSingle,
    Option<T>
);

handle!(
    /// Handle to every row of a result set, hydrated as `T`.
    IncludeMany,
    Vec<T>
);

handle!(
    /// Handle to the first column of the first row, converted to `T`.
    IncludeScalar,
    T
);

impl<T: Entity> IncludeSingle<T> {
    pub(crate) fn queue(query: SqlQuery) -> (Self, PendingQuery) {
        let handle = Self::unresolved();
        let slot = Arc::clone(&handle.slot);
        let resolve: Resolver = Box::new(move |reader, converters, text| {
            let mut rows = read_entities::<T>(reader, converters, text, Some(1))?;
            fill(&slot, rows.pop());
            Ok(())
        });
        (handle, PendingQuery { query, resolve })
    }
}

impl<T: Entity> IncludeMany<T> {
    pub(crate) fn queue(query: SqlQuery) -> (Self, PendingQuery) {
        let handle = Self::unresolved();
        let slot = Arc::clone(&handle.slot);
        let resolve: Resolver = Box::new(move |reader, converters, text| {
            fill(&slot, read_entities::<T>(reader, converters, text, None)?);
            Ok(())
        });
        (handle, PendingQuery { query, resolve })
    }
}

impl IncludeMany<Row> {
    /// Untyped rows, for projections.
    pub(crate) fn queue_rows(query: SqlQuery) -> (Self, PendingQuery) {
        let handle = Self::unresolved();
        let slot = Arc::clone(&handle.slot);
        let resolve: Resolver = Box::new(move |reader, _, text| {
            let columns = Row::columns_of(&*reader);
            let mut rows = Vec::new();
            while read_row(reader, text)? {
                rows.push(Row::from_reader(&*reader, Arc::clone(&columns)));
            }
            fill(&slot, rows);
            Ok(())
        });
        (handle, PendingQuery { query, resolve })
    }
}

impl<T: FromValue + Send + 'static> IncludeScalar<T> {
    pub(crate) fn queue(query: SqlQuery) -> (Self, PendingQuery) {
        let handle = Self::unresolved();
        let slot = Arc::clone(&handle.slot);
        let resolve: Resolver = Box::new(move |reader, converters, text| {
            let raw = if read_row(reader, text)? && reader.field_count() > 0 {
                reader.value(0)
            } else {
                Value::Null
            };
            let value = converters.convert_from_db(raw, T::DB_TYPE)?;
            fill(&slot, T::from_value(value)?);
            Ok(())
        });
        (handle, PendingQuery { query, resolve })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlweave_core::{BufferedReader, ColumnInfo, DbType, Error, ObjectInfo, ResultSet};
    use std::sync::OnceLock;

    #[derive(Debug, Default, PartialEq)]
    struct Tag {
        id: i64,
        label: String,
    }

    impl Entity for Tag {
        fn object_info() -> &'static ObjectInfo {
            static INFO: OnceLock<ObjectInfo> = OnceLock::new();
            INFO.get_or_init(|| {
                ObjectInfo::builder("Tag", "Tags")
                    .column(ColumnInfo::new("id", "Id", DbType::Int64).identifier(
                        sqlweave_core::IdentifierStrategy::DbGenerated,
                    ))
                    .column(ColumnInfo::new("label", "Label", DbType::String))
                    .build()
            })
        }

        fn create_instance() -> Self {
            Self::default()
        }

        fn get_value(&self, index: usize) -> Value {
            match index {
                0 => self.id.into(),
                _ => self.label.clone().into(),
            }
        }

        fn set_value(&mut self, index: usize, value: Value) -> Result<()> {
            match index {
                0 => self.id = i64::from_value(value)?,
                _ => self.label = String::from_value(value)?,
            }
            Ok(())
        }
    }

    fn tags() -> BufferedReader {
        BufferedReader::new(vec![ResultSet::new(
            ["Label", "Id"],
            vec![
                vec![Value::from("red"), Value::BigInt(1)],
                vec![Value::from("blue"), Value::BigInt(2)],
            ],
        )])
    }

    #[test]
    fn test_unresolved_handle_reports_not_ready() {
        let (handle, _pending) = IncludeMany::<Tag>::queue(SqlQuery::new("SELECT * FROM Tags"));
        assert!(!handle.is_resolved());
        assert!(matches!(
            handle.take(),
            Err(Error::Usage(UsageError::IncludeNotResolved))
        ));
        assert_eq!(format!("{handle:?}"), r#"IncludeMany { state: "pending" }"#);
    }

    #[test]
    fn test_many_hydrates_by_column_name() {
        let (handle, pending) = IncludeMany::<Tag>::queue(SqlQuery::new("SELECT * FROM Tags"));
        let mut reader = tags();
        (pending.resolve)(&mut reader, &TypeConverters::default(), "SELECT * FROM Tags").unwrap();
        assert!(handle.is_resolved());
        let rows = handle.take().unwrap();
        assert_eq!(
            rows,
            vec![
                Tag { id: 1, label: "red".into() },
                Tag { id: 2, label: "blue".into() }
            ]
        );
        assert!(matches!(
            handle.take(),
            Err(Error::Usage(UsageError::IncludeAlreadyTaken))
        ));
    }

    #[test]
    fn test_single_takes_first_row_only() {
        let (handle, pending) = IncludeSingle::<Tag>::queue(SqlQuery::new("SELECT * FROM Tags"));
        let mut reader = tags();
        (pending.resolve)(&mut reader, &TypeConverters::default(), "").unwrap();
        assert_eq!(handle.take().unwrap().map(|t| t.id), Some(1));
    }

    #[test]
    fn test_scalar_of_empty_set() {
        let (count, pending) = IncludeScalar::<Option<i64>>::queue(SqlQuery::new("SELECT 1"));
        let mut reader = BufferedReader::new(vec![ResultSet::new(["n"], Vec::new())]);
        (pending.resolve)(&mut reader, &TypeConverters::default(), "").unwrap();
        assert_eq!(count.take().unwrap(), None);

        let (count, pending) = IncludeScalar::<i64>::queue(SqlQuery::new("SELECT COUNT(*) FROM t"));
        let mut reader = BufferedReader::new(vec![ResultSet::scalar("n", Value::Int(3))]);
        (pending.resolve)(&mut reader, &TypeConverters::default(), "").unwrap();
        assert_eq!(count.take().unwrap(), 3);
    }
}
