//! Table and column metadata for mapped types.
//!
//! A mapped type implements [`Entity`], usually through `#[derive(Entity)]`.
//! The derive produces a static [`ObjectInfo`] describing the table, its ordered
//! columns, which column is the identifier and how identifiers are produced,
//! plus index-based getters and setters for instance values.
//!
//! Types can also be mapped by hand with [`ObjectInfo::builder`]:
//!
//! ```ignore
//! impl Entity for Customer {
//!     fn object_info() -> &'static ObjectInfo {
//!         static INFO: OnceLock<ObjectInfo> = OnceLock::new();
//!         INFO.get_or_init(|| {
//!             ObjectInfo::builder("Customer", "Customers")
//!                 .schema("Sales")
//!                 .column(ColumnInfo::new("id", "CustomerId", DbType::Int64)
//!                     .identifier(IdentifierStrategy::DbGenerated))
//!                 .column(ColumnInfo::new("name", "Name", DbType::String))
//!                 .build()
//!         })
//!     }
//!     // ...
//! }
//! ```

use crate::convert::TypeConverters;
use crate::error::{ConfigurationError, Error, Result};
use crate::reader::DataReader;
use crate::query::SqlArgument;
use crate::value::{DbType, Value};
use serde::{Deserialize, Serialize};

/// How the identifier of a new row is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum IdentifierStrategy {
    /// The caller assigns the identifier before insert.
    Assigned,
    /// The database generates it (identity / autoincrement).
    #[default]
    DbGenerated,
    /// The identifier is drawn from a named sequence.
    Sequence,
}

/// Metadata for one mapped column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    /// Column name in the database.
    pub column_name: String,
    /// Rust field name.
    pub property_name: String,
    /// Provider type.
    pub db_type: DbType,
    /// Whether this column is the identifier.
    pub is_identifier: bool,
    /// Whether the column takes part in INSERT.
    pub allow_insert: bool,
    /// Whether the column takes part in UPDATE.
    pub allow_update: bool,
    /// Sequence supplying values when the identifier strategy is `Sequence`.
    pub sequence_name: Option<String>,
    strategy: Option<IdentifierStrategy>,
}

impl ColumnInfo {
    /// A plain insertable and updatable column.
    pub fn new(
        property_name: impl Into<String>,
        column_name: impl Into<String>,
        db_type: DbType,
    ) -> Self {
        Self {
            column_name: column_name.into(),
            property_name: property_name.into(),
            db_type,
            is_identifier: false,
            allow_insert: true,
            allow_update: true,
            sequence_name: None,
            strategy: None,
        }
    }

    /// Mark this column as the identifier.
    ///
    /// Identifier columns are never updated; they are inserted only when the
    /// strategy is `Assigned`.
    pub fn identifier(mut self, strategy: IdentifierStrategy) -> Self {
        self.is_identifier = true;
        self.allow_update = false;
        self.allow_insert = strategy == IdentifierStrategy::Assigned;
        self.strategy = Some(strategy);
        self
    }

    /// Name the sequence used by a `Sequence` identifier.
    pub fn sequence(mut self, name: impl Into<String>) -> Self {
        self.sequence_name = Some(name.into());
        self
    }

    /// Exclude or include the column in INSERT.
    pub fn allow_insert(mut self, allow: bool) -> Self {
        self.allow_insert = allow;
        self
    }

    /// Exclude or include the column in UPDATE.
    pub fn allow_update(mut self, allow: bool) -> Self {
        self.allow_update = allow;
        self
    }
}

/// Table-level metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableInfo {
    /// Table name.
    pub name: String,
    /// Optional schema / owner.
    pub schema: Option<String>,
    /// Ordered columns.
    pub columns: Vec<ColumnInfo>,
    /// Index into `columns` of the identifier.
    pub identifier_index: Option<usize>,
    /// How identifiers are produced.
    pub identifier_strategy: IdentifierStrategy,
}

/// Everything sqlweave knows about a mapped type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInfo {
    type_name: &'static str,
    table: TableInfo,
}

/// Builder for [`ObjectInfo`].
#[derive(Debug)]
pub struct ObjectInfoBuilder {
    type_name: &'static str,
    table_name: String,
    schema: Option<String>,
    columns: Vec<ColumnInfo>,
}

impl ObjectInfoBuilder {
    /// Set the schema.
    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Append a column. Column order is the order of generated SQL.
    pub fn column(mut self, column: ColumnInfo) -> Self {
        self.columns.push(column);
        self
    }

    /// Finish the metadata.
    ///
    /// The first column marked as identifier wins; a type without one can
    /// still be read but not updated, deleted or fetched by identifier.
    pub fn build(self) -> ObjectInfo {
        let identifier_index = self.columns.iter().position(|c| c.is_identifier);
        let identifier_strategy = identifier_index
            .and_then(|i| self.columns[i].strategy)
            .unwrap_or_default();
        ObjectInfo {
            type_name: self.type_name,
            table: TableInfo {
                name: self.table_name,
                schema: self.schema,
                columns: self.columns,
                identifier_index,
                identifier_strategy,
            },
        }
    }
}

impl ObjectInfo {
    /// Start describing a type mapped to `table_name`.
    pub fn builder(type_name: &'static str, table_name: impl Into<String>) -> ObjectInfoBuilder {
        ObjectInfoBuilder {
            type_name,
            table_name: table_name.into(),
            schema: None,
            columns: Vec::new(),
        }
    }

    /// Rust type name, used in errors and logs.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Table metadata.
    pub fn table(&self) -> &TableInfo {
        &self.table
    }

    /// Ordered columns.
    pub fn columns(&self) -> &[ColumnInfo] {
        &self.table.columns
    }

    /// Identifier strategy.
    pub fn identifier_strategy(&self) -> IdentifierStrategy {
        self.table.identifier_strategy
    }

    /// Index of the identifier column.
    pub fn identifier_index(&self) -> Result<usize> {
        self.table.identifier_index.ok_or_else(|| {
            ConfigurationError::MissingIdentifier {
                type_name: self.type_name,
            }
            .into()
        })
    }

    /// The identifier column.
    pub fn identifier_column(&self) -> Result<&ColumnInfo> {
        let index = self.identifier_index()?;
        Ok(&self.table.columns[index])
    }

    /// Find a column by Rust property name.
    pub fn column_for_property(&self, property: &str) -> Result<(usize, &ColumnInfo)> {
        self.table
            .columns
            .iter()
            .enumerate()
            .find(|(_, c)| c.property_name == property)
            .ok_or_else(|| {
                ConfigurationError::UnknownProperty {
                    type_name: self.type_name,
                    property: property.to_string(),
                }
                .into()
            })
    }

    /// Whether a column's value is bound as a parameter on INSERT.
    ///
    /// A sequence identifier is excluded here because its value is inlined
    /// as the dialect's next-value expression.
    pub fn binds_on_insert(&self, column: &ColumnInfo) -> bool {
        if column.is_identifier {
            return self.table.identifier_strategy == IdentifierStrategy::Assigned;
        }
        column.allow_insert
    }

    /// Whether a column is written by a full UPDATE.
    pub fn binds_on_update(&self, column: &ColumnInfo) -> bool {
        column.allow_update && !column.is_identifier
    }

    /// Current identifier of an instance.
    pub fn identifier_value<T: Entity>(&self, instance: &T) -> Result<Value> {
        Ok(instance.get_value(self.identifier_index()?))
    }

    /// True if the instance's identifier is still at its default.
    pub fn has_default_identifier<T: Entity>(&self, instance: &T) -> Result<bool> {
        Ok(self.identifier_value(instance)?.is_default_identifier())
    }

    /// Write a new identifier into an instance.
    pub fn set_identifier_value<T: Entity>(&self, instance: &mut T, value: Value) -> Result<()> {
        instance.set_value(self.identifier_index()?, value)
    }

    /// Arguments bound by INSERT, in column order.
    pub fn insert_arguments<T: Entity>(&self, instance: &T) -> Vec<SqlArgument> {
        self.table
            .columns
            .iter()
            .enumerate()
            .filter(|(_, c)| self.binds_on_insert(c))
            .map(|(i, c)| SqlArgument::new(instance.get_value(i), c.db_type))
            .collect()
    }

    /// Arguments bound by a full UPDATE: the updatable columns in order,
    /// followed by the identifier.
    pub fn update_arguments<T: Entity>(&self, instance: &T) -> Result<Vec<SqlArgument>> {
        let id_index = self.identifier_index()?;
        let mut arguments: Vec<SqlArgument> = self
            .table
            .columns
            .iter()
            .enumerate()
            .filter(|(_, c)| self.binds_on_update(c))
            .map(|(i, c)| SqlArgument::new(instance.get_value(i), c.db_type))
            .collect();
        let id_column = &self.table.columns[id_index];
        arguments.push(SqlArgument::new(instance.get_value(id_index), id_column.db_type));
        Ok(arguments)
    }

    /// Argument for the identifier, typed by the identifier column.
    pub fn identifier_argument(&self, identifier: Value) -> Result<SqlArgument> {
        let column = self.identifier_column()?;
        Ok(SqlArgument::new(identifier, column.db_type))
    }

    /// Match the reader's current fields to mapped columns by name.
    ///
    /// Entry `i` is the column index for reader field `i`, or `None` when the
    /// field is not mapped. Computed once per result set.
    pub fn map_reader_fields(&self, reader: &dyn DataReader) -> Vec<Option<usize>> {
        (0..reader.field_count())
            .map(|field| {
                let name = reader.field_name(field);
                self.table
                    .columns
                    .iter()
                    .position(|c| c.column_name.eq_ignore_ascii_case(name))
            })
            .collect()
    }

    /// Build an instance from the reader's current row.
    pub fn hydrate<T: Entity>(
        &self,
        reader: &dyn DataReader,
        field_map: &[Option<usize>],
        converters: &TypeConverters,
    ) -> Result<T> {
        let mut instance = T::create_instance();
        for (field, column_index) in field_map.iter().enumerate() {
            let Some(column_index) = *column_index else {
                continue;
            };
            let column = &self.table.columns[column_index];
            let raw = if reader.is_null(field) {
                Value::Null
            } else {
                reader.value(field)
            };
            let value = converters.convert_from_db(raw, column.db_type)?;
            instance.set_value(column_index, value).map_err(|e| match e {
                Error::Mapping(msg) => Error::Mapping(format!(
                    "{}.{}: {msg}",
                    self.type_name, column.property_name
                )),
                other => other,
            })?;
        }
        Ok(instance)
    }
}

/// A type mapped to a table.
pub trait Entity: Send + Sized + 'static {
    /// Static metadata for this type.
    fn object_info() -> &'static ObjectInfo;

    /// A blank instance to hydrate into.
    fn create_instance() -> Self;

    /// Value of the column at `index` in [`ObjectInfo::columns`].
    fn get_value(&self, index: usize) -> Value;

    /// Set the column at `index` from a database value.
    fn set_value(&mut self, index: usize, value: Value) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::{BufferedReader, ResultSet};
    use crate::value::FromValue;
    use std::sync::OnceLock;

    #[derive(Debug, Default, PartialEq)]
    struct Invoice {
        id: i64,
        number: String,
        total: f64,
    }

    impl Entity for Invoice {
        fn object_info() -> &'static ObjectInfo {
            static INFO: OnceLock<ObjectInfo> = OnceLock::new();
            INFO.get_or_init(|| {
                ObjectInfo::builder("Invoice", "Invoices")
                    .schema("Sales")
                    .column(
                        ColumnInfo::new("id", "InvoiceId", DbType::Int64)
                            .identifier(IdentifierStrategy::DbGenerated),
                    )
                    .column(ColumnInfo::new("number", "Number", DbType::String).allow_update(false))
                    .column(ColumnInfo::new("total", "Total", DbType::Double))
                    .build()
            })
        }

        fn create_instance() -> Self {
            Self::default()
        }

        fn get_value(&self, index: usize) -> Value {
            match index {
                0 => self.id.into(),
                1 => self.number.clone().into(),
                2 => self.total.into(),
                _ => Value::Null,
            }
        }

        fn set_value(&mut self, index: usize, value: Value) -> Result<()> {
            match index {
                0 => self.id = i64::from_value(value)?,
                1 => self.number = String::from_value(value)?,
                2 => self.total = f64::from_value(value)?,
                _ => {}
            }
            Ok(())
        }
    }

    #[test]
    fn test_builder_locates_identifier() {
        let info = Invoice::object_info();
        assert_eq!(info.identifier_index().unwrap(), 0);
        assert_eq!(info.identifier_strategy(), IdentifierStrategy::DbGenerated);
        assert_eq!(info.table().schema.as_deref(), Some("Sales"));
        assert!(!info.columns()[0].allow_insert);
    }

    #[test]
    fn test_insert_and_update_arguments() {
        let invoice = Invoice {
            id: 9,
            number: "INV-1".into(),
            total: 12.5,
        };
        let info = Invoice::object_info();
        let insert: Vec<Value> = info
            .insert_arguments(&invoice)
            .into_iter()
            .map(|a| a.value)
            .collect();
        assert_eq!(insert, vec![Value::Text("INV-1".into()), Value::Double(12.5)]);

        let update: Vec<Value> = info
            .update_arguments(&invoice)
            .unwrap()
            .into_iter()
            .map(|a| a.value)
            .collect();
        assert_eq!(update, vec![Value::Double(12.5), Value::BigInt(9)]);
    }

    #[test]
    fn test_missing_identifier_is_configuration_error() {
        let info = ObjectInfo::builder("Log", "Logs")
            .column(ColumnInfo::new("message", "Message", DbType::String))
            .build();
        assert!(matches!(
            info.identifier_index(),
            Err(Error::Configuration(ConfigurationError::MissingIdentifier { .. }))
        ));
    }

    #[test]
    fn test_hydrate_matches_columns_by_name() {
        let mut reader = BufferedReader::new(vec![ResultSet::new(
            ["Total", "Unmapped", "invoiceid"],
            vec![vec![Value::Double(3.0), Value::Int(1), Value::Int(77)]],
        )]);
        assert!(reader.read().unwrap());
        let info = Invoice::object_info();
        let map = info.map_reader_fields(&reader);
        assert_eq!(map, vec![Some(2), None, Some(0)]);
        let invoice: Invoice = info
            .hydrate(&reader, &map, &TypeConverters::default())
            .unwrap();
        assert_eq!(
            invoice,
            Invoice {
                id: 77,
                number: String::new(),
                total: 3.0
            }
        );
    }

    #[test]
    fn test_unknown_property() {
        let info = Invoice::object_info();
        assert!(info.column_for_property("total").is_ok());
        assert!(info.column_for_property("missing").is_err());
    }
}
