//! The `SqlDialect` trait and the statement builders shared by all backends.

use crate::characters::{DialectKind, SqlCharacters};
use crate::parse::SelectStatement;
use sqlweave_core::{
    ColumnInfo, ConfigurationError, Entity, IdentifierStrategy, ObjectDelta, ObjectInfo,
    PagingOptions, Result, SqlArgument, SqlQuery, UsageError, Value,
};
use std::fmt;

/// Builds backend-specific SQL for mapped types.
///
/// Every builder returns a complete [`SqlQuery`] whose arguments line up with
/// the placeholders in its text. Backends override paging, identity retrieval
/// and sequence expressions; the CRUD builders are shared.
pub trait SqlDialect: Send + Sync + fmt::Debug {
    /// The backend this dialect targets.
    fn kind(&self) -> DialectKind;

    /// Lexical rules of the backend.
    fn characters(&self) -> &'static SqlCharacters {
        SqlCharacters::for_kind(self.kind())
    }

    /// Whether [`SqlDialect::build_select_insert_id_query`] is available.
    fn supports_select_inserted_identifier(&self) -> bool {
        true
    }

    /// Expression yielding the next value of `sequence`, inlined on insert.
    fn sequence_next_value(&self, sequence: &str) -> Result<String> {
        let _ = sequence;
        Err(UsageError::NotSupported(format!("{} does not support sequences", self.kind())).into())
    }

    /// Query returning the identifier generated by the last insert.
    fn build_select_insert_id_query(&self, info: &ObjectInfo) -> Result<SqlQuery>;

    /// Wrap `query` so it returns a single window of rows.
    fn page_query(&self, query: &SqlQuery, paging: PagingOptions) -> Result<SqlQuery>;

    /// `SELECT <columns> FROM <table> WHERE <identifier> = ?`.
    fn build_select_query(&self, info: &ObjectInfo, identifier: Value) -> Result<SqlQuery> {
        let chars = self.characters();
        let id_column = info.identifier_column()?;
        let sql = format!(
            "SELECT {} FROM {} WHERE {} = {}",
            column_list(chars, info.columns()),
            table_name(chars, info),
            chars.escape_sql(&id_column.column_name),
            chars.parameter_name(0)
        );
        Ok(SqlQuery::with_arguments(sql, vec![info.identifier_argument(identifier)?]))
    }

    /// `SELECT <columns> FROM <table>`.
    fn build_select_all_query(&self, info: &ObjectInfo) -> SqlQuery {
        let chars = self.characters();
        SqlQuery::new(format!(
            "SELECT {} FROM {}",
            column_list(chars, info.columns()),
            table_name(chars, info)
        ))
    }

    /// INSERT of the insertable columns in column order.
    ///
    /// A sequence identifier is written as the backend's next-value
    /// expression rather than bound as a parameter.
    fn build_insert_query<T: Entity>(&self, info: &ObjectInfo, instance: &T) -> Result<SqlQuery>
    where
        Self: Sized,
    {
        build_insert(self, info, info.insert_arguments(instance))
    }

    /// UPDATE of the updatable columns, keyed by the identifier.
    fn build_update_query<T: Entity>(&self, info: &ObjectInfo, instance: &T) -> Result<SqlQuery>
    where
        Self: Sized,
    {
        build_update(self, info, info.update_arguments(instance)?)
    }

    /// UPDATE of only the columns named in `delta`.
    fn build_update_delta_query(&self, delta: &ObjectDelta) -> Result<SqlQuery> {
        let info = delta.object_info();
        if delta.is_empty() {
            return Err(UsageError::EmptyDelta {
                type_name: info.type_name(),
            }
            .into());
        }
        let chars = self.characters();
        let mut assignments = Vec::with_capacity(delta.changes().len());
        let mut arguments = Vec::with_capacity(delta.changes().len() + 1);
        for (position, (property, value)) in delta.changes().iter().enumerate() {
            let (_, column) = info.column_for_property(property)?;
            assignments.push(format!(
                "{} = {}",
                chars.escape_sql(&column.column_name),
                chars.parameter_name(position)
            ));
            arguments.push(SqlArgument::new(value.clone(), column.db_type));
        }
        let id_column = info.identifier_column()?;
        let sql = format!(
            "UPDATE {} SET {} WHERE {} = {}",
            table_name(chars, info),
            assignments.join(", "),
            chars.escape_sql(&id_column.column_name),
            chars.parameter_name(arguments.len())
        );
        arguments.push(info.identifier_argument(delta.identifier().clone())?);
        Ok(SqlQuery::with_arguments(sql, arguments))
    }

    /// `DELETE FROM <table> WHERE <identifier> = ?`.
    fn build_delete_query(&self, info: &ObjectInfo, identifier: Value) -> Result<SqlQuery> {
        let chars = self.characters();
        let id_column = info.identifier_column()?;
        let sql = format!(
            "DELETE FROM {} WHERE {} = {}",
            table_name(chars, info),
            chars.escape_sql(&id_column.column_name),
            chars.parameter_name(0)
        );
        Ok(SqlQuery::with_arguments(sql, vec![info.identifier_argument(identifier)?]))
    }

    /// A query counting the rows `query` would return.
    ///
    /// Simple statements get their select list replaced by `COUNT(*)`;
    /// statements using DISTINCT, GROUP BY or a set operator are counted as a
    /// derived table. ORDER BY is dropped. The arguments are kept unchanged.
    fn count_query(&self, query: &SqlQuery) -> Result<SqlQuery> {
        let statement = SelectStatement::parse(query.command_text())?;
        let sql = match statement.from_onwards() {
            Some(from) if !statement.needs_derived_count() => {
                format!("SELECT COUNT(*) FROM {from}")
            }
            _ => format!(
                "SELECT COUNT(*) FROM ({}) {}",
                statement.without_order_by(),
                self.characters().escape_sql("Results")
            ),
        };
        Ok(SqlQuery::with_arguments(sql, query.arguments().to_vec()).with_timeout(query.timeout()))
    }
}

/// Delimited, optionally schema-qualified table name.
pub(crate) fn table_name(chars: &SqlCharacters, info: &ObjectInfo) -> String {
    let table = info.table();
    match &table.schema {
        Some(schema) => format!(
            "{}.{}",
            chars.escape_sql(schema),
            chars.escape_sql(&table.name)
        ),
        None => chars.escape_sql(&table.name),
    }
}

fn column_list(chars: &SqlCharacters, columns: &[ColumnInfo]) -> String {
    columns
        .iter()
        .map(|c| chars.escape_sql(&c.column_name))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Sequence name of the identifier, or a configuration error.
pub(crate) fn sequence_name(info: &ObjectInfo) -> Result<&str> {
    info.identifier_column()?
        .sequence_name
        .as_deref()
        .ok_or_else(|| {
            ConfigurationError::MissingSequence {
                type_name: info.type_name(),
            }
            .into()
        })
}

/// INSERT text for pre-extracted arguments.
///
/// Shared by [`SqlDialect::build_insert_query`] and callers that only hold
/// the dialect as a trait object.
pub fn build_insert<D: SqlDialect + ?Sized>(
    dialect: &D,
    info: &ObjectInfo,
    arguments: Vec<SqlArgument>,
) -> Result<SqlQuery> {
    let chars = dialect.characters();
    let mut columns = Vec::new();
    let mut values = Vec::new();
    let mut position = 0;
    for column in info.columns() {
        if column.is_identifier && info.identifier_strategy() == IdentifierStrategy::Sequence {
            columns.push(chars.escape_sql(&column.column_name));
            values.push(dialect.sequence_next_value(sequence_name(info)?)?);
        } else if info.binds_on_insert(column) {
            columns.push(chars.escape_sql(&column.column_name));
            values.push(chars.parameter_name(position));
            position += 1;
        }
    }
    if position != arguments.len() {
        return Err(ConfigurationError::ParameterCountMismatch {
            expected: position,
            actual: arguments.len(),
        }
        .into());
    }
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table_name(chars, info),
        columns.join(", "),
        values.join(", ")
    );
    Ok(SqlQuery::with_arguments(sql, arguments))
}

/// UPDATE text for pre-extracted arguments (updatable columns, then the
/// identifier).
pub fn build_update<D: SqlDialect + ?Sized>(
    dialect: &D,
    info: &ObjectInfo,
    arguments: Vec<SqlArgument>,
) -> Result<SqlQuery> {
    let chars = dialect.characters();
    let id_column = info.identifier_column()?;
    let assignments: Vec<String> = info
        .columns()
        .iter()
        .filter(|c| info.binds_on_update(c))
        .enumerate()
        .map(|(position, c)| {
            format!(
                "{} = {}",
                chars.escape_sql(&c.column_name),
                chars.parameter_name(position)
            )
        })
        .collect();
    if assignments.is_empty() {
        return Err(UsageError::NotSupported(format!(
            "{} has no updatable columns",
            info.type_name()
        ))
        .into());
    }
    if assignments.len() + 1 != arguments.len() {
        return Err(ConfigurationError::ParameterCountMismatch {
            expected: assignments.len() + 1,
            actual: arguments.len(),
        }
        .into());
    }
    let sql = format!(
        "UPDATE {} SET {} WHERE {} = {}",
        table_name(chars, info),
        assignments.join(", "),
        chars.escape_sql(&id_column.column_name),
        chars.parameter_name(assignments.len())
    );
    Ok(SqlQuery::with_arguments(sql, arguments))
}

/// Reject the "no paging" sentinel.
pub(crate) fn check_paging(paging: PagingOptions) -> Result<()> {
    if paging.is_none() {
        return Err(UsageError::PagingOptionsNone.into());
    }
    Ok(())
}

/// Append paging values as arguments after the query's own.
pub(crate) fn with_extra_arguments(query: &SqlQuery, sql: String, extra: [u64; 2]) -> SqlQuery {
    let mut arguments = query.arguments().to_vec();
    arguments.extend(
        extra
            .iter()
            .map(|v| SqlArgument::from(Value::BigInt(i64::try_from(*v).unwrap_or(i64::MAX)))),
    );
    SqlQuery::with_arguments(sql, arguments).with_timeout(query.timeout())
}
