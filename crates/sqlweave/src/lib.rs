//! sqlweave: a lightweight ORM with dialect-aware SQL and batched sessions.
//!
//! This crate re-exports the pieces an application needs:
//!
//! - Mapping: `#[derive(Entity)]`, [`ObjectInfo`], [`Value`], [`TypeConverters`].
//! - SQL generation: [`SqlDialect`] with one implementation per [`DialectKind`],
//!   and the lexical rules in [`SqlCharacters`].
//! - Commands: [`DbDriver`] turns a [`SqlQuery`] into a [`Command`], combines
//!   queries into one batch and rebinds prepared commands.
//! - Sessions: [`SessionFactory`], [`Session`] and [`ReadOnlySession`].
//!
//! The host supplies a [`Connection`] for its database. Every database call
//! takes an asupersync [`Cx`] and returns an [`Outcome`].
//!
//! ```ignore
//! use sqlweave::prelude::*;
//!
//! #[derive(Entity, Debug, Default)]
//! #[entity(table = "Customers")]
//! struct Customer {
//!     #[column(name = "Id")]
//!     id: i64,
//!     #[column(name = "Name")]
//!     name: String,
//! }
//!
//! let factory = SessionFactory::new(DialectKind::Sqlite, DriverCapabilities::default(), connect);
//! let mut session = factory.session();
//! let mut customer = Customer { id: 0, name: "Ada".into() };
//! session.insert(&cx, &mut customer).await?;
//! let found = session.single::<Customer>(&cx, customer.id).await?;
//! ```

pub use sqlweave_core::{
    BooleanConverter, BoxError, BufferedReader, ColumnInfo, Command, CommandKind,
    ConfigurationError, Connection, Cx, DEFAULT_COMMAND_TIMEOUT, DataReader, DbType, Entity,
    Error, ExecutionError, FromValue, GuidConverter, IdentifierStrategy, IsolationLevel,
    NumericConverter, ObjectDelta, ObjectInfo, ObjectInfoBuilder, Operation, Outcome, PagedResult,
    PagingOptions, Parameter, ParameterDirection, Result, ResultSet, Row, SqlArgument, SqlQuery,
    TableInfo, ToValue, TypeConverter, TypeConverters, UsageError, Value, is_valid_identifier,
    try_outcome, try_result,
};
pub use sqlweave_dialect::{
    DialectKind, FirebirdDialect, MsSql2005Dialect, MsSql2012Dialect, MySqlDialect,
    OracleDialect, PostgresDialect, SqlAnywhereDialect, SqlCharacters, SqlDialect, SqliteDialect,
    SybaseDialect, dialect_for,
};
pub use sqlweave_driver::{DbDriver, DriverCapabilities};
pub use sqlweave_macros::Entity;
pub use sqlweave_session::{
    AnyEntity, ConnectionScope, DeleteListener, IdentifierStrategyListener, Include,
    IncludeMany, IncludeScalar, IncludeSingle, InsertListener, Listeners, ReadOnlySession,
    Session, SessionConfig, SessionFactory, SessionState, Transaction, UpdateListener,
};

/// The crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Everything most applications import.
pub mod prelude {
    pub use crate::{
        Connection, ConnectionScope, Cx, DataReader, DbDriver, DbType, DialectKind,
        DriverCapabilities, Entity, Error, FromValue, IdentifierStrategy, IsolationLevel,
        ObjectDelta, ObjectInfo, Outcome, PagedResult, PagingOptions, ReadOnlySession, Result,
        Row, Session, SessionConfig, SessionFactory, SessionState, SqlArgument, SqlDialect,
        SqlQuery, ToValue, Transaction, UsageError, Value, dialect_for,
    };
}
