//! Core types and traits for sqlweave.
//!
//! `sqlweave-core` is the foundation every other sqlweave crate builds on.
//!
//! # Role In The Architecture
//!
//! - **Data model**: [`Value`], [`DbType`], [`SqlArgument`] and [`SqlQuery`] carry
//!   statements and their arguments; [`PagingOptions`] and [`PagedResult`] describe
//!   windows over results; [`ObjectDelta`] describes partial updates.
//! - **Metadata**: the [`Entity`] trait and [`ObjectInfo`] describe how a type maps to
//!   a table. `sqlweave-macros` derives them.
//! - **Native interfaces**: [`Connection`] and [`DataReader`] are implemented by the host
//!   for its database driver. [`BufferedReader`] covers drivers that materialize results.
//! - **Structured concurrency**: re-exports `Cx` and `Outcome` from asupersync so every
//!   database call is cancel-aware.
//!
//! Most applications should use the `sqlweave` facade.

pub use asupersync::{Cx, Outcome};

pub mod connection;
pub mod convert;
pub mod delta;
pub mod error;
pub mod identifiers;
pub mod metadata;
mod outcome;
pub mod query;
pub mod reader;
pub mod row;
pub mod value;

pub use connection::{
    Command, CommandKind, Connection, IsolationLevel, Parameter, ParameterDirection,
};
pub use convert::{
    BooleanConverter, GuidConverter, NumericConverter, TypeConverter, TypeConverters,
};
pub use delta::ObjectDelta;
pub use error::{
    BoxError, ConfigurationError, Error, ExecutionError, Operation, Result, UsageError,
};
pub use identifiers::is_valid_identifier;
pub use metadata::{ColumnInfo, Entity, IdentifierStrategy, ObjectInfo, ObjectInfoBuilder, TableInfo};
pub use query::{DEFAULT_COMMAND_TIMEOUT, PagedResult, PagingOptions, SqlArgument, SqlQuery};
pub use reader::{BufferedReader, DataReader, ResultSet};
pub use row::Row;
pub use value::{DbType, FromValue, ToValue, Value};
