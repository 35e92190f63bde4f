//! The native connection interface a host implements.
//!
//! sqlweave never speaks a wire protocol itself. The host supplies a
//! [`Connection`] for its database; the session drives it with fully built
//! [`Command`]s and reads results back through a [`DataReader`].
//!
//! All I/O methods take `&Cx` and return `Outcome<T, BoxError>` so cancellation
//! is visible to the caller and distinct from failure.

use crate::error::BoxError;
use crate::reader::DataReader;
use crate::value::{DbType, Value};
use asupersync::{Cx, Outcome};
use serde::{Deserialize, Serialize};
use std::future::Future;

/// Transaction isolation level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum IsolationLevel {
    /// Dirty reads allowed.
    ReadUncommitted,
    /// Only committed data is visible.
    #[default]
    ReadCommitted,
    /// Rows read stay stable.
    RepeatableRead,
    /// Full serializability.
    Serializable,
    /// Row versioning (SQL Server).
    Snapshot,
}

impl IsolationLevel {
    /// Keyword form used in `SET TRANSACTION ISOLATION LEVEL`.
    pub const fn as_sql(&self) -> &'static str {
        match self {
            IsolationLevel::ReadUncommitted => "READ UNCOMMITTED",
            IsolationLevel::ReadCommitted => "READ COMMITTED",
            IsolationLevel::RepeatableRead => "REPEATABLE READ",
            IsolationLevel::Serializable => "SERIALIZABLE",
            IsolationLevel::Snapshot => "SNAPSHOT",
        }
    }
}

/// How the command text is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CommandKind {
    /// Plain SQL text.
    #[default]
    Text,
    /// The text is a bare stored procedure name.
    StoredProcedure,
}

/// Parameter direction. Only input parameters are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ParameterDirection {
    /// Input parameter.
    #[default]
    Input,
}

/// A named, typed command parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    /// Parameter name without prefix, e.g. `p0` or `Parameter0`.
    pub name: String,
    /// Bound value. `Value::Null` is the database NULL.
    pub value: Value,
    /// Provider type.
    pub db_type: DbType,
    /// Always `Input`.
    pub direction: ParameterDirection,
}

impl Parameter {
    /// Create an input parameter.
    pub fn new(name: impl Into<String>, value: Value, db_type: DbType) -> Self {
        Self {
            name: name.into(),
            value,
            db_type,
            direction: ParameterDirection::Input,
        }
    }
}

/// A command ready for execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    /// SQL text, or the procedure name for stored procedures.
    pub text: String,
    /// How `text` is interpreted.
    pub kind: CommandKind,
    /// Timeout in seconds; `None` when the driver does not support timeouts.
    pub timeout: Option<u32>,
    /// Parameters in binding order.
    pub parameters: Vec<Parameter>,
}

impl Command {
    /// A text command without parameters.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: CommandKind::Text,
            timeout: None,
            parameters: Vec::new(),
        }
    }

    /// True if this command invokes a stored procedure.
    pub fn is_stored_procedure(&self) -> bool {
        self.kind == CommandKind::StoredProcedure
    }
}

/// A connection to one database, implemented by the host.
///
/// Implementations should report driver failures as `Outcome::Err` and honor
/// `cx` for cancellation. Errors are wrapped by the session with the operation
/// and command text, so implementations need not add that context.
pub trait Connection: Send {
    /// Reader type returned by [`Connection::execute_reader`].
    type Reader: DataReader;

    /// Open the connection.
    fn open(&mut self, cx: &Cx) -> impl Future<Output = Outcome<(), BoxError>> + Send;

    /// Close the connection. Must be safe to call when already closed.
    fn close(&mut self);

    /// Begin a transaction.
    fn begin_transaction(
        &mut self,
        cx: &Cx,
        isolation: Option<IsolationLevel>,
    ) -> impl Future<Output = Outcome<(), BoxError>> + Send;

    /// Commit the active transaction.
    fn commit(&mut self, cx: &Cx) -> impl Future<Output = Outcome<(), BoxError>> + Send;

    /// Roll back the active transaction.
    fn rollback(&mut self, cx: &Cx) -> impl Future<Output = Outcome<(), BoxError>> + Send;

    /// Execute a command, returning the affected row count.
    fn execute_non_query(
        &mut self,
        cx: &Cx,
        command: &Command,
    ) -> impl Future<Output = Outcome<u64, BoxError>> + Send;

    /// Execute a command, returning the first column of the first row.
    fn execute_scalar(
        &mut self,
        cx: &Cx,
        command: &Command,
    ) -> impl Future<Output = Outcome<Value, BoxError>> + Send;

    /// Execute a command and return a reader over its result sets.
    fn execute_reader(
        &mut self,
        cx: &Cx,
        command: &Command,
    ) -> impl Future<Output = Outcome<Self::Reader, BoxError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_isolation_level_sql() {
        assert_eq!(IsolationLevel::default(), IsolationLevel::ReadCommitted);
        assert_eq!(IsolationLevel::Serializable.as_sql(), "SERIALIZABLE");
    }

    #[test]
    fn test_text_command_defaults() {
        let command = Command::text("SELECT 1");
        assert_eq!(command.kind, CommandKind::Text);
        assert!(!command.is_stored_procedure());
        assert!(command.parameters.is_empty());
        assert_eq!(command.timeout, None);
    }
}
