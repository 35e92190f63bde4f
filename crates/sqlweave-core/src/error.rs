//! Error taxonomy shared by every sqlweave crate.
//!
//! Four kinds of failure reach callers:
//!
//! - [`Error::Usage`]: the caller broke an API contract. Raised before any SQL
//!   is sent and never worth retrying.
//! - [`Error::Configuration`]: mapping or SQL-authoring defects, such as a
//!   placeholder count that does not match the argument count.
//! - [`Error::Execution`]: the connection failed while opening, executing or
//!   reading. Wrapped exactly once at the session boundary.
//! - Cancellation is not an error at all: it travels as
//!   `Outcome::Cancelled` so callers can tell "failed" from "stopped".

use std::fmt;

/// Boxed error produced by a host driver.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result alias used throughout sqlweave.
pub type Result<T> = std::result::Result<T, Error>;

/// The single top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A caller contract was violated.
    #[error("invalid usage: {0}")]
    Usage(#[from] UsageError),
    /// Mapping or SQL-authoring defect.
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
    /// A value could not be converted between database and Rust types.
    #[error("mapping error: {0}")]
    Mapping(String),
    /// The dialect has no implementation for the requested operation.
    #[error("not implemented: {0}")]
    NotImplemented(&'static str),
    /// The underlying connection failed.
    #[error(transparent)]
    Execution(#[from] ExecutionError),
}

impl Error {
    /// True if this is a usage error.
    pub fn is_usage(&self) -> bool {
        matches!(self, Error::Usage(_))
    }

    /// True if this is an execution error.
    pub fn is_execution(&self) -> bool {
        matches!(self, Error::Execution(_))
    }

    /// Wrap a driver failure as an execution error.
    pub fn execution(operation: Operation, command_text: &str, source: BoxError) -> Self {
        Error::Execution(ExecutionError {
            operation,
            command_text: command_text.to_string(),
            source,
        })
    }
}

/// Caller contract violations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UsageError {
    /// A required argument was empty or missing.
    #[error("argument `{0}` must not be empty")]
    ArgumentEmpty(&'static str),
    /// The session has been closed.
    #[error("the session has been closed")]
    SessionDisposed,
    /// Paging was requested with `PagingOptions::NONE`.
    #[error("paging requires real paging options, not PagingOptions::NONE")]
    PagingOptionsNone,
    /// Update or delete was attempted on an instance without an identifier.
    #[error("the identifier of {type_name} has not been set")]
    IdentifierNotSet {
        /// Mapped type name.
        type_name: &'static str,
    },
    /// An `Assigned` identifier was left at its default before insert.
    #[error("the identifier of {type_name} must be assigned before insert")]
    IdentifierNotAssigned {
        /// Mapped type name.
        type_name: &'static str,
    },
    /// A generated identifier was already set before insert.
    #[error("the identifier of {type_name} is generated and must not be set before insert")]
    IdentifierAlreadySet {
        /// Mapped type name.
        type_name: &'static str,
    },
    /// An object delta without any change was executed.
    #[error("the object delta for {type_name} contains no changes")]
    EmptyDelta {
        /// Mapped type name.
        type_name: &'static str,
    },
    /// The operation is not supported by the configured driver.
    #[error("not supported: {0}")]
    NotSupported(String),
    /// An include handle was read before `execute_pending_queries` ran.
    #[error("the included value has not been loaded yet; call execute_pending_queries first")]
    IncludeNotResolved,
    /// The value of an include handle was already taken.
    #[error("the included value has already been taken")]
    IncludeAlreadyTaken,
    /// `begin_transaction` was called while a transaction was active.
    #[error("a transaction is already active on this session")]
    TransactionAlreadyActive,
    /// Commit or rollback without a matching active transaction.
    #[error("no matching active transaction")]
    NoActiveTransaction,
    /// No statements were given to combine.
    #[error("at least one query is required")]
    EmptyBatch,
    /// Page number or size was out of range.
    #[error("page and page size must both be at least 1 and the window must end within the 64-bit row range")]
    InvalidPage,
}

/// Mapping and SQL-authoring defects.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    /// Parsed placeholder count differs from the supplied argument count.
    #[error("the command text declares {expected} parameters but {actual} arguments were supplied")]
    ParameterCountMismatch {
        /// Placeholders found in the command text.
        expected: usize,
        /// Arguments supplied.
        actual: usize,
    },
    /// A parameter index was outside the command's parameter collection.
    #[error("parameter index {index} is out of range for a command with {count} parameters")]
    ParameterIndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Parameters on the command.
        count: usize,
    },
    /// More values were supplied than the command has parameters.
    #[error("{supplied} values were supplied for a command with {count} parameters")]
    TooManyParameterValues {
        /// Values supplied.
        supplied: usize,
        /// Parameters on the command.
        count: usize,
    },
    /// The mapped type declares no identifier column.
    #[error("{type_name} has no identifier column")]
    MissingIdentifier {
        /// Mapped type name.
        type_name: &'static str,
    },
    /// A property name did not match any mapped column.
    #[error("{type_name} has no mapped property named `{property}`")]
    UnknownProperty {
        /// Mapped type name.
        type_name: &'static str,
        /// Offending property.
        property: String,
    },
    /// A `Sequence` identifier without a sequence name.
    #[error("{type_name} uses a sequence identifier but no sequence name was mapped")]
    MissingSequence {
        /// Mapped type name.
        type_name: &'static str,
    },
    /// The command text could not be rewritten.
    #[error("cannot rewrite query: {0}")]
    UnparseableQuery(String),
}

/// The I/O step that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Opening the connection.
    Open,
    /// Beginning a transaction.
    BeginTransaction,
    /// Committing.
    Commit,
    /// Rolling back.
    Rollback,
    /// `execute_non_query`.
    ExecuteNonQuery,
    /// `execute_scalar`.
    ExecuteScalar,
    /// `execute_reader`.
    ExecuteReader,
    /// Reading rows from a reader.
    Read,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Open => "open connection",
            Operation::BeginTransaction => "begin transaction",
            Operation::Commit => "commit",
            Operation::Rollback => "rollback",
            Operation::ExecuteNonQuery => "execute non-query",
            Operation::ExecuteScalar => "execute scalar",
            Operation::ExecuteReader => "execute reader",
            Operation::Read => "read results",
        };
        f.write_str(name)
    }
}

/// A failure surfaced by the host connection.
#[derive(Debug, thiserror::Error)]
#[error("failed to {operation}: {source}")]
pub struct ExecutionError {
    /// Which step failed.
    pub operation: Operation,
    /// Command text involved, empty for connection-level steps.
    pub command_text: String,
    /// The driver's original error.
    #[source]
    pub source: BoxError,
}
