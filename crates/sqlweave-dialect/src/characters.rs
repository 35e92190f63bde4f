//! Per-backend lexical rules.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which database backend a dialect targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialectKind {
    /// SQL Server 2005 / 2008 (ROW_NUMBER paging).
    MsSql2005,
    /// SQL Server 2012 and later (OFFSET / FETCH paging, sequences).
    MsSql2012,
    /// Oracle.
    Oracle,
    /// Sybase ASE.
    Sybase,
    /// SAP SQL Anywhere.
    SqlAnywhere,
    /// SQLite.
    Sqlite,
    /// PostgreSQL.
    Postgres,
    /// MySQL / MariaDB.
    MySql,
    /// Firebird.
    Firebird,
}

impl DialectKind {
    /// Every supported backend.
    pub const ALL: [DialectKind; 9] = [
        DialectKind::MsSql2005,
        DialectKind::MsSql2012,
        DialectKind::Oracle,
        DialectKind::Sybase,
        DialectKind::SqlAnywhere,
        DialectKind::Sqlite,
        DialectKind::Postgres,
        DialectKind::MySql,
        DialectKind::Firebird,
    ];

    /// Lexical rules for this backend.
    pub fn characters(self) -> &'static SqlCharacters {
        SqlCharacters::for_kind(self)
    }
}

impl fmt::Display for DialectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DialectKind::MsSql2005 => "SQL Server 2005",
            DialectKind::MsSql2012 => "SQL Server 2012",
            DialectKind::Oracle => "Oracle",
            DialectKind::Sybase => "Sybase",
            DialectKind::SqlAnywhere => "SQL Anywhere",
            DialectKind::Sqlite => "SQLite",
            DialectKind::Postgres => "PostgreSQL",
            DialectKind::MySql => "MySQL",
            DialectKind::Firebird => "Firebird",
        };
        f.write_str(name)
    }
}

/// Identifier quoting, parameter syntax and statement rules of one backend.
///
/// One immutable static exists per backend; [`SqlCharacters::for_kind`]
/// always returns the same reference for a given kind.
#[derive(Debug, PartialEq, Eq)]
pub struct SqlCharacters {
    /// Opening identifier delimiter.
    pub left_delimiter: &'static str,
    /// Closing identifier delimiter.
    pub right_delimiter: &'static str,
    /// Parameter prefix, e.g. `@`, `:` or `?`.
    pub sql_parameter: &'static str,
    /// False for purely positional `?` parameters.
    pub supports_named_parameters: bool,
    /// Keyword that invokes a stored procedure; empty if unsupported.
    pub stored_procedure_invocation_command: &'static str,
    /// Separator between statements in one batch.
    pub statement_separator: &'static str,
}

static MSSQL: SqlCharacters = SqlCharacters {
    left_delimiter: "[",
    right_delimiter: "]",
    sql_parameter: "@",
    supports_named_parameters: true,
    stored_procedure_invocation_command: "EXEC",
    statement_separator: ";",
};

static ORACLE: SqlCharacters = SqlCharacters {
    left_delimiter: "\"",
    right_delimiter: "\"",
    sql_parameter: ":",
    supports_named_parameters: true,
    stored_procedure_invocation_command: "CALL",
    statement_separator: ";",
};

static SYBASE: SqlCharacters = SqlCharacters {
    left_delimiter: "\"",
    right_delimiter: "\"",
    sql_parameter: ":",
    supports_named_parameters: true,
    stored_procedure_invocation_command: "EXEC",
    statement_separator: ";",
};

static SQLITE: SqlCharacters = SqlCharacters {
    left_delimiter: "\"",
    right_delimiter: "\"",
    sql_parameter: "@",
    supports_named_parameters: true,
    stored_procedure_invocation_command: "",
    statement_separator: ";",
};

static POSTGRES: SqlCharacters = SqlCharacters {
    left_delimiter: "\"",
    right_delimiter: "\"",
    sql_parameter: ":",
    supports_named_parameters: true,
    stored_procedure_invocation_command: "CALL",
    statement_separator: ";",
};

static MYSQL: SqlCharacters = SqlCharacters {
    left_delimiter: "`",
    right_delimiter: "`",
    sql_parameter: "?",
    supports_named_parameters: false,
    stored_procedure_invocation_command: "CALL",
    statement_separator: ";",
};

static FIREBIRD: SqlCharacters = SqlCharacters {
    left_delimiter: "\"",
    right_delimiter: "\"",
    sql_parameter: "@",
    supports_named_parameters: true,
    stored_procedure_invocation_command: "EXECUTE PROCEDURE",
    statement_separator: ";",
};

impl SqlCharacters {
    /// The static rules for `kind`.
    pub fn for_kind(kind: DialectKind) -> &'static SqlCharacters {
        match kind {
            DialectKind::MsSql2005 | DialectKind::MsSql2012 => &MSSQL,
            DialectKind::Oracle => &ORACLE,
            DialectKind::Sybase | DialectKind::SqlAnywhere => &SYBASE,
            DialectKind::Sqlite => &SQLITE,
            DialectKind::Postgres => &POSTGRES,
            DialectKind::MySql => &MYSQL,
            DialectKind::Firebird => &FIREBIRD,
        }
    }

    /// Whether stored procedures can be invoked by keyword.
    pub fn supports_stored_procedures(&self) -> bool {
        !self.stored_procedure_invocation_command.is_empty()
    }

    /// Delimit an identifier, each dot-separated part separately.
    ///
    /// `dbo.Customers` becomes `[dbo].[Customers]` on SQL Server. Parts that
    /// are already delimited are left alone.
    pub fn escape_sql(&self, identifier: &str) -> String {
        identifier
            .split('.')
            .map(|part| {
                if part.starts_with(self.left_delimiter) && part.ends_with(self.right_delimiter) {
                    part.to_string()
                } else {
                    format!("{}{}{}", self.left_delimiter, part, self.right_delimiter)
                }
            })
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Placeholder for the argument at `position`: `@p0`, `:p3` or `?`.
    pub fn parameter_name(&self, position: usize) -> String {
        if self.supports_named_parameters {
            format!("{}p{}", self.sql_parameter, position)
        } else {
            self.sql_parameter.to_string()
        }
    }
}
