//! One `SqlDialect` implementation per backend.

mod firebird;
mod mssql;
mod mysql;
mod oracle;
mod postgres;
mod sqlite;
mod sybase;

pub use firebird::FirebirdDialect;
pub use mssql::{MsSql2005Dialect, MsSql2012Dialect};
pub use mysql::MySqlDialect;
pub use oracle::OracleDialect;
pub use postgres::PostgresDialect;
pub use sqlite::SqliteDialect;
pub use sybase::{SqlAnywhereDialect, SybaseDialect};

use crate::characters::DialectKind;
use crate::dialect::SqlDialect;
use std::sync::Arc;

/// The dialect implementation for `kind`.
pub fn dialect_for(kind: DialectKind) -> Arc<dyn SqlDialect> {
    match kind {
        DialectKind::MsSql2005 => Arc::new(MsSql2005Dialect),
        DialectKind::MsSql2012 => Arc::new(MsSql2012Dialect),
        DialectKind::Oracle => Arc::new(OracleDialect),
        DialectKind::Sybase => Arc::new(SybaseDialect),
        DialectKind::SqlAnywhere => Arc::new(SqlAnywhereDialect),
        DialectKind::Sqlite => Arc::new(SqliteDialect),
        DialectKind::Postgres => Arc::new(PostgresDialect),
        DialectKind::MySql => Arc::new(MySqlDialect),
        DialectKind::Firebird => Arc::new(FirebirdDialect),
    }
}
