//! Per-backend SQL generation for sqlweave.
//!
//! `sqlweave-dialect` turns mapped types into SQL text for a specific backend.
//!
//! - [`SqlCharacters`] holds the lexical rules of each backend: identifier
//!   delimiters, parameter prefix, stored-procedure keyword, separator.
//! - [`SqlDialect`] builds SELECT, INSERT, UPDATE, DELETE, count and page
//!   queries. One implementation exists per [`DialectKind`]; use
//!   [`dialect_for`] to pick one at runtime.
//!
//! ```ignore
//! let dialect = dialect_for(DialectKind::Postgres);
//! let query = dialect.build_select_query(Customer::object_info(), 42_i64.into())?;
//! assert_eq!(query.command_text(), r#"SELECT "Id", "Name" FROM "Customers" WHERE "Id" = :p0"#);
//! ```

pub mod backends;
pub mod characters;
pub mod dialect;
mod paging;
pub mod parse;

pub use backends::{
    FirebirdDialect, MsSql2005Dialect, MsSql2012Dialect, MySqlDialect, OracleDialect,
    PostgresDialect, SqlAnywhereDialect, SqliteDialect, SybaseDialect, dialect_for,
};
pub use characters::{DialectKind, SqlCharacters};
pub use dialect::{SqlDialect, build_insert, build_update};
pub use parse::{SelectStatement, code_spans};

#[cfg(test)]
mod tests {
    use super::*;
    use sqlweave_core::{Error, PagingOptions, SqlQuery, UsageError};

    #[test]
    fn test_every_dialect_rejects_paging_none() {
        let query = SqlQuery::new("SELECT * FROM Customers");
        for kind in DialectKind::ALL {
            let dialect = dialect_for(kind);
            assert_eq!(dialect.kind(), kind);
            assert!(
                matches!(
                    dialect.page_query(&query, PagingOptions::NONE),
                    Err(Error::Usage(UsageError::PagingOptionsNone))
                ),
                "{kind} accepted PagingOptions::NONE"
            );
        }
    }

    #[test]
    fn test_every_dialect_pages_and_counts() {
        let query = SqlQuery::new("SELECT Id FROM Customers ORDER BY Id");
        let paging = PagingOptions::for_page(2, 10).unwrap();
        for kind in DialectKind::ALL {
            let dialect = dialect_for(kind);
            let paged = dialect.page_query(&query, paging).unwrap();
            assert_ne!(paged.command_text(), query.command_text(), "{kind}");
            let count = dialect.count_query(&query).unwrap();
            assert_eq!(count.command_text(), "SELECT COUNT(*) FROM Customers", "{kind}");
        }
    }
}
