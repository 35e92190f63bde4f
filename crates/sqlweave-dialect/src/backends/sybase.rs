//! Sybase ASE and SQL Anywhere.

use crate::characters::DialectKind;
use crate::dialect::{SqlDialect, sequence_name};
use crate::paging;
use sqlweave_core::{Error, IdentifierStrategy, ObjectInfo, PagingOptions, Result, SqlQuery};

/// Sybase ASE. Has no supported way to read back a generated identifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct SybaseDialect;

impl SqlDialect for SybaseDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::Sybase
    }

    fn supports_select_inserted_identifier(&self) -> bool {
        false
    }

    /// Always fails; check [`SqlDialect::supports_select_inserted_identifier`]
    /// first.
    fn build_select_insert_id_query(&self, _info: &ObjectInfo) -> Result<SqlQuery> {
        Err(Error::NotImplemented(
            "Sybase cannot select the inserted identifier",
        ))
    }

    fn page_query(&self, query: &SqlQuery, paging: PagingOptions) -> Result<SqlQuery> {
        paging::top_start_at(query, paging)
    }
}

/// SAP SQL Anywhere.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlAnywhereDialect;

impl SqlDialect for SqlAnywhereDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::SqlAnywhere
    }

    fn sequence_next_value(&self, sequence: &str) -> Result<String> {
        Ok(format!("{sequence}.NEXTVAL"))
    }

    fn build_select_insert_id_query(&self, info: &ObjectInfo) -> Result<SqlQuery> {
        if info.identifier_strategy() == IdentifierStrategy::Sequence {
            return Ok(SqlQuery::new(format!(
                "SELECT {}.CURRVAL",
                sequence_name(info)?
            )));
        }
        Ok(SqlQuery::new("SELECT @@IDENTITY"))
    }

    fn page_query(&self, query: &SqlQuery, paging: PagingOptions) -> Result<SqlQuery> {
        paging::top_start_at(query, paging)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::fixtures::{Customer, Invoice};
    use sqlweave_core::Entity;

    #[test]
    fn test_sybase_identity_not_implemented() {
        assert!(!SybaseDialect.supports_select_inserted_identifier());
        assert!(matches!(
            SybaseDialect.build_select_insert_id_query(Customer::object_info()),
            Err(Error::NotImplemented(_))
        ));
    }

    #[test]
    fn test_sql_anywhere_identity() {
        assert!(SqlAnywhereDialect.supports_select_inserted_identifier());
        assert_eq!(
            SqlAnywhereDialect
                .build_select_insert_id_query(Customer::object_info())
                .unwrap()
                .command_text(),
            "SELECT @@IDENTITY"
        );
        assert_eq!(
            SqlAnywhereDialect
                .build_select_insert_id_query(Invoice::object_info())
                .unwrap()
                .command_text(),
            "SELECT SEQ_INVOICE.CURRVAL"
        );
    }

    #[test]
    fn test_page_query_inlines_window() {
        let query = SqlQuery::from_values("SELECT * FROM Customers WHERE Name = :p0", ["x"]);
        let paged = SqlAnywhereDialect
            .page_query(&query, PagingOptions::for_page(2, 5).unwrap())
            .unwrap();
        assert_eq!(
            paged.command_text(),
            "SELECT TOP 5 START AT 6 * FROM Customers WHERE Name = :p0"
        );
        assert_eq!(paged.arguments().len(), 1);
    }
}
