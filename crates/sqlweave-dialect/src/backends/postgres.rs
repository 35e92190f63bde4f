//! PostgreSQL.

use crate::characters::DialectKind;
use crate::dialect::{SqlDialect, sequence_name};
use crate::paging;
use sqlweave_core::{IdentifierStrategy, ObjectInfo, PagingOptions, Result, SqlQuery};

/// PostgreSQL: sequences or serial columns, LIMIT / OFFSET paging.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect;

impl SqlDialect for PostgresDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::Postgres
    }

    fn sequence_next_value(&self, sequence: &str) -> Result<String> {
        Ok(format!("nextval('{sequence}')"))
    }

    fn build_select_insert_id_query(&self, info: &ObjectInfo) -> Result<SqlQuery> {
        if info.identifier_strategy() == IdentifierStrategy::Sequence {
            return Ok(SqlQuery::new(format!(
                "SELECT currval('{}')",
                sequence_name(info)?
            )));
        }
        Ok(SqlQuery::new("SELECT lastval()"))
    }

    fn page_query(&self, query: &SqlQuery, paging: PagingOptions) -> Result<SqlQuery> {
        paging::limit_offset(self.characters(), query, paging)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::fixtures::{Customer, Invoice};
    use sqlweave_core::Entity;

    #[test]
    fn test_sequence_expressions() {
        let insert = PostgresDialect
            .build_insert_query(Invoice::object_info(), &Invoice { id: 0, total: 9.0 })
            .unwrap();
        assert_eq!(
            insert.command_text(),
            "INSERT INTO \"Sales\".\"Invoices\" (\"Id\", \"Total\") VALUES (nextval('SEQ_INVOICE'), :p0)"
        );
        assert_eq!(
            PostgresDialect
                .build_select_insert_id_query(Invoice::object_info())
                .unwrap()
                .command_text(),
            "SELECT currval('SEQ_INVOICE')"
        );
        assert_eq!(
            PostgresDialect
                .build_select_insert_id_query(Customer::object_info())
                .unwrap()
                .command_text(),
            "SELECT lastval()"
        );
    }
}
