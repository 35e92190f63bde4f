//! Oracle.

use crate::characters::DialectKind;
use crate::dialect::{SqlDialect, check_paging, sequence_name, with_extra_arguments};
use crate::parse::SelectStatement;
use sqlweave_core::{ObjectInfo, PagingOptions, Result, SqlQuery};

/// Oracle: sequences for identifiers, ROW_NUMBER paging.
#[derive(Debug, Clone, Copy, Default)]
pub struct OracleDialect;

impl SqlDialect for OracleDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::Oracle
    }

    fn sequence_next_value(&self, sequence: &str) -> Result<String> {
        Ok(format!("{sequence}.NEXTVAL"))
    }

    /// Oracle has no session identity function, so a sequence is required.
    fn build_select_insert_id_query(&self, info: &ObjectInfo) -> Result<SqlQuery> {
        let sequence = sequence_name(info)?;
        Ok(SqlQuery::new(format!("SELECT {sequence}.CURRVAL FROM DUAL")))
    }

    /// Numbers the rows of the original (ordered) query in a derived table.
    ///
    /// The statement is kept intact inside the derived table, so its ORDER BY
    /// still decides the numbering.
    fn page_query(&self, query: &SqlQuery, paging: PagingOptions) -> Result<SqlQuery> {
        check_paging(paging)?;
        let statement = SelectStatement::parse(query.command_text())?;
        let chars = self.characters();
        let next = query.arguments().len();
        let sql = format!(
            "SELECT * FROM (SELECT PagedResults.*, ROW_NUMBER() OVER (ORDER BY ROWNUM) RowNumber \
             FROM ({}) PagedResults) WHERE RowNumber BETWEEN {} AND {}",
            statement.text(),
            chars.parameter_name(next),
            chars.parameter_name(next + 1)
        );
        Ok(with_extra_arguments(
            query,
            sql,
            [paging.offset() + 1, paging.offset() + paging.count()],
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::fixtures::{Customer, Invoice};
    use sqlweave_core::{ConfigurationError, Entity, Error, Value};

    #[test]
    fn test_sequence_insert() {
        let insert = OracleDialect
            .build_insert_query(Invoice::object_info(), &Invoice { id: 0, total: 1.0 })
            .unwrap();
        assert_eq!(
            insert.command_text(),
            "INSERT INTO \"Sales\".\"Invoices\" (\"Id\", \"Total\") VALUES (SEQ_INVOICE.NEXTVAL, :p0)"
        );
    }

    #[test]
    fn test_identity_requires_sequence() {
        assert_eq!(
            OracleDialect
                .build_select_insert_id_query(Invoice::object_info())
                .unwrap()
                .command_text(),
            "SELECT SEQ_INVOICE.CURRVAL FROM DUAL"
        );
        assert!(matches!(
            OracleDialect.build_select_insert_id_query(Customer::object_info()),
            Err(Error::Configuration(ConfigurationError::MissingSequence { .. }))
        ));
    }

    #[test]
    fn test_page_query() {
        let query = SqlQuery::from_values(
            "SELECT \"Id\" FROM \"Customers\" WHERE \"Name\" = :p0 ORDER BY \"Id\"",
            ["Fred"],
        );
        let paged = OracleDialect
            .page_query(&query, PagingOptions::for_page(3, 10).unwrap())
            .unwrap();
        assert_eq!(
            paged.command_text(),
            "SELECT * FROM (SELECT PagedResults.*, ROW_NUMBER() OVER (ORDER BY ROWNUM) RowNumber \
             FROM (SELECT \"Id\" FROM \"Customers\" WHERE \"Name\" = :p0 ORDER BY \"Id\") PagedResults) \
             WHERE RowNumber BETWEEN :p1 AND :p2"
        );
        let values: Vec<_> = paged.arguments().iter().map(|a| a.value.clone()).collect();
        assert_eq!(
            values,
            vec![Value::Text("Fred".into()), Value::BigInt(21), Value::BigInt(30)]
        );
    }
}
