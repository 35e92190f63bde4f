//! MySQL and MariaDB.

use crate::characters::DialectKind;
use crate::dialect::SqlDialect;
use crate::paging;
use sqlweave_core::{ObjectInfo, PagingOptions, Result, SqlQuery};

/// MySQL: positional `?` parameters, LIMIT / OFFSET paging.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlDialect;

impl SqlDialect for MySqlDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::MySql
    }

    fn build_select_insert_id_query(&self, _info: &ObjectInfo) -> Result<SqlQuery> {
        Ok(SqlQuery::new("SELECT LAST_INSERT_ID()"))
    }

    fn page_query(&self, query: &SqlQuery, paging: PagingOptions) -> Result<SqlQuery> {
        paging::limit_offset(self.characters(), query, paging)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::fixtures::Customer;
    use sqlweave_core::{Entity, Value};

    #[test]
    fn test_positional_placeholders() {
        let update = MySqlDialect
            .build_update_query(
                Customer::object_info(),
                &Customer {
                    id: 3,
                    name: "Wilma".into(),
                },
            )
            .unwrap();
        assert_eq!(
            update.command_text(),
            "UPDATE `Customers` SET `Name` = ? WHERE `Id` = ?"
        );

        let paged = MySqlDialect
            .page_query(
                &SqlQuery::new("SELECT * FROM `Customers`"),
                PagingOptions::for_page(1, 20).unwrap(),
            )
            .unwrap();
        assert_eq!(paged.command_text(), "SELECT * FROM `Customers` LIMIT ? OFFSET ?");
        assert_eq!(paged.arguments()[0].value, Value::BigInt(20));
        assert_eq!(paged.arguments()[1].value, Value::BigInt(0));
    }
}
