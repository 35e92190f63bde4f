//! SQL Server.

use crate::characters::DialectKind;
use crate::dialect::{SqlDialect, sequence_name};
use crate::paging;
use sqlweave_core::{IdentifierStrategy, ObjectInfo, PagingOptions, Result, SqlQuery};

/// SQL Server 2005 and 2008: ROW_NUMBER paging, no sequences.
#[derive(Debug, Clone, Copy, Default)]
pub struct MsSql2005Dialect;

impl SqlDialect for MsSql2005Dialect {
    fn kind(&self) -> DialectKind {
        DialectKind::MsSql2005
    }

    fn build_select_insert_id_query(&self, _info: &ObjectInfo) -> Result<SqlQuery> {
        Ok(SqlQuery::new("SELECT SCOPE_IDENTITY()"))
    }

    fn page_query(&self, query: &SqlQuery, paging: PagingOptions) -> Result<SqlQuery> {
        paging::row_number(self.characters(), query, paging)
    }
}

/// SQL Server 2012 and later: OFFSET / FETCH paging and sequences.
#[derive(Debug, Clone, Copy, Default)]
pub struct MsSql2012Dialect;

impl SqlDialect for MsSql2012Dialect {
    fn kind(&self) -> DialectKind {
        DialectKind::MsSql2012
    }

    fn sequence_next_value(&self, sequence: &str) -> Result<String> {
        Ok(format!("NEXT VALUE FOR {sequence}"))
    }

    fn build_select_insert_id_query(&self, info: &ObjectInfo) -> Result<SqlQuery> {
        if info.identifier_strategy() == IdentifierStrategy::Sequence {
            let sequence = sequence_name(info)?;
            let bare = sequence.rsplit('.').next().unwrap_or(sequence);
            return Ok(SqlQuery::from_values(
                format!(
                    "SELECT current_value FROM sys.sequences WHERE name = {}",
                    self.characters().parameter_name(0)
                ),
                [bare],
            ));
        }
        Ok(SqlQuery::new("SELECT SCOPE_IDENTITY()"))
    }

    fn page_query(&self, query: &SqlQuery, paging: PagingOptions) -> Result<SqlQuery> {
        paging::offset_fetch(self.characters(), query, paging)
    }
}
