//! SQLite.

use crate::characters::DialectKind;
use crate::dialect::SqlDialect;
use crate::paging;
use sqlweave_core::{ObjectInfo, PagingOptions, Result, SqlQuery};

/// SQLite: rowid identities, LIMIT / OFFSET paging.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDialect;

impl SqlDialect for SqliteDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::Sqlite
    }

    fn build_select_insert_id_query(&self, _info: &ObjectInfo) -> Result<SqlQuery> {
        Ok(SqlQuery::new("SELECT last_insert_rowid()"))
    }

    fn page_query(&self, query: &SqlQuery, paging: PagingOptions) -> Result<SqlQuery> {
        paging::limit_offset(self.characters(), query, paging)
    }
}
