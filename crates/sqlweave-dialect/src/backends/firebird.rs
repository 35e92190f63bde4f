//! Firebird.

use crate::characters::DialectKind;
use crate::dialect::{SqlDialect, sequence_name};
use crate::paging;
use sqlweave_core::{ObjectInfo, PagingOptions, Result, SqlQuery};

/// Firebird: generators for identifiers, FIRST / SKIP paging.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirebirdDialect;

impl SqlDialect for FirebirdDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::Firebird
    }

    fn sequence_next_value(&self, sequence: &str) -> Result<String> {
        Ok(format!("GEN_ID({sequence}, 1)"))
    }

    /// Reads the generator's current value, so a sequence must be mapped.
    fn build_select_insert_id_query(&self, info: &ObjectInfo) -> Result<SqlQuery> {
        Ok(SqlQuery::new(format!(
            "SELECT GEN_ID({}, 0) FROM RDB$DATABASE",
            sequence_name(info)?
        )))
    }

    fn page_query(&self, query: &SqlQuery, paging: PagingOptions) -> Result<SqlQuery> {
        paging::first_skip(query, paging)
    }
}
