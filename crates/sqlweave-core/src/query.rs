//! Parameterized queries, arguments and paging.

use crate::error::{Result, UsageError};
use crate::value::{DbType, Value};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Command timeout applied when a query does not specify one, in seconds.
pub const DEFAULT_COMMAND_TIMEOUT: u32 = 30;

/// A single bound argument: the value plus its provider type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqlArgument {
    /// The value to bind. `Value::Null` binds the database NULL.
    pub value: Value,
    /// Provider type of the parameter.
    pub db_type: DbType,
}

impl SqlArgument {
    /// Create an argument with an explicit provider type.
    pub fn new(value: impl Into<Value>, db_type: DbType) -> Self {
        Self {
            value: value.into(),
            db_type,
        }
    }
}

impl From<Value> for SqlArgument {
    fn from(value: Value) -> Self {
        let db_type = value.db_type();
        Self { value, db_type }
    }
}

/// Command text plus its ordered arguments.
///
/// Arguments bind positionally to the placeholders in the text, so their
/// order is significant. Two queries are equal when their text matches and
/// their argument values match position by position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqlQuery {
    command_text: String,
    arguments: Vec<SqlArgument>,
    timeout: u32,
}

impl SqlQuery {
    /// Create a query without arguments.
    pub fn new(command_text: impl Into<String>) -> Self {
        Self::with_arguments(command_text, Vec::new())
    }

    /// Create a query with arguments.
    pub fn with_arguments(command_text: impl Into<String>, arguments: Vec<SqlArgument>) -> Self {
        Self {
            command_text: command_text.into(),
            arguments,
            timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }

    /// Create a query, inferring provider types from the values.
    ///
    /// ```ignore
    /// let query = SqlQuery::from_values("SELECT * FROM Customers WHERE Id = @p0", [42_i64]);
    /// ```
    pub fn from_values<I, V>(command_text: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let arguments = values
            .into_iter()
            .map(|value| SqlArgument::from(value.into()))
            .collect();
        Self::with_arguments(command_text, arguments)
    }

    /// The command text.
    pub fn command_text(&self) -> &str {
        &self.command_text
    }

    /// The ordered arguments.
    pub fn arguments(&self) -> &[SqlArgument] {
        &self.arguments
    }

    /// Consume the query, returning its parts.
    pub fn into_parts(self) -> (String, Vec<SqlArgument>) {
        (self.command_text, self.arguments)
    }

    /// Command timeout in seconds.
    pub fn timeout(&self) -> u32 {
        self.timeout
    }

    /// Change the command timeout.
    pub fn set_timeout(&mut self, seconds: u32) {
        self.timeout = seconds;
    }

    /// Builder-style variant of [`SqlQuery::set_timeout`].
    pub fn with_timeout(mut self, seconds: u32) -> Self {
        self.timeout = seconds;
        self
    }
}

impl PartialEq for SqlQuery {
    fn eq(&self, other: &Self) -> bool {
        self.command_text == other.command_text
            && self.arguments.len() == other.arguments.len()
            && self
                .arguments
                .iter()
                .zip(&other.arguments)
                .all(|(a, b)| a.value == b.value)
    }
}

impl fmt::Display for SqlQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.command_text)
    }
}

/// Which window of a result to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PagingOptions {
    offset: u64,
    count: u64,
}

impl PagingOptions {
    /// The "no paging" sentinel. Rejected by every paging operation.
    pub const NONE: PagingOptions = PagingOptions {
        offset: 0,
        count: 0,
    };

    /// Options for a 1-based page number and page size.
    pub fn for_page(page: u64, results_per_page: u64) -> Result<Self> {
        if page < 1 {
            return Err(UsageError::InvalidPage.into());
        }
        let offset = (page - 1)
            .checked_mul(results_per_page)
            .ok_or(UsageError::InvalidPage)?;
        Self::skip_take(offset, results_per_page)
    }

    /// Skip `skip` rows and take the next `take`.
    ///
    /// The last row, `skip + take`, must fit in a signed 64-bit bind value.
    pub fn skip_take(skip: u64, take: u64) -> Result<Self> {
        let last = skip.checked_add(take).ok_or(UsageError::InvalidPage)?;
        if take < 1 || i64::try_from(last).is_err() {
            return Err(UsageError::InvalidPage.into());
        }
        Ok(Self {
            offset: skip,
            count: take,
        })
    }

    /// Rows to skip.
    pub const fn offset(&self) -> u64 {
        self.offset
    }

    /// Rows to return.
    pub const fn count(&self) -> u64 {
        self.count
    }

    /// True for [`PagingOptions::NONE`].
    pub const fn is_none(&self) -> bool {
        self.count == 0
    }

    /// 1-based page number these options describe.
    pub const fn page(&self) -> u64 {
        if self.count == 0 {
            0
        } else {
            self.offset / self.count + 1
        }
    }
}

/// One page of results plus the totals needed to navigate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PagedResult<T> {
    page: u64,
    results_per_page: u64,
    total_results: u64,
    results: Vec<T>,
}

impl<T> PagedResult<T> {
    /// Assemble a paged result.
    pub fn new(page: u64, results_per_page: u64, total_results: u64, results: Vec<T>) -> Self {
        Self {
            page,
            results_per_page,
            total_results,
            results,
        }
    }

    /// The 1-based page number.
    pub fn page(&self) -> u64 {
        self.page
    }

    /// Requested page size.
    pub fn results_per_page(&self) -> u64 {
        self.results_per_page
    }

    /// Rows matched by the unpaged query.
    pub fn total_results(&self) -> u64 {
        self.total_results
    }

    /// Rows on this page.
    pub fn results(&self) -> &[T] {
        &self.results
    }

    /// Take the rows on this page.
    pub fn into_results(self) -> Vec<T> {
        self.results
    }

    /// Number of pages needed for all results.
    pub fn total_pages(&self) -> u64 {
        if self.results_per_page == 0 {
            return 0;
        }
        self.total_results.div_ceil(self.results_per_page)
    }

    /// True if a later page exists.
    pub fn more_results_available(&self) -> bool {
        self.page < self.total_pages()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_query_equality_ignores_db_type_and_timeout() {
        let a = SqlQuery::from_values("SELECT * FROM T WHERE Id = @p0", [1_i32]);
        let b = SqlQuery::with_arguments(
            "SELECT * FROM T WHERE Id = @p0",
            vec![SqlArgument::new(1_i32, DbType::Int64)],
        )
        .with_timeout(90);
        assert_eq!(a, b);
    }

    #[test]
    fn test_query_equality_is_positional() {
        let a = SqlQuery::from_values("X", [1_i32, 2]);
        let b = SqlQuery::from_values("X", [2_i32, 1]);
        assert_ne!(a, b);
        assert_ne!(a, SqlQuery::from_values("X", [1_i32]));
    }

    #[test]
    fn test_default_timeout() {
        let mut query = SqlQuery::new("SELECT 1");
        assert_eq!(query.timeout(), DEFAULT_COMMAND_TIMEOUT);
        query.set_timeout(5);
        assert_eq!(query.timeout(), 5);
    }

    #[test]
    fn test_paging_for_page() {
        let paging = PagingOptions::for_page(3, 25).unwrap();
        assert_eq!(paging.offset(), 50);
        assert_eq!(paging.count(), 25);
        assert_eq!(paging.page(), 3);
        assert!(!paging.is_none());
        assert!(PagingOptions::for_page(0, 25).is_err());
        assert!(PagingOptions::skip_take(10, 0).is_err());
        assert!(PagingOptions::NONE.is_none());
    }

    #[test]
    fn test_paging_rejects_windows_past_the_bind_range() {
        for result in [
            PagingOptions::skip_take(u64::MAX, 1),
            PagingOptions::skip_take(i64::MAX as u64, 1),
            PagingOptions::for_page(u64::MAX, 2),
            PagingOptions::for_page(2, u64::MAX),
        ] {
            assert!(matches!(result, Err(Error::Usage(UsageError::InvalidPage))));
        }
        let last = PagingOptions::skip_take(i64::MAX as u64 - 1, 1).unwrap();
        assert_eq!(last.offset() + last.count(), i64::MAX as u64);
    }

    #[test]
    fn test_paged_result_navigation() {
        let result = PagedResult::new(2, 10, 25, vec![1, 2, 3]);
        assert_eq!(result.total_pages(), 3);
        assert!(result.more_results_available());
        let last = PagedResult::new(3, 10, 25, vec![1]);
        assert!(!last.more_results_available());
        let empty: PagedResult<i32> = PagedResult::new(1, 10, 0, vec![]);
        assert_eq!(empty.total_pages(), 0);
        assert!(!empty.more_results_available());
    }
}
