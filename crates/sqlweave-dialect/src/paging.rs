//! Paging strategies shared between backends.

use crate::characters::SqlCharacters;
use crate::dialect::{check_paging, with_extra_arguments};
use crate::parse::SelectStatement;
use sqlweave_core::{PagingOptions, Result, SqlQuery};

/// `... LIMIT ? OFFSET ?` (SQLite, PostgreSQL, MySQL).
pub(crate) fn limit_offset(
    chars: &SqlCharacters,
    query: &SqlQuery,
    paging: PagingOptions,
) -> Result<SqlQuery> {
    check_paging(paging)?;
    let statement = SelectStatement::parse(query.command_text())?;
    let next = query.arguments().len();
    let sql = format!(
        "{} LIMIT {} OFFSET {}",
        statement.text(),
        chars.parameter_name(next),
        chars.parameter_name(next + 1)
    );
    Ok(with_extra_arguments(query, sql, [paging.count(), paging.offset()]))
}

/// `... ORDER BY ... OFFSET ? ROWS FETCH NEXT ? ROWS ONLY` (SQL Server 2012).
///
/// OFFSET requires an ORDER BY; an unordered query gets `ORDER BY (SELECT NULL)`.
pub(crate) fn offset_fetch(
    chars: &SqlCharacters,
    query: &SqlQuery,
    paging: PagingOptions,
) -> Result<SqlQuery> {
    check_paging(paging)?;
    let statement = SelectStatement::parse(query.command_text())?;
    let next = query.arguments().len();
    let order = if statement.order_by.is_some() {
        ""
    } else {
        " ORDER BY (SELECT NULL)"
    };
    let sql = format!(
        "{}{} OFFSET {} ROWS FETCH NEXT {} ROWS ONLY",
        statement.text(),
        order,
        chars.parameter_name(next),
        chars.parameter_name(next + 1)
    );
    Ok(with_extra_arguments(query, sql, [paging.offset(), paging.count()]))
}

/// ROW_NUMBER() numbering inside a derived table, filtered outside
/// (SQL Server 2005).
///
/// DISTINCT and compound queries are wrapped whole, without their ORDER BY,
/// and the outer rows are numbered; numbering inside them would defeat
/// DISTINCT or cover only the first arm.
pub(crate) fn row_number(
    chars: &SqlCharacters,
    query: &SqlQuery,
    paging: PagingOptions,
) -> Result<SqlQuery> {
    check_paging(paging)?;
    let statement = SelectStatement::parse(query.command_text())?;
    let order = statement.order_by_text().unwrap_or("(SELECT NULL)");
    let numbered = if statement.distinct || statement.compound {
        format!(
            "SELECT PagedResults.*, ROW_NUMBER() OVER(ORDER BY {}) AS RowNumber FROM ({}) AS PagedResults",
            order,
            statement.without_order_by()
        )
    } else {
        let from = statement
            .from_onwards()
            .map(|from| format!(" FROM {from}"))
            .unwrap_or_default();
        format!(
            "SELECT {}, ROW_NUMBER() OVER(ORDER BY {}) AS RowNumber{}",
            statement.select_list_text(),
            order,
            from
        )
    };
    let next = query.arguments().len();
    let sql = format!(
        "SELECT * FROM ({}) AS RowNumberedResults WHERE RowNumber >= {} AND RowNumber <= {}",
        numbered,
        chars.parameter_name(next),
        chars.parameter_name(next + 1)
    );
    Ok(with_extra_arguments(
        query,
        sql,
        [paging.offset() + 1, paging.offset() + paging.count()],
    ))
}

/// `SELECT [DISTINCT] TOP n START AT m ...` with inlined integers
/// (SQL Anywhere, Sybase).
pub(crate) fn top_start_at(query: &SqlQuery, paging: PagingOptions) -> Result<SqlQuery> {
    check_paging(paging)?;
    let statement = SelectStatement::parse(query.command_text())?;
    let text = statement.text();
    let distinct = if statement.distinct { "DISTINCT " } else { "" };
    let sql = format!(
        "SELECT {}TOP {} START AT {} {}",
        distinct,
        paging.count(),
        paging.offset() + 1,
        &text[statement.select_list.start..]
    );
    Ok(SqlQuery::with_arguments(sql, query.arguments().to_vec()).with_timeout(query.timeout()))
}

/// `SELECT FIRST n SKIP m [DISTINCT] ...` with inlined integers (Firebird).
pub(crate) fn first_skip(query: &SqlQuery, paging: PagingOptions) -> Result<SqlQuery> {
    check_paging(paging)?;
    let statement = SelectStatement::parse(query.command_text())?;
    let text = statement.text();
    let sql = format!(
        "SELECT FIRST {} SKIP {} {}",
        paging.count(),
        paging.offset(),
        text[statement.after_select..].trim_start()
    );
    Ok(SqlQuery::with_arguments(sql, query.arguments().to_vec()).with_timeout(query.timeout()))
}
