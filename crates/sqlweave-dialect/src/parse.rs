//! Splits a SELECT statement into its top-level clauses.
//!
//! Only keywords at parenthesis depth zero and outside string literals,
//! delimited identifiers and comments are recognized, so subqueries and
//! quoted text never confuse the split.

use sqlweave_core::{ConfigurationError, Result};
use std::ops::Range;

/// Byte ranges of the top-level clauses of a SELECT statement.
///
/// Each range covers the clause body without its keyword.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectStatement<'a> {
    text: &'a str,
    /// Whether the select list starts with DISTINCT.
    pub distinct: bool,
    /// Start of the text right after the SELECT keyword.
    pub after_select: usize,
    /// The select list (after DISTINCT, if any).
    pub select_list: Range<usize>,
    /// FROM body, if present.
    pub from: Option<Range<usize>>,
    /// WHERE body.
    pub where_clause: Option<Range<usize>>,
    /// GROUP BY body.
    pub group_by: Option<Range<usize>>,
    /// HAVING body.
    pub having: Option<Range<usize>>,
    /// ORDER BY body.
    pub order_by: Option<Range<usize>>,
    /// Start of the ORDER BY keyword, or the end of the statement.
    pub order_by_start: usize,
    /// True when a top-level UNION, INTERSECT or EXCEPT is present.
    pub compound: bool,
}

impl<'a> SelectStatement<'a> {
    /// Parse `text`, which must start with SELECT after optional whitespace.
    ///
    /// A trailing statement separator is ignored.
    pub fn parse(text: &'a str) -> Result<Self> {
        let text = text.trim_end().trim_end_matches(';').trim_end();
        let start = text.len() - text.trim_start().len();
        if !keyword_at(text, start, "SELECT") {
            return Err(ConfigurationError::UnparseableQuery(format!(
                "expected the command text to start with SELECT: {text}"
            ))
            .into());
        }
        let after_select = start + "SELECT".len();
        let list_start = skip_whitespace(text, after_select);
        let (distinct, select_start) = if keyword_at(text, list_start, "DISTINCT") {
            (true, skip_whitespace(text, list_start + "DISTINCT".len()))
        } else {
            (false, list_start)
        };

        let mut clauses: Vec<(Clause, usize, usize)> = Vec::new();
        let mut compound = false;
        for (position, word) in top_level_words(text, select_start) {
            let clause = match word.to_ascii_uppercase().as_str() {
                "FROM" => Clause::From,
                "WHERE" => Clause::Where,
                "HAVING" => Clause::Having,
                "GROUP" | "ORDER" => match by_after(text, position + word.len()) {
                    Some(end) if word.eq_ignore_ascii_case("GROUP") => {
                        clauses.push((Clause::GroupBy, position, end));
                        continue;
                    }
                    Some(end) => {
                        clauses.push((Clause::OrderBy, position, end));
                        continue;
                    }
                    None => continue,
                },
                "UNION" | "INTERSECT" | "EXCEPT" | "MINUS" => {
                    compound = true;
                    continue;
                }
                _ => continue,
            };
            clauses.push((clause, position, position + word.len()));
        }

        // Keep only the first occurrence of each clause; later ones belong to
        // compound arms.
        let mut seen = Vec::new();
        clauses.retain(|(clause, _, _)| {
            if seen.contains(clause) {
                false
            } else {
                seen.push(*clause);
                true
            }
        });

        let body = |index: usize| -> Range<usize> {
            let (_, _, body_start) = clauses[index];
            let body_end = clauses.get(index + 1).map_or(text.len(), |c| c.1);
            skip_whitespace(text, body_start)..trim_end_at(text, body_end)
        };
        let find = |wanted: Clause| clauses.iter().position(|(c, _, _)| *c == wanted);

        let select_end = clauses.first().map_or(text.len(), |c| c.1);
        let order_by = find(Clause::OrderBy);

        Ok(Self {
            text,
            distinct,
            after_select,
            select_list: select_start..trim_end_at(text, select_end),
            from: find(Clause::From).map(body),
            where_clause: find(Clause::Where).map(body),
            group_by: find(Clause::GroupBy).map(body),
            having: find(Clause::Having).map(body),
            order_by: order_by.map(body),
            order_by_start: order_by.map_or(text.len(), |i| clauses[i].1),
            compound,
        })
    }

    /// The statement text the ranges refer to, without a trailing separator.
    pub fn text(&self) -> &'a str {
        self.text
    }

    /// Text of a clause range.
    pub fn slice(&self, range: &Range<usize>) -> &'a str {
        &self.text[range.clone()]
    }

    /// The select list.
    pub fn select_list_text(&self) -> &'a str {
        self.slice(&self.select_list)
    }

    /// Everything from the SELECT keyword up to ORDER BY.
    pub fn without_order_by(&self) -> &'a str {
        self.text[..self.order_by_start].trim()
    }

    /// FROM onwards, up to ORDER BY: `Customers WHERE ...`.
    pub fn from_onwards(&self) -> Option<&'a str> {
        let from = self.from.as_ref()?;
        Some(self.text[from.start..self.order_by_start].trim())
    }

    /// The ORDER BY body.
    pub fn order_by_text(&self) -> Option<&'a str> {
        self.order_by.as_ref().map(|r| self.slice(r))
    }

    /// True when the statement cannot be counted by swapping the select list.
    pub fn needs_derived_count(&self) -> bool {
        self.distinct || self.group_by.is_some() || self.compound || self.from.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Clause {
    From,
    Where,
    GroupBy,
    Having,
    OrderBy,
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$' || c == '#' || c == '@'
}

fn skip_whitespace(text: &str, from: usize) -> usize {
    text[from..]
        .char_indices()
        .find(|(_, c)| !c.is_whitespace())
        .map_or(text.len(), |(i, _)| from + i)
}

fn trim_end_at(text: &str, end: usize) -> usize {
    text[..end].trim_end().len()
}

/// Whether `keyword` (ASCII, case-insensitive) stands as a whole word at `at`.
fn keyword_at(text: &str, at: usize, keyword: &str) -> bool {
    let Some(candidate) = text.get(at..at + keyword.len()) else {
        return false;
    };
    if !candidate.eq_ignore_ascii_case(keyword) {
        return false;
    }
    let before_ok = text[..at].chars().next_back().is_none_or(|c| !is_word_char(c));
    let after_ok = text[at + keyword.len()..]
        .chars()
        .next()
        .is_none_or(|c| !is_word_char(c));
    before_ok && after_ok
}

/// If `BY` follows `from` after whitespace, the index just past it.
fn by_after(text: &str, from: usize) -> Option<usize> {
    let at = skip_whitespace(text, from);
    if at > from && keyword_at(text, at, "BY") {
        Some(at + 2)
    } else {
        None
    }
}

/// Words at parenthesis depth zero outside literals and comments.
fn top_level_words(text: &str, from: usize) -> Vec<(usize, &str)> {
    let bytes = text.as_bytes();
    let mut words = Vec::new();
    let mut depth = 0_i32;
    let mut i = from;
    while i < bytes.len() {
        match bytes[i] {
            b'\'' => i = skip_quoted(bytes, i, b'\''),
            b'"' => i = skip_quoted(bytes, i, b'"'),
            b'`' => i = skip_quoted(bytes, i, b'`'),
            b'[' => i = skip_quoted(bytes, i, b']'),
            b'-' if bytes.get(i + 1) == Some(&b'-') => {
                i = bytes[i..]
                    .iter()
                    .position(|b| *b == b'\n')
                    .map_or(bytes.len(), |p| i + p + 1);
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i = text[i + 2..].find("*/").map_or(bytes.len(), |p| i + 2 + p + 2);
            }
            b'(' => {
                depth += 1;
                i += 1;
            }
            b')' => {
                depth -= 1;
                i += 1;
            }
            b if b.is_ascii_alphabetic() || b == b'_' => {
                let start = i;
                while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || matches!(bytes[i], b'_' | b'$' | b'#' | b'@')) {
                    i += 1;
                }
                let preceded_by_word = text[..start].chars().next_back().is_some_and(is_word_char);
                if depth == 0 && !preceded_by_word {
                    words.push((start, &text[start..i]));
                }
            }
            _ => i += 1,
        }
    }
    words
}

/// Byte ranges of `text` that lie outside string literals, delimited
/// identifiers and comments.
pub fn code_spans(text: &str) -> Vec<Range<usize>> {
    let bytes = text.as_bytes();
    let mut spans = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        let skip_to = match bytes[i] {
            b'\'' => Some(skip_quoted(bytes, i, b'\'')),
            b'"' => Some(skip_quoted(bytes, i, b'"')),
            b'`' => Some(skip_quoted(bytes, i, b'`')),
            b'[' => Some(skip_quoted(bytes, i, b']')),
            b'-' if bytes.get(i + 1) == Some(&b'-') => Some(
                bytes[i..]
                    .iter()
                    .position(|b| *b == b'\n')
                    .map_or(bytes.len(), |p| i + p + 1),
            ),
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                Some(text[i + 2..].find("*/").map_or(bytes.len(), |p| i + 2 + p + 2))
            }
            _ => None,
        };
        match skip_to {
            Some(end) => {
                if i > start {
                    spans.push(start..i);
                }
                start = end;
                i = end;
            }
            None => i += 1,
        }
    }
    if start < bytes.len() {
        spans.push(start..bytes.len());
    }
    spans
}

/// Index just past the literal or delimited identifier opened at `open`.
/// A doubled closing character is an escape and does not end it.
fn skip_quoted(bytes: &[u8], open: usize, close: u8) -> usize {
    let mut i = open + 1;
    while i < bytes.len() {
        if bytes[i] == close {
            if bytes.get(i + 1) == Some(&close) {
                i += 2;
                continue;
            }
            return i + 1;
        }
        i += 1;
    }
    bytes.len()
}
