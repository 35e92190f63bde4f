//! Finding and renumbering parameter placeholders in command text.
//!
//! Only text outside string literals, delimited identifiers and comments is
//! considered, so `'@p0'` or `-- :p1` never count as placeholders.

use regex::{Captures, Regex};
use sqlweave_dialect::{SqlCharacters, code_spans};
use std::sync::LazyLock;

/// `@name`, `:name`, and the doubled `@@name` / `::name` forms that are system
/// variables and casts rather than parameters.
static NAMED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([@:]{1,2})([A-Za-z_][A-Za-z0-9_]*)").expect("should compile")
});

/// Ordinal placeholders produced by the dialects: `@p0`, `:p12`.
static ORDINAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([@:])p(\d+)\b").expect("should compile"));

fn preceded_by_word(code: &str, at: usize) -> bool {
    code[..at]
        .chars()
        .next_back()
        .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Distinct parameter names in order of first appearance, without prefix.
pub(crate) fn named_parameters(text: &str, chars: &SqlCharacters) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for span in code_spans(text) {
        let code = &text[span];
        for caps in NAMED.captures_iter(code) {
            let (Some(whole), Some(prefix), Some(name)) = (caps.get(0), caps.get(1), caps.get(2))
            else {
                continue;
            };
            if prefix.as_str() != chars.sql_parameter || preceded_by_word(code, whole.start()) {
                continue;
            }
            if !names.iter().any(|n| n == name.as_str()) {
                names.push(name.as_str().to_string());
            }
        }
    }
    names
}

/// The first placeholder that is not an ordinal `p<N>` name, if any.
pub(crate) fn custom_parameter(text: &str, chars: &SqlCharacters) -> Option<String> {
    if !chars.supports_named_parameters {
        return None;
    }
    named_parameters(text, chars)
        .into_iter()
        .find(|name| !is_ordinal(name))
}

fn is_ordinal(name: &str) -> bool {
    name.strip_prefix('p')
        .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
}

/// Number of `?` markers outside literals.
pub(crate) fn positional_count(text: &str) -> usize {
    code_spans(text)
        .into_iter()
        .map(|span| text[span].matches('?').count())
        .sum()
}

/// Shift every ordinal placeholder with `prefix` up by `offset`.
pub(crate) fn renumber(text: &str, chars: &SqlCharacters, offset: usize) -> String {
    if offset == 0 || !chars.supports_named_parameters {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len() + 8);
    let mut last = 0;
    for span in code_spans(text) {
        out.push_str(&text[last..span.start]);
        let code = &text[span.clone()];
        let replaced = ORDINAL.replace_all(code, |caps: &Captures<'_>| {
            let whole = &caps[0];
            if &caps[1] != chars.sql_parameter {
                return whole.to_string();
            }
            match caps[2].parse::<usize>() {
                Ok(n) => format!("{}p{}", chars.sql_parameter, n + offset),
                Err(_) => whole.to_string(),
            }
        });
        out.push_str(&replaced);
        last = span.end;
    }
    out.push_str(&text[last..]);
    out
}
