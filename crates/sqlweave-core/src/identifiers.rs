//! SQL identifier validation.

use regex::Regex;
use std::sync::LazyLock;

static IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_$#]*(\.[A-Za-z_][A-Za-z0-9_$#]*)*$").expect("should compile")
});

/// Whether `name` is a plain, optionally dot-qualified SQL identifier such as
/// `Customers`, `dbo.Customers` or `SEQ_CUSTOMER_ID`.
///
/// Plain identifiers can be emitted without quoting ambiguity; names that fail
/// this check still work but are always delimited.
pub fn is_valid_identifier(name: &str) -> bool {
    IDENTIFIER.is_match(name)
}
