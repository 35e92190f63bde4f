//! Building native commands from [`SqlQuery`] values.

use crate::placeholders::{custom_parameter, named_parameters, positional_count, renumber};
use serde::{Deserialize, Serialize};
use sqlweave_core::{
    Command, CommandKind, ConfigurationError, Parameter, Result, SqlArgument, SqlQuery, UsageError,
};
use sqlweave_dialect::{DialectKind, SqlCharacters, SqlDialect};

/// What the underlying native driver can do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverCapabilities {
    /// Several statements can run in one command and be read back as
    /// consecutive result sets.
    pub supports_batched_queries: bool,
    /// Commands accept a timeout.
    pub supports_command_timeout: bool,
}

impl Default for DriverCapabilities {
    fn default() -> Self {
        Self {
            supports_batched_queries: true,
            supports_command_timeout: true,
        }
    }
}

impl DriverCapabilities {
    /// Capabilities of a driver that runs one statement per command.
    pub fn single_statement() -> Self {
        Self {
            supports_batched_queries: false,
            ..Self::default()
        }
    }

    /// Set batching support.
    pub fn batched_queries(mut self, supported: bool) -> Self {
        self.supports_batched_queries = supported;
        self
    }

    /// Set timeout support.
    pub fn command_timeout(mut self, supported: bool) -> Self {
        self.supports_command_timeout = supported;
        self
    }
}

/// Bridge from logical queries to the host's [`Command`]s.
///
/// A driver is cheap to copy and holds no connection. It parses placeholders,
/// detects stored-procedure calls, binds arguments and merges queries into
/// batches.
#[derive(Debug, Clone, Copy)]
pub struct DbDriver {
    characters: &'static SqlCharacters,
    capabilities: DriverCapabilities,
}

impl DbDriver {
    /// Create a driver for `kind`.
    pub fn new(kind: DialectKind, capabilities: DriverCapabilities) -> Self {
        Self::with_characters(kind.characters(), capabilities)
    }

    /// Create a driver using the lexical rules of `dialect`.
    pub fn for_dialect(dialect: &dyn SqlDialect, capabilities: DriverCapabilities) -> Self {
        Self::with_characters(dialect.characters(), capabilities)
    }

    /// Create a driver with explicit lexical rules.
    pub fn with_characters(
        characters: &'static SqlCharacters,
        capabilities: DriverCapabilities,
    ) -> Self {
        Self {
            characters,
            capabilities,
        }
    }

    /// Lexical rules in use.
    pub fn characters(&self) -> &'static SqlCharacters {
        self.characters
    }

    /// Capabilities in use.
    pub fn capabilities(&self) -> DriverCapabilities {
        self.capabilities
    }

    /// Shorthand for `capabilities().supports_batched_queries`.
    pub fn supports_batched_queries(&self) -> bool {
        self.capabilities.supports_batched_queries
    }

    /// True if `text` invokes a stored procedure by keyword.
    ///
    /// Text containing a statement separator is a batch, never a call.
    pub fn is_stored_procedure(&self, text: &str) -> bool {
        self.procedure_call(text).is_some()
    }

    /// Build a command for `query`.
    ///
    /// Fails with [`ConfigurationError::ParameterCountMismatch`] when the
    /// placeholders in the text and the supplied arguments disagree.
    pub fn build_command(&self, query: &SqlQuery) -> Result<Command> {
        let arguments = query.arguments();
        let (text, kind, names) = match self.procedure_call(query.command_text()) {
            Some((name, names)) => (name, CommandKind::StoredProcedure, names),
            None => {
                let text = query.command_text().to_string();
                let names = self.parameter_names(&text);
                (text, CommandKind::Text, names)
            }
        };

        let names = if names.is_empty() && !arguments.is_empty() {
            synthesized_names(arguments.len())
        } else {
            names
        };
        if names.len() != arguments.len() {
            return Err(ConfigurationError::ParameterCountMismatch {
                expected: names.len(),
                actual: arguments.len(),
            }
            .into());
        }

        let parameters = names
            .into_iter()
            .zip(arguments)
            .map(|(name, argument)| Parameter::new(name, argument.value.clone(), argument.db_type))
            .collect::<Vec<_>>();
        let timeout = self
            .capabilities
            .supports_command_timeout
            .then(|| query.timeout());

        tracing::debug!(
            sql = %text,
            kind = ?kind,
            parameters = parameters.len(),
            "Built command"
        );

        Ok(Command {
            text,
            kind,
            timeout,
            parameters,
        })
    }

    /// Merge `queries` into one statement batch.
    ///
    /// Texts are joined with the statement separator. Ordinal placeholders of
    /// every segment after the first are shifted by the number of arguments
    /// that precede it, unless the segment is a stored-procedure call. The
    /// timeout is the largest of the inputs.
    ///
    /// Named dialects require ordinal placeholders (`@p0`, `:p1`): a custom
    /// name such as `@Status` cannot be renumbered and is rejected with
    /// [`ConfigurationError::UnparseableQuery`].
    pub fn combine(&self, queries: &[SqlQuery]) -> Result<SqlQuery> {
        let combined = self.combine_all(queries.iter())?;
        tracing::debug!(statements = queries.len(), "Combined queries");
        Ok(combined)
    }

    /// [`DbDriver::combine`] for exactly two queries.
    pub fn combine_pair(&self, first: &SqlQuery, second: &SqlQuery) -> Result<SqlQuery> {
        self.combine_all([first, second].into_iter())
    }

    fn combine_all<'a>(&self, queries: impl Iterator<Item = &'a SqlQuery>) -> Result<SqlQuery> {
        let separator = self.characters.statement_separator;
        let mut texts = Vec::new();
        let mut arguments: Vec<SqlArgument> = Vec::new();
        let mut timeout = 0;
        for query in queries {
            let text = query
                .command_text()
                .trim_end()
                .trim_end_matches(separator)
                .trim_end();
            let text = if self.is_stored_procedure(text) {
                text.to_string()
            } else {
                if let Some(name) = custom_parameter(text, self.characters) {
                    return Err(ConfigurationError::UnparseableQuery(format!(
                        "combined queries must use ordinal placeholders ({0}p0, {0}p1, ...), found {0}{name}",
                        self.characters.sql_parameter
                    ))
                    .into());
                }
                renumber(text, self.characters, arguments.len())
            };
            texts.push(text);
            arguments.extend_from_slice(query.arguments());
            timeout = timeout.max(query.timeout());
        }
        if texts.is_empty() {
            return Err(UsageError::EmptyBatch.into());
        }
        let sql = texts.join(&format!("{separator}\n"));
        Ok(SqlQuery::with_arguments(sql, arguments).with_timeout(timeout))
    }

    /// Replace the values of a built command's parameters, in order.
    ///
    /// Parameters beyond `values` keep their current value.
    pub fn rebind(&self, command: &mut Command, values: &[SqlArgument]) -> Result<()> {
        if values.len() > command.parameters.len() {
            return Err(ConfigurationError::TooManyParameterValues {
                supplied: values.len(),
                count: command.parameters.len(),
            }
            .into());
        }
        for (parameter, argument) in command.parameters.iter_mut().zip(values) {
            parameter.value = argument.value.clone();
            parameter.db_type = argument.db_type;
        }
        Ok(())
    }

    /// Replace the value of the parameter at `index`.
    pub fn set_parameter_value(
        &self,
        command: &mut Command,
        index: usize,
        argument: SqlArgument,
    ) -> Result<()> {
        let count = command.parameters.len();
        let parameter = command
            .parameters
            .get_mut(index)
            .ok_or(ConfigurationError::ParameterIndexOutOfRange { index, count })?;
        parameter.value = argument.value;
        parameter.db_type = argument.db_type;
        Ok(())
    }

    fn parameter_names(&self, text: &str) -> Vec<String> {
        if self.characters.supports_named_parameters {
            named_parameters(text, self.characters)
        } else {
            synthesized_names(positional_count(text))
        }
    }

    /// Procedure name and parameter names when `text` is a keyword call.
    fn procedure_call(&self, text: &str) -> Option<(String, Vec<String>)> {
        let keyword = self.characters.stored_procedure_invocation_command;
        if keyword.is_empty() || text.contains(self.characters.statement_separator) {
            return None;
        }
        let text = text.trim();
        let head = text.get(..keyword.len())?;
        if !head.eq_ignore_ascii_case(keyword) {
            return None;
        }
        let rest = &text[keyword.len()..];
        if !rest.starts_with(char::is_whitespace) {
            return None;
        }
        let rest = rest.trim_start();
        let name_end = rest
            .find(|c: char| c == '(' || c.is_whitespace())
            .unwrap_or(rest.len());
        let name = &rest[..name_end];
        if name.is_empty() {
            return None;
        }
        let tail = rest[name_end..].trim();
        let names = match tail.strip_prefix('(') {
            Some(list) => procedure_parameters(list.trim_end().trim_end_matches(')')),
            None => self.parameter_names(tail),
        };
        Some((name.to_string(), names))
    }
}

/// Parameter names in a procedure argument list. Literals are skipped and
/// bare `?` markers get synthesized names.
fn procedure_parameters(list: &str) -> Vec<String> {
    let mut names = Vec::new();
    for entry in split_arguments(list) {
        let entry = entry.trim();
        if entry.is_empty() || is_literal(entry) {
            continue;
        }
        let bare = entry.trim_start_matches(['@', ':', '?']);
        if bare.is_empty() {
            names.push(format!("Parameter{}", names.len()));
        } else {
            names.push(bare.to_string());
        }
    }
    names
}

/// Split on commas outside string literals.
fn split_arguments(list: &str) -> Vec<&str> {
    let mut entries = Vec::new();
    let mut in_literal = false;
    let mut start = 0;
    for (at, c) in list.char_indices() {
        match c {
            '\'' => in_literal = !in_literal,
            ',' if !in_literal => {
                entries.push(&list[start..at]);
                start = at + 1;
            }
            _ => {}
        }
    }
    entries.push(&list[start..]);
    entries
}

fn is_literal(entry: &str) -> bool {
    let unsigned = entry.trim_start_matches(['-', '+']);
    entry.starts_with('\'')
        || unsigned.starts_with(|c: char| c.is_ascii_digit() || c == '.')
        || ["NULL", "TRUE", "FALSE"]
            .iter()
            .any(|keyword| entry.eq_ignore_ascii_case(keyword))
}

fn synthesized_names(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("Parameter{i}")).collect()
}
