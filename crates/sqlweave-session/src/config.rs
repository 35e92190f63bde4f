//! Session configuration.

use serde::{Deserialize, Serialize};
use sqlweave_core::{DEFAULT_COMMAND_TIMEOUT, IsolationLevel};

/// How long a session keeps its connection open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionScope {
    /// Open per operation, or for the lifetime of a transaction.
    #[default]
    PerTransaction,
    /// Open on first use and keep open until the session is closed.
    PerSession,
}

/// Configuration applied to every session a factory opens.
///
/// ```ignore
/// let config = SessionConfig::from_json(r#"{"connection_scope": "per_session"}"#)?;
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Default scope for sessions opened without an explicit one.
    pub connection_scope: ConnectionScope,
    /// Timeout in seconds for statements the session builds itself.
    /// Caller-supplied queries keep their own timeout.
    pub default_command_timeout: u32,
    /// Isolation used when `begin_transaction` is called without one.
    pub default_isolation_level: IsolationLevel,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            connection_scope: ConnectionScope::PerTransaction,
            default_command_timeout: DEFAULT_COMMAND_TIMEOUT,
            default_isolation_level: IsolationLevel::ReadCommitted,
        }
    }
}

impl SessionConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Set the default connection scope.
    pub fn with_connection_scope(mut self, scope: ConnectionScope) -> Self {
        self.connection_scope = scope;
        self
    }

    /// Set the timeout for session-built statements.
    pub fn with_command_timeout(mut self, seconds: u32) -> Self {
        self.default_command_timeout = seconds;
        self
    }

    /// Set the default isolation level.
    pub fn with_isolation_level(mut self, level: IsolationLevel) -> Self {
        self.default_isolation_level = level;
        self
    }
}
