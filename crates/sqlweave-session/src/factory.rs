//! Opening sessions.

use crate::config::{ConnectionScope, SessionConfig};
use crate::listener::Listeners;
use crate::read_only::ReadOnlySession;
use crate::session::Session;
use sqlweave_core::{Connection, TypeConverters};
use sqlweave_dialect::{DialectKind, SqlDialect, dialect_for};
use sqlweave_driver::{DbDriver, DriverCapabilities};
use std::fmt;
use std::sync::Arc;

/// Opens sessions for one database.
///
/// Holds everything a session needs apart from the connection itself: the
/// dialect, the driver, type converters, listeners and configuration.
/// `connect` is called once per session and must return a connection that
/// is not yet open; the session opens it on first use.
///
/// ```ignore
/// let factory = SessionFactory::new(DialectKind::Postgres, DriverCapabilities::default(), || {
///     PgConnection::new(config.clone())
/// });
/// let mut session = factory.open_session(ConnectionScope::PerSession);
/// ```
pub struct SessionFactory<F> {
    dialect: Arc<dyn SqlDialect>,
    driver: DbDriver,
    connect: F,
    listeners: Listeners,
    converters: TypeConverters,
    config: SessionConfig,
}

impl<F> fmt::Debug for SessionFactory<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionFactory")
            .field("dialect", &self.dialect.kind())
            .field("driver", &self.driver)
            .field("listeners", &self.listeners)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<F, C> SessionFactory<F>
where
    F: Fn() -> C,
    C: Connection,
{
    /// Factory for the built-in dialect of `kind`.
    pub fn new(kind: DialectKind, capabilities: DriverCapabilities, connect: F) -> Self {
        let dialect = dialect_for(kind);
        let driver = DbDriver::for_dialect(&*dialect, capabilities);
        Self::with_dialect(dialect, driver, connect)
    }

    /// Factory with an explicit dialect and driver.
    pub fn with_dialect(dialect: Arc<dyn SqlDialect>, driver: DbDriver, connect: F) -> Self {
        Self {
            dialect,
            driver,
            connect,
            listeners: Listeners::with_defaults(),
            converters: TypeConverters::default(),
            config: SessionConfig::default(),
        }
    }

    /// Replace the configuration.
    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the type converters.
    pub fn with_converters(mut self, converters: TypeConverters) -> Self {
        self.converters = converters;
        self
    }

    /// Replace the listeners.
    pub fn with_listeners(mut self, listeners: Listeners) -> Self {
        self.listeners = listeners;
        self
    }

    /// Listeners given to every new session.
    pub fn listeners_mut(&mut self) -> &mut Listeners {
        &mut self.listeners
    }

    /// The dialect shared by every session.
    pub fn dialect(&self) -> &dyn SqlDialect {
        &*self.dialect
    }

    /// The driver shared by every session.
    pub fn driver(&self) -> &DbDriver {
        &self.driver
    }

    /// The factory configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Open a read-write session with the configured connection scope.
    pub fn session(&self) -> Session<C> {
        self.open_session(self.config.connection_scope)
    }

    /// Open a read-write session.
    pub fn open_session(&self, scope: ConnectionScope) -> Session<C> {
        let mut session = Session::with_config(
            (self.connect)(),
            Arc::clone(&self.dialect),
            self.driver,
            self.config.with_connection_scope(scope),
        );
        session.set_converters(self.converters.clone());
        session.set_listeners(self.listeners.clone());
        tracing::debug!(dialect = %self.dialect.kind(), ?scope, "Opened session");
        session
    }

    /// Open a read-only session.
    pub fn open_read_only_session(&self, scope: ConnectionScope) -> ReadOnlySession<C> {
        let mut session = ReadOnlySession::with_config(
            (self.connect)(),
            Arc::clone(&self.dialect),
            self.driver,
            self.config.with_connection_scope(scope),
        );
        session.set_converters(self.converters.clone());
        tracing::debug!(dialect = %self.dialect.kind(), ?scope, "Opened read-only session");
        session
    }
}
