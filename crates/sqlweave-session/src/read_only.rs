//! The read side of a session: queries, includes, transactions.

use crate::config::{ConnectionScope, SessionConfig};
use crate::execution::{execution_error, wrap};
use crate::include::{IncludeMany, IncludeScalar, IncludeSingle, PendingQuery, Resolver};
use crate::transaction::{ActiveTransaction, Transaction};
use sqlweave_core::{
    Command, Connection, Cx, DataReader, Entity, Error, FromValue, IsolationLevel, Operation,
    Outcome, PagedResult, PagingOptions, Result, Row, SqlQuery, TypeConverters, UsageError,
    Value, try_outcome, try_result,
};
use sqlweave_dialect::SqlDialect;
use sqlweave_driver::DbDriver;
use std::sync::Arc;

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Nothing has touched the connection yet.
    Created,
    /// A command ran or a transaction began.
    Active,
    /// Closed. Every further call fails with `UsageError::SessionDisposed`.
    Disposed,
}

/// A session that only reads.
///
/// Reads are queued and sent together: every direct read first queues itself
/// behind the pending includes, then runs the whole queue. With a batching
/// driver that is one round trip regardless of how many reads were queued.
///
/// ```ignore
/// let orders = session.include().many::<Order>(orders_query)?;
/// let customer = session.single::<Customer>(&cx, 42_i64).await?;
/// let orders = orders.take()?;
/// ```
pub struct ReadOnlySession<C: Connection> {
    connection: C,
    connection_open: bool,
    state: SessionState,
    dialect: Arc<dyn SqlDialect>,
    driver: DbDriver,
    converters: TypeConverters,
    config: SessionConfig,
    pending: Vec<PendingQuery>,
    transaction: Option<ActiveTransaction>,
    transactions_begun: u64,
}

impl<C: Connection> std::fmt::Debug for ReadOnlySession<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadOnlySession")
            .field("dialect", &self.dialect.kind())
            .field("state", &self.state)
            .field("connection_open", &self.connection_open)
            .field("pending", &self.pending.len())
            .field("in_transaction", &self.transaction.is_some())
            .finish_non_exhaustive()
    }
}

impl<C: Connection> ReadOnlySession<C> {
    /// Create a session with the default configuration.
    pub fn new(connection: C, dialect: Arc<dyn SqlDialect>, driver: DbDriver) -> Self {
        Self::with_config(connection, dialect, driver, SessionConfig::default())
    }

    /// Create a session with an explicit configuration.
    pub fn with_config(
        connection: C,
        dialect: Arc<dyn SqlDialect>,
        driver: DbDriver,
        config: SessionConfig,
    ) -> Self {
        Self {
            connection,
            connection_open: false,
            state: SessionState::Created,
            dialect,
            driver,
            converters: TypeConverters::default(),
            config,
            pending: Vec::new(),
            transaction: None,
            transactions_begun: 0,
        }
    }

    /// Replace the type converters used for hydration and scalars.
    pub fn set_converters(&mut self, converters: TypeConverters) {
        self.converters = converters;
    }

    /// The underlying connection.
    pub fn connection(&self) -> &C {
        &self.connection
    }

    /// Mutable access to the underlying connection.
    pub fn connection_mut(&mut self) -> &mut C {
        &mut self.connection
    }

    /// The dialect building this session's SQL.
    pub fn dialect(&self) -> &dyn SqlDialect {
        &*self.dialect
    }

    /// The command builder.
    pub fn driver(&self) -> &DbDriver {
        &self.driver
    }

    /// Type converters in use.
    pub fn converters(&self) -> &TypeConverters {
        &self.converters
    }

    /// Session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Connection scope.
    pub fn scope(&self) -> ConnectionScope {
        self.config.connection_scope
    }

    /// Lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// True while a transaction is open.
    pub fn in_transaction(&self) -> bool {
        self.transaction.is_some()
    }

    /// Reads queued and not yet executed.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// True while the connection is open.
    pub fn is_connection_open(&self) -> bool {
        self.connection_open
    }

    /// Queue reads for the next round trip.
    pub fn include(&mut self) -> Include<'_, C> {
        Include { session: self }
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// All rows of `query`, hydrated as `T`, in backend order.
    #[tracing::instrument(level = "debug", skip(self, cx, query), fields(sql = %query.command_text()))]
    pub async fn fetch<T: Entity>(&mut self, cx: &Cx, query: SqlQuery) -> Outcome<Vec<T>, Error> {
        let handle = try_result!(self.include().many::<T>(query));
        try_outcome!(self.execute_pending_queries(cx).await);
        Outcome::Ok(try_result!(handle.take()))
    }

    /// The instance of `T` with the given identifier.
    #[tracing::instrument(level = "debug", skip(self, cx, identifier))]
    pub async fn single<T: Entity>(
        &mut self,
        cx: &Cx,
        identifier: impl Into<Value>,
    ) -> Outcome<Option<T>, Error> {
        let handle = try_result!(self.include().single::<T>(identifier));
        try_outcome!(self.execute_pending_queries(cx).await);
        Outcome::Ok(try_result!(handle.take()))
    }

    /// The first row of `query`, if any.
    #[tracing::instrument(level = "debug", skip(self, cx, query), fields(sql = %query.command_text()))]
    pub async fn single_query<T: Entity>(
        &mut self,
        cx: &Cx,
        query: SqlQuery,
    ) -> Outcome<Option<T>, Error> {
        let handle = try_result!(self.include().single_query::<T>(query));
        try_outcome!(self.execute_pending_queries(cx).await);
        Outcome::Ok(try_result!(handle.take()))
    }

    /// One page of `query` plus the total row count.
    ///
    /// The count and the page are queued together, so a batching driver
    /// fetches both in one round trip.
    #[tracing::instrument(level = "debug", skip(self, cx, query), fields(sql = %query.command_text()))]
    pub async fn paged<T: Entity>(
        &mut self,
        cx: &Cx,
        query: SqlQuery,
        paging: PagingOptions,
    ) -> Outcome<PagedResult<T>, Error> {
        if paging.is_none() {
            return Outcome::Err(UsageError::PagingOptionsNone.into());
        }
        let count_query = try_result!(self.dialect.count_query(&query));
        let page_query = try_result!(self.dialect.page_query(&query, paging));
        let total = try_result!(self.include().scalar::<i64>(count_query));
        let results = try_result!(self.include().many::<T>(page_query));
        try_outcome!(self.execute_pending_queries(cx).await);

        let total = u64::try_from(try_result!(total.take())).unwrap_or(0);
        let results = try_result!(results.take());
        Outcome::Ok(PagedResult::new(paging.page(), paging.count(), total, results))
    }

    /// The first column of the first row, converted to `T`.
    #[tracing::instrument(level = "debug", skip(self, cx, query), fields(sql = %query.command_text()))]
    pub async fn execute_scalar<T: FromValue + Send + 'static>(
        &mut self,
        cx: &Cx,
        query: SqlQuery,
    ) -> Outcome<T, Error> {
        let handle = try_result!(self.include().scalar::<T>(query));
        try_outcome!(self.execute_pending_queries(cx).await);
        Outcome::Ok(try_result!(handle.take()))
    }

    /// Untyped rows of `query`.
    #[tracing::instrument(level = "debug", skip(self, cx, query), fields(sql = %query.command_text()))]
    pub async fn projection(&mut self, cx: &Cx, query: SqlQuery) -> Outcome<Vec<Row>, Error> {
        let (handle, pending) = IncludeMany::<Row>::queue_rows(query);
        try_result!(self.queue(pending));
        try_outcome!(self.execute_pending_queries(cx).await);
        Outcome::Ok(try_result!(handle.take()))
    }

    /// Run a statement that returns no rows, returning the affected row count.
    ///
    /// Pending includes are left queued.
    #[tracing::instrument(level = "debug", skip(self, cx, query), fields(sql = %query.command_text()))]
    pub async fn execute(&mut self, cx: &Cx, query: SqlQuery) -> Outcome<u64, Error> {
        try_result!(self.check_usable());
        let command = try_result!(self.driver.build_command(&query));
        self.non_query_scoped(cx, &command).await
    }

    /// Run every queued read and resolve its handle.
    ///
    /// A batching driver sends two or more reads as one combined command and
    /// reads the result sets back in queue order. Otherwise each read is its
    /// own round trip. The queue is empty afterwards, even on failure.
    #[tracing::instrument(level = "debug", skip(self, cx), fields(pending = self.pending.len()))]
    pub async fn execute_pending_queries(&mut self, cx: &Cx) -> Outcome<(), Error> {
        try_result!(self.check_usable());
        let pending = std::mem::take(&mut self.pending);
        if pending.is_empty() {
            return Outcome::Ok(());
        }
        try_outcome!(self.acquire(cx).await);
        let result = self.run_pending(cx, pending).await;
        self.release();
        result
    }

    async fn run_pending(&mut self, cx: &Cx, pending: Vec<PendingQuery>) -> Outcome<(), Error> {
        if self.driver.supports_batched_queries() && pending.len() > 1 {
            let (queries, resolvers): (Vec<SqlQuery>, Vec<Resolver>) = pending
                .into_iter()
                .map(|p| (p.query, p.resolve))
                .unzip();
            let combined = try_result!(match queries.as_slice() {
                [first, second] => self.driver.combine_pair(first, second),
                _ => self.driver.combine(&queries),
            });
            let command = try_result!(self.driver.build_command(&combined));
            tracing::debug!(
                statements = resolvers.len(),
                "Executing pending queries in one round trip"
            );

            let expected = resolvers.len();
            let mut reader = try_outcome!(self.run_reader(cx, &command).await);
            for (index, resolve) in resolvers.into_iter().enumerate() {
                let positioned = if index == 0 {
                    reader.field_count() > 0
                } else {
                    try_result!(
                        reader
                            .next_result()
                            .map_err(|e| execution_error(Operation::Read, &command.text, e))
                    )
                };
                if !positioned {
                    return Outcome::Err(execution_error(
                        Operation::Read,
                        &command.text,
                        format!("expected {expected} result sets, the batch returned {index}").into(),
                    ));
                }
                try_result!(resolve(&mut reader, &self.converters, &command.text));
            }
        } else {
            for PendingQuery { query, resolve } in pending {
                let command = try_result!(self.driver.build_command(&query));
                let mut reader = try_outcome!(self.run_reader(cx, &command).await);
                try_result!(resolve(&mut reader, &self.converters, &command.text));
            }
        }
        Outcome::Ok(())
    }

    // ========================================================================
    // Transactions
    // ========================================================================

    /// Begin a transaction. `None` uses the configured default isolation.
    ///
    /// Only one transaction may be open at a time. Statements are never
    /// wrapped in a transaction implicitly.
    #[tracing::instrument(level = "debug", skip(self, cx))]
    pub async fn begin_transaction(
        &mut self,
        cx: &Cx,
        isolation: Option<IsolationLevel>,
    ) -> Outcome<Transaction, Error> {
        try_outcome!(self.acquire(cx).await);
        if self.transaction.is_some() {
            return Outcome::Err(UsageError::TransactionAlreadyActive.into());
        }
        if let Some(reason) = cx.cancel_reason() {
            self.release();
            return Outcome::Cancelled(reason);
        }

        let isolation = isolation.unwrap_or(self.config.default_isolation_level);
        tracing::info!(isolation = isolation.as_sql(), "Beginning transaction");
        let begun = wrap(
            self.connection.begin_transaction(cx, Some(isolation)).await,
            Operation::BeginTransaction,
            "",
        );
        let result = match begun {
            Outcome::Ok(()) => {
                self.transactions_begun += 1;
                let (transaction, active) = Transaction::begin(self.transactions_begun, isolation);
                self.transaction = Some(active);
                Outcome::Ok(transaction)
            }
            Outcome::Err(e) => Outcome::Err(e),
            Outcome::Cancelled(r) => Outcome::Cancelled(r),
            Outcome::Panicked(p) => Outcome::Panicked(p),
        };
        self.release();
        result
    }

    /// Commit `transaction`.
    #[tracing::instrument(level = "debug", skip(self, cx, transaction), fields(transaction = transaction.id()))]
    pub async fn commit(&mut self, cx: &Cx, mut transaction: Transaction) -> Outcome<(), Error> {
        try_result!(self.check_usable());
        if !self.owns(&transaction) {
            return Outcome::Err(UsageError::NoActiveTransaction.into());
        }
        if let Some(reason) = cx.cancel_reason() {
            return Outcome::Cancelled(reason);
        }

        tracing::info!("Committing transaction");
        let committed = wrap(self.connection.commit(cx).await, Operation::Commit, "");
        transaction.complete();
        self.transaction = None;
        self.release();
        committed
    }

    /// Roll back `transaction`.
    #[tracing::instrument(level = "debug", skip(self, cx, transaction), fields(transaction = transaction.id()))]
    pub async fn rollback(&mut self, cx: &Cx, mut transaction: Transaction) -> Outcome<(), Error> {
        try_result!(self.check_usable());
        if !self.owns(&transaction) {
            return Outcome::Err(UsageError::NoActiveTransaction.into());
        }
        let rolled_back = self.rollback_active(cx).await;
        if !matches!(rolled_back, Outcome::Cancelled(_)) {
            transaction.complete();
        }
        self.release();
        rolled_back
    }

    /// Close the session.
    ///
    /// An unfinished transaction is rolled back first. Closing twice is a
    /// no-op; every other call on a closed session fails.
    #[tracing::instrument(level = "debug", skip(self, cx))]
    pub async fn close(&mut self, cx: &Cx) -> Outcome<(), Error> {
        if self.state == SessionState::Disposed {
            return Outcome::Ok(());
        }
        let rolled_back = if self.transaction.is_some() && self.connection_open {
            tracing::warn!("Closing session with an unfinished transaction; rolling back");
            self.rollback_active(cx).await
        } else {
            Outcome::Ok(())
        };
        self.transaction = None;
        self.pending.clear();
        if self.connection_open {
            self.connection.close();
            self.connection_open = false;
        }
        self.state = SessionState::Disposed;
        tracing::debug!("Session closed");
        rolled_back
    }

    fn owns(&self, transaction: &Transaction) -> bool {
        self.transaction
            .as_ref()
            .is_some_and(|active| transaction.belongs_to(active))
    }

    async fn rollback_active(&mut self, cx: &Cx) -> Outcome<(), Error> {
        if let Some(reason) = cx.cancel_reason() {
            return Outcome::Cancelled(reason);
        }
        tracing::info!("Rolling back transaction");
        let rolled_back = wrap(self.connection.rollback(cx).await, Operation::Rollback, "");
        self.transaction = None;
        rolled_back
    }

    // ========================================================================
    // Connection scope and execution
    // ========================================================================

    pub(crate) fn check_usable(&self) -> Result<()> {
        if self.state == SessionState::Disposed {
            return Err(UsageError::SessionDisposed.into());
        }
        Ok(())
    }

    fn queue(&mut self, pending: PendingQuery) -> Result<()> {
        self.check_usable()?;
        tracing::debug!(
            sql = %pending.query.command_text(),
            queued = self.pending.len() + 1,
            "Queued read"
        );
        self.pending.push(pending);
        Ok(())
    }

    /// Apply the session's timeout to a statement it built itself.
    pub(crate) fn session_query(&self, mut query: SqlQuery) -> SqlQuery {
        query.set_timeout(self.config.default_command_timeout);
        query
    }

    /// Open the connection if needed and settle an abandoned transaction.
    pub(crate) async fn acquire(&mut self, cx: &Cx) -> Outcome<(), Error> {
        try_result!(self.check_usable());
        if !self.connection_open {
            if let Some(reason) = cx.cancel_reason() {
                return Outcome::Cancelled(reason);
            }
            try_outcome!(wrap(self.connection.open(cx).await, Operation::Open, ""));
            self.connection_open = true;
            tracing::debug!(scope = ?self.config.connection_scope, "Opened connection");
        }
        self.state = SessionState::Active;
        if self
            .transaction
            .as_ref()
            .is_some_and(ActiveTransaction::is_abandoned)
        {
            tracing::warn!("Rolling back a transaction whose handle was dropped");
            let rolled_back = self.rollback_active(cx).await;
            if !matches!(rolled_back, Outcome::Ok(())) {
                self.release();
            }
            try_outcome!(rolled_back);
        }
        Outcome::Ok(())
    }

    /// Close a per-transaction connection once no transaction needs it.
    pub(crate) fn release(&mut self) {
        if self.config.connection_scope == ConnectionScope::PerTransaction
            && self.transaction.is_none()
            && self.connection_open
        {
            self.connection.close();
            self.connection_open = false;
            tracing::debug!("Closed connection");
        }
    }

    /// [`Self::run_non_query`] inside the connection scope.
    pub(crate) async fn non_query_scoped(
        &mut self,
        cx: &Cx,
        command: &Command,
    ) -> Outcome<u64, Error> {
        try_outcome!(self.acquire(cx).await);
        let result = self.run_non_query(cx, command).await;
        self.release();
        result
    }

    pub(crate) async fn run_reader(
        &mut self,
        cx: &Cx,
        command: &Command,
    ) -> Outcome<C::Reader, Error> {
        if let Some(reason) = cx.cancel_reason() {
            return Outcome::Cancelled(reason);
        }
        tracing::debug!(sql = %command.text, parameters = command.parameters.len(), "Executing reader");
        wrap(
            self.connection.execute_reader(cx, command).await,
            Operation::ExecuteReader,
            &command.text,
        )
    }

    pub(crate) async fn run_non_query(&mut self, cx: &Cx, command: &Command) -> Outcome<u64, Error> {
        if let Some(reason) = cx.cancel_reason() {
            return Outcome::Cancelled(reason);
        }
        tracing::debug!(sql = %command.text, parameters = command.parameters.len(), "Executing non-query");
        wrap(
            self.connection.execute_non_query(cx, command).await,
            Operation::ExecuteNonQuery,
            &command.text,
        )
    }

    pub(crate) async fn run_scalar(&mut self, cx: &Cx, command: &Command) -> Outcome<Value, Error> {
        if let Some(reason) = cx.cancel_reason() {
            return Outcome::Cancelled(reason);
        }
        tracing::debug!(sql = %command.text, parameters = command.parameters.len(), "Executing scalar");
        wrap(
            self.connection.execute_scalar(cx, command).await,
            Operation::ExecuteScalar,
            &command.text,
        )
    }
}

impl<C: Connection> Drop for ReadOnlySession<C> {
    fn drop(&mut self) {
        if self.state == SessionState::Disposed {
            return;
        }
        if self.transaction.is_some() {
            tracing::warn!("Session dropped with an unfinished transaction");
        } else if self.state == SessionState::Active && self.connection_open {
            tracing::warn!("Session dropped without close");
        }
        if self.connection_open {
            self.connection.close();
        }
    }
}

/// Queues reads on a session. Returned by [`ReadOnlySession::include`].
#[derive(Debug)]
pub struct Include<'s, C: Connection> {
    session: &'s mut ReadOnlySession<C>,
}

impl<C: Connection> Include<'_, C> {
    /// The instance of `T` with the given identifier.
    pub fn single<T: Entity>(&mut self, identifier: impl Into<Value>) -> Result<IncludeSingle<T>> {
        let query = self
            .session
            .dialect
            .build_select_query(T::object_info(), identifier.into())?;
        let query = self.session.session_query(query);
        self.single_query(query)
    }

    /// The first row of `query`.
    pub fn single_query<T: Entity>(&mut self, query: SqlQuery) -> Result<IncludeSingle<T>> {
        let (handle, pending) = IncludeSingle::queue(query);
        self.session.queue(pending)?;
        Ok(handle)
    }

    /// Every row of `query`.
    pub fn many<T: Entity>(&mut self, query: SqlQuery) -> Result<IncludeMany<T>> {
        let (handle, pending) = IncludeMany::queue(query);
        self.session.queue(pending)?;
        Ok(handle)
    }

    /// Every row of `T`'s table.
    pub fn all<T: Entity>(&mut self) -> Result<IncludeMany<T>> {
        let query = self
            .session
            .session_query(self.session.dialect.build_select_all_query(T::object_info()));
        self.many(query)
    }

    /// The first column of the first row of `query`.
    pub fn scalar<T: FromValue + Send + 'static>(
        &mut self,
        query: SqlQuery,
    ) -> Result<IncludeScalar<T>> {
        let (handle, pending) = IncludeScalar::queue(query);
        self.session.queue(pending)?;
        Ok(handle)
    }
}
