//! The write side of a session.

use crate::config::SessionConfig;
use crate::listener::Listeners;
use crate::read_only::ReadOnlySession;
use sqlweave_core::{
    Command, Connection, Cx, Entity, Error, IdentifierStrategy, ObjectDelta, ObjectInfo, Outcome,
    Result, SqlArgument, SqlQuery, UsageError, Value, try_outcome, try_result,
};
use sqlweave_dialect::{SqlDialect, build_insert, build_update};
use sqlweave_driver::DbDriver;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

/// How an insert reads back its generated identifier.
#[derive(Debug)]
enum IdentityRead {
    /// Assigned identifiers, or no identity query for this backend.
    None,
    /// The identity query is part of the insert command.
    Combined,
    /// The identity query runs as a second round trip.
    Separate(Command),
}

/// A built insert, reusable across instances by rebinding.
#[derive(Debug)]
struct InsertPlan {
    command: Command,
    identity: IdentityRead,
    identity_arguments: Vec<SqlArgument>,
}

/// A session that reads and writes.
///
/// Dereferences to [`ReadOnlySession`] for reads, includes and transactions.
/// Insert, update and delete run the registered listeners around the
/// statement.
#[derive(Debug)]
pub struct Session<C: Connection> {
    inner: ReadOnlySession<C>,
    listeners: Listeners,
}

impl<C: Connection> Deref for Session<C> {
    type Target = ReadOnlySession<C>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<C: Connection> DerefMut for Session<C> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}

impl<C: Connection> Session<C> {
    /// Create a session with the default configuration and listeners.
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
            inner: ReadOnlySession::with_config(connection, dialect, driver, config),
            listeners: Listeners::with_defaults(),
        }
    }

    /// Registered listeners.
    pub fn listeners(&self) -> &Listeners {
        &self.listeners
    }

    /// Mutable access to the listeners.
    pub fn listeners_mut(&mut self) -> &mut Listeners {
        &mut self.listeners
    }

    /// Replace the listeners.
    pub fn set_listeners(&mut self, listeners: Listeners) {
        self.listeners = listeners;
    }

    // ========================================================================
    // Insert
    // ========================================================================

    /// Insert `instance`.
    ///
    /// For a generated identifier the backend's identity query runs in the
    /// same round trip when the driver batches, otherwise right after the
    /// insert. The identifier is written to `instance` before the after
    /// listeners run.
    #[tracing::instrument(level = "debug", skip(self, cx, instance), fields(entity = std::any::type_name::<T>()))]
    pub async fn insert<T: Entity>(&mut self, cx: &Cx, instance: &mut T) -> Outcome<(), Error> {
        try_result!(self.inner.check_usable());
        let info = T::object_info();
        try_result!(self.listeners.before_insert(instance));
        let plan = try_result!(self.plan_insert(info, instance));

        try_outcome!(self.inner.acquire(cx).await);
        let result = self.execute_insert(cx, &plan).await;
        self.inner.release();

        let identifier = try_outcome!(result);
        try_result!(self.finish_insert(info, instance, identifier));
        Outcome::Ok(())
    }

    /// Insert every instance, building the command once and rebinding it.
    ///
    /// Generated identifiers need batching (the identity query travels with
    /// each insert); without it the call fails before any SQL is sent.
    #[tracing::instrument(level = "debug", skip(self, cx, instances), fields(entity = std::any::type_name::<T>(), count = instances.len()))]
    pub async fn insert_all<T: Entity>(&mut self, cx: &Cx, instances: &mut [T]) -> Outcome<(), Error> {
        try_result!(self.inner.check_usable());
        let info = T::object_info();
        let Some((first, rest)) = instances.split_first_mut() else {
            return Outcome::Ok(());
        };
        let reads_identity = try_result!(self.identity_query(info)).is_some();
        if reads_identity && !self.driver().supports_batched_queries() {
            return Outcome::Err(
                UsageError::NotSupported(format!(
                    "bulk insert of {} reads generated identifiers and needs a driver that supports batched queries",
                    info.type_name()
                ))
                .into(),
            );
        }

        try_result!(self.listeners.before_insert(first));
        let mut plan = try_result!(self.plan_insert(info, first));

        try_outcome!(self.inner.acquire(cx).await);
        let result = self.insert_each(cx, info, first, rest, &mut plan).await;
        self.inner.release();
        result
    }

    async fn insert_each<T: Entity>(
        &mut self,
        cx: &Cx,
        info: &'static ObjectInfo,
        first: &mut T,
        rest: &mut [T],
        plan: &mut InsertPlan,
    ) -> Outcome<(), Error> {
        let identifier = try_outcome!(self.execute_insert(cx, plan).await);
        try_result!(self.finish_insert(info, first, identifier));

        let driver = *self.driver();
        for instance in rest {
            try_result!(self.listeners.before_insert(instance));
            let mut values = info.insert_arguments(instance);
            values.extend_from_slice(&plan.identity_arguments);
            try_result!(driver.rebind(&mut plan.command, &values));
            let identifier = try_outcome!(self.execute_insert(cx, plan).await);
            try_result!(self.finish_insert(info, instance, identifier));
        }
        Outcome::Ok(())
    }

    fn identity_query(&self, info: &ObjectInfo) -> Result<Option<SqlQuery>> {
        if info.identifier_strategy() == IdentifierStrategy::Assigned
            || info.identifier_index().is_err()
            || !self.dialect().supports_select_inserted_identifier()
        {
            return Ok(None);
        }
        let query = self.dialect().build_select_insert_id_query(info)?;
        Ok(Some(self.session_query(query)))
    }

    fn plan_insert<T: Entity>(&self, info: &ObjectInfo, instance: &T) -> Result<InsertPlan> {
        let insert = build_insert(self.dialect(), info, info.insert_arguments(instance))?;
        let insert = self.session_query(insert);
        let driver = self.driver();
        let plan = match self.identity_query(info)? {
            None => InsertPlan {
                command: driver.build_command(&insert)?,
                identity: IdentityRead::None,
                identity_arguments: Vec::new(),
            },
            Some(identity) if driver.supports_batched_queries() => InsertPlan {
                command: driver.build_command(&driver.combine_pair(&insert, &identity)?)?,
                identity: IdentityRead::Combined,
                identity_arguments: identity.arguments().to_vec(),
            },
            Some(identity) => InsertPlan {
                command: driver.build_command(&insert)?,
                identity: IdentityRead::Separate(driver.build_command(&identity)?),
                identity_arguments: Vec::new(),
            },
        };
        Ok(plan)
    }

    async fn execute_insert(&mut self, cx: &Cx, plan: &InsertPlan) -> Outcome<Option<Value>, Error> {
        match &plan.identity {
            IdentityRead::None => {
                try_outcome!(self.inner.run_non_query(cx, &plan.command).await);
                Outcome::Ok(None)
            }
            IdentityRead::Combined => {
                let identifier = try_outcome!(self.inner.run_scalar(cx, &plan.command).await);
                Outcome::Ok(Some(identifier))
            }
            IdentityRead::Separate(identity) => {
                try_outcome!(self.inner.run_non_query(cx, &plan.command).await);
                let identifier = try_outcome!(self.inner.run_scalar(cx, identity).await);
                Outcome::Ok(Some(identifier))
            }
        }
    }

    fn finish_insert<T: Entity>(
        &self,
        info: &ObjectInfo,
        instance: &mut T,
        identifier: Option<Value>,
    ) -> Result<()> {
        let identifier = match identifier {
            Some(raw) => {
                let column = info.identifier_column()?;
                let value = self.converters().convert_from_db(raw, column.db_type)?;
                info.set_identifier_value(instance, value.clone())?;
                tracing::debug!(entity = info.type_name(), identifier = ?value, "Read generated identifier");
                Some(value)
            }
            None => None,
        };
        self.listeners.after_insert(instance, identifier.as_ref())
    }

    // ========================================================================
    // Update
    // ========================================================================

    /// Update every updatable column of `instance`. Returns true if a row
    /// was affected.
    #[tracing::instrument(level = "debug", skip(self, cx, instance), fields(entity = std::any::type_name::<T>()))]
    pub async fn update<T: Entity>(&mut self, cx: &Cx, instance: &mut T) -> Outcome<bool, Error> {
        try_result!(self.inner.check_usable());
        let info = T::object_info();
        try_result!(require_identifier(info, instance));
        try_result!(self.listeners.before_update(instance));
        let command = try_result!(self.update_command(info, instance));

        let rows = try_outcome!(self.inner.non_query_scoped(cx, &command).await);
        try_result!(self.listeners.after_update(instance, rows));
        Outcome::Ok(rows > 0)
    }

    /// Update every instance with one command, rebinding its values.
    /// Returns the total affected row count.
    #[tracing::instrument(level = "debug", skip(self, cx, instances), fields(entity = std::any::type_name::<T>(), count = instances.len()))]
    pub async fn update_all<T: Entity>(&mut self, cx: &Cx, instances: &mut [T]) -> Outcome<u64, Error> {
        try_result!(self.inner.check_usable());
        let info = T::object_info();
        if instances.is_empty() {
            return Outcome::Ok(0);
        }
        try_outcome!(self.inner.acquire(cx).await);
        let result = self.update_each(cx, info, instances).await;
        self.inner.release();
        result
    }

    async fn update_each<T: Entity>(
        &mut self,
        cx: &Cx,
        info: &'static ObjectInfo,
        instances: &mut [T],
    ) -> Outcome<u64, Error> {
        let driver = *self.driver();
        let mut prepared: Option<Command> = None;
        let mut total = 0;
        for instance in instances {
            try_result!(require_identifier(info, instance));
            try_result!(self.listeners.before_update(instance));
            let command = match prepared.take() {
                Some(mut command) => {
                    let values = try_result!(info.update_arguments(instance));
                    try_result!(driver.rebind(&mut command, &values));
                    command
                }
                None => try_result!(self.update_command(info, instance)),
            };
            let rows = try_outcome!(self.inner.run_non_query(cx, &command).await);
            try_result!(self.listeners.after_update(instance, rows));
            total += rows;
            prepared = Some(command);
        }
        Outcome::Ok(total)
    }

    fn update_command<T: Entity>(&self, info: &ObjectInfo, instance: &T) -> Result<Command> {
        let query = build_update(self.dialect(), info, info.update_arguments(instance)?)?;
        self.driver().build_command(&self.session_query(query))
    }

    /// Update only the columns named in `delta`. Listeners do not run.
    #[tracing::instrument(level = "debug", skip(self, cx, delta), fields(entity = delta.object_info().type_name()))]
    pub async fn update_delta(&mut self, cx: &Cx, delta: &ObjectDelta) -> Outcome<bool, Error> {
        try_result!(self.inner.check_usable());
        if delta.identifier().is_null() {
            return Outcome::Err(UsageError::ArgumentEmpty("identifier").into());
        }
        let query = try_result!(self.dialect().build_update_delta_query(delta));
        let command = try_result!(self.driver().build_command(&self.session_query(query)));
        let rows = try_outcome!(self.inner.non_query_scoped(cx, &command).await);
        Outcome::Ok(rows > 0)
    }

    /// Insert when the identifier is still at its default, update otherwise.
    #[tracing::instrument(level = "debug", skip(self, cx, instance), fields(entity = std::any::type_name::<T>()))]
    pub async fn insert_or_update<T: Entity>(&mut self, cx: &Cx, instance: &mut T) -> Outcome<(), Error> {
        let info = T::object_info();
        if try_result!(info.has_default_identifier(instance)) {
            self.insert(cx, instance).await
        } else {
            try_outcome!(self.update(cx, instance).await);
            Outcome::Ok(())
        }
    }

    // ========================================================================
    // Delete
    // ========================================================================

    /// Delete `instance` by its identifier. Returns true if a row was
    /// affected.
    #[tracing::instrument(level = "debug", skip(self, cx, instance), fields(entity = std::any::type_name::<T>()))]
    pub async fn delete<T: Entity>(&mut self, cx: &Cx, instance: &T) -> Outcome<bool, Error> {
        try_result!(self.inner.check_usable());
        let info = T::object_info();
        try_result!(require_identifier(info, instance));
        try_result!(self.listeners.before_delete(instance));
        let command = try_result!(self.delete_command(info, instance));

        let rows = try_outcome!(self.inner.non_query_scoped(cx, &command).await);
        try_result!(self.listeners.after_delete(instance, rows));
        Outcome::Ok(rows > 0)
    }

    /// Delete every instance with one command, rebinding the identifier.
    /// Returns the total affected row count.
    #[tracing::instrument(level = "debug", skip(self, cx, instances), fields(entity = std::any::type_name::<T>(), count = instances.len()))]
    pub async fn delete_all<T: Entity>(&mut self, cx: &Cx, instances: &[T]) -> Outcome<u64, Error> {
        try_result!(self.inner.check_usable());
        let info = T::object_info();
        if instances.is_empty() {
            return Outcome::Ok(0);
        }
        try_outcome!(self.inner.acquire(cx).await);
        let result = self.delete_each(cx, info, instances).await;
        self.inner.release();
        result
    }

    async fn delete_each<T: Entity>(
        &mut self,
        cx: &Cx,
        info: &'static ObjectInfo,
        instances: &[T],
    ) -> Outcome<u64, Error> {
        let driver = *self.driver();
        let mut prepared: Option<Command> = None;
        let mut total = 0;
        for instance in instances {
            try_result!(require_identifier(info, instance));
            try_result!(self.listeners.before_delete(instance));
            let command = match prepared.take() {
                Some(mut command) => {
                    let identifier = try_result!(info.identifier_value(instance));
                    let argument = try_result!(info.identifier_argument(identifier));
                    try_result!(driver.rebind(&mut command, &[argument]));
                    command
                }
                None => try_result!(self.delete_command(info, instance)),
            };
            let rows = try_outcome!(self.inner.run_non_query(cx, &command).await);
            try_result!(self.listeners.after_delete(instance, rows));
            total += rows;
            prepared = Some(command);
        }
        Outcome::Ok(total)
    }

    /// Delete the row of `T` with the given identifier. Listeners do not run.
    #[tracing::instrument(level = "debug", skip(self, cx, identifier), fields(entity = std::any::type_name::<T>()))]
    pub async fn delete_by_id<T: Entity>(
        &mut self,
        cx: &Cx,
        identifier: impl Into<Value>,
    ) -> Outcome<bool, Error> {
        try_result!(self.inner.check_usable());
        let identifier = identifier.into();
        if identifier.is_null() {
            return Outcome::Err(UsageError::ArgumentEmpty("identifier").into());
        }
        let query = try_result!(self.dialect().build_delete_query(T::object_info(), identifier));
        let command = try_result!(self.driver().build_command(&self.session_query(query)));
        let rows = try_outcome!(self.inner.non_query_scoped(cx, &command).await);
        Outcome::Ok(rows > 0)
    }

    fn delete_command<T: Entity>(&self, info: &ObjectInfo, instance: &T) -> Result<Command> {
        let query = self
            .dialect()
            .build_delete_query(info, info.identifier_value(instance)?)?;
        self.driver().build_command(&self.session_query(query))
    }
}

/// Update and delete need an identifier to target the row.
fn require_identifier<T: Entity>(info: &ObjectInfo, instance: &T) -> Result<()> {
    if info.has_default_identifier(instance)? {
        return Err(UsageError::IdentifierNotSet {
            type_name: info.type_name(),
        }
        .into());
    }
    Ok(())
}
