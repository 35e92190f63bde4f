//! Hooks around insert, update and delete.
//!
//! Before hooks run in registration order, after hooks in reverse
//! registration order. An error from any hook aborts the operation. After
//! hooks never run for an instance whose statement failed.

use sqlweave_core::{Entity, IdentifierStrategy, ObjectInfo, Result, UsageError, Value};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Object-safe view of an [`Entity`] instance, handed to listeners.
pub trait AnyEntity: Send {
    /// Metadata of the instance's type.
    fn entity_info(&self) -> &'static ObjectInfo;

    /// Value of the column at `index`.
    fn column_value(&self, index: usize) -> Value;

    /// Set the column at `index`.
    fn set_column_value(&mut self, index: usize, value: Value) -> Result<()>;

    /// Downcast support.
    fn as_any(&self) -> &dyn Any;

    /// Mutable downcast support.
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// The identifier value.
    fn identifier(&self) -> Result<Value> {
        Ok(self.column_value(self.entity_info().identifier_index()?))
    }
}

impl<T: Entity> AnyEntity for T {
    fn entity_info(&self) -> &'static ObjectInfo {
        T::object_info()
    }

    fn column_value(&self, index: usize) -> Value {
        self.get_value(index)
    }

    fn set_column_value(&mut self, index: usize, value: Value) -> Result<()> {
        self.set_value(index, value)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Hooks around [`Session::insert`](crate::Session::insert).
pub trait InsertListener: Send + Sync {
    /// Runs before the INSERT is built.
    fn before_insert(&self, instance: &mut dyn AnyEntity) -> Result<()> {
        let _ = instance;
        Ok(())
    }

    /// Runs after the INSERT. `identifier` is the generated identifier, if
    /// one was read back; it has already been written to the instance.
    fn after_insert(&self, instance: &mut dyn AnyEntity, identifier: Option<&Value>) -> Result<()> {
        let _ = (instance, identifier);
        Ok(())
    }
}

/// Hooks around [`Session::update`](crate::Session::update).
pub trait UpdateListener: Send + Sync {
    /// Runs before the UPDATE is built.
    fn before_update(&self, instance: &mut dyn AnyEntity) -> Result<()> {
        let _ = instance;
        Ok(())
    }

    /// Runs after the UPDATE with the affected row count.
    fn after_update(&self, instance: &mut dyn AnyEntity, rows_affected: u64) -> Result<()> {
        let _ = (instance, rows_affected);
        Ok(())
    }
}

/// Hooks around [`Session::delete`](crate::Session::delete).
pub trait DeleteListener: Send + Sync {
    /// Runs before the DELETE is built.
    fn before_delete(&self, instance: &dyn AnyEntity) -> Result<()> {
        let _ = instance;
        Ok(())
    }

    /// Runs after the DELETE with the affected row count.
    fn after_delete(&self, instance: &dyn AnyEntity, rows_affected: u64) -> Result<()> {
        let _ = (instance, rows_affected);
        Ok(())
    }
}

/// Checks identifiers against the identifier strategy before insert.
///
/// An `Assigned` identifier must be set; a generated one must still be at
/// its default. Types without an identifier are not checked.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentifierStrategyListener;

impl InsertListener for IdentifierStrategyListener {
    fn before_insert(&self, instance: &mut dyn AnyEntity) -> Result<()> {
        let info = instance.entity_info();
        let Ok(index) = info.identifier_index() else {
            return Ok(());
        };
        let unset = instance.column_value(index).is_default_identifier();
        match info.identifier_strategy() {
            IdentifierStrategy::Assigned if unset => Err(UsageError::IdentifierNotAssigned {
                type_name: info.type_name(),
            }
            .into()),
            IdentifierStrategy::DbGenerated | IdentifierStrategy::Sequence if !unset => {
                Err(UsageError::IdentifierAlreadySet {
                    type_name: info.type_name(),
                }
                .into())
            }
            _ => Ok(()),
        }
    }
}

/// Registered listeners, shared by every session a factory opens.
#[derive(Clone, Default)]
pub struct Listeners {
    insert: Vec<Arc<dyn InsertListener>>,
    update: Vec<Arc<dyn UpdateListener>>,
    delete: Vec<Arc<dyn DeleteListener>>,
}

impl fmt::Debug for Listeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listeners")
            .field("insert", &self.insert.len())
            .field("update", &self.update.len())
            .field("delete", &self.delete.len())
            .finish()
    }
}

impl Listeners {
    /// No listeners at all.
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in [`IdentifierStrategyListener`] only.
    pub fn with_defaults() -> Self {
        let mut listeners = Self::new();
        listeners.add_insert(IdentifierStrategyListener);
        listeners
    }

    /// Append an insert listener.
    pub fn add_insert(&mut self, listener: impl InsertListener + 'static) {
        self.insert.push(Arc::new(listener));
    }

    /// Append an update listener.
    pub fn add_update(&mut self, listener: impl UpdateListener + 'static) {
        self.update.push(Arc::new(listener));
    }

    /// Append a delete listener.
    pub fn add_delete(&mut self, listener: impl DeleteListener + 'static) {
        self.delete.push(Arc::new(listener));
    }

    /// Remove every listener.
    pub fn clear(&mut self) {
        self.insert.clear();
        self.update.clear();
        self.delete.clear();
    }

    pub(crate) fn before_insert(&self, instance: &mut dyn AnyEntity) -> Result<()> {
        self.insert.iter().try_for_each(|l| l.before_insert(instance))
    }

    pub(crate) fn after_insert(
        &self,
        instance: &mut dyn AnyEntity,
        identifier: Option<&Value>,
    ) -> Result<()> {
        self.insert
            .iter()
            .rev()
            .try_for_each(|l| l.after_insert(instance, identifier))
    }

    pub(crate) fn before_update(&self, instance: &mut dyn AnyEntity) -> Result<()> {
        self.update.iter().try_for_each(|l| l.before_update(instance))
    }

    pub(crate) fn after_update(&self, instance: &mut dyn AnyEntity, rows: u64) -> Result<()> {
        self.update
            .iter()
            .rev()
            .try_for_each(|l| l.after_update(instance, rows))
    }

    pub(crate) fn before_delete(&self, instance: &dyn AnyEntity) -> Result<()> {
        self.delete.iter().try_for_each(|l| l.before_delete(instance))
    }

    pub(crate) fn after_delete(&self, instance: &dyn AnyEntity, rows: u64) -> Result<()> {
        self.delete
            .iter()
            .rev()
            .try_for_each(|l| l.after_delete(instance, rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlweave_core::{ColumnInfo, DbType, Error, FromValue};
    use std::sync::{Mutex, OnceLock};

    #[derive(Debug, Default)]
    struct Badge {
        code: String,
    }

    impl Entity for Badge {
        fn object_info() -> &'static ObjectInfo {
            static INFO: OnceLock<ObjectInfo> = OnceLock::new();
            INFO.get_or_init(|| {
                ObjectInfo::builder("Badge", "Badges")
                    .column(
                        ColumnInfo::new("code", "Code", DbType::String)
                            .identifier(IdentifierStrategy::Assigned),
                    )
                    .build()
            })
        }

        fn create_instance() -> Self {
            Self::default()
        }

        fn get_value(&self, _index: usize) -> Value {
            self.code.clone().into()
        }

        fn set_value(&mut self, _index: usize, value: Value) -> Result<()> {
            self.code = String::from_value(value)?;
            Ok(())
        }
    }

    struct Recording {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl InsertListener for Recording {
        fn before_insert(&self, _instance: &mut dyn AnyEntity) -> Result<()> {
            self.log.lock().unwrap().push(format!("before {}", self.name));
            Ok(())
        }

        fn after_insert(&self, _instance: &mut dyn AnyEntity, _id: Option<&Value>) -> Result<()> {
            self.log.lock().unwrap().push(format!("after {}", self.name));
            Ok(())
        }
    }

    #[test]
    fn test_before_in_order_after_in_reverse() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut listeners = Listeners::new();
        for name in ["a", "b", "c"] {
            listeners.add_insert(Recording {
                name,
                log: Arc::clone(&log),
            });
        }
        let mut badge = Badge { code: "X1".into() };
        listeners.before_insert(&mut badge).unwrap();
        listeners.after_insert(&mut badge, None).unwrap();
        assert_eq!(
            *log.lock().unwrap(),
            ["before a", "before b", "before c", "after c", "after b", "after a"]
        );
    }

    #[test]
    fn test_assigned_identifier_must_be_set() {
        let listener = IdentifierStrategyListener;
        let mut badge = Badge::default();
        assert!(matches!(
            listener.before_insert(&mut badge),
            Err(Error::Usage(UsageError::IdentifierNotAssigned { type_name: "Badge" }))
        ));
        badge.code = "GOLD".into();
        assert!(listener.before_insert(&mut badge).is_ok());
    }

    #[test]
    fn test_downcast_through_any_entity() {
        let mut badge = Badge { code: "B".into() };
        let view: &mut dyn AnyEntity = &mut badge;
        assert_eq!(view.identifier().unwrap(), Value::from("B"));
        view.as_any_mut().downcast_mut::<Badge>().unwrap().code = "C".into();
        assert_eq!(badge.code, "C");
    }
}
